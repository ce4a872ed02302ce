//! External collaborators the wallet core is driven by or reports to.

/// Bearer credential verification
pub mod auth;
/// Bank transfer gateway client
pub mod gateway;
/// Email notifications
pub mod notifier;
