//! Core business logic - framework-agnostic wallet ledger, transaction stores
//! and the crediting and withdrawal workflows built on them.

pub mod airtime;
pub mod credit;
pub mod directory;
pub mod ledger;
pub mod money;
pub mod pagination;
pub mod withdraw;
pub mod withdrawal;
