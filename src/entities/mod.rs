//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the wallet accounts, bank accounts and the two
//! transaction ledgers (sell-airtime requests and withdrawals).
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod bank_account;
pub mod sell_airtime;
pub mod user;
pub mod withdrawal;

// Re-export specific types to avoid conflicts
pub use bank_account::{
    Column as BankAccountColumn, Entity as BankAccount, Model as BankAccountModel,
};
pub use sell_airtime::{
    AirtimeStatus, Column as SellAirtimeColumn, Entity as SellAirtime, Model as SellAirtimeModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, UserRole};
pub use withdrawal::{
    Column as WithdrawalColumn, Entity as Withdrawal, Model as WithdrawalModel, WithdrawalStatus,
};
