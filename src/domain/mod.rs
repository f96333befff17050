pub mod bill;
pub mod error;
pub mod outcome;
pub mod storage;
pub mod user;
