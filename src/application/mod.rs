pub mod auth_service;
pub mod bill_service;
pub mod session;
