pub mod config;
pub mod ids;
pub mod logging;
pub mod security;
