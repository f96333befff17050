pub mod collection;
pub mod file;
pub mod memory;
