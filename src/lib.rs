pub mod config;
pub mod extract;
pub mod fetch;
pub mod reference;
pub mod table;
