pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod store;
