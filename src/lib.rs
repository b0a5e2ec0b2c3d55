pub mod cli;
pub mod clock;
pub mod config;
pub mod consent;
pub mod events;
pub mod logging;
pub mod records;
pub mod requests;
pub mod sanitize;
pub mod storage;
