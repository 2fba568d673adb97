pub mod analysis;
pub mod aws;
pub mod config;
pub mod cur;
pub mod flow;
pub mod generate;
pub mod logging;
pub mod provision;
pub mod setup_check;
pub mod store;
