pub mod booth_config;
pub mod config_store;
