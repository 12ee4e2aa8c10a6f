pub mod file_config_store;
#[cfg(test)]
pub mod memory_config_store;
