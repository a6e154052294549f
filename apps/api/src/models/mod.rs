pub mod analysis;
pub mod upload;
pub mod usage_log;
