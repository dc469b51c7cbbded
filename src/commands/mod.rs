pub mod base_commands;
pub mod console;
pub mod economic_cmd;
pub mod experiments_cmd;
pub mod export_cmd;
pub mod hearing_cmd;
pub mod metrics_cmd;
pub mod report_format;
