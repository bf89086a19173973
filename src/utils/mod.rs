pub mod json_stream;
pub mod log_helpers;
