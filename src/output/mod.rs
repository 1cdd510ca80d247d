//! Output formatting and secret redaction.

mod redaction;
mod response;

pub use redaction::redact_secrets;
pub use response::{
    JsonReport, format_input_error, format_json_batch, format_json_error, format_json_report,
    format_report, format_stats,
};
