//! antimon - pre-execution guard for AI coding-assistant tool calls.
//!
//! Classifies a proposed tool invocation (write, edit, read, shell command)
//! against built-in detectors and user-configured pattern rules, and maps
//! the result to an allow/block exit code.

pub mod audit;
pub mod cli;
pub mod config;
pub mod decision;
pub mod detectors;
pub mod engine;
pub mod input;
pub mod output;
pub mod patterns;
pub mod policy;
pub mod selftest;
pub mod status;

pub use config::Config;
pub use decision::{Decision, DetectionResult, Severity, exit_code};
pub use detectors::Detector;
pub use engine::{DetectorStats, Validation, Validator};
pub use input::{HookInput, Operation};
pub use patterns::PatternEngine;
pub use policy::RuntimePolicy;
