//! antimon - security guard hook entry point.

use antimon::audit::{AuditEntry, AuditSink, LastError, open_sink};
use antimon::cli::Cli;
use antimon::config::{Config, ENV_CONFIG};
use antimon::decision::{Decision, EXIT_ALLOW, EXIT_INPUT_ERROR};
use antimon::engine::{Validation, Validator};
use antimon::input::Operation;
use antimon::output::{
    JsonReport, format_input_error, format_json_batch, format_json_error, format_json_report,
    format_report, format_stats,
};
use antimon::patterns::PatternEngine;
use antimon::policy::RuntimePolicy;
use antimon::selftest::run_self_test;
use antimon::status::render_status;

use clap::Parser;
use serde_json::{Value, json};
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.explain_last_error {
        return ExitCode::from(explain_last_error());
    }

    if cli.self_test {
        // Built-in detectors only, without overrides or configured rules.
        let policy = RuntimePolicy::default();
        let report = run_self_test(&Validator::new(&policy));
        println!("{}", report.render());
        return ExitCode::from(if report.all_passed() {
            EXIT_ALLOW
        } else {
            EXIT_INPUT_ERROR
        });
    }

    let policy = RuntimePolicy::from_env().merge(cli.policy());
    for line in policy.summary() {
        debug!("{}", line);
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let explicit = cli
        .config
        .clone()
        .or_else(|| env::var_os(ENV_CONFIG).map(PathBuf::from));
    let config = Config::load_or_default(explicit.as_deref(), &cwd);

    // The built-in rule set mirrors the built-in detectors, so only rules
    // from an actual file are run.
    let engine = config.is_user_defined().then(|| PatternEngine::new(&config));
    let mut validator = Validator::new(&policy);
    if let Some(engine) = &engine {
        validator = validator.with_patterns(engine);
    }

    if cli.status {
        println!("{}", render_status(&policy, &config, engine.as_ref()));
        return ExitCode::from(EXIT_ALLOW);
    }

    let audit = open_sink(config.audit_log_path().as_deref());

    let code = if cli.check_files.is_empty() {
        run_hook(&cli, &validator, audit.as_ref())
    } else {
        run_files(&cli, &validator, audit.as_ref())
    };
    ExitCode::from(code)
}

/// Initialize tracing on stderr; `RUST_LOG` overrides the flag.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

/// Evaluate one hook document from stdin.
fn run_hook(cli: &Cli, validator: &Validator<'_>, audit: &dyn AuditSink) -> u8 {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("Error: failed to read stdin: {}", e);
        return EXIT_INPUT_ERROR;
    }

    match validator.evaluate(&input) {
        Ok(eval) => {
            let decision = finish(
                cli,
                validator,
                audit,
                &eval.operation,
                eval.hook.session_id.as_deref(),
                &eval.hook.tool_input,
                &eval.validation,
            );
            if cli.json {
                println!("{}", format_json_report(&eval.validation, decision));
            }
            decision.exit_code()
        }
        Err(e) => {
            debug!(error = %e, "invalid hook input");
            if cli.json {
                println!("{}", format_json_error(&e));
            } else {
                eprintln!("{}", format_input_error(&e));
            }
            EXIT_INPUT_ERROR
        }
    }
}

/// Check files on disk as synthetic Write operations. Exits with the most
/// severe code seen. With `--json` the per-file reports form one array.
fn run_files(cli: &Cli, validator: &Validator<'_>, audit: &dyn AuditSink) -> u8 {
    let mut worst = EXIT_ALLOW;
    let mut reports = Vec::new();
    for path in &cli.check_files {
        let display = path.display().to_string();
        let report = match fs::read_to_string(path) {
            Ok(content) => {
                let op = Operation::write(display.as_str(), content);
                let validation = validator.validate(&op);
                if validation.has_issues && !cli.json {
                    eprintln!("{}:", display);
                }
                let tool_input = json!({ "file_path": display });
                let decision = finish(cli, validator, audit, &op, None, &tool_input, &validation);
                JsonReport::from_validation(&validation, decision)
            }
            Err(e) => {
                let message = format!("failed to read {}: {}", display, e);
                if !cli.json {
                    eprintln!("Error: {}", message);
                }
                JsonReport::invalid(message)
            }
        };
        worst = worst.max(report.exit_code);
        if cli.json {
            reports.push(report.with_file(display));
        }
    }
    if cli.json {
        println!("{}", format_json_batch(&reports));
    }
    worst
}

/// Record and report one validated operation. The JSON report is left to
/// the caller.
fn finish(
    cli: &Cli,
    validator: &Validator<'_>,
    audit: &dyn AuditSink,
    op: &Operation,
    session_id: Option<&str>,
    tool_input: &Value,
    validation: &Validation,
) -> Decision {
    let dry_run = validator.policy().dry_run;
    let decision = validation.decision(dry_run);

    audit.record(&AuditEntry::new(op, session_id, validation, decision, dry_run));

    if decision.is_blocked()
        && let Some(path) = LastError::default_path()
    {
        LastError::new(op, tool_input, validation).save_best_effort(&path);
    }

    if !cli.json {
        if let Some(msg) = format_report(validation, dry_run) {
            eprintln!("{}", msg);
        }
        if cli.stats {
            eprintln!("{}", format_stats(&validation.stats));
        }
    }

    decision
}

fn explain_last_error() -> u8 {
    let Some(path) = LastError::default_path() else {
        eprintln!("Error: cannot determine home directory");
        return EXIT_ALLOW;
    };
    match LastError::load(&path) {
        Ok(Some(record)) => println!("{}", record.explain()),
        Ok(None) => println!("No blocked operation recorded."),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read last error");
            println!("No readable blocked operation recorded.");
        }
    }
    EXIT_ALLOW
}
