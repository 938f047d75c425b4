use std::path::PathBuf;
use std::process::ExitCode;

use calc_session::currency::RateRow;
use calc_session::{Calculator, OptionFlags};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Evaluate expressions, list constants and load exchange rates.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Evaluation timeout in milliseconds.
    #[arg(long, global = true, env = "CALC_TIMEOUT", default_value_t = calc_session::DEFAULT_TIMEOUT_MS)]
    timeout: i64,
    /// Option command applied before anything else, e.g. "angle 2". Repeatable.
    #[arg(long = "set", global = true)]
    set: Vec<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one expression.
    Eval {
        expression: String,
        /// Option flag bits for this call.
        #[arg(long, default_value_t = 0)]
        flags: u32,
    },
    /// List known constants and their aliases.
    Vars,
    /// Load a JSON rate table, then evaluate any given expressions.
    Rates {
        /// Array of {"name": ..., "value": ...} objects.
        file: PathBuf,
        #[arg(long, default_value = "EUR")]
        base: String,
        /// Warn when rates are out of date.
        #[arg(long)]
        warn: bool,
        expressions: Vec<String>,
    },
    /// Print library information.
    Info,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments.
    let args = Args::parse();
    let calculator = Calculator::new();

    for command in &args.set {
        if !calculator.set_option(command) {
            eprintln!("Unknown option: {command}");
            return ExitCode::from(1);
        }
    }

    match args.command {
        Command::Eval { expression, flags } => {
            exit_code(evaluate(&calculator, &[expression], args.timeout, OptionFlags::from(flags)))
        }
        Command::Vars => exit_code(print_json(&calculator.list_variables())),
        Command::Rates { file, base, warn, expressions } => {
            let rows: Vec<RateRow> = match std::fs::read_to_string(&file)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
            {
                Ok(rows) => rows,
                Err(e) => {
                    eprintln!("Invalid rate table {}: {e}", file.display());
                    return ExitCode::from(1);
                }
            };
            let report = calculator.update_currency_rates_detailed(&rows, &base, warn);
            if !print_json(&report) || !evaluate(&calculator, &expressions, args.timeout, OptionFlags::NONE) {
                return ExitCode::from(1);
            }
            if !report.is_success() {
                return ExitCode::from(2);
            }
            ExitCode::SUCCESS
        }
        Command::Info => {
            println!("{} (version {})", calculator.info(), calculator.version());
            ExitCode::SUCCESS
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Prints each result; stops at the first hard error.
fn evaluate(calculator: &Calculator, expressions: &[String], timeout: i64, flags: OptionFlags) -> bool {
    for expression in expressions {
        match calculator.calculate(expression, timeout, flags) {
            Ok(result) => {
                if !print_json(&result) {
                    return false;
                }
            }
            Err(e) => {
                eprintln!("{e}");
                return false;
            }
        }
    }
    true
}

fn print_json<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            true
        }
        Err(e) => {
            eprintln!("Failed to render output: {e}");
            false
        }
    }
}
