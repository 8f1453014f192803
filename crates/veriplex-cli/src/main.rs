//! Veriplex command-line interface.
//!
//! Reads a formula (argument, file, or stdin), decides it, and reports
//! the verdict with a witness. Exit codes: 0 SAT, 10 UNSAT, 20 UNKNOWN,
//! 2 malformed input.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;
use veriplex::{solve_str, Error, SolveOutcome};

const EXIT_SAT: u8 = 0;
const EXIT_MALFORMED: u8 = 2;
const EXIT_UNSAT: u8 = 10;
const EXIT_UNKNOWN: u8 = 20;

#[derive(Parser)]
#[command(name = "veriplex")]
#[command(version)]
#[command(about = "Decide formulas over linear real arithmetic with rectifier constraints")]
struct Cli {
    /// The formula, e.g. "ineq(1,x,1,y,5) and relu(x,y)". Reads stdin
    /// when neither this nor --file is given.
    formula: Option<String>,

    /// Read the formula from a file instead.
    #[arg(short, long, conflicts_with = "formula")]
    file: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Verbosity level (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn read_input(cli: &Cli) -> Result<String> {
    if let Some(formula) = &cli.formula {
        return Ok(formula.clone());
    }
    if let Some(path) = &cli.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("reading stdin")?;
    Ok(buffer)
}

fn print_text(outcome: &SolveOutcome) {
    match outcome {
        SolveOutcome::Sat {
            assignment,
            theory_model,
        } => {
            println!("sat");
            for (name, value) in assignment {
                println!("  {name} = {value}");
            }
            debug!(atoms = theory_model.len(), "theory model available");
        }
        SolveOutcome::Unsat => println!("unsat"),
        SolveOutcome::Unknown { reason } => println!("unknown ({reason})"),
    }
}

fn print_json(outcome: &SolveOutcome) {
    let value = match outcome {
        SolveOutcome::Sat {
            assignment,
            theory_model,
        } => serde_json::json!({
            "result": "sat",
            "assignment": assignment
                .iter()
                .map(|(name, value)| {
                    (name.clone(), serde_json::Value::String(value.to_string()))
                })
                .collect::<serde_json::Map<_, _>>(),
            "theory_model": theory_model
                .iter()
                .map(|(atom, value)| (format!("a{}", atom.0), serde_json::Value::Bool(*value)))
                .collect::<serde_json::Map<_, _>>(),
        }),
        SolveOutcome::Unsat => serde_json::json!({ "result": "unsat" }),
        SolveOutcome::Unknown { reason } => serde_json::json!({
            "result": "unknown",
            "reason": reason,
        }),
    };
    println!("{value:#}");
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let input = match read_input(&cli) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(EXIT_MALFORMED);
        }
    };

    match solve_str(input.trim()) {
        Ok(outcome) => {
            if cli.json {
                print_json(&outcome);
            } else {
                print_text(&outcome);
            }
            ExitCode::from(match outcome {
                SolveOutcome::Sat { .. } => EXIT_SAT,
                SolveOutcome::Unsat => EXIT_UNSAT,
                SolveOutcome::Unknown { .. } => EXIT_UNKNOWN,
            })
        }
        Err(Error::Parse(err)) => {
            eprintln!("error: {err}");
            ExitCode::from(EXIT_MALFORMED)
        }
        Err(Error::Solver(err)) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
