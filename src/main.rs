//! Stepflow CLI Entry Point
//!
//! Runs a YAML plan of nested sequential and concurrent groups.
//!
//! # Usage
//!
//! ```bash
//! # Run a plan
//! stepflow plan.yaml
//!
//! # Give the whole run a deadline
//! stepflow plan.yaml --timeout 2000
//!
//! # Print the execution timeline afterwards
//! stepflow plan.yaml --timeline --verbose
//! ```

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use colored::Colorize;
use log::{error, info};

use stepflow::monitoring::Timeline;
use stepflow::plan::{build_plan, load_plan};
use stepflow::{exec, Context, APP_NAME, VERSION};

/// Default plan file used when none is specified.
const DEFAULT_PLAN: &str = "plan.yaml";

/// Command-line configuration parsed from arguments.
#[derive(Debug, PartialEq)]
struct Config {
    plan_path: String,
    timeout_ms: Option<u64>,
    show_timeline: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan_path: DEFAULT_PLAN.to_string(),
            timeout_ms: None,
            show_timeline: false,
            verbose: false,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, PartialEq)]
enum Command {
    Run(Config),
    Help,
    Version,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Sequential and concurrent step execution");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: stepflow [OPTIONS] <PLAN_FILE>");
    println!();
    println!("Arguments:");
    println!("  <PLAN_FILE>         Path to plan YAML file (default: {})", DEFAULT_PLAN);
    println!();
    println!("Options:");
    println!("  --timeout MS        Deadline for the whole run, overrides the plan");
    println!("  --timeline          Print the execution timeline after the run");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  stepflow plan.yaml");
    println!("  stepflow plan.yaml --timeout 2000 --timeline");
}

/// Parses command-line arguments.
fn parse_arguments(args: &[String]) -> Result<Command, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--timeline" => {
                config.show_timeline = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--timeout" => {
                i += 1;
                if i >= args.len() {
                    return Err("--timeout requires a number of milliseconds".to_string());
                }
                let timeout: u64 = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid timeout value: {}", args[i]))?;
                if timeout == 0 {
                    return Err("--timeout must be greater than zero".to_string());
                }
                config.timeout_ms = Some(timeout);
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => config.plan_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    Ok(Command::Run(config))
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = match parse_arguments(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            print_usage();
            return Ok(());
        }
        Ok(Command::Version) => {
            println!("{} {}", APP_NAME, VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return Err(e.into());
        }
    };

    setup_logging(config.verbose);
    print_banner();

    let plan = load_plan(&config.plan_path).map_err(|e| {
        error!("Failed to load plan: {}", e);
        format!("Could not load plan from '{}': {}", config.plan_path, e)
    })?;

    info!(
        "Plan '{}' loaded: {} actions",
        plan.display_name(),
        plan.run.action_count()
    );

    let timeline = Timeline::shared();
    let root = build_plan(&plan, Some(&timeline));

    let timeout = config
        .timeout_ms
        .map(Duration::from_millis)
        .or_else(|| plan.timeout());

    let ctx = match timeout {
        Some(timeout) => {
            info!("Run deadline: {:?}", timeout);
            Context::background().with_timeout(timeout)
        }
        None => Context::background(),
    };

    let result = exec(&ctx, &*root);

    println!();
    match &result {
        Ok(()) => println!("{}", "Plan completed successfully".green().bold()),
        Err(e) => println!("{} {}", "Plan failed:".red().bold(), e),
    }

    if config.show_timeline {
        if let Ok(timeline) = timeline.lock() {
            println!("{}", timeline.gantt_chart());
        }
    }

    result.map_err(Into::into)
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("stepflow")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_defaults() {
        let command = parse_arguments(&args(&[])).unwrap();
        assert_eq!(command, Command::Run(Config::default()));
    }

    #[test]
    fn test_full_arguments() {
        let command =
            parse_arguments(&args(&["nightly.yaml", "--timeout", "1500", "--timeline", "-v"]))
                .unwrap();

        assert_eq!(
            command,
            Command::Run(Config {
                plan_path: "nightly.yaml".to_string(),
                timeout_ms: Some(1500),
                show_timeline: true,
                verbose: true,
            })
        );
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_arguments(&args(&["--help"])).unwrap(), Command::Help);
        assert_eq!(parse_arguments(&args(&["-V"])).unwrap(), Command::Version);
    }

    #[test]
    fn test_timeout_errors() {
        assert!(parse_arguments(&args(&["--timeout"])).is_err());
        assert!(parse_arguments(&args(&["--timeout", "soon"])).is_err());
        assert!(parse_arguments(&args(&["--timeout", "0"])).is_err());
    }

    #[test]
    fn test_unknown_option_and_extra_argument() {
        assert!(parse_arguments(&args(&["--parallel"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
    }
}
