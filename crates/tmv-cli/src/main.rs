//! # tmv CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tmv_cli::map::{run_map, MapArgs};
use tmv_cli::verify::{run_verify, VerifyArgs};
use tmv_cli::EXIT_FAILURE;

/// Threat-model verifier.
///
/// Maps extracted threat-model documents into a tagged model and checks
/// the model against a template with configurable rules.
#[derive(Parser, Debug)]
#[command(name = "tmv", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Map extracted document content with a scheme.
    Map(MapArgs),

    /// Verify a model against its template.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Map(args) => run_map(args),
        Commands::Verify(args) => run_verify(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_map() {
        let cli = Cli::try_parse_from([
            "tmv", "map", "--scheme", "s.yaml", "--input", "in.json", "--pretty",
        ])
        .unwrap();
        if let Commands::Map(args) = cli.command {
            assert_eq!(args.scheme, PathBuf::from("s.yaml"));
            assert_eq!(args.input, PathBuf::from("in.json"));
            assert!(args.pretty);
        } else {
            panic!("expected map");
        }
    }

    #[test]
    fn cli_parse_verify_with_scheme() {
        let cli = Cli::try_parse_from([
            "tmv",
            "verify",
            "--config",
            "rules.yaml",
            "--scheme",
            "s.yaml",
            "--input",
            "in.json",
            "--template-input",
            "t.json",
        ])
        .unwrap();
        if let Commands::Verify(args) = cli.command {
            assert_eq!(args.template_input, Some(PathBuf::from("t.json")));
            assert!(args.model.is_none());
        } else {
            panic!("expected verify");
        }
    }

    #[test]
    fn cli_parse_verify_with_models() {
        let cli = Cli::try_parse_from([
            "tmv", "verify", "--config", "c.yaml", "--model", "m.json", "--template", "t.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Verify(_)));
    }

    #[test]
    fn cli_parse_verify_needs_a_source() {
        assert!(Cli::try_parse_from(["tmv", "verify", "--config", "c.yaml"]).is_err());
    }

    #[test]
    fn cli_parse_verify_scheme_needs_both_inputs() {
        let result = Cli::try_parse_from([
            "tmv", "verify", "--config", "c.yaml", "--scheme", "s.yaml", "--input", "in.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parse_verify_model_needs_template() {
        let result =
            Cli::try_parse_from(["tmv", "verify", "--config", "c.yaml", "--model", "m.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parse_verbose_levels() {
        let args = ["map", "--scheme", "s", "--input", "i"];
        let count = |flags: &[&str]| {
            let argv: Vec<&str> = ["tmv"].iter().chain(flags).chain(args.iter()).copied().collect();
            Cli::try_parse_from(argv).unwrap().verbose
        };
        assert_eq!(count(&[]), 0);
        assert_eq!(count(&["-v"]), 1);
        assert_eq!(count(&["-vvv"]), 3);
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["tmv"]).is_err());
    }
}
