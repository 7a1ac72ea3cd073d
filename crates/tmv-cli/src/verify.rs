//! # Verify Subcommand
//!
//! Runs the configured rules over a model and its template. Both are
//! either mapped from extracted content with one scheme, or loaded as
//! already-mapped JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use serde::Serialize;

use tmv_core::parser::load_raw_content;
use tmv_core::{Issue, IssueSummary, Node};
use tmv_mapping::MappingEngine;
use tmv_verify::Verification;

use crate::map::map_file;
use crate::{to_json, EXIT_ISSUES, EXIT_OK};

/// Arguments for `tmv verify`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["scheme", "model"])))]
pub struct VerifyArgs {
    /// Verifier configuration (YAML).
    #[arg(long)]
    pub config: PathBuf,

    /// Scheme used to map both the input and the template input.
    #[arg(long, requires_all = ["input", "template_input"])]
    pub scheme: Option<PathBuf>,

    /// Extracted content of the document under verification (JSON).
    #[arg(long, requires = "scheme")]
    pub input: Option<PathBuf>,

    /// Extracted content of the template document (JSON).
    #[arg(long, requires = "scheme")]
    pub template_input: Option<PathBuf>,

    /// Already-mapped model (JSON).
    #[arg(long, requires = "template")]
    pub model: Option<PathBuf>,

    /// Already-mapped template model (JSON).
    #[arg(long, requires = "model")]
    pub template: Option<PathBuf>,

    /// Indent the output.
    #[arg(long)]
    pub pretty: bool,
}

/// Issues of one verification run, with counts by type.
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub summary: IssueSummary,
    pub issues: Vec<Issue>,
}

fn load_documents(args: &VerifyArgs) -> Result<(Node, Node)> {
    match (&args.scheme, &args.input, &args.template_input) {
        (Some(scheme), Some(input), Some(template_input)) => {
            let engine = MappingEngine::with_builtins();
            Ok((
                map_file(&engine, scheme, input)?,
                map_file(&engine, scheme, template_input)?,
            ))
        }
        _ => {
            let model = args
                .model
                .as_ref()
                .context("either --scheme with inputs or --model is required")?;
            let template = args.template.as_ref().context("--template is required with --model")?;
            Ok((
                load_raw_content(model)
                    .with_context(|| format!("failed to load model {}", model.display()))?,
                load_raw_content(template)
                    .with_context(|| format!("failed to load template {}", template.display()))?,
            ))
        }
    }
}

/// Load everything `args` names and run the verification.
pub fn verify_report(args: &VerifyArgs) -> Result<VerifyReport> {
    let verification = Verification::from_path(&args.config)
        .with_context(|| format!("invalid config {}", args.config.display()))?;
    let (model, template) = load_documents(args)?;
    let (_, issues) = verification.verify_nodes(model, template);
    Ok(VerifyReport {
        summary: IssueSummary::of(&issues),
        issues,
    })
}

/// Execute `tmv verify`.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let report = verify_report(args)?;
    println!("{}", to_json(&report, args.pretty)?);
    if report.summary.has_errors() {
        tracing::info!(errors = report.summary.errors, "verification found errors");
        Ok(EXIT_ISSUES)
    } else {
        Ok(EXIT_OK)
    }
}
