//! # Map Subcommand
//!
//! Applies a scheme to extracted document content and prints the mapped
//! model as plain JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use tmv_core::parser::load_raw_content;
use tmv_core::Node;
use tmv_mapping::MappingEngine;

use crate::{to_json, EXIT_OK};

/// Arguments for `tmv map`.
#[derive(Args, Debug)]
pub struct MapArgs {
    /// Scheme definition (YAML).
    #[arg(long)]
    pub scheme: PathBuf,

    /// Extracted document content (JSON).
    #[arg(long)]
    pub input: PathBuf,

    /// Indent the output.
    #[arg(long)]
    pub pretty: bool,
}

/// Load a scheme, check it against the built-in registries, and map one
/// input file with it.
pub fn map_file(engine: &MappingEngine, scheme: &Path, input: &Path) -> Result<Node> {
    let def = engine
        .load(scheme)
        .with_context(|| format!("invalid scheme {}", scheme.display()))?;
    let raw = load_raw_content(input)
        .with_context(|| format!("failed to load input {}", input.display()))?;
    tracing::info!(scheme = %scheme.display(), input = %input.display(), "mapping document");
    Ok(engine.parse(&def, &raw))
}

/// Execute `tmv map`.
pub fn run_map(args: &MapArgs) -> Result<u8> {
    let engine = MappingEngine::with_builtins();
    let model = map_file(&engine, &args.scheme, &args.input)?;
    println!("{}", to_json(&model, args.pretty)?);
    Ok(EXIT_OK)
}
