//! # tmv-cli: Command-Line Interface for the Threat-Model Verifier
//!
//! ## Subcommands
//!
//! - `tmv map`: apply a scheme to extracted document content and print
//!   the mapped model.
//! - `tmv verify`: map (or load) a model and its template, run the
//!   configured rules and print the issues.
//!
//! ```bash
//! tmv map --scheme scheme.yaml --input page.json --pretty
//! tmv verify --config rules.yaml --scheme scheme.yaml \
//!     --input page.json --template-input template.json
//! tmv verify --config rules.yaml --model model.json --template template-model.json
//! ```
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success, no ERROR issues |
//! | 1 | verification found ERROR issues |
//! | 2 | operational failure (unreadable file, bad configuration) |
//!
//! Handlers only parse arguments, load files and print; the work is done
//! by `tmv-mapping` and `tmv-verify`.

pub mod map;
pub mod verify;

use anyhow::Result;
use serde::Serialize;

pub const EXIT_OK: u8 = 0;
pub const EXIT_ISSUES: u8 = 1;
pub const EXIT_FAILURE: u8 = 2;

/// Render `value` as JSON, indented when `pretty`.
pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(rendered)
}
