//! # tmv-verify: Rule Verification for Threat Models
//!
//! Takes a mapped model and its template, both as [`tmv_core::Document`]s,
//! and reports [`tmv_core::Issue`]s.
//!
//! ## Layers
//!
//! - [`reference`]: the `prefix/data-tag/field-tag[/comparison]` tag
//!   grammar and the lookup of matching keys.
//! - [`validators`]: value-level checks bound to `validate-*` tags.
//! - [`rules`]: model-level rules, one [`rules::Verifier`] each.
//! - [`verifier`]: the [`Verification`] pipeline sequencing the passes.
//!
//! Configuration ([`VerifierConfig`]) is loaded once and checked eagerly
//! against the registries. Data problems never produce an `Err`; they
//! become issues or log warnings.

pub mod config;
pub mod localise;
pub mod reference;
pub mod rules;
pub mod validators;
pub mod verifier;

pub use config::{load_config, CommonConfig, RuleSpec, ValidatorSpec, VerifierConfig};
pub use localise::{Localise, Texts};
pub use reference::{ReferenceMatch, ReferenceTag};
pub use rules::{Verifier, VerifierRegistry, VerifyContext};
pub use validators::{ValidationOutcome, Validator, ValidatorRegistry};
pub use verifier::Verification;
