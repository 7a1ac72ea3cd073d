//! # tmv-core: Foundational Types for the Threat-Model Verifier
//!
//! This crate defines the tagged document model that every other `tmv-*`
//! crate operates on. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Keys compare by name.** A [`Key`] carries tags and properties, but
//!    equality and hashing look only at its name. Mapping lookups rely on
//!    this: a key built from a bare name finds the annotated key in a row.
//!
//! 2. **Provenance travels with text.** A [`Text`] leaf keeps its source
//!    locator properties next to its value. Every transformation threads
//!    them forward explicitly; serialization drops them.
//!
//! 3. **Arena, not pointers.** A [`Document`] interns the owned [`Node`]
//!    tree into flat key and node tables addressed by [`KeyId`] and
//!    [`NodeId`]. Parent, row and section relations are handles, so the
//!    model has no reference cycles.
//!
//! 4. **Indexes are explicit passes.** [`assign_key_tags`] annotates tags in
//!    place and is idempotent. [`RowIndex::build`] is a pure pass producing
//!    the row-identifier lookup queried by later verification passes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tmv-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod document;
pub mod error;
pub mod issue;
pub mod key;
pub mod keymaster;
pub mod node;
pub mod parser;
pub mod pattern;
pub mod tags;

// Re-export primary types for ergonomic imports.
pub use document::{Document, KeyId, NodeId, NodeRef};
pub use error::{ConfigError, ConfigResult, TmvError};
pub use issue::{Issue, IssueSummary, IssueType};
pub use key::Key;
pub use keymaster::{
    assign_key_tags, find_key_with_tag, find_keys_with_tag, find_keys_with_tag_matching_regex,
    get_column_name_for_key, get_data_tag_for_key, get_row_identifier_for_key,
    get_section_for_key, RowIndex,
};
pub use node::{Mapping, Node, Text};
pub use pattern::PatternCache;
pub use tags::TagTable;
