//! # tmv-mapping: Scheme-Driven Model Construction
//!
//! Turns already-extracted content (text, lists, mappings as produced by a
//! document reader) into the tagged document model of `tmv-core`.
//!
//! ## Modules
//!
//! - [`scheme`]: the `get-data` / `map-data` / `output-data` definition types.
//! - [`query`]: the [`Query`] trait and the built-in query dispatch table.
//! - [`postprocess`]: output post-processors, applied in configured order.
//! - [`engine`]: [`MappingEngine`], the interpreter tying them together.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = MappingEngine::with_builtins();
//! let scheme = load_scheme(Path::new("scheme.yaml"))?;
//! engine.check(&scheme)?;
//! let model = engine.parse(&scheme, &raw);
//! ```

pub mod engine;
pub mod postprocess;
pub mod query;
pub mod scheme;

pub use engine::MappingEngine;
pub use postprocess::{PostProcessor, PostProcessorRegistry};
pub use query::{Query, QueryRegistry};
pub use scheme::{load_scheme, GetData, KeySpec, MapEntry, OutputSpec, OutputType, QuerySpec, ValueDef};
