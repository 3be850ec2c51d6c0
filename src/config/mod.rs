//! Layered configuration and schema binding.
//!
//! Configuration is read from an ordered list of sources:
//! 1. **Files** - YAML, JSON, TOML, XML, INI or `.properties`, lowest priority first
//! 2. **Trees** - in-memory [`ConfigNode`]s supplied by the caller
//! 3. **Overrides** - `key=value` definitions, always the highest priority
//!
//! ## Lookup
//! - Scalars and leaves: the highest source defining the path wins
//! - Lists and repeated groups: taken whole from a single source, and a
//!   group never mixes in members or fields from lower sources
//! - Paths: `/a.b` is absolute, `a.b` or `.a.b` is relative to the view
//!
//! Consumers declare a [`Schema`] and read it through a [`BoundView`].

mod binder;
mod combined;
mod convert;
mod loader;
mod merge;
mod node;
mod overrides;
mod path;
mod schema;
mod session;

pub use binder::{BoundValue, BoundView, FromBoundView, MAX_NESTING_DEPTH, bind};
pub use combined::{CombinedConfig, ConfigSource, ResolvedEntry, SourceOrigin};
pub use convert::{
    ConversionError, FromTypedValue, ScalarType, TypedValue, convert, convert_values,
    parse_integer,
};
pub use loader::{ConfigBuilder, SourceFormat, load_source, parse_source};
pub use merge::{OVERRIDES_LABEL, merge};
pub use node::{ConfigNode, Scalar};
pub use overrides::Overrides;
pub use path::{
    Locator, Match, PathError, PropertyPath, ROOT_MARKER, Resolution, SEPARATOR, Segment, Step,
    resolve,
};
pub use schema::{PropertyDescriptor, PropertyKind, Schema, SchemaBuilder, SchemaRef, ValueKind};
pub use session::ConfigSession;
