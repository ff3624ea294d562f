//! Foundation types for csm, a sharded content store.
//!
//! Every other csm crate depends on `csm-types`.
//!
//! # Key Types
//!
//! - [`Identifier`] -- Ordered, typed description of where content lives
//! - [`Segment`] -- One `(kind, value)` element of an identifier
//! - [`IdentConfig`] -- Segment-count bounds and strictness for validation
//! - [`Progress`] -- Per-transfer byte accounting handed to progress callbacks
//! - [`ContentType`] -- `kind[_subkind]` content tag

pub mod content_type;
pub mod error;
pub mod ident;
pub mod progress;

pub use content_type::ContentType;
pub use error::TypeError;
pub use ident::{IdentConfig, Identifier, Segment, SegmentKind};
pub use progress::Progress;
