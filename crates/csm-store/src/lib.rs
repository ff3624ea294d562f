//! Storage drivers for sharded content.
//!
//! Content is addressed by an [`Identifier`](csm_types::Identifier) plus a
//! logical name. The identifier is expanded by [`shard`] into nested directory
//! components that bound the fan-out of every directory level; the logical
//! name is the final path element.
//!
//! # Drivers
//!
//! All backends implement the [`Driver`] trait:
//!
//! - [`FilesystemDriver`] -- local directory tree with permission modes
//! - [`MemoryDriver`] -- `HashMap`-based store for tests and embedding
//! - [`HoleDriver`] -- null backend with canned results
//!
//! # Design Rules
//!
//! 1. Every driver operation follows the [`Strictness`] policy: typed error
//!    when strict, `Ok(None)` / `Ok(false)` otherwise.
//! 2. Reads and writes stream through [`transfer`] in `chain_size` chunks and
//!    report progress to optional callbacks, which may abort.
//! 3. An aborted or failed write leaves no content behind.
//! 4. Drivers hold only configuration; identifiers are never retained.

pub mod error;
pub mod filesystem;
pub mod hole;
pub mod memory;
pub mod names;
pub mod params;
pub mod policy;
pub mod shard;
pub mod traits;
pub mod transfer;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use filesystem::FilesystemDriver;
pub use hole::HoleDriver;
pub use memory::MemoryDriver;
pub use params::FilesystemParams;
pub use policy::Strictness;
pub use shard::shard;
pub use traits::{Driver, DriverParam, ParamMap, ProgressCallback};
