//! Domain models for genforge.
//!
//! # Core Concepts
//!
//! - [`DirectoryNode`]: Portable directory tree, either a file with text
//!   content or a directory with ordered children.
//! - [`ManifestEntry`]: Flat `(path, contents)` pair produced by the
//!   generation service and written by the materializer.
//! - [`Project`]: One versioned generation of a named project on disk.
//! - [`ReplayResult`]: Outcome of running a generation's entrypoint.

mod entry;
mod node;
mod project;
mod replay;

pub use entry::*;
pub use node::*;
pub use project::*;
pub use replay::*;
