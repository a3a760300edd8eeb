//! Filesystem side of the pipeline: writing manifests and trees, overlaying
//! them on templates, and loading existing directories back into trees.
//!
//! All I/O is blocking. Errors carry the path they happened on; a failure
//! midway leaves whatever was already written in place.

mod loader;
mod materialize;
mod overlay;

pub use loader::load;
pub use materialize::{materialize, materialize_tree};
pub use overlay::{copy_tree, overlay, require_template};
