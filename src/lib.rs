//! genforge: prompt-driven project scaffolding.
//!
//! A prompt goes to a text-generation service, the response is normalized into
//! a file manifest, and the manifest is written as a new numbered generation
//! under `projects_root/<project>/<n>/`, optionally on top of a template
//! directory. Generations can then be replayed through their entrypoint script.

pub mod codec;
pub mod config;
pub mod error;
pub mod generate;
pub mod manifest;
pub mod models;
pub mod replay;
pub mod service;
pub mod tree_render;
pub mod versions;
pub mod workspace;

pub use error::{PipelineError, Result};
pub use generate::{Generation, Generator, GeneratorSettings};
pub use manifest::{ManifestNormalizer, Strictness};
