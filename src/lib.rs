//! Proto Schema Resolution
//!
//! Turns parsed protocol buffer declarations into a fully-qualified,
//! dependency-pruned model for a backend code generator.
//!
//! ## Features
//!
//! - **Name Qualification**: Relative type references resolve innermost-scope first
//! - **Closure Filtering**: Keep only what a set of root declarations needs
//! - **Deterministic Output**: Input order is preserved; output is checksummed
//! - **Option Stripping**: Optionally drop option metadata before emission
//!
//! ## Architecture
//!
//! ```text
//! parser output (JSON)
//!   └── loader      ModelLoader::scan / load
//!         └── qualify     every reference → fully-qualified name
//!               └── graph       Forest → closure(roots) → reassemble
//!                     └── options     strip_options (when disabled)
//!                           └── emit        JSON documents + manifest.json
//! ```

pub mod checksum;
pub mod config;
pub mod emit;
pub mod error;
pub mod graph;
pub mod loader;
pub mod options;
pub mod pipeline;
pub mod qualify;
pub mod schema;

pub use checksum::Checksum;
pub use config::{CompilerConfig, OutputFormat};
pub use error::{Result, SchemaError};
pub use graph::{filter, DependencyGraph, Forest, KeepSet};
pub use loader::{LoadConfig, ModelLoader};
pub use pipeline::{compile, CompileOutput, CompileRequest};
pub use qualify::{collect_type_names, qualify, resolve_type};
pub use schema::{
    Declaration, EnumElement, ExtendBlock, Field, Label, Message, ProtoFile, Rpc, Service,
    TypeElement,
};
