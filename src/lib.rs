// THEORY:
// This file is the main entry point for the `gleitzsch` library crate.
// It exposes the `GleitzschPipeline` and its configuration record as the
// high-level interface, while the building blocks of the effect (array
// containers, the codec bridge, the operator, the contrast enhancer and the
// preprocessing filters) live under `core_modules`.
//
// The binary in `main.rs` is a thin shell around this library: it parses the
// command line, installs logging, probes for the external codec and then hands
// a `GleitzschConfig` to the pipeline.

pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use error::GleitzschError;
pub use pipeline::{GleitzschConfig, GleitzschPipeline};
