//! tabula-engine - value model, path resolution and expression evaluation.

pub mod builtins;
pub mod engine;
