//! Core traits, settings, and the module registry shared by every Libris crate.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Module, Schema};
pub use registry::ModuleRegistry;
