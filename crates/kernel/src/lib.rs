//! Settings, module contract and module registry shared by every bookshelf crate.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{IndexOrder, InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
