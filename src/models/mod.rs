//! Model structure, checkpoint loading, and caching.

pub mod arch;
pub mod cache;
pub mod loader;
pub mod registry;

pub use arch::{Layer, LesionModel};
pub use cache::ModelCache;
pub use loader::load_model;
pub use registry::{find_variant, ArchVariant, VARIANTS};
