// Adapters layer: concrete implementations for external systems.

pub mod registry;

pub use registry::HttpRegistryResolver;
