pub mod app;
pub mod domain;
pub mod infra;

// Re-exports for convenience
pub use infra::db;
pub use infra::identity;
pub use infra::remote;
