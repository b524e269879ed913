/// Per-day session records and cycle arithmetic.
pub mod session;
/// User-configurable application settings and backup documents.
pub mod settings;
