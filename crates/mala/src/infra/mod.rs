/// Local durable store backed by `SQLite`.
pub mod db;
/// External identity collaborator boundary.
pub mod identity;
/// Remote multi-device session store boundary.
pub mod remote;
