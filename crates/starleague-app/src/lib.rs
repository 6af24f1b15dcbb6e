// League service crate: confirmation boundary, player import and the
// propose/confirm/commit runner over the core engines.

pub mod confirm;
pub mod import;
pub mod service;
