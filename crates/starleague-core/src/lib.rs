// Library root: the league progression and validation engine.
//
// Pure decision functions live in `draft`, `lineup`, `standings`, `playoff`,
// `results`, `rollover` and `schedule`; `store` and `db` carry the persistence contract
// and its SQLite implementation.

pub mod config;
pub mod db;
pub mod draft;
pub mod lineup;
pub mod model;
pub mod playoff;
pub mod results;
pub mod rollover;
pub mod schedule;
pub mod season;
pub mod standings;
pub mod store;
pub mod validation;
