pub mod config;
pub mod names;
pub mod plan;
pub mod urn;
