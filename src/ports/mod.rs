//! Port traits: the boundary between the computation core and its collaborators.

pub mod config_port;
pub mod data_port;
