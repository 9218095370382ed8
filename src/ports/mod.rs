//! Port traits: the capability interfaces collaborators implement.

pub mod config_port;
pub mod data_port;
pub mod report_port;
pub mod signal_port;
