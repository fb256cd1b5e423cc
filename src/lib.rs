//! quantcrew: quantitative analytics over daily price history.
//!
//! Hexagonal architecture: the engine lives in [`domain`], collaborator traits
//! in [`ports`], file-backed implementations in [`adapters`], and the command
//! line surface in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
