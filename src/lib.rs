//! ShareASale Reports Library
//!
//! Signed, cached access to the ShareASale affiliate reporting API, plus the
//! settings, CLI and rendering layers the `shareasale` binary is built from.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod report;
