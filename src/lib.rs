//! Podstamp: a Kubernetes controller that stamps freshly created pods
//!
//! This crate watches pod create events, filters them against a namespace
//! allow-list, a required annotation and a freshness window, and writes a
//! wall-clock timestamp annotation onto the matching pods with
//! retry-on-conflict semantics.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod probes;

pub use crate::error::{Error, Result};
