//! Config-driven field extraction for real-estate listing integrations.
//!
//! An integration maps destination fields to CSS selectors and transform
//! chains. This crate evaluates those mappings against fetched pages, probes
//! selectors interactively, and previews batches of pages concurrently.

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod utils;
