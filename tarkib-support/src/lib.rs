//! # Tarkib Support
//!
//! Shared helpers for the Tarkib resolution engine.
//!
//! This crate provides:
//! - Rendering of dependency chains and type names for diagnostics
//! - "Did you mean" suggestions over registered type names

pub mod rendering;
