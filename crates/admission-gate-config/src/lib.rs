// admission-gate-config/src/lib.rs
// ============================================================================
// Module: Admission Gate Config Library
// Description: Canonical config model, validation, and example payload.
// Purpose: Single source of truth for admission-gate.toml semantics.
// Dependencies: admission-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `admission-gate-config` defines the configuration model for the admission
//! gate. Loading is strict and fail-closed: an unreadable, oversized, or
//! inconsistent file never produces a usable config.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
