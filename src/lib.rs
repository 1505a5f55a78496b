//! PARLogic - PAR-level inventory planning for medical supplies.
//!
//! # Overview
//!
//! PARLogic turns historical usage of an item into a statistical usage
//! profile, derives periodic-automatic-replenishment (PAR) levels from it,
//! and compares current stock against those levels to recommend reorders.
//!
//! The engine is pure: every function takes its inputs explicitly (including
//! "today") and returns a value or an [`error::EngineError`]. Only the HTTP
//! boundary logs.
//!
//! # Modules
//!
//! - [`model`]: Usage records, profiles, PAR levels, recommendations
//! - [`stats`]: Daily series, dispersion, trend slope, normal quantiles
//! - [`analysis`]: Usage Pattern Analyzer
//! - [`par`]: PAR Level Calculator
//! - [`recommendation`]: Recommendation Engine
//! - [`batch`]: Parallel per-item planning
//! - [`cache`]: Single-flight usage profile cache
//! - [`store`]: In-memory record store
//! - [`config`]: Engine and server configuration
//! - [`api`]: HTTP API handlers

pub mod analysis;
pub mod api;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod par;
pub mod recommendation;
pub mod stats;
pub mod store;
