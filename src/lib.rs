//! vidgen: Video Generation Client
//!
//! Derives a canonical, mode-consistent parameter set from raw form selections, drives a
//! single in-flight generation through an Idle / Loading / Success / Error lifecycle, and
//! classifies provider failures into user-facing categories.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod derivation;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod media;
pub mod params;
pub mod provider;
