//! Configuration types for the layer pipeline.
//!
//! The pipeline never reads global state: every entry point takes a
//! [`RegionConfig`] by reference.

mod region_config;

pub use region_config::RegionConfig;
