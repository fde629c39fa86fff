//! Core building blocks: subset parameters, polygon geometry, target-grid
//! construction and NaN-aware mosaicking. These are internal primitives
//! consumed by the high-level `api` module.
pub mod geometry;
pub mod params;
pub mod processing;
