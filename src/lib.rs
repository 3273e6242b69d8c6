//! glbrecode - recode embedded GLB textures to Basis Universal
//!
//! This library crate exposes the CLI plumbing for integration testing.

pub mod config;
pub mod inspect;
pub mod recode;
