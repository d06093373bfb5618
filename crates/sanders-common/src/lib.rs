//! # sanders-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the entire sanders-infra workspace.
//!
//! This crate is the leaf of the dependency graph; it depends on no other
//! internal crate and provides the primitives every component builds upon:
//! the deployment [`Environment`](types::Environment), the immutable
//! [`TagSet`](tags::TagSet) threaded through the component tree, and the
//! eagerly validated [`PlatformConfig`](config::PlatformConfig).

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod tags;
pub mod types;
