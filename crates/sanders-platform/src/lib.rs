//! # sanders-platform
//!
//! Root composition of the Sanders customer platform.
//!
//! Provides three entry points:
//! - [`PlatformBuilder`](builder::PlatformBuilder): fluent configuration, resolved and synthesized in one call.
//! - [`synthesize`](platform::synthesize): builds every component from a validated [`PlatformConfig`](sanders_common::config::PlatformConfig).
//! - [`write_assembly`](assembly::write_assembly): writes the template and its deployment manifest to disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use sanders_common::types::Environment;
//! use sanders_platform::builder::PlatformBuilder;
//!
//! let stack = PlatformBuilder::new()
//!     .environment(Environment::Prod)
//!     .account("123456789012")
//!     .build()?;
//! println!("{}", stack.template().to_json_pretty()?);
//! # Ok::<(), sanders_common::error::InfraError>(())
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod assembly;
pub mod builder;
pub mod platform;
pub mod stack;
