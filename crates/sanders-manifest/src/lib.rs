//! # sanders-manifest
//!
//! The resource manifest model.
//!
//! Handles:
//! - **Resource**: typed [`ResourceDeclaration`](resource::ResourceDeclaration)s and their kinds.
//! - **Intrinsic**: build-time references (`Ref`, `Fn::GetAtt`, ...) between declarations.
//! - **Scope**: logical-id addressing and tag inheritance down the component tree.
//! - **Set**: duplicate-free collections of declarations.
//! - **Template**: the emitted manifest, its outputs, serialization and digest.
//! - **Graph**: dependency ordering with cycle detection, built on `petgraph`.
//! - **Validate**: reference and tag checks run before a manifest is emitted.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod graph;
pub mod intrinsic;
pub mod resource;
pub mod scope;
pub mod set;
pub mod template;
pub mod validate;
