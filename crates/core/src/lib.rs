//! Marketplace Core - Shared types library.
//!
//! This crate provides the domain types shared by the marketplace components:
//! - `storefront` - Procedure gateway, checkout workflow and outbound clients
//! - `integration-tests` - End-to-end tests against mocked collaborators
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Document
//! identifiers coming out of the content store are normalized here, once, at
//! deserialization time, so the rest of the workspace only ever sees strings.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for document identifiers and price identifiers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
