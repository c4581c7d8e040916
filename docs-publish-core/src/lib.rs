#![doc = "docs-publish-core: core logic library for docs-publish."]

//! This crate contains the data model, collaborator contracts and pipelines for docs-publish.
//! Network clients (GitHub, Libris) live in the binary crate and plug in through the
//! traits in [`contract`].
//!
//! # Usage
//! Add this as a dependency for input handling, documentation generation and publishing code.

pub mod config;
pub mod contract;
pub mod generate;
pub mod inputs;
#[cfg(any(test, feature = "test-export-mocks"))]
pub mod memory;
pub mod pipeline;
pub mod publish;
