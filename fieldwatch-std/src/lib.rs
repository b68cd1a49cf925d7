//! # fieldwatch-std
//!
//! Standard implementations for the fieldwatch field-change subscription runtime.
//!
//! This crate provides:
//! - **Registry**: [`SubscriptionRegistry`], the per-source table of field
//!   listeners and its dispatch algorithm
//! - **Cache**: [`RegistryCache`], at most one registry per live source
//! - **Signals**: [`FieldSignal`] and [`Observed`] for writing notifying sources
//! - **Testing**: sources, owners and logs for tests

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use fieldwatch_core;

// Modules
pub mod cache;
pub mod registry;
pub mod signal;
pub mod testing;

pub use cache::RegistryCache;
pub use registry::{Priming, SubscriptionRegistry};
pub use signal::{FieldSignal, Observed};
