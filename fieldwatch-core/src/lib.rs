//! # fieldwatch-core
//!
//! Core traits and types for the fieldwatch field-change subscription runtime.
//!
//! This crate has minimal dependencies and is meant to be imported by code
//! that implements notifying sources or builds listeners without needing the
//! registry machinery in `fieldwatch-std`.
//!
//! # Building Blocks
//!
//! ## Sources ([`NotifySource`])
//!
//! A source announces "field `F` changed" to a single handler. It is never
//! owned by fieldwatch; registries and listeners refer to it weakly and
//! identify it by [`SourceKey`].
//!
//! ## Field accessors ([`FieldAccessor`])
//!
//! Select one field of a source and read its value. A [`FieldResolver`]
//! validates the accessor once and turns it into a stable field name.
//!
//! ## Callbacks ([`Callback`])
//!
//! The function to run plus a description of its receiver. The receiver kind
//! decides whether a listener can be built and which variant it becomes.
//!
//! ## Listeners ([`Listener`])
//!
//! One subscription. Bound listeners hold their owner weakly and report
//! themselves dead once it is gone; unbound listeners live until removed.
//!
//! # Error Types
//!
//! - [`WatchError`] - every failure reported by fieldwatch

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod callback;
mod error;
mod field;
mod listener;
mod source;

// Re-exports
pub use callback::{Callback, ReceiverKind};
pub use error::{Result, WatchError};
pub use field::{DynField, Field, FieldAccessor, FieldResolver, FieldSet, IdentifierResolver};
pub use listener::{BoundListener, Listener, UnboundListener};
pub use source::{FieldChangeHandler, NotifySource, ObjectId, SourceKey};
