//! # fieldwatch - Weak Field-Change Subscriptions
//!
//! `fieldwatch` lets callers register typed callbacks that fire whenever a
//! named field of a notifying object changes, without the subscriber keeping
//! the object alive and without the object knowing its subscribers.
//!
//! - Subscribers bound to an owner are held weakly and purged once the owner
//!   is dropped.
//! - Sources are held weakly; each live source has at most one registry.
//! - Dispatch runs synchronously on the thread that raised the signal, and
//!   no lock is held while callbacks run.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fieldwatch::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Default, Observable)]
//! struct Settings {
//!     signal: FieldSignal,
//!     enabled: Observed<bool>,
//! }
//!
//! struct Panel;
//! impl Panel {
//!     fn on_enabled(&self, enabled: bool) { /* ... */ }
//! }
//!
//! let subscriptions = Subscriptions::new();
//! let settings = Arc::new(Settings::default());
//! let panel = Arc::new(Panel);
//!
//! subscriptions.subscribe(&settings, Settings::ENABLED, Callback::method(&panel, Panel::on_enabled))?;
//! settings.set_enabled(true); // Panel::on_enabled(&panel, true)
//!
//! drop(panel);
//! settings.set_enabled(false); // nothing runs; the listener is purged
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod subscriptions;

pub use fieldwatch_core::{
    // Listeners
    BoundListener,
    // Callbacks
    Callback,
    // Field accessors
    DynField,
    Field,
    FieldAccessor,
    // Sources
    FieldChangeHandler,
    FieldResolver,
    FieldSet,
    IdentifierResolver,
    Listener,
    NotifySource,
    ObjectId,
    ReceiverKind,
    // Errors
    Result,
    SourceKey,
    UnboundListener,
    WatchError,
};

pub use fieldwatch_std::{
    FieldSignal, Observed, Priming, RegistryCache, SubscriptionRegistry,
};

pub use subscriptions::{SubscribeOptions, Subscription, Subscriptions, SubscriptionsBuilder};

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use fieldwatch_std::testing::*;
}

/// Prelude module - common imports for fieldwatch.
///
/// # Usage
///
/// ```rust,ignore
/// use fieldwatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Callback, DynField, Field, FieldSignal, NotifySource, ObjectId, Observed, SubscribeOptions,
        Subscription, Subscriptions, WatchError,
    };

    #[cfg(feature = "macros")]
    pub use crate::Observable;
}

#[cfg(feature = "macros")]
pub use fieldwatch_macros::Observable;
