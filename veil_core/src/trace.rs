// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle tracing.
//!
//! This module provides a [`TraceSink`] trait with one method per lifecycle
//! event. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Sinks usually need to be read after they are installed; a shared
//! `Rc<RefCell<T>>` is itself a [`TraceSink`] for that purpose.
//!
//! # Crate features
//!
//! - `trace` - enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::state::VeilState;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Identifies the instance an event is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VeilEvent<'a> {
    /// Logical id.
    pub logical_id: &'a str,
    /// Composite id.
    pub composite_id: &'a str,
}

/// Emitted when a veil's activation state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChangeEvent<'a> {
    /// The instance.
    pub veil: VeilEvent<'a>,
    /// State before the change.
    pub from: VeilState,
    /// State after the change.
    pub to: VeilState,
    /// Transition generation after the change.
    pub generation: u64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives lifecycle events from a [`Registry`](crate::registry::Registry).
pub trait TraceSink {
    /// A veil was created and registered.
    fn on_created(&mut self, e: &VeilEvent<'_>) {
        _ = e;
    }

    /// A registered veil lost its registry entry to a newer veil with the
    /// same logical id. Its surface, if any, stays on the page.
    fn on_displaced(&mut self, e: &VeilEvent<'_>) {
        _ = e;
    }

    /// `inject()` produced transition metadata.
    fn on_injected(&mut self, e: &VeilEvent<'_>) {
        _ = e;
    }

    /// Surface construction was deferred until the page body exists.
    fn on_deferred(&mut self, e: &VeilEvent<'_>) {
        _ = e;
    }

    /// A surface was built and attached.
    fn on_attached(&mut self, e: &VeilEvent<'_>) {
        _ = e;
    }

    /// Activation state changed through activate/deactivate.
    fn on_state_changed(&mut self, e: &StateChangeEvent<'_>) {
        _ = e;
    }

    /// A transition completed and settled the state.
    fn on_transition_end(&mut self, e: &StateChangeEvent<'_>) {
        _ = e;
    }

    /// A click dismissed the veil.
    fn on_dismissed(&mut self, e: &VeilEvent<'_>) {
        _ = e;
    }

    /// The surface was detached and transition metadata dropped.
    fn on_removed(&mut self, e: &VeilEvent<'_>) {
        _ = e;
    }

    /// The instance was dropped from the registry.
    fn on_destroyed(&mut self, e: &VeilEvent<'_>) {
        _ = e;
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Rc<RefCell<T>> {
    fn on_created(&mut self, e: &VeilEvent<'_>) {
        self.borrow_mut().on_created(e);
    }

    fn on_displaced(&mut self, e: &VeilEvent<'_>) {
        self.borrow_mut().on_displaced(e);
    }

    fn on_injected(&mut self, e: &VeilEvent<'_>) {
        self.borrow_mut().on_injected(e);
    }

    fn on_deferred(&mut self, e: &VeilEvent<'_>) {
        self.borrow_mut().on_deferred(e);
    }

    fn on_attached(&mut self, e: &VeilEvent<'_>) {
        self.borrow_mut().on_attached(e);
    }

    fn on_state_changed(&mut self, e: &StateChangeEvent<'_>) {
        self.borrow_mut().on_state_changed(e);
    }

    fn on_transition_end(&mut self, e: &StateChangeEvent<'_>) {
        self.borrow_mut().on_transition_end(e);
    }

    fn on_dismissed(&mut self, e: &VeilEvent<'_>) {
        self.borrow_mut().on_dismissed(e);
    }

    fn on_removed(&mut self, e: &VeilEvent<'_>) {
        self.borrow_mut().on_removed(e);
    }

    fn on_destroyed(&mut self, e: &VeilEvent<'_>) {
        self.borrow_mut().on_destroyed(e);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owner of an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, installing a sink drops it and every
/// emit method compiles to nothing.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! emit {
    ($(#[$doc:meta])* $name:ident => $method:ident($ty:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$method(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl Tracer {
    /// Creates a tracer that dispatches to `sink`.
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        let mut tracer = Self::none();
        tracer.set_sink(Some(sink));
        tracer
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Replaces the installed sink.
    pub fn set_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        #[cfg(feature = "trace")]
        {
            self.sink = sink;
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
        }
    }

    emit!(
        /// Emits a creation event.
        created => on_created(VeilEvent<'_>)
    );
    emit!(
        /// Emits a displacement event.
        displaced => on_displaced(VeilEvent<'_>)
    );
    emit!(
        /// Emits an injection event.
        injected => on_injected(VeilEvent<'_>)
    );
    emit!(
        /// Emits a deferred-injection event.
        deferred => on_deferred(VeilEvent<'_>)
    );
    emit!(
        /// Emits a surface-attached event.
        attached => on_attached(VeilEvent<'_>)
    );
    emit!(
        /// Emits a state-change event.
        state_changed => on_state_changed(StateChangeEvent<'_>)
    );
    emit!(
        /// Emits a transition-end event.
        transition_end => on_transition_end(StateChangeEvent<'_>)
    );
    emit!(
        /// Emits a dismissal event.
        dismissed => on_dismissed(VeilEvent<'_>)
    );
    emit!(
        /// Emits a removal event.
        removed => on_removed(VeilEvent<'_>)
    );
    emit!(
        /// Emits a destruction event.
        destroyed => on_destroyed(VeilEvent<'_>)
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
