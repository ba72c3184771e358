// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and keeps an owned copy of every
//! event as a [`RecordedEvent`], in arrival order.

use veil_core::state::VeilState;
use veil_core::trace::{StateChangeEvent, TraceSink, VeilEvent};

/// Owned identity of the veil an event refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VeilRecord {
    /// Logical id.
    pub logical_id: String,
    /// Composite id (`<logical>-<instance>`).
    pub composite_id: String,
}

impl From<&VeilEvent<'_>> for VeilRecord {
    fn from(e: &VeilEvent<'_>) -> Self {
        Self {
            logical_id: e.logical_id.into(),
            composite_id: e.composite_id.into(),
        }
    }
}

/// Owned copy of a state change or settle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateRecord {
    /// The veil.
    pub veil: VeilRecord,
    /// State before.
    pub from: VeilState,
    /// State after.
    pub to: VeilState,
    /// Transition generation after the change.
    pub generation: u64,
}

impl From<&StateChangeEvent<'_>> for StateRecord {
    fn from(e: &StateChangeEvent<'_>) -> Self {
        Self {
            veil: (&e.veil).into(),
            from: e.from,
            to: e.to,
            generation: e.generation,
        }
    }
}

/// A recorded lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// See [`TraceSink::on_created`].
    Created(VeilRecord),
    /// See [`TraceSink::on_displaced`].
    Displaced(VeilRecord),
    /// See [`TraceSink::on_injected`].
    Injected(VeilRecord),
    /// See [`TraceSink::on_deferred`].
    Deferred(VeilRecord),
    /// See [`TraceSink::on_attached`].
    Attached(VeilRecord),
    /// See [`TraceSink::on_state_changed`].
    StateChanged(StateRecord),
    /// See [`TraceSink::on_transition_end`].
    TransitionEnd(StateRecord),
    /// See [`TraceSink::on_dismissed`].
    Dismissed(VeilRecord),
    /// See [`TraceSink::on_removed`].
    Removed(VeilRecord),
    /// See [`TraceSink::on_destroyed`].
    Destroyed(VeilRecord),
}

impl RecordedEvent {
    /// Short event name, as used by the JSON exporter.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created(_) => "Created",
            Self::Displaced(_) => "Displaced",
            Self::Injected(_) => "Injected",
            Self::Deferred(_) => "Deferred",
            Self::Attached(_) => "Attached",
            Self::StateChanged(_) => "StateChanged",
            Self::TransitionEnd(_) => "TransitionEnd",
            Self::Dismissed(_) => "Dismissed",
            Self::Removed(_) => "Removed",
            Self::Destroyed(_) => "Destroyed",
        }
    }

    /// The veil the event refers to.
    #[must_use]
    pub fn veil(&self) -> &VeilRecord {
        match self {
            Self::StateChanged(s) | Self::TransitionEnd(s) => &s.veil,
            Self::Created(v)
            | Self::Displaced(v)
            | Self::Injected(v)
            | Self::Deferred(v)
            | Self::Attached(v)
            | Self::Dismissed(v)
            | Self::Removed(v)
            | Self::Destroyed(v) => v,
        }
    }
}

/// A [`TraceSink`] that records owned copies of every event.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl TraceSink for RecorderSink {
    fn on_created(&mut self, e: &VeilEvent<'_>) {
        self.events.push(RecordedEvent::Created(e.into()));
    }

    fn on_displaced(&mut self, e: &VeilEvent<'_>) {
        self.events.push(RecordedEvent::Displaced(e.into()));
    }

    fn on_injected(&mut self, e: &VeilEvent<'_>) {
        self.events.push(RecordedEvent::Injected(e.into()));
    }

    fn on_deferred(&mut self, e: &VeilEvent<'_>) {
        self.events.push(RecordedEvent::Deferred(e.into()));
    }

    fn on_attached(&mut self, e: &VeilEvent<'_>) {
        self.events.push(RecordedEvent::Attached(e.into()));
    }

    fn on_state_changed(&mut self, e: &StateChangeEvent<'_>) {
        self.events.push(RecordedEvent::StateChanged(e.into()));
    }

    fn on_transition_end(&mut self, e: &StateChangeEvent<'_>) {
        self.events.push(RecordedEvent::TransitionEnd(e.into()));
    }

    fn on_dismissed(&mut self, e: &VeilEvent<'_>) {
        self.events.push(RecordedEvent::Dismissed(e.into()));
    }

    fn on_removed(&mut self, e: &VeilEvent<'_>) {
        self.events.push(RecordedEvent::Removed(e.into()));
    }

    fn on_destroyed(&mut self, e: &VeilEvent<'_>) {
        self.events.push(RecordedEvent::Destroyed(e.into()));
    }
}
