// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Activation states and dismissal handlers.
//!
//! ```text
//!            activate()                    transition end
//!   Off ─────────────────► Activating ─────────────────► On
//!    ▲                        │   ▲                       │
//!    │         deactivate()   │   │ activate()            │ deactivate()
//!    │                        ▼   │                       ▼
//!    └──────────────────── Deactivating ◄─────────────────┘
//!          transition end
//! ```
//!
//! Activation is logically immediate: [`Activating`](VeilState::Activating)
//! already counts as activated while the fade-in runs, and
//! [`Deactivating`](VeilState::Deactivating) already counts as deactivated.

use alloc::boxed::Box;
use core::fmt;

/// Activation state of a veil surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VeilState {
    /// Not activated and not animating.
    #[default]
    Off,
    /// Activated; fade-in still running.
    Activating,
    /// Activated and fully shown.
    On,
    /// Deactivated; fade-out still running.
    Deactivating,
}

impl VeilState {
    /// Whether the veil counts as activated.
    #[must_use]
    pub const fn is_activated(self) -> bool {
        matches!(self, Self::Activating | Self::On)
    }

    /// Whether an animation toward this state is still running.
    #[must_use]
    pub const fn is_transitioning(self) -> bool {
        matches!(self, Self::Activating | Self::Deactivating)
    }

    /// The state reached once the running animation completes.
    #[must_use]
    pub const fn settled(self) -> Self {
        match self {
            Self::Activating | Self::On => Self::On,
            Self::Deactivating | Self::Off => Self::Off,
        }
    }

    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Activating => "activating",
            Self::On => "on",
            Self::Deactivating => "deactivating",
        }
    }
}

/// A callback run once when a click dismisses an activated veil.
pub struct Dismissal {
    handler: Box<dyn FnOnce()>,
}

impl Dismissal {
    /// Wraps a dismissal callback.
    pub fn new(handler: impl FnOnce() + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Runs the callback, consuming it.
    pub fn run(self) {
        (self.handler)();
    }
}

impl fmt::Debug for Dismissal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dismissal").finish_non_exhaustive()
    }
}

/// Options for [`Registry::activate`](crate::registry::Registry::activate).
#[derive(Debug, Default)]
pub struct ActivateOptions {
    /// Arms click-to-dismiss: the first click on the activated surface
    /// deactivates the veil and yields this callback.
    pub on_dismiss: Option<Dismissal>,
}

impl ActivateOptions {
    /// Options without click-to-dismiss.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms click-to-dismiss with `handler`.
    #[must_use]
    pub fn on_dismiss(mut self, handler: impl FnOnce() + 'static) -> Self {
        self.on_dismiss = Some(Dismissal::new(handler));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;

    #[test]
    fn activation_is_logically_immediate() {
        assert!(VeilState::Activating.is_activated());
        assert!(VeilState::On.is_activated());
        assert!(!VeilState::Deactivating.is_activated());
        assert!(!VeilState::Off.is_activated());
    }

    #[test]
    fn settled_finishes_animations() {
        assert_eq!(VeilState::Activating.settled(), VeilState::On);
        assert_eq!(VeilState::Deactivating.settled(), VeilState::Off);
        assert_eq!(VeilState::On.settled(), VeilState::On);
        assert_eq!(VeilState::Off.settled(), VeilState::Off);
    }

    #[test]
    fn dismissal_runs_once() {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let options = ActivateOptions::new().on_dismiss(move || seen.set(seen.get() + 1));
        if let Some(dismissal) = options.on_dismiss {
            dismissal.run();
        }
        assert_eq!(count.get(), 1);
    }
}
