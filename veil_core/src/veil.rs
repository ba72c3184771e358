// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The veil entity.

use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::config::VeilConfig;
use crate::param::{ParamValue, VeilParams, normalize_fill_color, normalize_stack_order};
use crate::state::{Dismissal, VeilState};
use crate::style::TransitionMeta;

/// A logical overlay instance.
///
/// Identity (`logical_id`, `instance_id`, `composite_id`) is fixed at
/// creation. Stack order and fill color are validated on every write. The
/// surface handle is `Some` exactly while the veil is injected and not yet
/// removed; it is assigned by the [`Registry`](crate::registry::Registry).
pub struct Veil<S> {
    logical_id: String,
    instance_id: String,
    composite_id: String,
    stack_order: u32,
    fill_color: String,
    surface: Option<S>,

    pub(crate) state: VeilState,
    pub(crate) meta: Option<TransitionMeta>,
    /// Bumped on every state change so stale completions can be told apart.
    pub(crate) transition_generation: u64,
    pub(crate) dismiss: Option<Dismissal>,
    /// Surface construction is waiting for the page body.
    pub(crate) pending_injection: bool,
}

impl<S> Veil<S> {
    pub(crate) fn new(config: &VeilConfig, params: &VeilParams, instance_id: String) -> Self {
        let logical_id = match params.logical_id.as_deref() {
            Some(id) if !id.is_empty() => String::from(id),
            _ => String::from(config.default_logical_id.as_ref()),
        };
        let composite_id = format!("{logical_id}-{instance_id}");
        Self {
            stack_order: normalize_stack_order(&params.stack_order, config.default_stack_order),
            fill_color: normalize_fill_color(&params.fill_color, &config.default_fill_color),
            logical_id,
            instance_id,
            composite_id,
            surface: None,
            state: VeilState::Off,
            meta: None,
            transition_generation: 0,
            dismiss: None,
            pending_injection: false,
        }
    }

    /// Public key under which the veil is registered.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Random token generated at construction.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// `logical_id` and `instance_id` joined by `-`; addresses this
    /// instance's surface among siblings sharing the logical id.
    #[must_use]
    pub fn composite_id(&self) -> &str {
        &self.composite_id
    }

    /// Stacking order used while activated or transitioning.
    #[must_use]
    pub fn stack_order(&self) -> u32 {
        self.stack_order
    }

    /// Sets the stacking order, keeping the current value if `input` is not
    /// numeric. Returns the stored value.
    ///
    /// An attached surface keeps its old stylesheet until
    /// [`Registry::refresh_style`](crate::registry::Registry::refresh_style).
    pub fn set_stack_order(&mut self, input: impl Into<ParamValue>) -> u32 {
        self.stack_order = normalize_stack_order(&input.into(), self.stack_order);
        self.stack_order
    }

    /// Fill color of the surface.
    #[must_use]
    pub fn fill_color(&self) -> &str {
        &self.fill_color
    }

    /// Sets the fill color, keeping the current value if `input` is not
    /// text. Returns the stored value.
    pub fn set_fill_color(&mut self, input: impl Into<ParamValue>) -> &str {
        self.fill_color = normalize_fill_color(&input.into(), &self.fill_color);
        &self.fill_color
    }

    /// The attached surface, if injected.
    #[must_use]
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub(crate) fn set_surface(&mut self, surface: Option<S>) {
        self.surface = surface;
    }

    pub(crate) fn take_surface(&mut self) -> Option<S> {
        self.surface.take()
    }

    /// Current activation state.
    #[must_use]
    pub fn state(&self) -> VeilState {
        self.state
    }

    /// Transition metadata, present between `inject()` and `remove()`.
    #[must_use]
    pub fn meta(&self) -> Option<&TransitionMeta> {
        self.meta.as_ref()
    }

    /// Whether `inject()` has produced transition metadata.
    #[must_use]
    pub fn is_injected(&self) -> bool {
        self.meta.is_some()
    }

    /// Whether surface construction is waiting for the page body.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending_injection
    }

    /// Generation of the most recent state change.
    #[must_use]
    pub fn transition_generation(&self) -> u64 {
        self.transition_generation
    }

    /// Whether a click will dismiss the veil.
    #[must_use]
    pub fn is_dismissable(&self) -> bool {
        self.dismiss.is_some()
    }
}

impl<S> fmt::Debug for Veil<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Veil")
            .field("logical_id", &self.logical_id)
            .field("composite_id", &self.composite_id)
            .field("stack_order", &self.stack_order)
            .field("fill_color", &self.fill_color)
            .field("has_surface", &self.surface.is_some())
            .field("state", &self.state)
            .field("injected", &self.meta.is_some())
            .finish_non_exhaustive()
    }
}
