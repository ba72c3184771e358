// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry configuration.
//!
//! [`VeilConfig`] carries the package namespace used for marker classes, the
//! defaults applied when caller input is missing or invalid, and the fade
//! timing baked into each surface's stylesheet.

use alloc::borrow::Cow;

/// Default fill color for new veils.
pub const DEFAULT_FILL_COLOR: &str = "rgba(0, 0, 0, 0.7)";

/// Default stacking order for new veils.
pub const DEFAULT_STACK_ORDER: u32 = 1000;

/// Length of generated instance ids.
pub const DEFAULT_ID_LENGTH: usize = 64;

/// Timing of the opacity fade between the off and activated states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionTiming {
    /// Fade duration in milliseconds.
    pub duration_ms: u32,
    /// CSS timing function (e.g. `linear`, `ease-in-out`).
    pub timing_function: Cow<'static, str>,
}

impl Default for TransitionTiming {
    fn default() -> Self {
        Self {
            duration_ms: 500,
            timing_function: Cow::Borrowed("linear"),
        }
    }
}

/// Configuration for a [`Registry`](crate::registry::Registry).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VeilConfig {
    /// Namespace prefix for the surface's base class and shared markers.
    pub package_name: Cow<'static, str>,
    /// Logical id used when a caller omits one.
    pub default_logical_id: Cow<'static, str>,
    /// Stack order used when creation input is missing or invalid.
    pub default_stack_order: u32,
    /// Fill color used when creation input is missing or invalid.
    pub default_fill_color: Cow<'static, str>,
    /// Fade timing.
    pub transition: TransitionTiming,
    /// Length of generated instance ids.
    pub id_length: usize,
    /// Seed for the instance-id generator. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl VeilConfig {
    /// Default configuration for browser pages.
    #[must_use]
    pub const fn web() -> Self {
        Self {
            package_name: Cow::Borrowed("html-veil"),
            default_logical_id: Cow::Borrowed("veil"),
            default_stack_order: DEFAULT_STACK_ORDER,
            default_fill_color: Cow::Borrowed(DEFAULT_FILL_COLOR),
            transition: TransitionTiming {
                duration_ms: 500,
                timing_function: Cow::Borrowed("linear"),
            },
            id_length: DEFAULT_ID_LENGTH,
            seed: None,
        }
    }

    /// Returns this configuration with a fixed generator seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self::web()
    }
}
