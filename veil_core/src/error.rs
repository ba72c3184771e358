// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type shared by registry operations and page backends.

use alloc::string::String;
use core::fmt;

/// Errors from [`Registry`](crate::registry::Registry) operations and
/// [`Page`](crate::page::Page) backends.
///
/// Invalid attribute input is never an error: stack orders and fill colors
/// silently fall back (see [`param`](crate::param)). Re-injecting, destroying
/// an unknown id, or activating an active veil are no-ops, not errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VeilError {
    /// A state query or mutation ran before `inject()` produced transition
    /// metadata (or after `remove()` cleared it).
    InjectionRequired {
        /// Composite id of the offending instance.
        composite_id: String,
    },
    /// A value assigned as a veil's surface is not a page surface.
    TypeValidation {
        /// What the surface slot accepts.
        expected: &'static str,
    },
    /// `remove()` was called on a veil that has no surface and no pending
    /// injection.
    SurfaceMissing {
        /// Composite id of the offending instance.
        composite_id: String,
    },
    /// The [`VeilId`](crate::id::VeilId) refers to an instance that has been
    /// released.
    StaleHandle,
    /// The page backend failed to build or attach a surface.
    Page(String),
}

impl fmt::Display for VeilError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InjectionRequired { composite_id } => write!(
                f,
                "veil {composite_id} must be injected before it can do anything"
            ),
            Self::TypeValidation { expected } => {
                write!(f, "a veil's surface must be {expected}")
            }
            Self::SurfaceMissing { composite_id } => {
                write!(f, "veil {composite_id} has no surface to remove")
            }
            Self::StaleHandle => f.write_str("veil handle refers to a released instance"),
            Self::Page(msg) => write!(f, "page backend error: {msg}"),
        }
    }
}

impl core::error::Error for VeilError {}
