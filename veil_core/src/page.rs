// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host page contract.
//!
//! The registry never touches a document directly. Everything it needs from
//! the host page goes through [`Page`]:
//!
//! - **Queries** - whether a surface for a composite id already exists, and
//!   whether the document root carries a marker class.
//! - **Root markers** - the per-instance loading marker set during injection.
//! - **Surface lifecycle** - building and appending a surface from a
//!   [`SurfaceBlueprint`], rewriting its class list or stylesheet, detaching
//!   it.
//! - **Events** - backends report asynchronous page activity as
//!   [`PageEvent`] values, which callers feed to
//!   [`Registry::dispatch`](crate::registry::Registry::dispatch).
//!
//! The web backend implements this over the DOM; [`HeadlessPage`] implements
//! it in memory for native hosts and tests.
//!
//! [`HeadlessPage`]: crate::headless::HeadlessPage

use alloc::string::String;

use crate::error::VeilError;

/// Everything a backend needs to build a surface.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceBlueprint<'a> {
    /// Element id (the veil's logical id).
    pub element_id: &'a str,
    /// Value of the `data-id` attribute (the composite id).
    pub composite_id: &'a str,
    /// Initial class list.
    pub class_list: &'a str,
    /// Inline style of the container.
    pub inline_style: &'a str,
    /// Text of the embedded `<style>` block.
    pub style_sheet: &'a str,
}

/// Asynchronous page activity routed back into the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageEvent {
    /// The page body became available; deferred injections may proceed.
    BodyAvailable,
    /// A surface finished its opacity transition.
    TransitionEnd {
        /// Composite id of the surface.
        composite_id: String,
    },
    /// A surface was clicked.
    Click {
        /// Composite id of the surface.
        composite_id: String,
    },
}

/// The host page a [`Registry`](crate::registry::Registry) attaches surfaces
/// to.
///
/// Implementations must report [`PageEvent::TransitionEnd`] and
/// [`PageEvent::Click`] for surfaces they attach, and
/// [`PageEvent::BodyAvailable`] once after
/// [`defer_until_body_available`](Self::defer_until_body_available).
pub trait Page {
    /// Handle to an attached surface.
    type Surface: Clone;

    /// Returns the surface tagged with `composite_id`, if one is attached.
    fn find_surface(&self, composite_id: &str) -> Option<Self::Surface>;

    /// Whether `surface` is a live surface of this page.
    fn is_surface(&self, surface: &Self::Surface) -> bool;

    /// Whether the document root carries `marker`.
    fn root_has_marker(&self, marker: &str) -> bool;

    /// Adds `marker` to the document root's class list.
    fn add_root_marker(&mut self, marker: &str);

    /// Removes `marker` from the document root's class list.
    fn remove_root_marker(&mut self, marker: &str);

    /// Whether the page body exists yet.
    fn body_available(&self) -> bool;

    /// Arranges for a single [`PageEvent::BodyAvailable`] once the body
    /// exists. Repeated calls before it fires must not multiply the event.
    fn defer_until_body_available(&mut self, composite_id: &str);

    /// Builds a surface from `blueprint`, appends it to the body and wires
    /// its click and transition-end events.
    fn attach_surface(
        &mut self,
        blueprint: &SurfaceBlueprint<'_>,
    ) -> Result<Self::Surface, VeilError>;

    /// Replaces the class list of `surface`.
    fn set_surface_classes(&mut self, surface: &Self::Surface, classes: &str);

    /// Replaces the text of the stylesheet embedded in `surface`.
    fn set_surface_style_sheet(&mut self, surface: &Self::Surface, css: &str);

    /// Detaches `surface` from the page and drops its event wiring.
    fn detach_surface(&mut self, surface: &Self::Surface);
}
