// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory page for native hosts and tests.
//!
//! [`HeadlessPage`] models just enough of a document for the registry:
//! root marker classes, body availability, and an arena of surfaces
//! addressed by generational [`NodeRef`] handles. It never emits events by
//! itself; callers synthesise them with [`click`](HeadlessPage::click),
//! [`transition_end`](HeadlessPage::transition_end) and
//! [`set_body_available`](HeadlessPage::set_body_available), then feed them
//! to [`Registry::dispatch`](crate::registry::Registry::dispatch).

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::VeilError;
use crate::page::{Page, PageEvent, SurfaceBlueprint};

/// Handle to a surface in a [`HeadlessPage`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    idx: u32,
    generation: u32,
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({}@gen{})", self.idx, self.generation)
    }
}

/// A surface attached to a [`HeadlessPage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceNode {
    /// Element id.
    pub element_id: String,
    /// `data-id` attribute.
    pub composite_id: String,
    /// Class list.
    pub classes: String,
    /// Inline style.
    pub inline_style: String,
    /// Embedded stylesheet text.
    pub style_sheet: String,
}

impl SurfaceNode {
    /// Whether the class list contains every token of `marker`.
    #[must_use]
    pub fn has_classes(&self, marker: &str) -> bool {
        marker
            .split_whitespace()
            .all(|token| self.classes.split_whitespace().any(|c| c == token))
    }
}

/// An in-memory [`Page`].
#[derive(Debug)]
pub struct HeadlessPage {
    root_classes: Vec<String>,
    body_available: bool,
    body_listener_armed: bool,
    deferred: Vec<String>,
    nodes: Vec<Option<SurfaceNode>>,
    generation: Vec<u32>,
    attach_count: usize,
}

impl Default for HeadlessPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPage {
    /// Creates a page whose body is already available.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root_classes: Vec::new(),
            body_available: true,
            body_listener_armed: false,
            deferred: Vec::new(),
            nodes: Vec::new(),
            generation: Vec::new(),
            attach_count: 0,
        }
    }

    /// Creates a page that is still loading (no body yet).
    #[must_use]
    pub fn loading() -> Self {
        Self {
            body_available: false,
            ..Self::new()
        }
    }

    /// Makes the body available. Returns the pending
    /// [`PageEvent::BodyAvailable`] if an injection was deferred.
    pub fn set_body_available(&mut self) -> Option<PageEvent> {
        self.body_available = true;
        if self.body_listener_armed {
            self.body_listener_armed = false;
            self.deferred.clear();
            Some(PageEvent::BodyAvailable)
        } else {
            None
        }
    }

    /// Composite ids whose injection waits for the body.
    #[must_use]
    pub fn deferred(&self) -> &[String] {
        &self.deferred
    }

    /// Classes currently on the document root.
    #[must_use]
    pub fn root_classes(&self) -> &[String] {
        &self.root_classes
    }

    /// Returns the node behind `node`, if it is live.
    #[must_use]
    pub fn node(&self, node: &NodeRef) -> Option<&SurfaceNode> {
        if self.generation.get(node.idx as usize) != Some(&node.generation) {
            return None;
        }
        self.nodes.get(node.idx as usize)?.as_ref()
    }

    /// Number of attached surfaces tagged with `composite_id`.
    #[must_use]
    pub fn surface_count(&self, composite_id: &str) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter(|n| n.composite_id == composite_id)
            .count()
    }

    /// Number of attached surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Whether no surface is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of surfaces ever attached.
    #[must_use]
    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    /// Synthesises a click on `node`.
    #[must_use]
    pub fn click(&self, node: &NodeRef) -> Option<PageEvent> {
        self.node(node).map(|n| PageEvent::Click {
            composite_id: n.composite_id.clone(),
        })
    }

    /// Synthesises a completed transition on `node`.
    #[must_use]
    pub fn transition_end(&self, node: &NodeRef) -> Option<PageEvent> {
        self.node(node).map(|n| PageEvent::TransitionEnd {
            composite_id: n.composite_id.clone(),
        })
    }

    fn node_mut(&mut self, node: &NodeRef) -> Option<&mut SurfaceNode> {
        if self.generation.get(node.idx as usize) != Some(&node.generation) {
            return None;
        }
        self.nodes.get_mut(node.idx as usize)?.as_mut()
    }
}

impl Page for HeadlessPage {
    type Surface = NodeRef;

    fn find_surface(&self, composite_id: &str) -> Option<NodeRef> {
        let idx = self.nodes.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|n| n.composite_id == composite_id)
        })?;
        Some(NodeRef {
            idx: u32::try_from(idx).ok()?,
            generation: self.generation[idx],
        })
    }

    fn is_surface(&self, surface: &NodeRef) -> bool {
        self.node(surface).is_some()
    }

    fn root_has_marker(&self, marker: &str) -> bool {
        self.root_classes.iter().any(|c| c == marker)
    }

    fn add_root_marker(&mut self, marker: &str) {
        if !self.root_has_marker(marker) {
            self.root_classes.push(marker.into());
        }
    }

    fn remove_root_marker(&mut self, marker: &str) {
        self.root_classes.retain(|c| c != marker);
    }

    fn body_available(&self) -> bool {
        self.body_available
    }

    fn defer_until_body_available(&mut self, composite_id: &str) {
        self.body_listener_armed = true;
        if !self.deferred.iter().any(|c| c == composite_id) {
            self.deferred.push(composite_id.into());
        }
    }

    fn attach_surface(&mut self, blueprint: &SurfaceBlueprint<'_>) -> Result<NodeRef, VeilError> {
        if !self.body_available {
            return Err(VeilError::Page("document has no body".into()));
        }
        let node = SurfaceNode {
            element_id: blueprint.element_id.into(),
            composite_id: blueprint.composite_id.into(),
            classes: blueprint.class_list.into(),
            inline_style: blueprint.inline_style.into(),
            style_sheet: blueprint.style_sheet.into(),
        };
        let idx = self.nodes.len();
        let idx32 = u32::try_from(idx).map_err(|_| VeilError::Page("too many surfaces".into()))?;
        self.nodes.push(Some(node));
        self.generation.push(0);
        self.attach_count += 1;
        Ok(NodeRef {
            idx: idx32,
            generation: 0,
        })
    }

    fn set_surface_classes(&mut self, surface: &NodeRef, classes: &str) {
        if let Some(node) = self.node_mut(surface) {
            node.classes = classes.into();
        }
    }

    fn set_surface_style_sheet(&mut self, surface: &NodeRef, css: &str) {
        if let Some(node) = self.node_mut(surface) {
            node.style_sheet = css.into();
        }
    }

    fn detach_surface(&mut self, surface: &NodeRef) {
        if self.node(surface).is_some() {
            let idx = surface.idx as usize;
            self.nodes[idx] = None;
            self.generation[idx] += 1;
        }
    }
}
