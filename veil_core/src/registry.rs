// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Caller-owned veil registry, injection lifecycle, and activation state
//! machine.
//!
//! A [`Registry`] maps each logical id to at most one registered veil and
//! owns every instance it has created. Instances are addressed by
//! generational [`VeilId`] handles; creating a veil under a logical id that
//! is already taken *displaces* the previous instance from the logical-id
//! map without tearing it down, so its handle keeps working until it is
//! [released](Registry::release).
//!
//! # Lifecycle
//!
//! ```text
//!   create ──► inject ──► activate / deactivate / toggle ──► remove ──► destroy
//!                │                    ▲
//!                │ body not ready     │ PageEvent::{TransitionEnd, Click}
//!                ▼                    │
//!          PageEvent::BodyAvailable ──┘ (dispatch)
//! ```
//!
//! Every state query and mutation fails with
//! [`VeilError::InjectionRequired`] until `inject()` has produced transition
//! metadata. Activation changes are logically immediate; the page's
//! transition-end signal only settles the visual state.
//!
//! # Superseded transitions
//!
//! Each state change bumps the instance's transition generation.
//! [`end_transition`](Registry::end_transition) ignores a completion tagged
//! with an older generation. Untagged completions (what a browser delivers)
//! settle whatever state was requested last, so a rapid toggle never leaves
//! a transitioning marker behind once any completion arrives.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use rand::rngs::SmallRng;

use crate::config::VeilConfig;
use crate::error::VeilError;
use crate::id::{VeilId, generate, id_rng};
use crate::page::{Page, PageEvent, SurfaceBlueprint};
use crate::param::VeilParams;
use crate::state::{ActivateOptions, Dismissal, VeilState};
use crate::style::{SURFACE_INLINE_STYLE, TransitionMeta};
use crate::trace::{StateChangeEvent, TraceSink, Tracer, VeilEvent};
use crate::veil::Veil;

/// Owns veils, keyed by logical id, and drives their lifecycle against a
/// [`Page`] whose surfaces are of type `S`.
///
/// Create one at application start and [`clear`](Self::clear) it at
/// teardown.
pub struct Registry<S> {
    config: VeilConfig,
    slots: Vec<Option<Veil<S>>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    by_logical: BTreeMap<String, VeilId>,
    rng: SmallRng,
    tracer: Tracer,
}

impl<S> fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("live", &self.len())
            .field("registered", &self.by_logical.len())
            .finish_non_exhaustive()
    }
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self::new(VeilConfig::default())
    }
}

impl<S> Registry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: VeilConfig) -> Self {
        Self {
            rng: id_rng(config.seed),
            config,
            slots: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            by_logical: BTreeMap::new(),
            tracer: Tracer::none(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &VeilConfig {
        &self.config
    }

    /// Installs (or with `None`, removes) the lifecycle trace sink.
    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.tracer.set_sink(sink);
    }

    // -- Registry API --

    /// Creates a veil and registers it under its logical id.
    ///
    /// A veil already registered under the same logical id is displaced from
    /// the registry but **not** torn down: its surface stays on the page
    /// until the caller [releases](Self::release) it.
    pub fn create(&mut self, params: &VeilParams) -> VeilId {
        let instance_id = generate(&mut self.rng, self.config.id_length);
        let veil = Veil::new(&self.config, params, instance_id);
        let logical_id = String::from(veil.logical_id());

        let id = if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Some(veil);
            VeilId {
                idx,
                generation: self.generation[idx as usize],
            }
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Some(veil));
            self.generation.push(0);
            VeilId { idx, generation: 0 }
        };

        if let Some(previous) = self.by_logical.insert(logical_id, id)
            && let Ok(displaced) = lookup(&self.slots, &self.generation, previous)
        {
            self.tracer.displaced(&event(displaced));
        }
        if let Ok(veil) = lookup(&self.slots, &self.generation, id) {
            self.tracer.created(&event(veil));
        }
        id
    }

    /// Returns the veil registered under `logical_id` (or the default id when
    /// `None` or empty).
    #[must_use]
    pub fn get(&self, logical_id: Option<&str>) -> Option<VeilId> {
        let key = match logical_id {
            Some(id) if !id.is_empty() => id,
            _ => self.config.default_logical_id.as_ref(),
        };
        self.by_logical.get(key).copied()
    }

    /// Returns the live instance whose composite id is `composite_id`.
    #[must_use]
    pub fn find_by_composite(&self, composite_id: &str) -> Option<VeilId> {
        self.ids().find(|&id| {
            self.veil(id)
                .is_some_and(|v| v.composite_id() == composite_id)
        })
    }

    /// Returns the veil behind `id`, if it is live.
    #[must_use]
    pub fn veil(&self, id: VeilId) -> Option<&Veil<S>> {
        lookup(&self.slots, &self.generation, id).ok()
    }

    /// Returns the veil behind `id` mutably, if it is live.
    #[must_use]
    pub fn veil_mut(&mut self, id: VeilId) -> Option<&mut Veil<S>> {
        lookup_mut(&mut self.slots, &self.generation, id).ok()
    }

    /// Whether `id` refers to a live instance.
    #[must_use]
    pub fn is_alive(&self, id: VeilId) -> bool {
        self.veil(id).is_some()
    }

    /// Whether `id` is the instance currently registered under its logical
    /// id (as opposed to a displaced one).
    #[must_use]
    pub fn is_registered(&self, id: VeilId) -> bool {
        self.veil(id)
            .is_some_and(|v| self.by_logical.get(v.logical_id()) == Some(&id))
    }

    /// Number of live instances, displaced ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no instance is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over handles of all live instances.
    pub fn ids(&self) -> impl Iterator<Item = VeilId> + '_ {
        self.slots
            .iter()
            .zip(&self.generation)
            .enumerate()
            .filter(|(_, (slot, _))| slot.is_some())
            .filter_map(|(idx, (_, &generation))| {
                Some(VeilId {
                    idx: u32::try_from(idx).ok()?,
                    generation,
                })
            })
    }

    /// Removes the veil registered under `logical_id` (or the default id)
    /// from the page and the registry.
    ///
    /// Destroying an id with nothing registered is a no-op.
    pub fn destroy<P>(&mut self, page: &mut P, logical_id: Option<&str>)
    where
        P: Page<Surface = S>,
    {
        if let Some(id) = self.get(logical_id) {
            _ = self.release(page, id);
        }
    }

    /// Tears down one specific instance (registered or displaced) and frees
    /// its handle.
    pub fn release<P>(&mut self, page: &mut P, id: VeilId) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup(&self.slots, &self.generation, id)?;
        if veil.surface().is_some() || veil.is_pending() {
            self.remove(page, id)?;
        }

        let idx = id.idx as usize;
        let Some(veil) = self.slots[idx].take() else {
            return Err(VeilError::StaleHandle);
        };
        if self.by_logical.get(veil.logical_id()) == Some(&id) {
            self.by_logical.remove(veil.logical_id());
        }
        self.generation[idx] = self.generation[idx].wrapping_add(1);
        self.free_list.push(id.idx);
        self.tracer.destroyed(&event(&veil));
        Ok(())
    }

    /// Releases every instance. Call at application teardown.
    pub fn clear<P>(&mut self, page: &mut P)
    where
        P: Page<Surface = S>,
    {
        let ids: Vec<VeilId> = self.ids().collect();
        for id in ids {
            _ = self.release(page, id);
        }
    }

    // -- Injection / lifecycle API --

    /// Attaches the veil's surface to the page.
    ///
    /// Idempotent: a surface already on the page for this instance, or an
    /// injection still in flight (loading marker on the document root),
    /// makes this a no-op. When the page body is not yet available,
    /// construction waits for [`PageEvent::BodyAvailable`].
    pub fn inject<P>(&mut self, page: &mut P, id: VeilId) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup_mut(&mut self.slots, &self.generation, id)?;
        let meta = TransitionMeta::new(
            &self.config,
            veil.logical_id(),
            veil.instance_id(),
            veil.composite_id(),
        );
        let loading_marker = meta.loading_marker.clone();
        let first = veil.meta.replace(meta).is_none();

        if page.find_surface(veil.composite_id()).is_some()
            || page.root_has_marker(&loading_marker)
        {
            if first {
                self.tracer.injected(&event(veil));
            }
            return Ok(());
        }

        self.tracer.injected(&event(veil));
        page.add_root_marker(&loading_marker);
        if page.body_available() {
            self.build_surface(page, id)
        } else {
            veil.pending_injection = true;
            page.defer_until_body_available(veil.composite_id());
            self.tracer.deferred(&event(veil));
            Ok(())
        }
    }

    /// Detaches the veil's surface and drops its transition metadata.
    ///
    /// A pending (deferred) injection is cancelled instead. Fails with
    /// [`VeilError::SurfaceMissing`] when there is neither.
    pub fn remove<P>(&mut self, page: &mut P, id: VeilId) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup_mut(&mut self.slots, &self.generation, id)?;
        if let Some(surface) = veil.take_surface() {
            page.detach_surface(&surface);
        } else if veil.pending_injection {
            if let Some(meta) = &veil.meta {
                page.remove_root_marker(&meta.loading_marker);
            }
        } else {
            return Err(VeilError::SurfaceMissing {
                composite_id: veil.composite_id().into(),
            });
        }

        veil.pending_injection = false;
        veil.meta = None;
        veil.dismiss = None;
        veil.state = VeilState::Off;
        veil.transition_generation += 1;
        self.tracer.removed(&event(veil));
        Ok(())
    }

    /// Assigns (or with `None`, clears) the veil's surface directly.
    ///
    /// Fails with [`VeilError::TypeValidation`] when `surface` is not a live
    /// surface of `page`.
    pub fn set_surface<P>(
        &mut self,
        page: &P,
        id: VeilId,
        surface: Option<S>,
    ) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup_mut(&mut self.slots, &self.generation, id)?;
        if let Some(s) = &surface
            && !page.is_surface(s)
        {
            return Err(VeilError::TypeValidation {
                expected: "a surface attached to this page",
            });
        }
        veil.set_surface(surface);
        Ok(())
    }

    /// Re-renders the embedded stylesheet after stack order or fill color
    /// changed.
    pub fn refresh_style<P>(&mut self, page: &mut P, id: VeilId) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup(&self.slots, &self.generation, id)?;
        let meta = require_meta(veil)?;
        if let Some(surface) = veil.surface() {
            let css = meta.style_sheet(&self.config, veil.stack_order(), veil.fill_color());
            page.set_surface_style_sheet(surface, &css);
        }
        Ok(())
    }

    // -- Activation state machine --

    /// Returns the activation state.
    pub fn state(&self, id: VeilId) -> Result<VeilState, VeilError> {
        let veil = lookup(&self.slots, &self.generation, id)?;
        require_meta(veil)?;
        Ok(veil.state)
    }

    /// Whether the veil is activated (fading in or shown).
    pub fn is_activated(&self, id: VeilId) -> Result<bool, VeilError> {
        self.state(id).map(VeilState::is_activated)
    }

    /// Whether the veil is deactivated (fading out or hidden).
    pub fn is_deactivated(&self, id: VeilId) -> Result<bool, VeilError> {
        self.is_activated(id).map(|activated| !activated)
    }

    /// Activates a deactivated veil; a no-op when already activated.
    ///
    /// With [`ActivateOptions::on_dismiss`], the next click on the activated
    /// surface deactivates it and yields the callback from
    /// [`dispatch`](Self::dispatch).
    pub fn activate<P>(
        &mut self,
        page: &mut P,
        id: VeilId,
        options: ActivateOptions,
    ) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup_mut(&mut self.slots, &self.generation, id)?;
        require_meta(veil)?;
        if !veil.state.is_activated() {
            change_state(page, &mut self.tracer, veil, VeilState::Activating);
            if let Some(dismissal) = options.on_dismiss {
                veil.dismiss = Some(dismissal);
            }
        }
        Ok(())
    }

    /// Deactivates an activated veil; a no-op when already deactivated.
    pub fn deactivate<P>(&mut self, page: &mut P, id: VeilId) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup_mut(&mut self.slots, &self.generation, id)?;
        require_meta(veil)?;
        if veil.state.is_activated() {
            change_state(page, &mut self.tracer, veil, VeilState::Deactivating);
        }
        Ok(())
    }

    /// Deactivates an activated veil, otherwise activates it with `options`.
    pub fn toggle<P>(
        &mut self,
        page: &mut P,
        id: VeilId,
        options: ActivateOptions,
    ) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        if self.is_activated(id)? {
            self.deactivate(page, id)
        } else {
            self.activate(page, id, options)
        }
    }

    /// Handles completion of the running transition: drops the
    /// transitioning marker and settles the state.
    ///
    /// `generation`, when given, must match the veil's current
    /// [transition generation](Veil::transition_generation); completions of
    /// superseded transitions are ignored. Returns whether the state
    /// settled.
    pub fn end_transition<P>(
        &mut self,
        page: &mut P,
        id: VeilId,
        generation: Option<u64>,
    ) -> Result<bool, VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup_mut(&mut self.slots, &self.generation, id)?;
        require_meta(veil)?;
        if generation.is_some_and(|g| g != veil.transition_generation)
            || !veil.state.is_transitioning()
        {
            return Ok(false);
        }
        let from = veil.state;
        veil.state = from.settled();
        apply_classes(page, veil);
        self.tracer.transition_end(&StateChangeEvent {
            veil: event(veil),
            from,
            to: veil.state,
            generation: veil.transition_generation,
        });
        Ok(true)
    }

    /// Handles a click on the veil's surface.
    ///
    /// If the veil is activated and click-to-dismiss is armed, deactivates
    /// it, disarms, and returns the dismissal callback for the caller to run.
    /// Later clicks have no effect.
    pub fn click<P>(&mut self, page: &mut P, id: VeilId) -> Result<Option<Dismissal>, VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup_mut(&mut self.slots, &self.generation, id)?;
        require_meta(veil)?;
        if !veil.state.is_activated() || veil.dismiss.is_none() {
            return Ok(None);
        }
        change_state(page, &mut self.tracer, veil, VeilState::Deactivating);
        self.tracer.dismissed(&event(veil));
        Ok(veil.dismiss.take())
    }

    /// Routes an asynchronous page event.
    ///
    /// Events for surfaces that are no longer attached are ignored. A click
    /// that dismisses a veil returns its callback; run it once any borrow of
    /// the registry has ended.
    pub fn dispatch<P>(
        &mut self,
        page: &mut P,
        event: PageEvent,
    ) -> Result<Option<Dismissal>, VeilError>
    where
        P: Page<Surface = S>,
    {
        match event {
            PageEvent::BodyAvailable => {
                let pending: Vec<VeilId> = self
                    .ids()
                    .filter(|&id| self.veil(id).is_some_and(Veil::is_pending))
                    .collect();
                let mut result = Ok(None);
                for id in pending {
                    if let Err(err) = self.build_surface(page, id)
                        && result.is_ok()
                    {
                        result = Err(err);
                    }
                }
                result
            }
            PageEvent::TransitionEnd { composite_id } => {
                if let Some(id) = self.attached(&composite_id) {
                    self.end_transition(page, id, None)?;
                }
                Ok(None)
            }
            PageEvent::Click { composite_id } => match self.attached(&composite_id) {
                Some(id) => self.click(page, id),
                None => Ok(None),
            },
        }
    }

    /// Builds and attaches the surface, then clears the loading marker.
    fn build_surface<P>(&mut self, page: &mut P, id: VeilId) -> Result<(), VeilError>
    where
        P: Page<Surface = S>,
    {
        let veil = lookup_mut(&mut self.slots, &self.generation, id)?;
        veil.pending_injection = false;
        let Some(meta) = &veil.meta else {
            return Ok(());
        };
        // A fresh element never runs a transition, so it starts settled.
        let settled = veil.state.settled();
        let class_list = meta.class_list(settled);
        let style_sheet = meta.style_sheet(&self.config, veil.stack_order(), veil.fill_color());
        let attached = page.attach_surface(&SurfaceBlueprint {
            element_id: veil.logical_id(),
            composite_id: veil.composite_id(),
            class_list: &class_list,
            inline_style: SURFACE_INLINE_STYLE,
            style_sheet: &style_sheet,
        });
        page.remove_root_marker(&meta.loading_marker);

        let surface = match attached {
            Ok(surface) => surface,
            Err(err) => {
                // Back to uninjected so a later inject starts clean.
                veil.meta = None;
                veil.dismiss = None;
                veil.state = VeilState::Off;
                veil.transition_generation += 1;
                return Err(err);
            }
        };
        veil.set_surface(Some(surface));
        self.tracer.attached(&event(veil));

        if veil.state != settled {
            let from = veil.state;
            veil.state = settled;
            veil.transition_generation += 1;
            self.tracer.transition_end(&StateChangeEvent {
                veil: event(veil),
                from,
                to: settled,
                generation: veil.transition_generation,
            });
        }
        Ok(())
    }

    /// The live instance with an attached surface tagged `composite_id`.
    fn attached(&self, composite_id: &str) -> Option<VeilId> {
        self.find_by_composite(composite_id)
            .filter(|&id| self.veil(id).is_some_and(|v| v.surface().is_some()))
    }
}

fn lookup<'a, S>(
    slots: &'a [Option<Veil<S>>],
    generation: &[u32],
    id: VeilId,
) -> Result<&'a Veil<S>, VeilError> {
    let idx = id.idx as usize;
    match (slots.get(idx), generation.get(idx)) {
        (Some(Some(veil)), Some(&g)) if g == id.generation => Ok(veil),
        _ => Err(VeilError::StaleHandle),
    }
}

fn lookup_mut<'a, S>(
    slots: &'a mut [Option<Veil<S>>],
    generation: &[u32],
    id: VeilId,
) -> Result<&'a mut Veil<S>, VeilError> {
    let idx = id.idx as usize;
    if generation.get(idx) != Some(&id.generation) {
        return Err(VeilError::StaleHandle);
    }
    slots
        .get_mut(idx)
        .and_then(Option::as_mut)
        .ok_or(VeilError::StaleHandle)
}

fn require_meta<S>(veil: &Veil<S>) -> Result<&TransitionMeta, VeilError> {
    veil.meta.as_ref().ok_or_else(|| VeilError::InjectionRequired {
        composite_id: veil.composite_id().into(),
    })
}

fn event<S>(veil: &Veil<S>) -> VeilEvent<'_> {
    VeilEvent {
        logical_id: veil.logical_id(),
        composite_id: veil.composite_id(),
    }
}

/// Writes the class list derived from the veil's state onto its surface.
fn apply_classes<P: Page>(page: &mut P, veil: &Veil<P::Surface>) {
    if let (Some(surface), Some(meta)) = (veil.surface(), &veil.meta) {
        page.set_surface_classes(surface, &meta.class_list(veil.state));
    }
}

fn change_state<P: Page>(
    page: &mut P,
    tracer: &mut Tracer,
    veil: &mut Veil<P::Surface>,
    to: VeilState,
) {
    let from = veil.state;
    veil.state = to;
    veil.transition_generation += 1;
    apply_classes(page, veil);
    tracer.state_changed(&StateChangeEvent {
        veil: event(veil),
        from,
        to,
        generation: veil.transition_generation,
    });
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use super::*;
    use crate::headless::{HeadlessPage, NodeRef};

    fn registry() -> Registry<NodeRef> {
        Registry::new(VeilConfig::web().with_seed(7))
    }

    fn injected(
        registry: &mut Registry<NodeRef>,
        page: &mut HeadlessPage,
        logical_id: &str,
    ) -> VeilId {
        let id = registry.create(&VeilParams::new().logical_id(logical_id));
        registry.inject(page, id).unwrap();
        id
    }

    fn surface(registry: &Registry<NodeRef>, id: VeilId) -> NodeRef {
        *registry.veil(id).unwrap().surface().unwrap()
    }

    fn counter() -> (Rc<Cell<u32>>, ActivateOptions) {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let options = ActivateOptions::new().on_dismiss(move || seen.set(seen.get() + 1));
        (count, options)
    }

    #[test]
    fn create_then_get_returns_same_instance() {
        let mut reg = registry();
        let id = reg.create(&VeilParams::new().logical_id("overlay"));
        assert_eq!(reg.get(Some("overlay")), Some(id));
        assert_eq!(reg.veil(id).unwrap().logical_id(), "overlay");
        assert_eq!(reg.get(Some("other")), None);
    }

    #[test]
    fn get_without_id_uses_default() {
        let mut reg = registry();
        let id = reg.create(&VeilParams::new());
        assert_eq!(reg.get(None), Some(id));
        assert_eq!(reg.get(Some("")), Some(id));
    }

    #[test]
    fn composite_id_joins_logical_and_instance() {
        let mut reg = registry();
        let id = reg.create(&VeilParams::new().logical_id("overlay"));
        let veil = reg.veil(id).unwrap();
        assert_eq!(veil.instance_id().len(), 64);
        assert_eq!(
            veil.composite_id(),
            alloc::format!("overlay-{}", veil.instance_id())
        );
    }

    #[test]
    fn destroy_unknown_id_is_a_no_op() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = reg.create(&VeilParams::new().logical_id("kept"));
        reg.destroy(&mut page, Some("missing"));
        assert!(reg.is_alive(id));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn destroy_removes_surface_and_entry() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        assert_eq!(page.len(), 1);
        reg.destroy(&mut page, Some("overlay"));
        assert!(page.is_empty());
        assert!(!reg.is_alive(id));
        assert_eq!(reg.get(Some("overlay")), None);
    }

    #[test]
    fn destroy_never_injected_veil_succeeds() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = reg.create(&VeilParams::new());
        reg.destroy(&mut page, None);
        assert!(!reg.is_alive(id));
    }

    #[test]
    fn recreating_logical_id_displaces_without_teardown() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let first = injected(&mut reg, &mut page, "overlay");
        let second = reg.create(&VeilParams::new().logical_id("overlay"));

        assert_eq!(reg.get(Some("overlay")), Some(second));
        assert!(reg.is_registered(second));
        assert!(!reg.is_registered(first));
        // The first surface is still on the page and its handle still works.
        assert!(reg.is_alive(first));
        assert_eq!(page.len(), 1);

        reg.destroy(&mut page, Some("overlay"));
        assert_eq!(page.len(), 1, "destroy only tears down the registered veil");
        reg.release(&mut page, first).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn released_handles_go_stale() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let old = reg.create(&VeilParams::new());
        reg.release(&mut page, old).unwrap();
        let new = reg.create(&VeilParams::new());
        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert_eq!(reg.inject(&mut page, old), Err(VeilError::StaleHandle));
        assert!(reg.is_alive(new));
    }

    #[test]
    fn inject_attaches_surface_with_identity_and_style() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        let veil = reg.veil(id).unwrap();
        let node = page.node(veil.surface().unwrap()).unwrap();
        assert_eq!(node.element_id, "overlay");
        assert_eq!(node.composite_id, veil.composite_id());
        assert_eq!(node.classes, "html-veil");
        assert_eq!(node.inline_style, SURFACE_INLINE_STYLE);
        assert_eq!(node.style_sheet.lines().count(), 3);
        assert!(page.root_classes().is_empty(), "loading marker cleared");
    }

    #[test]
    fn inject_twice_attaches_one_surface() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        reg.inject(&mut page, id).unwrap();
        let composite = reg.veil(id).unwrap().composite_id();
        assert_eq!(page.surface_count(composite), 1);
        assert_eq!(page.attach_count(), 1);
    }

    #[test]
    fn inject_defers_until_body_is_available() {
        let mut reg = registry();
        let mut page = HeadlessPage::loading();
        let id = injected(&mut reg, &mut page, "overlay");
        let veil = reg.veil(id).unwrap();
        let loading = veil.meta().unwrap().loading_marker.clone();

        assert!(veil.is_injected());
        assert!(veil.is_pending());
        assert!(veil.surface().is_none());
        assert!(page.root_has_marker(&loading));

        // A second injection while loading neither re-defers nor re-marks.
        reg.inject(&mut page, id).unwrap();
        assert_eq!(page.root_classes().len(), 1);

        let ready = page.set_body_available().unwrap();
        assert!(reg.dispatch(&mut page, ready).unwrap().is_none());
        assert!(reg.veil(id).unwrap().surface().is_some());
        assert!(!page.root_has_marker(&loading));
        assert_eq!(page.attach_count(), 1);

        // The deferred build fires at most once.
        reg.dispatch(&mut page, PageEvent::BodyAvailable).unwrap();
        assert_eq!(page.attach_count(), 1);
    }

    #[test]
    fn state_operations_require_injection() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = reg.create(&VeilParams::new());
        let required = |err: VeilError| matches!(err, VeilError::InjectionRequired { .. });

        assert!(reg.is_activated(id).is_err_and(required));
        assert!(reg.is_deactivated(id).is_err_and(required));
        assert!(
            reg.activate(&mut page, id, ActivateOptions::new())
                .is_err_and(required)
        );
        assert!(reg.deactivate(&mut page, id).is_err_and(required));
        assert!(
            reg.toggle(&mut page, id, ActivateOptions::new())
                .is_err_and(required)
        );
        assert!(reg.end_transition(&mut page, id, None).is_err_and(required));
        assert!(reg.refresh_style(&mut page, id).is_err_and(required));
    }

    #[test]
    fn activation_is_immediate() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();

        assert!(reg.is_activated(id).unwrap());
        assert!(!reg.is_deactivated(id).unwrap());
        assert_eq!(reg.state(id).unwrap(), VeilState::Activating);

        let meta = reg.veil(id).unwrap().meta().unwrap().clone();
        let node = page.node(&surface(&reg, id)).unwrap();
        assert!(node.has_classes(&meta.transitioning_marker));
        assert!(node.has_classes(&meta.activated_marker));
    }

    #[test]
    fn transition_end_settles_state() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        let node = surface(&reg, id);
        let meta = reg.veil(id).unwrap().meta().unwrap().clone();

        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        let done = page.transition_end(&node).unwrap();
        reg.dispatch(&mut page, done.clone()).unwrap();
        assert_eq!(reg.state(id).unwrap(), VeilState::On);
        let classes = &page.node(&node).unwrap().classes;
        assert_eq!(*classes, meta.class_list(VeilState::On));

        reg.deactivate(&mut page, id).unwrap();
        assert!(reg.is_deactivated(id).unwrap());
        assert!(page.node(&node).unwrap().has_classes(&meta.transitioning_marker));
        reg.dispatch(&mut page, done).unwrap();
        assert_eq!(reg.state(id).unwrap(), VeilState::Off);
        assert_eq!(page.node(&node).unwrap().classes, "html-veil");
    }

    #[test]
    fn activate_and_deactivate_are_idempotent() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");

        reg.deactivate(&mut page, id).unwrap();
        assert_eq!(reg.state(id).unwrap(), VeilState::Off);
        assert_eq!(reg.veil(id).unwrap().transition_generation(), 0);

        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        assert_eq!(reg.veil(id).unwrap().transition_generation(), 1);
    }

    #[test]
    fn toggle_flips_state() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        reg.toggle(&mut page, id, ActivateOptions::new()).unwrap();
        assert!(reg.is_activated(id).unwrap());
        reg.toggle(&mut page, id, ActivateOptions::new()).unwrap();
        assert!(reg.is_deactivated(id).unwrap());
        assert_eq!(reg.state(id).unwrap(), VeilState::Deactivating);
    }

    #[test]
    fn rapid_toggle_settles_on_last_request() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        let node = surface(&reg, id);

        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        reg.deactivate(&mut page, id).unwrap();
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();

        // A single, coalesced completion settles the last requested state.
        let done = page.transition_end(&node).unwrap();
        reg.dispatch(&mut page, done.clone()).unwrap();
        assert_eq!(reg.state(id).unwrap(), VeilState::On);
        let meta = reg.veil(id).unwrap().meta().unwrap().clone();
        assert!(!page.node(&node).unwrap().has_classes(&meta.transitioning_marker));

        // Further completions are no-ops.
        reg.dispatch(&mut page, done).unwrap();
        assert_eq!(reg.state(id).unwrap(), VeilState::On);
    }

    #[test]
    fn superseded_transition_completion_is_ignored() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");

        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        let fade_in = reg.veil(id).unwrap().transition_generation();
        reg.deactivate(&mut page, id).unwrap();
        let fade_out = reg.veil(id).unwrap().transition_generation();

        assert!(!reg.end_transition(&mut page, id, Some(fade_in)).unwrap());
        assert_eq!(reg.state(id).unwrap(), VeilState::Deactivating);
        assert!(reg.end_transition(&mut page, id, Some(fade_out)).unwrap());
        assert_eq!(reg.state(id).unwrap(), VeilState::Off);
    }

    #[test]
    fn click_dismisses_exactly_once() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        let node = surface(&reg, id);
        let (count, options) = counter();

        reg.activate(&mut page, id, options).unwrap();
        assert!(reg.veil(id).unwrap().is_dismissable());

        let click = page.click(&node).unwrap();
        let dismissal = reg.dispatch(&mut page, click.clone()).unwrap();
        dismissal.unwrap().run();
        assert_eq!(count.get(), 1);
        assert!(reg.is_deactivated(id).unwrap());

        assert!(reg.dispatch(&mut page, click).unwrap().is_none());
        assert_eq!(count.get(), 1);
        assert!(reg.is_deactivated(id).unwrap());
    }

    #[test]
    fn click_while_deactivated_keeps_dismissal_armed() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        let node = surface(&reg, id);
        let (count, options) = counter();

        reg.activate(&mut page, id, options).unwrap();
        reg.deactivate(&mut page, id).unwrap();
        let click = page.click(&node).unwrap();
        assert!(reg.dispatch(&mut page, click.clone()).unwrap().is_none());
        assert!(reg.veil(id).unwrap().is_dismissable());

        // Reactivating without options re-uses the armed callback.
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        reg.dispatch(&mut page, click).unwrap().unwrap().run();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn click_without_dismissal_does_nothing() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        let node = surface(&reg, id);
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        let click = page.click(&node).unwrap();
        assert!(reg.dispatch(&mut page, click).unwrap().is_none());
        assert!(reg.is_activated(id).unwrap());
    }

    #[test]
    fn remove_clears_surface_and_metadata() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        let node = surface(&reg, id);
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();

        reg.remove(&mut page, id).unwrap();
        let veil = reg.veil(id).unwrap();
        assert!(veil.surface().is_none());
        assert!(veil.meta().is_none());
        assert!(!page.is_surface(&node));
        assert!(matches!(
            reg.is_activated(id),
            Err(VeilError::InjectionRequired { .. })
        ));

        // Events for the detached surface are dropped.
        let stale = PageEvent::TransitionEnd {
            composite_id: reg.veil(id).unwrap().composite_id().into(),
        };
        assert!(reg.dispatch(&mut page, stale).unwrap().is_none());
    }

    #[test]
    fn remove_requires_a_surface() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = reg.create(&VeilParams::new());
        assert!(matches!(
            reg.remove(&mut page, id),
            Err(VeilError::SurfaceMissing { .. })
        ));
    }

    #[test]
    fn remove_cancels_deferred_injection() {
        let mut reg = registry();
        let mut page = HeadlessPage::loading();
        let id = injected(&mut reg, &mut page, "overlay");
        reg.remove(&mut page, id).unwrap();
        assert!(page.root_classes().is_empty());

        let ready = page.set_body_available().unwrap();
        reg.dispatch(&mut page, ready).unwrap();
        assert!(page.is_empty());
        assert!(reg.veil(id).unwrap().surface().is_none());
    }

    #[test]
    fn reinject_after_remove_builds_fresh_surface() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        reg.remove(&mut page, id).unwrap();
        reg.inject(&mut page, id).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.attach_count(), 2);
        assert_eq!(reg.state(id).unwrap(), VeilState::Off);
    }

    #[test]
    fn activation_before_body_is_applied_on_attach() {
        let mut reg = registry();
        let mut page = HeadlessPage::loading();
        let id = injected(&mut reg, &mut page, "overlay");
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();

        let ready = page.set_body_available().unwrap();
        reg.dispatch(&mut page, ready).unwrap();
        let veil = reg.veil(id).unwrap();
        assert_eq!(veil.state(), VeilState::On);
        let meta = veil.meta().unwrap().clone();
        let node = page.node(&surface(&reg, id)).unwrap();
        assert!(node.has_classes(&meta.activated_marker));
        assert!(!node.has_classes(&meta.transitioning_marker));
    }

    #[test]
    fn deactivation_before_body_attaches_settled_off() {
        let mut reg = registry();
        let mut page = HeadlessPage::loading();
        let id = injected(&mut reg, &mut page, "overlay");
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        reg.deactivate(&mut page, id).unwrap();
        let ready = page.set_body_available().unwrap();
        reg.dispatch(&mut page, ready).unwrap();

        assert_eq!(reg.state(id).unwrap(), VeilState::Off);
        let node = page.node(&surface(&reg, id)).unwrap();
        assert_eq!(node.classes, "html-veil");
    }

    /// Delegates to a [`HeadlessPage`] but refuses to attach surfaces.
    struct RefusingPage(HeadlessPage);

    impl Page for RefusingPage {
        type Surface = NodeRef;

        fn find_surface(&self, composite_id: &str) -> Option<NodeRef> {
            self.0.find_surface(composite_id)
        }
        fn is_surface(&self, surface: &NodeRef) -> bool {
            self.0.is_surface(surface)
        }
        fn root_has_marker(&self, marker: &str) -> bool {
            self.0.root_has_marker(marker)
        }
        fn add_root_marker(&mut self, marker: &str) {
            self.0.add_root_marker(marker);
        }
        fn remove_root_marker(&mut self, marker: &str) {
            self.0.remove_root_marker(marker);
        }
        fn body_available(&self) -> bool {
            self.0.body_available()
        }
        fn defer_until_body_available(&mut self, composite_id: &str) {
            self.0.defer_until_body_available(composite_id);
        }
        fn attach_surface(&mut self, _: &SurfaceBlueprint<'_>) -> Result<NodeRef, VeilError> {
            Err(VeilError::Page("attach refused".into()))
        }
        fn set_surface_classes(&mut self, surface: &NodeRef, classes: &str) {
            self.0.set_surface_classes(surface, classes);
        }
        fn set_surface_style_sheet(&mut self, surface: &NodeRef, css: &str) {
            self.0.set_surface_style_sheet(surface, css);
        }
        fn detach_surface(&mut self, surface: &NodeRef) {
            self.0.detach_surface(surface);
        }
    }

    #[test]
    fn failed_attach_leaves_veil_uninjected() {
        let mut reg = registry();
        let mut page = RefusingPage(HeadlessPage::new());
        let id = reg.create(&VeilParams::new().logical_id("overlay"));
        let required = |err: VeilError| matches!(err, VeilError::InjectionRequired { .. });

        assert!(matches!(
            reg.inject(&mut page, id),
            Err(VeilError::Page(msg)) if msg == "attach refused"
        ));
        let veil = reg.veil(id).unwrap();
        assert!(!veil.is_injected());
        assert!(!veil.is_pending());
        assert!(veil.surface().is_none());
        assert_eq!(veil.state(), VeilState::Off);
        assert!(page.0.root_classes().is_empty(), "loading marker cleared");

        assert!(reg.is_activated(id).is_err_and(required));
        assert!(
            reg.activate(&mut page, id, ActivateOptions::new())
                .is_err_and(required)
        );
        assert!(matches!(
            reg.remove(&mut page, id),
            Err(VeilError::SurfaceMissing { .. })
        ));

        // A working page takes the same veil from scratch.
        let mut page = HeadlessPage::new();
        reg.inject(&mut page, id).unwrap();
        assert!(reg.veil(id).unwrap().surface().is_some());
        assert_eq!(reg.is_activated(id), Ok(false));
    }

    #[test]
    fn failed_deferred_attach_drops_activation() {
        let mut reg = registry();
        let mut page = RefusingPage(HeadlessPage::loading());
        let id = reg.create(&VeilParams::new().logical_id("overlay"));
        reg.inject(&mut page, id).unwrap();
        let (count, options) = counter();
        reg.activate(&mut page, id, options).unwrap();

        let ready = page.0.set_body_available().unwrap();
        assert!(matches!(
            reg.dispatch(&mut page, ready),
            Err(VeilError::Page(_))
        ));
        let veil = reg.veil(id).unwrap();
        assert!(!veil.is_injected());
        assert_eq!(veil.state(), VeilState::Off);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn set_surface_validates_handle() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let a = injected(&mut reg, &mut page, "a");
        let b = reg.create(&VeilParams::new().logical_id("b"));
        let node = surface(&reg, a);

        reg.set_surface(&page, b, Some(node)).unwrap();
        assert_eq!(reg.veil(b).unwrap().surface(), Some(&node));

        reg.remove(&mut page, a).unwrap();
        assert!(matches!(
            reg.set_surface(&page, b, Some(node)),
            Err(VeilError::TypeValidation { .. })
        ));
        reg.set_surface(&page, b, None).unwrap();
        assert!(reg.veil(b).unwrap().surface().is_none());
    }

    #[test]
    fn refresh_style_rewrites_stylesheet() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "overlay");
        let node = surface(&reg, id);

        let veil = reg.veil_mut(id).unwrap();
        veil.set_stack_order(42);
        veil.set_fill_color("white");
        assert!(!page.node(&node).unwrap().style_sheet.contains("z-index: 42"));

        reg.refresh_style(&mut page, id).unwrap();
        let css = &page.node(&node).unwrap().style_sheet;
        assert!(css.contains("z-index: 42;"));
        assert!(css.contains("background-color: white;"));
    }

    #[test]
    fn clear_releases_everything() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        injected(&mut reg, &mut page, "a");
        injected(&mut reg, &mut page, "a");
        injected(&mut reg, &mut page, "b");
        assert_eq!(page.len(), 3);
        reg.clear(&mut page);
        assert!(reg.is_empty());
        assert!(page.is_empty());
        assert_eq!(reg.get(Some("a")), None);
    }

    #[test]
    fn same_logical_id_surfaces_do_not_collide() {
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        let first = injected(&mut reg, &mut page, "overlay");
        let second = injected(&mut reg, &mut page, "overlay");
        assert_eq!(page.len(), 2);

        reg.activate(&mut page, second, ActivateOptions::new()).unwrap();
        assert!(reg.is_deactivated(first).unwrap());
        assert_eq!(
            page.node(&surface(&reg, first)).unwrap().classes,
            "html-veil"
        );
    }

    #[cfg(feature = "trace")]
    #[test]
    fn lifecycle_is_traced() {
        use alloc::vec;
        use core::cell::RefCell;

        #[derive(Default)]
        struct Log(Vec<&'static str>);
        impl TraceSink for Log {
            fn on_created(&mut self, _: &VeilEvent<'_>) {
                self.0.push("created");
            }
            fn on_displaced(&mut self, _: &VeilEvent<'_>) {
                self.0.push("displaced");
            }
            fn on_attached(&mut self, _: &VeilEvent<'_>) {
                self.0.push("attached");
            }
            fn on_state_changed(&mut self, _: &StateChangeEvent<'_>) {
                self.0.push("state");
            }
            fn on_removed(&mut self, _: &VeilEvent<'_>) {
                self.0.push("removed");
            }
            fn on_destroyed(&mut self, _: &VeilEvent<'_>) {
                self.0.push("destroyed");
            }
        }

        let log = Rc::new(RefCell::new(Log::default()));
        let mut reg = registry();
        let mut page = HeadlessPage::new();
        reg.set_trace_sink(Some(Box::new(Rc::clone(&log))));
        let id = injected(&mut reg, &mut page, "overlay");
        reg.create(&VeilParams::new().logical_id("overlay"));
        reg.activate(&mut page, id, ActivateOptions::new()).unwrap();
        reg.release(&mut page, id).unwrap();
        assert_eq!(
            log.borrow().0,
            vec![
                "created",
                "attached",
                "displaced",
                "created",
                "state",
                "removed",
                "destroyed"
            ]
        );
    }

    #[cfg(feature = "trace")]
    #[test]
    fn repeated_inject_traces_once() {
        use core::cell::RefCell;

        #[derive(Default)]
        struct Count(u32);
        impl TraceSink for Count {
            fn on_injected(&mut self, _: &VeilEvent<'_>) {
                self.0 += 1;
            }
        }

        let count = Rc::new(RefCell::new(Count::default()));
        let mut reg = registry();
        reg.set_trace_sink(Some(Box::new(Rc::clone(&count))));

        let mut page = HeadlessPage::new();
        let id = injected(&mut reg, &mut page, "ready");
        reg.inject(&mut page, id).unwrap();
        reg.inject(&mut page, id).unwrap();
        assert_eq!(count.borrow().0, 1);

        let mut page = HeadlessPage::loading();
        let id = injected(&mut reg, &mut page, "loading");
        reg.inject(&mut page, id).unwrap();
        assert_eq!(count.borrow().0, 2);
    }
}
