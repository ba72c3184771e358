// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JavaScript-facing facade.
//!
//! [`VeilHost`] owns a [`Registry`] together with the [`DomPage`] it drives
//! and hands out [`VeilHandle`]s, one per created veil. Page events are
//! dispatched as soon as the DOM reports them; click-to-dismiss callbacks run
//! after the host has released its state, so they may call back into it.

use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString as _};
use core::cell::RefCell;

use js_sys::{Function, Reflect};
use veil_core::VeilConfig;
use veil_core::error::VeilError;
use veil_core::id::VeilId;
use veil_core::param::{ParamValue, VeilParams};
use veil_core::registry::Registry;
use veil_core::state::{ActivateOptions, Dismissal};
use veil_core::veil::Veil;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::page::DomPage;

struct HostState {
    registry: Registry<HtmlElement>,
    page: DomPage,
}

/// Registry of page veils, exported to JavaScript.
#[wasm_bindgen]
#[derive(Clone)]
pub struct VeilHost {
    state: Rc<RefCell<HostState>>,
}

impl core::fmt::Debug for VeilHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("VeilHost")
                .field("registry", &state.registry)
                .field("page", &state.page)
                .finish(),
            Err(_) => f.debug_struct("VeilHost").finish_non_exhaustive(),
        }
    }
}

impl VeilHost {
    /// Creates a host over `page` with the given configuration.
    #[must_use]
    pub fn with_page(config: VeilConfig, page: DomPage) -> Self {
        let state = Rc::new_cyclic(|weak: &Weak<RefCell<HostState>>| {
            let weak = weak.clone();
            page.set_notify(move || {
                if let Some(state) = weak.upgrade() {
                    drain(&state);
                }
            });
            RefCell::new(HostState {
                registry: Registry::new(config),
                page,
            })
        });
        Self { state }
    }

    /// Runs `f` against the registry and page, then dispatches queued page
    /// events.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut Registry<HtmlElement>, &mut DomPage) -> Result<R, VeilError>,
    ) -> Result<R, JsError> {
        let result = {
            let mut state = self.state.try_borrow_mut().map_err(|_| busy())?;
            let HostState { registry, page } = &mut *state;
            f(registry, page)
        };
        drain(&self.state);
        result.map_err(to_js_error)
    }

    fn handle(&self, id: VeilId) -> VeilHandle {
        VeilHandle {
            host: self.clone(),
            id,
        }
    }
}

#[wasm_bindgen]
impl VeilHost {
    /// Creates a host over the current window's document.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<Self, JsError> {
        let page = DomPage::from_window().map_err(to_js_error)?;
        Ok(Self::with_page(VeilConfig::web(), page))
    }

    /// Creates a veil from `{ id, stack_order, fill_color }` (all optional)
    /// and registers it, displacing any veil with the same id.
    pub fn create(&self, params: JsValue) -> Result<VeilHandle, JsError> {
        let params = parse_params(&params);
        let id = self.with(|registry, _| Ok(registry.create(&params)))?;
        Ok(self.handle(id))
    }

    /// Returns the veil registered under `id` (default id when omitted).
    pub fn get(&self, id: Option<String>) -> Result<Option<VeilHandle>, JsError> {
        let state = self.state.try_borrow().map_err(|_| busy())?;
        Ok(state.registry.get(id.as_deref()).map(|found| self.handle(found)))
    }

    /// Removes the veil registered under `id` from the page and the registry.
    pub fn destroy(&self, id: Option<String>) -> Result<(), JsError> {
        self.with(|registry, page| {
            registry.destroy(page, id.as_deref());
            Ok(())
        })
    }

    /// Releases every veil, displaced ones included.
    pub fn clear(&self) -> Result<(), JsError> {
        self.with(|registry, page| {
            registry.clear(page);
            Ok(())
        })
    }
}

/// One veil instance, exported to JavaScript.
#[wasm_bindgen]
#[derive(Clone, Debug)]
pub struct VeilHandle {
    host: VeilHost,
    id: VeilId,
}

impl VeilHandle {
    fn read<R>(&self, f: impl FnOnce(&Veil<HtmlElement>) -> R) -> Result<R, JsError> {
        self.host
            .with(|registry, _| registry.veil(self.id).map(f).ok_or(VeilError::StaleHandle))
    }
}

#[wasm_bindgen]
impl VeilHandle {
    /// Logical id.
    pub fn logical_id(&self) -> Result<String, JsError> {
        self.read(|v| v.logical_id().into())
    }

    /// Random instance id.
    pub fn instance_id(&self) -> Result<String, JsError> {
        self.read(|v| v.instance_id().into())
    }

    /// `<logical>-<instance>`, the surface's `data-id`.
    pub fn composite_id(&self) -> Result<String, JsError> {
        self.read(|v| v.composite_id().into())
    }

    /// Stacking order.
    pub fn stack_order(&self) -> Result<u32, JsError> {
        self.read(Veil::stack_order)
    }

    /// Sets the stacking order; non-numeric input keeps the current value.
    /// Call [`refresh_style`](Self::refresh_style) to restyle an injected
    /// veil.
    pub fn set_stack_order(&self, value: JsValue) -> Result<u32, JsError> {
        let value = param(&value);
        self.host.with(|registry, _| {
            let veil = registry.veil_mut(self.id).ok_or(VeilError::StaleHandle)?;
            Ok(veil.set_stack_order(value))
        })
    }

    /// Fill color.
    pub fn fill_color(&self) -> Result<String, JsError> {
        self.read(|v| v.fill_color().into())
    }

    /// Sets the fill color; non-string input keeps the current value.
    pub fn set_fill_color(&self, value: JsValue) -> Result<String, JsError> {
        let value = param(&value);
        self.host.with(|registry, _| {
            let veil = registry.veil_mut(self.id).ok_or(VeilError::StaleHandle)?;
            Ok(veil.set_fill_color(value).into())
        })
    }

    /// The surface element, if attached.
    pub fn element(&self) -> Result<Option<HtmlElement>, JsError> {
        self.read(|v| v.surface().cloned())
    }

    /// Replaces the surface element; `null` clears it.
    pub fn set_element(&self, value: JsValue) -> Result<(), JsError> {
        let surface = if value.is_null() || value.is_undefined() {
            None
        } else {
            Some(value.dyn_into::<HtmlElement>().map_err(|_| {
                to_js_error(VeilError::TypeValidation {
                    expected: "an instance of HTMLElement",
                })
            })?)
        };
        self.host
            .with(|registry, page| registry.set_surface(page, self.id, surface))
    }

    /// Attaches the surface to the page (deferred until the body exists).
    pub fn inject(&self) -> Result<(), JsError> {
        self.host.with(|registry, page| registry.inject(page, self.id))
    }

    /// Detaches the surface.
    pub fn remove(&self) -> Result<(), JsError> {
        self.host.with(|registry, page| registry.remove(page, self.id))
    }

    /// Re-renders the embedded stylesheet from the current attributes.
    pub fn refresh_style(&self) -> Result<(), JsError> {
        self.host
            .with(|registry, page| registry.refresh_style(page, self.id))
    }

    /// Whether the veil is activated.
    pub fn is_activated(&self) -> Result<bool, JsError> {
        self.host.with(|registry, _| registry.is_activated(self.id))
    }

    /// Whether the veil is deactivated.
    pub fn is_deactivated(&self) -> Result<bool, JsError> {
        self.host.with(|registry, _| registry.is_deactivated(self.id))
    }

    /// `"off"`, `"activating"`, `"on"`, or `"deactivating"`.
    pub fn state(&self) -> Result<String, JsError> {
        self.host
            .with(|registry, _| registry.state(self.id).map(|s| s.as_str().into()))
    }

    /// Activates the veil. With `{ on_dismiss }`, a click on the activated
    /// surface deactivates it and calls `on_dismiss` once.
    pub fn activate(&self, options: JsValue) -> Result<(), JsError> {
        let options = parse_options(&options);
        self.host
            .with(|registry, page| registry.activate(page, self.id, options))
    }

    /// Deactivates the veil.
    pub fn deactivate(&self) -> Result<(), JsError> {
        self.host
            .with(|registry, page| registry.deactivate(page, self.id))
    }

    /// Deactivates an activated veil, otherwise activates it with `options`.
    pub fn toggle(&self, options: JsValue) -> Result<(), JsError> {
        let options = parse_options(&options);
        self.host
            .with(|registry, page| registry.toggle(page, self.id, options))
    }
}

/// Dispatches queued page events, running dismissal callbacks with the state
/// released.
fn drain(state: &RefCell<HostState>) {
    loop {
        let dismissal = {
            // A host call in progress drains on its way out.
            let Ok(mut guard) = state.try_borrow_mut() else {
                return;
            };
            let HostState { registry, page } = &mut *guard;
            let Some(event) = page.next_event() else {
                return;
            };
            // Page events have no caller to report failures to.
            registry.dispatch(page, event).ok().flatten()
        };
        if let Some(dismissal) = dismissal {
            dismissal.run();
        }
    }
}

fn busy() -> JsError {
    JsError::new("veil host is busy")
}

fn to_js_error(err: VeilError) -> JsError {
    JsError::new(&err.to_string())
}

fn property(object: &JsValue, key: &str) -> JsValue {
    Reflect::get(object, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn param(value: &JsValue) -> ParamValue {
    if let Some(n) = value.as_f64() {
        ParamValue::Number(n)
    } else if let Some(s) = value.as_string() {
        ParamValue::Text(s)
    } else {
        ParamValue::Other
    }
}

fn parse_params(params: &JsValue) -> VeilParams {
    VeilParams {
        logical_id: property(params, "id").as_string(),
        stack_order: param(&property(params, "stack_order")),
        fill_color: param(&property(params, "fill_color")),
    }
}

fn parse_options(options: &JsValue) -> ActivateOptions {
    let on_dismiss = property(options, "on_dismiss")
        .dyn_into::<Function>()
        .ok()
        .map(|callback| {
            Dismissal::new(move || {
                let _ = callback.call0(&JsValue::NULL);
            })
        });
    ActivateOptions { on_dismiss }
}
