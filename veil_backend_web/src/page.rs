// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM implementation of [`Page`].
//!
//! Surfaces are `<div>` elements appended to `document.body`, each carrying
//! its own `<style>` block. Click, `transitionend`, and `DOMContentLoaded`
//! listeners push [`PageEvent`]s onto a queue owned by the page; the owner
//! drains it with [`DomPage::next_event`], typically from the callback
//! installed with [`DomPage::set_notify`].

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use veil_core::error::VeilError;
use veil_core::page::{Page, PageEvent, SurfaceBlueprint};
use veil_core::style::escape_string;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{AddEventListenerOptions, Document, Element, Event, HtmlElement};

type Listener = Closure<dyn FnMut(Event)>;

/// Events reported by DOM listeners, awaiting dispatch.
#[derive(Default)]
struct EventQueue {
    pending: RefCell<VecDeque<PageEvent>>,
    notify: RefCell<Option<Rc<dyn Fn()>>>,
}

impl EventQueue {
    fn push(&self, event: PageEvent) {
        self.pending.borrow_mut().push_back(event);
        // Cloned out so the callback may replace itself.
        let notify = self.notify.borrow().clone();
        if let Some(notify) = notify {
            notify();
        }
    }
}

/// A surface element together with the listeners wired to it.
struct WiredSurface {
    element: HtmlElement,
    on_transition_end: Listener,
    on_click: Listener,
}

/// A [`Page`] backed by a live DOM [`Document`].
pub struct DomPage {
    document: Document,
    events: Rc<EventQueue>,
    surfaces: Vec<WiredSurface>,
    body_listener: Option<Listener>,
}

impl core::fmt::Debug for DomPage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomPage")
            .field("document", &"Document")
            .field("surfaces_len", &self.surfaces.len())
            .field("pending_events", &self.events.pending.borrow().len())
            .field("body_listener", &self.body_listener.is_some())
            .finish_non_exhaustive()
    }
}

impl DomPage {
    /// Creates a page over `document`.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            events: Rc::new(EventQueue::default()),
            surfaces: Vec::new(),
            body_listener: None,
        }
    }

    /// Creates a page over the current window's document.
    pub fn from_window() -> Result<Self, VeilError> {
        web_sys::window()
            .and_then(|window| window.document())
            .map(Self::new)
            .ok_or_else(|| VeilError::Page("no window document".into()))
    }

    /// Returns the underlying document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Installs a callback invoked after every queued event.
    pub fn set_notify(&self, notify: impl Fn() + 'static) {
        *self.events.notify.borrow_mut() = Some(Rc::new(notify));
    }

    /// Pops the oldest queued event.
    pub fn next_event(&self) -> Option<PageEvent> {
        self.events.pending.borrow_mut().pop_front()
    }

    fn root(&self) -> Option<Element> {
        self.document.document_element()
    }

    fn create<T: JsCast>(&self, tag: &str) -> Result<T, VeilError> {
        self.document
            .create_element(tag)
            .map_err(js_error)?
            .dyn_into::<T>()
            .map_err(|_| VeilError::Page(format!("<{tag}> has an unexpected element type")))
    }

    fn listener(&self, event: PageEvent) -> Listener {
        let queue = Rc::clone(&self.events);
        Closure::wrap(Box::new(move |_: Event| queue.push(event.clone())) as Box<dyn FnMut(Event)>)
    }
}

fn js_error(err: JsValue) -> VeilError {
    VeilError::Page(format!("{err:?}"))
}

impl Page for DomPage {
    type Surface = HtmlElement;

    fn find_surface(&self, composite_id: &str) -> Option<HtmlElement> {
        let selector = format!("[data-id=\"{}\"]", escape_string(composite_id));
        self.document
            .query_selector(&selector)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    }

    fn is_surface(&self, surface: &HtmlElement) -> bool {
        surface.owner_document().as_ref() == Some(&self.document)
    }

    fn root_has_marker(&self, marker: &str) -> bool {
        self.root()
            .is_some_and(|root| root.class_list().contains(marker))
    }

    fn add_root_marker(&mut self, marker: &str) {
        if let Some(root) = self.root() {
            let _ = root.class_list().add_1(marker);
        }
    }

    fn remove_root_marker(&mut self, marker: &str) {
        if let Some(root) = self.root() {
            let _ = root.class_list().remove_1(marker);
        }
    }

    fn body_available(&self) -> bool {
        self.document.body().is_some()
    }

    fn defer_until_body_available(&mut self, _composite_id: &str) {
        // One listener serves every deferred injection.
        if self.body_listener.is_some() {
            return;
        }
        let listener = self.listener(PageEvent::BodyAvailable);
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        let _ = self
            .document
            .add_event_listener_with_callback_and_add_event_listener_options(
                "DOMContentLoaded",
                listener.as_ref().unchecked_ref(),
                &options,
            );
        self.body_listener = Some(listener);
    }

    fn attach_surface(&mut self, blueprint: &SurfaceBlueprint<'_>) -> Result<HtmlElement, VeilError> {
        let body = self
            .document
            .body()
            .ok_or_else(|| VeilError::Page("document has no body".into()))?;

        let element: HtmlElement = self.create("div")?;
        element.set_id(blueprint.element_id);
        element.set_class_name(blueprint.class_list);
        element
            .set_attribute("data-id", blueprint.composite_id)
            .map_err(js_error)?;
        element.style().set_css_text(blueprint.inline_style);

        let style: HtmlElement = self.create("style")?;
        style.set_text_content(Some(blueprint.style_sheet));
        element.append_child(&style).map_err(js_error)?;

        let on_transition_end = self.listener(PageEvent::TransitionEnd {
            composite_id: blueprint.composite_id.into(),
        });
        let on_click = self.listener(PageEvent::Click {
            composite_id: blueprint.composite_id.into(),
        });
        element
            .add_event_listener_with_callback(
                "transitionend",
                on_transition_end.as_ref().unchecked_ref(),
            )
            .map_err(js_error)?;
        element
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .map_err(js_error)?;

        body.append_child(&element).map_err(js_error)?;
        self.surfaces.push(WiredSurface {
            element: element.clone(),
            on_transition_end,
            on_click,
        });
        Ok(element)
    }

    fn set_surface_classes(&mut self, surface: &HtmlElement, classes: &str) {
        surface.set_class_name(classes);
    }

    fn set_surface_style_sheet(&mut self, surface: &HtmlElement, css: &str) {
        if let Ok(Some(style)) = surface.query_selector("style") {
            style.set_text_content(Some(css));
        }
    }

    fn detach_surface(&mut self, surface: &HtmlElement) {
        if let Some(pos) = self.surfaces.iter().position(|w| w.element == *surface) {
            let wired = self.surfaces.swap_remove(pos);
            let _ = wired.element.remove_event_listener_with_callback(
                "transitionend",
                wired.on_transition_end.as_ref().unchecked_ref(),
            );
            let _ = wired
                .element
                .remove_event_listener_with_callback("click", wired.on_click.as_ref().unchecked_ref());
        }
        surface.remove();
    }
}
