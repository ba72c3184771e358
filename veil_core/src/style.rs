// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marker classes, selectors, and the embedded stylesheet.
//!
//! A surface's visual state is encoded purely through class membership. The
//! stylesheet embedded in each surface keys three rules on per-instance
//! selectors:
//!
//! | selector                | z-index        | opacity | notes                 |
//! |-------------------------|----------------|---------|-----------------------|
//! | `[data-id="<composite>"]` | `-1`         | `0`     | off; carries the fade |
//! | transitioning selector  | stack order    | (none)  | animation window      |
//! | activated selector      | stack order    | `1`     | shown                 |
//!
//! Rules share specificity, so later rules override earlier ones.

use alloc::format;
use alloc::string::String;
use core::fmt::Write as _;

use crate::config::VeilConfig;
use crate::state::VeilState;

/// Inline style of every surface: a fixed, full-viewport container.
pub const SURFACE_INLINE_STYLE: &str = "position: fixed; top: 0; left: 0; right: 0; bottom: 0;";

/// Derived per-instance class names and selectors.
///
/// Created by [`Registry::inject`](crate::registry::Registry::inject) and
/// dropped by [`Registry::remove`](crate::registry::Registry::remove).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionMeta {
    /// Base class carried by the surface in every state.
    pub base_class: String,
    /// Selector matching exactly this instance's surface.
    pub surface_selector: String,
    /// Class put on the document root while the surface is being built.
    pub loading_marker: String,
    /// Space-separated classes present while activated.
    pub activated_marker: String,
    /// Selector for the instance-specific activated class.
    pub activated_selector: String,
    /// Space-separated classes present while an animation runs.
    pub transitioning_marker: String,
    /// Selector for the instance-specific transitioning class.
    pub transitioning_selector: String,
}

impl TransitionMeta {
    /// Derives markers for the instance `instance_id` of `logical_id`.
    #[must_use]
    pub fn new(
        config: &VeilConfig,
        logical_id: &str,
        instance_id: &str,
        composite_id: &str,
    ) -> Self {
        let pkg = class_token(&config.package_name);
        let logical = class_token(logical_id);
        let activated = format!("{logical}-activated-{instance_id}");
        let transitioning = format!("{logical}-transitioning-{instance_id}");
        Self {
            surface_selector: format!("[data-id=\"{}\"]", escape_string(composite_id)),
            loading_marker: format!("{logical}-loading-{instance_id}"),
            activated_marker: format!("{pkg}-activated {logical}-activated {activated}"),
            activated_selector: format!(".{}", escape_ident(&activated)),
            transitioning_marker: format!(
                "{pkg}-transitioning {logical}-transitioning {transitioning}"
            ),
            transitioning_selector: format!(".{}", escape_ident(&transitioning)),
            base_class: pkg,
        }
    }

    /// Returns the surface class string for `state`.
    #[must_use]
    pub fn class_list(&self, state: VeilState) -> String {
        match state {
            VeilState::Off => self.base_class.clone(),
            VeilState::Activating => format!(
                "{} {} {}",
                self.base_class, self.transitioning_marker, self.activated_marker
            ),
            VeilState::On => format!("{} {}", self.base_class, self.activated_marker),
            VeilState::Deactivating => {
                format!("{} {}", self.base_class, self.transitioning_marker)
            }
        }
    }

    /// Renders the embedded stylesheet for the given attributes.
    #[must_use]
    pub fn style_sheet(&self, config: &VeilConfig, stack_order: u32, fill_color: &str) -> String {
        let mut css = String::new();
        let timing = &config.transition;
        _ = writeln!(
            css,
            "{} {{ z-index: -1; background-color: {fill_color}; opacity: 0; \
             transition-property: opacity; transition-duration: {}ms; \
             transition-timing-function: {}; transition-delay: 0s; }}",
            self.surface_selector, timing.duration_ms, timing.timing_function,
        );
        _ = writeln!(
            css,
            "{} {{ z-index: {stack_order}; }}",
            self.transitioning_selector
        );
        _ = write!(
            css,
            "{} {{ z-index: {stack_order}; opacity: 1; }}",
            self.activated_selector
        );
        css
    }
}

/// Turns an arbitrary id into a single class token (whitespace separates
/// tokens in a class list, so it is replaced).
#[must_use]
pub fn class_token(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Escapes `ident` for use as a CSS identifier (e.g. after `.` in a class
/// selector).
#[must_use]
pub fn escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let lone_dash = ident == "-";
    let starts_with_dash = ident.starts_with('-');
    for (i, c) in ident.chars().enumerate() {
        let leading_digit =
            c.is_ascii_digit() && (i == 0 || (i == 1 && starts_with_dash));
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => push_hex_escape(&mut out, c),
            _ if leading_digit => push_hex_escape(&mut out, c),
            '-' if lone_dash => out.push_str("\\-"),
            '-' | '_' => out.push(c),
            _ if c.is_ascii_alphanumeric() || !c.is_ascii() => out.push(c),
            _ => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

/// Escapes `s` for use inside a double-quoted CSS string.
#[must_use]
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => push_hex_escape(&mut out, c),
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn push_hex_escape(out: &mut String, c: char) {
    _ = write!(out, "\\{:x} ", u32::from(c));
}
