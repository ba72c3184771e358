// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loosely typed caller input and its normalisation.
//!
//! Veil attributes are often fed from untyped sources (JavaScript objects,
//! data attributes, query strings). [`ParamValue`] carries such input as-is;
//! the `normalize_*` functions turn it into a stored value, silently falling
//! back to the previous or default value when the input is unusable.

use alloc::borrow::Cow;
use alloc::string::String;

/// Largest stack order a page accepts (CSS `z-index` is a signed 32-bit
/// integer).
pub const MAX_STACK_ORDER: u32 = i32::MAX as u32;

/// A loosely typed attribute value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ParamValue {
    /// A number.
    Number(f64),
    /// A string.
    Text(String),
    /// Anything else (absent, null, booleans, objects).
    #[default]
    Other,
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Cow<'_, str>> for ParamValue {
    fn from(v: Cow<'_, str>) -> Self {
        Self::Text(v.into_owned())
    }
}

impl From<bool> for ParamValue {
    fn from(_: bool) -> Self {
        Self::Other
    }
}

impl<T: Into<Self>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Other, Into::into)
    }
}

/// Normalises a stack order: numbers (and strings that are entirely a
/// number) become `abs(floor(x))`, saturated at [`MAX_STACK_ORDER`]; anything
/// else, including non-finite numbers, yields `fallback`.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "magnitude is a non-negative integer below i32::MAX"
)]
pub fn normalize_stack_order(input: &ParamValue, fallback: u32) -> u32 {
    let number = match input {
        ParamValue::Number(x) => *x,
        ParamValue::Text(s) => match parse_number(s) {
            Some(x) => x,
            None => return fallback,
        },
        ParamValue::Other => return fallback,
    };
    if !number.is_finite() {
        return fallback;
    }
    let magnitude = number.floor().abs();
    if magnitude >= f64::from(MAX_STACK_ORDER) {
        MAX_STACK_ORDER
    } else {
        magnitude as u32
    }
}

/// Normalises a fill color: strings are kept verbatim, anything else yields
/// `fallback`.
#[must_use]
pub fn normalize_fill_color(input: &ParamValue, fallback: &str) -> String {
    match input {
        ParamValue::Text(s) => s.clone(),
        _ => fallback.into(),
    }
}

/// Parses a string that consists of a single decimal number (surrounding
/// whitespace allowed). Partial numbers like `"12px"` and hex literals are
/// rejected.
fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Creation parameters for a veil.
///
/// Every field is optional; missing or invalid values fall back to the
/// registry's [`VeilConfig`](crate::config::VeilConfig) defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VeilParams {
    /// Logical id. Empty ids are treated as absent.
    pub logical_id: Option<String>,
    /// Stacking order.
    pub stack_order: ParamValue,
    /// Fill color.
    pub fill_color: ParamValue,
}

impl VeilParams {
    /// Creates empty parameters (all defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the logical id.
    #[must_use]
    pub fn logical_id(mut self, id: impl Into<String>) -> Self {
        self.logical_id = Some(id.into());
        self
    }

    /// Sets the stacking order.
    #[must_use]
    pub fn stack_order(mut self, order: impl Into<ParamValue>) -> Self {
        self.stack_order = order.into();
        self
    }

    /// Sets the fill color.
    #[must_use]
    pub fn fill_color(mut self, color: impl Into<ParamValue>) -> Self {
        self.fill_color = color.into();
        self
    }
}
