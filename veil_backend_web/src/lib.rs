// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for veil.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`DomPage`]: DOM implementation of [`Page`] (surface elements, root
//!   markers, click / `transitionend` / `DOMContentLoaded` events)
//! - [`VeilHost`]: `#[wasm_bindgen]` facade exposing a registry to
//!   JavaScript, with [`VeilHandle`] per veil
//!
//! From JavaScript:
//!
//! ```js
//! const host = new VeilHost();
//! const veil = host.create({ id: "loading", stack_order: 2000 });
//! veil.inject();
//! veil.activate({ on_dismiss: () => console.log("dismissed") });
//! ```

#![no_std]

extern crate alloc;

mod host;
mod page;

pub use host::{VeilHandle, VeilHost};
pub use page::DomPage;
pub use veil_core::page::Page;
