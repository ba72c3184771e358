// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry and lifecycle state machine for animated full-viewport page
//! overlays ("veils").
//!
//! `veil_core` owns the platform-independent half of a veil: identity,
//! normalized display attributes, the injection lifecycle, and the
//! activation state machine. It is `no_std` compatible (with `alloc`) and
//! talks to the document through the [`Page`](page::Page) trait, so the same
//! logic drives a real browser DOM and the in-memory
//! [`HeadlessPage`](headless::HeadlessPage) used by tests.
//!
//! # Architecture
//!
//! ```text
//!   VeilParams ──► Registry::create() ──► VeilId
//!                                            │
//!                 ┌──────────────────────────┘
//!                 ▼
//!   Registry::inject() ──► TransitionMeta ──► Page::attach_surface()
//!                                                    │
//!   activate / deactivate / toggle ──► Page::set_surface_classes()
//!                                                    │
//!                 ┌──────────────────────────────────┘
//!                 ▼
//!   PageEvent ──► Registry::dispatch() ──► Option<Dismissal>
//! ```
//!
//! **[`registry`]**: Caller-owned map from logical id to veil, generational
//! handles, and every lifecycle operation.
//!
//! **[`veil`]**: The per-instance entity: ids, stack order, fill color,
//! surface, and activation state.
//!
//! **[`state`]**: The four-state activation machine and click-to-dismiss
//! callbacks.
//!
//! **[`style`]**: Marker classes, selectors, and the embedded stylesheet
//! derived at injection.
//!
//! **[`param`]**: Normalization of loosely typed creation input.
//!
//! **[`page`]**: The [`Page`](page::Page) trait that document backends
//! implement, and the events they report.
//!
//! **[`id`]**: Random instance ids and [`VeilId`](id::VeilId) handles.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! lifecycle instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod config;
pub mod error;
pub mod headless;
pub mod id;
pub mod page;
pub mod param;
pub mod registry;
pub mod state;
pub mod style;
pub mod trace;
pub mod veil;

pub use config::VeilConfig;
pub use error::VeilError;
pub use id::VeilId;
pub use registry::Registry;
