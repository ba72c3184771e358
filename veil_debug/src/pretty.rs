// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Instance ids
//! are long, so lines show the logical id plus a short instance prefix.

use std::io::Write;

use veil_core::trace::{StateChangeEvent, TraceSink, VeilEvent};

/// Number of instance-id characters shown per line.
const INSTANCE_PREFIX: usize = 8;

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn line(&mut self, tag: &str, e: &VeilEvent<'_>) {
        let _ = writeln!(self.writer, "[{tag}] {}", label(e));
    }

    fn state_line(&mut self, tag: &str, e: &StateChangeEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[{tag}] {} {} -> {} gen={}",
            label(&e.veil),
            e.from.as_str(),
            e.to.as_str(),
            e.generation,
        );
    }
}

/// `logical#prefix`, where `prefix` starts the instance id.
fn label(e: &VeilEvent<'_>) -> String {
    let instance = e
        .composite_id
        .strip_prefix(e.logical_id)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(e.composite_id);
    let prefix: String = instance.chars().take(INSTANCE_PREFIX).collect();
    format!("{}#{prefix}", e.logical_id)
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_created(&mut self, e: &VeilEvent<'_>) {
        self.line("create", e);
    }

    fn on_displaced(&mut self, e: &VeilEvent<'_>) {
        self.line("displace", e);
    }

    fn on_injected(&mut self, e: &VeilEvent<'_>) {
        self.line("inject", e);
    }

    fn on_deferred(&mut self, e: &VeilEvent<'_>) {
        self.line("defer", e);
    }

    fn on_attached(&mut self, e: &VeilEvent<'_>) {
        self.line("attach", e);
    }

    fn on_state_changed(&mut self, e: &StateChangeEvent<'_>) {
        self.state_line("state", e);
    }

    fn on_transition_end(&mut self, e: &StateChangeEvent<'_>) {
        self.state_line("settle", e);
    }

    fn on_dismissed(&mut self, e: &VeilEvent<'_>) {
        self.line("dismiss", e);
    }

    fn on_removed(&mut self, e: &VeilEvent<'_>) {
        self.line("remove", e);
    }

    fn on_destroyed(&mut self, e: &VeilEvent<'_>) {
        self.line("destroy", e);
    }
}
