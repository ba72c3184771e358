// Copyright 2026 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON exporter.
//!
//! [`export`] writes events recorded by a
//! [`RecorderSink`](super::recorder::RecorderSink) as a JSON array with one
//! object per event, numbered by arrival order.

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::RecordedEvent;

/// Exports recorded events as a pretty-printed JSON array.
///
/// Every object carries `seq`, `name`, `logical_id`, and `composite_id`;
/// state events add `from`, `to`, and `generation`.
pub fn export(events: &[RecordedEvent], writer: &mut dyn Write) -> io::Result<()> {
    let values: Vec<Value> = events
        .iter()
        .enumerate()
        .map(|(seq, event)| {
            let veil = event.veil();
            let mut value = json!({
                "seq": seq,
                "name": event.name(),
                "logical_id": veil.logical_id,
                "composite_id": veil.composite_id,
            });
            if let RecordedEvent::StateChanged(s) | RecordedEvent::TransitionEnd(s) = event
                && let Some(object) = value.as_object_mut()
            {
                object.insert("from".into(), json!(s.from.as_str()));
                object.insert("to".into(), json!(s.to.as_str()));
                object.insert("generation".into(), json!(s.generation));
            }
            value
        })
        .collect();

    serde_json::to_writer_pretty(writer, &values)?;
    Ok(())
}
