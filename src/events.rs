//! Event sinks for position notifications.
//!
//! The navigation controller never talks to history, progress bars or other
//! consumers directly. Every [`PagerEvent`] goes through an injected
//! [`EventSink`].

use std::cell::RefCell;
use std::io::Write;

use tracing::{debug, warn};

use crate::model::{PagerEvent, RelocateEvent};

/// Receiver of emitted events.
pub trait EventSink {
    /// Deliver one event.
    fn emit(&self, event: PagerEvent);
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<PagerEvent>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<PagerEvent> {
        self.events.borrow().clone()
    }

    /// Remove and return the recorded events.
    pub fn take(&self) -> Vec<PagerEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Recorded relocate payloads.
    pub fn relocates(&self) -> Vec<RelocateEvent> {
        self.events
            .borrow()
            .iter()
            .filter_map(PagerEvent::as_relocate)
            .cloned()
            .collect()
    }

    /// Most recent relocate payload.
    pub fn last_relocate(&self) -> Option<RelocateEvent> {
        self.events
            .borrow()
            .iter()
            .rev()
            .find_map(PagerEvent::as_relocate)
            .cloned()
    }

    /// Number of recorded `load` events.
    pub fn loads(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, PagerEvent::Load { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PagerEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Sink that logs events at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PagerEvent) {
        debug!(?event, "Pager event");
    }
}

/// Sink that writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: RefCell<W>,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: RefCell::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&self, event: PagerEvent) {
        let mut writer = self.writer.borrow_mut();
        let result = serde_json::to_writer(&mut *writer, &event)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));
        if let Err(e) = result {
            warn!(error = %e, "Failed to write event");
        }
    }
}

/// Fans events out to two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn emit(&self, event: PagerEvent) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RelocateReason, SectionIndex};

    fn relocate(index: usize) -> PagerEvent {
        PagerEvent::Relocate(RelocateEvent {
            reason: RelocateReason::Navigation,
            index: SectionIndex::new(index),
            fraction: 0.0,
            page_number: Some(0),
            page_count: Some(1),
            range: None,
        })
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(PagerEvent::GoTo {
            will_load_new_index: true,
        });
        sink.emit(relocate(1));
        sink.emit(PagerEvent::DidDisplay);

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.relocates().len(), 1);
        assert_eq!(sink.last_relocate().unwrap().index, SectionIndex::new(1));
        assert_eq!(sink.take().len(), 3);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn json_lines_sink_writes_one_object_per_line() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.emit(relocate(2));
        sink.emit(PagerEvent::DidDisplay);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "relocate");
        assert_eq!(first["index"], 2);
        assert_eq!(lines[1], r#"{"type":"didDisplay"}"#);
    }

    #[test]
    fn tee_delivers_to_both_sinks() {
        let tee = Tee(RecordingSink::new(), RecordingSink::new());
        tee.emit(relocate(0));
        assert_eq!(tee.0.events(), tee.1.events());
        assert_eq!(tee.0.loads(), 0);
    }
}
