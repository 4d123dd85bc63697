//! Event delivery.

use crate::types::Event;

/// Fire-and-forget event consumer. Emitting never fails a placement.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

/// Discards every event.
impl EventSink for () {
    fn emit(&mut self, _event: Event) {}
}
