//! Turns renderer records into core events.

use crate::coords::to_device;
use crate::options::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::pause::PauseState;
use crate::protocol::{EventKind, InboundEvent};

/// The core's generic event handler.
pub trait EventSink {
    fn handle_event(&mut self, event: &InboundEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&InboundEvent),
{
    fn handle_event(&mut self, event: &InboundEvent) {
        self(event)
    }
}

/// Requested logical window size; `pending` marks a request not yet applied by
/// the next `graphics()` call. The default size starts out pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRequest {
    pub pending: bool,
    pub width: i32,
    pub height: i32,
}

impl Default for SizeRequest {
    fn default() -> Self {
        Self {
            pending: true,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl SizeRequest {
    pub fn request(&mut self, width: i32, height: i32) {
        self.pending = true;
        self.width = width;
        self.height = height;
    }

    /// Hand out a pending request exactly once.
    pub fn take_pending(&mut self) -> Option<(i32, i32)> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some((self.width, self.height))
    }
}

/// Everything one inbound record can touch.
pub struct Translator<'a> {
    pub size: &'a mut SizeRequest,
    pub pause: &'a mut PauseState,
    pub sink: &'a mut dyn EventSink,
}

impl Translator<'_> {
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Forward one record to the sink; true when it satisfied a pending pause.
    ///
    /// Resize notifications carry the new logical size and are recorded as a
    /// size request. Every other record is mapped back into device space
    /// against the current logical height.
    pub fn process(&mut self, mut event: InboundEvent) -> bool {
        if event.kind == EventKind::FontProps {
            self.size.request(event.mx, event.my);
        } else {
            let (x, y) = to_device(event.mx, event.my, self.size.height);
            event.mx = x;
            event.my = y;
        }
        self.sink.handle_event(&event);
        self.pause.resolve(&event)
    }
}
