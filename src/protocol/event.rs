//! Fixed-size interaction records sent by the renderer.

use serde::Serialize;

/// Bytes per inbound record: five big-endian `i32` fields.
pub const EVENT_RECORD_SIZE: usize = 20;

/// What happened in the renderer window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Motion,
    ButtonPress,
    ButtonRelease,
    KeyPress,
    Replot,
    Reset,
    /// Font metrics or window size changed; `mx`/`my` carry the new logical size.
    FontProps,
    Pending,
    Raise,
    Other(i32),
}

impl EventKind {
    pub fn code(self) -> i32 {
        match self {
            Self::Motion => 0,
            Self::ButtonPress => 1,
            Self::ButtonRelease => 2,
            Self::KeyPress => 3,
            Self::Replot => 5,
            Self::Reset => 6,
            Self::FontProps => 7,
            Self::Pending => 8,
            Self::Raise => 9,
            Self::Other(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Motion,
            1 => Self::ButtonPress,
            2 => Self::ButtonRelease,
            3 => Self::KeyPress,
            5 => Self::Replot,
            6 => Self::Reset,
            7 => Self::FontProps,
            8 => Self::Pending,
            9 => Self::Raise,
            other => Self::Other(other),
        }
    }
}

/// One interaction record: `{kind, mx, my, par1, par2}`.
///
/// For button events `par1` is the button number; for key presses it is the
/// key code (zero means no key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub mx: i32,
    pub my: i32,
    pub par1: i32,
    pub par2: i32,
}

impl InboundEvent {
    pub fn new(kind: EventKind, mx: i32, my: i32, par1: i32, par2: i32) -> Self {
        Self {
            kind,
            mx,
            my,
            par1,
            par2,
        }
    }

    pub fn to_bytes(&self) -> [u8; EVENT_RECORD_SIZE] {
        let mut out = [0u8; EVENT_RECORD_SIZE];
        let fields = [self.kind.code(), self.mx, self.my, self.par1, self.par2];
        for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; EVENT_RECORD_SIZE]) -> Self {
        let mut fields = [0i32; 5];
        for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
            *field = i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self {
            kind: EventKind::from_code(fields[0]),
            mx: fields[1],
            my: fields[2],
            par1: fields[3],
            par2: fields[4],
        }
    }
}

/// Accumulates raw bytes from the channel and hands out complete records.
#[derive(Debug, Default)]
pub struct EventBuffer {
    pending: Vec<u8>,
}

impl EventBuffer {
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Pop the next complete record; a trailing partial record stays buffered.
    pub fn next_event(&mut self) -> Option<InboundEvent> {
        if self.pending.len() < EVENT_RECORD_SIZE {
            return None;
        }
        let mut record = [0u8; EVENT_RECORD_SIZE];
        record.copy_from_slice(&self.pending[..EVENT_RECORD_SIZE]);
        self.pending.drain(..EVENT_RECORD_SIZE);
        Some(InboundEvent::from_bytes(&record))
    }

    pub fn buffered_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
