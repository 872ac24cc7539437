//! "pause mouse" bookkeeping.

use bitflags::bitflags;

use crate::protocol::{EventKind, InboundEvent};

bitflags! {
    /// Interactions that end a pending pause. Empty means not paused.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PauseMask: u8 {
        const BUTTON1 = 1 << 0;
        const BUTTON2 = 1 << 1;
        const BUTTON3 = 1 << 2;
        const KEYSTROKE = 1 << 3;
        const CLICK = Self::BUTTON1.bits() | Self::BUTTON2.bits() | Self::BUTTON3.bits();
        const ANY = Self::CLICK.bits() | Self::KEYSTROKE.bits();
    }
}

impl PauseMask {
    /// Bit for a renderer button number (1..=3).
    pub fn for_button(button: i32) -> Self {
        match button {
            1 => Self::BUTTON1,
            2 => Self::BUTTON2,
            3 => Self::BUTTON3,
            _ => Self::empty(),
        }
    }
}

/// Which interaction, if any, the core is blocked on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseState {
    mask: PauseMask,
}

impl PauseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for any interaction in `mask`. An empty mask cancels.
    pub fn request(&mut self, mask: PauseMask) {
        self.mask = mask;
    }

    pub fn cancel(&mut self) {
        self.mask = PauseMask::empty();
    }

    pub fn is_paused(&self) -> bool {
        !self.mask.is_empty()
    }

    pub fn mask(&self) -> PauseMask {
        self.mask
    }

    /// Feed one forwarded event; returns true when it ended the pause.
    ///
    /// A release of any awaited button clears the whole wait, as does a key
    /// press carrying a real key while keystrokes are awaited.
    pub fn resolve(&mut self, event: &InboundEvent) -> bool {
        match event.kind {
            EventKind::ButtonRelease if self.mask.intersects(PauseMask::CLICK) => {
                if self.mask.intersects(PauseMask::for_button(event.par1)) {
                    self.mask = PauseMask::empty();
                }
                self.mask.is_empty()
            }
            EventKind::KeyPress if self.mask.contains(PauseMask::KEYSTROKE) && event.par1 > 0 => {
                self.mask = PauseMask::empty();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(button: i32) -> InboundEvent {
        InboundEvent::new(EventKind::ButtonRelease, 10, 10, button, 0)
    }

    fn key(code: i32) -> InboundEvent {
        InboundEvent::new(EventKind::KeyPress, 10, 10, code, 0)
    }

    #[test]
    fn idle_is_never_satisfied() {
        let mut state = PauseState::new();
        assert!(!state.is_paused());
        assert!(!state.resolve(&release(1)));
        assert!(!state.resolve(&key('q' as i32)));
    }

    #[test]
    fn click_or_key_pause_resolves_on_matching_button() {
        let mut state = PauseState::new();
        state.request(PauseMask::BUTTON1 | PauseMask::KEYSTROKE);

        assert!(!state.resolve(&release(2)));
        assert!(state.is_paused());

        assert!(state.resolve(&release(1)));
        assert!(!state.is_paused());

        assert!(!state.resolve(&key('x' as i32)));
        assert!(!state.is_paused());
    }

    #[test]
    fn any_awaited_button_ends_a_multi_button_pause() {
        let mut state = PauseState::new();
        state.request(PauseMask::CLICK);
        assert!(state.resolve(&release(3)));
        assert_eq!(state.mask(), PauseMask::empty());
    }

    #[test]
    fn press_and_motion_do_not_resolve() {
        let mut state = PauseState::new();
        state.request(PauseMask::ANY);
        assert!(!state.resolve(&InboundEvent::new(EventKind::ButtonPress, 0, 0, 1, 0)));
        assert!(!state.resolve(&InboundEvent::new(EventKind::Motion, 0, 0, 0, 0)));
        assert!(state.is_paused());
    }

    #[test]
    fn null_key_does_not_resolve_keystroke_pause() {
        let mut state = PauseState::new();
        state.request(PauseMask::KEYSTROKE);
        assert!(!state.resolve(&key(0)));
        assert!(state.resolve(&key('a' as i32)));
    }

    #[test]
    fn button_release_ignored_when_only_keys_awaited() {
        let mut state = PauseState::new();
        state.request(PauseMask::KEYSTROKE);
        assert!(!state.resolve(&release(1)));
        assert!(state.is_paused());
    }

    #[test]
    fn key_ignored_when_only_clicks_awaited() {
        let mut state = PauseState::new();
        state.request(PauseMask::BUTTON2);
        assert!(!state.resolve(&key('a' as i32)));
        state.cancel();
        assert!(!state.is_paused());
    }
}
