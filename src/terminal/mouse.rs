//! Interactive feedback and plot bookkeeping.

use bitflags::bitflags;

use super::Terminal;
use crate::coords::{term_coord, term_coord_f, Point};
use crate::protocol::{Command, CursorShape, LayerMark, PlotVisibility};

/// Synchronisation points the core reports while drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermLayer {
    BeforePlot,
    AfterPlot,
    /// Restart plot numbering (ignored inside a multiplot).
    Reset { multiplot: bool },
    BeginKeySample,
    EndKeySample,
    BeforeZoom,
    /// Any layer the renderer has no use for.
    Other,
}

bitflags! {
    /// Visibility change requested for every plot in the window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModifyPlots: u32 {
        const SET_VISIBLE = 1 << 0;
        const SET_INVISIBLE = 1 << 1;
        const INVERT = Self::SET_VISIBLE.bits() | Self::SET_INVISIBLE.bits();
    }
}

impl Terminal {
    /// Show temporary text: slot 0 is the status line, 1 and 2 the zoom box
    /// corners.
    pub fn put_tmptext(&mut self, slot: i32, text: &str) {
        if self.session.is_none() {
            return;
        }
        match slot {
            0 => self.emit(Command::StatusText(text.to_string())),
            1 => self.emit(Command::ZoomStart(text.to_string())),
            2 => self.emit(Command::ZoomStop(text.to_string())),
            _ => {}
        }
        self.flush();
    }

    /// Cursor feedback for mouse modes.
    ///
    /// `0` also cancels a zoom box. `-4`/`-3` toggle the line-to-ruler,
    /// `-2` warps the pointer to `(x, y)`.
    pub fn set_cursor(&mut self, c: i32, x: u32, y: u32) {
        if self.session.is_none() {
            return;
        }
        if c == 0 {
            self.emit(Command::ZoomStop(String::new()));
        }
        let command = match c {
            -4 => Command::LineTo(false),
            -3 => Command::LineTo(true),
            -2 => Command::WarpCursor(term_coord(x, y, self.ymax())),
            -1 | 3 => Command::Cursor(CursorShape::SizeFDiag),
            1 => Command::Cursor(CursorShape::ClosedHand),
            2 => Command::Cursor(CursorShape::SizeAll),
            _ => Command::Cursor(CursorShape::Cross),
        };
        self.emit(command);
        self.flush();
    }

    /// Place the ruler at a device position; `None` removes it.
    pub fn set_ruler(&mut self, at: Option<(u32, u32)>) {
        let point = match at {
            Some((x, y)) => term_coord(x, y, self.ymax()),
            None => Point { x: -1, y: -1 },
        };
        self.emit(Command::Ruler(point));
        self.flush();
    }

    pub fn set_clipboard(&mut self, text: &str) {
        self.emit(Command::CopyClipboard(text.to_string()));
        self.flush();
    }

    pub fn layer(&mut self, layer: TermLayer) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let command = match layer {
            TermLayer::BeforePlot => {
                session.plot_number += 1;
                Command::PlotNumber(session.plot_number)
            }
            TermLayer::AfterPlot => Command::PlotNumber(0),
            TermLayer::Reset { multiplot } => {
                if !multiplot {
                    session.plot_number = 0;
                }
                return;
            }
            TermLayer::BeginKeySample => Command::Layer(LayerMark::BeginKeySample),
            TermLayer::EndKeySample => Command::Layer(LayerMark::EndKeySample),
            TermLayer::BeforeZoom => Command::Layer(LayerMark::BeforeZoom),
            TermLayer::Other => return,
        };
        session.channel.queue(&command);
    }

    /// Attach a tooltip to the next drawn point.
    pub fn hypertext(&mut self, text: &[u8]) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let text = session.codec.decode(text);
        session.channel.queue(&Command::Hypertext(text));
    }

    pub fn boxed_text(&mut self, x: u32, y: u32, option: i32) {
        let at = term_coord_f(x, y, self.ymax());
        self.emit(Command::TextBox { at, option });
    }

    pub fn modify_plots(&mut self, ops: ModifyPlots) {
        let visibility = if ops.contains(ModifyPlots::INVERT) {
            Some(PlotVisibility::Invert)
        } else if ops.contains(ModifyPlots::SET_VISIBLE) {
            Some(PlotVisibility::SetVisible)
        } else if ops.contains(ModifyPlots::SET_INVISIBLE) {
            Some(PlotVisibility::SetInvisible)
        } else {
            None
        };
        if let Some(visibility) = visibility {
            self.emit(Command::ModPlots(visibility));
        }
        self.flush();
    }
}
