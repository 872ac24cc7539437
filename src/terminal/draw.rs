//! Plot drawing primitives.

use tracing::warn;

use super::Terminal;
use crate::coords::{descale_size, term_coord, term_coord_f, Rect, OVERSAMPLING};
use crate::log_debug;
use crate::protocol::{Alignment, AxisScale, Color, Command, Image, PenStyle};
use crate::session::symbol_to_unicode;

/// Line type that paints in the background colour.
const LT_BACKGROUND: i32 = -4;
/// Lowest line type the core sends; anything below draws nothing visible.
const LT_NODRAW: i32 = -3;
const LT_AXIS: i32 = -1;

/// Pen colours indexed by `linetype % 9 + 3`.
pub const COLOR_CYCLE: [Color; 12] = [
    Color::rgb(255, 255, 255),
    Color::rgb(0, 0, 0),
    Color::rgb(160, 160, 164),
    Color::rgb(255, 0, 0),
    Color::rgb(0, 255, 0),
    Color::rgb(0, 0, 255),
    Color::rgb(255, 0, 255),
    Color::rgb(0, 255, 255),
    Color::rgb(255, 255, 0),
    Color::rgb(0, 0, 0),
    Color::rgb(255, 76, 0),
    Color::rgb(160, 160, 164),
];

fn cycle_color(lt: i32) -> Color {
    let index = usize::try_from(lt % 9 + 3).unwrap_or(0);
    COLOR_CYCLE[index]
}

/// Horizontal text anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Left,
    Centre,
    Right,
}

/// Colour request from the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpec {
    /// Colour of a line type.
    Linetype(i32),
    /// `0xAARRGGBB` where a non-zero AA is transparency.
    Rgb(u32),
}

/// One axis mapping in device units, used to keep the status bar live
/// while the plot is inactive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub active: bool,
    pub min: f64,
    pub term_lower: f64,
    pub term_scale: f64,
    /// Log base for logarithmic axes.
    pub log_base: Option<f64>,
}

impl Terminal {
    pub(super) fn ymax(&self) -> u32 {
        self.session.as_ref().map_or(0, |session| session.ymax)
    }

    /// Like [`Terminal::text`], preceded by the axis scale block in the order
    /// x1, y1, x2, y2. Y axes are flipped to logical orientation.
    pub fn text_with_scale(&mut self, axes: [AxisRange; 4]) {
        let ymax = f64::from(self.ymax());
        let oversampling = f64::from(OVERSAMPLING);
        let mut scales = [AxisScale {
            active: false,
            min: 0.0,
            lower: 0.0,
            scale: 0.0,
            log_base: 0.0,
        }; 4];
        for (i, (axis, out)) in axes.iter().zip(scales.iter_mut()).enumerate() {
            let (lower, scale) = if i % 2 == 1 {
                (ymax - axis.term_lower, -axis.term_scale)
            } else {
                (axis.term_lower, axis.term_scale)
            };
            *out = AxisScale {
                active: axis.active,
                min: axis.min,
                lower: lower / oversampling,
                scale: scale / oversampling,
                log_base: axis.log_base.unwrap_or(0.0),
            };
        }
        self.emit(Command::Scale(scales));
        self.text();
    }

    pub fn move_to(&mut self, x: u32, y: u32) {
        let at = term_coord_f(x, y, self.ymax());
        self.emit(Command::Move(at));
    }

    pub fn vector(&mut self, x: u32, y: u32) {
        let at = term_coord_f(x, y, self.ymax());
        self.emit(Command::Vector(at));
    }

    /// Draw a string at `(x, y)`.
    ///
    /// In enhanced mode the whole string goes out as one enhanced fragment in
    /// the current font followed by a finish marker.
    pub fn put_text(&mut self, x: u32, y: u32, text: &[u8]) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let at = term_coord(x, y, session.ymax);
        if !self.options.enhanced || self.ignore_enhanced {
            let text = session.codec.decode(text);
            self.emit(Command::PutText { at, text });
            return;
        }
        let font_name = session.font_name.clone();
        let font_size = f64::from(session.font_size);
        self.enhanced_open(&font_name, font_size, 0.0, true, true, 0);
        for &byte in text {
            self.enhanced_writec(byte);
        }
        self.enhanced_flush();
        self.emit(Command::EnhancedFinish(at));
    }

    /// Start a new enhanced-text fragment. The "symbol" font is drawn with
    /// Sans and its characters mapped to Unicode.
    pub fn enhanced_open(
        &mut self,
        font_name: &str,
        font_size: f64,
        base: f64,
        width_flag: bool,
        show_flag: bool,
        overprint: i32,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let fragment = &mut session.enhanced;
        fragment.symbol = font_name.eq_ignore_ascii_case("symbol");
        fragment.font_name = if fragment.symbol {
            "Sans".to_string()
        } else {
            font_name.to_string()
        };
        fragment.font_size = font_size;
        fragment.base = base;
        fragment.width_flag = width_flag;
        fragment.show_flag = show_flag;
        fragment.overprint = overprint;
    }

    pub fn enhanced_writec(&mut self, byte: u8) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.enhanced.symbol {
            let codec = session.codec;
            codec.encode_char(symbol_to_unicode(byte), &mut session.enhanced.text);
        } else {
            session.enhanced.text.push(byte);
        }
    }

    /// Send the accumulated fragment and start over with empty text.
    pub fn enhanced_flush(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let fragment = &mut session.enhanced;
        let text = session.codec.decode(&std::mem::take(&mut fragment.text));
        let command = Command::EnhancedFlush {
            font_name: fragment.font_name.clone(),
            font_size: fragment.font_size,
            base: fragment.base,
            width_flag: fragment.width_flag,
            show_flag: fragment.show_flag,
            overprint: fragment.overprint,
            text,
        };
        session.channel.queue(&command);
    }

    /// Anchor the fragments sent since the last finish at `(x, y)`.
    pub fn enhanced_finish(&mut self, x: u32, y: u32) {
        let at = term_coord(x, y, self.ymax());
        self.emit(Command::EnhancedFinish(at));
    }

    pub fn linetype(&mut self, lt: i32) {
        let lt = lt.max(LT_NODRAW);
        let style = if lt == LT_AXIS {
            PenStyle::Dot
        } else if self.options.dashed && lt > 0 {
            match lt % 4 {
                1 => PenStyle::Dash,
                2 => PenStyle::DashDot,
                3 => PenStyle::DashDotDot,
                _ => PenStyle::Solid,
            }
        } else {
            PenStyle::Solid
        };
        self.emit(Command::PenStyle(style));
        if lt - 1 == LT_BACKGROUND {
            self.emit(Command::BackgroundColor);
        } else {
            self.emit(Command::PenColor(cycle_color(lt)));
        }
    }

    /// Switch to `"name,size"`. Missing parts fall back to the option font;
    /// nothing is sent when the font does not change.
    pub fn set_font(&mut self, font: &str) {
        let default_name = self.options.font_name.clone();
        let default_size = self.options.font_size;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let previous = (session.font_name.clone(), session.font_size);

        if font.is_empty() {
            session.font_name = default_name.clone();
            session.font_size = default_size;
        } else {
            let mut parts = font.split(',');
            if let Some(name) = parts.next() {
                session.font_name = name.to_string();
            }
            if let Some(size) = parts.next() {
                session.font_size = size.trim().parse().unwrap_or(0);
            }
        }
        if session.font_name.is_empty() {
            session.font_name = default_name;
        }
        if session.font_size <= 0 {
            session.font_size = default_size;
        }

        if (session.font_name.as_str(), session.font_size) == (previous.0.as_str(), previous.1) {
            return;
        }
        let command = Command::SetFont {
            name: session.font_name.clone(),
            size: session.font_size,
        };
        session.channel.queue(&command);
    }

    pub fn justify_text(&mut self, mode: Justify) -> bool {
        let alignment = match mode {
            Justify::Left => Alignment::Left,
            Justify::Centre => Alignment::Center,
            Justify::Right => Alignment::Right,
        };
        self.emit(Command::TextAlignment(alignment));
        true
    }

    pub fn point(&mut self, x: u32, y: u32, style: i32) {
        let at = term_coord_f(x, y, self.ymax());
        self.emit(Command::Point { at, style });
    }

    pub fn pointsize(&mut self, size: f64) {
        let size = if size < 0.0 { 1.0 } else { size };
        self.emit(Command::PointSize(size));
    }

    pub fn linewidth(&mut self, width: f64) {
        self.emit(Command::LineWidth(width));
    }

    pub fn text_angle(&mut self, degrees: i32) -> bool {
        self.emit(Command::TextAngle(f64::from(degrees)));
        true
    }

    /// Fill the device box with its lower-left corner at `(x, y)`.
    pub fn fillbox(&mut self, style: i32, x: u32, y: u32, width: u32, height: u32) {
        let top_left = term_coord(x, y.saturating_add(height), self.ymax());
        let size = descale_size(width, height);
        self.emit(Command::BrushStyle(style));
        self.emit(Command::FillBox(Rect {
            x: top_left.x,
            y: top_left.y,
            width: size.width,
            height: size.height,
        }));
    }

    pub fn set_color(&mut self, spec: ColorSpec) {
        let command = match spec {
            ColorSpec::Linetype(lt) if lt <= LT_NODRAW => Command::BackgroundColor,
            ColorSpec::Linetype(lt) => Command::PenColor(cycle_color(lt)),
            ColorSpec::Rgb(value) => {
                let [alpha, r, g, b] = value.to_be_bytes();
                let mut color = Color::rgb(r, g, b);
                if alpha > 0 {
                    color.a = 255 - alpha;
                }
                Command::PenColor(color)
            }
        };
        self.emit(command);
    }

    pub fn filled_polygon(&mut self, style: i32, corners: &[(u32, u32)]) {
        let ymax = self.ymax();
        let polygon = corners
            .iter()
            .map(|&(x, y)| term_coord_f(x, y, ymax))
            .collect();
        self.emit(Command::BrushStyle(style));
        self.emit(Command::FilledPolygon(polygon));
    }

    /// Blit `image` into the quadrilateral given by four device corners.
    ///
    /// An image whose pixel buffer does not match its dimensions is dropped.
    pub fn image(&mut self, image: Image, corners: [(u32, u32); 4]) {
        if !image.is_complete() {
            warn!(
                width = image.width,
                height = image.height,
                bytes = image.rgba.len(),
                "dropping image with mismatched pixel buffer"
            );
            log_debug(&format!(
                "dropping {}x{} image with {} pixel bytes",
                image.width,
                image.height,
                image.rgba.len()
            ));
            return;
        }
        let ymax = self.ymax();
        let corners = corners.map(|(x, y)| term_coord(x, y, ymax));
        self.emit(Command::Image { corners, image });
    }
}
