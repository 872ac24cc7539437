//! Typed operand encoding and the `Command` model.

use serde::Serialize;

use super::opcode::{Alignment, CursorShape, LayerMark, Opcode, PenStyle, PlotVisibility};
use crate::coords::{Point, PointF, Rect, Size};
use crate::error::LinkError;

/// RGBA colour; alpha 255 is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Raw RGBA pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub rgba: Vec<u8>,
}

impl Image {
    /// Byte count of a `width` x `height` RGBA raster.
    pub fn raster_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
    }

    /// True when `rgba` holds exactly `width * height` pixels.
    pub fn is_complete(&self) -> bool {
        Self::raster_len(self.width, self.height) == Some(self.rgba.len())
    }
}

/// One axis of the status-bar scale block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisScale {
    pub active: bool,
    pub min: f64,
    pub lower: f64,
    pub scale: f64,
    pub log_base: f64,
}

/// One outbound command with its operands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Command {
    SetCurrentWindow(i32),
    InitWindow,
    Activate,
    Deactivate,
    SetTitle(String),
    SetCtrl(bool),
    SetWidgetSize(Size),
    SetSceneSize(Size),
    Clear,
    SetFont {
        name: String,
        size: i32,
    },
    Move(PointF),
    Vector(PointF),
    PutText {
        at: Point,
        text: String,
    },
    EnhancedFlush {
        font_name: String,
        font_size: f64,
        base: f64,
        width_flag: bool,
        show_flag: bool,
        overprint: i32,
        text: String,
    },
    EnhancedFinish(Point),
    TextAlignment(Alignment),
    TextAngle(f64),
    PenStyle(PenStyle),
    PenColor(Color),
    BackgroundColor,
    LineWidth(f64),
    PointSize(f64),
    Point {
        at: PointF,
        style: i32,
    },
    BrushStyle(i32),
    FillBox(Rect),
    FilledPolygon(Vec<PointF>),
    Image {
        corners: [Point; 4],
        image: Image,
    },
    Raise,
    Done,
    Persist,
    Exit,
    CloseWindow(i32),
    Scale([AxisScale; 4]),
    StatusText(String),
    ZoomStart(String),
    ZoomStop(String),
    LineTo(bool),
    WarpCursor(Point),
    Cursor(CursorShape),
    Ruler(Point),
    CopyClipboard(String),
    PlotNumber(i32),
    Layer(LayerMark),
    Hypertext(String),
    TextBox {
        at: PointF,
        option: i32,
    },
    ModPlots(PlotVisibility),
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::SetCurrentWindow(_) => Opcode::SetCurrentWindow,
            Self::InitWindow => Opcode::InitWindow,
            Self::Activate => Opcode::Activate,
            Self::Deactivate => Opcode::Deactivate,
            Self::SetTitle(_) => Opcode::SetTitle,
            Self::SetCtrl(_) => Opcode::SetCtrl,
            Self::SetWidgetSize(_) => Opcode::SetWidgetSize,
            Self::SetSceneSize(_) => Opcode::SetSceneSize,
            Self::Clear => Opcode::Clear,
            Self::SetFont { .. } => Opcode::SetFont,
            Self::Move(_) => Opcode::Move,
            Self::Vector(_) => Opcode::Vector,
            Self::PutText { .. } => Opcode::PutText,
            Self::EnhancedFlush { .. } => Opcode::EnhancedFlush,
            Self::EnhancedFinish(_) => Opcode::EnhancedFinish,
            Self::TextAlignment(_) => Opcode::TextAlignment,
            Self::TextAngle(_) => Opcode::TextAngle,
            Self::PenStyle(_) => Opcode::PenStyle,
            Self::PenColor(_) => Opcode::PenColor,
            Self::BackgroundColor => Opcode::BackgroundColor,
            Self::LineWidth(_) => Opcode::LineWidth,
            Self::PointSize(_) => Opcode::PointSize,
            Self::Point { .. } => Opcode::Point,
            Self::BrushStyle(_) => Opcode::BrushStyle,
            Self::FillBox(_) => Opcode::FillBox,
            Self::FilledPolygon(_) => Opcode::FilledPolygon,
            Self::Image { .. } => Opcode::Image,
            Self::Raise => Opcode::Raise,
            Self::Done => Opcode::Done,
            Self::Persist => Opcode::Persist,
            Self::Exit => Opcode::Exit,
            Self::CloseWindow(_) => Opcode::CloseWindow,
            Self::Scale(_) => Opcode::Scale,
            Self::StatusText(_) => Opcode::StatusText,
            Self::ZoomStart(_) => Opcode::ZoomStart,
            Self::ZoomStop(_) => Opcode::ZoomStop,
            Self::LineTo(_) => Opcode::LineTo,
            Self::WarpCursor(_) => Opcode::WarpCursor,
            Self::Cursor(_) => Opcode::Cursor,
            Self::Ruler(_) => Opcode::Ruler,
            Self::CopyClipboard(_) => Opcode::CopyClipboard,
            Self::PlotNumber(_) => Opcode::PlotNumber,
            Self::Layer(_) => Opcode::Layer,
            Self::Hypertext(_) => Opcode::Hypertext,
            Self::TextBox { .. } => Opcode::TextBox,
            Self::ModPlots(_) => Opcode::ModPlots,
        }
    }

    /// Append the opcode and operands to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let mut enc = Encoder { out };
        enc.u32(self.opcode() as u32);
        match self {
            Self::InitWindow
            | Self::Activate
            | Self::Deactivate
            | Self::Clear
            | Self::BackgroundColor
            | Self::Raise
            | Self::Done
            | Self::Persist
            | Self::Exit => {}
            Self::SetCurrentWindow(id) | Self::CloseWindow(id) => enc.i32(*id),
            Self::BrushStyle(v) | Self::PlotNumber(v) => enc.i32(*v),
            Self::SetTitle(s)
            | Self::StatusText(s)
            | Self::ZoomStart(s)
            | Self::ZoomStop(s)
            | Self::CopyClipboard(s)
            | Self::Hypertext(s) => enc.string(s),
            Self::SetCtrl(flag) | Self::LineTo(flag) => enc.bool(*flag),
            Self::SetWidgetSize(size) | Self::SetSceneSize(size) => enc.size(*size),
            Self::SetFont { name, size } => {
                enc.string(name);
                enc.i32(*size);
            }
            Self::Move(p) | Self::Vector(p) => enc.point_f(*p),
            Self::PutText { at, text } => {
                enc.point(*at);
                enc.string(text);
            }
            Self::EnhancedFlush {
                font_name,
                font_size,
                base,
                width_flag,
                show_flag,
                overprint,
                text,
            } => {
                enc.string(font_name);
                enc.f64(*font_size);
                enc.f64(*base);
                enc.bool(*width_flag);
                enc.bool(*show_flag);
                enc.i32(*overprint);
                enc.string(text);
            }
            Self::EnhancedFinish(p) | Self::WarpCursor(p) | Self::Ruler(p) => enc.point(*p),
            Self::TextAlignment(a) => enc.u32(a.code()),
            Self::TextAngle(v) | Self::LineWidth(v) | Self::PointSize(v) => enc.f64(*v),
            Self::PenStyle(style) => enc.u32(style.code()),
            Self::PenColor(color) => enc.color(*color),
            Self::Point { at, style } => {
                enc.point_f(*at);
                enc.i32(*style);
            }
            Self::FillBox(rect) => enc.rect(*rect),
            Self::FilledPolygon(points) => {
                enc.u32(points.len() as u32);
                for p in points {
                    enc.point_f(*p);
                }
            }
            Self::Image { corners, image } => {
                for p in corners {
                    enc.point(*p);
                }
                enc.u32(image.width);
                enc.u32(image.height);
                enc.out.extend_from_slice(&image.rgba);
            }
            Self::Scale(axes) => {
                for axis in axes {
                    enc.bool(axis.active);
                    enc.f64(axis.min);
                    enc.f64(axis.lower);
                    enc.f64(axis.scale);
                    enc.f64(axis.log_base);
                }
            }
            Self::Cursor(shape) => enc.u32(shape.code()),
            Self::Layer(mark) => enc.u32(mark.code()),
            Self::TextBox { at, option } => {
                enc.point_f(*at);
                enc.i32(*option);
            }
            Self::ModPlots(op) => enc.u32(op.code()),
        }
    }

    /// Decode one command starting at the decoder's cursor.
    pub fn decode(dec: &mut Decoder<'_>) -> Result<Self, LinkError> {
        let raw = dec.u32()?;
        let opcode = Opcode::from_u32(raw)
            .ok_or_else(|| LinkError::Protocol(format!("unknown opcode {raw}")))?;
        Ok(match opcode {
            Opcode::SetCurrentWindow => Self::SetCurrentWindow(dec.i32()?),
            Opcode::InitWindow => Self::InitWindow,
            Opcode::Activate => Self::Activate,
            Opcode::Deactivate => Self::Deactivate,
            Opcode::SetTitle => Self::SetTitle(dec.string()?),
            Opcode::SetCtrl => Self::SetCtrl(dec.bool()?),
            Opcode::SetWidgetSize => Self::SetWidgetSize(dec.size()?),
            Opcode::SetSceneSize => Self::SetSceneSize(dec.size()?),
            Opcode::Clear => Self::Clear,
            Opcode::SetFont => Self::SetFont {
                name: dec.string()?,
                size: dec.i32()?,
            },
            Opcode::Move => Self::Move(dec.point_f()?),
            Opcode::Vector => Self::Vector(dec.point_f()?),
            Opcode::PutText => Self::PutText {
                at: dec.point()?,
                text: dec.string()?,
            },
            Opcode::EnhancedFlush => Self::EnhancedFlush {
                font_name: dec.string()?,
                font_size: dec.f64()?,
                base: dec.f64()?,
                width_flag: dec.bool()?,
                show_flag: dec.bool()?,
                overprint: dec.i32()?,
                text: dec.string()?,
            },
            Opcode::EnhancedFinish => Self::EnhancedFinish(dec.point()?),
            Opcode::TextAlignment => Self::TextAlignment(dec.coded(Alignment::from_code)?),
            Opcode::TextAngle => Self::TextAngle(dec.f64()?),
            Opcode::PenStyle => Self::PenStyle(dec.coded(PenStyle::from_code)?),
            Opcode::PenColor => Self::PenColor(dec.color()?),
            Opcode::BackgroundColor => Self::BackgroundColor,
            Opcode::LineWidth => Self::LineWidth(dec.f64()?),
            Opcode::PointSize => Self::PointSize(dec.f64()?),
            Opcode::Point => Self::Point {
                at: dec.point_f()?,
                style: dec.i32()?,
            },
            Opcode::BrushStyle => Self::BrushStyle(dec.i32()?),
            Opcode::FillBox => Self::FillBox(dec.rect()?),
            Opcode::FilledPolygon => {
                let count = dec.u32()? as usize;
                // each point needs 16 bytes; reject counts the payload cannot hold
                if count > dec.remaining() / 16 {
                    return Err(LinkError::Protocol(format!(
                        "polygon with {count} points exceeds frame"
                    )));
                }
                let mut points = Vec::with_capacity(count);
                for _ in 0..count {
                    points.push(dec.point_f()?);
                }
                Self::FilledPolygon(points)
            }
            Opcode::Image => {
                let corners = [dec.point()?, dec.point()?, dec.point()?, dec.point()?];
                let width = dec.u32()?;
                let height = dec.u32()?;
                let len = Image::raster_len(width, height)
                    .ok_or_else(|| LinkError::Protocol("image dimensions overflow".into()))?;
                let rgba = dec.bytes(len)?.to_vec();
                Self::Image {
                    corners,
                    image: Image {
                        width,
                        height,
                        rgba,
                    },
                }
            }
            Opcode::Raise => Self::Raise,
            Opcode::Done => Self::Done,
            Opcode::Persist => Self::Persist,
            Opcode::Exit => Self::Exit,
            Opcode::CloseWindow => Self::CloseWindow(dec.i32()?),
            Opcode::Scale => {
                let mut axes = [AxisScale {
                    active: false,
                    min: 0.0,
                    lower: 0.0,
                    scale: 0.0,
                    log_base: 0.0,
                }; 4];
                for axis in &mut axes {
                    axis.active = dec.bool()?;
                    axis.min = dec.f64()?;
                    axis.lower = dec.f64()?;
                    axis.scale = dec.f64()?;
                    axis.log_base = dec.f64()?;
                }
                Self::Scale(axes)
            }
            Opcode::StatusText => Self::StatusText(dec.string()?),
            Opcode::ZoomStart => Self::ZoomStart(dec.string()?),
            Opcode::ZoomStop => Self::ZoomStop(dec.string()?),
            Opcode::LineTo => Self::LineTo(dec.bool()?),
            Opcode::WarpCursor => Self::WarpCursor(dec.point()?),
            Opcode::Cursor => Self::Cursor(dec.coded(CursorShape::from_code)?),
            Opcode::Ruler => Self::Ruler(dec.point()?),
            Opcode::CopyClipboard => Self::CopyClipboard(dec.string()?),
            Opcode::PlotNumber => Self::PlotNumber(dec.i32()?),
            Opcode::Layer => Self::Layer(dec.coded(LayerMark::from_code)?),
            Opcode::Hypertext => Self::Hypertext(dec.string()?),
            Opcode::TextBox => Self::TextBox {
                at: dec.point_f()?,
                option: dec.i32()?,
            },
            Opcode::ModPlots => Self::ModPlots(dec.coded(PlotVisibility::from_code)?),
        })
    }
}

struct Encoder<'a> {
    out: &'a mut Vec<u8>,
}

impl Encoder<'_> {
    fn u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    fn bool(&mut self, v: bool) {
        self.out.push(u8::from(v));
    }

    fn f64(&mut self, v: f64) {
        self.out.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    fn string(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.out.extend_from_slice(s.as_bytes());
    }

    fn point_f(&mut self, p: PointF) {
        self.f64(p.x);
        self.f64(p.y);
    }

    fn point(&mut self, p: Point) {
        self.i32(p.x);
        self.i32(p.y);
    }

    fn size(&mut self, s: Size) {
        self.i32(s.width);
        self.i32(s.height);
    }

    fn rect(&mut self, r: Rect) {
        self.i32(r.x);
        self.i32(r.y);
        self.i32(r.width);
        self.i32(r.height);
    }

    fn color(&mut self, c: Color) {
        self.out.extend_from_slice(&[c.r, c.g, c.b, c.a]);
    }
}

/// Cursor over a frame payload.
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], LinkError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                LinkError::Protocol(format!(
                    "truncated operand: need {len} bytes at offset {}",
                    self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LinkError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, LinkError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, LinkError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn bool(&mut self) -> Result<bool, LinkError> {
        match self.array::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(LinkError::Protocol(format!("invalid bool byte {other}"))),
        }
    }

    fn f64(&mut self) -> Result<f64, LinkError> {
        Ok(f64::from_bits(u64::from_be_bytes(self.array()?)))
    }

    fn string(&mut self) -> Result<String, LinkError> {
        let len = self.u32()? as usize;
        let raw = self.bytes(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| LinkError::Protocol("string operand is not valid UTF-8".into()))
    }

    fn point_f(&mut self) -> Result<PointF, LinkError> {
        Ok(PointF {
            x: self.f64()?,
            y: self.f64()?,
        })
    }

    fn point(&mut self) -> Result<Point, LinkError> {
        Ok(Point {
            x: self.i32()?,
            y: self.i32()?,
        })
    }

    fn size(&mut self) -> Result<Size, LinkError> {
        Ok(Size {
            width: self.i32()?,
            height: self.i32()?,
        })
    }

    fn rect(&mut self) -> Result<Rect, LinkError> {
        Ok(Rect {
            x: self.i32()?,
            y: self.i32()?,
            width: self.i32()?,
            height: self.i32()?,
        })
    }

    fn color(&mut self) -> Result<Color, LinkError> {
        let [r, g, b, a] = self.array::<4>()?;
        Ok(Color { r, g, b, a })
    }

    fn coded<T>(&mut self, from_code: fn(u32) -> Option<T>) -> Result<T, LinkError> {
        let code = self.u32()?;
        from_code(code).ok_or_else(|| LinkError::Protocol(format!("invalid enum code {code}")))
    }
}
