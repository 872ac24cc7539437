//! Opcode tags and the small enumerations carried as operands.

use serde::Serialize;

macro_rules! opcodes {
    ($($name:ident = $value:literal,)+) => {
        /// Command tag written before each command's operands.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        #[repr(u32)]
        pub enum Opcode {
            $($name = $value,)+
        }

        impl Opcode {
            pub fn from_u32(value: u32) -> Option<Self> {
                match value {
                    $($value => Some(Self::$name),)+
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    SetCurrentWindow = 1,
    InitWindow = 2,
    Activate = 3,
    Deactivate = 4,
    SetTitle = 5,
    SetCtrl = 6,
    SetWidgetSize = 7,
    SetSceneSize = 8,
    Clear = 9,
    SetFont = 10,
    Move = 11,
    Vector = 12,
    PutText = 13,
    EnhancedFlush = 14,
    EnhancedFinish = 15,
    TextAlignment = 16,
    TextAngle = 17,
    PenStyle = 18,
    PenColor = 19,
    BackgroundColor = 20,
    LineWidth = 21,
    PointSize = 22,
    Point = 23,
    BrushStyle = 24,
    FillBox = 25,
    FilledPolygon = 26,
    Image = 27,
    Raise = 28,
    Done = 29,
    Persist = 30,
    Exit = 31,
    CloseWindow = 32,
    Scale = 33,
    StatusText = 34,
    ZoomStart = 35,
    ZoomStop = 36,
    LineTo = 37,
    WarpCursor = 38,
    Cursor = 39,
    Ruler = 40,
    CopyClipboard = 41,
    PlotNumber = 42,
    Layer = 43,
    Hypertext = 44,
    TextBox = 45,
    ModPlots = 46,
}

/// Pen dash pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PenStyle {
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
}

impl PenStyle {
    pub(crate) fn code(self) -> u32 {
        match self {
            Self::Solid => 1,
            Self::Dash => 2,
            Self::Dot => 3,
            Self::DashDot => 4,
            Self::DashDotDot => 5,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::Solid,
            2 => Self::Dash,
            3 => Self::Dot,
            4 => Self::DashDot,
            5 => Self::DashDotDot,
            _ => return None,
        })
    }
}

/// Horizontal text anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

impl Alignment {
    pub(crate) fn code(self) -> u32 {
        match self {
            Self::Left => 0x01,
            Self::Right => 0x02,
            Self::Center => 0x84,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0x01 => Self::Left,
            0x02 => Self::Right,
            0x84 => Self::Center,
            _ => return None,
        })
    }
}

/// Mouse cursor shapes used for interactive feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CursorShape {
    Cross,
    SizeFDiag,
    ClosedHand,
    SizeAll,
}

impl CursorShape {
    pub(crate) fn code(self) -> u32 {
        match self {
            Self::Cross => 2,
            Self::SizeFDiag => 8,
            Self::SizeAll => 9,
            Self::ClosedHand => 18,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            2 => Self::Cross,
            8 => Self::SizeFDiag,
            9 => Self::SizeAll,
            18 => Self::ClosedHand,
            _ => return None,
        })
    }
}

/// Layer markers bracketing parts of a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerMark {
    BeginKeySample,
    EndKeySample,
    BeforeZoom,
}

impl LayerMark {
    pub(crate) fn code(self) -> u32 {
        match self {
            Self::BeginKeySample => 1,
            Self::EndKeySample => 2,
            Self::BeforeZoom => 3,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::BeginKeySample,
            2 => Self::EndKeySample,
            3 => Self::BeforeZoom,
            _ => return None,
        })
    }
}

/// Visibility toggles applied to every plot in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlotVisibility {
    Invert,
    SetVisible,
    SetInvisible,
}

impl PlotVisibility {
    pub(crate) fn code(self) -> u32 {
        match self {
            Self::Invert => 1,
            Self::SetVisible => 2,
            Self::SetInvisible => 3,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::Invert,
            2 => Self::SetVisible,
            3 => Self::SetInvisible,
            _ => return None,
        })
    }
}
