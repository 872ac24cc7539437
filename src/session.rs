//! Live connection context of one terminal.

use std::path::PathBuf;

use crate::channel::Channel;
use crate::connection::{ConnectTiming, Connector};
use crate::coords::OVERSAMPLING;
use crate::options::{DEFAULT_FONT_NAME, DEFAULT_FONT_SIZE, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Encoding of byte strings handed over by the core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextCodec {
    #[default]
    Utf8,
    Latin1,
}

impl TextCodec {
    /// Look a codec up by the core's encoding name; unknown names give `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "").as_str() {
            "utf8" | "default" => Some(Self::Utf8),
            "iso88591" | "latin1" => Some(Self::Latin1),
            _ => None,
        }
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// Append `ch` encoded in this codec; unrepresentable characters become `?`.
    pub fn encode_char(self, ch: char, out: &mut Vec<u8>) {
        match self {
            Self::Utf8 => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            Self::Latin1 => out.push(u8::try_from(u32::from(ch)).unwrap_or(b'?')),
        }
    }
}

/// Map a character of the PostScript Symbol font to Unicode.
pub fn symbol_to_unicode(byte: u8) -> char {
    const UPPER: &str = "ΑΒΧΔΕΦΓΗΙϑΚΛΜΝΟΠΘΡΣΤΥςΩΞΨΖ";
    const LOWER: &str = "αβχδεφγηιϕκλμνοπθρστυϖωξψζ";
    match byte {
        b'A'..=b'Z' => UPPER.chars().nth(usize::from(byte - b'A')).unwrap_or('?'),
        b'a'..=b'z' => LOWER.chars().nth(usize::from(byte - b'a')).unwrap_or('?'),
        other => char::from(other),
    }
}

/// Accumulated state of one enhanced-text fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnhancedFragment {
    pub symbol: bool,
    pub font_name: String,
    pub font_size: f64,
    pub base: f64,
    pub width_flag: bool,
    pub show_flag: bool,
    pub overprint: i32,
    pub text: Vec<u8>,
}

/// Everything that lives exactly as long as a window session.
#[derive(Debug)]
pub struct Session {
    pub channel: Channel,
    pub connector: Connector,
    pub codec: TextCodec,
    pub font_name: String,
    pub font_size: i32,
    /// Canvas size in oversampled device units.
    pub xmax: u32,
    pub ymax: u32,
    pub enhanced: EnhancedFragment,
    pub plot_number: i32,
}

impl Session {
    pub fn new(socket_dir: PathBuf, timing: ConnectTiming) -> Self {
        Self {
            channel: Channel::new(),
            connector: Connector::new(socket_dir, timing),
            codec: TextCodec::default(),
            font_name: DEFAULT_FONT_NAME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            xmax: (DEFAULT_WIDTH * OVERSAMPLING) as u32,
            ymax: (DEFAULT_HEIGHT * OVERSAMPLING) as u32,
            enhanced: EnhancedFragment::default(),
            plot_number: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }
}
