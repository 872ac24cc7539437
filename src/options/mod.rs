//! `set term plotterm ...` option handling.
//!
//! An option string is tokenized with shell quoting rules, checked for
//! duplicated categories, and only then committed. The committed state is
//! re-serialized in a fixed order so it can be saved and replayed.


use crate::error::LinkError;

pub const DEFAULT_FONT_NAME: &str = "Sans";
pub const DEFAULT_FONT_SIZE: i32 = 9;
/// Logical window size used until the user or the renderer sets one.
pub const DEFAULT_WIDTH: i32 = 640;
pub const DEFAULT_HEIGHT: i32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Widget,
    Font,
    Enhanced,
    NoEnhanced,
    Size,
    Persist,
    NoPersist,
    Raise,
    NoRaise,
    Ctrl,
    NoCtrl,
    Title,
    Close,
    Dashed,
    DashLength,
    Solid,
}

/// `(full word, shortest accepted prefix, keyword)`, matched in order.
const KEYWORDS: &[(&str, usize, Keyword)] = &[
    ("widget", 1, Keyword::Widget),
    ("font", 4, Keyword::Font),
    ("enhanced", 3, Keyword::Enhanced),
    ("noenhanced", 5, Keyword::NoEnhanced),
    ("size", 1, Keyword::Size),
    ("persist", 3, Keyword::Persist),
    ("nopersist", 5, Keyword::NoPersist),
    ("raise", 3, Keyword::Raise),
    ("noraise", 5, Keyword::NoRaise),
    ("ctrlq", 2, Keyword::Ctrl),
    ("noctrlq", 4, Keyword::NoCtrl),
    ("title", 2, Keyword::Title),
    ("close", 2, Keyword::Close),
    ("dashed", 4, Keyword::Dashed),
    ("dashlength", 5, Keyword::DashLength),
    ("dl", 2, Keyword::DashLength),
    ("solid", 5, Keyword::Solid),
];

fn lookup(token: &str) -> Option<Keyword> {
    KEYWORDS
        .iter()
        .find(|(word, min, _)| token.len() >= *min && word.starts_with(token))
        .map(|(_, _, keyword)| *keyword)
}

/// Committed terminal options.
#[derive(Debug, Clone, PartialEq)]
pub struct TermOptions {
    pub window_id: i32,
    pub enhanced: bool,
    pub persist: bool,
    pub raise: bool,
    pub ctrl: bool,
    pub dashed: bool,
    pub width: i32,
    pub height: i32,
    pub font_name: String,
    pub font_size: i32,
    pub title: String,
    /// Name of an external widget endpoint to draw into.
    pub widget: Option<String>,
    normalized: String,
}

impl Default for TermOptions {
    fn default() -> Self {
        Self {
            window_id: 0,
            enhanced: true,
            persist: false,
            raise: true,
            ctrl: false,
            dashed: false,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            font_name: DEFAULT_FONT_NAME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            title: String::new(),
            widget: None,
            normalized: String::new(),
        }
    }
}

/// Which categories one `apply` call touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionChanges {
    pub title: bool,
    pub size: bool,
    pub close: bool,
    pub widget: bool,
    pub window_id: bool,
}

#[derive(Debug, Default)]
struct Seen {
    widget: bool,
    font: bool,
    enhanced: bool,
    size: bool,
    persist: bool,
    raise: bool,
    ctrl: bool,
    title: bool,
    close: bool,
    dash: bool,
    number: bool,
}

fn mark(flag: &mut bool, token: &str) -> Result<(), LinkError> {
    if std::mem::replace(flag, true) {
        return Err(LinkError::OptionConflict(token.to_string()));
    }
    Ok(())
}

impl TermOptions {
    /// The saved form of the last successfully applied option string.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Parse `input` and commit it. On error nothing changes.
    pub fn apply(&mut self, input: &str) -> Result<OptionChanges, LinkError> {
        let tokens = shell_words::split(input)
            .map_err(|err| LinkError::InvalidOption(format!("terminal options: {err}")))?;
        let mut staged = self.clone();
        let mut seen = Seen::default();
        let mut tokens = tokens.into_iter();

        while let Some(token) = tokens.next() {
            match lookup(&token) {
                Some(Keyword::Widget) => {
                    mark(&mut seen.widget, &token)?;
                    let name = expect_string(&mut tokens, "widget")?;
                    if !name.is_empty() {
                        staged.widget = Some(name);
                    }
                }
                Some(Keyword::Font) => {
                    mark(&mut seen.font, &token)?;
                    let spec = expect_string(&mut tokens, "font")?;
                    let mut parts = spec.split(',');
                    if let Some(name) = parts.next().filter(|name| !name.is_empty()) {
                        staged.font_name = name.to_string();
                    }
                    if let Some(size) = parts
                        .next()
                        .and_then(|size| size.trim().parse::<i32>().ok())
                        .filter(|size| *size > 0)
                    {
                        staged.font_size = size;
                    }
                }
                Some(keyword @ (Keyword::Enhanced | Keyword::NoEnhanced)) => {
                    mark(&mut seen.enhanced, &token)?;
                    staged.enhanced = keyword == Keyword::Enhanced;
                }
                Some(Keyword::Size) => {
                    mark(&mut seen.size, &token)?;
                    let (width, height) = expect_size(&mut tokens)?;
                    staged.width = width;
                    staged.height = height;
                }
                Some(keyword @ (Keyword::Persist | Keyword::NoPersist)) => {
                    mark(&mut seen.persist, &token)?;
                    staged.persist = keyword == Keyword::Persist;
                }
                Some(keyword @ (Keyword::Raise | Keyword::NoRaise)) => {
                    mark(&mut seen.raise, &token)?;
                    staged.raise = keyword == Keyword::Raise;
                }
                Some(keyword @ (Keyword::Ctrl | Keyword::NoCtrl)) => {
                    mark(&mut seen.ctrl, &token)?;
                    staged.ctrl = keyword == Keyword::Ctrl;
                }
                Some(Keyword::Title) => {
                    mark(&mut seen.title, &token)?;
                    let title = expect_string(&mut tokens, "title")?;
                    if !title.is_empty() {
                        staged.title = title;
                    }
                }
                Some(Keyword::Close) => mark(&mut seen.close, &token)?,
                Some(keyword @ (Keyword::Dashed | Keyword::Solid)) => {
                    mark(&mut seen.dash, &token)?;
                    staged.dashed = keyword == Keyword::Dashed;
                }
                Some(Keyword::DashLength) => {
                    let value = tokens.next().ok_or_else(|| {
                        LinkError::InvalidOption("dashlength: expecting a number".to_string())
                    })?;
                    parse_number(&value, "dashlength")?;
                }
                None => {
                    let id = token.parse::<i32>().map_err(|_| {
                        LinkError::InvalidOption(format!("unrecognized terminal option '{token}'"))
                    })?;
                    mark(&mut seen.number, &token)?;
                    staged.window_id = id;
                    staged.widget = None;
                }
            }
        }

        staged.normalized = staged.serialize(&seen);
        *self = staged;
        Ok(OptionChanges {
            title: seen.title,
            size: seen.size,
            close: seen.close,
            widget: seen.widget,
            window_id: seen.number,
        })
    }

    fn serialize(&self, seen: &Seen) -> String {
        let mut out = self.window_id.to_string();
        if seen.title {
            out.push_str(&format!(" title \"{}\"", self.title));
        }
        if seen.size {
            out.push_str(&format!(" size {}, {}", self.width, self.height));
        }
        if seen.enhanced {
            out.push_str(if self.enhanced { " enhanced" } else { " noenhanced" });
        }
        out.push_str(&format!(" font \"{},{}\"", self.font_name, self.font_size));
        if seen.dash {
            out.push_str(if self.dashed { " dashed" } else { " solid" });
        }
        if seen.widget {
            out.push_str(&format!(
                " widget \"{}\"",
                self.widget.as_deref().unwrap_or_default()
            ));
        }
        if seen.persist {
            out.push_str(if self.persist { " persist" } else { " nopersist" });
        }
        if seen.raise {
            out.push_str(if self.raise { " raise" } else { " noraise" });
        }
        if seen.ctrl {
            out.push_str(if self.ctrl { " ctrl" } else { " noctrl" });
        }
        out
    }
}

type Tokens = std::vec::IntoIter<String>;

fn expect_string(tokens: &mut Tokens, what: &str) -> Result<String, LinkError> {
    tokens
        .next()
        .ok_or_else(|| LinkError::InvalidOption(format!("{what}: expecting string")))
}

fn parse_number(value: &str, what: &str) -> Result<f64, LinkError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LinkError::InvalidOption(format!("{what}: '{value}' is not a number")))
}

/// Accepts `w,h`, `w, h`, `w ,h` and `w , h`.
fn expect_size(tokens: &mut Tokens) -> Result<(i32, i32), LinkError> {
    let usage = || LinkError::InvalidOption("size requires 'width,height'".to_string());
    let first = tokens.next().ok_or_else(usage)?;
    let (width, height) = match first.split_once(',') {
        Some((w, h)) if !h.is_empty() => (w.to_string(), h.to_string()),
        Some((w, _)) => (w.to_string(), tokens.next().ok_or_else(usage)?),
        None => {
            let next = tokens.next().ok_or_else(usage)?;
            match next.strip_prefix(',') {
                Some("") => (first, tokens.next().ok_or_else(usage)?),
                Some(h) => (first, h.to_string()),
                None => return Err(usage()),
            }
        }
    };
    let width = parse_number(&width, "size")?;
    let height = parse_number(&height, "size")?;
    if width < 1.0 || height < 1.0 || width > f64::from(i32::MAX) || height > f64::from(i32::MAX) {
        return Err(LinkError::InvalidOption("size is out of range".to_string()));
    }
    Ok((width as i32, height as i32))
}
