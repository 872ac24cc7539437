//! The terminal context handed to every driver call.
//!
//! A [`Terminal`] owns the committed options, the pending size request, the
//! pause state and, once [`Terminal::init`] has run, the live [`Session`].
//! Dropping it tells the renderer to exit (or to persist) and releases the
//! connection.

mod draw;
mod mouse;


use tracing::{debug, info, warn};

pub use draw::{AxisRange, ColorSpec, Justify, COLOR_CYCLE};
pub use mouse::{ModifyPlots, TermLayer};

use crate::channel::Channel;
use crate::config::LinkConfig;
use crate::coords::OVERSAMPLING;
use crate::error::LinkError;
use crate::launcher::{try_reap, HelperLauncher, Launch};
use crate::log_debug;
use crate::multiplex::{self, Console, ConsoleInput, WaitMode};
use crate::options::TermOptions;
use crate::pause::{PauseMask, PauseState};
use crate::protocol::Command;
use crate::session::{Session, TextCodec};
use crate::translate::{EventSink, SizeRequest, Translator};

/// Driver state for one plotting terminal.
pub struct Terminal {
    link: LinkConfig,
    launcher: Box<dyn Launch>,
    options: TermOptions,
    size: SizeRequest,
    pause: PauseState,
    console: Console,
    codec: TextCodec,
    ignore_enhanced: bool,
    session: Option<Session>,
}

impl Terminal {
    /// Terminal that launches `plotterm_helper` from the configured driver dir.
    pub fn new(link: LinkConfig) -> Self {
        let launcher = HelperLauncher::new(link.driver_dir.clone());
        Self::with_launcher(link, Box::new(launcher))
    }

    pub fn with_launcher(link: LinkConfig, launcher: Box<dyn Launch>) -> Self {
        Self {
            link,
            launcher,
            options: TermOptions::default(),
            size: SizeRequest::default(),
            pause: PauseState::new(),
            console: Console::stdin(),
            codec: TextCodec::default(),
            ignore_enhanced: false,
            session: None,
        }
    }

    /// Read console input from `console` instead of stdin.
    pub fn set_console(&mut self, console: Console) {
        self.console = console;
    }

    pub fn options(&self) -> &TermOptions {
        &self.options
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_connected)
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Canvas extent in device units as of the last `graphics()`.
    pub fn canvas(&self) -> (u32, u32) {
        match &self.session {
            Some(session) => (session.xmax, session.ymax),
            None => (
                device_extent(self.size.width),
                device_extent(self.size.height),
            ),
        }
    }

    /// Apply an option string and return its normalized form.
    ///
    /// On error nothing is committed. A title change reaches a live window
    /// right away, a size change waits for the next `graphics()`, and `close`
    /// is only sent while a session exists.
    pub fn set_options(&mut self, input: &str) -> Result<String, LinkError> {
        let changes = self.options.apply(input)?;
        if changes.size {
            self.size.request(self.options.width, self.options.height);
        }
        if let Some(session) = self.session.as_mut() {
            if changes.title {
                session
                    .channel
                    .queue(&Command::SetTitle(self.options.title.clone()));
            }
            if changes.close {
                session
                    .channel
                    .queue(&Command::CloseWindow(self.options.window_id));
            }
        }
        debug!(options = self.options.normalized(), "terminal options applied");
        Ok(self.options.normalized().to_string())
    }

    /// Select the text encoding used for every outgoing string.
    ///
    /// Unknown names fall back to UTF-8 and return false.
    pub fn set_encoding(&mut self, name: &str) -> bool {
        match TextCodec::from_name(name) {
            Some(codec) => {
                self.codec = codec;
                true
            }
            None => {
                self.codec = TextCodec::default();
                false
            }
        }
    }

    /// Draw text verbatim even when enhanced mode is on.
    pub fn set_ignore_enhanced(&mut self, ignore: bool) {
        self.ignore_enhanced = ignore;
    }

    /// Create the session; without a widget the local helper is launched now.
    pub fn init(&mut self) -> Result<(), LinkError> {
        if self.session.is_some() {
            return Ok(());
        }
        let mut session = Session::new(self.link.socket_dir.clone(), self.link.timing);
        if self.options.widget.is_none() {
            session.connector.start_helper(self.launcher.as_mut())?;
        }
        info!(helper = ?session.connector.helper_pid(), "terminal session created");
        self.session = Some(session);
        Ok(())
    }

    /// Prepare the renderer for a new plot.
    ///
    /// Connects (with fallback), applies a pending size request and sends the
    /// window initialisation sequence.
    pub fn graphics(&mut self) {
        let Some(session) = self.session.as_mut() else {
            warn!("graphics() called before init()");
            return;
        };
        session.channel.queue(&Command::Deactivate);
        flush_logged(&mut session.channel);

        match session.connector.connect_for_session(
            self.launcher.as_mut(),
            &mut session.channel,
            &mut self.options.widget,
        ) {
            Ok(report) if !report.connected => {
                log_debug(&format!(
                    "renderer not connected after {} hop(s); drawing is discarded",
                    report.hops
                ));
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "renderer connection failed");
                log_debug(&format!("renderer connection failed: {err}"));
            }
        }

        session.codec = self.codec;
        session.font_name = self.options.font_name.clone();
        session.font_size = self.options.font_size;
        if let Some((width, height)) = self.size.take_pending() {
            session.xmax = device_extent(width);
            session.ymax = device_extent(height);
        }

        let logical = crate::coords::descale_size(session.xmax, session.ymax);
        let channel = &mut session.channel;
        channel.queue(&Command::SetCurrentWindow(self.options.window_id));
        channel.queue(&Command::InitWindow);
        channel.queue(&Command::Activate);
        channel.queue(&Command::SetTitle(self.options.title.clone()));
        channel.queue(&Command::SetCtrl(self.options.ctrl));
        channel.queue(&Command::SetWidgetSize(logical));
        channel.queue(&Command::SetSceneSize(logical));
        channel.queue(&Command::Clear);
        channel.queue(&Command::SetFont {
            name: session.font_name.clone(),
            size: session.font_size,
        });
    }

    /// Finish the plot: raise if configured, mark done, flush.
    pub fn text(&mut self) {
        let raise = self.options.raise;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if raise {
            session.channel.queue(&Command::Raise);
        }
        session.channel.queue(&Command::Done);
        flush_logged(&mut session.channel);
    }

    /// Wait for the next console byte while servicing renderer events.
    pub fn wait_for_input(&mut self, mode: WaitMode, sink: &mut dyn EventSink) -> ConsoleInput {
        let Some(session) = self.session.as_mut() else {
            return match mode {
                WaitMode::CheckMousing => ConsoleInput::NoChar,
                WaitMode::Block => self.console.read_byte(),
            };
        };
        let mut translator = Translator {
            size: &mut self.size,
            pause: &mut self.pause,
            sink,
        };
        multiplex::wait_for_input(&mut session.channel, self.console, mode, &mut translator)
    }

    /// Block until an interaction in `mask` ends the pause.
    ///
    /// Returns false when the renderer went away before that happened; the
    /// pause is cancelled in that case.
    pub fn pause_for(&mut self, mask: PauseMask, sink: &mut dyn EventSink) -> bool {
        if mask.is_empty() {
            return true;
        }
        self.pause.request(mask);
        while self.pause.is_paused() {
            if !self.is_connected() {
                self.pause.cancel();
                return false;
            }
            self.wait_for_input(WaitMode::Block, sink);
        }
        true
    }

    /// Tell the renderer to exit (or persist) and drop the session.
    pub fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if self.options.persist || self.link.persist {
            session.channel.queue(&Command::Deactivate);
            session.channel.queue(&Command::Persist);
        } else {
            session.channel.queue(&Command::Exit);
        }
        flush_logged(&mut session.channel);
        session.channel.disconnect();
        if let Some(pid) = session.connector.helper_pid() {
            if let Some(status) = try_reap(pid) {
                debug!(pid, status, "renderer helper reaped");
            }
        }
        info!("terminal session closed");
    }

    /// Queue a command on the live session, if any.
    fn emit(&mut self, command: Command) {
        if let Some(session) = self.session.as_mut() {
            session.channel.queue(&command);
        }
    }

    fn flush(&mut self) {
        if let Some(session) = self.session.as_mut() {
            flush_logged(&mut session.channel);
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.close();
    }
}

/// Flush and log a failure; drawing never reports errors to the caller.
fn flush_logged(channel: &mut Channel) {
    if let Err(err) = channel.flush() {
        log_debug(&format!("flush failed: {err}"));
    }
}

fn device_extent(logical: i32) -> u32 {
    u32::try_from(logical.max(1).saturating_mul(OVERSAMPLING)).unwrap_or(u32::MAX)
}
