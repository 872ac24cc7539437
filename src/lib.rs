//! Driver side of an out-of-process plot renderer.
//!
//! The core draws through a [`Terminal`]; commands are framed onto a local
//! socket served by a helper process (spawned on demand) or by a named
//! widget. Mouse and key events flow back while the core waits for input.

pub mod channel;
pub mod config;
pub mod connection;
pub mod coords;
pub mod error;
pub mod launcher;
mod logging;
pub mod multiplex;
pub mod options;
pub mod pause;
pub mod protocol;
pub mod session;
mod telemetry;
pub mod terminal;
pub mod translate;

pub use error::LinkError;
pub use logging::{init_logging, init_logging_from_env, log_debug, log_file_path, log_panic};
pub use telemetry::{init_tracing, tracing_log_path};
pub use terminal::Terminal;
