//! Demo driver: opens a renderer window, draws a sample plot and waits for a
//! click or key press in it.

mod sample;

use anyhow::{bail, Result};
use std::env;
use std::panic;
use tracing::info;

use plotterm::config::AppConfig;
use plotterm::connection::SOCKET_DIR_ENV;
use plotterm::protocol::{EventKind, InboundEvent};
use plotterm::{init_logging, init_tracing, log_debug, log_file_path, log_panic, Terminal};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        previous_hook(info);
    }));
    log_debug("=== plotterm demo started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let link = config.link_config();
    // The helper finds its socket directory through the environment.
    env::set_var(SOCKET_DIR_ENV, &link.socket_dir);

    let mut term = Terminal::new(link);
    let normalized = term.set_options(&config.term_options)?;
    info!(options = %normalized, "terminal options");
    term.init()?;
    term.graphics();
    if !term.is_connected() {
        bail!(
            "no renderer reachable (driver dir {})",
            config.link_config().driver_dir.display()
        );
    }
    sample::draw(&mut term);
    term.text();

    let mut clicks = 0u32;
    let mut sink = |event: &InboundEvent| {
        match event.kind {
            EventKind::ButtonPress | EventKind::ButtonRelease | EventKind::KeyPress => {
                clicks += 1;
                println!(
                    "{:?} at ({}, {}) par1={}",
                    event.kind, event.mx, event.my, event.par1
                );
            }
            _ => log_debug(&format!("renderer event {event:?}")),
        }
    };
    let mask = config.pause.mask();
    if !mask.is_empty() {
        println!("waiting for {:?} in the plot window", config.pause);
        if !term.pause_for(mask, &mut sink) {
            bail!("renderer went away before the pause ended");
        }
    }
    log_debug(&format!("pause ended after {clicks} interaction(s)"));
    Ok(())
}
