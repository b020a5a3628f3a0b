//! COVID-19 US state data viewer.
//!
//! Loads commented CSV tables of per-state time series (confirmed
//! cases, deaths, tests, test positivity) and plots them interactively.
//! Tables can be rebuilt from the upstream sources on demand.

mod charts;
mod data;
mod gui;
mod prep;

use anyhow::Context;
use eframe::egui;
use gui::CovidApp;
use std::io::Write;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    offer_download();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("COVID-19 Data"),
        ..Default::default()
    };

    eframe::run_native(
        "COVID-19 Data",
        options,
        Box::new(|cc| Ok(Box::new(CovidApp::new(cc)))),
    )
    .map_err(|err| anyhow::anyhow!("{err}"))
    .context("failed to start the GUI")
}

/// Before the window opens, offer to (re)build the tables directory
/// from the upstream sources. A download failure is logged and the
/// GUI starts with whatever tables exist.
fn offer_download() {
    let have_tables = glob::glob(&format!("{}/*.csv", prep::TABLES_DIR))
        .map(|entries| entries.flatten().next().is_some())
        .unwrap_or(false);

    let wanted = if have_tables {
        confirm(
            "Tables were found in ./tables, but more recent data may be \
             available.\nDownload the newest data from online? y/[N]",
        )
    } else {
        confirm(
            "No tables were found in ./tables.\nDownload data from online? \
             y/[N]",
        )
    };
    if !wanted {
        return;
    }

    let result = prep::prepare(&|frac, msg| {
        log::info!("[{:3.0}%] {msg}", frac * 100.0);
        println!("[{:3.0}%] {msg}", frac * 100.0);
    });
    if let Err(err) = result {
        log::error!("data preparation failed: {err}");
        eprintln!("Data preparation failed: {err}");
    }
}

/// Ask a y/N question on stdin. EOF or a read error means no, so a
/// non-interactive launch skips the download.
fn confirm(prompt: &str) -> bool {
    print!("{prompt} ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(n) if n > 0 => line.trim().to_ascii_lowercase().starts_with('y'),
        _ => false,
    }
}
