use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, enable_raw_mode},
};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use pagestack::event_source::KeyboardEventSource;
use pagestack::panic_handler::{initialize_panic_handler, restore_terminal};
use pagestack::settings::load_settings;
use pagestack::{App, PagedView, open_document, run_app};

/// Scroll through the pages of a PDF or a folder of page images
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// PDF file, image file, or directory of page images
    path: PathBuf,

    /// Initial zoom factor (1.0 = 100%)
    #[arg(long)]
    zoom: Option<f64>,

    /// Settings file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "pagestack.log")]
    log_file: PathBuf,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("cannot create log file {:?}", args.log_file))?,
    )?;
    initialize_panic_handler();
    info!("Starting pagestack on {:?}", args.path);

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(zoom) = args.zoom {
        settings.zoom = zoom;
    }
    settings.validate()?;

    let document = open_document(&args.path)
        .with_context(|| format!("cannot open {:?}", args.path))?;
    let mut view = PagedView::new(settings.view_options(), settings.render_workers);
    view.set_document(document);

    let title = args
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.path.display().to_string());
    let mut app = App::new(view, title, settings.zoom);

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_app(&mut terminal, &mut app, &mut KeyboardEventSource);

    restore_terminal();
    info!("Exiting pagestack");
    result
}
