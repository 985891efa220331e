use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::{execute, terminal};
use tracing::{error, info};

mod adapter;
mod checklist;
mod controller;
mod dataset;
mod domain;
mod export;
mod filterbox;
mod inputter;
mod logging;
mod menu;
mod model;
mod ui;

use controller::Controller;
use domain::{DEFAULT_EXPORT_FILE, DTError, TableConfig};
use model::{Model, Status};
use ui::TableUI;

/// Spreadsheet-like viewer for csv, parquet and arrow files with sort and filter menus.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Data file to show
    path: String,

    /// File written by "Open in external viewer"
    #[arg(long, default_value = DEFAULT_EXPORT_FILE)]
    export_path: String,

    /// Milliseconds to wait for input before redrawing
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    #[arg(long, default_value = "dftable.log")]
    log_file: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<PathBuf, DTError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| DTError::LoadingFailed(e.to_string()))
}

fn run(args: Args) -> Result<(), DTError> {
    logging::init(&expand(&args.log_file)?)?;
    info!("Starting dftable with {:?}", args);

    let cfg = TableConfig::default()
        .event_poll_time(args.poll_ms)
        .max_column_width(args.max_column_width)
        .export_path(expand(&args.export_path)?);

    // Load before taking over the terminal so errors end up on stderr
    let (width, height) = terminal::size()?;
    let mut model = Model::init(&cfg, width as usize, height as usize);
    model.load_data_file(expand(&args.path)?)?;

    let mut terminal = ratatui::init();
    let res = execute!(stdout(), EnableMouseCapture)
        .map_err(DTError::from)
        .and_then(|_| event_loop(&mut terminal, &mut model, &cfg));
    let released = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();
    res?;
    released?;
    Ok(())
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    cfg: &TableConfig,
) -> Result<(), DTError> {
    let mut ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(model, f))?;

        if let Some(message) = controller.handle_event(model)? {
            model.update(Some(message))?;
        }
    }
    Ok(())
}
