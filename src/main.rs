//! Blockfall: the classic falling-block puzzle game in the terminal.

mod app;
mod board;
mod input;
mod shape;
mod sound;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

/// Options derived from CLI that affect how the game runs.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Scheduler period between gravity steps.
    pub tick: Duration,
    /// Fixed piece sequence for reproducible games.
    pub seed: Option<u64>,
    pub mute: bool,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("theme not loaded, using classic colours: {e}");
        let mut theme = theme::Theme::classic();
        theme.apply_palette(args.palette);
        theme
    });
    let config = GameConfig {
        tick: Duration::from_millis(args.tick_ms.max(1)),
        seed: args.seed,
        mute: args.mute,
        no_animation: args.no_animation,
    };
    info!("starting with {config:?}");

    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Log to a file; the terminal belongs to the game. `RUST_LOG` overrides the default filter.
fn init_logging(path: &std::path::Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}

/// Classic falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Classic falling-block puzzle in the terminal. Fill horizontal lines to clear them and score.",
    long_about = "Blockfall is the classic falling-block puzzle on a 10x22 board.\n\n\
        Seven kinds of four-square pieces fall one row per tick. Move and rotate them; when a \
        piece cannot fall further it locks. Every full line is removed and scores one point. \
        The game ends when a new piece has no room to appear.\n\n\
        CONTROLS:\n  Left/Right  Move       Up        Rotate left   Down   Rotate right\n  \
        Space       Drop       D         One line down P      Pause\n  \
        R           Restart (after game over)          Q / Esc Quit\n\n\
        Vim keys h/l move, k/j rotate. Use --theme to load a btop-style theme file."
)]
pub struct Args {
    /// Time between gravity steps in milliseconds.
    #[arg(long, default_value = "300", value_name = "MS")]
    pub tick_ms: u64,

    /// Seed for the piece sequence. Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the classic colours if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// No background music.
    #[arg(short, long)]
    pub mute: bool,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Where to write the log.
    #[arg(long, default_value = "blockfall.log", value_name = "FILE")]
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
