use std::path::PathBuf;
use std::process::exit;

use clap::{ArgAction, Parser};
use tracing::error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

mod input;
mod keymap;
mod run;

/// Runs a CHIP-8 ROM in the terminal.
///
/// Keys 1234/QWER/ASDF/ZXCV form the hex keypad; Esc quits.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Opt {
    /// Raw ROM image to load at 0x200
    rom: PathBuf,

    /// Size multiplier for each pixel
    #[arg(short, long, default_value_t = 1)]
    scale: usize,

    /// Milliseconds between cycles
    #[arg(short, long, default_value_t = 2)]
    delay: u64,

    /// Fixed seed for the random number opcode, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Increase the level of verbosity. Can be used multiple times.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Opt {
    const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "chip8=info,chip8_core=info,warn",
            2 => "chip8=debug,chip8_core=debug,info",
            3..=u8::MAX => "trace",
        }
    }

    fn filter_layer(&self) -> EnvFilter {
        // Parse log level from env, or infer from args
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_filter()))
    }
}

fn main() {
    let opt = Opt::parse();

    // Logs go to stderr; the terminal itself belongs to the display
    tracing_subscriber::registry()
        .with(opt.filter_layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();

    if let Err(e) = run::run(&opt) {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        exit(1);
    }
}
