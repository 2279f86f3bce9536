use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{info, warn};

use chip8_core::Chip8;
use chip8_display::Display;

use crate::input::{Command, Keyboard};
use crate::Opt;

pub fn run(opt: &Opt) -> anyhow::Result<()> {
    let mut chip8 = match opt.seed {
        Some(seed) => Chip8::with_seed(seed),
        None => Chip8::new(),
    };

    // Load ROM before touching the terminal so errors print normally
    chip8
        .load_rom_file(&opt.rom)
        .with_context(|| format!("could not load {}", opt.rom.display()))?;
    info!("loaded {}", opt.rom.display());

    let mut display = Display::new(opt.scale).context("could not set up the terminal")?;
    if !display.fits()? {
        warn!("terminal is too small to show the whole screen at scale {}", opt.scale);
    }
    let mut keyboard = Keyboard::new();

    // Set initial timing
    let cycle_time = Duration::from_millis(opt.delay);
    let mut last_cycle = Instant::now();

    loop {
        // Handle input
        if keyboard.poll()? == Command::Quit {
            break;
        }
        chip8.set_keys(keyboard.tick());

        // Update state
        chip8.cycle().context("program stopped")?;

        // If the draw flag is set, render the current frame
        if let Some(frame) = chip8.get_frame() {
            display.render(frame)?;
        }

        // Handle timing
        let elapsed_cycle_time = last_cycle.elapsed();
        if cycle_time > elapsed_cycle_time {
            thread::sleep(cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    }

    Ok(())
}
