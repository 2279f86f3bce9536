use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

use chip8_core::Keypad;

use crate::keymap::keymap;

/// Terminals report key presses but never releases, so a pressed key is held down
/// for this many cycles (refreshed by key repeat while the host key stays down).
pub const KEY_HOLD_CYCLES: u16 = 100;

/// Translates terminal key events into keypad state
#[derive(Default)]
pub struct Keyboard {
    held: [u16; 16],
}

/// What the user asked for since the last poll
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Continue,
    Quit,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains every pending terminal event without blocking
    pub fn poll(&mut self) -> crossterm::Result<Command> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if self.handle(key) == Command::Quit {
                    return Ok(Command::Quit);
                }
            }
        }
        Ok(Command::Continue)
    }

    fn handle(&mut self, key: KeyEvent) -> Command {
        match key.code {
            KeyCode::Esc => Command::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Command::Quit,
            code => {
                if let Some(k) = keymap(code) {
                    trace!("key {:X} down", k);
                    self.held[k as usize] = KEY_HOLD_CYCLES;
                }
                Command::Continue
            }
        }
    }

    /// The keypad for the coming cycle; holds count down by one
    pub fn tick(&mut self) -> Keypad {
        let mut keys = [false; 16];
        for (pressed, held) in keys.iter_mut().zip(self.held.iter_mut()) {
            *pressed = *held > 0;
            *held = held.saturating_sub(1);
        }
        keys
    }
}
