//! A CHIP-8 interpreter.
//!
//! The [`Chip8`] machine owns all interpreter state; a driver loads a ROM, writes the
//! keypad, calls [`Chip8::cycle`] at whatever rate it likes and reads the frame buffer back.
pub use chip8::Chip8;
pub use error::Chip8Error;
pub use random::RandomSource;
pub use state::{FrameBuffer, Keypad, State};

mod chip8;
pub mod constants;
mod error;
mod instruction;
mod opcode;
mod operations;
pub mod random;
pub mod state;
