use thiserror::Error;

use crate::constants::MAX_ROM_SIZE;

/// Everything that can go wrong while loading or running a program.
///
/// Unmapped opcodes are not errors; they execute as no-ops.
#[derive(Error, Debug)]
pub enum Chip8Error {
    #[error("unable to read ROM: {0}")]
    Io(#[from] std::io::Error),

    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("stack overflow: call at {address:#05X} with a full call stack")]
    StackOverflow { address: u16 },

    #[error("stack underflow: return at {address:#05X} with an empty call stack")]
    StackUnderflow { address: u16 },
}

impl Chip8Error {
    pub(crate) fn rom_too_large(size: usize) -> Self {
        Chip8Error::RomTooLarge {
            size,
            max: MAX_ROM_SIZE,
        }
    }

    /// Whether the error was raised by an executing program rather than by loading one
    pub fn is_stack_fault(&self) -> bool {
        matches!(
            self,
            Chip8Error::StackOverflow { .. } | Chip8Error::StackUnderflow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_too_large_message() {
        let err = Chip8Error::rom_too_large(4000);
        assert_eq!(
            err.to_string(),
            "ROM is too large (4000 bytes), max size is 3584 bytes"
        );
        assert!(!err.is_stack_fault());
    }

    #[test]
    fn test_stack_fault_messages() {
        let err = Chip8Error::StackUnderflow { address: 0x202 };
        assert_eq!(
            err.to_string(),
            "stack underflow: return at 0x202 with an empty call stack"
        );
        assert!(err.is_stack_fault());
        let err = Chip8Error::StackOverflow { address: 0x220 };
        assert_eq!(
            err.to_string(),
            "stack overflow: call at 0x220 with a full call stack"
        );
    }
}
