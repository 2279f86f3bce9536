use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::rngs::StdRng;
use tracing::{debug, trace};

use crate::constants::{ADDRESS_MASK, MAX_ROM_SIZE, PROGRAM_START};
use crate::error::Chip8Error;
use crate::instruction::from_op;
use crate::random::{self, RandomSource};
use crate::state::{FrameBuffer, Keypad, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - the random byte source consumed by `Cxkk`
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing the machine by a single cycle
/// - inspecting its frame buffer for rendering by some display
///
/// How often `cycle` is called is up to the caller; the machine keeps no clock.
pub struct Chip8<R = StdRng> {
    state: State,
    rng: R,
}

impl Chip8 {
    /// A machine whose random bytes are seeded from the system clock
    pub fn new() -> Self {
        Chip8::with_random(random::time_seeded())
    }

    /// A machine whose random bytes replay for the same `seed`
    pub fn with_seed(seed: u64) -> Self {
        Chip8::with_random(random::seeded(seed))
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RandomSource> Chip8<R> {
    pub fn with_random(rng: R) -> Self {
        Chip8 {
            state: State::new(),
            rng,
        }
    }

    /// Load a rom from a reader
    ///
    /// The whole rom is read and checked before memory is touched, so a failed load
    /// leaves the machine as it was.
    ///
    /// # Arguments
    /// * `reader` a reader that yields a raw ROM image
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<(), Chip8Error> {
        let mut program = Vec::new();
        reader.read_to_end(&mut program)?;
        self.load_program(&program)
    }

    /// Load a rom from a file on disk
    pub fn load_rom_file(&mut self, path: impl AsRef<Path>) -> Result<(), Chip8Error> {
        let mut file = File::open(path)?;
        self.load_rom(&mut file)
    }

    /// Copy `program` into memory starting at 0x200
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        if program.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::rom_too_large(program.len()));
        }
        let start = PROGRAM_START as usize;
        self.state.memory[start..start + program.len()].copy_from_slice(program);
        debug!("loaded {} byte ROM at {:03X}", program.len(), PROGRAM_START);
        Ok(())
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the key that was pressed, 0x0..=0xF; anything else is ignored
    pub fn key_press(&mut self, key: u8) {
        if let Some(pressed) = self.state.keypad.get_mut(key as usize) {
            *pressed = true;
        }
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the key that was released, 0x0..=0xF; anything else is ignored
    pub fn key_release(&mut self, key: u8) {
        if let Some(pressed) = self.state.keypad.get_mut(key as usize) {
            *pressed = false;
        }
    }

    /// Replace the pressed status of every key at once
    pub fn set_keys(&mut self, keys: Keypad) {
        self.state.keypad = keys;
    }

    /// Advances the machine by a single cycle
    /// - gets the opcode at pc and moves pc past it
    /// - executes the opcode
    /// - ticks both timers
    ///
    /// A stack fault is returned without changing anything, so pc still points at
    /// the offending instruction.
    pub fn cycle(&mut self) -> Result<(), Chip8Error> {
        let op: u16 = self.get_op();
        trace!(
            "{:04X} v{:02X?} i{:04X} pc{:04X}",
            op,
            self.state.v,
            self.state.i,
            self.state.pc
        );
        let fetched = State {
            pc: (self.state.pc + 0x2) & ADDRESS_MASK,
            ..self.state
        };
        let instruction = from_op(&op);
        self.state = instruction(&op, &fetched, &mut self.rng)?;
        self.advance_timers();
        Ok(())
    }

    /// Decrements each timer that hasn't reached zero yet
    fn advance_timers(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn get_op(&self) -> u16 {
        let pc = self.state.pc & ADDRESS_MASK;
        let left = self.state.memory[pc as usize];
        let right = self.state.memory[((pc + 1) & ADDRESS_MASK) as usize];
        u16::from_be_bytes([left, right])
    }

    /// Returns the FrameBuffer if the display should be redrawn
    /// and marks it as drawn
    pub fn get_frame(&mut self) -> Option<&FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(&self.state.frame_buffer)
        } else {
            None
        }
    }

    /// The FrameBuffer as of the last cycle
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn delay_timer(&self) -> u8 {
        self.state.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.state.sound_timer
    }

    /// Whether a tone should be playing
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PIXEL_ON, STACK_SIZE};
    use pretty_assertions::assert_eq;
    use rand::rngs::mock::StepRng;

    fn with_program(program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_program(program).unwrap();
        chip8
    }

    #[test]
    fn test_chip8_gets_op() {
        let mut chip8 = Chip8::new();
        chip8.state.memory[0x200..0x202].copy_from_slice(&[0xAA, 0xBB]);
        assert_eq!(chip8.get_op(), 0xAABB);
    }

    #[test]
    fn test_cycle_advances_pc() {
        let mut chip8 = with_program(&[0x00, 0xE0]);
        let starting_pc = chip8.state.pc;
        chip8.cycle().unwrap();
        assert_eq!(chip8.state.pc, starting_pc + 0x2);
    }

    #[test]
    fn test_cycle_runs_through_zeroed_memory() {
        let mut chip8 = Chip8::with_seed(0);
        for _ in 0..4 {
            chip8.cycle().unwrap();
        }
        assert_eq!(chip8.state.pc, 0x208);
    }

    #[test]
    fn test_load_then_skip() {
        let mut chip8 = with_program(&[0x6A, 0x07, 0x3A, 0x07]);
        chip8.cycle().unwrap();
        chip8.cycle().unwrap();
        assert_eq!(chip8.state.pc, 0x206);
        assert_eq!(chip8.state.v[0xA], 7);
    }

    #[test]
    fn test_call_then_return() {
        let mut program = vec![0u8; 0x102];
        // 0x200: call 0x300
        program[0x000..0x002].copy_from_slice(&[0x23, 0x00]);
        // 0x300: return
        program[0x100..0x102].copy_from_slice(&[0x00, 0xEE]);
        let mut chip8 = with_program(&program);

        chip8.cycle().unwrap();
        assert_eq!(chip8.state.pc, 0x300);
        assert_eq!(chip8.state.sp, 1);
        chip8.cycle().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.sp, 0);
    }

    #[test]
    fn test_17_nested_calls_overflow() {
        // Each call targets the next instruction
        let mut program = Vec::new();
        for n in 0..17u16 {
            let target = 0x202 + 2 * n;
            program.extend_from_slice(&(0x2000 | target).to_be_bytes());
        }
        let mut chip8 = with_program(&program);
        for _ in 0..STACK_SIZE {
            chip8.cycle().unwrap();
        }
        assert_eq!(chip8.state.sp, 16);
        let before = chip8.state;
        match chip8.cycle() {
            Err(Chip8Error::StackOverflow { address }) => assert_eq!(address, 0x220),
            other => panic!("expected overflow, got {:?}", other),
        }
        assert_eq!(chip8.state, before);
    }

    #[test]
    fn test_return_with_empty_stack_fails() {
        let mut chip8 = with_program(&[0x00, 0xEE]);
        let err = chip8.cycle().unwrap_err();
        assert!(matches!(err, Chip8Error::StackUnderflow { address: 0x200 }));
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_timers_tick_once_per_cycle() {
        // LD V0, 3; LD DT, V0; LD ST, V0
        let mut chip8 = with_program(&[0x60, 0x03, 0xF0, 0x15, 0xF0, 0x18]);
        chip8.cycle().unwrap();
        chip8.cycle().unwrap();
        assert_eq!(chip8.delay_timer(), 2);
        chip8.cycle().unwrap();
        assert_eq!(chip8.delay_timer(), 1);
        assert_eq!(chip8.sound_timer(), 2);
        assert!(chip8.sound_active());
        for _ in 0..4 {
            chip8.cycle().unwrap();
        }
        assert_eq!(chip8.delay_timer(), 0);
        assert_eq!(chip8.sound_timer(), 0);
        assert!(!chip8.sound_active());
    }

    #[test]
    fn test_key_wait_repeats_until_pressed() {
        let mut chip8 = with_program(&[0xF5, 0x0A]);
        chip8.cycle().unwrap();
        chip8.cycle().unwrap();
        assert_eq!(chip8.state.pc, 0x200);
        chip8.key_press(0xB);
        chip8.cycle().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.v[0x5], 0xB);
    }

    #[test]
    fn test_key_press_and_release() {
        let mut chip8 = Chip8::new();
        chip8.key_press(0x3);
        assert!(chip8.state.keypad[0x3]);
        chip8.key_release(0x3);
        assert!(!chip8.state.keypad[0x3]);
        // out of range keys are ignored
        chip8.key_press(0x10);
        assert_eq!(chip8.state.keypad, [false; 16]);
        let mut keys = [false; 16];
        keys[0xF] = true;
        chip8.set_keys(keys);
        assert_eq!(chip8.state.keypad, keys);
    }

    #[test]
    fn test_load_rom_from_reader() {
        let mut chip8 = Chip8::new();
        let mut rom: &[u8] = &[0x12, 0x34, 0x56];
        chip8.load_rom(&mut rom).unwrap();
        assert_eq!(&chip8.state.memory[0x200..0x203], &[0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_load_largest_rom() {
        let mut chip8 = Chip8::new();
        chip8.load_program(&[0xAB; MAX_ROM_SIZE]).unwrap();
        assert_eq!(chip8.state.memory[0xFFF], 0xAB);
    }

    #[test]
    fn test_rom_too_large_leaves_memory() {
        let mut chip8 = Chip8::new();
        let before = chip8.state;
        let err = chip8.load_program(&[0xAB; MAX_ROM_SIZE + 1]).unwrap_err();
        assert!(matches!(
            err,
            Chip8Error::RomTooLarge {
                size: 3585,
                max: 3584
            }
        ));
        assert_eq!(chip8.state, before);
    }

    #[test]
    fn test_missing_rom_file() {
        let mut chip8 = Chip8::new();
        let err = chip8
            .load_rom_file("this/rom/does/not/exist.ch8")
            .unwrap_err();
        assert!(matches!(err, Chip8Error::Io(_)));
    }

    #[test]
    fn test_get_frame_only_after_draw() {
        // LD F, V0 (glyph 0); DRW V0, V0, 5
        let mut chip8 = with_program(&[0xF0, 0x29, 0xD0, 0x05]);
        chip8.cycle().unwrap();
        assert!(chip8.get_frame().is_none());
        chip8.cycle().unwrap();
        let frame = chip8.get_frame().unwrap();
        assert_eq!(frame[0][0], PIXEL_ON);
        assert!(chip8.get_frame().is_none());
        assert_eq!(chip8.frame_buffer()[0][0], PIXEL_ON);
    }

    #[test]
    fn test_random_source_is_injected() {
        // RND V2, 0xFF
        let mut chip8 = Chip8::with_random(StepRng::new(0x5A, 0));
        chip8.load_program(&[0xC2, 0xFF]).unwrap();
        chip8.cycle().unwrap();
        assert_eq!(chip8.state().v[0x2], 0x5A);
    }

    #[test]
    fn test_same_seed_same_run() {
        // RND V0..V3 then loop forever
        let program = [0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0xFF, 0xC3, 0xFF, 0x12, 0x08];
        let mut a = Chip8::with_seed(42);
        let mut b = Chip8::with_seed(42);
        a.load_program(&program).unwrap();
        b.load_program(&program).unwrap();
        for _ in 0..10 {
            a.cycle().unwrap();
            b.cycle().unwrap();
        }
        assert_eq!(a.state().v, b.state().v);
        assert_eq!(a.state(), b.state());
    }
}
