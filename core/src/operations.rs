use tracing::debug;

use crate::constants::{
    ADDRESS_MASK, DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_GLYPH_SIZE, FONT_START, PIXEL_OFF,
    PIXEL_ON, STACK_SIZE, VF,
};
use crate::error::Chip8Error;
use crate::opcode::Opcode;
use crate::random::RandomSource;
use crate::state::State;

/// The next state, or the fault that stopped the instruction
pub type Outcome = Result<State, Chip8Error>;

// Every operation receives a state whose pc already points past the instruction.

/// Address of the instruction being executed
fn current(state: &State) -> u16 {
    state.pc.wrapping_sub(0x2) & ADDRESS_MASK
}

/// `base + offset`, wrapped to the address space
fn address(base: u16, offset: usize) -> usize {
    (usize::from(base) + offset) & usize::from(ADDRESS_MASK)
}

fn skip_if(condition: bool, state: &State) -> Outcome {
    let pc = if condition {
        (state.pc + 0x2) & ADDRESS_MASK
    } else {
        state.pc
    };
    Ok(State { pc, ..*state })
}

/// unmapped opcode
pub fn nop(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let (g, x, y, n) = op.nibbles();
    debug!(
        "no operation for {:X}{:X}{:X}{:X} at {:03X}",
        g,
        x,
        y,
        n,
        current(state)
    );
    Ok(*state)
}

/// clear
pub fn clr(_op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    Ok(State {
        frame_buffer: [[PIXEL_OFF; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        draw_flag: true,
        ..*state
    })
}

/// PC = STACK.pop()
pub fn rts(_op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    if state.sp == 0 {
        return Err(Chip8Error::StackUnderflow {
            address: current(state),
        });
    }
    let sp = state.sp - 0x1;
    Ok(State {
        pc: state.stack[sp as usize],
        sp,
        ..*state
    })
}

/// PC = addr
pub fn jump(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    Ok(State {
        pc: op.nnn(),
        ..*state
    })
}

/// STACK.push(PC); PC = addr
pub fn call(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    if state.sp as usize >= STACK_SIZE {
        return Err(Chip8Error::StackOverflow {
            address: current(state),
        });
    }
    let mut stack = state.stack;
    stack[state.sp as usize] = state.pc;
    Ok(State {
        pc: op.nnn(),
        sp: state.sp + 0x1,
        stack,
        ..*state
    })
}

/// if Vx == kk then pc += 2
pub fn ske(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    skip_if(state.v[op.x()] == op.kk(), state)
}

/// if Vx != kk then pc += 2
pub fn skne(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    skip_if(state.v[op.x()] != op.kk(), state)
}

/// if Vx == Vy then pc += 2
pub fn skre(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    skip_if(state.v[op.x()] == state.v[op.y()], state)
}

/// Vx = kk
pub fn load(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    v[op.x()] = op.kk();
    Ok(State { v, ..*state })
}

/// Vx += kk
/// Overflow wraps and leaves VF alone
pub fn add(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    v[op.x()] = v[op.x()].wrapping_add(op.kk());
    Ok(State { v, ..*state })
}

/// Vx = Vy
pub fn mv(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    v[op.x()] = v[op.y()];
    Ok(State { v, ..*state })
}

/// Vx |= Vy
pub fn or(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    v[op.x()] |= v[op.y()];
    Ok(State { v, ..*state })
}

/// Vx &= Vy
pub fn and(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    v[op.x()] &= v[op.y()];
    Ok(State { v, ..*state })
}

/// Vx ^= Vy
pub fn xor(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    v[op.x()] ^= v[op.y()];
    Ok(State { v, ..*state })
}

// The flag-setting arithmetic below reads both operands up front and writes VF
// last, so VF ends up holding the flag when x is F.

/// Vx += Vy; VF = carry
pub fn addr(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let (res, carry) = state.v[op.x()].overflowing_add(state.v[op.y()]);
    let mut v = state.v;
    v[op.x()] = res;
    v[VF] = carry as u8;
    Ok(State { v, ..*state })
}

/// Vx -= Vy; VF = Vx > Vy
pub fn sub(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let (vx, vy) = (state.v[op.x()], state.v[op.y()]);
    let mut v = state.v;
    v[op.x()] = vx.wrapping_sub(vy);
    v[VF] = (vx > vy) as u8;
    Ok(State { v, ..*state })
}

/// Vx >>= 1; VF = shifted out bit
pub fn shr(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let vx = state.v[op.x()];
    let mut v = state.v;
    v[op.x()] = vx >> 1;
    v[VF] = vx & 0x1;
    Ok(State { v, ..*state })
}

/// Vx = Vy - Vx; VF = Vy > Vx
pub fn subn(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let (vx, vy) = (state.v[op.x()], state.v[op.y()]);
    let mut v = state.v;
    v[op.x()] = vy.wrapping_sub(vx);
    v[VF] = (vy > vx) as u8;
    Ok(State { v, ..*state })
}

/// Vx <<= 1; VF = shifted out bit
pub fn shl(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let vx = state.v[op.x()];
    let mut v = state.v;
    v[op.x()] = vx << 1;
    v[VF] = (vx >> 7) & 0x1;
    Ok(State { v, ..*state })
}

/// if Vx != Vy then pc += 2
pub fn skrne(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    skip_if(state.v[op.x()] != state.v[op.y()], state)
}

/// I = addr
pub fn loadi(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    Ok(State {
        i: op.nnn(),
        ..*state
    })
}

/// PC = V0 + addr
pub fn jumpi(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    Ok(State {
        pc: (u16::from(state.v[0x0]) + op.nnn()) & ADDRESS_MASK,
        ..*state
    })
}

/// Vx = rand_byte & kk
pub fn rnd(op: &dyn Opcode, state: &State, rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    v[op.x()] = rng.random_byte() & op.kk();
    Ok(State { v, ..*state })
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs the n-row sprite at memory I.. onto the FrameBuffer.
/// The origin wraps around the screen; the rest of the sprite is clipped at the edges.
/// Sets VF if any lit pixel is erased.
pub fn draw(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    let mut frame_buffer = state.frame_buffer;
    let x0 = state.v[op.x()] as usize % DISPLAY_WIDTH;
    let y0 = state.v[op.y()] as usize % DISPLAY_HEIGHT;

    // Reset the flag (used for collision detection)
    v[VF] = 0x0;

    for row in 0..op.n() as usize {
        let y = y0 + row;
        if y >= DISPLAY_HEIGHT {
            break;
        }
        let sprite = state.memory[address(state.i, row)];
        for bit in 0..8 {
            let x = x0 + bit;
            if x >= DISPLAY_WIDTH {
                break;
            }
            if (sprite >> (7 - bit)) & 0x1 == 0 {
                continue;
            }
            if frame_buffer[y][x] == PIXEL_ON {
                v[VF] = 0x1;
            }
            frame_buffer[y][x] ^= PIXEL_ON;
        }
    }

    Ok(State {
        draw_flag: true,
        v,
        frame_buffer,
        ..*state
    })
}

/// Pressed status of the key named by the low nibble of Vx
fn key_of(op: &dyn Opcode, state: &State) -> bool {
    state.keypad[usize::from(state.v[op.x()] & 0xF)]
}

/// if Vx.pressed then pc += 2
pub fn skpr(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    skip_if(key_of(op, state), state)
}

/// if !Vx.pressed then pc += 2
pub fn skup(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    skip_if(!key_of(op, state), state)
}

/// Vx = DT
pub fn getdt(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    v[op.x()] = state.delay_timer;
    Ok(State { v, ..*state })
}

/// Vx = await keypress
/// With nothing pressed pc is wound back so this instruction runs again next cycle.
/// With several keys pressed the lowest one wins.
pub fn keyd(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    match state.keypad.iter().position(|&pressed| pressed) {
        Some(key) => {
            let mut v = state.v;
            v[op.x()] = key as u8;
            Ok(State { v, ..*state })
        }
        None => Ok(State {
            pc: current(state),
            ..*state
        }),
    }
}

/// DT = Vx
pub fn setdt(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    Ok(State {
        delay_timer: state.v[op.x()],
        ..*state
    })
}

/// ST = Vx
pub fn setst(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    Ok(State {
        sound_timer: state.v[op.x()],
        ..*state
    })
}

/// I += Vx
pub fn addi(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    Ok(State {
        i: state.i.wrapping_add(u16::from(state.v[op.x()])),
        ..*state
    })
}

/// I = address of the sprite sheet glyph for Vx
/// See constants::SPRITE_SHEET
pub fn ldspr(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    Ok(State {
        i: FONT_START + FONT_GLYPH_SIZE * u16::from(state.v[op.x()]),
        ..*state
    })
}

/// mem[I..I+3] = bcd(Vx)
pub fn bcd(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let vx = state.v[op.x()];
    let digits = [vx / 100, vx / 10 % 10, vx % 10];
    let mut memory = state.memory;
    for (offset, digit) in digits.into_iter().enumerate() {
        memory[address(state.i, offset)] = digit;
    }
    Ok(State { memory, ..*state })
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut memory = state.memory;
    for (offset, value) in state.v[..=op.x()].iter().enumerate() {
        memory[address(state.i, offset)] = *value;
    }
    Ok(State { memory, ..*state })
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(op: &dyn Opcode, state: &State, _rng: &mut dyn RandomSource) -> Outcome {
    let mut v = state.v;
    for (offset, register) in v[..=op.x()].iter_mut().enumerate() {
        *register = state.memory[address(state.i, offset)];
    }
    Ok(State { v, ..*state })
}
