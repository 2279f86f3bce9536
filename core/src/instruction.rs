use crate::opcode::Opcode;
use crate::operations::*;
use crate::random::RandomSource;
use crate::state::State;

/// One instruction of the Chip-8 instruction set
pub type Operation = fn(op: &dyn Opcode, state: &State, rng: &mut dyn RandomSource) -> Outcome;

/// An entry of the primary table
#[derive(Clone, Copy)]
enum Group {
    /// The group holds a single operation
    Unique(Operation),
    /// The group is shared; the least significant nibble picks the operation
    ByNibble(&'static [Operation; 16]),
    /// The group is shared; the least significant byte picks the operation
    ByByte(&'static [Operation; 256]),
}

/// Indexed by the most significant nibble
const PRIMARY: [Group; 16] = [
    Group::ByNibble(&GROUP_0),
    Group::Unique(jump),
    Group::Unique(call),
    Group::Unique(ske),
    Group::Unique(skne),
    Group::Unique(skre),
    Group::Unique(load),
    Group::Unique(add),
    Group::ByNibble(&GROUP_8),
    Group::Unique(skrne),
    Group::Unique(loadi),
    Group::Unique(jumpi),
    Group::Unique(rnd),
    Group::Unique(draw),
    Group::ByNibble(&GROUP_E),
    Group::ByByte(&GROUP_F),
];

const GROUP_0: [Operation; 16] = {
    let mut table = [nop as Operation; 16];
    table[0x0] = clr;
    table[0xE] = rts;
    table
};

const GROUP_8: [Operation; 16] = {
    let mut table = [nop as Operation; 16];
    table[0x0] = mv;
    table[0x1] = or;
    table[0x2] = and;
    table[0x3] = xor;
    table[0x4] = addr;
    table[0x5] = sub;
    table[0x6] = shr;
    table[0x7] = subn;
    table[0xE] = shl;
    table
};

const GROUP_E: [Operation; 16] = {
    let mut table = [nop as Operation; 16];
    table[0x1] = skup;
    table[0xE] = skpr;
    table
};

const GROUP_F: [Operation; 256] = {
    let mut table = [nop as Operation; 256];
    table[0x07] = getdt;
    table[0x0A] = keyd;
    table[0x15] = setdt;
    table[0x18] = setst;
    table[0x1E] = addi;
    table[0x29] = ldspr;
    table[0x33] = bcd;
    table[0x55] = stor;
    table[0x65] = read;
    table
};

/// Selects the correct Instruction for a given Opcode.
/// Opcodes without an instruction select `nop`.
pub fn from_op(op: &dyn Opcode) -> Operation {
    match PRIMARY[op.group() as usize] {
        Group::Unique(operation) => operation,
        Group::ByNibble(table) => table[op.n() as usize],
        Group::ByByte(table) => table[op.kk() as usize],
    }
}
