//! The read-only microcode images that drive an IK13 chip.
//!
//! Each IK13 role (1302, 1303, 1306) is mask-programmed with its own [`Rom`]:
//! 68 micro-instructions, a 256-entry instruction (branch target) table keyed
//! by opcode, and a 1152-byte flat table of micro-program steps.

use bitfield::bitfield;

bitfield! {
    /// A single 32-bit micro-instruction word.
    ///
    /// Decodes into the four control fields a micro-tick consults: `AMK`
    /// (the field-mask selector), `ASP` (the next sync-program address),
    /// `AK` (the ALU operation) and `MOD` (the mode bits).
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct MicroInstruction(u32);
    impl Debug;
    u8;
    /// The field-mask selector (`AMK`).
    pub amk, set_amk: 7, 0;
    /// The next sync-program address (`ASP`).
    pub asp, set_asp: 15, 8;
    /// The ALU operation selector (`AK`).
    pub ak, set_ak: 23, 16;
    /// The mode bits (`MOD`).
    pub r#mod, set_mod: 31, 24;
}

impl MicroInstruction {
    /// The all-zero micro-instruction latched before the first ROM fetch.
    pub const EMPTY: Self = Self(0);

    /// Build a micro-instruction word from its raw 32-bit encoding, e.g.
    /// when restoring one latched mid-tick from a serialised engine state.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// The raw 32-bit encoding of this micro-instruction word.
    #[must_use]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl Default for MicroInstruction {
    fn default() -> Self {
        Self::EMPTY
    }
}

bitfield! {
    /// A single 32-bit instruction table entry.
    ///
    /// Indexed by opcode, an [`Instruction`] resolves the micro-program
    /// address a branch should dispatch to, and whether the opcode is a
    /// conditional branch at all.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Instruction(u32);
    impl Debug;
    u16;
    /// The micro-program address this opcode dispatches to when taken.
    pub micro_addr, set_micro_addr: 15, 0;
    u8;
    /// Non-zero when this opcode is conditional on the chip's status latch.
    pub conditional, set_conditional: 23, 16;
}

impl Instruction {
    /// The all-zero (non-branching) instruction entry.
    pub const EMPTY: Self = Self(0);
}

impl Default for Instruction {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// One IK13 role's immutable microcode image.
///
/// Mirrors the three flat tables a real IK13 is manufactured with. Nothing
/// in this crate can produce an authentic image — a complete implementation
/// needs a genuine MK-61 ROM dump supplied by the embedder.
#[derive(Debug, Clone)]
pub struct Rom {
    microinstructions: [MicroInstruction; Self::MICROINSTRUCTION_COUNT],
    instructions: [Instruction; Self::INSTRUCTION_COUNT],
    microprograms: [u8; Self::MICROPROGRAM_BYTES],
}

impl Rom {
    /// Number of micro-instruction slots on a single IK13.
    pub const MICROINSTRUCTION_COUNT: usize = 68;
    /// Number of opcode slots in the instruction (branch target) table.
    pub const INSTRUCTION_COUNT: usize = 256;
    /// Size, in bytes, of the flat micro-program step table.
    pub const MICROPROGRAM_BYTES: usize = 1152;

    /// Create a new (all-zero) ROM image.
    #[must_use]
    pub fn new() -> Self {
        Self {
            microinstructions: [MicroInstruction::EMPTY; Self::MICROINSTRUCTION_COUNT],
            instructions: [Instruction::EMPTY; Self::INSTRUCTION_COUNT],
            microprograms: [0; Self::MICROPROGRAM_BYTES],
        }
    }

    /// Build a ROM image from already-decoded tables.
    ///
    /// # Panics
    ///
    /// If any table's length does not match this chip's fixed table sizes.
    #[must_use]
    pub fn from_tables(
        microinstructions: &[MicroInstruction],
        instructions: &[Instruction],
        microprograms: &[u8],
    ) -> Self {
        assert_eq!(
            microinstructions.len(),
            Self::MICROINSTRUCTION_COUNT,
            "micro-instruction table must have exactly {} entries",
            Self::MICROINSTRUCTION_COUNT
        );
        assert_eq!(
            instructions.len(),
            Self::INSTRUCTION_COUNT,
            "instruction table must have exactly {} entries",
            Self::INSTRUCTION_COUNT
        );
        assert_eq!(
            microprograms.len(),
            Self::MICROPROGRAM_BYTES,
            "micro-program table must be exactly {} bytes",
            Self::MICROPROGRAM_BYTES
        );

        let mut rom = Self::new();
        rom.microinstructions.copy_from_slice(microinstructions);
        rom.instructions.copy_from_slice(instructions);
        rom.microprograms.copy_from_slice(microprograms);
        rom
    }

    /// Look up a micro-instruction word by its index in the micro-instruction table.
    #[must_use]
    pub fn microinstruction(&self, index: u8) -> MicroInstruction {
        self.microinstructions[index as usize % Self::MICROINSTRUCTION_COUNT]
    }

    /// Look up an opcode's instruction (branch target) table entry.
    #[must_use]
    pub fn instruction(&self, opcode: u8) -> Instruction {
        self.instructions[opcode as usize]
    }

    /// Read a single byte out of the flat micro-program table.
    #[must_use]
    pub fn microprogram_step(&self, addr: u16) -> u8 {
        self.microprograms[addr as usize % Self::MICROPROGRAM_BYTES]
    }
}

impl Default for Rom {
    fn default() -> Self {
        Self::new()
    }
}

/// The three IK13 ROM images a complete engine needs, one per chip role.
#[derive(Debug, Clone, Default)]
pub struct RomSet {
    /// The ROM image driving the IK1302 role.
    pub ik1302: Rom,
    /// The ROM image driving the IK1303 role.
    pub ik1303: Rom,
    /// The ROM image driving the IK1306 role.
    pub ik1306: Rom,
}

impl RomSet {
    /// Create an engine-ready ROM set out of three already-loaded images.
    #[must_use]
    pub fn new(ik1302: Rom, ik1303: Rom, ik1306: Rom) -> Self {
        Self {
            ik1302,
            ik1303,
            ik1306,
        }
    }
}
