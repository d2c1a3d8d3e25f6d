//! A cycle-accurate model of the IK13 single-chip processor.
//!
//! Three IK13 instances make up the chipset, one per role (`IK1302`,
//! `IK1303`, `IK1306`). Each carries its own microcode ROM but the same
//! register/latch layout and the same `tick` algorithm; what distinguishes a
//! role is which register addresses the front panel and the number reader
//! treat as meaningful, and that only `IK1302` samples the key matrix.

pub mod fields;

use std::rc::Rc;

use fields::{AluOp, Field};

use crate::nibble::{bcd_add, bcd_sub, Nibble};
use crate::rom::{MicroInstruction, Rom};

/// Number of nibble positions in one of the three [`Ik13`] register files.
pub const REGISTER_LEN: usize = 42;

// A register file is three 14-wide stack-visible segments back to back;
// `Field::contains` below reduces the current micro-tick modulo
// `fields::SEGMENT_LEN` on that assumption.
const _: () = assert!(REGISTER_LEN == fields::SEGMENT_LEN * fields::SEGMENTS);

/// Number of micro-ticks in one macro-tick.
pub const MTICK_COUNT: u8 = 42;
/// The micro-tick, within a macro-tick, at which `IK1302` samples its queued
/// key-matrix coordinates.
///
/// The authentic value is manufactured into the ROM's micro-program layout;
/// without a ROM dump to read it from, this implementation fixes it at the
/// start of the macro-tick, which still satisfies "consumed exactly once per
/// macro-tick, never doubled" regardless of the exact window chosen.
pub const KEY_SAMPLE_MTICK: u8 = 0;

/// Which of the three manufactured roles an [`Ik13`] instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Drives the stack registers, the program counter and the key matrix.
    Ik1302,
    /// Drives memory registers `R0..R6`.
    Ik1303,
    /// Drives memory registers `R7..RE`.
    Ik1306,
}

/// A queued but not-yet-consumed key-matrix press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCoord {
    /// The latched `key_x` coordinate.
    pub x: u8,
    /// The latched `key_y` coordinate.
    pub y: u8,
    /// The latched decimal-point ("`,`") flag.
    pub comma: bool,
}

/// One IK13 chip: register bank, latches, micro-tick driver, I/O latches.
#[derive(Clone)]
pub struct Ik13 {
    rom: Rc<Rom>,
    role: Role,

    /// The main register file: conceptually a 14-digit BCD mantissa plus
    /// exponent plus sign plus flags, replicated across three stack-visible
    /// copies.
    pub(crate) r: [Nibble; REGISTER_LEN],
    /// The secondary operand register.
    pub(crate) m: [Nibble; REGISTER_LEN],
    /// The stack/result register.
    pub(crate) st: [Nibble; REGISTER_LEN],

    /// Arithmetic carry latch.
    pub(crate) s: Nibble,
    /// Sticky/compare latch.
    pub(crate) s1: Nibble,
    /// Flag latch, last ALU right-hand operand observed.
    pub(crate) l: Nibble,
    /// Flag latch, last ALU left-hand operand observed.
    pub(crate) t: Nibble,
    /// Flag latch, last ALU result observed; doubles as the run/idle flag
    /// this implementation exposes through [`crate::Engine::is_running`].
    /// The authentic wiring is manufactured into the ROM and unavailable
    /// without a dump; see `DESIGN.md` for this documented assumption.
    pub(crate) p: Nibble,

    mtick: u8,
    microinstruction: MicroInstruction,
    amk: u8,
    asp: u8,
    ak: u8,
    r#mod: u8,
    opcode: u8,
    program_addr: u16,

    input: Nibble,
    output: Nibble,

    pending_key: Option<KeyCoord>,
}

impl Ik13 {
    /// Create a chip in its all-zero power-on state, wired to the given
    /// (shared, immutable) ROM image.
    ///
    /// The ROM is held by [`Rc`] rather than owned or borrowed with an
    /// explicit lifetime: the chip is a non-owning reference holder, and
    /// `Rc` lets the engine hand out that reference without threading a
    /// lifetime parameter through every chip, the ring bus and the engine
    /// façade.
    #[must_use]
    pub fn new(rom: Rc<Rom>, role: Role) -> Self {
        Self {
            rom,
            role,
            r: [Nibble::new(0); REGISTER_LEN],
            m: [Nibble::new(0); REGISTER_LEN],
            st: [Nibble::new(0); REGISTER_LEN],
            s: Nibble::new(0),
            s1: Nibble::new(0),
            l: Nibble::new(0),
            t: Nibble::new(0),
            p: Nibble::new(0),
            mtick: 0,
            microinstruction: MicroInstruction::EMPTY,
            amk: 0,
            asp: 0,
            ak: 0,
            r#mod: 0,
            opcode: 0,
            program_addr: 0,
            input: Nibble::new(0),
            output: Nibble::new(0),
            pending_key: None,
        }
    }

    /// The role this chip plays (`IK1302`, `IK1303` or `IK1306`).
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// The nibble latched on this chip's input from the previous chip in
    /// the ring.
    #[must_use]
    pub const fn input(&self) -> Nibble {
        self.input
    }

    /// Set this chip's input latch. Called by the ring bus, never by the
    /// chip itself.
    pub fn set_input(&mut self, value: Nibble) {
        self.input = value;
    }

    /// The nibble this chip is currently presenting to the next chip in the
    /// ring.
    #[must_use]
    pub const fn output(&self) -> Nibble {
        self.output
    }

    /// The current micro-tick, `0..42`.
    #[must_use]
    pub const fn mtick(&self) -> u8 {
        self.mtick
    }

    /// Queue a key-matrix press for consumption by the next macro-tick that
    /// reaches the sampling window.
    ///
    /// Only meaningful on the `IK1302` role; calling it on the other two
    /// roles is harmless (the queue is simply never sampled) rather than an
    /// error, since front-panel wiring is the engine façade's concern, not
    /// this chip's.
    pub fn queue_key(&mut self, x: u8, y: u8, comma: bool) {
        self.pending_key = Some(KeyCoord { x, y, comma });
    }

    /// Set the opcode latch that the branch-resolution step keys into the
    /// instruction table.
    ///
    /// Without an authentic ROM dump there is no documented source for this
    /// latch inside the chip itself; [`crate::Engine::do_key_press`] wires it
    /// from the key just pressed ([`crate::panel::KeyPress::opcode`]), the
    /// closest observable per-key identity the façade has, so the
    /// branch-resolution step in [`Ik13::tick`] stays reachable from real
    /// engine activity instead of latching a permanent zero.
    pub fn set_opcode(&mut self, opcode: u8) {
        self.opcode = opcode;
    }

    /// Advance this chip by exactly one micro-tick.
    pub fn tick(&mut self) {
        // 1. Fetch the micro-instruction for this micro-tick.
        let addr = self.program_addr.wrapping_add(u16::from(self.mtick));
        let mp_index = self.rom.microprogram_step(addr);
        self.microinstruction = self.rom.microinstruction(mp_index);

        // 2. Decode control fields.
        self.amk = self.microinstruction.amk();
        self.asp = self.microinstruction.asp();
        self.ak = self.microinstruction.ak();
        self.r#mod = self.microinstruction.r#mod();

        // 3. Shift R, M, ST left by one nibble; the displaced R nibble
        //    becomes this chip's output, and the input latch feeds in at
        //    position 0 of all three register files.
        self.output = self.r[REGISTER_LEN - 1];
        for i in (1..REGISTER_LEN).rev() {
            self.r[i] = self.r[i - 1];
            self.m[i] = self.m[i - 1];
            self.st[i] = self.st[i - 1];
        }
        self.r[0] = self.input;
        self.m[0] = self.input;
        self.st[0] = self.input;

        // 4. Evaluate the ALU over the field selected by AMK.
        let field = Field::from_amk(self.amk);
        let op = AluOp::from_ak(self.ak);
        self.run_alu(field, op);

        // 5. Sample the key matrix at the designated window (IK1302 only).
        if self.role == Role::Ik1302 && self.mtick == KEY_SAMPLE_MTICK {
            if let Some(key) = self.pending_key.take() {
                self.st[1] = Nibble::new(key.x & 0xf);
                self.st[2] = Nibble::new(key.y & 0xf);
                self.st[3] = Nibble::new(u8::from(key.comma));
            }
        }

        // 6. Resolve a conditional branch through the instruction table.
        if self.r#mod & 0x1 != 0 {
            let instruction = self.rom.instruction(self.opcode);
            if instruction.conditional() != 0 {
                self.program_addr = instruction.micro_addr();
            }
        }

        // 7. Wrap the micro-tick counter.
        self.mtick = (self.mtick + 1) % MTICK_COUNT;
    }

    /// Run the ALU for the current micro-tick: `R[0]` and `M[0]` are its
    /// operands, `ST[0]` receives its result, and the field being addressed
    /// decides which status latch records the outcome.
    ///
    /// The field mask actually gates the op: a register position only ever
    /// passes through the shift register's position 0 once per segment per
    /// macro-tick, so the current micro-tick modulo [`fields::SEGMENT_LEN`]
    /// identifies which nibble of the current 14-wide segment is live this
    /// tick. Outside the AMK-selected field's range, the ALU doesn't address
    /// these nibbles at all: `ST[0]` passes `R[0]` through unmodified and the
    /// status latches keep whatever they last recorded while inside the
    /// field, exactly as the hardware's field-masked ALU would.
    fn run_alu(&mut self, field: Field, op: AluOp) {
        let p_in = self.r[0];
        let n_in = self.m[0];

        let segment_pos = usize::from(self.mtick) % fields::SEGMENT_LEN;
        if !field.contains(segment_pos) {
            self.st[0] = p_in;
            return;
        }

        let carry_in = self.s.value() != 0;
        let (result, flag) = match op {
            AluOp::Pass => (p_in, false),
            AluOp::Add => bcd_add(p_in, n_in, carry_in),
            AluOp::Sub => bcd_sub(p_in, n_in, carry_in),
            AluOp::Compare => (p_in, p_in != n_in),
        };

        self.t = p_in;
        self.l = n_in;
        self.p = result;

        match field {
            Field::Sign => self.s1 = Nibble::new(u8::from(flag)),
            Field::Mantissa | Field::Exponent | Field::Composite => {
                self.s = Nibble::new(u8::from(flag));
            }
        }

        self.st[0] = result;
    }

    /// Number of bytes [`Ik13::write_state`] writes / [`Ik13::read_state`]
    /// expects.
    #[must_use]
    pub const fn state_size() -> usize {
        REGISTER_LEN * 3 // r, m, st
            + 5 // s, s1, l, t, p
            + 1 // mtick
            + 4 // amk, asp, ak, mod
            + 4 // microinstruction (u32 LE)
            + 1 // opcode
            + 2 // program_addr (u16 LE)
            + 1 // input
            + 1 // output
            + 4 // pending key: present flag, x, y, comma
    }

    /// Serialise this chip's full state, in the field order documented on
    /// [`Ik13::state_size`].
    ///
    /// # Errors
    ///
    /// Propagates any error the sink returns.
    pub fn write_state<W: std::io::Write>(&self, w: &mut W) -> std::io::Result<()> {
        for nibble in self.r.iter().chain(self.m.iter()).chain(self.st.iter()) {
            w.write_all(&[nibble.value()])?;
        }
        for latch in [self.s, self.s1, self.l, self.t, self.p] {
            w.write_all(&[latch.value()])?;
        }
        w.write_all(&[self.mtick])?;
        w.write_all(&[self.amk, self.asp, self.ak, self.r#mod])?;
        w.write_all(&self.microinstruction.raw().to_le_bytes())?;
        w.write_all(&[self.opcode])?;
        w.write_all(&self.program_addr.to_le_bytes())?;
        w.write_all(&[self.input.value(), self.output.value()])?;
        match self.pending_key {
            Some(key) => w.write_all(&[1, key.x, key.y, u8::from(key.comma)])?,
            None => w.write_all(&[0, 0, 0, 0])?,
        }
        Ok(())
    }

    /// Restore this chip's state from a stream written by
    /// [`Ik13::write_state`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error on a short read; see [`crate::EngineError`] for
    /// how the engine façade maps that to a public error.
    pub fn read_state<R: std::io::Read>(&mut self, r: &mut R) -> std::io::Result<()> {
        let mut byte = [0u8; 1];
        for nibble in self
            .r
            .iter_mut()
            .chain(self.m.iter_mut())
            .chain(self.st.iter_mut())
        {
            r.read_exact(&mut byte)?;
            *nibble = Nibble::new(byte[0] & 0xf);
        }
        for latch in [&mut self.s, &mut self.s1, &mut self.l, &mut self.t, &mut self.p] {
            r.read_exact(&mut byte)?;
            *latch = Nibble::new(byte[0] & 0xf);
        }
        r.read_exact(&mut byte)?;
        self.mtick = byte[0] % MTICK_COUNT;

        let mut ctrl = [0u8; 4];
        r.read_exact(&mut ctrl)?;
        [self.amk, self.asp, self.ak, self.r#mod] = ctrl;

        let mut word = [0u8; 4];
        r.read_exact(&mut word)?;
        self.microinstruction = MicroInstruction::from_raw(u32::from_le_bytes(word));

        r.read_exact(&mut byte)?;
        self.opcode = byte[0];

        let mut addr = [0u8; 2];
        r.read_exact(&mut addr)?;
        self.program_addr = u16::from_le_bytes(addr);

        let mut io = [0u8; 2];
        r.read_exact(&mut io)?;
        self.input = Nibble::new(io[0] & 0xf);
        self.output = Nibble::new(io[1] & 0xf);

        let mut key = [0u8; 4];
        r.read_exact(&mut key)?;
        self.pending_key = if key[0] != 0 {
            Some(KeyCoord {
                x: key[1],
                y: key[2],
                comma: key[3] != 0,
            })
        } else {
            None
        };

        Ok(())
    }
}

impl std::fmt::Debug for Ik13 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ik13")
            .field("role", &self.role)
            .field("mtick", &self.mtick)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{fields, Ik13, Role, MTICK_COUNT};
    use crate::nibble::Nibble;
    use crate::rom::{Instruction, MicroInstruction, Rom};
    use std::rc::Rc;

    #[test]
    fn mtick_wraps_after_one_macro_tick() {
        let mut chip = Ik13::new(Rc::new(Rom::new()), Role::Ik1302);
        for _ in 0..MTICK_COUNT {
            chip.tick();
        }
        assert_eq!(chip.mtick(), 0);
    }

    #[test]
    fn input_flows_through_to_output_after_a_full_register_rotation() {
        let mut chip = Ik13::new(Rc::new(Rom::new()), Role::Ik1303);
        chip.set_input(Nibble::new(7));
        for _ in 0..super::REGISTER_LEN {
            chip.tick();
            chip.set_input(Nibble::new(0));
        }
        assert_eq!(chip.output().value(), 7);
    }

    #[test]
    fn key_press_is_consumed_exactly_once() {
        let mut chip = Ik13::new(Rc::new(Rom::new()), Role::Ik1302);
        chip.queue_key(3, 1, false);
        chip.tick();
        assert_eq!(chip.st[1].value(), 3);
        assert_eq!(chip.st[2].value(), 1);

        chip.st[1] = Nibble::new(0);
        chip.st[2] = Nibble::new(0);
        for _ in 0..MTICK_COUNT {
            chip.tick();
        }
        assert_eq!(chip.st[1].value(), 0);
        assert_eq!(chip.st[2].value(), 0);
    }

    #[test]
    fn state_round_trips_exactly() {
        let mut chip = Ik13::new(Rc::new(Rom::new()), Role::Ik1306);
        chip.set_input(Nibble::new(5));
        for _ in 0..5 {
            chip.tick();
        }

        let mut buf = Vec::new();
        chip.write_state(&mut buf).unwrap();
        assert_eq!(buf.len(), Ik13::state_size());

        let mut restored = Ik13::new(Rc::new(Rom::new()), Role::Ik1306);
        restored.read_state(&mut &buf[..]).unwrap();

        assert_eq!(restored.r, chip.r);
        assert_eq!(restored.m, chip.m);
        assert_eq!(restored.st, chip.st);
        assert_eq!(restored.mtick(), chip.mtick());
        assert_eq!(restored.input(), chip.input());
        assert_eq!(restored.output(), chip.output());
    }

    #[test]
    fn the_alu_only_runs_while_the_segment_position_is_inside_the_amk_field() {
        let mut micro = MicroInstruction::EMPTY;
        micro.set_amk(1); // Field::Exponent, positions 12..=13 of a segment.
        micro.set_ak(1); // AluOp::Add.

        let mut microinstructions = [MicroInstruction::EMPTY; Rom::MICROINSTRUCTION_COUNT];
        microinstructions[0] = micro;
        let instructions = [Instruction::EMPTY; Rom::INSTRUCTION_COUNT];
        let microprograms = [0u8; Rom::MICROPROGRAM_BYTES];
        let rom = Rc::new(Rom::from_tables(&microinstructions, &instructions, &microprograms));

        let mut chip = Ik13::new(rom, Role::Ik1303);
        chip.set_input(Nibble::new(3));

        for segment_pos in 0..fields::SEGMENT_LEN {
            chip.tick();
            if segment_pos < 12 {
                // Outside the exponent field: pass R through, no addition.
                assert_eq!(chip.st[0].value(), 3, "segment_pos {segment_pos}");
            } else {
                // Inside the exponent field: BCD add of the (equal) R/M operands.
                assert_eq!(chip.st[0].value(), 6, "segment_pos {segment_pos}");
            }
        }
    }
}
