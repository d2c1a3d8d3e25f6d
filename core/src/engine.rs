//! The public façade: the one type an embedder actually talks to.
//!
//! Owns the five chips and the ring wiring between them, plus the
//! front-panel latches (angle unit, power state) that live outside any chip.
//! Nothing below this module is public API; everything here is.

use std::io::{Read, Write};
use std::rc::Rc;

use crate::error::EngineError;
use crate::ik13::{Ik13, Role};
use crate::ir2::Ir2;
use crate::nibble::digit_char;
use crate::panel::{AngleUnit, KeyPress, Mode, PowerState};
use crate::reader::{self, RegMem, RegStack};
use crate::ring::Ring;
use crate::rom::RomSet;

const STATE_MAGIC: &[u8; 4] = b"MK61";

/// A complete MK-61 chipset: three `IK13`s, two `IR2`s, and the front-panel
/// latches that are not chip state at all.
pub struct Engine {
    ik1302: Ik13,
    ik1303: Ik13,
    ik1306: Ik13,
    ir2_a: Ir2,
    ir2_b: Ir2,

    // Not part of §6.2's persisted byte layout: a single manufactured
    // constant today, not per-instance state, so there is nothing to save.
    mode: Mode,
    angle_unit: AngleUnit,
    power_state: PowerState,
    output_required: bool,
    last_indicator: String,
}

impl Engine {
    /// Build a fresh engine wired to the given ROM images, in its power-off,
    /// all-zero-register state.
    #[must_use]
    pub fn new(roms: RomSet) -> Self {
        let ik1302_rom = Rc::new(roms.ik1302);
        let ik1303_rom = Rc::new(roms.ik1303);
        let ik1306_rom = Rc::new(roms.ik1306);

        let ik1302 = Ik13::new(ik1302_rom, Role::Ik1302);
        let ik1303 = Ik13::new(ik1303_rom, Role::Ik1303);
        let ik1306 = Ik13::new(ik1306_rom, Role::Ik1306);

        let last_indicator =
            reader::render_indicator(&reader::read_reg_stack(&ik1302, RegStack::X));

        Self {
            ik1302,
            ik1303,
            ik1306,
            ir2_a: Ir2::new(),
            ir2_b: Ir2::new(),
            mode: Mode::default(),
            angle_unit: AngleUnit::default(),
            power_state: PowerState::default(),
            output_required: false,
            last_indicator,
        }
    }

    /// Advance the chipset by one macro-tick (42 micro-ticks through the
    /// ring), if power is on. A no-op while powered off.
    pub fn do_step(&mut self) {
        if !self.power_state.is_on() {
            return;
        }

        let mut ring = Ring {
            ik1302: &mut self.ik1302,
            ir2_a: &mut self.ir2_a,
            ik1303: &mut self.ik1303,
            ir2_b: &mut self.ir2_b,
            ik1306: &mut self.ik1306,
        };
        ring.macro_tick();

        let indicator = reader::render_indicator(&reader::read_reg_stack(&self.ik1302, RegStack::X));
        if indicator != self.last_indicator {
            self.output_required = true;
            self.last_indicator = indicator;
        }
    }

    /// Queue a key press for the next macro-tick's sampling window.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKey`] if `(key1, key2)` is outside the
    /// defined key matrix.
    pub fn do_key_press(&mut self, key1: i32, key2: i32) -> Result<(), EngineError> {
        let key = KeyPress::decode(key1, key2)?;
        self.ik1302.set_opcode(key.opcode());
        self.ik1302
            .queue_key(key.key_x(), key.key_y(), key.comma());
        Ok(())
    }

    /// Which chip-family mode this engine was manufactured for.
    ///
    /// Always [`Mode::Mk61`] today; the MK-54/Rapira sibling variant is an
    /// acknowledged but non-mandatory extension point (see crate docs), not
    /// something this engine can switch into at run time.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// The currently selected trigonometric angle unit.
    #[must_use]
    pub const fn get_angle_unit(&self) -> AngleUnit {
        self.angle_unit
    }

    /// Select the trigonometric angle unit. Takes effect on the next
    /// micro-code read of the latch; persists until the next call.
    pub fn set_angle_unit(&mut self, unit: AngleUnit) {
        self.angle_unit = unit;
    }

    /// The power switch's current position.
    #[must_use]
    pub const fn get_power_state(&self) -> PowerState {
        self.power_state
    }

    /// Flip the power switch. Idempotent; never resets register contents.
    pub fn set_power_state(&mut self, state: PowerState) {
        self.power_state = state;
    }

    /// True when the calculator's program-counter state suggests a running
    /// program rather than idle `AUT` mode.
    ///
    /// Run/idle is emergent from micro-code (no dedicated latch is
    /// specified); this implementation treats `IK1302`'s last-ALU-result
    /// latch as the run/idle flag, a documented assumption recorded
    /// alongside the other un-reconstructable hardware details this
    /// implementation had to choose without an authentic ROM dump.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ik1302.p.value() != 0
    }

    /// True if a macro-tick has changed the indicator since the last
    /// [`Engine::end_output`].
    #[must_use]
    pub const fn is_output_required(&self) -> bool {
        self.output_required
    }

    /// Acknowledge the pending output; the only way `output_required`
    /// clears.
    pub fn end_output(&mut self) {
        self.output_required = false;
    }

    /// Render one of the five stack registers as a 14-character decimal
    /// string.
    #[must_use]
    pub fn get_reg_stack_str(&self, reg: RegStack) -> String {
        reader::read_reg_stack(&self.ik1302, reg).to_digit_string()
    }

    /// Render one of the fifteen memory registers as a 14-character decimal
    /// string.
    #[must_use]
    pub fn get_reg_mem_str(&self, reg: RegMem) -> String {
        reader::read_reg_mem(&self.ik1303, &self.ik1306, reg).to_digit_string()
    }

    /// Render the LCD indicator (sign, mantissa, decimal point, exponent) for
    /// the top of the RPN stack.
    #[must_use]
    pub fn get_indicator_str(&self) -> String {
        reader::render_indicator(&reader::read_reg_stack(&self.ik1302, RegStack::X))
    }

    /// Render the two-digit program counter.
    #[must_use]
    pub fn get_prog_counter_str(&self) -> String {
        let mut s = String::with_capacity(2);
        s.push(digit_char(self.ik1302.t));
        s.push(digit_char(self.ik1302.l));
        s
    }

    /// Serialise the full engine state: both `IK13`s in fixed role order,
    /// both `IR2`s, the angle-unit byte, the power-state byte, and the
    /// pending-output flag byte.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SerialisationWriteError`] if the sink rejects a
    /// write.
    pub fn write_state<W: Write>(&self, w: &mut W) -> Result<usize, EngineError> {
        let mut written = 0usize;
        let mut count = |n: usize| written += n;

        w.write_all(STATE_MAGIC)
            .map_err(EngineError::SerialisationWriteError)?;
        count(STATE_MAGIC.len());

        for chip in [&self.ik1302, &self.ik1303, &self.ik1306] {
            chip.write_state(w)
                .map_err(EngineError::SerialisationWriteError)?;
            count(Ik13::state_size());
        }
        for ir2 in [&self.ir2_a, &self.ir2_b] {
            ir2.write_state(w)
                .map_err(EngineError::SerialisationWriteError)?;
            count(Ir2::state_size());
        }

        w.write_all(&[
            self.angle_unit as u8,
            power_state_byte(self.power_state),
            u8::from(self.output_required),
        ])
        .map_err(EngineError::SerialisationWriteError)?;
        count(3);

        Ok(written)
    }

    /// Restore engine state written by [`Engine::write_state`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SerialisationShortRead`] on a truncated
    /// stream, or [`EngineError::UnrecognisedState`] if the stream does not
    /// start with the expected marker or carries an unrecognised
    /// angle-unit/power-state byte.
    pub fn read_state<R: Read>(&mut self, r: &mut R) -> Result<(), EngineError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)
            .map_err(EngineError::SerialisationShortRead)?;
        if &magic != STATE_MAGIC {
            return Err(EngineError::UnrecognisedState);
        }

        for chip in [&mut self.ik1302, &mut self.ik1303, &mut self.ik1306] {
            chip.read_state(r)
                .map_err(EngineError::SerialisationShortRead)?;
        }
        for ir2 in [&mut self.ir2_a, &mut self.ir2_b] {
            ir2.read_state(r)
                .map_err(EngineError::SerialisationShortRead)?;
        }

        let mut tail = [0u8; 3];
        r.read_exact(&mut tail)
            .map_err(EngineError::SerialisationShortRead)?;
        self.angle_unit = angle_unit_from_byte(tail[0]).ok_or(EngineError::UnrecognisedState)?;
        self.power_state = power_state_from_byte(tail[1]).ok_or(EngineError::UnrecognisedState)?;
        self.output_required = tail[2] != 0;

        self.last_indicator = self.get_indicator_str();
        Ok(())
    }
}

const fn power_state_byte(state: PowerState) -> u8 {
    match state {
        PowerState::Off => 0,
        PowerState::On => 1,
    }
}

fn power_state_from_byte(byte: u8) -> Option<PowerState> {
    match byte {
        0 => Some(PowerState::Off),
        1 => Some(PowerState::On),
        _ => None,
    }
}

fn angle_unit_from_byte(byte: u8) -> Option<AngleUnit> {
    match byte {
        10 => Some(AngleUnit::Radian),
        11 => Some(AngleUnit::Degree),
        12 => Some(AngleUnit::Grade),
        _ => None,
    }
}
