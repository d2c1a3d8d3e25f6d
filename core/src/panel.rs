//! The front panel: key matrix decode, angle-unit latch, power state.
//!
//! None of this lives on a chip. A real MK-61's front panel is a grid of
//! contacts wired into IK1302's key-scan pins; decoding a `(key1, key2)`
//! pair into the coordinates the chip actually latches, and the angle-unit
//! and power-state selectors, are all engine-façade concerns rather than
//! chip state.

use crate::error::EngineError;

/// A validated key-matrix coordinate pair, ready to queue onto `IK1302`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    key_x: u8,
    key_y: u8,
    comma: bool,
}

impl KeyPress {
    /// Decode and validate a raw `(key1, key2)` pair from the front panel.
    ///
    /// `key2` selects the row group and must be one of `{1, 8, 9}`; `key1`
    /// selects the column and must fit in `0..=15`. Anything else is a
    /// front-panel wiring fault, not a recoverable calculator state, and is
    /// rejected rather than silently clamped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidKey`] when either coordinate is outside
    /// its defined range.
    pub fn decode(key1: i32, key2: i32) -> Result<Self, EngineError> {
        if !(0..=15).contains(&key1) || !matches!(key2, 1 | 8 | 9) {
            return Err(EngineError::InvalidKey { key1, key2 });
        }

        Ok(Self {
            key_x: key1 as u8,
            key_y: key2 as u8,
            comma: false,
        })
    }

    /// The latched column coordinate.
    #[must_use]
    pub const fn key_x(&self) -> u8 {
        self.key_x
    }

    /// The latched row-group coordinate.
    #[must_use]
    pub const fn key_y(&self) -> u8 {
        self.key_y
    }

    /// The decimal-point flag latched alongside the key coordinates.
    #[must_use]
    pub const fn comma(&self) -> bool {
        self.comma
    }

    /// A compact opcode byte derived from this key's matrix coordinates,
    /// one distinct value per key.
    ///
    /// This is the closest observable "which instruction is being
    /// dispatched" proxy the front panel can supply without an authentic
    /// ROM dump's instruction-fetch path (see `DESIGN.md`): the row group
    /// occupies the high nibble, the column the low nibble, so every key on
    /// the matrix maps to its own opcode.
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        let row = match self.key_y {
            1 => 0,
            8 => 1,
            9 => 2,
            _ => 3,
        };
        (row << 4) | (self.key_x & 0xf)
    }
}

/// The trigonometric angle unit `IK1302` micro-code reads off a latch.
///
/// The numeric values are load-bearing: micro-code observes these as raw
/// integers, so they are fixed by `repr` rather than left to derive order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum AngleUnit {
    /// Radians.
    Radian = 10,
    /// Degrees.
    Degree = 11,
    /// Grades (gons).
    Grade = 12,
}

impl Default for AngleUnit {
    fn default() -> Self {
        Self::Radian
    }
}

/// Which chip-family mode the engine is manufactured for.
///
/// The original hardware lineage has a sibling MK-54/Rapira variant,
/// selected by the same mode latch; that variant is an acknowledged but
/// explicitly non-mandatory mode (see the crate's top-level docs), so this
/// enum carries only the one variant this crate actually implements, plus
/// the extension point a future `Mk54` variant would occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// The MK-61 chipset this crate emulates.
    #[default]
    Mk61,
}

/// The calculator's power switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Powered off: `do_step` is a no-op and no accessor's output changes.
    Off,
    /// Powered on: `do_step` runs the ring.
    On,
}

impl PowerState {
    /// True when the engine is powered on and macro-ticks take effect.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl Default for PowerState {
    fn default() -> Self {
        Self::Off
    }
}
