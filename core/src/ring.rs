//! The serial ring wiring the five chips into one macro-tick clock domain.
//!
//! A real MK-61 board never lets a chip call another chip directly: every
//! chip only ever drives its own output pin and samples its own input pin.
//! The wiring between pins is fixed at manufacture. This module is that
//! fixed wiring, expressed as a scheduler that owns none of the chips and
//! simply walks them in ring order once per micro-tick.

use crate::ik13::Ik13;
use crate::ir2::Ir2;

/// The five chips that make up one ring, borrowed for exactly one
/// micro-tick.
///
/// The ring order is fixed by the hardware: `IK1302 -> IR2(a) -> IK1303 ->
/// IR2(b) -> IK1306 -> back to IK1302`.
pub struct Ring<'a> {
    /// The IK1302 chip (front panel / key scanning role).
    pub ik1302: &'a mut Ik13,
    /// The first IR2 memory chip, between IK1302 and IK1303.
    pub ir2_a: &'a mut Ir2,
    /// The IK1303 chip.
    pub ik1303: &'a mut Ik13,
    /// The second IR2 memory chip, between IK1303 and IK1306.
    pub ir2_b: &'a mut Ir2,
    /// The IK1306 chip (display / indicator role).
    pub ik1306: &'a mut Ik13,
}

impl Ring<'_> {
    /// Advance every chip in the ring by exactly one micro-tick.
    ///
    /// Two phases, in order: first each chip's output from the previous
    /// micro-tick is latched into the next chip's input (a pure pin-to-pin
    /// copy, no chip's internal state changes), then every chip ticks in the
    /// same fixed order. Splitting into these two phases is what makes the
    /// ring's micro-tick well-defined regardless of which chip a caller
    /// lists first: no chip ever observes another chip's post-tick output
    /// within the same micro-tick.
    pub fn micro_tick(&mut self) {
        self.ir2_a.set_input(self.ik1302.output());
        self.ik1303.set_input(self.ir2_a.output());
        self.ir2_b.set_input(self.ik1303.output());
        self.ik1306.set_input(self.ir2_b.output());
        self.ik1302.set_input(self.ik1306.output());

        self.ik1302.tick();
        self.ir2_a.tick();
        self.ik1303.tick();
        self.ir2_b.tick();
        self.ik1306.tick();
    }

    /// Advance every chip in the ring by one full macro-tick: 42 consecutive
    /// micro-ticks, matching the IK13's own 42-position shift register.
    pub fn macro_tick(&mut self) {
        for _ in 0..crate::ik13::MTICK_COUNT {
            self.micro_tick();
        }
    }
}
