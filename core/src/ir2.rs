//! A cycle-accurate model of the IR2 serial shift-register memory chip.
//!
//! Two instances sit in the ring between the IK13 chips. The entire chip
//! semantics is one line: rotate a 252-nibble ring through its input and
//! output latches. All the complexity in what ends up stored here comes from
//! whatever the neighbouring IK13 chooses to inject.

use crate::nibble::Nibble;

/// Number of nibble positions in an IR2's memory ring.
pub const MTICK_COUNT: usize = 252;

/// One IR2 chip.
#[derive(Debug, Clone)]
pub struct Ir2 {
    m: [Nibble; MTICK_COUNT],
    mtick: u8,
    input: Nibble,
    output: Nibble,
}

impl Ir2 {
    /// Create a chip in its all-zero power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            m: [Nibble::new(0); MTICK_COUNT],
            mtick: 0,
            input: Nibble::new(0),
            output: Nibble::new(0),
        }
    }

    /// The nibble latched on this chip's input from the previous chip in
    /// the ring.
    #[must_use]
    pub const fn input(&self) -> Nibble {
        self.input
    }

    /// Set this chip's input latch. Called by the ring bus.
    pub fn set_input(&mut self, value: Nibble) {
        self.input = value;
    }

    /// The nibble this chip is currently presenting to the next chip in the
    /// ring.
    #[must_use]
    pub const fn output(&self) -> Nibble {
        self.output
    }

    /// The current micro-tick position in the 252-nibble ring.
    #[must_use]
    pub const fn mtick(&self) -> u8 {
        self.mtick
    }

    /// Advance this chip by exactly one micro-tick: `output = M[mtick];
    /// M[mtick] = input; mtick = (mtick + 1) mod 252`.
    pub fn tick(&mut self) {
        let pos = self.mtick as usize;
        self.output = self.m[pos];
        self.m[pos] = self.input;
        self.mtick = ((pos + 1) % MTICK_COUNT) as u8;
    }

    /// Number of bytes [`Ir2::write_state`] writes / [`Ir2::read_state`]
    /// expects.
    #[must_use]
    pub const fn state_size() -> usize {
        MTICK_COUNT + 1 + 2
    }

    /// Serialise this chip's full state.
    ///
    /// # Errors
    ///
    /// Propagates any error the sink returns.
    pub fn write_state<W: std::io::Write>(&self, w: &mut W) -> std::io::Result<()> {
        for nibble in &self.m {
            w.write_all(&[nibble.value()])?;
        }
        w.write_all(&[self.mtick])?;
        w.write_all(&[self.input.value(), self.output.value()])?;
        Ok(())
    }

    /// Restore this chip's state from a stream written by
    /// [`Ir2::write_state`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error on a short read.
    pub fn read_state<R: std::io::Read>(&mut self, r: &mut R) -> std::io::Result<()> {
        let mut byte = [0u8; 1];
        for nibble in &mut self.m {
            r.read_exact(&mut byte)?;
            *nibble = Nibble::new(byte[0] & 0xf);
        }
        r.read_exact(&mut byte)?;
        const MTICK_COUNT_U8: u8 = MTICK_COUNT as u8;
        self.mtick = byte[0] % MTICK_COUNT_U8;

        let mut io = [0u8; 2];
        r.read_exact(&mut io)?;
        self.input = Nibble::new(io[0] & 0xf);
        self.output = Nibble::new(io[1] & 0xf);
        Ok(())
    }
}

impl Default for Ir2 {
    fn default() -> Self {
        Self::new()
    }
}
