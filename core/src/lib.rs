#![forbid(missing_docs)]
#![doc = include_str!("../../README.md")]

pub mod engine;
pub mod error;
pub mod ik13;
pub mod ir2;
pub mod nibble;
pub mod panel;
pub mod reader;
pub mod ring;
pub mod rom;

pub use engine::Engine;
pub use error::EngineError;
pub use panel::{AngleUnit, Mode, PowerState};
pub use reader::{RegMem, RegStack};
pub use rom::{Rom, RomSet};
