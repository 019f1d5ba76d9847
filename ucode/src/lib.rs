use std::{collections::hash_map::DefaultHasher, hash::Hasher};

use common::LAYOUT;
use lazy_static::lazy_static;

pub mod bitdef;
pub mod error;
pub mod isa;
pub mod microcode;
pub mod rom;
pub mod template;
pub mod width;

pub use bitdef::{Bit, BitPattern, Bitdef, Word};
pub use error::UcodeError;
pub use isa::{Behaviour, Operand, Variant};
pub use rom::{Rom, RomData};
pub use template::{DataTemplate, FlagCondition};

lazy_static! {
    static ref INSTRUCTION_SET: Result<Vec<Variant>, UcodeError> = isa::instruction_set();
}

pub const MAJOR_VERSION: u8 = 1;
pub const MINOR_VERSION: u8 = 0;
pub const PATCH_VERSION: u8 = 0;

/// The built-in instruction set.
pub fn instruction_set() -> Result<&'static [Variant], UcodeError> {
    INSTRUCTION_SET.as_deref().map_err(Clone::clone)
}

/// Compiles the built-in instruction set with the default layout.
pub fn ucode() -> Result<Rom, UcodeError> {
    microcode::compile(&LAYOUT, instruction_set()?)
}

/// Fingerprint of a ROM image, written into the hex files so a stale
/// image is easy to spot.
pub fn rom_hash(rom: &Rom) -> Result<u32, UcodeError> {
    let mut hasher = DefaultHasher::new();
    hasher.write(&rom.bytes()?);
    Ok((hasher.finish() % 0x1_0000_0000) as u32)
}
