//! Turns instruction, flag and per-step control line definitions into
//! address/data templates.

use std::fmt;

use common::{ControlLine, Flags, MicrocodeLayout};

use crate::{
    bitdef::{Bit, BitPattern, Bitdef},
    error::UcodeError,
    width::byte_width,
};

/// "Every concrete address matching `address` holds `data`."
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataTemplate {
    pub address: BitPattern,
    pub data: BitPattern,
    pub source: String,
}

impl DataTemplate {
    pub fn new<S: Into<String>>(address: BitPattern, data: BitPattern, source: S) -> DataTemplate {
        DataTemplate {
            address,
            data,
            source: source.into(),
        }
    }
}

/// Flags that must be set, and flags that must be clear, for a behaviour
/// to apply. Flags in neither set are don't-care.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagCondition {
    pub set: Flags,
    pub clear: Flags,
}

impl FlagCondition {
    pub fn any() -> FlagCondition {
        FlagCondition {
            set: Flags::empty(),
            clear: Flags::empty(),
        }
    }

    pub fn when(flags: Flags) -> FlagCondition {
        FlagCondition {
            set: flags,
            clear: Flags::empty(),
        }
    }

    pub fn unless(flags: Flags) -> FlagCondition {
        FlagCondition {
            set: Flags::empty(),
            clear: flags,
        }
    }
}

impl fmt::Display for FlagCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.set.is_empty() && self.clear.is_empty() {
            return write!(f, "any");
        }
        let mut names = Vec::new();
        for (name, _) in self.set.iter_names() {
            names.push(name.to_string());
        }
        for (name, _) in self.clear.iter_names() {
            names.push(format!("!{}", name));
        }
        write!(f, "{}", names.join(" "))
    }
}

pub fn flag_bitdef(layout: &MicrocodeLayout, flag: Flags, set: bool) -> Result<BitPattern, UcodeError> {
    BitPattern::single(flag.bits().trailing_zeros() as usize, set, layout.flags_bits)
}

/// The flags field matching every flag combination that satisfies
/// `condition`.
pub fn flags_pattern(layout: &MicrocodeLayout, condition: &FlagCondition) -> Result<BitPattern, UcodeError> {
    let mut patterns = vec![BitPattern::wildcard(layout.flags_bits)?];
    for flag in condition.set.iter() {
        patterns.push(flag_bitdef(layout, flag, true)?);
    }
    for flag in condition.clear.iter() {
        patterns.push(flag_bitdef(layout, flag, false)?);
    }
    BitPattern::merge("flags", &patterns)
}

pub fn control_line_bitdef(layout: &MicrocodeLayout, line: ControlLine) -> Result<BitPattern, UcodeError> {
    BitPattern::single(line.bit(), true, layout.control_word_bits)
}

/// Asserts `lines`; every other line is de-asserted.
pub fn control_word(layout: &MicrocodeLayout, lines: &[ControlLine]) -> Result<BitPattern, UcodeError> {
    let mut patterns = vec![BitPattern::wildcard(layout.control_word_bits)?];
    for line in lines {
        patterns.push(control_line_bitdef(layout, *line)?);
    }
    Ok(BitPattern::merge("control word", &patterns)?.fill(Bit::Zero))
}

/// instruction ++ flags ++ step
pub fn step_address(
    layout: &MicrocodeLayout,
    instruction: &BitPattern,
    flags: &BitPattern,
    step: &BitPattern,
) -> Result<BitPattern, UcodeError> {
    Bitdef::compose(
        "address",
        layout.step_address_bits(),
        &[
            Bitdef::new("instruction", layout.instruction_offset(), *instruction),
            Bitdef::new("flags", layout.flags_offset(), *flags),
            Bitdef::new("step", layout.step_offset(), *step),
        ],
    )
}

/// One template per step. Step `i` of `steps` is placed at step index
/// `first_step + i`.
pub fn assemble_instruction(
    layout: &MicrocodeLayout,
    instruction: &BitPattern,
    flags: &BitPattern,
    steps: &[Vec<ControlLine>],
    first_step: usize,
    source: &str,
) -> Result<Vec<DataTemplate>, UcodeError> {
    if first_step + steps.len() > layout.step_count() {
        return Err(UcodeError::TooManySteps {
            source_name: source.to_string(),
            steps: first_step + steps.len(),
            max: layout.step_count(),
        });
    }

    steps
        .iter()
        .enumerate()
        .map(|(i, lines)| {
            let step = BitPattern::concrete((first_step + i) as u64, layout.step_bits)?;
            Ok(DataTemplate::new(
                step_address(layout, instruction, flags, &step)?,
                control_word(layout, lines)?,
                source,
            ))
        })
        .collect()
}

pub fn rom_count(layout: &MicrocodeLayout) -> Result<usize, UcodeError> {
    byte_width(layout.control_word_bits)
}

pub fn rom_index_bits(layout: &MicrocodeLayout) -> Result<usize, UcodeError> {
    Ok(rom_count(layout)?.next_power_of_two().trailing_zeros() as usize)
}

pub fn rom_address_bits(layout: &MicrocodeLayout) -> Result<usize, UcodeError> {
    Ok(rom_index_bits(layout)? + layout.step_address_bits())
}

/// Spreads each control word over the 8-bit ROM chips. Chip `i` holds
/// bits `8i..8i+8` of the word and its index is prepended to the address.
pub fn split_into_rom_bytes(layout: &MicrocodeLayout, templates: &[DataTemplate]) -> Result<Vec<DataTemplate>, UcodeError> {
    let count = rom_count(layout)?;
    let index_bits = rom_index_bits(layout)?;

    let mut out = Vec::with_capacity(templates.len() * count);
    for template in templates {
        if template.data.width() != layout.control_word_bits {
            return Err(UcodeError::WidthMismatch {
                source_name: template.source.clone(),
                field: "data",
                expected: layout.control_word_bits,
                actual: template.data.width(),
            });
        }

        for rom in 0..count {
            let index = BitPattern::concrete(rom as u64, index_bits)?;
            out.push(DataTemplate::new(
                BitPattern::concat(&[index, template.address])?,
                template.data.slice(rom * 8, 8)?,
                format!("{} [rom {}]", template.source, rom),
            ));
        }
    }
    Ok(out)
}
