//! Builds the whole microcode ROM from the instruction set.

use std::collections::BTreeSet;

use common::{ControlLine, MicrocodeLayout};
use tracing::{debug, info};

use crate::{
    bitdef::BitPattern,
    error::UcodeError,
    isa::{Behaviour, Variant},
    rom::{build_rom, Rom},
    template::{
        assemble_instruction, control_word, flags_pattern, rom_address_bits, split_into_rom_bytes, step_address,
        DataTemplate, FlagCondition,
    },
    width::num_bytes,
};

pub const FETCH_STEPS: usize = 2;

pub fn fetch() -> Vec<Vec<ControlLine>> {
    vec![
        vec![ControlLine::PcOut, ControlLine::MarIn],
        vec![ControlLine::RamOut, ControlLine::IrIn, ControlLine::PcCount],
    ]
}

/// Templates for every step from `first_step` to the end of the step
/// counter, all holding `lines`.
fn fill_steps(
    layout: &MicrocodeLayout,
    instruction: &BitPattern,
    flags: &BitPattern,
    first_step: usize,
    lines: &[ControlLine],
    source: &str,
) -> Result<Vec<DataTemplate>, UcodeError> {
    let data = control_word(layout, lines)?;
    BitPattern::covering(first_step as u64, layout.step_count() as u64, layout.step_bits)?
        .iter()
        .map(|step| {
            Ok(DataTemplate::new(
                step_address(layout, instruction, flags, step)?,
                data,
                source,
            ))
        })
        .collect()
}

fn behaviour_templates(
    layout: &MicrocodeLayout,
    instruction: &BitPattern,
    behaviour: &Behaviour,
    source: &str,
) -> Result<Vec<DataTemplate>, UcodeError> {
    let flags = flags_pattern(layout, &behaviour.flags)?;

    let mut steps = behaviour.steps.clone();
    if let Some(last) = steps.last_mut() {
        last.push(ControlLine::StepReset);
    }

    let mut templates = assemble_instruction(layout, instruction, &flags, &steps, FETCH_STEPS, source)?;
    templates.extend(fill_steps(
        layout,
        instruction,
        &flags,
        FETCH_STEPS + steps.len(),
        &[ControlLine::StepReset],
        &format!("{} (unused steps)", source),
    )?);
    Ok(templates)
}

/// Every template of the microcode: the shared fetch, each variant's
/// behaviours, and HALT for instruction bytes no variant claims.
pub fn microcode_templates(layout: &MicrocodeLayout, variants: &[Variant]) -> Result<Vec<DataTemplate>, UcodeError> {
    let any_instruction = BitPattern::wildcard(layout.instruction_bits)?;
    let any_flags = flags_pattern(layout, &FlagCondition::any())?;

    let mut templates = assemble_instruction(layout, &any_instruction, &any_flags, &fetch(), 0, "FETCH")?;

    let mut claimed = BTreeSet::new();
    for variant in variants {
        let instruction = variant.instruction_pattern(layout)?;
        claimed.extend(instruction.expand().map(|w| w.value()));

        for behaviour in &variant.behaviours {
            let source = if behaviour.flags == FlagCondition::any() {
                variant.to_string()
            } else {
                format!("{} ({})", variant, behaviour.flags)
            };
            debug!(variant = %source, %instruction, steps = behaviour.steps.len(), "assembling");
            templates.extend(behaviour_templates(layout, &instruction, behaviour, &source)?);
        }
    }

    let mut undefined = 0;
    for value in 0..(1u64 << layout.instruction_bits) {
        if claimed.contains(&value) {
            continue;
        }
        let instruction = BitPattern::concrete(value, layout.instruction_bits)?;
        templates.extend(fill_steps(
            layout,
            &instruction,
            &any_flags,
            FETCH_STEPS,
            &[ControlLine::Halt],
            &format!("undefined {:#04x}", value),
        )?);
        undefined += 1;
    }

    info!(variants = variants.len(), undefined, templates = templates.len(), "microcode templates");
    Ok(templates)
}

/// Compiles `variants` into the total, byte-wide ROM image whose high
/// address bits select the ROM chip.
pub fn compile(layout: &MicrocodeLayout, variants: &[Variant]) -> Result<Rom, UcodeError> {
    let templates = microcode_templates(layout, variants)?;
    let bytes = split_into_rom_bytes(layout, &templates)?;
    let rom = build_rom(&bytes, rom_address_bits(layout)?)?;
    info!(
        entries = rom.len(),
        address_bits = rom.address_bits(),
        bytes = rom.len() * num_bytes(rom.data_bits()),
        "compiled microcode"
    );
    Ok(rom)
}
