use common::{ControlLine, InstructionGroup, Mnemonic};

use super::{alu_operand, alu_operation, dest, group, source, Behaviour, Variant};
use crate::error::UcodeError;

pub const HALT_OPERATION: u8 = 0b1111;
pub const HALT_OPERAND: u8 = 0b11;

pub fn variants() -> Result<Vec<Variant>, UcodeError> {
    Ok(vec![
        Variant {
            mnemonic: Mnemonic::Noop,
            operands: vec![],
            instruction: vec![group(InstructionGroup::Copy)?, source(0)?, dest(0)?],
            behaviours: vec![Behaviour::always(vec![vec![]])],
        },
        Variant {
            mnemonic: Mnemonic::Halt,
            operands: vec![],
            instruction: vec![
                group(InstructionGroup::Alu)?,
                alu_operation(HALT_OPERATION)?,
                alu_operand(HALT_OPERAND)?,
            ],
            behaviours: vec![Behaviour::always(vec![vec![ControlLine::Halt]])],
        },
    ])
}
