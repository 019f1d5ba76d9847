//! Writes a register to memory, including pushes onto the stack.

use common::{AluOperation, ControlLine, InstructionGroup, Mnemonic, Register};
use itertools::iproduct;

use super::{
    alu::step_stack_pointer, constant_address, dest, group, register_out, source, Behaviour, Operand, Variant,
    TRANSFER,
};
use crate::error::UcodeError;

const PUSH_SOURCES: [Register; 5] = [Register::Acc, Register::A, Register::B, Register::C, Register::Pc];

pub fn variants() -> Result<Vec<Variant>, UcodeError> {
    let mut variants = Vec::new();

    // the address register sits in the source field, the value in dest
    for (reg, val) in iproduct!(TRANSFER, Register::GENERAL) {
        variants.push(Variant {
            mnemonic: Mnemonic::Store,
            operands: vec![Operand::Register(val), Operand::Memory(reg)],
            instruction: vec![group(InstructionGroup::Store)?, source(reg.code())?, dest(val.code())?],
            behaviours: vec![Behaviour::always(vec![
                vec![register_out(reg)?, ControlLine::MarIn],
                vec![register_out(val)?, ControlLine::RamIn],
            ])],
        });
    }

    for val in Register::GENERAL {
        let mut steps = constant_address();
        steps.push(vec![ControlLine::RamOut, ControlLine::MarIn, ControlLine::PcCount]);
        steps.push(vec![register_out(val)?, ControlLine::RamIn]);
        variants.push(Variant {
            mnemonic: Mnemonic::Store,
            operands: vec![Operand::Register(val), Operand::MemoryConstant],
            instruction: vec![
                group(InstructionGroup::Store)?,
                source(Register::Const.code())?,
                dest(val.code())?,
            ],
            behaviours: vec![Behaviour::always(steps)],
        });
    }

    for val in PUSH_SOURCES {
        // decrement SP and latch the new value into MAR on the way back
        let mut steps = step_stack_pointer(AluOperation::AMinus1);
        steps[1].push(ControlLine::MarIn);
        steps.push(vec![register_out(val)?, ControlLine::RamIn]);
        variants.push(Variant {
            mnemonic: Mnemonic::Push,
            operands: vec![Operand::Register(val)],
            instruction: vec![
                group(InstructionGroup::Store)?,
                source(Register::SpPlusMinus.code())?,
                dest(val.code())?,
            ],
            behaviours: vec![Behaviour::always(steps)],
        });
    }

    Ok(variants)
}
