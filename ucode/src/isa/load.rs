//! Reads from memory into a register.

use common::{AluOperation, ControlLine, InstructionGroup, Mnemonic, Register};
use itertools::iproduct;

use super::{
    alu::step_stack_pointer, constant_address, dest, group, register_in, register_out, source, Behaviour, Operand,
    Variant, TRANSFER,
};
use crate::error::UcodeError;

pub fn variants() -> Result<Vec<Variant>, UcodeError> {
    let mut variants = Vec::new();

    for (reg, dst) in iproduct!(TRANSFER, Register::GENERAL) {
        variants.push(Variant {
            mnemonic: Mnemonic::Load,
            operands: vec![Operand::Memory(reg), Operand::Register(dst)],
            instruction: vec![group(InstructionGroup::Load)?, source(reg.code())?, dest(dst.code())?],
            behaviours: vec![Behaviour::always(vec![
                vec![register_out(reg)?, ControlLine::MarIn],
                vec![ControlLine::RamOut, register_in(dst)?],
            ])],
        });
    }

    for dst in Register::GENERAL {
        let mut steps = constant_address();
        steps.push(vec![ControlLine::RamOut, ControlLine::MarIn, ControlLine::PcCount]);
        steps.push(vec![ControlLine::RamOut, register_in(dst)?]);
        variants.push(Variant {
            mnemonic: Mnemonic::Load,
            operands: vec![Operand::MemoryConstant, Operand::Register(dst)],
            instruction: vec![
                group(InstructionGroup::Load)?,
                source(Register::Const.code())?,
                dest(dst.code())?,
            ],
            behaviours: vec![Behaviour::always(steps)],
        });
    }

    for dst in Register::GENERAL {
        let mut steps = vec![
            vec![ControlLine::SpOut, ControlLine::MarIn],
            vec![register_in(dst)?, ControlLine::RamOut],
        ];
        steps.extend(step_stack_pointer(AluOperation::APlus1));
        variants.push(Variant {
            mnemonic: Mnemonic::Pop,
            operands: vec![Operand::Register(dst)],
            instruction: vec![
                group(InstructionGroup::Load)?,
                source(Register::SpPlusMinus.code())?,
                dest(dst.code())?,
            ],
            behaviours: vec![Behaviour::always(steps)],
        });
    }

    Ok(variants)
}
