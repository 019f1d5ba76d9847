//! Register to register transfers and loading a register with a constant.

use common::{ControlLine, InstructionGroup, Mnemonic, Register};
use itertools::iproduct;

use super::{constant_address, dest, group, register_in, register_out, source, Behaviour, Operand, Variant, TRANSFER};
use crate::error::UcodeError;

const COPY_SOURCES: [Register; 6] = [
    Register::Acc,
    Register::A,
    Register::B,
    Register::C,
    Register::Sp,
    Register::Pc,
];

pub fn variants() -> Result<Vec<Variant>, UcodeError> {
    let mut variants = Vec::new();

    for (src, dst) in iproduct!(COPY_SOURCES, TRANSFER) {
        if src == dst {
            continue;
        }
        variants.push(Variant {
            mnemonic: Mnemonic::Copy,
            operands: vec![Operand::Register(src), Operand::Register(dst)],
            instruction: vec![group(InstructionGroup::Copy)?, source(src.code())?, dest(dst.code())?],
            behaviours: vec![Behaviour::always(vec![vec![register_out(src)?, register_in(dst)?]])],
        });
    }

    for dst in TRANSFER {
        let mut steps = constant_address();
        steps.push(vec![ControlLine::RamOut, register_in(dst)?, ControlLine::PcCount]);
        variants.push(Variant {
            mnemonic: Mnemonic::Set,
            operands: vec![Operand::Constant, Operand::Register(dst)],
            instruction: vec![
                group(InstructionGroup::Copy)?,
                source(Register::Const.code())?,
                dest(dst.code())?,
            ],
            behaviours: vec![Behaviour::always(steps)],
        });
    }

    Ok(variants)
}
