//! Unconditional jumps and the flag conditional jumps.

use common::{ControlLine, Flags, InstructionGroup, Mnemonic, Register};

use super::{constant_address, dest, group, register_out, source, Behaviour, Operand, Variant, TRANSFER};
use crate::{error::UcodeError, template::FlagCondition};

const CONDITIONAL: [(Mnemonic, Flags); 4] = [
    (Mnemonic::JumpIfZero, Flags::ZERO),
    (Mnemonic::JumpIfCarry, Flags::CARRY),
    (Mnemonic::JumpIfNegative, Flags::NEGATIVE),
    (Mnemonic::JumpIfEqual, Flags::EQUAL),
];

// dest field 1ff
const CONDITIONAL_DEST: u8 = 0b100;

fn jump_to_constant() -> Vec<Vec<ControlLine>> {
    let mut steps = constant_address();
    steps.push(vec![ControlLine::RamOut, ControlLine::PcIn]);
    steps
}

pub fn variants() -> Result<Vec<Variant>, UcodeError> {
    let mut variants = Vec::new();

    for reg in TRANSFER {
        variants.push(Variant {
            mnemonic: Mnemonic::Jump,
            operands: vec![Operand::Register(reg)],
            instruction: vec![
                group(InstructionGroup::Copy)?,
                source(reg.code())?,
                dest(Register::Pc.code())?,
            ],
            behaviours: vec![Behaviour::always(vec![vec![register_out(reg)?, ControlLine::PcIn]])],
        });
    }

    variants.push(Variant {
        mnemonic: Mnemonic::Jump,
        operands: vec![Operand::Constant],
        instruction: vec![
            group(InstructionGroup::Copy)?,
            source(Register::Const.code())?,
            dest(Register::Pc.code())?,
        ],
        behaviours: vec![Behaviour::always(jump_to_constant())],
    });

    for (i, (mnemonic, flag)) in CONDITIONAL.into_iter().enumerate() {
        variants.push(Variant {
            mnemonic,
            operands: vec![Operand::Constant],
            instruction: vec![
                group(InstructionGroup::Load)?,
                source(Register::Const.code())?,
                dest(CONDITIONAL_DEST | i as u8)?,
            ],
            behaviours: vec![
                Behaviour {
                    flags: FlagCondition::when(flag),
                    steps: jump_to_constant(),
                },
                Behaviour {
                    flags: FlagCondition::unless(flag),
                    // step over the constant
                    steps: vec![vec![ControlLine::PcCount]],
                },
            ],
        });
    }

    Ok(variants)
}
