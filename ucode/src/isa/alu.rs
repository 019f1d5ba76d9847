//! The ALU group. `A` is the accumulator unless ALU_A_IS_BUS is asserted,
//! `B` is always the bus.

use common::{AluInstruction, AluOperation, ControlLine, Flags, InstructionGroup, Register};
use strum::IntoEnumIterator;

use super::{alu_operand, alu_operation, group, register_in, register_out, Behaviour, Operand, Variant};
use crate::{error::UcodeError, template::FlagCondition};

enum Form {
    /// op reg, result back into reg
    Unary(AluOperation),
    /// ACC op reg, result into ACC
    Binary(AluOperation),
    /// carry-in follows the CARRY flag
    WithCarry { set: AluOperation, clear: AluOperation },
    Compare(AluOperation),
}

fn form(instruction: AluInstruction) -> Form {
    match instruction {
        AluInstruction::Not => Form::Unary(AluOperation::NotA),
        AluInstruction::Incr => Form::Unary(AluOperation::APlus1),
        AluInstruction::Decr => Form::Unary(AluOperation::AMinus1),
        AluInstruction::ShiftLeft => Form::Unary(AluOperation::APlusA),
        AluInstruction::Add => Form::Binary(AluOperation::APlusB),
        AluInstruction::Sub => Form::Binary(AluOperation::AMinusB),
        AluInstruction::And => Form::Binary(AluOperation::AAndB),
        AluInstruction::Or => Form::Binary(AluOperation::AOrB),
        AluInstruction::Xor => Form::Binary(AluOperation::AXorB),
        AluInstruction::Addc => Form::WithCarry {
            set: AluOperation::APlusBPlus1,
            clear: AluOperation::APlusB,
        },
        AluInstruction::Subb => Form::WithCarry {
            set: AluOperation::AMinusBMinus1,
            clear: AluOperation::AMinusB,
        },
        AluInstruction::Cmp => Form::Compare(AluOperation::AMinusB),
    }
}

fn with_operation(mut lines: Vec<ControlLine>, operation: AluOperation) -> Vec<ControlLine> {
    lines.extend_from_slice(operation.control_lines());
    lines
}

fn binary(reg: Register, operation: AluOperation) -> Result<Vec<Vec<ControlLine>>, UcodeError> {
    Ok(vec![
        with_operation(
            vec![register_out(reg)?, ControlLine::AluStoreResult, ControlLine::AluStoreFlags],
            operation,
        ),
        vec![ControlLine::AluOut, ControlLine::AccIn],
    ])
}

/// Applies `operation` to SP through the ALU without touching the flags.
pub(crate) fn step_stack_pointer(operation: AluOperation) -> Vec<Vec<ControlLine>> {
    vec![
        with_operation(
            vec![ControlLine::SpOut, ControlLine::AluAIsBus, ControlLine::AluStoreResult],
            operation,
        ),
        vec![ControlLine::AluOut, ControlLine::SpIn],
    ]
}

fn behaviours(instruction: AluInstruction, reg: Register) -> Result<Vec<Behaviour>, UcodeError> {
    Ok(match form(instruction) {
        Form::Unary(operation) => vec![Behaviour::always(vec![
            with_operation(
                vec![
                    register_out(reg)?,
                    ControlLine::AluAIsBus,
                    ControlLine::AluStoreResult,
                    ControlLine::AluStoreFlags,
                ],
                operation,
            ),
            vec![ControlLine::AluOut, register_in(reg)?],
        ])],
        Form::Binary(operation) => vec![Behaviour::always(binary(reg, operation)?)],
        Form::WithCarry { set, clear } => vec![
            Behaviour {
                flags: FlagCondition::when(Flags::CARRY),
                steps: binary(reg, set)?,
            },
            Behaviour {
                flags: FlagCondition::unless(Flags::CARRY),
                steps: binary(reg, clear)?,
            },
        ],
        Form::Compare(operation) => vec![Behaviour::always(vec![with_operation(
            vec![register_out(reg)?, ControlLine::AluStoreFlags],
            operation,
        )])],
    })
}

pub fn variants() -> Result<Vec<Variant>, UcodeError> {
    let mut variants = Vec::new();
    for instruction in AluInstruction::iter() {
        for (operand, reg) in Register::GENERAL.into_iter().enumerate() {
            variants.push(Variant {
                mnemonic: instruction.mnemonic(),
                operands: vec![Operand::Register(reg)],
                instruction: vec![
                    group(InstructionGroup::Alu)?,
                    alu_operation(instruction.code())?,
                    alu_operand(operand as u8)?,
                ],
                behaviours: behaviours(instruction, reg)?,
            });
        }
    }
    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn find(name: &str) -> Variant {
        variants().unwrap().into_iter().find(|v| v.to_string() == name).unwrap()
    }

    #[test]
    fn unary_writes_back() {
        let incr = find("INCR B");
        assert_eq!(1, incr.behaviours.len());
        assert_eq!(
            vec![
                vec![
                    ControlLine::BOut,
                    ControlLine::AluAIsBus,
                    ControlLine::AluStoreResult,
                    ControlLine::AluStoreFlags,
                    ControlLine::AluCarryIn,
                ],
                vec![ControlLine::AluOut, ControlLine::BIn],
            ],
            incr.behaviours[0].steps
        );
    }

    #[test]
    fn carry_selects_operation() {
        let addc = find("ADDC C");
        assert_eq!(2, addc.behaviours.len());
        assert_eq!(FlagCondition::when(Flags::CARRY), addc.behaviours[0].flags);
        assert!(addc.behaviours[0].steps[0].contains(&ControlLine::AluCarryIn));
        assert_eq!(FlagCondition::unless(Flags::CARRY), addc.behaviours[1].flags);
        assert!(!addc.behaviours[1].steps[0].contains(&ControlLine::AluCarryIn));

        let subb = find("SUBB A");
        assert!(!subb.behaviours[0].steps[0].contains(&ControlLine::AluCarryIn));
        assert!(subb.behaviours[1].steps[0].contains(&ControlLine::AluCarryIn));
    }

    #[test]
    fn compare_only_stores_flags() {
        let cmp = find("CMP ACC");
        assert_eq!(
            vec![vec![
                ControlLine::AccOut,
                ControlLine::AluStoreFlags,
                ControlLine::AluS2,
                ControlLine::AluS1,
                ControlLine::AluCarryIn,
            ]],
            cmp.behaviours[0].steps
        );
    }
}
