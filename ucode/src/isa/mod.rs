//! The instruction set: one [`Variant`] per concrete operand combination
//! of each mnemonic.

use std::fmt;

use common::{ControlLine, InstructionGroup, Mnemonic, MicrocodeLayout, Register, LAYOUT};

use crate::{
    bitdef::{BitPattern, Bitdef},
    error::UcodeError,
    template::FlagCondition,
};

mod alu;
mod copy;
mod jump;
mod load;
mod misc;
mod store;

pub const GROUP_OFFSET: usize = 6;
pub const SOURCE_OFFSET: usize = 3;
pub const DEST_OFFSET: usize = 0;
pub const ALU_OPERATION_OFFSET: usize = 2;
pub const ALU_OPERAND_OFFSET: usize = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Register(Register),
    Memory(Register),
    Constant,
    MemoryConstant,
}

impl Operand {
    /// Bytes following the instruction byte.
    pub fn constant_bytes(&self) -> usize {
        match self {
            Operand::Constant | Operand::MemoryConstant => 1,
            Operand::Register(_) | Operand::Memory(_) => 0,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{}", r),
            Operand::Memory(r) => write!(f, "[{}]", r),
            Operand::Constant => write!(f, "#c"),
            Operand::MemoryConstant => write!(f, "[#c]"),
        }
    }
}

/// The steps a variant executes while the flags satisfy `flags`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Behaviour {
    pub flags: FlagCondition,
    pub steps: Vec<Vec<ControlLine>>,
}

impl Behaviour {
    pub fn always(steps: Vec<Vec<ControlLine>>) -> Behaviour {
        Behaviour {
            flags: FlagCondition::any(),
            steps,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub mnemonic: Mnemonic,
    pub operands: Vec<Operand>,
    pub instruction: Vec<Bitdef>,
    pub behaviours: Vec<Behaviour>,
}

impl Variant {
    pub fn instruction_pattern(&self, layout: &MicrocodeLayout) -> Result<BitPattern, UcodeError> {
        Bitdef::compose(&self.to_string(), layout.instruction_bits, &self.instruction)
    }

    /// The instruction byte this variant is encoded as.
    pub fn opcode(&self) -> Result<u8, UcodeError> {
        let pattern = self.instruction_pattern(&LAYOUT)?;
        let word = pattern.as_word().ok_or_else(|| UcodeError::Composition {
            name: self.to_string(),
            reason: format!("instruction {} is not concrete", pattern),
        })?;
        Ok(word.value() as u8)
    }

    pub fn constant_bytes(&self) -> usize {
        self.operands.iter().map(Operand::constant_bytes).sum()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

pub fn group(group: InstructionGroup) -> Result<Bitdef, UcodeError> {
    Ok(Bitdef::new("group", GROUP_OFFSET, BitPattern::concrete(group as u64, 2)?))
}

pub fn source(code: u8) -> Result<Bitdef, UcodeError> {
    Ok(Bitdef::new("source", SOURCE_OFFSET, BitPattern::concrete(code as u64, 3)?))
}

pub fn dest(code: u8) -> Result<Bitdef, UcodeError> {
    Ok(Bitdef::new("dest", DEST_OFFSET, BitPattern::concrete(code as u64, 3)?))
}

pub fn alu_operation(code: u8) -> Result<Bitdef, UcodeError> {
    Ok(Bitdef::new("operation", ALU_OPERATION_OFFSET, BitPattern::concrete(code as u64, 4)?))
}

pub fn alu_operand(code: u8) -> Result<Bitdef, UcodeError> {
    Ok(Bitdef::new("operand", ALU_OPERAND_OFFSET, BitPattern::concrete(code as u64, 2)?))
}

pub(crate) fn register_in(r: Register) -> Result<ControlLine, UcodeError> {
    r.control_in().ok_or_else(|| UcodeError::Composition {
        name: r.to_string(),
        reason: "register cannot be loaded from the bus".to_string(),
    })
}

pub(crate) fn register_out(r: Register) -> Result<ControlLine, UcodeError> {
    r.control_out().ok_or_else(|| UcodeError::Composition {
        name: r.to_string(),
        reason: "register cannot drive the bus".to_string(),
    })
}

/// Registers that can be both source and destination of a transfer.
pub(crate) const TRANSFER: [Register; 5] = [Register::Acc, Register::A, Register::B, Register::C, Register::Sp];

/// Reads the constant at PC into MAR, leaving PC on the constant.
pub(crate) fn constant_address() -> Vec<Vec<ControlLine>> {
    vec![vec![ControlLine::PcOut, ControlLine::MarIn]]
}

pub fn instruction_set() -> Result<Vec<Variant>, UcodeError> {
    let mut variants = Vec::new();
    variants.extend(misc::variants()?);
    variants.extend(copy::variants()?);
    variants.extend(jump::variants()?);
    variants.extend(load::variants()?);
    variants.extend(store::variants()?);
    variants.extend(alu::variants()?);
    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn find<'a>(variants: &'a [Variant], name: &str) -> &'a Variant {
        variants.iter().find(|v| v.to_string() == name).unwrap()
    }

    #[test]
    fn opcodes() {
        let variants = instruction_set().unwrap();
        let expected = [
            ("NOOP", 0b00_000_000),
            ("COPY A B", 0b00_001_010),
            ("COPY PC SP", 0b00_101_100),
            ("SET #c C", 0b00_111_011),
            ("JUMP SP", 0b00_100_101),
            ("JUMP #c", 0b00_111_101),
            ("LOAD [B] ACC", 0b01_010_000),
            ("LOAD [#c] B", 0b01_111_010),
            ("POP A", 0b01_110_001),
            ("JUMP_IF_ZERO #c", 0b01_111_100),
            ("JUMP_IF_EQUAL #c", 0b01_111_111),
            ("STORE C [SP]", 0b10_100_011),
            ("STORE A [#c]", 0b10_111_001),
            ("PUSH PC", 0b10_110_101),
            ("NOT A", 0b11_0001_01),
            ("ADDC B", 0b11_0101_10),
            ("CMP C", 0b11_1100_11),
            ("HALT", 0b11_1111_11),
        ];
        for (name, opcode) in expected {
            assert_eq!(Ok(opcode), find(&variants, name).opcode(), "{}", name);
        }
    }

    #[test]
    fn opcodes_are_unique() {
        let variants = instruction_set().unwrap();
        let mut seen: HashMap<u8, String> = HashMap::new();
        for v in &variants {
            if let Some(other) = seen.insert(v.opcode().unwrap(), v.to_string()) {
                panic!("{} and {} share an opcode", other, v);
            }
        }
    }

    #[test]
    fn constants() {
        let variants = instruction_set().unwrap();
        assert_eq!(0, find(&variants, "COPY A B").constant_bytes());
        assert_eq!(1, find(&variants, "SET #c A").constant_bytes());
        assert_eq!(1, find(&variants, "STORE B [#c]").constant_bytes());
    }

    #[test]
    fn behaviours_are_not_empty() {
        for v in instruction_set().unwrap() {
            assert!(!v.behaviours.is_empty(), "{}", v);
            for b in &v.behaviours {
                assert!(!b.steps.is_empty(), "{} {}", v, b.flags);
            }
        }
    }

    #[test]
    fn transfer_registers() {
        assert_eq!(Ok(ControlLine::SpIn), register_in(Register::Sp));
        assert_eq!(Ok(ControlLine::PcOut), register_out(Register::Pc));
        assert!(register_in(Register::Const).is_err());
        assert!(register_out(Register::SpPlusMinus).is_err());
    }
}
