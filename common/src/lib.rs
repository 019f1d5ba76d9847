extern crate strum;
#[macro_use]
extern crate strum_macros;

extern crate packed_struct;
extern crate packed_struct_codegen;
use packed_struct::prelude::*;

use bitflags::bitflags;

pub mod hexfile;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        const ZERO = 0b1000;
        const CARRY = 0b0100;
        const NEGATIVE = 0b0010;
        const EQUAL = 0b0001;
    }
}

/// One wire of the control word. The discriminant is the bit position
/// within the control word.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlLine {
    AccIn = 0,
    AccOut = 1,
    AIn = 2,
    AOut = 3,
    BIn = 4,
    BOut = 5,
    CIn = 6,
    COut = 7,
    SpIn = 8,
    SpOut = 9,
    PcIn = 10,
    PcOut = 11,
    PcCount = 12,
    MarIn = 13,
    RamIn = 14,
    RamOut = 15,
    IrIn = 16,
    AluOut = 17,
    AluStoreResult = 18,
    AluStoreFlags = 19,
    AluAIsBus = 20,
    AluS0 = 21,
    AluS1 = 22,
    AluS2 = 23,
    AluS3 = 24,
    AluM = 25,
    AluCarryIn = 26,
    StepReset = 27,
    Halt = 28,
}

impl ControlLine {
    pub fn bit(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum InstructionGroup {
    Copy = 0b00,
    Load = 0b01,
    Store = 0b10,
    Alu = 0b11,
}

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Register {
    Acc = 0b000,
    A = 0b001,
    B = 0b010,
    C = 0b011,
    Sp = 0b100,
    Pc = 0b101,
    #[strum(serialize = "SP+/-")]
    SpPlusMinus = 0b110,
    Const = 0b111,
}

impl Register {
    pub const GENERAL: [Register; 4] = [Register::Acc, Register::A, Register::B, Register::C];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn control_in(self) -> Option<ControlLine> {
        match self {
            Register::Acc => Some(ControlLine::AccIn),
            Register::A => Some(ControlLine::AIn),
            Register::B => Some(ControlLine::BIn),
            Register::C => Some(ControlLine::CIn),
            Register::Sp => Some(ControlLine::SpIn),
            Register::Pc => Some(ControlLine::PcIn),
            Register::SpPlusMinus | Register::Const => None,
        }
    }

    pub fn control_out(self) -> Option<ControlLine> {
        match self {
            Register::Acc => Some(ControlLine::AccOut),
            Register::A => Some(ControlLine::AOut),
            Register::B => Some(ControlLine::BOut),
            Register::C => Some(ControlLine::COut),
            Register::Sp => Some(ControlLine::SpOut),
            Register::Pc => Some(ControlLine::PcOut),
            Register::SpPlusMinus | Register::Const => None,
        }
    }
}

/// Function select of the ALU. `A` is the accumulator unless
/// `ALU_A_IS_BUS` is asserted, `B` is always the bus.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash)]
#[derive(EnumCount, EnumIter)]
pub enum AluOperation {
    NotA,
    AOrB,
    AAndB,
    AXorB,
    APlus1,
    AMinus1,
    APlusB,
    APlusBPlus1,
    AMinusB,
    AMinusBMinus1,
    APlusA,
}

impl AluOperation {
    pub fn control_lines(self) -> &'static [ControlLine] {
        use ControlLine::*;
        match self {
            AluOperation::NotA => &[AluM],
            AluOperation::AOrB => &[AluM, AluS3, AluS2, AluS1],
            AluOperation::AAndB => &[AluM, AluS3, AluS1, AluS0],
            AluOperation::AXorB => &[AluM, AluS2, AluS1],
            AluOperation::APlus1 => &[AluCarryIn],
            AluOperation::AMinus1 => &[AluS3, AluS2, AluS1, AluS0],
            AluOperation::APlusB => &[AluS3, AluS0],
            AluOperation::APlusBPlus1 => &[AluS3, AluS0, AluCarryIn],
            AluOperation::AMinusB => &[AluS2, AluS1, AluCarryIn],
            AluOperation::AMinusBMinus1 => &[AluS2, AluS1],
            AluOperation::APlusA => &[AluS3, AluS2],
        }
    }
}

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Mnemonic {
    Noop,
    Copy,
    Set,
    Jump,
    JumpIfZero,
    JumpIfCarry,
    JumpIfNegative,
    JumpIfEqual,
    Load,
    Pop,
    Store,
    Push,
    Not,
    Incr,
    Decr,
    Add,
    Addc,
    Sub,
    Subb,
    And,
    Or,
    Xor,
    ShiftLeft,
    Cmp,
    Halt,
}

/// Operation field of an ALU group instruction byte.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash)]
#[derive(EnumCount, EnumIter)]
pub enum AluInstruction {
    Not = 0b0001,
    Incr = 0b0010,
    Decr = 0b0011,
    Add = 0b0100,
    Addc = 0b0101,
    Sub = 0b0110,
    Subb = 0b0111,
    And = 0b1000,
    Or = 0b1001,
    Xor = 0b1010,
    ShiftLeft = 0b1011,
    Cmp = 0b1100,
}

impl AluInstruction {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn mnemonic(self) -> Mnemonic {
        match self {
            AluInstruction::Not => Mnemonic::Not,
            AluInstruction::Incr => Mnemonic::Incr,
            AluInstruction::Decr => Mnemonic::Decr,
            AluInstruction::Add => Mnemonic::Add,
            AluInstruction::Addc => Mnemonic::Addc,
            AluInstruction::Sub => Mnemonic::Sub,
            AluInstruction::Subb => Mnemonic::Subb,
            AluInstruction::And => Mnemonic::And,
            AluInstruction::Or => Mnemonic::Or,
            AluInstruction::Xor => Mnemonic::Xor,
            AluInstruction::ShiftLeft => Mnemonic::ShiftLeft,
            AluInstruction::Cmp => Mnemonic::Cmp,
        }
    }
}

/// Field widths of the microcode address and of the control word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MicrocodeLayout {
    pub instruction_bits: usize,
    pub flags_bits: usize,
    pub step_bits: usize,
    pub control_word_bits: usize,
}

pub const LAYOUT: MicrocodeLayout = MicrocodeLayout {
    instruction_bits: 8,
    flags_bits: 4,
    step_bits: 5,
    control_word_bits: 32,
};

impl MicrocodeLayout {
    /// Width of instruction ++ flags ++ step, before the ROM chip index is
    /// prepended.
    pub const fn step_address_bits(&self) -> usize {
        self.instruction_bits + self.flags_bits + self.step_bits
    }

    pub const fn step_count(&self) -> usize {
        1 << self.step_bits
    }

    pub const fn step_offset(&self) -> usize {
        0
    }

    pub const fn flags_offset(&self) -> usize {
        self.step_bits
    }

    pub const fn instruction_offset(&self) -> usize {
        self.step_bits + self.flags_bits
    }
}

impl Default for MicrocodeLayout {
    fn default() -> Self {
        LAYOUT
    }
}

/// Concrete ROM address under the default [`LAYOUT`].
#[derive(Debug, PackedStruct)]
#[packed_struct(size_bytes = "3", endian = "lsb", bit_numbering = "lsb0")]
pub struct MicroAddress {
    #[packed_field(bits = "0..=4")]
    pub step: Integer<u8, packed_bits::Bits::<5>>,
    #[packed_field(bits = "5..=8")]
    pub flags: Integer<u8, packed_bits::Bits::<4>>,
    #[packed_field(bits = "9..=16")]
    pub instruction: u8,
    #[packed_field(bits = "17..=18")]
    pub rom_index: Integer<u8, packed_bits::Bits::<2>>,
    #[packed_field(bits = "19..=23")]
    pub reserved: ReservedZero<packed_bits::Bits::<5>>,
}

impl MicroAddress {
    pub fn new(rom_index: u8, instruction: u8, flags: Flags, step: u8) -> MicroAddress {
        MicroAddress {
            step: step.into(),
            flags: flags.bits().into(),
            instruction,
            rom_index: rom_index.into(),
            reserved: Default::default(),
        }
    }

    pub fn flags(&self) -> Flags {
        Flags::from_bits_truncate(*self.flags)
    }

    pub fn to_index(&self) -> Result<u32, PackingError> {
        let bytes = self.pack()?;
        Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    pub fn from_index(index: u32) -> Result<MicroAddress, PackingError> {
        let bytes = index.to_be_bytes();
        if bytes[0] != 0 {
            return Err(PackingError::InvalidValue);
        }
        MicroAddress::unpack(&[bytes[1], bytes[2], bytes[3]])
    }
}
