extern crate pest;
#[macro_use]
extern crate pest_derive;
use pest::{iterators::Pair, Parser};

use std::str::FromStr;

use common::{Mnemonic, Register};
use thiserror::Error;
use ucode::{instruction_set, Operand, UcodeError, Variant};

#[derive(Parser)]
#[grammar = "assembly.pest"]
struct AssemblyParser;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),
    #[error("unknown register '{0}'")]
    UnknownRegister(String),
    #[error("constant '{0}' does not fit in a byte")]
    ConstantOutOfRange(String),
    #[error("no instruction matches '{0}'")]
    NoMatchingVariant(String),
    #[error("'{0}' matches more than one instruction")]
    Ambiguous(String),
    #[error("line {line}: {error}")]
    Line { line: usize, error: Box<AssembleError> },
    #[error(transparent)]
    Ucode(#[from] UcodeError),
}

/// An operand as written, with its constant resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Argument {
    Register(Register),
    Memory(Register),
    Constant(u8),
    MemoryConstant(u8),
}

impl Argument {
    pub fn operand(&self) -> Operand {
        match self {
            Argument::Register(r) => Operand::Register(*r),
            Argument::Memory(r) => Operand::Memory(*r),
            Argument::Constant(_) => Operand::Constant,
            Argument::MemoryConstant(_) => Operand::MemoryConstant,
        }
    }

    pub fn constant(&self) -> Option<u8> {
        match self {
            Argument::Constant(c) | Argument::MemoryConstant(c) => Some(*c),
            Argument::Register(_) | Argument::Memory(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineCode {
    pub source: String,
    pub bytes: Vec<u8>,
}

fn parse_constant(constant: Pair<Rule>) -> Result<u8, AssembleError> {
    debug_assert_eq!(constant.as_rule(), Rule::constant);
    let text = constant.as_str().to_owned();
    let digits = constant
        .into_inner()
        .next()
        .ok_or_else(|| AssembleError::Syntax(text.clone()))?;
    let value = match digits.as_rule() {
        Rule::hex_constant => u8::from_str_radix(&digits.as_str()[2..], 16),
        Rule::bin_constant => u8::from_str_radix(&digits.as_str()[2..], 2),
        _ => digits.as_str().parse::<u8>(),
    };
    value.map_err(|_| AssembleError::ConstantOutOfRange(text))
}

fn parse_register(register: Pair<Rule>) -> Result<Register, AssembleError> {
    Register::from_str(register.as_str()).map_err(|_| AssembleError::UnknownRegister(register.as_str().to_owned()))
}

fn parse_argument(arg: Pair<Rule>) -> Result<Argument, AssembleError> {
    match arg.as_rule() {
        Rule::register => Ok(Argument::Register(parse_register(arg)?)),
        Rule::constant => Ok(Argument::Constant(parse_constant(arg)?)),
        Rule::memory => {
            let text = arg.as_str().to_owned();
            let inner = arg.into_inner().next().ok_or(AssembleError::Syntax(text))?;
            match inner.as_rule() {
                Rule::register => Ok(Argument::Memory(parse_register(inner)?)),
                _ => Ok(Argument::MemoryConstant(parse_constant(inner)?)),
            }
        }
        _ => Err(AssembleError::Syntax(arg.as_str().to_owned())),
    }
}

fn find_variant<'a>(
    variants: &'a [Variant],
    mnemonic: Mnemonic,
    args: &[Argument],
    source: &str,
) -> Result<&'a Variant, AssembleError> {
    let operands: Vec<Operand> = args.iter().map(Argument::operand).collect();
    let mut matching = variants
        .iter()
        .filter(|v| v.mnemonic == mnemonic && v.operands == operands);

    let variant = matching
        .next()
        .ok_or_else(|| AssembleError::NoMatchingVariant(source.to_owned()))?;
    if matching.next().is_some() {
        return Err(AssembleError::Ambiguous(source.to_owned()));
    }
    Ok(variant)
}

/// Machine code for one line, or `None` if the line holds no instruction.
pub fn parse_line(line: &str) -> Result<Option<MachineCode>, AssembleError> {
    let mut pairs = AssemblyParser::parse(Rule::line, line).map_err(|e| AssembleError::Syntax(e.to_string()))?;
    let instruction = match pairs
        .next()
        .and_then(|line| line.into_inner().find(|p| p.as_rule() == Rule::instruction))
    {
        Some(instruction) => instruction,
        None => return Ok(None),
    };

    // the instruction span also holds any trailing comment, so end the
    // source at the last operand
    let start = instruction.as_span().start();
    let parts: Vec<Pair<Rule>> = instruction.into_inner().collect();
    let end = parts.last().map_or(start, |p| p.as_span().end());
    let source = line[start..end].to_owned();

    let mut inner = parts.into_iter();
    let mnemonic = inner
        .next()
        .ok_or_else(|| AssembleError::Syntax(source.clone()))?
        .as_str()
        .to_ascii_uppercase();
    let mnemonic = Mnemonic::from_str(&mnemonic).map_err(|_| AssembleError::UnknownMnemonic(mnemonic.clone()))?;

    let args = inner.map(parse_argument).collect::<Result<Vec<_>, _>>()?;
    let variant = find_variant(instruction_set()?, mnemonic, &args, &source)?;

    let mut bytes = vec![variant.opcode()?];
    bytes.extend(args.iter().filter_map(Argument::constant));

    Ok(Some(MachineCode { source, bytes }))
}

/// Machine code for every instruction line of `input`.
pub fn assemble_lines(input: &str) -> Result<Vec<MachineCode>, AssembleError> {
    let mut code = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let parsed = parse_line(line).map_err(|error| AssembleError::Line {
            line: i + 1,
            error: Box::new(error),
        })?;
        code.extend(parsed);
    }
    Ok(code)
}

pub fn assemble_from_str(input: &str) -> Result<Vec<u8>, AssembleError> {
    Ok(assemble_lines(input)?
        .into_iter()
        .flat_map(|code| code.bytes)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bytes(line: &str) -> Vec<u8> {
        parse_line(line).unwrap().unwrap().bytes
    }

    #[test]
    fn instructions() {
        assert_eq!(vec![0x71], bytes("POP A"));
        assert_eq!(vec![0x7A, 0x20], bytes("LOAD [#0x20] B"));
        assert_eq!(vec![0x7C, 3], bytes("JUMP_IF_ZERO #3"));
        assert_eq!(vec![0x0A], bytes("COPY A, B"));
        assert_eq!(vec![0xA3], bytes("STORE C [SP]"));
        assert_eq!(vec![0x38, 0x0A], bytes("SET #0b1010 ACC"));
        assert_eq!(vec![0x00], bytes("noop"));
        assert_eq!(vec![0xFF], bytes("HALT // stop"));
        assert_eq!(vec![0xD6], bytes("ADDC B"));
    }

    #[test]
    fn source_is_kept() {
        assert_eq!(
            Some(MachineCode {
                source: "PUSH PC".to_owned(),
                bytes: vec![0xB5],
            }),
            parse_line("  PUSH PC  // return address").unwrap()
        );
        assert_eq!(
            "HALT",
            parse_line("HALT // stop, comma, [A]").unwrap().unwrap().source
        );
        assert_eq!(
            "LOAD [#0x20], B",
            parse_line("LOAD [#0x20], B, // trailing comma").unwrap().unwrap().source
        );
    }

    #[test]
    fn blank_lines() {
        assert_eq!(None, parse_line("").unwrap());
        assert_eq!(None, parse_line("   ").unwrap());
        assert_eq!(None, parse_line("// just a comment").unwrap());
    }

    #[test]
    fn errors() {
        assert_eq!(
            Err(AssembleError::NoMatchingVariant("COPY A A".to_owned())),
            parse_line("COPY A A")
        );
        assert_eq!(
            Err(AssembleError::ConstantOutOfRange("#256".to_owned())),
            parse_line("SET #256 A")
        );
        assert_eq!(Err(AssembleError::UnknownMnemonic("FOO".to_owned())), parse_line("FOO A"));
        assert_eq!(
            Err(AssembleError::NoMatchingVariant("POP PC".to_owned())),
            parse_line("POP PC // not a general register")
        );
        assert!(matches!(parse_line("POP ["), Err(AssembleError::Syntax(_))));
        assert!(matches!(parse_line("LOAD [#0x20 B"), Err(AssembleError::Syntax(_))));
    }

    #[test]
    fn program() {
        let program = "\
            // count down from 3\n\
            SET #3 A\n\
            \n\
            DECR A\n\
            JUMP_IF_ZERO #7\n\
            JUMP #2\n\
            HALT\n";
        assert_eq!(
            vec![0x39, 3, 0xCD, 0x7C, 7, 0x3D, 2, 0xFF],
            assemble_from_str(program).unwrap()
        );
    }

    #[test]
    fn errors_name_the_line() {
        let err = assemble_from_str("NOOP\nHALT\nPOP PC\n").unwrap_err();
        assert_eq!(
            AssembleError::Line {
                line: 3,
                error: Box::new(AssembleError::NoMatchingVariant("POP PC".to_owned())),
            },
            err
        );
        assert_eq!("line 3: no instruction matches 'POP PC'", err.to_string());
    }
}
