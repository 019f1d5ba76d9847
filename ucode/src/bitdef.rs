//! Tri-state bit patterns and the named, positioned fields ("bitdefs")
//! that compose them.
//!
//! A [`BitPattern`] stores its bits as a value and a care mask: a set
//! care bit means the position is fixed to the matching value bit, a
//! clear care bit means the position is a wildcard. Bit 0 is the least
//! significant bit; text forms are written most significant bit first.

use std::{fmt, str::FromStr};

use crate::error::UcodeError;

pub const MAX_WIDTH: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bit {
    Zero,
    One,
    X,
}

impl TryFrom<char> for Bit {
    type Error = UcodeError;

    fn try_from(c: char) -> Result<Bit, UcodeError> {
        match c {
            '0' => Ok(Bit::Zero),
            '1' => Ok(Bit::One),
            '.' | 'X' | 'x' => Ok(Bit::X),
            c => Err(UcodeError::InvalidBit(c)),
        }
    }
}

impl From<Bit> for char {
    fn from(b: Bit) -> char {
        match b {
            Bit::Zero => '0',
            Bit::One => '1',
            Bit::X => '.',
        }
    }
}

fn width_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn check_width(name: &str, width: usize) -> Result<(), UcodeError> {
    if width > MAX_WIDTH {
        Err(UcodeError::Composition {
            name: name.to_string(),
            reason: format!("{} bits is wider than {}", width, MAX_WIDTH),
        })
    } else {
        Ok(())
    }
}

/// A concrete bit string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Word {
    value: u64,
    width: u8,
}

impl Word {
    pub fn new(value: u64, width: usize) -> Result<Word, UcodeError> {
        check_width("word", width)?;
        if value & !width_mask(width) != 0 {
            return Err(UcodeError::Composition {
                name: "word".to_string(),
                reason: format!("{:#x} does not fit in {} bits", value, width),
            });
        }
        Ok(Word { value, width: width as u8 })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width()).rev() {
            write!(f, "{}", (self.value >> i) & 1)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({})", self)
    }
}

impl FromStr for Word {
    type Err = UcodeError;

    fn from_str(s: &str) -> Result<Word, UcodeError> {
        let pattern: BitPattern = s.parse()?;
        pattern.as_word().ok_or(UcodeError::InvalidBit('.'))
    }
}

/// A fixed-width string of `0`, `1` and wildcard bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitPattern {
    value: u64,
    care: u64,
    width: u8,
}

impl BitPattern {
    pub fn wildcard(width: usize) -> Result<BitPattern, UcodeError> {
        check_width("wildcard", width)?;
        Ok(BitPattern { value: 0, care: 0, width: width as u8 })
    }

    pub fn concrete(value: u64, width: usize) -> Result<BitPattern, UcodeError> {
        Ok(Word::new(value, width)?.into())
    }

    /// A single fixed bit at `position` in an otherwise wildcard pattern.
    pub fn single(position: usize, bit: bool, width: usize) -> Result<BitPattern, UcodeError> {
        if position >= width {
            return Err(UcodeError::Composition {
                name: "bit".to_string(),
                reason: format!("bit {} is outside a {} bit field", position, width),
            });
        }
        check_width("bit", width)?;
        Ok(BitPattern {
            value: (bit as u64) << position,
            care: 1 << position,
            width: width as u8,
        })
    }

    pub fn from_bits(bits: &[Bit]) -> Result<BitPattern, UcodeError> {
        check_width("pattern", bits.len())?;
        let mut pattern = BitPattern { value: 0, care: 0, width: bits.len() as u8 };
        for (i, bit) in bits.iter().rev().enumerate() {
            match bit {
                Bit::Zero => pattern.care |= 1 << i,
                Bit::One => {
                    pattern.care |= 1 << i;
                    pattern.value |= 1 << i;
                }
                Bit::X => {}
            }
        }
        Ok(pattern)
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn bit(&self, position: usize) -> Bit {
        if position >= self.width() || (self.care >> position) & 1 == 0 {
            Bit::X
        } else if (self.value >> position) & 1 == 1 {
            Bit::One
        } else {
            Bit::Zero
        }
    }

    pub fn wildcard_mask(&self) -> u64 {
        !self.care & width_mask(self.width())
    }

    pub fn wildcard_count(&self) -> usize {
        self.wildcard_mask().count_ones() as usize
    }

    pub fn is_concrete(&self) -> bool {
        self.wildcard_mask() == 0
    }

    pub fn as_word(&self) -> Option<Word> {
        if self.is_concrete() {
            Some(Word { value: self.value, width: self.width })
        } else {
            None
        }
    }

    pub fn matches(&self, value: u64) -> bool {
        value & !width_mask(self.width()) == 0 && value & self.care == self.value
    }

    /// Overlays patterns of equal width. A position may be fixed by any
    /// number of patterns as long as they agree on its value.
    pub fn merge(name: &str, patterns: &[BitPattern]) -> Result<BitPattern, UcodeError> {
        let width = match patterns.first() {
            Some(p) => p.width(),
            None => {
                return Err(UcodeError::Composition {
                    name: name.to_string(),
                    reason: "nothing to merge".to_string(),
                })
            }
        };

        let mut merged = BitPattern { value: 0, care: 0, width: width as u8 };
        for pattern in patterns {
            if pattern.width() != width {
                return Err(UcodeError::Composition {
                    name: name.to_string(),
                    reason: format!("{} is {} bits wide, not {}", pattern, pattern.width(), width),
                });
            }

            let both = merged.care & pattern.care;
            if merged.value & both != pattern.value & both {
                return Err(UcodeError::Composition {
                    name: name.to_string(),
                    reason: format!("{} disagrees with {}", pattern, merged),
                });
            }

            merged.care |= pattern.care;
            merged.value |= pattern.value;
        }

        Ok(merged)
    }

    /// Replaces every wildcard with `bit`. Filling with [`Bit::X`] is a no-op.
    pub fn fill(&self, bit: Bit) -> BitPattern {
        let wildcards = self.wildcard_mask();
        match bit {
            Bit::X => *self,
            Bit::Zero => BitPattern { care: self.care | wildcards, ..*self },
            Bit::One => BitPattern {
                value: self.value | wildcards,
                care: self.care | wildcards,
                width: self.width,
            },
        }
    }

    /// Concatenates patterns, the first one landing in the most
    /// significant bits.
    pub fn concat(patterns: &[BitPattern]) -> Result<BitPattern, UcodeError> {
        let width: usize = patterns.iter().map(|p| p.width()).sum();
        check_width("concatenation", width)?;

        let mut out = BitPattern { value: 0, care: 0, width: width as u8 };
        let mut shift = width;
        for pattern in patterns {
            shift -= pattern.width();
            if pattern.width() > 0 {
                out.value |= pattern.value << shift;
                out.care |= pattern.care << shift;
            }
        }
        Ok(out)
    }

    /// The `width` bits starting at bit `lo`.
    pub fn slice(&self, lo: usize, width: usize) -> Result<BitPattern, UcodeError> {
        if lo + width > self.width() {
            return Err(UcodeError::Composition {
                name: "slice".to_string(),
                reason: format!("bits {}..{} are outside {}", lo, lo + width, self),
            });
        }
        let mask = width_mask(width);
        let (value, care) = if lo >= 64 {
            (0, 0)
        } else {
            ((self.value >> lo) & mask, (self.care >> lo) & mask)
        };
        Ok(BitPattern { value, care, width: width as u8 })
    }

    /// Every concrete word the pattern denotes, in ascending order.
    pub fn expand(&self) -> Expand {
        Expand {
            base: self.value & self.care,
            mask: self.wildcard_mask(),
            next: Some(0),
            width: self.width,
        }
    }

    /// Patterns that together match exactly the values in `start..end`,
    /// one per aligned power-of-two block.
    pub fn covering(start: u64, end: u64, width: usize) -> Result<Vec<BitPattern>, UcodeError> {
        check_width("range", width)?;
        let full = width_mask(width);
        if end > 0 && end - 1 > full {
            return Err(UcodeError::Composition {
                name: "range".to_string(),
                reason: format!("{} does not fit in {} bits", end - 1, width),
            });
        }

        let mut patterns = Vec::new();
        let mut lo = start;
        while lo < end {
            let mut size: u64 = 1;
            while let Some(double) = size.checked_mul(2) {
                if double - 1 > full || lo % double != 0 || double > end - lo {
                    break;
                }
                size = double;
            }
            let care = full & !(size - 1);
            patterns.push(BitPattern { value: lo & care, care, width: width as u8 });
            lo += size;
        }
        Ok(patterns)
    }
}

impl From<Word> for BitPattern {
    fn from(w: Word) -> BitPattern {
        BitPattern {
            value: w.value,
            care: width_mask(w.width()),
            width: w.width,
        }
    }
}

impl fmt::Display for BitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width()).rev() {
            write!(f, "{}", char::from(self.bit(i)))?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitPattern({})", self)
    }
}

impl FromStr for BitPattern {
    type Err = UcodeError;

    fn from_str(s: &str) -> Result<BitPattern, UcodeError> {
        let bits = s
            .chars()
            .map(Bit::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        BitPattern::from_bits(&bits)
    }
}

/// Submask enumeration over the wildcard positions of a pattern.
pub struct Expand {
    base: u64,
    mask: u64,
    next: Option<u64>,
    width: u8,
}

impl Iterator for Expand {
    type Item = Word;

    fn next(&mut self) -> Option<Word> {
        let submask = self.next?;
        self.next = if submask == self.mask {
            None
        } else {
            Some(submask.wrapping_sub(self.mask) & self.mask)
        };
        Some(Word {
            value: self.base | submask,
            width: self.width,
        })
    }
}

/// A named pattern placed at a fixed offset inside a composite field.
/// `offset` is the position of the bitdef's least significant bit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitdef {
    pub name: String,
    pub offset: usize,
    pub pattern: BitPattern,
}

impl Bitdef {
    pub fn new<S: Into<String>>(name: S, offset: usize, pattern: BitPattern) -> Bitdef {
        Bitdef {
            name: name.into(),
            offset,
            pattern,
        }
    }

    pub fn width(&self) -> usize {
        self.pattern.width()
    }

    /// Concatenates `bitdefs` in the order given, most significant first.
    /// They must tile exactly `width` bits, each at its declared offset.
    pub fn compose(name: &str, width: usize, bitdefs: &[Bitdef]) -> Result<BitPattern, UcodeError> {
        let mut remaining = width;
        for bitdef in bitdefs {
            if bitdef.width() > remaining {
                return Err(UcodeError::Composition {
                    name: name.to_string(),
                    reason: format!(
                        "{} ({} bits) overflows the {} bit field",
                        bitdef.name,
                        bitdef.width(),
                        width
                    ),
                });
            }
            remaining -= bitdef.width();
            if bitdef.offset != remaining {
                return Err(UcodeError::Composition {
                    name: name.to_string(),
                    reason: format!(
                        "{} is declared at bit {} but lands at bit {}",
                        bitdef.name, bitdef.offset, remaining
                    ),
                });
            }
        }

        if remaining != 0 {
            return Err(UcodeError::Composition {
                name: name.to_string(),
                reason: format!("bitdefs cover {} of {} bits", width - remaining, width),
            });
        }

        let patterns: Vec<BitPattern> = bitdefs.iter().map(|b| b.pattern).collect();
        BitPattern::concat(&patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> BitPattern {
        s.parse().unwrap()
    }

    fn words(pattern: &str) -> Vec<String> {
        p(pattern).expand().map(|w| w.to_string()).collect()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("01.1", p("01X1").to_string());
        assert_eq!("01.1", p("01.1").to_string());
        assert_eq!(Bit::One, p("01.1").bit(0));
        assert_eq!(Bit::X, p("01.1").bit(1));
        assert_eq!(Bit::Zero, p("01.1").bit(3));
        assert_eq!(Err(UcodeError::InvalidBit('2')), "012".parse::<BitPattern>());
        assert_eq!(0, p("").width());
    }

    #[test]
    fn words_are_concrete() {
        let w: Word = "0110".parse().unwrap();
        assert_eq!(6, w.value());
        assert_eq!(4, w.width());
        assert!("01.0".parse::<Word>().is_err());
        assert!(Word::new(4, 2).is_err());
    }

    #[test]
    fn expand_wildcards() {
        assert_eq!(vec!["000", "001"], words("00."));
        assert_eq!(vec!["0", "1"], words("."));
        assert_eq!(vec!["0"], words("0"));
        assert_eq!(vec!["1000", "1001", "1100", "1101"], words("1.0."));

        let pattern = p("..1.0.");
        let expanded: Vec<Word> = pattern.expand().collect();
        assert_eq!(1 << pattern.wildcard_count(), expanded.len());
        for word in expanded {
            assert!(pattern.matches(word.value()), "{}", word);
        }
    }

    #[test]
    fn matches() {
        assert!(p("1.0").matches(0b100));
        assert!(p("1.0").matches(0b110));
        assert!(!p("1.0").matches(0b101));
        assert!(!p("1.0").matches(0b1100));
    }

    #[test]
    fn merge() {
        assert_eq!(p("1..0"), BitPattern::merge("m", &[p("1..."), p("...0"), p("1...")]).unwrap());

        let err = BitPattern::merge("flags", &[p("1..."), p("0...")]).unwrap_err();
        assert!(matches!(err, UcodeError::Composition { ref name, .. } if name == "flags"));

        assert!(BitPattern::merge("m", &[p("1.."), p("1...")]).is_err());
        assert!(BitPattern::merge("m", &[]).is_err());
    }

    #[test]
    fn fill() {
        assert_eq!(p("0100"), p(".1..").fill(Bit::Zero));
        assert_eq!(p("1111"), p(".1..").fill(Bit::One));
        assert_eq!(p(".1.."), p(".1..").fill(Bit::X));
    }

    #[test]
    fn concat_and_slice() {
        assert_eq!(p("10.01"), BitPattern::concat(&[p("10"), p(""), p(".01")]).unwrap());
        assert_eq!(p("0."), p("10.01").slice(2, 2).unwrap());
        assert_eq!(p(".1"), p(".1001").slice(3, 2).unwrap());
        assert_eq!(p("01"), p(".1001").slice(0, 2).unwrap());
        assert!(p("10.01").slice(4, 2).is_err());
    }

    #[test]
    fn compose_tiles_exactly() {
        let group = Bitdef::new("group", 6, p("01"));
        let src = Bitdef::new("src", 3, p("110"));
        let dest = Bitdef::new("dest", 0, p("0.1"));

        assert_eq!(
            p("011100.1"),
            Bitdef::compose("inst", 8, &[group.clone(), src.clone(), dest.clone()]).unwrap()
        );

        // too short
        assert!(Bitdef::compose("inst", 8, &[group.clone(), src.clone()]).is_err());
        // too long
        assert!(Bitdef::compose("inst", 5, &[group.clone(), src.clone(), dest.clone()]).is_err());
        // out of order
        assert!(Bitdef::compose("inst", 8, &[src, group, dest]).is_err());
    }

    #[test]
    fn covering() {
        let strings = |start, end| -> Vec<String> {
            BitPattern::covering(start, end, 5)
                .unwrap()
                .iter()
                .map(|p| p.to_string())
                .collect()
        };

        assert_eq!(vec!["0001.", "001..", "01...", "1...."], strings(2, 32));
        assert_eq!(vec!["0011.", "01..."], strings(6, 16));
        assert_eq!(vec!["00101", "0011."], strings(5, 8));
        assert_eq!(vec!["....."], strings(0, 32));
        assert!(strings(4, 4).is_empty());
        assert!(BitPattern::covering(0, 33, 5).is_err());
    }
}
