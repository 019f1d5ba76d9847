use crate::error::UcodeError;

/// Whole bytes in a `bits` wide field, rejecting partial bytes.
pub fn byte_width(bits: usize) -> Result<usize, UcodeError> {
    if bits % 8 != 0 {
        return Err(UcodeError::InvalidWidth { bits });
    }
    Ok(bits / 8)
}

/// Bytes needed to hold `bits`, rounding a partial byte up.
pub fn num_bytes(bits: usize) -> usize {
    (bits + 7) / 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitdef::BitPattern;

    fn bits(s: &str) -> usize {
        s.parse::<BitPattern>().unwrap().width()
    }

    #[test]
    fn whole_bytes() {
        assert_eq!(Ok(1), byte_width(bits("01001111")));
        assert_eq!(Ok(3), byte_width(24));
        assert_eq!(Ok(4), byte_width(bits("00000000111111110000000011111111")));
        assert_eq!(Ok(0), byte_width(0));
        assert_eq!(Err(UcodeError::InvalidWidth { bits: 9 }), byte_width(bits("010011110")));
        assert_eq!(Err(UcodeError::InvalidWidth { bits: 3 }), byte_width(3));
    }

    #[test]
    fn rounded_bytes() {
        assert_eq!(1, num_bytes(bits("010")));
        assert_eq!(1, num_bytes(bits("01001111")));
        assert_eq!(2, num_bytes(bits("010011110")));
        assert_eq!(4, num_bytes(bits("00000000111111110000000011111111")));
    }
}
