//! Expansion of address/data templates into a concrete ROM table.
//!
//! Every template's address is expanded over its wildcard positions and
//! each resulting address is written into a slot array covering the
//! whole address space. A slot written twice with different data is a
//! conflict between two definitions.

use std::num::NonZeroU32;

use common::MicroAddress;
use tracing::debug;

use crate::{
    bitdef::Word,
    error::UcodeError,
    template::DataTemplate,
    width::byte_width,
};

pub const MAX_ADDRESS_BITS: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RomData {
    pub address: Word,
    pub data: Word,
}

/// Template that first claimed an address, as index + 1.
type Owner = NonZeroU32;

struct Expansion<'a> {
    templates: &'a [DataTemplate],
    address_bits: usize,
    data_bits: Option<usize>,
    /// concrete data of each template, in insertion order
    words: Vec<Word>,
    slots: Vec<Option<Owner>>,
}

impl<'a> Expansion<'a> {
    fn new(templates: &'a [DataTemplate], address_bits: usize) -> Result<Expansion<'a>, UcodeError> {
        if address_bits > MAX_ADDRESS_BITS {
            return Err(UcodeError::AddressSpaceTooLarge { bits: address_bits });
        }
        if templates.len() >= u32::MAX as usize {
            return Err(UcodeError::Composition {
                name: "rom".to_string(),
                reason: format!("{} templates is too many to expand", templates.len()),
            });
        }

        Ok(Expansion {
            templates,
            address_bits,
            data_bits: None,
            words: Vec::with_capacity(templates.len()),
            slots: vec![None; 1 << address_bits],
        })
    }

    fn run(mut self) -> Result<Self, UcodeError> {
        for index in 0..self.templates.len() {
            self.insert(index)?;
        }
        Ok(self)
    }

    fn data(&self, owner: Owner) -> Word {
        self.words[owner.get() as usize - 1]
    }

    fn insert(&mut self, index: usize) -> Result<(), UcodeError> {
        let template = &self.templates[index];

        if template.address.width() != self.address_bits {
            return Err(UcodeError::WidthMismatch {
                source_name: template.source.clone(),
                field: "address",
                expected: self.address_bits,
                actual: template.address.width(),
            });
        }

        let data = template.data.as_word().ok_or_else(|| UcodeError::UnresolvedData {
            source_name: template.source.clone(),
            data: template.data,
        })?;

        let data_bits = *self.data_bits.get_or_insert(data.width());
        if data.width() != data_bits {
            return Err(UcodeError::WidthMismatch {
                source_name: template.source.clone(),
                field: "data",
                expected: data_bits,
                actual: data.width(),
            });
        }

        self.words.push(data);
        let owner = Owner::new(self.words.len() as u32).ok_or_else(|| UcodeError::Composition {
            name: template.source.clone(),
            reason: "template index overflowed".to_string(),
        })?;

        for address in template.address.expand() {
            let value = address.value() as usize;
            match self.slots[value] {
                None => self.slots[value] = Some(owner),
                Some(existing) if self.data(existing) == data => {}
                Some(existing) => {
                    let first = &self.templates[existing.get() as usize - 1];
                    return Err(UcodeError::AddressConflict {
                        address,
                        first_data: self.data(existing),
                        first_source: first.source.clone(),
                        second_data: data,
                        second_source: template.source.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn word(&self, value: usize) -> Result<Word, UcodeError> {
        Word::new(value as u64, self.address_bits)
    }

    fn assigned(&self) -> Result<Vec<RomData>, UcodeError> {
        let mut entries = Vec::new();
        for (value, slot) in self.slots.iter().enumerate() {
            if let Some(owner) = slot {
                entries.push(RomData {
                    address: self.word(value)?,
                    data: self.data(*owner),
                });
            }
        }
        Ok(entries)
    }

    fn missing(&self) -> Result<Vec<Word>, UcodeError> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(value, _)| self.word(value))
            .collect()
    }
}

/// Expands `templates` into the addresses they assign, ascending. Does
/// not require the address space to be fully covered.
pub fn collapse(templates: &[DataTemplate]) -> Result<Vec<RomData>, UcodeError> {
    let address_bits = match templates.first() {
        Some(t) => t.address.width(),
        None => return Ok(Vec::new()),
    };
    Expansion::new(templates, address_bits)?.run()?.assigned()
}

/// Expands `templates` into a ROM that assigns every one of the
/// `2^address_bits` addresses exactly once.
pub fn build_rom(templates: &[DataTemplate], address_bits: usize) -> Result<Rom, UcodeError> {
    let expansion = Expansion::new(templates, address_bits)?.run()?;

    let missing = expansion.missing()?;
    if !missing.is_empty() {
        return Err(UcodeError::IncompleteCoverage { missing });
    }

    let entries = expansion.assigned()?;
    let data_bits = expansion.data_bits.unwrap_or(0);
    debug!(templates = templates.len(), entries = entries.len(), "expanded rom");

    Ok(Rom {
        address_bits,
        data_bits,
        entries,
    })
}

/// A total address to data table, ordered by address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    address_bits: usize,
    data_bits: usize,
    entries: Vec<RomData>,
}

impl Rom {
    pub fn address_bits(&self) -> usize {
        self.address_bits
    }

    pub fn data_bits(&self) -> usize {
        self.data_bits
    }

    pub fn entries(&self) -> &[RomData] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, address: u64) -> Option<Word> {
        // total and sorted, so the address is the index
        self.entries.get(address as usize).map(|e| e.data)
    }

    pub fn lookup(&self, address: &MicroAddress) -> Result<Option<Word>, UcodeError> {
        let index = address
            .to_index()
            .map_err(|e| UcodeError::Packing(format!("{:?}", e)))?;
        Ok(self.get(index as u64))
    }

    /// The data words as bytes, one byte per address. Only valid for
    /// ROMs with 8-bit data.
    pub fn bytes(&self) -> Result<Vec<u8>, UcodeError> {
        if byte_width(self.data_bits)? != 1 {
            return Err(UcodeError::InvalidWidth { bits: self.data_bits });
        }
        Ok(self.entries.iter().map(|e| e.data.value() as u8).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(address: &str, data: &str) -> DataTemplate {
        DataTemplate::new(address.parse().unwrap(), data.parse().unwrap(), format!("{} -> {}", address, data))
    }

    fn r(address: &str, data: &str) -> RomData {
        RomData {
            address: address.parse().unwrap(),
            data: data.parse().unwrap(),
        }
    }

    #[test]
    fn collapse_reference_cases() {
        assert_eq!(vec![r("000", "00"), r("001", "00")], collapse(&[t("00.", "00")]).unwrap());
        assert_eq!(vec![r("0", "10"), r("1", "10")], collapse(&[t(".", "10")]).unwrap());
        assert_eq!(vec![r("0", "10")], collapse(&[t("0", "10")]).unwrap());
        assert_eq!(
            vec![r("010", "0"), r("011", "0"), r("100", "1"), r("101", "1")],
            collapse(&[t("01.", "0"), t("10.", "1")]).unwrap()
        );
        assert_eq!(
            vec![
                r("000", "0"),
                r("001", "0"),
                r("010", "0"),
                r("011", "0"),
                r("110", "1"),
                r("111", "1"),
            ],
            collapse(&[t("0..", "0"), t("11.", "1")]).unwrap()
        );
        assert_eq!(Vec::<RomData>::new(), collapse(&[]).unwrap());
    }

    #[test]
    fn agreeing_overlap_is_idempotent() {
        assert_eq!(
            vec![r("00", "1"), r("01", "1"), r("11", "1")],
            collapse(&[t("0.", "1"), t(".1", "1"), t("01", "1")]).unwrap()
        );
    }

    #[test]
    fn disagreeing_overlap_conflicts() {
        let err = collapse(&[t("0..", "0"), t("1..", "1"), t(".11", "0")]).unwrap_err();
        assert_eq!(
            UcodeError::AddressConflict {
                address: "111".parse().unwrap(),
                first_data: "1".parse().unwrap(),
                first_source: "1.. -> 1".to_string(),
                second_data: "0".parse().unwrap(),
                second_source: ".11 -> 0".to_string(),
            },
            err
        );
        assert!(err.to_string().contains("111"));
    }

    #[test]
    fn rejects_inconsistent_templates() {
        assert!(matches!(
            collapse(&[t("0.", "1"), t("1", "1")]),
            Err(UcodeError::WidthMismatch { field: "address", .. })
        ));
        assert!(matches!(
            collapse(&[t("0.", "1"), t("1.", "10")]),
            Err(UcodeError::WidthMismatch { field: "data", .. })
        ));
        assert!(matches!(
            collapse(&[t("0.", "1.")]),
            Err(UcodeError::UnresolvedData { .. })
        ));
        assert_eq!(
            Err(UcodeError::AddressSpaceTooLarge { bits: 25 }),
            collapse(&[t(&".".repeat(25), "1")])
        );
    }

    #[test]
    fn build_requires_totality() {
        let rom = build_rom(&[t("0..", "0"), t("1..", "1")], 3).unwrap();
        assert_eq!(8, rom.len());
        assert_eq!(1, rom.data_bits());
        assert_eq!(Some("1".parse().unwrap()), rom.get(0b101));
        assert_eq!(None, rom.get(8));

        let err = build_rom(&[t("0..", "0"), t("11.", "1")], 3).unwrap_err();
        assert_eq!(
            UcodeError::IncompleteCoverage {
                missing: vec!["100".parse().unwrap(), "101".parse().unwrap()]
            },
            err
        );
        assert_eq!("2 addresses have no data, starting with 100", err.to_string());
    }

    #[test]
    fn wildcard_expansion_counts() {
        let template = t("1.0..1.", "01");
        let entries = collapse(&[template.clone()]).unwrap();
        assert_eq!(1 << template.address.wildcard_count(), entries.len());
        for entry in &entries {
            assert!(template.address.matches(entry.address.value()));
            assert_eq!(template.data.as_word(), Some(entry.data));
        }
        assert!(entries.windows(2).all(|w| w[0].address < w[1].address));
    }

    #[test]
    fn slots_stay_small() {
        // 2^24 slots must stay well under a gigabyte
        assert_eq!(4, std::mem::size_of::<Option<Owner>>());

        let wide = collapse(&[t(&".".repeat(MAX_ADDRESS_BITS - 4), "1"), t(&"1".repeat(MAX_ADDRESS_BITS - 4), "1")]);
        assert_eq!(1 << (MAX_ADDRESS_BITS - 4), wide.unwrap().len());
    }

    #[test]
    fn rom_bytes() {
        let rom = build_rom(&[t("0", "00001111"), t("1", "11110000")], 1).unwrap();
        assert_eq!(vec![0x0F, 0xF0], rom.bytes().unwrap());

        let narrow = build_rom(&[t(".", "1")], 1).unwrap();
        assert!(narrow.bytes().is_err());
    }
}
