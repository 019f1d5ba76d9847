use std::io::{BufRead, BufReader, Read, Write};

use thiserror::Error;

const ENTRIES_PER_LINE: usize = 16;
const MIN_RUN: usize = 4;

#[derive(Debug, Error)]
pub enum HexFileError {
    #[error("expected header 'v2.0 raw' but found '{found}'")]
    BadHeader { found: String },
    #[error("line {line}: bad entry '{entry}'")]
    BadEntry { line: usize, entry: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HexFileLine {
    Data(Vec<HexFileData>),
    Comment(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HexFileData {
    Byte(u8),
    Run(u32, u8),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HexFile {
    pub lines: Vec<HexFileLine>,
}

impl HexFile {
    pub const fn header() -> &'static str {
        "v2.0 raw"
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for line in &self.lines {
            match line {
                HexFileLine::Comment(_) => {}
                HexFileLine::Data(data) => {
                    for data in data {
                        match data {
                            HexFileData::Byte(b) => bytes.push(*b),
                            HexFileData::Run(count, b) => {
                                bytes.extend(std::iter::repeat(*b).take(*count as usize));
                            }
                        }
                    }
                }
            }
        }

        bytes
    }

    pub fn push_comment<S: Into<String>>(&mut self, comment: S) {
        self.lines.push(HexFileLine::Comment(comment.into()));
    }

    /// Appends `bytes`, folding runs of identical bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let mut entries = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            let run = bytes[i..].iter().take_while(|x| **x == b).count();
            if run >= MIN_RUN {
                entries.push(HexFileData::Run(run as u32, b));
            } else {
                entries.extend(std::iter::repeat(HexFileData::Byte(b)).take(run));
            }
            i += run;
        }

        for chunk in entries.chunks(ENTRIES_PER_LINE) {
            self.lines.push(HexFileLine::Data(chunk.to_vec()));
        }
    }

    pub fn read<R: Read>(r: R) -> Result<HexFile, HexFileError> {
        let file = BufReader::new(r);
        let mut lines = file.lines();

        let header = lines.next().transpose()?.unwrap_or_default();
        if header.trim() != HexFile::header() {
            return Err(HexFileError::BadHeader { found: header });
        }

        let mut parsed = Vec::new();

        for (index, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim();
            let line_number = index + 2;

            if let Some(comment) = line.strip_prefix('#') {
                parsed.push(HexFileLine::Comment(comment.to_string()));
                continue;
            }

            let mut data = Vec::new();

            for block in line.split_whitespace() {
                let bad_entry = || HexFileError::BadEntry {
                    line: line_number,
                    entry: block.to_string(),
                };

                data.push(match block.split_once('*') {
                    Some((count, value)) => HexFileData::Run(
                        count.parse().map_err(|_| bad_entry())?,
                        u8::from_str_radix(value, 16).map_err(|_| bad_entry())?,
                    ),
                    None => HexFileData::Byte(u8::from_str_radix(block, 16).map_err(|_| bad_entry())?),
                });
            }

            if !data.is_empty() {
                parsed.push(HexFileLine::Data(data));
            }
        }

        Ok(HexFile { lines: parsed })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "{}", HexFile::header())?;
        for line in &self.lines {
            match line {
                HexFileLine::Comment(comment) => writeln!(w, "#{}", comment)?,
                HexFileLine::Data(data) => {
                    let entries: Vec<String> = data
                        .iter()
                        .map(|d| match d {
                            HexFileData::Byte(b) => format!("{:02x}", b),
                            HexFileData::Run(count, b) => format!("{}*{:02x}", count, b),
                        })
                        .collect();
                    writeln!(w, "{}", entries.join(" "))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn folds_runs() {
        let mut file = HexFile::default();
        file.push_bytes(&[1, 2, 2, 3, 3, 3, 3, 3]);

        assert_eq!(
            vec![HexFileLine::Data(vec![
                HexFileData::Byte(1),
                HexFileData::Byte(2),
                HexFileData::Byte(2),
                HexFileData::Run(5, 3),
            ])],
            file.lines
        );
    }

    #[test]
    fn write_then_read() {
        let mut bytes: Vec<u8> = (0u8..40).collect();
        bytes.extend([0xFF; 100]);

        let mut file = HexFile::default();
        file.push_comment(" instruction 0x00");
        file.push_bytes(&bytes);

        let mut out = Vec::new();
        file.write(&mut out).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("v2.0 raw\n# instruction 0x00\n00 01 02"));
        assert!(text.contains("100*ff"));

        let read = HexFile::read(out.as_slice()).unwrap();
        assert_eq!(bytes, read.bytes());
        assert_eq!(file, read);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            HexFile::read("v3.0 raw\n00".as_bytes()),
            Err(HexFileError::BadHeader { .. })
        ));
        assert!(matches!(
            HexFile::read("v2.0 raw\n00 zz".as_bytes()),
            Err(HexFileError::BadEntry { line: 2, .. })
        ));
    }
}
