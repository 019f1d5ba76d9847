use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use strum::IntoEnumIterator;
use tracing::info;
use tracing_subscriber::EnvFilter;

use assemble::assemble_lines;
use common::{hexfile::HexFile, ControlLine, Flags, MicroAddress, LAYOUT};
use ucode::{
    instruction_set, microcode::FETCH_STEPS, rom_hash, template::rom_count, ucode, Rom, MAJOR_VERSION, MINOR_VERSION,
    PATCH_VERSION,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Microcode ROM compiler")]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the microcode into one hex file per ROM chip
    Ucode {
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Print the steps of every instruction
        #[arg(short, long)]
        listing: bool,
    },
    /// Compare previously written hex files against a fresh compile
    Check {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Assemble a program and print it as a hex file
    Assemble {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn hex_path(dir: &Path, chip: usize) -> PathBuf {
    dir.join(format!("rom{}.hex", chip))
}

/// The bytes of each ROM chip. The chip index is the top of the address.
fn chips(rom: &Rom) -> Result<Vec<Vec<u8>>> {
    let bytes = rom.bytes()?;
    let per_chip = 1 << LAYOUT.step_address_bits();
    Ok(bytes.chunks(per_chip).map(|c| c.to_vec()).collect())
}

fn control_lines(word: u32) -> String {
    let names: Vec<String> = ControlLine::iter()
        .filter(|line| word & (1 << line.bit()) != 0)
        .map(|line| line.to_string())
        .collect();
    names.join(" ")
}

fn control_word(rom: &Rom, count: usize, instruction: u8, flags: Flags, step: u8) -> Result<u32> {
    let mut word = 0u32;
    for chip in 0..count {
        let address = MicroAddress::new(chip as u8, instruction, flags, step);
        let byte = rom
            .lookup(&address)?
            .with_context(|| format!("no data at {:?}", address))?;
        word |= (byte.value() as u32) << (8 * chip);
    }
    Ok(word)
}

fn print_listing(rom: &Rom) -> Result<()> {
    let count = rom_count(&LAYOUT)?;
    for variant in instruction_set()? {
        let opcode = variant.opcode()?;
        for behaviour in &variant.behaviours {
            println!("# {:02x} {} [{}]", opcode, variant, behaviour.flags);
            for step in 0..FETCH_STEPS + behaviour.steps.len() {
                let word = control_word(rom, count, opcode, behaviour.flags.set, step as u8)?;
                println!("#   {:2}: {:08x} {}", step, word, control_lines(word));
            }
        }
    }
    Ok(())
}

fn write_roms(rom: &Rom, out_dir: &Path) -> Result<()> {
    let hash = rom_hash(rom)?;
    for (chip, bytes) in chips(rom)?.iter().enumerate() {
        let mut hex = HexFile::default();
        hex.push_comment(format!(
            " ucode v{}.{}.{} hash {:08x} chip {}",
            MAJOR_VERSION, MINOR_VERSION, PATCH_VERSION, hash, chip
        ));
        hex.push_bytes(bytes);

        let path = hex_path(out_dir, chip);
        let mut file = BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?);
        hex.write(&mut file)?;
        file.flush()?;
        info!(path = %path.display(), bytes = bytes.len(), "wrote rom");
    }
    Ok(())
}

fn check_roms(rom: &Rom, dir: &Path) -> Result<()> {
    for (chip, expected) in chips(rom)?.iter().enumerate() {
        let path = hex_path(dir, chip);
        let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let actual = HexFile::read(file).with_context(|| format!("reading {}", path.display()))?.bytes();

        if actual.len() != expected.len() {
            bail!("{} has {} bytes but {} were expected", path.display(), actual.len(), expected.len());
        }
        if let Some(address) = actual.iter().zip(expected).position(|(a, e)| a != e) {
            bail!(
                "{} differs at {:#07x}: found {:02x} but expected {:02x}",
                path.display(),
                address,
                actual[address],
                expected[address]
            );
        }
        info!(path = %path.display(), "rom matches");
    }
    println!("ok");
    Ok(())
}

fn assemble_file(input: &Path) -> Result<()> {
    let source = std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let code = assemble_lines(&source)?;

    let mut hex = HexFile::default();
    let mut pc = 0;
    for line in &code {
        hex.push_comment(format!(" {:02x} {}", pc, line.source));
        hex.push_bytes(&line.bytes);
        pc += line.bytes.len();
    }
    hex.write(&mut io::stdout().lock())?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();
    match opts.command {
        Command::Ucode { out_dir, listing } => {
            let rom = ucode()?;
            if listing {
                print_listing(&rom)?;
            }
            write_roms(&rom, &out_dir)?;
        }
        Command::Check { dir } => check_roms(&ucode()?, &dir)?,
        Command::Assemble { input } => assemble_file(&input)?,
    }
    Ok(())
}
