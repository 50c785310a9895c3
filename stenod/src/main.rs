//! stenod: the steno translation daemon.
//!
//! Reads chords from a steno machine on a serial line, translates them
//! through the loaded dictionaries, and types the result.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};

use steno_core::dict::{json, Dictionary};
use steno_core::input::{ChordSource, SourceError};
use steno_core::Engine;
use stenura::StenuraMachine;

mod gemini;
mod term;

#[derive(Parser)]
#[command(name = "stenod")]
#[command(about = "Translate steno machine chords into typed text")]
struct Cli {
    /// The serial device the machine is on.
    #[arg(long, default_value = "/dev/ttyS0")]
    device: String,

    /// The protocol the machine speaks.
    #[arg(long, value_enum, default_value_t = Protocol::Stenura)]
    protocol: Protocol,

    /// Dictionary files, later ones winning on duplicate entries.
    #[arg(long = "dict", required = true)]
    dicts: Vec<PathBuf>,

    /// Baud rate for Gemini PR machines.  Stenura is fixed at 9600.
    #[arg(long, default_value_t = gemini::BAUD_RATE)]
    baud: u32,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Protocol {
    Stenura,
    Gemini,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut dict = Dictionary::new();
    for path in &cli.dicts {
        let count = json::load_file(&mut dict, path)?;
        info!("{}: {} entries", path.display(), count);
    }

    let mut source: Box<dyn ChordSource> = match cli.protocol {
        Protocol::Stenura => Box::new(StenuraMachine::open(&cli.device)?),
        Protocol::Gemini => Box::new(gemini::GeminiMachine::open(&cli.device, cli.baud)?),
    };

    let mut engine = Engine::new(dict);
    let mut sink = term::TermSink::new();

    loop {
        let chord = match source.read() {
            Ok(chord) => chord,
            Err(SourceError::Closed) => break,
            Err(e) => return Err(e.into()),
        };
        debug!("stroke: {}", chord.paper());
        engine.stroke(chord);
        engine.flush(&mut sink)?;
    }

    info!("chord source closed, exiting");
    Ok(())
}
