use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::state::SimState;

/// Appends one JSON document per checkpoint, newline-delimited, so a crashed
/// run still leaves every checkpoint before the crash readable.
pub struct CheckpointWriter {
    out: BufWriter<File>,
}

impl CheckpointWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(CheckpointWriter {
            out: BufWriter::new(File::create(path)?),
        })
    }

    pub fn write(&mut self, state: &SimState) -> std::io::Result<()> {
        debug!("writing checkpoint at step {}", state.step);
        serde_json::to_writer(&mut self.out, state)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Reads the last checkpoint in a file written by `CheckpointWriter`. The
/// occupancy table is not persisted, so it is rebuilt from the particle modes
/// before the state is handed back.
pub fn read_latest<P: AsRef<Path>>(path: P) -> Result<SimState, Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut last = None;
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            last = Some(line);
        }
    }
    let line = last.ok_or("checkpoint file is empty")?;
    let mut state: SimState = serde_json::from_str(&line)?;
    state.rebuild_occupancy();
    Ok(state)
}
