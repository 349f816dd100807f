use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::io::{Read, Write};

use crate::pack;
use crate::storage::ObjectStore;

/// Handle the unpack-objects command
/// Reads a pack from `input` into loose objects and prints how many were stored
pub fn handle<S: ObjectStore, R: Read, W: Write>(
    storage: &S,
    input: R,
    output: &mut W,
) -> Result<()> {
    let objects = pack::receive_pack(input, storage, &ProgressBar::hidden())
        .context("Failed to unpack objects")?;

    writeln!(output, "Unpacked {} objects", objects.len())?;
    Ok(())
}
