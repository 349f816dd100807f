//! Unpack a pack stream into loose objects

use std::io::{BufRead, BufReader, Read};

use flate2::bufread::ZlibDecoder;
use indicatif::ProgressBar;

use super::entry::{EntryHeader, PackHeader};
use crate::error::{Error, Result};
use crate::object::{ObjectId, ObjectKind, RawObject};
use crate::storage::ObjectStore;

/// An object written to the store while unpacking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub size: u64,
}

/// Read a pack from `pack_stream` and store every entry in `storage`
///
/// Flow:
/// 1. Validate the 12-byte header and read the object count
/// 2. For each entry, decode the type/size prefix
/// 3. Inflate exactly one zlib frame from the shared reader
/// 4. Frame the payload as a canonical object and store it
///
/// Any failure aborts the unpack. Objects stored before the failure stay in
/// the store; each one is complete and stored under its own hash.
pub fn receive_pack<R: Read, S: ObjectStore>(
    pack_stream: R,
    storage: &S,
    progress: &ProgressBar,
) -> Result<Vec<PackedObject>> {
    let mut reader = BufReader::new(pack_stream);

    let header = PackHeader::read(&mut reader)?;
    tracing::info!(
        "unpacking {} objects (pack version {})",
        header.count,
        header.version
    );
    progress.set_length(u64::from(header.count));

    let mut objects = Vec::with_capacity(header.count.min(4096) as usize);
    for index in 0..header.count {
        let entry = EntryHeader::read(&mut reader)?;
        let kind = ObjectKind::from_pack_code(entry.type_code)?;
        let data = inflate_entry(&mut reader, index, entry.size)?;

        let id = storage.put_object(&RawObject::new(kind, data))?;
        tracing::debug!("entry {}: {} {} ({} bytes)", index, kind, id, entry.size);

        objects.push(PackedObject {
            id,
            kind,
            size: entry.size,
        });
        progress.inc(1);
    }

    // The trailing checksum is left unverified.
    let mut trailer = Vec::new();
    reader.read_to_end(&mut trailer)?;
    tracing::debug!("{} bytes after the last entry", trailer.len());

    progress.finish_and_clear();
    tracing::info!("unpacked {} objects", objects.len());
    Ok(objects)
}

/// Inflate one entry's zlib frame, leaving `reader` at the next entry.
///
/// The frame carries no length; the decoder stops at its own end-of-stream
/// marker and a `bufread` decoder only consumes what it has inflated. At most
/// `size` bytes are buffered, plus one byte to confirm the frame ends there.
fn inflate_entry<R: BufRead>(reader: &mut R, index: u32, size: u64) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(size.min(1 << 20) as usize);

    let result = {
        let mut decoder = ZlibDecoder::new(&mut *reader);
        let inflated = (&mut decoder).take(size).read_to_end(&mut data);
        inflated.and_then(|_| decoder.read(&mut [0u8; 1]))
    };

    match result {
        Ok(0) => {}
        Ok(_) => {
            return Err(Error::MalformedObject(format!(
                "pack entry {} inflates past its declared {} bytes",
                index, size
            )));
        }
        Err(e) => {
            if reader.fill_buf()?.is_empty() {
                return Err(Error::TruncatedPackEntry(format!(
                    "entry {} ends after {} of {} bytes",
                    index,
                    data.len(),
                    size
                )));
            }
            return Err(Error::CorruptObject {
                id: format!("pack entry {}", index),
                reason: e.to_string(),
            });
        }
    }

    if (data.len() as u64) < size {
        return Err(Error::TruncatedPackEntry(format!(
            "entry {} declared {} bytes but inflated to {}",
            index,
            size,
            data.len()
        )));
    }

    Ok(data)
}
