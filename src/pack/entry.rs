//! Pack stream framing: the 12-byte header and per-entry type/size prefixes

use std::io::{ErrorKind, Read};

use crate::error::{Error, Result};

pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    pub version: u32,
    pub count: u32,
}

impl PackHeader {
    pub fn parse(bytes: &[u8; PACK_HEADER_LEN]) -> Result<Self> {
        if &bytes[..4] != PACK_SIGNATURE {
            return Err(Error::InvalidPackHeader(format!(
                "bad signature {:?}",
                String::from_utf8_lossy(&bytes[..4])
            )));
        }

        let version = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != 2 && version != 3 {
            return Err(Error::InvalidPackHeader(format!(
                "unsupported version {}",
                version
            )));
        }

        let count = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        Ok(Self { version, count })
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; PACK_HEADER_LEN];
        reader.read_exact(&mut bytes).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                Error::InvalidPackHeader("stream shorter than 12 bytes".into())
            }
            _ => Error::Io(e),
        })?;
        Self::parse(&bytes)
    }

    #[cfg(test)]
    pub fn to_bytes(&self) -> [u8; PACK_HEADER_LEN] {
        let mut bytes = [0u8; PACK_HEADER_LEN];
        bytes[..4].copy_from_slice(PACK_SIGNATURE);
        bytes[4..8].copy_from_slice(&self.version.to_be_bytes());
        bytes[8..].copy_from_slice(&self.count.to_be_bytes());
        bytes
    }
}

/// Type code and inflated size that prefix every pack entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub type_code: u8,
    pub size: u64,
}

impl EntryHeader {
    /// Decode `1TTTSSSS 1SSSSSSS ... 0SSSSSSS`: bits 4-6 of the first byte are
    /// the type, the size is little-endian base-128 with only 4 bits in the
    /// first byte.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut byte = read_byte(reader)?;
        let type_code = (byte >> 4) & 0x07;
        let mut size = u64::from(byte & 0x0f);
        let mut shift = 4u32;

        while byte & 0x80 != 0 {
            byte = read_byte(reader)?;
            if shift > 57 {
                return Err(Error::MalformedObject(
                    "pack entry size does not fit in 64 bits".into(),
                ));
            }
            size |= u64::from(byte & 0x7f) << shift;
            shift += 7;
        }

        Ok(Self { type_code, size })
    }

    #[cfg(test)]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut size = self.size;
        let mut byte = ((self.type_code & 0x07) << 4) | (size & 0x0f) as u8;
        size >>= 4;
        let mut out = Vec::new();
        while size != 0 {
            out.push(byte | 0x80);
            byte = (size & 0x7f) as u8;
            size >>= 7;
        }
        out.push(byte);
        out
    }
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            Error::TruncatedPackEntry("stream ended inside an entry header".into())
        }
        _ => Error::Io(e),
    })?;
    Ok(buf[0])
}
