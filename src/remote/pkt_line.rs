//! pkt-line framing: four hex digits of length (header included), then data

use std::io::{ErrorKind, Read};

use crate::error::{Error, Result};

pub const FLUSH_PKT: &[u8] = b"0000";

const MAX_PKT_LEN: usize = 65520;

/// Frame `payload` as one pkt-line
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = format!("{:04x}", payload.len() + 4).into_bytes();
    out.extend_from_slice(payload);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    Data(Vec<u8>),
    Flush,
}

/// Reads pkt-lines without reading past the end of the current line, so the
/// underlying reader can be handed on afterwards.
pub struct PktLineReader<R> {
    inner: R,
}

impl<R: Read> PktLineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Next pkt-line, or `None` at a clean end of stream
    pub fn read_line(&mut self) -> Result<Option<PktLine>> {
        let mut header = [0u8; 4];
        let mut filled = 0;
        while filled < header.len() {
            match self.inner.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(Error::Protocol(
                        "stream ended inside a pkt-line header".into(),
                    ))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let len = std::str::from_utf8(&header)
            .ok()
            .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|s| usize::from_str_radix(s, 16).ok())
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "invalid pkt-line length {:?}",
                    String::from_utf8_lossy(&header)
                ))
            })?;

        match len {
            0 => Ok(Some(PktLine::Flush)),
            1..=3 => Err(Error::Protocol(format!("unexpected pkt-line length {}", len))),
            _ if len > MAX_PKT_LEN => {
                Err(Error::Protocol(format!("pkt-line length {} too large", len)))
            }
            _ => {
                let mut data = vec![0u8; len - 4];
                self.inner.read_exact(&mut data).map_err(|e| match e.kind() {
                    ErrorKind::UnexpectedEof => {
                        Error::Protocol("stream ended inside a pkt-line".into())
                    }
                    _ => Error::Io(e),
                })?;
                Ok(Some(PktLine::Data(data)))
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
