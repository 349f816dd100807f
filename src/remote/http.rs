//! Smart HTTP transport (protocol v0): ref discovery and a single-want fetch

use std::collections::BTreeMap;
use std::io::Read;

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use super::pkt_line::{self, PktLine, PktLineReader, FLUSH_PKT};
use crate::error::{Error, Result};
use crate::object::ObjectId;

/// Refs advertised by a remote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefAdvertisement {
    pub refs: BTreeMap<String, ObjectId>,
    /// Target of HEAD when the remote advertises `symref=HEAD:<ref>`
    pub head: Option<String>,
}

impl RefAdvertisement {
    /// Parse an `info/refs` response body
    pub fn parse<R: Read>(body: R) -> Result<Self> {
        let mut reader = PktLineReader::new(body);
        let mut advertisement = Self::default();
        let mut first = true;

        while let Some(line) = reader.read_line()? {
            let data = match line {
                PktLine::Flush => continue,
                PktLine::Data(data) => data,
            };
            if data.starts_with(b"# service=") {
                continue;
            }

            let (line, capabilities) = match data.iter().position(|&b| b == 0) {
                Some(nul) => (&data[..nul], Some(&data[nul + 1..])),
                None => (&data[..], None),
            };
            if first {
                if let Some(capabilities) = capabilities {
                    advertisement.head = head_symref(capabilities);
                }
                first = false;
            }

            let line = std::str::from_utf8(line)
                .map_err(|_| Error::Protocol("ref line is not valid UTF-8".into()))?
                .trim_end_matches('\n');
            let (hex, name) = line
                .split_once(' ')
                .ok_or_else(|| Error::Protocol(format!("invalid ref line {:?}", line)))?;

            // Empty repositories advertise a placeholder; peeled tags end in ^{}
            if name == "capabilities^{}" || name.ends_with("^{}") {
                continue;
            }
            advertisement
                .refs
                .insert(name.to_string(), ObjectId::from_hex(hex)?);
        }

        Ok(advertisement)
    }

    /// Branch to check out: HEAD's target, else `main`, else `master`
    pub fn default_branch(&self) -> Option<(&str, &ObjectId)> {
        let candidates = self
            .head
            .as_deref()
            .into_iter()
            .chain(["refs/heads/main", "refs/heads/master"]);
        for name in candidates {
            if let Some((name, id)) = self.refs.get_key_value(name) {
                return Some((name.as_str(), id));
            }
        }
        None
    }
}

fn head_symref(capabilities: &[u8]) -> Option<String> {
    String::from_utf8_lossy(capabilities)
        .split_whitespace()
        .find_map(|cap| cap.strip_prefix("symref=HEAD:"))
        .map(|target| target.to_string())
}

/// Body of an upload-pack request for one object, without negotiation
pub fn upload_pack_request(want: &ObjectId) -> Vec<u8> {
    let mut body = pkt_line::encode(format!("want {}\n", want).as_bytes());
    body.extend_from_slice(FLUSH_PKT);
    body.extend(pkt_line::encode(b"done\n"));
    body
}

/// Consume the `NAK` line that precedes the pack data
pub fn strip_negotiation<R: Read>(body: R) -> Result<R> {
    let mut reader = PktLineReader::new(body);
    match reader.read_line()? {
        Some(PktLine::Data(data)) if data.starts_with(b"NAK") || data.starts_with(b"ACK") => {
            Ok(reader.into_inner())
        }
        Some(PktLine::Data(data)) if data.starts_with(b"ERR ") => Err(Error::Protocol(
            String::from_utf8_lossy(&data[4..]).trim_end().to_string(),
        )),
        other => Err(Error::Protocol(format!(
            "expected NAK before pack data, got {:?}",
            other
        ))),
    }
}

/// Blocking client for one remote repository URL
pub struct HttpRemote {
    url: String,
    client: Client,
    user_agent: String,
}

impl HttpRemote {
    pub fn new(url: &str, user_agent: &str) -> Result<Self> {
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client: Client::builder().build()?,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn discover_refs(&self) -> Result<RefAdvertisement> {
        let url = format!("{}/info/refs?service=git-upload-pack", self.url);
        tracing::info!("discovering refs at {}", url);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()?
            .error_for_status()?;

        let advertisement = RefAdvertisement::parse(response)?;
        tracing::debug!("remote advertised {} refs", advertisement.refs.len());
        Ok(advertisement)
    }

    /// Request a pack containing `want`; the returned reader starts at `PACK`
    pub fn fetch_pack(&self, want: &ObjectId) -> Result<Response> {
        let url = format!("{}/git-upload-pack", self.url);
        tracing::info!("requesting pack for {} from {}", want, url);

        let response = self
            .client
            .post(&url)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/x-git-upload-pack-request")
            .body(upload_pack_request(want))
            .send()?
            .error_for_status()?;

        strip_negotiation(response)
    }
}
