//! Commit objects

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use super::id::ObjectId;
use crate::error::{Error, Result};

/// Identity plus timestamp, as found on `author` and `committer` lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: DateTime<FixedOffset>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when,
        }
    }

    /// Signature stamped with the current time in UTC
    pub fn now_utc(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(name, email, Utc::now().fixed_offset())
    }

    /// `Name <email> 1700000000 +0000`
    pub fn to_line(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.when.timestamp(),
            self.when.format("%z")
        )
    }

    pub fn parse(line: &str) -> Result<Self> {
        let bad = || Error::MalformedCommit(format!("invalid signature: {:?}", line));

        let open = line.find('<').ok_or_else(bad)?;
        let close = line[open..].find('>').map(|i| open + i).ok_or_else(bad)?;
        let name = line[..open].trim_end().to_string();
        let email = line[open + 1..close].to_string();

        let mut rest = line[close + 1..].split_whitespace();
        let seconds: i64 = rest.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
        let offset = rest.next().and_then(parse_offset).ok_or_else(bad)?;
        let when = offset.timestamp_opt(seconds, 0).single().ok_or_else(bad)?;

        Ok(Self { name, email, when })
    }
}

/// `+HHMM` / `-HHMM`
fn parse_offset(s: &str) -> Option<FixedOffset> {
    if s.len() != 5 || !s[1..].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = s[1..3].parse().ok()?;
    let minutes: i32 = s[3..5].parse().ok()?;
    let seconds = hours * 3600 + minutes * 60;
    match &s[..1] {
        "+" => FixedOffset::east_opt(seconds),
        "-" => FixedOffset::west_opt(seconds),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    pub parent: Option<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Commit {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("tree {}\n", self.tree);
        if let Some(parent) = &self.parent {
            out.push_str(&format!("parent {}\n", parent));
        }
        out.push_str(&format!("author {}\n", self.author.to_line()));
        out.push_str(&format!("committer {}\n", self.committer.to_line()));
        out.push('\n');
        out.push_str(&self.message);
        out.push('\n');
        out.into_bytes()
    }

    /// Parse a commit payload.
    ///
    /// Only the first parent is kept. Headers other than tree/parent/author/
    /// committer (e.g. `gpgsig` and its continuation lines) are skipped. The
    /// single trailing newline written by [`Commit::encode`] is stripped from
    /// the message.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::MalformedCommit("commit is not valid UTF-8".into()))?;
        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::MalformedCommit("missing blank line before message".into()))?;

        let mut tree = None;
        let mut parent = None;
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "tree" => tree = Some(ObjectId::from_hex(value)?),
                "parent" if parent.is_none() => parent = Some(ObjectId::from_hex(value)?),
                "author" => author = Some(Signature::parse(value)?),
                "committer" => committer = Some(Signature::parse(value)?),
                _ => {}
            }
        }

        let missing = |field: &str| Error::MalformedCommit(format!("missing {} header", field));
        Ok(Self {
            tree: tree.ok_or_else(|| missing("tree"))?,
            parent,
            author: author.ok_or_else(|| missing("author"))?,
            committer: committer.ok_or_else(|| missing("committer"))?,
            message: message.strip_suffix('\n').unwrap_or(message).to_string(),
        })
    }
}
