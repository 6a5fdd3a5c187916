//! Request parsing.
//!
//! # Responsibilities
//! - Split the bytes of one read into request line, headers and body
//! - Never fail: malformed input yields empty fields for the handler to judge
//!
//! # Design Decisions
//! - Lines end at `\n`; a trailing `\r` is stripped
//! - Header lines without `": "` are skipped
//! - Duplicate header names: last value wins
//! - The body is the raw remainder after the first blank line, untouched

use std::collections::HashMap;

/// A parsed request, scoped to one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Parse raw request bytes.
    pub fn parse(raw: &[u8]) -> Self {
        let mut request = HttpRequest::default();
        let mut lines = Lines::new(raw);

        if let Some(line) = lines.next() {
            let line = String::from_utf8_lossy(line);
            let mut tokens = line.split_whitespace();
            request.method = tokens.next().unwrap_or_default().to_string();
            request.path = tokens.next().unwrap_or_default().to_string();
            request.version = tokens.next().unwrap_or_default().to_string();
        }

        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            let line = String::from_utf8_lossy(line);
            if let Some((name, value)) = line.split_once(": ") {
                request.headers.insert(name.to_string(), value.to_string());
            }
        }

        request.body = lines.rest().to_vec();
        request
    }

    /// Look up a header by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// True when the request line lacked a method or a path.
    pub fn is_malformed(&self) -> bool {
        self.method.is_empty() || self.path.is_empty()
    }
}

/// Splits a byte buffer into `\n`-terminated lines with `\r` trimmed,
/// remembering where the unconsumed remainder starts.
struct Lines<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }

        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;

        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}
