//! Response representation and wire encoding.
//!
//! # Design Decisions
//! - Wire format is `<version> <code> <reason>\r\n[headers]\r\n<body>`
//! - No headers are added automatically (no Content-Length, no Content-Type);
//!   the connection close delimits the body

/// Status line code and reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode {
    code: u16,
    reason: &'static str,
}

impl StatusCode {
    pub const OK: StatusCode = StatusCode::new(200, "OK");
    pub const BAD_REQUEST: StatusCode = StatusCode::new(400, "Bad Request");
    pub const NOT_FOUND: StatusCode = StatusCode::new(404, "Not Found");
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode::new(405, "Method Not Allowed");
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode::new(500, "Internal Server Error");

    pub const fn new(code: u16, reason: &'static str) -> Self {
        Self { code, reason }
    }

    pub fn as_u16(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// One response, written in a single call and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub version: String,
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub const DEFAULT_VERSION: &'static str = "HTTP/1.1";

    /// Response with the given status and body and no headers.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            version: Self::DEFAULT_VERSION.to_string(),
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Serialize into the bytes sent on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(
            format!("{} {} {}\r\n", self.version, self.status.code, self.status.reason).as_bytes(),
        );
        for (name, value) in &self.headers {
            out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}
