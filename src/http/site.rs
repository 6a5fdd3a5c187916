//! Default handler serving a small table of static pages.
//!
//! # Responsibilities
//! - Route by method: GET serves pages, POST acknowledges, others get 405
//! - Map request paths to page names and fetch bytes from a content source
//! - Answer malformed requests with 400
//!
//! # Design Decisions
//! - Content is read on every request; no caching
//! - Page names never come from the request, only from the configured table,
//!   so a request path cannot reach arbitrary files

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use crate::config::SiteConfig;
use crate::http::handler::RequestHandler;
use crate::http::request::HttpRequest;
use crate::http::response::{HttpResponse, StatusCode};

pub const NOT_FOUND_BODY: &str = "<h1>The page you are looking for does not exist</h1>";
pub const POST_RECEIVED_BODY: &str = "<h1>POST request received</h1>";
pub const METHOD_NOT_ALLOWED_BODY: &str = "<h1>405 Method Not Allowed</h1>";
pub const BAD_REQUEST_BODY: &str = "<h1>400 Bad Request</h1>";

/// Source of page bytes.
pub trait StaticContent: Send + Sync + 'static {
    /// Bytes for `name`, or `None` when it does not exist.
    fn load(&self, name: &str) -> Option<Vec<u8>>;
}

/// Pages read from files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryContent {
    root: PathBuf,
}

impl DirectoryContent {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StaticContent for DirectoryContent {
    fn load(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.root.join(name);
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read page");
                None
            }
        }
    }
}

/// Pages held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    pages: HashMap<String, Vec<u8>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, name: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(name.into(), body.into());
        self
    }
}

impl StaticContent for MemoryContent {
    fn load(&self, name: &str) -> Option<Vec<u8>> {
        self.pages.get(name).cloned()
    }
}

/// Serves the configured page table from a content source.
#[derive(Debug, Clone)]
pub struct SiteHandler<C> {
    pages: BTreeMap<String, String>,
    content: C,
}

impl SiteHandler<DirectoryContent> {
    /// Build a handler reading pages from `config.root`.
    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(config.pages.clone(), DirectoryContent::new(&config.root))
    }
}

impl<C: StaticContent> SiteHandler<C> {
    pub fn new(pages: BTreeMap<String, String>, content: C) -> Self {
        Self { pages, content }
    }

    fn get(&self, path: &str) -> HttpResponse {
        self.pages
            .get(path)
            .and_then(|name| self.content.load(name))
            .map(HttpResponse::ok)
            .unwrap_or_else(|| HttpResponse::new(StatusCode::NOT_FOUND, NOT_FOUND_BODY))
    }
}

impl<C: StaticContent> RequestHandler for SiteHandler<C> {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        if request.is_malformed() {
            return HttpResponse::new(StatusCode::BAD_REQUEST, BAD_REQUEST_BODY);
        }

        match request.method.as_str() {
            "GET" => {
                tracing::info!(path = %request.path, "Received GET request");
                self.get(&request.path)
            }
            "POST" => {
                tracing::info!(path = %request.path, body_len = request.body.len(), "Received POST request");
                HttpResponse::ok(POST_RECEIVED_BODY)
            }
            _ => HttpResponse::new(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_BODY),
        }
    }
}
