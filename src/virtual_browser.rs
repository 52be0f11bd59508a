//! Drive an `App` in-process, without a socket, for tests and tools.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Result, Context};
use rouille::Request;

use crate::language::Language;
use crate::rouille_runner::{App, handle_request};

#[derive(Debug)]
pub struct BrowserResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl BrowserResponse {
    /// Case-insensitive, first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.body.contains(text)
    }
}

pub struct VirtualBrowser<L: Language> {
    app: Arc<App<L>>,
    headers: Vec<(String, String)>,
}

impl<L: Language> VirtualBrowser<L> {
    pub fn new(app: Arc<App<L>>) -> Self {
        VirtualBrowser { app, headers: Vec::new() }
    }

    /// Chaining. Sent with every request.
    pub fn with_header(mut self, key: &str, val: &str) -> Self {
        self.headers.push((key.into(), val.into()));
        self
    }

    pub fn request(&self, method: &str, url: &str) -> Result<BrowserResponse> {
        let request = Request::fake_http(method, url, self.headers.clone(), vec![]);
        let response = handle_request(&self.app, &request);
        let headers = response.headers.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let (mut reader, _) = response.data.into_reader_and_size();
        let mut body = String::new();
        reader.read_to_string(&mut body).with_context(
            || format!("reading response body for {method} {url}"))?;
        Ok(BrowserResponse { status: response.status_code, headers, body })
    }

    pub fn get(&self, url: &str) -> Result<BrowserResponse> {
        self.request("GET", url)
    }
}
