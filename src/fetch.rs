//! Fetch abstraction over HTTP.
//!
//! The pipeline never talks to the network directly; everything goes
//! through [`Fetcher`] so tests can run against an in-memory map of
//! canned responses.

use std::io::Read;

use url::Url;

use crate::error::{Error, Result};

/// Fetches the bytes behind a URL. One attempt, no retry policy.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// [`Fetcher`] backed by a blocking [`ureq`] agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .user_agent(concat!("bookmirror/", env!("CARGO_PKG_VERSION")))
                .build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.agent.get(url.as_str()).call().map_err(|err| Error::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|err| Error::Fetch {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        Ok(bytes)
    }
}
