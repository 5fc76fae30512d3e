//! Remote archive transport
//!
//! A remote archive lives at `<base_url><revision>.<ext>`. Opening one
//! issues the GET and holds the response body until it is either copied
//! into storage or dropped.

use crate::error::{RevcacheError, RevcacheResult};
use std::fs::File;
use std::io::{self, Read};
use std::time::Duration;
use tracing::debug;
use ureq::http::header::CONTENT_LENGTH;

/// An open response body
pub struct RemoteStream {
    pub reader: Box<dyn Read + Send>,
    /// Advertised size, when the server sent one
    pub content_length: Option<u64>,
}

impl std::fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Opens streaming connections to remote archives
pub trait Transport: Send + Sync {
    /// Open `url`. A missing archive is [`RevcacheError::NotFound`]; any
    /// other failure is [`RevcacheError::Transport`].
    fn open(&self, url: &str) -> RevcacheResult<RemoteStream>;
}

/// Normalize a base URL so archive file names can be appended directly
pub fn normalize_base_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

/// HTTP(S) transport over `ureq`, with `file://` support for mirrors on disk
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(30)))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn open_file(url: &str, path: &str) -> RevcacheResult<RemoteStream> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RevcacheError::NotFound(url.to_string()),
            _ => RevcacheError::transport(url, e),
        })?;
        let content_length = file.metadata().ok().map(|m| m.len());
        Ok(RemoteStream {
            reader: Box::new(file),
            content_length,
        })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> RevcacheResult<RemoteStream> {
        if let Some(path) = url.strip_prefix("file://") {
            return Self::open_file(url, path);
        }

        debug!("GET {}", url);
        let response = self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::StatusCode(404) | ureq::Error::StatusCode(410) => {
                RevcacheError::NotFound(url.to_string())
            }
            ureq::Error::StatusCode(code) => {
                RevcacheError::transport(url, format!("server returned status {code}"))
            }
            other => RevcacheError::transport(url, other),
        })?;

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        Ok(RemoteStream {
            reader: Box::new(response.into_body().into_reader()),
            content_length,
        })
    }
}
