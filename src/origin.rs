//! Remote origins of source images.
//!
//! [`Origin`] is the network boundary: it opens a URL as a byte stream. The
//! sync planner uses it twice: to hash the remote body for comparison, and
//! through [`fetch`] to download it into the canonical-original location.
//!
//! [`HttpOrigin`] is the production implementation, a blocking `reqwest`
//! client. Tests substitute an in-memory origin.
//!
//! ## Atomic downloads
//!
//! [`fetch`] streams the body into a temp file in the destination directory
//! and renames it over the destination only once the body is complete. A
//! failed or interrupted download leaves the previous original untouched and
//! no partial file behind.

use crate::config::HttpConfig;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum OriginError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Something that can open a URL as a byte stream.
pub trait Origin: Sync {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, OriginError>;
}

/// Blocking HTTP(S) origin.
pub struct HttpOrigin {
    client: reqwest::blocking::Client,
}

impl HttpOrigin {
    pub fn new(config: &HttpConfig) -> Result<Self, OriginError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| OriginError::Transport {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl Origin for HttpOrigin {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, OriginError> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_builder() {
                OriginError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            } else {
                OriginError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OriginError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Box::new(response))
    }
}

/// Download `url` to `destination`, replacing any existing file atomically.
///
/// Creates the destination directory if needed. Returns the number of bytes
/// written.
pub fn fetch<O: Origin + ?Sized>(
    origin: &O,
    url: &str,
    destination: &Path,
) -> Result<u64, OriginError> {
    let mut body = origin.open(url)?;

    let dir = destination.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let bytes = io::copy(&mut body, &mut tmp)?;
    tmp.persist(destination).map_err(|e| OriginError::Io(e.error))?;

    info!(url, destination = %destination.display(), bytes, "fetched original");
    Ok(bytes)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::thread;
    use tempfile::TempDir;

    /// In-memory origin. Unknown URLs answer 404.
    #[derive(Default)]
    pub struct MockOrigin {
        bodies: Mutex<HashMap<String, Vec<u8>>>,
        opens: Mutex<Vec<String>>,
        /// Once this many opens have succeeded, further opens fail.
        open_limit: Mutex<Option<usize>>,
    }

    impl MockOrigin {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn serving(url: &str, body: impl Into<Vec<u8>>) -> Self {
            let origin = Self::new();
            origin.set(url, body);
            origin
        }

        pub fn set(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.bodies
                .lock()
                .unwrap()
                .insert(url.to_string(), body.into());
        }

        pub fn remove(&self, url: &str) {
            self.bodies.lock().unwrap().remove(url);
        }

        pub fn limit_opens(&self, n: usize) {
            *self.open_limit.lock().unwrap() = Some(n);
        }

        pub fn open_count(&self) -> usize {
            self.opens.lock().unwrap().len()
        }
    }

    impl Origin for MockOrigin {
        fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, OriginError> {
            let mut opens = self.opens.lock().unwrap();
            if let Some(limit) = *self.open_limit.lock().unwrap()
                && opens.len() >= limit
            {
                return Err(OriginError::Transport {
                    url: url.to_string(),
                    reason: "connection refused".into(),
                });
            }
            let body = self.bodies.lock().unwrap().get(url).cloned().ok_or_else(|| {
                OriginError::Status {
                    url: url.to_string(),
                    status: 404,
                }
            })?;
            opens.push(url.to_string());
            Ok(Box::new(io::Cursor::new(body)))
        }
    }

    /// Reader that always fails; chained after a few good bytes.
    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    struct BrokenOrigin;

    impl Origin for BrokenOrigin {
        fn open(&self, _url: &str) -> Result<Box<dyn Read + Send>, OriginError> {
            Ok(Box::new(io::Cursor::new(b"partial".to_vec()).chain(Broken)))
        }
    }

    #[test]
    fn fetch_writes_destination() {
        let tmp = TempDir::new().unwrap();
        let origin = MockOrigin::serving("http://x/a.jpg", b"image-bytes".to_vec());
        let dest = tmp.path().join("original/a-hero.jpg");

        let bytes = fetch(&origin, "http://x/a.jpg", &dest).unwrap();
        assert_eq!(bytes, 11);
        assert_eq!(fs::read(&dest).unwrap(), b"image-bytes");
    }

    #[test]
    fn fetch_overwrites_existing() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("a.jpg");
        fs::write(&dest, b"old").unwrap();
        let origin = MockOrigin::serving("http://x/a.jpg", b"new".to_vec());

        fetch(&origin, "http://x/a.jpg", &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[test]
    fn fetch_404_leaves_nothing() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("a.jpg");
        let err = fetch(&MockOrigin::new(), "http://x/a.jpg", &dest).unwrap_err();
        assert!(matches!(err, OriginError::Status { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn interrupted_fetch_keeps_previous_original() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("a.jpg");
        fs::write(&dest, b"previous").unwrap();

        assert!(fetch(&BrokenOrigin, "http://x/a.jpg", &dest).is_err());
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
        // No temp files left behind
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn mock_open_limit() {
        let origin = MockOrigin::serving("u", b"x".to_vec());
        origin.limit_opens(1);
        assert!(origin.open("u").is_ok());
        assert!(matches!(
            origin.open("u"),
            Err(OriginError::Transport { .. })
        ));
        assert_eq!(origin.open_count(), 1);
    }

    #[test]
    fn http_origin_rejects_malformed_url() {
        let origin = HttpOrigin::new(&HttpConfig::default()).unwrap();
        let err = origin.open("not a url").err().unwrap();
        assert!(matches!(err, OriginError::InvalidUrl { .. }), "{err:?}");
    }

    // =========================================================================
    // HttpOrigin against a loopback server
    // =========================================================================

    /// Answer a single request on 127.0.0.1 with `response`, verbatim.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}/a.jpg")
    }

    #[test]
    fn http_origin_streams_ok_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\nimage-bytes",
        );
        let origin = HttpOrigin::new(&HttpConfig::default()).unwrap();

        let mut body = Vec::new();
        origin.open(&url).unwrap().read_to_end(&mut body).unwrap();
        assert_eq!(body, b"image-bytes");
    }

    #[test]
    fn http_origin_404_is_a_status_error() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );
        let origin = HttpOrigin::new(&HttpConfig::default()).unwrap();

        match origin.open(&url) {
            Err(OriginError::Status { url: u, status }) => {
                assert_eq!(status, 404);
                assert_eq!(u, url);
            }
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("404 must not yield a body"),
        }
    }

    #[test]
    fn http_fetch_of_404_writes_nothing() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );
        let origin = HttpOrigin::new(&HttpConfig::default()).unwrap();
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("original/a-hero.jpg");

        assert!(matches!(
            fetch(&origin, &url, &dest),
            Err(OriginError::Status { status: 404, .. })
        ));
        assert!(!dest.exists());
    }
}
