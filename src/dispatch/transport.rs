use std::time::Duration;

use crate::core::EetError;

/// Reference timeout for one registration attempt; a timed-out attempt
/// is a terminal outcome for that attempt, never an indefinite wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// The one operation the scheduler needs from the network: POST opaque
/// bytes, get opaque bytes back, within a bounded time.
///
/// Implementations must treat the body as opaque — re-encoding it would
/// break the digest the authority verifies.
pub trait Transport: Send + Sync {
    fn post(&self, url: &str, body: &[u8], timeout: Duration) -> Result<Vec<u8>, EetError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn post(&self, url: &str, body: &[u8], timeout: Duration) -> Result<Vec<u8>, EetError> {
        (**self).post(url, body, timeout)
    }
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, EetError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| EetError::Transport(format!("HTTP client build failed: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, body: &[u8], timeout: Duration) -> Result<Vec<u8>, EetError> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", "http://fs.mfcr.cz/eet/OdeslaniTrzby")
            .body(body.to_vec())
            .send()
            .map_err(|e| EetError::Transport(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EetError::Transport(format!("POST {url} returned {status}")));
        }
        let bytes = response
            .bytes()
            .map_err(|e| EetError::Transport(format!("reading reply from {url} failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}
