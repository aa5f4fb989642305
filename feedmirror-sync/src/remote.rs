//! Network seam: the [`RemoteClient`] trait and its `ureq` implementation.
//!
//! Both calls are blocking and carry their own timeout, so a slow remote
//! only ever stalls the worker that is talking to it.

use std::io::{self, Read};
use std::time::Duration;

use chrono::{DateTime, Utc};

use feedmirror_core::RemoteSignals;

use crate::error::{FetchError, ProbeError};

/// A streaming response body plus the signals observed on that response.
pub struct FetchedBody {
    pub signals: RemoteSignals,
    pub body: Box<dyn Read + Send>,
}

/// Remote operations the engine needs.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteClient: Send + Sync {
    /// Metadata-only request (HEAD). Must not transfer the body.
    fn probe(&self, url: &str, timeout: Duration) -> Result<RemoteSignals, ProbeError>;

    /// Full GET of the resource body.
    fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedBody, FetchError>;
}

/// Production client backed by a shared `ureq` agent.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .redirects(5)
            .build();
        Self { agent }
    }
}

impl RemoteClient for UreqClient {
    fn probe(&self, url: &str, timeout: Duration) -> Result<RemoteSignals, ProbeError> {
        match self.agent.head(url).timeout(timeout).call() {
            Ok(response) => Ok(signals_of(&response)),
            Err(ureq::Error::Status(status, _)) => Err(ProbeError::Status { status }),
            Err(ureq::Error::Transport(t)) if is_timeout(&t) => {
                Err(ProbeError::Timeout { after: timeout })
            }
            Err(ureq::Error::Transport(t)) => Err(ProbeError::Transport(t.to_string())),
        }
    }

    fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedBody, FetchError> {
        match self.agent.get(url).timeout(timeout).call() {
            Ok(response) => Ok(FetchedBody {
                signals: signals_of(&response),
                body: Box::new(response.into_reader()),
            }),
            Err(ureq::Error::Status(status, _)) => Err(FetchError::Status { status }),
            Err(ureq::Error::Transport(t)) if is_timeout(&t) => {
                Err(FetchError::Timeout { after: timeout })
            }
            Err(ureq::Error::Transport(t)) => Err(FetchError::Transport(t.to_string())),
        }
    }
}

fn signals_of(response: &ureq::Response) -> RemoteSignals {
    signals_from_headers(
        response.header("ETag"),
        response.header("Last-Modified"),
        response.header("Content-Length"),
    )
}

/// Build [`RemoteSignals`] from raw header values. Unparsable values are
/// treated as absent rather than failing the probe.
pub fn signals_from_headers(
    etag: Option<&str>,
    last_modified: Option<&str>,
    content_length: Option<&str>,
) -> RemoteSignals {
    RemoteSignals {
        entity_tag: etag
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned),
        last_modified: last_modified.and_then(parse_http_date),
        byte_length: content_length.and_then(|v| v.trim().parse::<u64>().ok()),
    }
}

/// Parse an HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True when an I/O error in the chain is a timeout.
pub(crate) fn is_timeout_io(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if is_timeout_io(io_err) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_all_three_headers() {
        let signals = signals_from_headers(
            Some(" \"33a64df5\" "),
            Some("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some("1523"),
        );
        assert_eq!(signals.entity_tag.as_deref(), Some("\"33a64df5\""));
        assert_eq!(
            signals.last_modified,
            Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
        );
        assert_eq!(signals.byte_length, Some(1523));
    }

    #[test]
    fn garbage_headers_are_absent() {
        let signals = signals_from_headers(Some("   "), Some("yesterday"), Some("-1"));
        assert!(signals.is_empty());
    }

    #[test]
    fn weak_entity_tags_are_kept_verbatim() {
        let signals = signals_from_headers(Some("W/\"abc\""), None, None);
        assert_eq!(signals.entity_tag.as_deref(), Some("W/\"abc\""));
    }

    #[test]
    fn timeout_kinds_are_recognised() {
        assert!(is_timeout_io(&io::Error::new(io::ErrorKind::TimedOut, "t")));
        assert!(is_timeout_io(&io::Error::new(io::ErrorKind::WouldBlock, "t")));
        assert!(!is_timeout_io(&io::Error::new(io::ErrorKind::ConnectionReset, "r")));
    }
}
