//! Fetcher: download a resource body into a staged temp file.
//!
//! The temp file lives in the data directory so the Sanitizer's final rename
//! stays on one filesystem. It is deleted on drop, so any failure here (or a
//! later one in the Sanitizer) leaves nothing behind.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;

use feedmirror_core::RemoteSignals;

use crate::error::FetchError;
use crate::remote::{is_timeout_io, RemoteClient};

/// A fully received payload awaiting sanitization.
#[derive(Debug)]
pub struct Fetched {
    pub payload: NamedTempFile,
    /// Signals observed on the GET response itself.
    pub signals: RemoteSignals,
    pub bytes_received: u64,
}

impl Fetched {
    /// Remote body length to record: declared if the server sent one,
    /// otherwise what actually arrived.
    pub fn byte_length(&self) -> u64 {
        self.signals.byte_length.unwrap_or(self.bytes_received)
    }
}

/// Download `url` into a new temp file under `staging_dir`.
pub fn fetch_to_temp<C>(
    client: &C,
    url: &str,
    timeout: Duration,
    staging_dir: &Path,
) -> Result<Fetched, FetchError>
where
    C: RemoteClient + ?Sized,
{
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| FetchError::Io { path, source }
    };

    std::fs::create_dir_all(staging_dir).map_err(io(staging_dir))?;
    let mut payload = tempfile::Builder::new()
        .prefix(".fetch-")
        .suffix(".part")
        .tempfile_in(staging_dir)
        .map_err(io(staging_dir))?;
    let payload_path = payload.path().to_path_buf();

    let mut response = client.fetch(url, timeout)?;

    let mut buf = [0u8; 64 * 1024];
    let mut bytes_received = 0u64;
    loop {
        let n = match response.body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout_io(&err) => return Err(FetchError::Timeout { after: timeout }),
            Err(err) => return Err(FetchError::Transport(err.to_string())),
        };
        payload
            .write_all(&buf[..n])
            .map_err(io(&payload_path))?;
        bytes_received += n as u64;
    }
    payload.flush().map_err(io(&payload_path))?;

    if let Some(expected) = response.signals.byte_length {
        if expected != bytes_received {
            return Err(FetchError::Truncated {
                expected,
                received: bytes_received,
            });
        }
    }

    Ok(Fetched {
        payload,
        signals: response.signals,
        bytes_received,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use mockall::predicate::eq;
    use tempfile::TempDir;

    use crate::remote::{FetchedBody, MockRemoteClient};

    const URL: &str = "https://feeds.example.com/prices.csv";

    fn body(bytes: &'static [u8], declared: Option<u64>) -> FetchedBody {
        FetchedBody {
            signals: RemoteSignals {
                entity_tag: Some("\"v7\"".into()),
                last_modified: None,
                byte_length: declared,
            },
            body: Box::new(Cursor::new(bytes)),
        }
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    /// Yields some bytes, then fails with `kind`.
    struct FailingBody {
        sent: bool,
        kind: ErrorKind,
    }

    impl Read for FailingBody {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.sent {
                self.sent = true;
                buf[..4].copy_from_slice(b"a,b\n");
                return Ok(4);
            }
            Err(std::io::Error::new(self.kind, "socket"))
        }
    }

    #[test]
    fn downloads_body_into_staging_dir() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRemoteClient::new();
        client
            .expect_fetch()
            .with(eq(URL), eq(Duration::from_secs(30)))
            .times(1)
            .returning(|_, _| Ok(body(b"id,price\n1,2\n", Some(13))));

        let fetched = fetch_to_temp(&client, URL, Duration::from_secs(30), tmp.path()).unwrap();
        assert_eq!(fetched.bytes_received, 13);
        assert_eq!(fetched.byte_length(), 13);
        assert_eq!(fetched.signals.entity_tag.as_deref(), Some("\"v7\""));
        assert!(fetched.payload.path().starts_with(tmp.path()));
        assert_eq!(
            std::fs::read_to_string(fetched.payload.path()).unwrap(),
            "id,price\n1,2\n"
        );
    }

    #[test]
    fn byte_length_falls_back_to_received() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRemoteClient::new();
        client
            .expect_fetch()
            .returning(|_, _| Ok(body(b"a\n1\n", None)));

        let fetched = fetch_to_temp(&client, URL, Duration::from_secs(5), tmp.path()).unwrap();
        assert_eq!(fetched.byte_length(), 4);
    }

    #[test]
    fn temp_file_removed_when_dropped() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRemoteClient::new();
        client
            .expect_fetch()
            .returning(|_, _| Ok(body(b"a\n", None)));

        let fetched = fetch_to_temp(&client, URL, Duration::from_secs(5), tmp.path()).unwrap();
        assert_eq!(staged_files(tmp.path()), 1);
        drop(fetched);
        assert_eq!(staged_files(tmp.path()), 0);
    }

    #[test]
    fn http_status_is_passed_through() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRemoteClient::new();
        client
            .expect_fetch()
            .returning(|_, _| Err(FetchError::Status { status: 404 }));

        let err = fetch_to_temp(&client, URL, Duration::from_secs(5), tmp.path()).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404 }));
        assert_eq!(staged_files(tmp.path()), 0);
    }

    #[test]
    fn body_timeout_maps_to_timeout_and_cleans_up() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRemoteClient::new();
        client.expect_fetch().returning(|_, _| {
            Ok(FetchedBody {
                signals: RemoteSignals::default(),
                body: Box::new(FailingBody {
                    sent: false,
                    kind: ErrorKind::TimedOut,
                }),
            })
        });

        let err = fetch_to_temp(&client, URL, Duration::from_secs(7), tmp.path()).unwrap_err();
        assert!(matches!(err, FetchError::Timeout { after } if after == Duration::from_secs(7)));
        assert_eq!(staged_files(tmp.path()), 0);
    }

    #[test]
    fn connection_reset_is_transport_error() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRemoteClient::new();
        client.expect_fetch().returning(|_, _| {
            Ok(FetchedBody {
                signals: RemoteSignals::default(),
                body: Box::new(FailingBody {
                    sent: false,
                    kind: ErrorKind::ConnectionReset,
                }),
            })
        });

        let err = fetch_to_temp(&client, URL, Duration::from_secs(7), tmp.path()).unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[test]
    fn short_body_is_truncated() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRemoteClient::new();
        client
            .expect_fetch()
            .returning(|_, _| Ok(body(b"id,pr", Some(100))));

        let err = fetch_to_temp(&client, URL, Duration::from_secs(5), tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Truncated {
                expected: 100,
                received: 5
            }
        ));
        assert_eq!(staged_files(tmp.path()), 0);
    }
}
