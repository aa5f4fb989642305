//! Local fingerprint: SHA-256 of the stored copy of a resource.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// State of a resource's local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalFingerprint {
    Absent,
    Present { hash: String, size: u64 },
}

impl LocalFingerprint {
    pub fn hash(&self) -> Option<&str> {
        match self {
            LocalFingerprint::Absent => None,
            LocalFingerprint::Present { hash, .. } => Some(hash),
        }
    }

    pub fn size(&self) -> Option<u64> {
        match self {
            LocalFingerprint::Absent => None,
            LocalFingerprint::Present { size, .. } => Some(*size),
        }
    }
}

/// Hash the file at `path`. A missing file is [`LocalFingerprint::Absent`];
/// any other I/O failure is returned.
///
/// Bytes are hashed exactly as stored, with no line-ending normalisation.
pub fn fingerprint(path: &Path) -> io::Result<LocalFingerprint> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LocalFingerprint::Absent),
        Err(err) => return Err(err),
    };
    if !file.metadata()?.is_file() {
        return Ok(LocalFingerprint::Absent);
    }

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok(LocalFingerprint::Present {
        hash: hex::encode(hasher.finalize()),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_absent() {
        let tmp = TempDir::new().unwrap();
        let fp = fingerprint(&tmp.path().join("nope.csv")).unwrap();
        assert_eq!(fp, LocalFingerprint::Absent);
        assert!(fp.hash().is_none());
    }

    #[test]
    fn directory_is_absent() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(fingerprint(tmp.path()).unwrap(), LocalFingerprint::Absent);
    }

    #[test]
    fn known_digest_and_size() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.csv");
        std::fs::write(&path, "abc").unwrap();

        let fp = fingerprint(&path).unwrap();
        assert_eq!(
            fp.hash(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(fp.size(), Some(3));
    }

    #[test]
    fn crlf_and_lf_hash_differently() {
        let tmp = TempDir::new().unwrap();
        let lf = tmp.path().join("lf.csv");
        let crlf = tmp.path().join("crlf.csv");
        std::fs::write(&lf, "a,b\n1,2\n").unwrap();
        std::fs::write(&crlf, "a,b\r\n1,2\r\n").unwrap();

        assert_ne!(
            fingerprint(&lf).unwrap().hash(),
            fingerprint(&crlf).unwrap().hash()
        );
    }

    #[test]
    fn deterministic_across_calls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("same.csv");
        std::fs::write(&path, "id,price\n1,0.25\n").unwrap();
        assert_eq!(fingerprint(&path).unwrap(), fingerprint(&path).unwrap());
    }
}
