//! Content digests for change detection.
//!
//! The worker decides whether its cached original is stale by hashing the
//! local file and the remote body and comparing the two. The digest is only
//! ever compared for equality, never stored or trusted for security.
//!
//! SHA-256 is used because it is already the content hash of this codebase;
//! collision resistance is a side benefit, not a requirement.
//!
//! Input is consumed in fixed [`CHUNK_SIZE`] reads, so a remote body is never
//! buffered whole in memory. The result depends only on the bytes, not on how
//! the reader happens to split them.

use sha2::{Digest as _, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used when hashing a stream.
pub const CHUNK_SIZE: usize = 1 << 20;

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Hash everything `reader` yields until EOF.
///
/// Interrupted reads are retried; any other read error is returned as-is so
/// callers can tell a local I/O failure from a network one.
pub fn digest(mut reader: impl Read) -> io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Ok(Digest(out))
}

/// Digest of a file's contents.
pub fn digest_file(path: &Path) -> io::Result<Digest> {
    digest(File::open(path)?)
}
