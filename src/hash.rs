//! SHA-256 content hashing over async byte streams.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{ready, Context, Poll};

use ring::digest;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid content hash: expected 64 lowercase hex characters")]
pub struct InvalidHash;

/// Hex-encoded SHA-256 digest of a blob's bytes. Doubles as its storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    fn from_digest(digest: digest::Digest) -> Self {
        let mut hex = String::with_capacity(HASH_HEX_LEN);
        for byte in digest.as_ref() {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest of an in-memory slice.
    pub fn of(data: &[u8]) -> Self {
        Self::from_digest(digest::digest(&digest::SHA256, data))
    }
}

impl FromStr for ContentHash {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == HASH_HEX_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidHash)
        }
    }
}

impl TryFrom<String> for ContentHash {
    type Error = InvalidHash;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pass-through reader that digests every byte handed to the caller.
pub struct HashingReader<R> {
    inner: R,
    context: digest::Context,
    bytes_read: u64,
}

impl<R> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            context: digest::Context::new(&digest::SHA256),
            bytes_read: 0,
        }
    }

    /// Finalize the digest. Only meaningful once the inner reader hit EOF.
    pub fn finish(self) -> (ContentHash, u64) {
        (ContentHash::from_digest(self.context.finish()), self.bytes_read)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for HashingReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let fresh = &buf.filled()[before..];
        this.context.update(fresh);
        this.bytes_read += fresh.len() as u64;
        Poll::Ready(Ok(()))
    }
}

/// Consume `reader` to EOF and return its digest and length.
///
/// A read error aborts the computation; no digest is produced for a partial stream.
pub async fn hash_reader<R: AsyncRead + Unpin>(reader: R) -> io::Result<(ContentHash, u64)> {
    let mut hashing = HashingReader::new(reader);
    tokio::io::copy(&mut hashing, &mut tokio::io::sink()).await?;
    Ok(hashing.finish())
}
