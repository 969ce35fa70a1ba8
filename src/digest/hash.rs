// Content hash module
// Streaming 128-bit XXH3 hashing of file contents, hex encode/decode

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use xxhash_rust::xxh3::Xxh3;

use super::error::{DigestError, FormatErrorKind};

/// Read buffer size for streaming file hashing
pub const FILE_BUFFER_SIZE: usize = 32 * 1024;

/// Fixed 16-byte content hash of a file
///
/// XXH128 is chosen for throughput: the tool detects accidental drift,
/// not tampering, so cryptographic collision resistance is not required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Hash a file by streaming it through a fixed-size reused buffer
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Xxh3::new();
        let mut buffer = vec![0u8; FILE_BUFFER_SIZE];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(ContentHash(hasher.digest128().to_le_bytes()))
    }

    /// Hash an in-memory byte slice (tests and small inputs)
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(data);
        ContentHash(hasher.digest128().to_le_bytes())
    }

    /// Parse a 32-character hex string
    ///
    /// The line number is only used for error context when parsing manifests.
    pub fn parse(hex: &str, line: usize) -> Result<Self, DigestError> {
        if hex.len() != 32 {
            return Err(DigestError::format(line, FormatErrorKind::MalformedHash));
        }

        let mut bytes = [0u8; 16];
        for (i, chunk) in hex.as_bytes().chunks_exact(2).enumerate() {
            let hi = hex_value(chunk[0]);
            let lo = hex_value(chunk[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => bytes[i] = (hi << 4) | lo,
                _ => return Err(DigestError::format(line, FormatErrorKind::MalformedHash)),
            }
        }

        Ok(ContentHash(bytes))
    }

    /// 32-character uppercase hex form used in manifests
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(32);
        for byte in &self.0 {
            out.push(HEX_UPPER[(byte >> 4) as usize] as char);
            out.push(HEX_UPPER[(byte & 0x0f) as usize] as char);
        }
        out
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
