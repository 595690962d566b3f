//! Hash algorithms and the engine computing entry digests

use crate::{Error, Result};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use xxhash_rust::xxh3::Xxh3;

/// Default read buffer for hashing, in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Largest read buffer the engine will allocate, in bytes
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Hash algorithms a caller can request digests for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Crc32,
    Md5,
    Sha256,
    Sha512,
    Blake3,
    Xxh3,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 6] = [
        HashAlgorithm::Crc32,
        HashAlgorithm::Md5,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Blake3,
        HashAlgorithm::Xxh3,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Crc32 => "crc32",
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake3 => "blake3",
            HashAlgorithm::Xxh3 => "xxh3",
        }
    }

    /// Length in bytes of the encoded digest
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Crc32 => 8,
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
            HashAlgorithm::Blake3 => 32,
            HashAlgorithm::Xxh3 => 8,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "crc32" | "crc" => Ok(HashAlgorithm::Crc32),
            "md5" => Ok(HashAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            "blake3" => Ok(HashAlgorithm::Blake3),
            "xxh3" | "xxh3-64" => Ok(HashAlgorithm::Xxh3),
            _ => Err(Error::Config(format!("Unknown hash algorithm: {}", s))),
        }
    }
}

/// Digest of one entry under one algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash {
    pub algorithm: HashAlgorithm,
    bytes: Vec<u8>,
}

impl FileHash {
    pub fn new(algorithm: HashAlgorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    /// CRC32 in its legacy encoding: the checksum widened to 64 bits,
    /// little-endian.
    pub fn from_crc32(crc: u32) -> Self {
        Self::new(HashAlgorithm::Crc32, u64::from(crc).to_le_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bytes reinterpreted as signed values
    pub fn to_signed(&self) -> Vec<i8> {
        self.bytes.iter().map(|&b| b as i8).collect()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Computes one digest from one byte stream
pub trait HashEngine {
    fn compute(&self, algorithm: HashAlgorithm, reader: &mut dyn Read) -> io::Result<FileHash>;
}

/// Hash engine backed by the RustCrypto, blake3, crc32fast and xxhash crates
#[derive(Debug, Clone)]
pub struct DefaultHashEngine {
    buffer_size: usize,
}

impl Default for DefaultHashEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultHashEngine {
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Engine reading in `buffer_size` chunks, clamped to `1..=MAX_BUFFER_SIZE`
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.clamp(1, MAX_BUFFER_SIZE),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

/// Feed a reader through `update` in `buffer_size` chunks
fn drain<F: FnMut(&[u8])>(reader: &mut dyn Read, buffer_size: usize, mut update: F) -> io::Result<()> {
    let mut buffer = vec![0u8; buffer_size];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        update(&buffer[..n]);
    }
}

impl HashEngine for DefaultHashEngine {
    fn compute(&self, algorithm: HashAlgorithm, reader: &mut dyn Read) -> io::Result<FileHash> {
        let size = self.buffer_size;
        let hash = match algorithm {
            HashAlgorithm::Crc32 => {
                let mut hasher = crc32fast::Hasher::new();
                drain(reader, size, |chunk| hasher.update(chunk))?;
                FileHash::from_crc32(hasher.finalize())
            }
            HashAlgorithm::Md5 => {
                let mut hasher = Md5::new();
                drain(reader, size, |chunk| hasher.update(chunk))?;
                FileHash::new(algorithm, hasher.finalize().to_vec())
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                drain(reader, size, |chunk| hasher.update(chunk))?;
                FileHash::new(algorithm, hasher.finalize().to_vec())
            }
            HashAlgorithm::Sha512 => {
                let mut hasher = Sha512::new();
                drain(reader, size, |chunk| hasher.update(chunk))?;
                FileHash::new(algorithm, hasher.finalize().to_vec())
            }
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                drain(reader, size, |chunk| {
                    hasher.update(chunk);
                })?;
                FileHash::new(algorithm, hasher.finalize().as_bytes().to_vec())
            }
            HashAlgorithm::Xxh3 => {
                let mut hasher = Xxh3::new();
                drain(reader, size, |chunk| hasher.update(chunk))?;
                FileHash::new(algorithm, hasher.digest().to_be_bytes().to_vec())
            }
        };
        Ok(hash)
    }
}
