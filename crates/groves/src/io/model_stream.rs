//! Binary model stream for bagged ensembles.
//!
//! A stream is a fixed header followed by one framed block per ensemble member,
//! terminated by end-of-stream.
//!
//! # Format Structure
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                          │
//! │   0  4  mode      u32 LE                                   │
//! │   4  4  max TiG   i32 LE                                   │
//! │   8  8  min alpha f64 LE                                   │
//! ├────────────────────────────────────────────────────────────┤
//! │ Member block, repeated until EOF                           │
//! │   [len: u32 LE][crc32: u32 LE][postcard payload]           │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Members are flushed as soon as they are written, so an interrupted run
//! leaves a readable prefix of complete members.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::TrainMode;
use crate::training::{EnsembleMember, MemberParams};

// ============================================================================
// Constants
// ============================================================================

/// Size of the stream header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Size of a member block frame (length + checksum) in bytes.
pub const FRAME_SIZE: usize = 8;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while reading or writing a model stream.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The stream ended inside a header or member block.
    #[error("model stream is truncated")]
    Truncated,

    /// Unknown training mode tag in the header.
    #[error("invalid training mode tag {0}")]
    InvalidMode(u32),

    /// The header declares a TiG below 1.
    #[error("invalid TiG value {0} in model header")]
    InvalidTiG(i32),

    /// A member block does not match its checksum.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// A member payload failed to encode or decode.
    #[error("member encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// The stream holds no members.
    #[error("model stream contains no ensemble members")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Header
// ============================================================================

/// Parameters shared by every member of a saved ensemble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelHeader {
    pub mode: TrainMode,
    pub max_tig: usize,
    pub min_alpha: f64,
}

impl ModelHeader {
    pub fn new(mode: TrainMode, max_tig: usize, min_alpha: f64) -> Self {
        Self {
            mode,
            max_tig,
            min_alpha,
        }
    }

    /// Member parameters implied by the header.
    pub fn member_params(&self) -> MemberParams {
        MemberParams {
            alpha: self.min_alpha,
            max_tig: self.max_tig,
            mode: self.mode,
        }
    }

    /// Serialize header to 16 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.mode.tag().to_le_bytes());
        let tig = i32::try_from(self.max_tig).unwrap_or(i32::MAX);
        buf[4..8].copy_from_slice(&tig.to_le_bytes());
        buf[8..16].copy_from_slice(&self.min_alpha.to_le_bytes());
        buf
    }

    /// Parse header from 16 bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, ModelError> {
        let tag = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let mode = TrainMode::from_tag(tag).ok_or(ModelError::InvalidMode(tag))?;

        let tig = i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if tig < 1 {
            return Err(ModelError::InvalidTiG(tig));
        }

        let mut alpha = [0u8; 8];
        alpha.copy_from_slice(&buf[8..16]);

        Ok(Self {
            mode,
            max_tig: tig as usize,
            min_alpha: f64::from_le_bytes(alpha),
        })
    }
}

// ============================================================================
// Block framing
// ============================================================================

/// Write one checksummed postcard block.
pub fn write_block<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), ModelError> {
    let payload = postcard::to_allocvec(value)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "member block exceeds 4 GiB"))?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Read one checksummed postcard block.
pub fn read_block<T: DeserializeOwned>(reader: &mut dyn Read) -> Result<T, ModelError> {
    let mut frame = [0u8; FRAME_SIZE];
    read_exact(reader, &mut frame)?;
    let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let expected = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);

    // allocation follows the bytes present, not the declared length
    let mut payload = Vec::new();
    (&mut *reader).take(len as u64).read_to_end(&mut payload)?;
    if payload.len() < len {
        return Err(ModelError::Truncated);
    }

    let actual = crc32fast::hash(&payload);
    if actual != expected {
        return Err(ModelError::ChecksumMismatch { expected, actual });
    }
    Ok(postcard::from_bytes(&payload)?)
}

fn read_exact(reader: &mut dyn Read, buf: &mut [u8]) -> Result<(), ModelError> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => ModelError::Truncated,
        _ => ModelError::Io(err),
    })
}

// ============================================================================
// Writer
// ============================================================================

/// Streaming writer of a saved ensemble.
#[derive(Debug)]
pub struct ModelWriter<W: Write> {
    inner: W,
    header: ModelHeader,
    members: usize,
}

impl ModelWriter<BufWriter<File>> {
    /// Create (or truncate) a model file and write its header.
    pub fn create(path: impl AsRef<Path>, header: ModelHeader) -> Result<Self, ModelError> {
        Self::new(BufWriter::new(File::create(path)?), header)
    }
}

impl<W: Write> ModelWriter<W> {
    /// Write the header to `inner`.
    pub fn new(mut inner: W, header: ModelHeader) -> Result<Self, ModelError> {
        inner.write_all(&header.to_bytes())?;
        inner.flush()?;
        Ok(Self {
            inner,
            header,
            members: 0,
        })
    }

    pub fn header(&self) -> &ModelHeader {
        &self.header
    }

    /// Number of members written so far.
    pub fn members(&self) -> usize {
        self.members
    }

    /// Append a member and flush it to the underlying writer.
    pub fn write_member<M: EnsembleMember>(&mut self, member: &M) -> Result<(), ModelError> {
        member.save(&mut self.inner)?;
        self.inner.flush()?;
        self.members += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Streaming reader of a saved ensemble.
///
/// Members are loaded one at a time so a whole ensemble never has to sit in memory.
#[derive(Debug)]
pub struct ModelReader<R: BufRead> {
    inner: R,
    header: ModelHeader,
}

impl ModelReader<BufReader<File>> {
    /// Open a model file and validate its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: BufRead> ModelReader<R> {
    /// Read and validate the header.
    pub fn new(mut inner: R) -> Result<Self, ModelError> {
        let mut buf = [0u8; HEADER_SIZE];
        read_exact(&mut inner, &mut buf)?;
        let header = ModelHeader::from_bytes(&buf)?;
        Ok(Self { inner, header })
    }

    pub fn header(&self) -> &ModelHeader {
        &self.header
    }

    /// Load the next member, or `None` at a clean end of stream.
    pub fn next_member<M: EnsembleMember>(&mut self) -> Result<Option<M>, ModelError> {
        if self.inner.fill_buf()?.is_empty() {
            return Ok(None);
        }
        let params = self.header.member_params();
        M::load(&mut self.inner, &params).map(Some)
    }

    /// Visit every remaining member in stream order; returns how many were visited.
    pub fn for_each_member<M, F>(&mut self, mut f: F) -> Result<usize, ModelError>
    where
        M: EnsembleMember,
        F: FnMut(&M),
    {
        let mut count = 0;
        while let Some(member) = self.next_member::<M>()? {
            f(&member);
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trip() {
        let header = ModelHeader::new(TrainMode::Slow, 8, 0.05);
        let parsed = ModelHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn header_layout_is_little_endian() {
        let bytes = ModelHeader::new(TrainMode::Layered, 3, 0.5).to_bytes();
        assert_eq!(&bytes[0..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &3i32.to_le_bytes());
        assert_eq!(&bytes[8..16], &0.5f64.to_le_bytes());
    }

    #[test]
    fn header_rejects_invalid_tig() {
        let mut bytes = ModelHeader::new(TrainMode::Fast, 1, 0.1).to_bytes();
        bytes[4..8].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(ModelHeader::from_bytes(&bytes), Err(ModelError::InvalidTiG(0))));
    }

    #[test]
    fn header_rejects_invalid_mode() {
        let mut bytes = ModelHeader::new(TrainMode::Fast, 1, 0.1).to_bytes();
        bytes[0..4].copy_from_slice(&9u32.to_le_bytes());
        assert!(matches!(ModelHeader::from_bytes(&bytes), Err(ModelError::InvalidMode(9))));
    }

    #[test]
    fn truncated_header() {
        let result = ModelReader::new(Cursor::new(vec![0u8; 5]));
        assert!(matches!(result, Err(ModelError::Truncated)));
    }

    #[test]
    fn block_round_trip() {
        let mut buf = Vec::new();
        write_block(&mut buf, &vec![1.5f64, -2.0]).unwrap();
        write_block(&mut buf, &String::from("second")).unwrap();

        let mut cursor = Cursor::new(buf);
        let first: Vec<f64> = read_block(&mut cursor).unwrap();
        let second: String = read_block(&mut cursor).unwrap();
        assert_eq!(first, vec![1.5, -2.0]);
        assert_eq!(second, "second");
    }

    #[test]
    fn block_checksum_detects_corruption() {
        let mut buf = Vec::new();
        write_block(&mut buf, &vec![1u32, 2, 3]).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        let result: Result<Vec<u32>, _> = read_block(&mut Cursor::new(buf));
        assert!(matches!(result, Err(ModelError::ChecksumMismatch { .. })));
    }

    #[test]
    fn block_truncation_detected() {
        let mut buf = Vec::new();
        write_block(&mut buf, &vec![7u64; 10]).unwrap();
        buf.truncate(buf.len() - 3);
        let result: Result<Vec<u64>, _> = read_block(&mut Cursor::new(buf));
        assert!(matches!(result, Err(ModelError::Truncated)));
    }

    #[test]
    fn oversized_frame_length_is_truncation() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&[1, 2, 3]);
        let result: Result<Vec<u8>, _> = read_block(&mut Cursor::new(buf));
        assert!(matches!(result, Err(ModelError::Truncated)));
    }
}
