//! .nsx Binary File Format
//!
//! # File Structure
//!
//! ```text
//! Offset   Size    Type        Description
//! ─────────────────────────────────────────────
//! 0x00     8       [u8; 8]     Magic: "NSIDX001"
//! 0x08     4       u32 LE      Format version (1)
//! 0x0C     4       u32 LE      D: Dimensions
//! 0x10     8       u64 LE      N: Number of vectors
//! 0x18     N*D*4   [f32]       Vector data (Little Endian, row-major)
//! ...      32      [u8; 32]    SHA-256 of every preceding byte
//! ```
//!
//! The trailer makes torn or bit-flipped files detectable, so a loader can
//! tell "no index" apart from "damaged index".
//!
//! # Example
//!
//! ```ignore
//! let mut writer = IndexWriter::new("data.nsx", 768, 1)?;
//! writer.write_vector(&vec![0.1f32; 768])?;
//! writer.finish()?;
//! ```

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Magic bytes identifying a .nsx file: "NSIDX001"
pub const MAGIC: [u8; 8] = *b"NSIDX001";

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Header size in bytes: 8 (magic) + 4 (version) + 4 (dims) + 8 (count)
pub const HEADER_SIZE: usize = 24;

/// SHA-256 trailer size in bytes
pub const CHECKSUM_SIZE: usize = 32;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("File too small: {len} bytes")]
    TooShort { len: usize },

    #[error("Invalid magic bytes: expected NSIDX001")]
    InvalidMagic,

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    #[error("Header declares zero dimensions")]
    ZeroDimension,

    #[error("Dimension {0} does not fit the u32 header field")]
    DimensionTooLarge(usize),

    #[error("Size mismatch: header implies {expected} bytes, file has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Checksum mismatch: file contents do not match the stored SHA-256")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector count mismatch: declared {declared}, wrote {written}")]
    CountMismatch { declared: u64, written: u64 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Parsed .nsx file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u32,
    pub dimensions: u32,
    pub count: u64,
}

impl IndexHeader {
    pub fn new(dimensions: u32, count: u64) -> Self {
        Self {
            version: FORMAT_VERSION,
            dimensions,
            count,
        }
    }

    /// Parse header from raw bytes (first 24 bytes of file)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::TooShort { len: bytes.len() });
        }

        if bytes[0..8] != MAGIC {
            return Err(FormatError::InvalidMagic);
        }

        let version = u32::from_le_bytes(le_array(&bytes[8..12]));
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let dimensions = u32::from_le_bytes(le_array(&bytes[12..16]));
        if dimensions == 0 {
            return Err(FormatError::ZeroDimension);
        }
        let count = u64::from_le_bytes(le_array(&bytes[16..24]));

        Ok(Self {
            version,
            dimensions,
            count,
        })
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&MAGIC);
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12..16].copy_from_slice(&self.dimensions.to_le_bytes());
        buf[16..24].copy_from_slice(&self.count.to_le_bytes());
        buf
    }

    /// Byte length of the vector section, `None` on overflow
    pub fn body_size(&self) -> Option<u64> {
        self.count
            .checked_mul(u64::from(self.dimensions))?
            .checked_mul(std::mem::size_of::<f32>() as u64)
    }

    /// Total file size including header and trailer, `None` on overflow
    pub fn file_size(&self) -> Option<u64> {
        self.body_size()?
            .checked_add((HEADER_SIZE + CHECKSUM_SIZE) as u64)
    }
}

/// Contents of a decoded .nsx file
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedIndex {
    pub dim: usize,
    pub count: usize,
    /// Row-major vector data, `count * dim` floats
    pub data: Vec<f32>,
}

/// Decode and verify a complete .nsx file image.
///
/// Never panics on arbitrary input.
pub fn decode(bytes: &[u8]) -> Result<DecodedIndex, FormatError> {
    let header = IndexHeader::from_bytes(bytes)?;

    let actual = bytes.len() as u64;
    let expected = header.file_size().ok_or(FormatError::SizeMismatch {
        expected: u64::MAX,
        actual,
    })?;
    if expected != actual {
        return Err(FormatError::SizeMismatch { expected, actual });
    }

    let (content, stored) = bytes.split_at(bytes.len() - CHECKSUM_SIZE);
    if Sha256::digest(content).as_slice() != stored {
        return Err(FormatError::ChecksumMismatch);
    }

    let data: Vec<f32> = content[HEADER_SIZE..]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(le_array(chunk)))
        .collect();

    Ok(DecodedIndex {
        dim: header.dimensions as usize,
        count: data.len() / header.dimensions as usize,
        data,
    })
}

/// Read and decode the .nsx file at `path`
pub fn read_index<P: AsRef<Path>>(path: P) -> Result<DecodedIndex, FormatError> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

/// Write `data` (row-major, `dim` floats per row) as a complete .nsx file.
///
/// Goes through [`IndexWriter`], so the file at `path` is replaced atomically.
pub fn write_index<P: AsRef<Path>>(path: P, dim: usize, data: &[f32]) -> Result<(), FormatError> {
    if dim == 0 {
        return Err(FormatError::ZeroDimension);
    }
    if data.len() % dim != 0 {
        return Err(FormatError::DimensionMismatch {
            expected: dim,
            actual: data.len(),
        });
    }

    let mut writer = IndexWriter::new(path, dim, (data.len() / dim) as u64)?;
    for row in data.chunks_exact(dim) {
        writer.write_vector(row)?;
    }
    writer.finish()?;
    Ok(())
}

/// Writer for creating .nsx files
///
/// Streams into `<path>.tmp` next to the target and renames over `path` in
/// [`finish`](Self::finish). A writer dropped before `finish` removes its
/// temporary file and leaves `path` untouched.
pub struct IndexWriter {
    writer: Option<BufWriter<File>>,
    hasher: Sha256,
    tmp_path: PathBuf,
    final_path: PathBuf,
    dimensions: usize,
    declared: u64,
    written: u64,
}

impl IndexWriter {
    /// Start a file holding exactly `count` vectors of `dimensions` floats
    pub fn new<P: AsRef<Path>>(path: P, dimensions: usize, count: u64) -> Result<Self, FormatError> {
        if dimensions == 0 {
            return Err(FormatError::ZeroDimension);
        }
        let dims =
            u32::try_from(dimensions).map_err(|_| FormatError::DimensionTooLarge(dimensions))?;

        let final_path = path.as_ref().to_path_buf();
        let tmp_path = tmp_path_for(&final_path)?;
        let file = File::create(&tmp_path)?;

        let mut this = Self {
            writer: Some(BufWriter::new(file)),
            hasher: Sha256::new(),
            tmp_path,
            final_path,
            dimensions,
            declared: count,
            written: 0,
        };
        this.put(&IndexHeader::new(dims, count).to_bytes())?;
        Ok(this)
    }

    /// Write a single vector to the file
    pub fn write_vector(&mut self, vector: &[f32]) -> Result<(), FormatError> {
        if vector.len() != self.dimensions {
            return Err(FormatError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if self.written == self.declared {
            return Err(FormatError::CountMismatch {
                declared: self.declared,
                written: self.written + 1,
            });
        }

        for &val in vector {
            self.put(&val.to_le_bytes())?;
        }
        self.written += 1;
        Ok(())
    }

    /// Append the checksum, fsync, and rename over the target path.
    ///
    /// Returns the number of vectors written.
    pub fn finish(mut self) -> Result<u64, FormatError> {
        if self.written != self.declared {
            return Err(FormatError::CountMismatch {
                declared: self.declared,
                written: self.written,
            });
        }

        let digest = std::mem::take(&mut self.hasher).finalize();
        let writer = self.writer.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "index writer already finished")
        })?;
        if let Err(err) = commit(writer, &digest, &self.tmp_path, &self.final_path) {
            let _ = fs::remove_file(&self.tmp_path);
            return Err(err.into());
        }

        sync_parent(&self.final_path)?;
        Ok(self.written)
    }

    fn put(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.hasher.update(bytes);
        match self.writer.as_mut() {
            Some(w) => w.write_all(bytes),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "index writer already finished",
            )),
        }
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

fn commit(mut writer: BufWriter<File>, digest: &[u8], tmp: &Path, target: &Path) -> io::Result<()> {
    writer.write_all(digest)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(tmp, target)
}

fn tmp_path_for(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("index path has no file name: {}", path.display()),
        )
    })?;
    let mut tmp: OsString = name.to_os_string();
    tmp.push(".tmp");
    Ok(path.with_file_name(tmp))
}

fn sync_parent(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[inline]
fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}
