//! Fixed-size, NUL-terminated text buffer other processes can read.
//!
//! Backed by a regular file, normally on the `/dev/shm` tmpfs.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Fixed-size shared text buffer
#[derive(Debug)]
pub struct SharedBuffer {
    path: PathBuf,
    file: File,
    size: usize,
}

impl SharedBuffer {
    /// Open or create the buffer at `path`, sized to exactly `size` bytes
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero or the file cannot be created or resized.
    pub fn create(path: &Path, size: usize) -> io::Result<Self> {
        if size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "shared buffer size must be at least 1 byte",
            ));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.set_len(u64::try_from(size).unwrap_or(u64::MAX))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the buffer content with `content`, truncated to leave room for the terminator
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write(&self, content: &str) -> io::Result<()> {
        let content = truncate_to_boundary(content, self.size - 1);
        let mut frame = vec![0_u8; self.size];
        frame[..content.len()].copy_from_slice(content.as_bytes());
        self.file.write_all_at(&frame, 0)
    }

    /// Read the string stored in the buffer at `path`, up to the first NUL
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read(path: &Path, size: usize) -> io::Result<String> {
        let bytes = std::fs::read(path)?;
        let limit = bytes.len().min(size);
        let end = bytes[..limit]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(limit);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

/// Longest prefix of `s` that fits in `max_len` bytes without splitting a character
fn truncate_to_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
