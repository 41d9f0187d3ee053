//! Byte-exact comparison of two streams.

use crate::core::fs::FileSystem;
use crate::error::CompareError;
use std::io::{self, Read};
use std::path::Path;

/// Block size used when streaming both sources
pub const CHUNK_SIZE: usize = 1024;

/// Compare two streams byte for byte.
///
/// Returns `false` at the first differing chunk, when the lengths differ, or
/// when both sources are empty: no content is never identical to anything.
pub fn bytes_equal<A: Read, B: Read>(mut a: A, mut b: B) -> io::Result<bool> {
    let mut chunk_a = [0u8; CHUNK_SIZE];
    let mut chunk_b = [0u8; CHUNK_SIZE];
    let mut seen_content = false;

    loop {
        let read_a = fill_chunk(&mut a, &mut chunk_a)?;
        let read_b = fill_chunk(&mut b, &mut chunk_b)?;

        if read_a != read_b || chunk_a[..read_a] != chunk_b[..read_b] {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(seen_content);
        }
        seen_content = true;
    }
}

/// Read until `buffer` is full or the source is exhausted.
fn fill_chunk<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Compare two files byte for byte.
///
/// A missing or empty file on either side is `Ok(false)`; only a read
/// failure on a file that exists is an error.
pub fn files_equal(fs: &dyn FileSystem, a: &Path, b: &Path) -> Result<bool, CompareError> {
    let (Ok(meta_a), Ok(meta_b)) = (fs.metadata(a), fs.metadata(b)) else {
        return Ok(false);
    };
    if meta_a.size == 0 || meta_b.size == 0 || meta_a.size != meta_b.size {
        return Ok(false);
    }

    let reader_a = fs.open_read(a).map_err(|source| CompareError::Io {
        path: a.to_path_buf(),
        source,
    })?;
    let reader_b = fs.open_read(b).map_err(|source| CompareError::Io {
        path: b.to_path_buf(),
        source,
    })?;

    bytes_equal(reader_a, reader_b).map_err(|source| CompareError::Io {
        path: a.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::LocalFileSystem;
    use std::fs;
    use tempfile::TempDir;

    /// Hands out at most three bytes per read call
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.0.len().min(buf.len()).min(3);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn identical_content_is_equal() {
        let data = vec![42u8; CHUNK_SIZE * 3 + 17];
        assert!(bytes_equal(&data[..], &data[..]).unwrap());
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = b"hello world".to_vec();
        let b = b"hello there".to_vec();
        assert_eq!(
            bytes_equal(&a[..], &b[..]).unwrap(),
            bytes_equal(&b[..], &a[..]).unwrap()
        );
        assert!(!bytes_equal(&a[..], &b[..]).unwrap());
    }

    #[test]
    fn different_lengths_are_not_equal() {
        let short = vec![1u8; CHUNK_SIZE];
        let long = vec![1u8; CHUNK_SIZE + 1];
        assert!(!bytes_equal(&short[..], &long[..]).unwrap());
        assert!(!bytes_equal(&long[..], &short[..]).unwrap());
    }

    #[test]
    fn empty_sources_are_not_equal() {
        assert!(!bytes_equal(&b""[..], &b""[..]).unwrap());
    }

    #[test]
    fn short_reads_do_not_cause_false_mismatches() {
        let data: Vec<u8> = (0..=255u8).cycle().take(CHUNK_SIZE * 2 + 5).collect();
        assert!(bytes_equal(Trickle(&data), &data[..]).unwrap());
    }

    #[test]
    fn mismatch_in_last_chunk_is_detected() {
        let a = vec![9u8; CHUNK_SIZE * 2 + 10];
        let mut b = a.clone();
        *b.last_mut().unwrap() = 8;
        assert!(!bytes_equal(&a[..], &b[..]).unwrap());
    }

    #[test]
    fn files_equal_handles_missing_and_empty_files() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("present.txt");
        let empty = temp_dir.path().join("empty.txt");
        let missing = temp_dir.path().join("missing.txt");
        fs::write(&present, b"hi").unwrap();
        fs::write(&empty, b"").unwrap();

        let fs = LocalFileSystem::new();
        assert!(files_equal(&fs, &present, &present).unwrap());
        assert!(!files_equal(&fs, &present, &missing).unwrap());
        assert!(!files_equal(&fs, &empty, &empty).unwrap());
    }
}
