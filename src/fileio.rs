//! Server-side file lookup and chunk reads. Mirrors the source's
//! `retrieve_file`/`get_file_size`/`get_file_chunk` but over `std::fs`
//! instead of `opendir`/`lseek`.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Looks up `name` as a direct (non-recursive) entry of `dir`. The name is
/// compared byte-for-byte against directory entries; it is never interpreted
/// as a relative path, so `../secret` cannot escape `dir`.
pub fn locate(dir: &Path, name: &str) -> io::Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == name {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

pub fn file_size(file: &File) -> io::Result<u64> {
    Ok(file.metadata()?.len())
}

/// Reads up to `max_len` bytes starting at `offset`, then seeks the handle
/// back to the start. The re-seek mirrors the source's own defensive
/// `lseek(fd, 0, SEEK_SET)` after each chunk read; harmless here since every
/// subsequent read seeks to its own absolute offset first.
pub fn read_chunk(file: &mut File, offset: u64, max_len: usize) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;

    let mut buf = vec![0u8; max_len];
    let mut total = 0;
    while total < max_len {
        match file.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    buf.truncate(total);

    file.seek(SeekFrom::Start(0))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mftp-fileio-test-{tag}-{:p}", &tag));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn locate_finds_exact_entry_only() {
        let dir = scratch_dir("locate");
        fs::write(dir.join("hello.txt"), b"hi").unwrap();

        assert!(locate(&dir, "hello.txt").unwrap().is_some());
        assert!(locate(&dir, "nope.txt").unwrap().is_none());
    }

    #[test]
    fn read_chunk_reads_requested_slice_and_rewinds() {
        let dir = scratch_dir("chunk");
        let path = dir.join("data.bin");
        fs::write(&path, b"0123456789").unwrap();

        let mut file = File::open(&path).unwrap();
        let slice = read_chunk(&mut file, 3, 4).unwrap();
        assert_eq!(slice, b"3456");

        // Handle is rewound, so a caller reading from the start still sees byte 0.
        let mut buf = [0u8; 1];
        file.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], b'0');
    }

    #[test]
    fn read_chunk_truncates_at_eof() {
        let dir = scratch_dir("eof");
        let path = dir.join("short.bin");
        fs::write(&path, b"abc").unwrap();

        let mut file = File::open(&path).unwrap();
        let slice = read_chunk(&mut file, 1, 100).unwrap();
        assert_eq!(slice, b"bc");
    }

    #[test]
    fn file_size_reports_byte_length() {
        let dir = scratch_dir("size");
        let path = dir.join("sized.bin");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"twelve bytes").unwrap();
        drop(f);

        let file = File::open(&path).unwrap();
        assert_eq!(file_size(&file).unwrap(), 12);
    }
}
