//! Read/write conventions shared by every persisted file.

use heapless::{String, Vec};
use platform::storage::PathBuf;
use platform::Storage;

use crate::error::io;
use crate::StoreError;

/// Longest text line read or written by the line helpers.
pub const MAX_LINE: usize = 320;

const CHUNK: usize = 128;

/// Suffix of the staging file written by [`atomic_write`].
pub const TEMP_SUFFIX: &str = ".tmp";

fn temp_path(path: &str) -> Result<PathBuf, StoreError> {
    let mut tmp = PathBuf::new();
    tmp.push_str(path).map_err(|_| StoreError::PathTooLong)?;
    tmp.push_str(TEMP_SUFFIX).map_err(|_| StoreError::PathTooLong)?;
    Ok(tmp)
}

/// Replace `path` with `data`.
///
/// The data goes to `<path>.tmp` first. Only once that write succeeded is the
/// old file removed and the staging file renamed over it, so at every point
/// one complete copy is on the card. Readers pick up an orphaned staging file
/// through [`recover`].
pub async fn atomic_write<S: Storage>(sd: &mut S, path: &str, data: &[u8]) -> Result<(), StoreError> {
    let tmp = temp_path(path)?;
    if sd.exists(&tmp).await.map_err(io)? {
        sd.remove(&tmp).await.map_err(io)?;
    }
    sd.write_file(&tmp, data).await.map_err(io)?;
    if sd.exists(path).await.map_err(io)? {
        sd.remove(path).await.map_err(io)?;
    }
    sd.rename(&tmp, path).await.map_err(io)
}

/// Finish an [`atomic_write`] cut off between removing `path` and renaming
/// its staging file. Returns `true` if `path` was restored.
pub async fn recover<S: Storage>(sd: &mut S, path: &str) -> Result<bool, StoreError> {
    let tmp = temp_path(path)?;
    if !sd.exists(&tmp).await.map_err(io)? || sd.exists(path).await.map_err(io)? {
        return Ok(false);
    }
    tracing::warn!("sd: restoring {} from interrupted write", path);
    sd.rename(&tmp, path).await.map_err(io)?;
    Ok(true)
}

/// Size of `path`, restoring it from a staging file when it is missing.
async fn size_or_recover<S: Storage>(sd: &mut S, path: &str) -> Result<Option<u64>, StoreError> {
    if let Some(size) = sd.file_size(path).await.map_err(io)? {
        return Ok(Some(size));
    }
    if recover(sd, path).await? {
        return sd.file_size(path).await.map_err(io);
    }
    Ok(None)
}

/// Read the whole of `path` into `buf`.
///
/// Returns `Ok(None)` if the file does not exist and
/// [`StoreError::TooLarge`] if it does not fit.
pub async fn read_file<S: Storage>(
    sd: &mut S,
    path: &str,
    buf: &mut [u8],
) -> Result<Option<usize>, StoreError> {
    let Some(size) = size_or_recover(sd, path).await? else {
        return Ok(None);
    };
    let size = usize::try_from(size).map_err(|_| StoreError::TooLarge)?;
    let dst = buf.get_mut(..size).ok_or(StoreError::TooLarge)?;
    let mut filled = 0usize;
    while filled < size {
        let rest = dst.get_mut(filled..).unwrap_or(&mut []);
        let n = sd.read_at(path, filled as u64, rest).await.map_err(io)?;
        if n == 0 {
            break;
        }
        filled = filled.saturating_add(n);
    }
    Ok(Some(filled))
}

/// Create `path` as a directory unless it already exists.
pub async fn ensure_dir<S: Storage>(sd: &mut S, path: &str) -> Result<(), StoreError> {
    if !sd.exists(path).await.map_err(io)? {
        sd.create_dir(path).await.map_err(io)?;
    }
    Ok(())
}

/// Stream `path` line by line (`\n` separated, trailing `\r` stripped).
///
/// `visit` returns `false` to stop early. Lines longer than [`MAX_LINE`] are
/// truncated and lines that are not valid UTF-8 are skipped. Returns
/// `Ok(false)` when the file does not exist.
pub async fn for_each_line<S, F>(sd: &mut S, path: &str, mut visit: F) -> Result<bool, StoreError>
where
    S: Storage,
    F: FnMut(&str) -> bool,
{
    let Some(size) = size_or_recover(sd, path).await? else {
        return Ok(false);
    };
    let mut line: Vec<u8, MAX_LINE> = Vec::new();
    let mut chunk = [0u8; CHUNK];
    let mut offset = 0u64;
    while offset < size {
        let n = sd.read_at(path, offset, &mut chunk).await.map_err(io)?;
        if n == 0 {
            break;
        }
        offset = offset.saturating_add(n as u64);
        for &b in chunk.iter().take(n) {
            if b == b'\n' {
                if !emit(&mut line, &mut visit) {
                    return Ok(true);
                }
            } else {
                let _ = line.push(b);
            }
        }
    }
    if !line.is_empty() {
        emit(&mut line, &mut visit);
    }
    Ok(true)
}

fn emit<F: FnMut(&str) -> bool>(line: &mut Vec<u8, MAX_LINE>, visit: &mut F) -> bool {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    let keep_going = match core::str::from_utf8(line) {
        Ok(text) => visit(text),
        Err(_) => true,
    };
    line.clear();
    keep_going
}

/// Replace `path` with `lines`, one per `\n`-terminated line.
pub async fn write_lines<'a, S, I>(sd: &mut S, path: &str, lines: I) -> Result<(), StoreError>
where
    S: Storage,
    I: IntoIterator<Item = &'a str>,
{
    let mut first = true;
    for text in lines {
        let mut line: String<{ MAX_LINE + 1 }> = String::new();
        for c in text.chars() {
            if line.len().saturating_add(c.len_utf8()) >= MAX_LINE {
                break;
            }
            let _ = line.push(c);
        }
        let _ = line.push('\n');
        if first {
            atomic_write(sd, path, line.as_bytes()).await?;
            first = false;
        } else {
            sd.append(path, line.as_bytes()).await.map_err(io)?;
        }
    }
    if first {
        atomic_write(sd, path, &[]).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::{MemStorage, StorageOp};

    #[tokio::test]
    async fn test_atomic_write_stages_then_renames() {
        let fs = MemStorage::new();
        fs.insert("/web/wifi.cfg", b"old contents that are longer");
        let mut sd = fs.clone();
        atomic_write(&mut sd, "/web/wifi.cfg", b"new").await.unwrap();
        assert_eq!(fs.get("/web/wifi.cfg").unwrap(), b"new");
        assert!(!fs.contains("/web/wifi.cfg.tmp"));
        assert_eq!(fs.count_path(StorageOp::Write, "/web/wifi.cfg.tmp"), 1);
        assert_eq!(fs.count(StorageOp::Rename), 1);
    }

    #[tokio::test]
    async fn test_failed_stage_write_keeps_old_file() {
        let fs = MemStorage::new();
        fs.insert("/settings.bin", b"old");
        let mut sd = fs.clone();
        fs.fail_next(StorageOp::Write);
        assert_eq!(atomic_write(&mut sd, "/settings.bin", b"new").await, Err(StoreError::Io));
        assert_eq!(fs.get("/settings.bin").unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_failed_rename_recovered_on_next_read() {
        let fs = MemStorage::new();
        fs.insert("/settings.bin", b"old");
        let mut sd = fs.clone();
        fs.fail_next(StorageOp::Rename);
        assert!(atomic_write(&mut sd, "/settings.bin", b"new").await.is_err());
        assert!(!fs.contains("/settings.bin"));

        let mut buf = [0u8; 8];
        assert_eq!(read_file(&mut sd, "/settings.bin", &mut buf).await, Ok(Some(3)));
        assert_eq!(&buf[..3], b"new");
        assert!(!fs.contains("/settings.bin.tmp"));
        assert!(!recover(&mut sd, "/settings.bin").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_file_missing_and_too_large() {
        let fs = MemStorage::new();
        fs.insert("/a.bin", &[7u8; 10]);
        let mut sd = fs.clone();
        let mut small = [0u8; 4];
        assert_eq!(read_file(&mut sd, "/missing", &mut small).await, Ok(None));
        assert_eq!(
            read_file(&mut sd, "/a.bin", &mut small).await,
            Err(StoreError::TooLarge)
        );
        let mut big = [0u8; 16];
        assert_eq!(read_file(&mut sd, "/a.bin", &mut big).await, Ok(Some(10)));
    }

    #[tokio::test]
    async fn test_lines_round_trip_across_chunks() {
        let fs = MemStorage::new();
        fs.mkdirs("/web");
        let mut sd = fs.clone();
        let long = "x".repeat(200);
        write_lines(&mut sd, "/web/h.txt", ["one", long.as_str(), "three"])
            .await
            .unwrap();
        let mut seen = std::vec::Vec::new();
        for_each_line(&mut sd, "/web/h.txt", |l| {
            seen.push(l.to_string());
            true
        })
        .await
        .unwrap();
        assert_eq!(seen, ["one", long.as_str(), "three"]);
    }

    #[tokio::test]
    async fn test_crlf_and_early_stop() {
        let fs = MemStorage::new();
        fs.insert("/t.txt", b"a\r\nb\r\nc");
        let mut sd = fs.clone();
        let mut seen = std::vec::Vec::new();
        for_each_line(&mut sd, "/t.txt", |l| {
            seen.push(l.to_string());
            seen.len() < 2
        })
        .await
        .unwrap();
        assert_eq!(seen, ["a", "b"]);
        assert!(!for_each_line(&mut sd, "/none.txt", |_| true).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_lines_empty_truncates() {
        let fs = MemStorage::new();
        fs.insert("/t.txt", b"stale\n");
        let mut sd = fs.clone();
        write_lines(&mut sd, "/t.txt", core::iter::empty()).await.unwrap();
        assert_eq!(fs.get("/t.txt").unwrap(), b"");
    }
}
