//! Plain-text notes under `/notes`.
//!
//! A note's title is its file name without `.txt`. Titles compare
//! case-insensitively, since the card's FAT file system does too.

use heapless::{String, Vec};
use platform::config::NOTES_ROOT;
use platform::storage::{extension, stem, NameBuf};
use platform::Storage;

use crate::error::io;
use crate::fs::{atomic_write, ensure_dir, read_file};
use crate::paths::note_path;
use crate::StoreError;

/// Notes listed per directory.
pub const MAX_NOTES: usize = 64;

/// Longest title accepted from the keyboard.
pub const MAX_TITLE: usize = 40;

/// Note file names, sorted case-insensitively.
pub type NoteList = Vec<NameBuf, MAX_NOTES>;

fn is_note(name: &str) -> bool {
    extension(name).is_some_and(|e| e.eq_ignore_ascii_case("txt"))
}

/// Title shown for a note file.
pub fn title_of(file_name: &str) -> &str {
    if is_note(file_name) {
        stem(file_name)
    } else {
        file_name
    }
}

/// Validate a user-entered title and turn it into a file name.
///
/// Accepts letters, digits, space and `-_.()`; rejects empty titles,
/// leading dots and anything longer than [`MAX_TITLE`]. A `.txt` suffix
/// typed by the user is kept as-is.
pub fn file_name_for(title: &str) -> Result<NameBuf, StoreError> {
    let title = title.trim();
    let base = if is_note(title) { stem(title) } else { title };
    if base.is_empty() || base.starts_with('.') || base.chars().count() > MAX_TITLE {
        return Err(StoreError::InvalidName);
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || " -_.()".contains(c);
    if !base.chars().all(allowed) {
        return Err(StoreError::InvalidName);
    }
    let mut out = NameBuf::new();
    if is_note(title) {
        out.push_str(title).map_err(|_| StoreError::InvalidName)?;
    } else {
        out.push_str(base).map_err(|_| StoreError::InvalidName)?;
        out.push_str(".txt").map_err(|_| StoreError::InvalidName)?;
    }
    Ok(out)
}

/// List note files (`*.txt` / `*.TXT`), sorted case-insensitively.
pub async fn list<S: Storage>(sd: &mut S) -> Result<NoteList, StoreError> {
    let mut out = NoteList::new();
    if !sd.exists(NOTES_ROOT).await.map_err(io)? {
        return Ok(out);
    }
    sd.list_dir(NOTES_ROOT, |entry| {
        if !entry.is_dir && !entry.is_hidden() && is_note(&entry.name) {
            if out.push(entry.name.clone()).is_err() {
                tracing::warn!("notes: more than {} notes, list truncated", MAX_NOTES);
            }
        }
    })
    .await
    .map_err(io)?;
    out.sort_unstable_by(|a, b| cmp_ignore_case(a, b));
    Ok(out)
}

fn cmp_ignore_case(a: &str, b: &str) -> core::cmp::Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// The existing note whose file name matches `file_name` case-insensitively.
async fn find_clash<S: Storage>(
    sd: &mut S,
    file_name: &str,
    except: Option<&str>,
) -> Result<bool, StoreError> {
    let notes = list(sd).await?;
    Ok(notes.iter().any(|n| {
        n.eq_ignore_ascii_case(file_name) && except.map_or(true, |e| !n.eq_ignore_ascii_case(e))
    }))
}

/// Create an empty note; returns its file name.
pub async fn create<S: Storage>(sd: &mut S, title: &str) -> Result<NameBuf, StoreError> {
    let name = file_name_for(title)?;
    ensure_dir(sd, NOTES_ROOT).await?;
    if find_clash(sd, &name, None).await? {
        return Err(StoreError::Exists);
    }
    sd.write_file(&note_path(&name)?, &[]).await.map_err(io)?;
    tracing::info!("notes: created {}", name.as_str());
    Ok(name)
}

/// Load a note into `buf`; returns the byte length.
pub async fn load<S: Storage>(sd: &mut S, file_name: &str, buf: &mut [u8]) -> Result<usize, StoreError> {
    read_file(sd, &note_path(file_name)?, buf)
        .await?
        .ok_or(StoreError::NotFound)
}

/// Overwrite a note with `data`.
pub async fn save<S: Storage>(sd: &mut S, file_name: &str, data: &[u8]) -> Result<(), StoreError> {
    ensure_dir(sd, NOTES_ROOT).await?;
    atomic_write(sd, &note_path(file_name)?, data).await
}

/// Rename note `from` to the title `to`; returns the new file name.
///
/// Fails with [`StoreError::Exists`] if another note already has that name
/// (ignoring case) and leaves the card untouched.
pub async fn rename<S: Storage>(sd: &mut S, from: &str, to: &str) -> Result<NameBuf, StoreError> {
    let name = file_name_for(to)?;
    if name.as_str() == from {
        return Ok(name);
    }
    if find_clash(sd, &name, Some(from)).await? {
        return Err(StoreError::Exists);
    }
    let src = note_path(from)?;
    if !sd.exists(&src).await.map_err(io)? {
        return Err(StoreError::NotFound);
    }
    sd.rename(&src, &note_path(&name)?).await.map_err(io)?;
    tracing::info!("notes: renamed {} -> {}", from, name.as_str());
    Ok(name)
}

/// Delete a note.
pub async fn delete<S: Storage>(sd: &mut S, file_name: &str) -> Result<(), StoreError> {
    let path = note_path(file_name)?;
    if !sd.exists(&path).await.map_err(io)? {
        return Err(StoreError::NotFound);
    }
    sd.remove(&path).await.map_err(io)
}

/// Title with its length capped for a list row.
pub fn display_title(file_name: &str) -> String<MAX_TITLE> {
    let mut out = String::new();
    for c in title_of(file_name).chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MemStorage;

    #[test]
    fn test_file_name_rules() {
        assert_eq!(file_name_for("groceries").unwrap().as_str(), "groceries.txt");
        assert_eq!(file_name_for(" Plan B.TXT ").unwrap().as_str(), "Plan B.TXT");
        assert_eq!(file_name_for(""), Err(StoreError::InvalidName));
        assert_eq!(file_name_for(".hidden"), Err(StoreError::InvalidName));
        assert_eq!(file_name_for("a/b"), Err(StoreError::InvalidName));
        assert_eq!(file_name_for(&"x".repeat(41)), Err(StoreError::InvalidName));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let fs = MemStorage::new();
        fs.insert("/notes/beta.txt", b"");
        fs.insert("/notes/Alpha.TXT", b"");
        fs.insert("/notes/._Alpha.TXT", b"");
        fs.insert("/notes/image.png", b"");
        let mut sd = fs.clone();
        let notes = list(&mut sd).await.unwrap();
        let names: Vec<&str, 8> = notes.iter().map(|n| n.as_str()).collect();
        assert_eq!(names.as_slice(), &["Alpha.TXT", "beta.txt"]);
    }

    #[tokio::test]
    async fn test_create_rejects_case_insensitive_duplicate() {
        let fs = MemStorage::new();
        fs.insert("/notes/Todo.txt", b"x");
        let mut sd = fs.clone();
        assert_eq!(create(&mut sd, "todo").await, Err(StoreError::Exists));
        assert_eq!(create(&mut sd, "ideas").await.unwrap().as_str(), "ideas.txt");
        assert!(fs.contains("/notes/ideas.txt"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let fs = MemStorage::new();
        let mut sd = fs.clone();
        save(&mut sd, "n.txt", b"line one\nline two").await.unwrap();
        let mut buf = [0u8; 64];
        let n = load(&mut sd, "n.txt", &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"line one\nline two");
        assert_eq!(load(&mut sd, "gone.txt", &mut buf).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_rename_to_own_name_with_other_case() {
        let fs = MemStorage::new();
        fs.insert("/notes/draft.txt", b"d");
        let mut sd = fs.clone();
        let name = rename(&mut sd, "draft.txt", "Draft").await.unwrap();
        assert_eq!(name.as_str(), "Draft.txt");
        assert!(fs.contains("/notes/Draft.txt"));
    }

    #[tokio::test]
    async fn test_delete() {
        let fs = MemStorage::new();
        fs.insert("/notes/old.txt", b"");
        let mut sd = fs.clone();
        delete(&mut sd, "old.txt").await.unwrap();
        assert!(!fs.contains("/notes/old.txt"));
        assert_eq!(delete(&mut sd, "old.txt").await, Err(StoreError::NotFound));
    }
}
