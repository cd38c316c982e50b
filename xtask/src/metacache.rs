//! xtask metacache: pre-seed `.metacache` files for a local audiobook folder.
//!
//! `--dir` stands in for the card's `/audiobooks`. Every directory below it
//! gets a v1 cache whose titles come from the file names, the same way the
//! device derives them when a file carries no tags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use library::title::from_file_name;
use library::track::bounded;
use library::{CacheEntry, MediaKind, MetaCache};
use platform::storage_local::LocalFileStorage;
use walkdir::WalkDir;

/// Entry point called from main.rs
pub fn run(dir: &Path) -> Result<()> {
    println!("{}", format!("Indexing {}", dir.display()).cyan());
    let written = write_all(dir)?;
    let files: usize = written.iter().map(|(_, n)| n).sum();
    println!(
        "{}",
        format!("✓ {} cache files, {} entries", written.len(), files).green()
    );
    Ok(())
}

/// Write a cache into `root` and each non-hidden directory below it.
/// Returns each card-relative directory with its entry count.
pub(crate) fn write_all(root: &Path) -> Result<Vec<(String, usize)>> {
    let root_str = root
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("folder path is not UTF-8"))?;
    let mut card = LocalFileStorage::new(root_str);
    let mut written = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let card_dir = card_path(root, entry.path())?;
        let cache = build(entry.path(), entry.depth() > 0)?;
        let count = cache.entries().len();
        embassy_futures::block_on(cache.save(&mut card, &card_dir))
            .map_err(|e| anyhow::anyhow!("{card_dir}: {e}"))?;
        println!("  {} {} ({} files)", "wrote".green(), card_dir, count);
        written.push((card_dir, count));
    }
    Ok(written)
}

/// Cache for the playable files directly inside `dir`.
pub(crate) fn build(dir: &Path, in_subdir: bool) -> Result<MetaCache> {
    let mut files: Vec<(String, u64, MediaKind)> = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            eprintln!("  {} non-UTF-8 name in {}", "skip".yellow(), dir.display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if let Some(kind) = MediaKind::from_name(&name) {
            files.push((name, meta.len(), kind));
        }
    }
    files.sort_by_key(|(name, _, _)| name.to_ascii_lowercase());

    let mut cache = MetaCache::new();
    for (name, size, kind) in files {
        cache.insert(CacheEntry {
            name: bounded(&name),
            size,
            title: from_file_name(&name, in_subdir),
            author: bounded(""),
            kind,
        });
    }
    Ok(cache)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// `/`-rooted path of `path` relative to `root`.
fn card_path(root: &Path, path: &Path) -> Result<String> {
    let rel: PathBuf = path.strip_prefix(root)?.to_path_buf();
    let mut out = String::from("/");
    let parts: Vec<&str> = rel
        .iter()
        .map(|c| c.to_str().ok_or_else(|| anyhow::anyhow!("non-UTF-8 directory name")))
        .collect::<Result<_>>()?;
    out.push_str(&parts.join("/"));
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use library::cache::HEADER;
    use std::fs;
    use tempfile::TempDir;

    fn seed(dir: &TempDir) {
        fs::write(dir.path().join("Solo Book.m4b"), [0u8; 10]).unwrap();
        fs::write(dir.path().join("cover.jpg"), b"JPEG").unwrap();
        let series = dir.path().join("Series");
        fs::create_dir_all(&series).unwrap();
        fs::write(series.join("Author - Series - 02 The Road.mp3"), [0u8; 7]).unwrap();
        fs::write(series.join("Author - Series - 01 The Start.mp3"), [0u8; 5]).unwrap();
        fs::create_dir_all(dir.path().join(".bookmarks")).unwrap();
    }

    #[test]
    fn root_titles_keep_full_stem() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp);
        let cache = build(tmp.path(), false).unwrap();
        assert_eq!(cache.entries().len(), 1);
        let e = &cache.entries()[0];
        assert_eq!(e.title.as_str(), "Solo Book");
        assert_eq!(e.size, 10);
        assert_eq!(e.kind, MediaKind::M4b);
    }

    #[test]
    fn subdir_titles_keep_last_segment_in_name_order() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp);
        let cache = build(&tmp.path().join("Series"), true).unwrap();
        let titles: Vec<&str> = cache.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["01 The Start", "02 The Road"]);
    }

    #[test]
    fn write_all_seeds_every_directory_but_hidden_ones() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp);
        let written = write_all(tmp.path()).unwrap();
        let dirs: Vec<&str> = written.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(dirs, ["/", "/Series"]);

        let text = fs::read_to_string(tmp.path().join("Series").join(".metacache")).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(
            lines.next(),
            Some("Author - Series - 01 The Start.mp3\t5\t01 The Start\t\tMP3")
        );
        assert!(!tmp.path().join(".bookmarks").join(".metacache").exists());
    }

    #[test]
    fn written_cache_loads_back_through_the_library() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp);
        write_all(tmp.path()).unwrap();
        let mut card = LocalFileStorage::new(tmp.path().to_str().unwrap());
        let mut cache = embassy_futures::block_on(MetaCache::load(&mut card, "/")).unwrap();
        assert!(cache.lookup("Solo Book.m4b", 10).is_some());
        assert!(cache.lookup("Solo Book.m4b", 11).is_none());
    }
}
