//! On-disk snapshots.
//!
//! ```text
//! <root>/CURRENT                  name of the live snapshot directory
//! <root>/snapshots/<name>/index.bin
//! <root>/snapshots/<name>/meta.json
//! ```
//!
//! Each save writes a complete, uniquely named snapshot directory and then
//! replaces `CURRENT` with a single rename, so readers always see a matching
//! `index.bin`/`meta.json` pair even when saves overlap.

use crate::config::INDEX_FORMAT_VERSION;
use crate::tokenizer::Analyzer;
use crate::Index;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    pub analyzer: Analyzer,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn current(&self) -> PathBuf { self.root.join("CURRENT") }
    fn snapshots(&self) -> PathBuf { self.root.join("snapshots") }
    fn snapshot_dir(&self, name: &str) -> PathBuf { self.snapshots().join(name) }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    f.write_all(bytes)?;
    f.sync_all()?;
    Ok(())
}

/// Name of the snapshot `CURRENT` points at.
fn current_snapshot(paths: &IndexPaths) -> Result<String> {
    let raw = fs::read_to_string(paths.current()).with_context(|| format!("open {}", paths.current().display()))?;
    let name = raw.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        bail!("CURRENT holds an invalid snapshot name {name:?}");
    }
    Ok(name.to_string())
}

pub fn save_index(paths: &IndexPaths, index: &Index) -> Result<MetaFile> {
    create_dir_all(paths.snapshots())?;
    let bytes = bincode::serialize(index)?;
    let meta = MetaFile {
        num_docs: index.len() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: INDEX_FORMAT_VERSION,
        analyzer: index.analyzer(),
    };

    let dir = tempfile::Builder::new()
        .prefix("snapshot-")
        .tempdir_in(paths.snapshots())
        .context("create snapshot directory")?
        .into_path();
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .context("snapshot directory name is not utf-8")?;
    write_synced(&dir.join("index.bin"), &bytes)?;
    write_synced(&dir.join("meta.json"), serde_json::to_string_pretty(&meta)?.as_bytes())?;

    let mut pointer = NamedTempFile::new_in(&paths.root)?;
    pointer.write_all(name.as_bytes())?;
    pointer.as_file().sync_all()?;
    pointer
        .persist(paths.current())
        .with_context(|| format!("publish {}", paths.current().display()))?;

    tracing::info!(root = %paths.root.display(), snapshot = %name, num_docs = meta.num_docs, bytes = bytes.len(), "index saved");
    Ok(meta)
}

/// Delete every snapshot directory except the live one. Only safe when no other
/// save into the same root is in flight.
pub fn prune_snapshots(paths: &IndexPaths) -> Result<usize> {
    let live = current_snapshot(paths)?;
    let mut removed = 0;
    for entry in fs::read_dir(paths.snapshots())? {
        let entry = entry?;
        if entry.file_name().to_str() == Some(live.as_str()) || !entry.file_type()?.is_dir() {
            continue;
        }
        fs::remove_dir_all(entry.path())?;
        removed += 1;
    }
    if removed > 0 {
        tracing::debug!(removed, live = %live, "pruned old snapshots");
    }
    Ok(removed)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let dir = paths.snapshot_dir(&current_snapshot(paths)?);
    read_meta(&dir)
}

fn read_meta(dir: &Path) -> Result<MetaFile> {
    let path = dir.join("meta.json");
    let mut f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Load the live snapshot, checking it against its meta file.
pub fn load_index(paths: &IndexPaths) -> Result<Index> {
    let dir = paths.snapshot_dir(&current_snapshot(paths)?);
    let meta = read_meta(&dir)?;
    if meta.version != INDEX_FORMAT_VERSION {
        bail!("index format version {} is not supported (expected {})", meta.version, INDEX_FORMAT_VERSION);
    }
    let path = dir.join("index.bin");
    let mut f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let index: Index = bincode::deserialize(&buf)?;
    if index.len() as u32 != meta.num_docs {
        bail!("snapshot holds {} documents but meta.json says {}", index.len(), meta.num_docs);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, Field};

    fn corpus(n: u32) -> Index {
        Index::build((0..n).map(|i| Document::new(i, format!("title {i}"), format!("body number {i}"))).collect()).unwrap()
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let index = Index::build(vec![
            Document::new(0, "Cats and Dogs", "Cats are great pets"),
            Document::new(4, "Space News", "Rocket launch successful"),
        ])
        .unwrap();
        let meta = save_index(&paths, &index).unwrap();
        assert_eq!(meta.num_docs, 2);

        let loaded = load_index(&paths).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.df(Field::Content, "cats"), 1);
        assert_eq!(loaded.document(4).unwrap().title, "Space News");
    }

    #[test]
    fn later_save_replaces_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &corpus(3)).unwrap();
        save_index(&paths, &corpus(5)).unwrap();
        assert_eq!(load_index(&paths).unwrap().len(), 5);
        assert_eq!(load_meta(&paths).unwrap().num_docs, 5);
    }

    #[test]
    fn overlapping_saves_leave_a_loadable_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let small = corpus(3);
        let large = corpus(40);
        for _ in 0..100 {
            std::thread::scope(|s| {
                let a = s.spawn(|| save_index(&paths, &small));
                let b = s.spawn(|| save_index(&paths, &large));
                a.join().unwrap().unwrap();
                b.join().unwrap().unwrap();
            });
            let loaded = load_index(&paths).unwrap();
            assert!(loaded.len() == 3 || loaded.len() == 40);
            assert_eq!(load_meta(&paths).unwrap().num_docs as usize, loaded.len());
        }
    }

    #[test]
    fn prune_keeps_only_live_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &corpus(2)).unwrap();
        save_index(&paths, &corpus(3)).unwrap();
        save_index(&paths, &corpus(4)).unwrap();
        assert_eq!(prune_snapshots(&paths).unwrap(), 2);
        assert_eq!(fs::read_dir(dir.path().join("snapshots")).unwrap().count(), 1);
        assert_eq!(load_index(&paths).unwrap().len(), 4);
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &corpus(1)).unwrap();
        let mut meta = load_meta(&paths).unwrap();
        meta.version = 99;
        let live = paths.snapshot_dir(&current_snapshot(&paths).unwrap());
        fs::write(live.join("meta.json"), serde_json::to_string(&meta).unwrap()).unwrap();
        assert!(load_index(&paths).is_err());
    }

    #[test]
    fn rejects_escaping_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        fs::write(dir.path().join("CURRENT"), "../elsewhere").unwrap();
        assert!(load_index(&paths).is_err());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let paths = IndexPaths::new("/no/such/index/dir");
        assert!(load_index(&paths).is_err());
    }
}
