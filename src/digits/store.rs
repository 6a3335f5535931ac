//! Corpus store: one PNG per glyph plus an `index.json` sidecar.
//!
//! The index records `(id, tag, guess, file)` for every sample so tags no
//! longer have to be parsed out of file names. A directory without an index
//! is imported once from the legacy naming convention:
//! `<TAG>_<anything>.png`, `UNTAGGED_<anything>.png` and
//! `UNTAGGED_<guess>_<anything>.png`.

use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::calibration::preset::write_atomically;

/// Tag of a provisional sample awaiting a human decision.
pub const UNTAGGED: &str = "UNTAGGED";

const INDEX_FILE: &str = "index.json";
const LEGACY_PATTERN: &str = r"^([^_]+)_(.*)\.png$";

/// Fails unless `tag` can name corpus samples: ASCII letters and digits
/// only, and not [`UNTAGGED`].
///
/// Tags become part of sample file names, so this also keeps them from
/// leaving the store directory.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() || tag == UNTAGGED || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(anyhow!("Invalid tag: {:?}", tag));
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(anyhow!("Invalid sample id: {:?}", id));
    }
    Ok(())
}

/// One sample as recorded in the sidecar index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub tag: String,
    /// Best guess recorded when a provisional sample was captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guess: Option<String>,
    /// File name relative to the store directory
    pub file: String,
}

impl IndexEntry {
    pub fn is_provisional(&self) -> bool {
        self.tag == UNTAGGED
    }
}

/// Storage behind the digit corpus.
pub trait SampleStore {
    fn entries(&self) -> &[IndexEntry];
    fn load_image(&self, entry: &IndexEntry) -> Result<GrayImage>;
    /// Writes the image and records it; returns the new entry.
    fn insert(
        &mut self,
        id: &str,
        tag: &str,
        guess: Option<&str>,
        img: &GrayImage,
    ) -> Result<IndexEntry>;
    /// Assigns a (new) tag to a sample, clearing any guess.
    fn retag(&mut self, id: &str, tag: &str) -> Result<()>;
    fn remove(&mut self, id: &str) -> Result<()>;
}

/// Directory-backed store.
pub struct DirSampleStore {
    dir: PathBuf,
    entries: Vec<IndexEntry>,
}

impl DirSampleStore {
    /// Opens the store, importing legacy file names when no index exists yet.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create corpus directory: {}", dir.display()))?;

        let index_path = dir.join(INDEX_FILE);
        if index_path.exists() {
            let contents = fs::read_to_string(&index_path)
                .with_context(|| format!("Failed to read {}", index_path.display()))?;
            let entries = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", index_path.display()))?;
            return Ok(Self { dir, entries });
        }

        let mut store = Self {
            dir,
            entries: Vec::new(),
        };
        let imported = store.import_legacy()?;
        crate::log(&format!("Imported {} legacy sample(s) into a new index", imported));
        Ok(store)
    }

    /// Adds every legacy-named file that the index does not know yet.
    /// Names that do not follow the convention are ignored.
    pub fn import_legacy(&mut self) -> Result<usize> {
        let pattern = Regex::new(LEGACY_PATTERN)?;
        let mut names: Vec<String> = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();

        let mut imported = 0;
        for name in names {
            if self.entries.iter().any(|e| e.file == name) {
                continue;
            }
            let Some(entry) = parse_legacy_name(&pattern, &name) else {
                continue;
            };
            self.entries.push(entry);
            imported += 1;
        }

        self.write_index()?;
        Ok(imported)
    }

    fn write_index(&self) -> Result<()> {
        let json =
            serde_json::to_string_pretty(&self.entries).context("Failed to serialize index")?;
        write_atomically(&self.dir.join(INDEX_FILE), json.as_bytes())
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| anyhow!("No sample with id {}", id))
    }
}

fn parse_legacy_name(pattern: &Regex, name: &str) -> Option<IndexEntry> {
    let caps = pattern.captures(name)?;
    let tag = caps.get(1)?.as_str().to_string();
    let rest = caps.get(2)?.as_str();

    let guess = if tag == UNTAGGED {
        match rest.split_once('_') {
            Some((guess, tail)) if !guess.is_empty() && !tail.is_empty() => {
                Some(guess.to_string())
            }
            _ => None,
        }
    } else {
        None
    };

    Some(IndexEntry {
        id: name.trim_end_matches(".png").to_string(),
        tag,
        guess,
        file: name.to_string(),
    })
}

impl SampleStore for DirSampleStore {
    fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    fn load_image(&self, entry: &IndexEntry) -> Result<GrayImage> {
        let path = self.dir.join(&entry.file);
        Ok(image::open(&path)
            .with_context(|| format!("Failed to load sample: {}", path.display()))?
            .to_luma8())
    }

    fn insert(
        &mut self,
        id: &str,
        tag: &str,
        guess: Option<&str>,
        img: &GrayImage,
    ) -> Result<IndexEntry> {
        validate_id(id)?;
        if tag != UNTAGGED {
            validate_tag(tag)?;
        }
        if let Some(guess) = guess {
            validate_tag(guess)?;
        }

        let file = match guess {
            Some(guess) => format!("{}_{}_{}.png", tag, guess, id),
            None => format!("{}_{}.png", tag, id),
        };
        let path = self.dir.join(&file);
        img.save(&path)
            .with_context(|| format!("Failed to save sample: {}", path.display()))?;

        let entry = IndexEntry {
            id: id.to_string(),
            tag: tag.to_string(),
            guess: guess.map(str::to_string),
            file,
        };
        self.entries.push(entry.clone());
        self.write_index()?;
        Ok(entry)
    }

    fn retag(&mut self, id: &str, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        let pos = self.position(id)?;
        let entry = &mut self.entries[pos];
        entry.tag = tag.to_string();
        entry.guess = None;
        self.write_index()
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let pos = self.position(id)?;
        let entry = self.entries.remove(pos);
        let path = self.dir.join(&entry.file);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to delete {}", path.display()));
            }
        }
        self.write_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use tempfile::tempdir;

    fn square() -> GrayImage {
        GrayImage::from_pixel(4, 6, Luma([255]))
    }

    #[test]
    fn test_parse_legacy_names() {
        let pattern = Regex::new(LEGACY_PATTERN).unwrap();

        let tagged = parse_legacy_name(&pattern, "3_abc.png").unwrap();
        assert_eq!((tagged.tag.as_str(), tagged.guess), ("3", None));
        assert_eq!(tagged.id, "3_abc");

        let plain = parse_legacy_name(&pattern, "UNTAGGED_1f2e-77.png").unwrap();
        assert!(plain.is_provisional());
        assert_eq!(plain.guess, None);

        let guessed = parse_legacy_name(&pattern, "UNTAGGED_12_1f2e-77.png").unwrap();
        assert_eq!(guessed.guess.as_deref(), Some("12"));

        assert!(parse_legacy_name(&pattern, "notes.txt").is_none());
        assert!(parse_legacy_name(&pattern, "nounderscore.png").is_none());
        assert!(parse_legacy_name(&pattern, "_3.png").is_none());
    }

    #[test]
    fn test_open_imports_legacy_once() {
        let dir = tempdir().unwrap();
        square().save(dir.path().join("3_a.png")).unwrap();
        square().save(dir.path().join("UNTAGGED_5_b.png")).unwrap();
        fs::write(dir.path().join("README"), "ignored").unwrap();

        let store = DirSampleStore::open(dir.path()).unwrap();
        assert_eq!(store.entries().len(), 2);
        assert!(dir.path().join(INDEX_FILE).exists());

        // A file added later under the legacy convention is not picked up
        // implicitly once the index exists.
        square().save(dir.path().join("4_c.png")).unwrap();
        let mut store = DirSampleStore::open(dir.path()).unwrap();
        assert_eq!(store.entries().len(), 2);
        assert_eq!(store.import_legacy().unwrap(), 1);
        assert_eq!(store.entries().len(), 3);
    }

    #[test]
    fn test_insert_retag_remove() {
        let dir = tempdir().unwrap();
        let mut store = DirSampleStore::open(dir.path()).unwrap();

        let entry = store.insert("id1", UNTAGGED, Some("7"), &square()).unwrap();
        assert_eq!(entry.file, "UNTAGGED_7_id1.png");
        assert!(dir.path().join(&entry.file).exists());
        assert_eq!(store.load_image(&entry).unwrap().dimensions(), (4, 6));

        store.retag("id1", "7").unwrap();
        let reopened = DirSampleStore::open(dir.path()).unwrap();
        assert_eq!(reopened.entries()[0].tag, "7");
        assert_eq!(reopened.entries()[0].guess, None);

        store.remove("id1").unwrap();
        assert!(!dir.path().join("UNTAGGED_7_id1.png").exists());
        assert!(DirSampleStore::open(dir.path()).unwrap().entries().is_empty());
    }

    #[test]
    fn test_validate_tag() {
        for tag in ["1", "12", "Z"] {
            assert!(validate_tag(tag).is_ok(), "{}", tag);
        }
        for tag in ["", UNTAGGED, "1_2", "../escaped", "a/b", "a\\b", ".", "..", "1 "] {
            assert!(validate_tag(tag).is_err(), "{:?}", tag);
        }
    }

    #[test]
    fn test_insert_and_retag_reject_bad_names() {
        let dir = tempdir().unwrap();
        let store_dir = dir.path().join("digits");
        let mut store = DirSampleStore::open(&store_dir).unwrap();

        assert!(store.insert("id1", "../escaped", None, &square()).is_err());
        assert!(store.insert("id1", UNTAGGED, Some("../7"), &square()).is_err());
        assert!(store.insert("../id1", "3", None, &square()).is_err());
        assert!(store.entries().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(fs::read_dir(&store_dir).unwrap().count(), 1);

        store.insert("id1", "3", None, &square()).unwrap();
        assert!(store.retag("id1", UNTAGGED).is_err());
        assert!(store.retag("id1", "a_b").is_err());
        assert_eq!(store.entries()[0].tag, "3");
    }

    #[test]
    fn test_unknown_id_is_error() {
        let dir = tempdir().unwrap();
        let mut store = DirSampleStore::open(dir.path()).unwrap();
        assert!(store.retag("missing", "1").is_err());
        assert!(store.remove("missing").is_err());
    }
}
