use crate::pipeline::Variant;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while persisting variants.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An I/O error from the output directory tree.
    #[error("Store I/O error: {0}")]
    Io(String),

    /// A report or the index could not be encoded.
    #[error("Store serialization error: {0}")]
    Serialization(String),

    /// An existing index could not be read back.
    #[error("Store deserialization error: {0}")]
    Deserialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(format!("JSON operation error: {}", err))
    }
}

/// Index record for a variant written by [`OnDiskStore`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredVariant {
    pub seed: u64,
    pub tiff_path: PathBuf,
    /// `None` when the corrupted container could not be rendered.
    pub png_path: Option<PathBuf>,
    pub metadata_path: PathBuf,
    pub error: Option<String>,
}

/// A destination for generated variants.
pub trait VariantStore {
    /// Persists a variant.
    ///
    /// # Arguments
    /// * `variant`: The variant to store. Unrendered variants are accepted;
    ///   how their missing image is recorded is up to the store.
    ///
    /// # Returns
    /// `Result<usize, StoreError>`:
    ///   - `Ok(id)`: The variant's position in the store. Stores keyed by seed
    ///     return the existing position when a seed is stored again.
    ///   - `Err(error)`: If writing the variant or its bookkeeping failed.
    fn add(&mut self, variant: &Variant) -> Result<usize, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps variants in memory, for callers that ship the bytes elsewhere.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Vec<Variant>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, id: usize) -> Option<&Variant> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.entries.iter()
    }
}

impl VariantStore for InMemoryStore {
    fn add(&mut self, variant: &Variant) -> Result<usize, StoreError> {
        let id = self.entries.len();
        self.entries.push(variant.clone());
        Ok(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Writes each variant into `<root>/<source stem>/`:
///
/// * `glitch_<seed>.tiff` — the corrupted container
/// * `glitch_<seed>.png` — only when rendering succeeded
/// * `glitch_<seed>_metadata.txt` — the text report
/// * `glitch_<seed>.json` — the JSON report, if enabled
///
/// plus an `index.json` describing every stored variant. Re-opening a
/// directory reloads its index; storing a seed again replaces its entry.
pub struct OnDiskStore {
    output_dir: PathBuf,
    index_file_path: PathBuf,
    entries: Vec<StoredVariant>,
    write_json: bool,
}

impl OnDiskStore {
    const INDEX_FILENAME: &'static str = "index.json";

    /// Opens (creating if needed) the output directory for one source.
    ///
    /// # Arguments
    /// * `root`: Directory holding one subdirectory per source.
    /// * `source_filename`: Name of the source; its stem names the
    ///   subdirectory, falling back to `source` when it has none.
    /// * `write_json`: Whether `glitch_<seed>.json` reports are written.
    ///
    /// # Returns
    /// The store, with any existing `index.json` already loaded. Fails if the
    /// directory cannot be created, a file occupies its path, or the existing
    /// index cannot be parsed.
    pub fn new(root: &Path, source_filename: &str, write_json: bool) -> Result<Self, StoreError> {
        let stem = Path::new(source_filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "source".to_string());
        let output_dir = root.join(stem);

        if !output_dir.exists() {
            fs::create_dir_all(&output_dir).map_err(|e| {
                StoreError::Io(format!(
                    "Failed to create output directory at {:?}: {}",
                    output_dir, e
                ))
            })?;
        } else if !output_dir.is_dir() {
            return Err(StoreError::Io(format!(
                "Output path {:?} exists but is not a directory",
                output_dir
            )));
        }

        let index_file_path = output_dir.join(Self::INDEX_FILENAME);
        let mut store = Self {
            output_dir,
            index_file_path,
            entries: Vec::new(),
            write_json,
        };
        store.load_index_from_disk()?;
        Ok(store)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn entries(&self) -> &[StoredVariant] {
        &self.entries
    }

    fn file_path(&self, seed: u64, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("glitch_{seed}{suffix}"))
    }

    fn load_index_from_disk(&mut self) -> Result<(), StoreError> {
        if !self.index_file_path.exists() {
            return Ok(());
        }
        let file = File::open(&self.index_file_path)?;
        self.entries = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            StoreError::Deserialization(format!(
                "Failed to parse index {:?}: {}",
                self.index_file_path, e
            ))
        })?;
        debug!(
            "loaded {} stored variant(s) from {:?}",
            self.entries.len(),
            self.index_file_path
        );
        Ok(())
    }

    fn save_index_to_disk(&self) -> Result<(), StoreError> {
        let file = File::create(&self.index_file_path).map_err(|e| {
            StoreError::Io(format!(
                "Failed to create or truncate index file {:?}: {}",
                self.index_file_path, e
            ))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.entries).map_err(|e| {
            StoreError::Serialization(format!(
                "Failed to serialize index to JSON for {:?}: {}",
                self.index_file_path, e
            ))
        })?;
        writer.flush().map_err(|e| {
            StoreError::Io(format!(
                "Failed to flush index file {:?}: {}",
                self.index_file_path, e
            ))
        })
    }
}

impl VariantStore for OnDiskStore {
    fn add(&mut self, variant: &Variant) -> Result<usize, StoreError> {
        let seed = variant.seed;

        let tiff_path = self.file_path(seed, ".tiff");
        fs::write(&tiff_path, variant.container())?;

        let png_path = self.file_path(seed, ".png");
        let png_path = match variant.png() {
            Some(png) => {
                fs::write(&png_path, png)?;
                Some(png_path)
            }
            None => {
                // Drop a stale image from an earlier run of the same seed.
                if png_path.exists() {
                    fs::remove_file(&png_path)?;
                }
                None
            }
        };

        let metadata_path = self.file_path(seed, "_metadata.txt");
        fs::write(&metadata_path, variant.report.to_string())?;

        if self.write_json {
            fs::write(self.file_path(seed, ".json"), variant.report.to_json()?)?;
        }

        let record = StoredVariant {
            seed,
            tiff_path,
            png_path,
            metadata_path,
            error: variant.report.error.clone(),
        };

        let id = match self.entries.iter().position(|e| e.seed == seed) {
            Some(existing) => {
                self.entries[existing] = record;
                existing
            }
            None => {
                self.entries.push(record);
                self.entries.len() - 1
            }
        };
        self.save_index_to_disk()?;
        Ok(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
