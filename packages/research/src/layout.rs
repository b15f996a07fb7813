//! On-disk layout for raw source artifacts.
//!
//! Layout, reproduced bit-for-bit for compatibility with existing data:
//!
//! ```text
//! rawSources/<SanitizedName>_<EntityId>/<family>[_<NNN>]/
//!     original.<ext>
//!     content.txt
//!     metadata.json
//! analyses/<id1>_<id2>/analysis.json
//! ```
//!
//! The wikipedia family is at-most-one-per-entity and gets a fixed directory
//! name; every other family gets a zero-padded ordinal.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::ident::{sanitize_entity_name, ENTITY_NAME_MAX};

/// A source family, naming the external dependency a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFamily {
    Wikipedia,
    Scholar,
    Arxiv,
}

impl SourceFamily {
    /// Directory name component for this family.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Wikipedia => "wikipedia",
            Self::Scholar => "scholar",
            Self::Arxiv => "arxiv",
        }
    }

    /// Whether this family gets a single fixed directory per entity.
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Wikipedia)
    }
}

impl std::fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Resolves and creates paths under the data root.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    data_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The data root every stored path is relative to.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn raw_sources_dir(&self) -> PathBuf {
        self.data_dir.join("rawSources")
    }

    pub fn analyses_dir(&self) -> PathBuf {
        self.data_dir.join("analyses")
    }

    /// Directory for one entity's sources, created on demand.
    ///
    /// `Isaac Newton` + `Q935` yields `rawSources/Isaac_Newton_Q935/`.
    pub fn entity_dir(&self, entity_label: &str, entity_id: &str) -> Result<PathBuf> {
        let safe_name = sanitize_entity_name(entity_label, ENTITY_NAME_MAX);
        let dir = self
            .raw_sources_dir()
            .join(format!("{}_{}", safe_name, entity_id));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Allocate a directory for one source within an entity directory.
    ///
    /// Singleton families get their fixed directory; the rest get the first
    /// free zero-padded ordinal (`scholar_001`, `scholar_002`, ...).
    pub fn allocate_source_dir(&self, entity_dir: &Path, family: SourceFamily) -> Result<PathBuf> {
        if family.is_singleton() {
            let dir = entity_dir.join(family.dir_name());
            std::fs::create_dir_all(&dir)?;
            return Ok(dir);
        }

        let mut counter = 1u32;
        loop {
            let dir = entity_dir.join(format!("{}_{:03}", family.dir_name(), counter));
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                return Ok(dir);
            }
            counter += 1;
        }
    }

    /// Express a path relative to the data root, for storage in the catalog.
    pub fn relative_to_data_dir(&self, path: &Path) -> String {
        path.strip_prefix(&self.data_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    /// Re-anchor a catalog-stored relative path under the data root.
    pub fn resolve(&self, stored_path: &str) -> PathBuf {
        self.data_dir.join(stored_path)
    }
}
