//! Scanning the raw-sources tree for material the catalog doesn't know yet.
//!
//! Manual drops and leftovers from interrupted runs live on disk without a
//! catalog row. The scanner walks `rawSources/`, categorizes every source
//! directory, and registers the unprocessed ones under a pseudo-URL so the
//! dedup invariant covers them too.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::catalog::SourceCatalog;
use crate::error::Result;
use crate::ident::{content_hash, entity_id_from_dir_name, source_id};
use crate::layout::StorageLayout;
use crate::pdf;
use crate::types::{Source, SourceType};

/// Minimum content length for a scanned source to be registered.
const MIN_SCANNED_CONTENT: usize = 50;

/// One source directory found on disk but absent from the catalog.
#[derive(Debug, Clone)]
pub struct UnprocessedSource {
    pub source_dir: PathBuf,
    pub original_file: PathBuf,
    pub file_type: FileType,
    pub entity_id: String,
    pub pseudo_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Html,
}

impl FileType {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
        }
    }
}

/// Categorized result of a scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub cataloged: Vec<Source>,
    pub unprocessed: Vec<UnprocessedSource>,
    /// Directories without a recognizable original file
    pub invalid: Vec<PathBuf>,
}

/// Walk the raw-sources tree and categorize every source directory.
pub async fn scan_raw_sources(
    layout: &StorageLayout,
    catalog: &dyn SourceCatalog,
    entity_filter: Option<&str>,
) -> Result<ScanReport> {
    let mut report = ScanReport::default();
    let raw_dir = layout.raw_sources_dir();

    if !raw_dir.exists() {
        warn!(dir = %raw_dir.display(), "raw sources directory does not exist");
        return Ok(report);
    }

    info!(dir = %raw_dir.display(), "scanning raw sources");

    for entity_entry in std::fs::read_dir(&raw_dir)? {
        let entity_dir = entity_entry?.path();
        if !entity_dir.is_dir() {
            continue;
        }

        let dir_name = entity_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let entity_id =
            entity_id_from_dir_name(&dir_name).unwrap_or_else(|| "unknown".to_string());

        if let Some(filter) = entity_filter {
            if entity_id != filter {
                continue;
            }
        }

        for source_entry in std::fs::read_dir(&entity_dir)? {
            let source_dir = source_entry?.path();
            if !source_dir.is_dir() {
                continue;
            }
            scan_source_dir(&source_dir, catalog, &entity_id, &mut report).await?;
        }
    }

    info!(
        cataloged = report.cataloged.len(),
        unprocessed = report.unprocessed.len(),
        invalid = report.invalid.len(),
        "scan complete"
    );
    Ok(report)
}

async fn scan_source_dir(
    source_dir: &Path,
    catalog: &dyn SourceCatalog,
    entity_id: &str,
    report: &mut ScanReport,
) -> Result<()> {
    let original_pdf = source_dir.join("original.pdf");
    let original_html = source_dir.join("original.html");

    let (original_file, file_type) = if original_pdf.exists() {
        (original_pdf, FileType::Pdf)
    } else if original_html.exists() {
        (original_html, FileType::Html)
    } else {
        warn!(dir = %source_dir.display(), "no original file found");
        report.invalid.push(source_dir.to_path_buf());
        return Ok(());
    };

    let dir_name = source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pseudo_url = pseudo_url(entity_id, &dir_name, file_type);

    match catalog.get_by_url(&pseudo_url).await? {
        Some(existing) => {
            debug!(source_id = %existing.source_id, "source already cataloged");
            report.cataloged.push(existing);
        }
        None => {
            report.unprocessed.push(UnprocessedSource {
                source_dir: source_dir.to_path_buf(),
                original_file,
                file_type,
                entity_id: entity_id.to_string(),
                pseudo_url,
            });
        }
    }
    Ok(())
}

/// Pseudo-URL for sources without a real one, keeping dedup URL-keyed.
fn pseudo_url(entity_id: &str, source_dir_name: &str, file_type: FileType) -> String {
    format!(
        "file://local/{entity_id}/{source_dir_name}/original.{}",
        file_type.extension()
    )
}

/// Register every unprocessed source found on disk.
///
/// Returns `(Source, content)` pairs for sources that made it into the
/// catalog. Individual failures are logged and skipped.
pub async fn process_existing_sources(
    layout: &StorageLayout,
    catalog: &dyn SourceCatalog,
    entity_filter: Option<&str>,
) -> Result<Vec<(Source, String)>> {
    let report = scan_raw_sources(layout, catalog, entity_filter).await?;

    if report.unprocessed.is_empty() {
        info!("no unprocessed sources found");
        return Ok(Vec::new());
    }

    info!(count = report.unprocessed.len(), "processing unprocessed sources");

    let mut processed = Vec::new();
    for meta in report.unprocessed {
        match process_single(layout, catalog, &meta).await {
            Ok(Some(pair)) => processed.push(pair),
            Ok(None) => {}
            Err(e) => {
                warn!(dir = %meta.source_dir.display(), error = %e, "failed to process source");
            }
        }
    }

    info!(count = processed.len(), "registered scanned sources");
    Ok(processed)
}

async fn process_single(
    layout: &StorageLayout,
    catalog: &dyn SourceCatalog,
    meta: &UnprocessedSource,
) -> Result<Option<(Source, String)>> {
    let dir_name = meta
        .source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!(dir = %dir_name, "processing scanned source");

    let content = extract_content(&meta.original_file, meta.file_type, &meta.source_dir)?;
    if content.trim().len() < MIN_SCANNED_CONTENT {
        warn!(dir = %dir_name, "content too short or empty, skipping");
        return Ok(None);
    }

    let is_manual = dir_name.starts_with("manual");
    let source_type = source_type_for_dir(&dir_name, is_manual);

    let mut source = Source::new(
        source_id(&meta.pseudo_url, "src"),
        source_type,
        format!("Manual source: {dir_name}"),
        &meta.pseudo_url,
    );
    source.content_hash = Some(content_hash(&content));
    source.is_manual = is_manual;
    source.credibility_score = crate::credibility::credibility_score(source_type, None);

    let content_txt = meta.source_dir.join("content.txt");
    if !content_txt.exists() {
        std::fs::write(&content_txt, &content)?;
        debug!(path = %content_txt.display(), "saved extracted content");
    }
    source.stored_content_path = Some(layout.relative_to_data_dir(&content_txt));

    let stored = catalog.add_source(&source).await?;
    info!(source_id = %stored.source_id, "added scanned source to catalog");

    Ok(Some((stored, content)))
}

fn source_type_for_dir(dir_name: &str, is_manual: bool) -> SourceType {
    if dir_name == "wikipedia" {
        SourceType::Wikipedia
    } else if dir_name.starts_with("scholar") || dir_name.starts_with("arxiv") {
        SourceType::AcademicPaper
    } else if is_manual {
        SourceType::Manual
    } else {
        SourceType::Unknown
    }
}

fn extract_content(original_file: &Path, file_type: FileType, source_dir: &Path) -> Result<String> {
    // An existing content.txt wins over re-extraction.
    let content_txt = source_dir.join("content.txt");
    if content_txt.exists() {
        debug!(path = %content_txt.display(), "reading existing content.txt");
        return Ok(std::fs::read_to_string(&content_txt)?);
    }

    match file_type {
        FileType::Pdf => {
            debug!(path = %original_file.display(), "extracting text from PDF");
            let bytes = std::fs::read(original_file)?;
            let extraction = pdf::extract_text(&bytes);
            Ok(extraction.text)
        }
        FileType::Html => {
            debug!(path = %original_file.display(), "reading HTML file");
            Ok(std::fs::read_to_string(original_file)?)
        }
    }
}
