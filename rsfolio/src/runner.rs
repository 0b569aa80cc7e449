//! Batch operations over volumes and files.
//!
//! These are the entry points behind the command line: extracting a
//! selection of chapters, writing them out, fixing page citations in the
//! footnote store and relinking every chapter file of a volumes directory.

use anyhow::{anyhow, bail, Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::assembler::{AssemblyReport, ChapterAssembler};
use crate::config::LayoutConfig;
use crate::converter::{load_footnotes, save_footnotes, PageSource};
use crate::linker::{link_markdown, LinkReport};
use crate::models::{ChapterDocument, FootnoteStore};
use crate::references::{ReferenceFix, ReferenceResolver};
use crate::registry::{ChapterRegistry, ReferenceTable, Volume};

const CONCURRENT_FILES: usize = 8;

/// One assembled chapter ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutput {
    pub number: usize,
    pub file_name: String,
    pub document: ChapterDocument,
    pub report: AssemblyReport,
}

fn progress_bar(len: usize, verbose: bool) -> Result<Option<ProgressBar>> {
    if !verbose {
        return Ok(None);
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.green/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("█▓▒░"),
    );
    Ok(Some(bar))
}

/// Assembles the selected chapters of a registry.
///
/// `selection` holds 1-based chapter numbers; an empty selection means all of
/// them. Every selected chapter is checked against the document before any
/// is assembled, so a bad selection fails without partial output.
pub fn extract_chapters<S: PageSource>(
    source: &S,
    registry: &ChapterRegistry,
    selection: &[usize],
    config: &LayoutConfig,
    verbose: bool,
) -> Result<Vec<ChapterOutput>> {
    let selected = registry.select(selection)?;
    for (number, chapter) in selected.iter() {
        if chapter.end_page > source.page_count() {
            bail!(
                "chapter {} '{}' ends at page {} but the document has {} pages",
                number,
                chapter.title,
                chapter.end_page,
                source.page_count()
            );
        }
    }

    let pb = progress_bar(selected.len(), verbose)?;
    let assembler = ChapterAssembler::new(config);
    let mut outputs = Vec::with_capacity(selected.len());

    for (number, chapter) in selected {
        let (document, report) = assembler
            .assemble(source, chapter)
            .with_context(|| format!("while assembling chapter {} '{}'", number, chapter.title))?;
        if verbose {
            tracing::info!(
                number,
                title = %chapter.title,
                blocks = report.blocks,
                footnotes = report.footnotes,
                "assembled chapter"
            );
        }
        if let Some(pb) = &pb {
            pb.set_message(chapter.title.clone());
            pb.inc(1);
        }
        outputs.push(ChapterOutput {
            number,
            file_name: chapter.file_name(number),
            document,
            report,
        });
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    Ok(outputs)
}

/// Writes chapters under `out_dir/volume-N/` and returns the written paths.
pub async fn write_chapters(
    out_dir: &Path,
    volume: Volume,
    outputs: &[ChapterOutput],
) -> Result<Vec<PathBuf>> {
    let dir = out_dir.join(volume.to_string());
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let writes = outputs.iter().map(|output| {
        let path = dir.join(&output.file_name);
        let content = output.document.to_markdown();
        async move {
            tokio::fs::write(&path, content)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok::<PathBuf, anyhow::Error>(path)
        }
    });
    futures::future::try_join_all(writes).await
}

/// Loads a footnote store, rewrites its page citations and saves it back
/// unless `dry_run` is set.
pub async fn fix_footnote_references(
    path: &Path,
    table: &ReferenceTable,
    dry_run: bool,
) -> Result<ReferenceFix> {
    let store = load_footnotes(path).await?;
    let fix = ReferenceResolver::new(table).fix_store(&store);
    tracing::info!(
        footnotes = store.len(),
        changed = fix.changed.len(),
        replacements = fix.total_replacements(),
        "fixed page references"
    );
    if !dry_run {
        save_footnotes(path, &fix.store).await?;
    }
    Ok(fix)
}

/// Linking outcome for one chapter file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLink {
    pub path: PathBuf,
    pub report: LinkReport,
    pub changed: bool,
}

/// Linking outcome for a whole volumes directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSummary {
    pub files: Vec<FileLink>,
}

impl LinkSummary {
    pub fn total_markers(&self) -> usize {
        self.files.iter().map(|file| file.report.markers).sum()
    }

    pub fn total_linked(&self) -> usize {
        self.files.iter().map(|file| file.report.linked).sum()
    }
}

/// Lists chapter files of one volume, or of every `volume-*` directory.
pub fn chapter_files(volumes_dir: &Path, volume: Option<Volume>) -> Result<Vec<PathBuf>> {
    let volume_pattern = match volume {
        Some(volume) => volume.to_string(),
        None => "volume-*".to_string(),
    };
    let query = volumes_dir.join(volume_pattern).join("*.md");
    let query = query
        .to_str()
        .ok_or_else(|| anyhow!("invalid path encoding: {:?}", query))?;
    let mut files = Vec::new();
    for entry in glob(query)? {
        files.push(entry?);
    }
    files.sort();
    Ok(files)
}

async fn link_file(path: PathBuf, store: &FootnoteStore, dry_run: bool) -> Result<FileLink> {
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let (linked, report) = link_markdown(&content, store);
    let changed = linked != content;
    if changed && !dry_run {
        tokio::fs::write(&path, linked)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(FileLink {
        path,
        report,
        changed,
    })
}

/// Relinks the footnote sections of every chapter file under `volumes_dir`.
pub async fn link_volumes(
    volumes_dir: &Path,
    volume: Option<Volume>,
    store: &FootnoteStore,
    dry_run: bool,
) -> Result<LinkSummary> {
    let paths = chapter_files(volumes_dir, volume)?;
    if paths.is_empty() {
        tracing::warn!(dir = %volumes_dir.display(), "no chapter files found");
    }

    let files: Vec<FileLink> = stream::iter(paths)
        .map(|path| link_file(path, store, dry_run))
        .buffered(CONCURRENT_FILES)
        .try_collect()
        .await?;

    for file in files.iter().filter(|file| file.report.markers > 0) {
        tracing::info!(
            file = %file.path.display(),
            markers = file.report.markers,
            linked = file.report.linked,
            dry_run,
            "linked footnotes"
        );
    }
    let summary = LinkSummary { files };
    tracing::info!(
        markers = summary.total_markers(),
        linked = summary.total_linked(),
        "linking finished"
    );
    Ok(summary)
}
