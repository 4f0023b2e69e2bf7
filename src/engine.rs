//! Batch orchestration: archives in, yearly reports out.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glob::{MatchOptions, Pattern};
use tracing::{debug, error, info, warn};

use crate::aggregate::YearAggregator;
use crate::archive::{ArchiveExtractor, ScratchWorkspace};
use crate::core::{
    ArchiveDetail, EngineConfig, FaturaError, ProgressSnapshot, Result, RunSummary,
    format_year_distribution,
};
use crate::progress::{ProgressEvent, ProgressListener};
use crate::report::{ReportWriter, report_path};
use crate::ubl::InvoiceParser;

/// One processing run over an input tree.
///
/// ```no_run
/// use efatura::{Engine, NoopListener};
///
/// let summary = Engine::new("/data/efatura", "/data/reports").run(&NoopListener)?;
/// println!("{} invoices, reports: {:?}", summary.invoices_found, summary.reports);
/// # Ok::<(), efatura::FaturaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    input_root: PathBuf,
    output_dir: PathBuf,
    config: EngineConfig,
    cancel: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(input_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_dir: output_dir.into(),
            config: EngineConfig::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a flag that, once set, stops the run before the next archive.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process every archive under the input root and write one workbook
    /// per issue year into the output directory.
    ///
    /// Archive, document and report failures are logged and counted in the
    /// returned summary. Only failures that affect the run as a whole, such
    /// as an unreadable input root or an uncreatable workspace, are
    /// returned as errors.
    pub fn run(&self, listener: &dyn ProgressListener) -> Result<RunSummary> {
        if !self.input_root.is_dir() {
            return Err(FaturaError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("input root {} is not a directory", self.input_root.display()),
            )));
        }
        fs::create_dir_all(&self.output_dir)?;
        let workspace =
            ScratchWorkspace::create(self.output_dir.join(&self.config.scratch_dir_name))?;
        info!(
            input = %self.input_root.display(),
            output = %self.output_dir.display(),
            scratch = %workspace.path().display(),
            "run started"
        );

        let archives = find_files(&self.input_root, "zip")?;
        let mut summary = RunSummary {
            total_archives: archives.len(),
            ..RunSummary::default()
        };
        listener.on_event(&ProgressEvent::RunStarted(snapshot(&summary, None)));

        let parser = InvoiceParser::new().with_home_currency(self.config.home_currency.as_str());
        let aggregator = YearAggregator::new();
        let mut extractor =
            ArchiveExtractor::new(workspace.path()).with_max_depth(self.config.max_nesting_depth);

        for archive in &archives {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(
                    processed = summary.processed_archives,
                    total = summary.total_archives,
                    "run cancelled"
                );
                summary.cancelled = true;
                break;
            }

            let detail = self.process_archive(
                archive,
                &mut extractor,
                &parser,
                &aggregator,
                &mut summary,
            );
            summary.processed_archives += 1;
            summary.invoices_found += detail.invoice_count;
            listener.on_event(&ProgressEvent::ArchiveCompleted {
                snapshot: snapshot(&summary, None),
                detail,
            });
        }

        let distribution = aggregator.year_distribution();
        listener.on_event(&ProgressEvent::RunCompleted {
            snapshot: snapshot(&summary, Some(distribution.clone())),
            cancelled: summary.cancelled,
        });
        info!(
            archives = summary.processed_archives,
            invoices = summary.invoices_found,
            years = %distribution,
            "all archives processed"
        );

        let writer = ReportWriter::from_config(&self.config);
        for bucket in aggregator.into_buckets() {
            let path = report_path(&self.output_dir, bucket.year, &self.config);
            match writer.write(&bucket, &path) {
                Ok(()) => summary.reports.push(path),
                Err(e) => {
                    error!(year = bucket.year, error = %e, "report not written");
                    summary.failed_years.push(bucket.year);
                }
            }
        }

        workspace.close()?;
        Ok(summary)
    }

    /// Extract, parse and record one archive. Never fails: problems are
    /// logged and reflected in `summary` and the returned detail.
    fn process_archive(
        &self,
        archive: &Path,
        extractor: &mut ArchiveExtractor,
        parser: &InvoiceParser,
        aggregator: &YearAggregator,
        summary: &mut RunSummary,
    ) -> ArchiveDetail {
        let filename = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut detail = ArchiveDetail {
            filename,
            ..ArchiveDetail::default()
        };

        let dest = match extractor.extract(archive) {
            Ok(dest) => dest,
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "archive skipped");
                summary.failed_archives.push(detail.filename.clone());
                return detail;
            }
        };

        let documents = match find_files(&dest, "xml") {
            Ok(documents) => documents,
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "archive skipped");
                summary.failed_archives.push(detail.filename.clone());
                return detail;
            }
        };
        debug!(archive = %archive.display(), documents = documents.len(), "documents found");

        let mut years: BTreeMap<i32, usize> = BTreeMap::new();
        for document in &documents {
            match parser.parse_path(document) {
                Ok(Some(parsed)) => {
                    let year = aggregator.record(parsed.header, parsed.lines);
                    *years.entry(year).or_default() += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(document = %document.display(), error = %e, "document skipped");
                    summary.skipped_documents += 1;
                }
            }
        }

        detail.invoice_count = years.values().sum();
        detail.year_distribution = format_year_distribution(&years);
        info!(
            archive = %detail.filename,
            invoices = detail.invoice_count,
            years = %detail.year_distribution,
            "archive processed"
        );
        detail
    }
}

fn snapshot(summary: &RunSummary, year_distribution: Option<String>) -> ProgressSnapshot {
    ProgressSnapshot {
        total_archives: summary.total_archives,
        processed_archives: summary.processed_archives,
        invoices_found: summary.invoices_found,
        year_distribution,
    }
}

/// Every file below `root` with the given extension, in any case, sorted.
fn find_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let base = Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{base}/**/*.{extension}");
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut files = Vec::new();
    for entry in glob::glob_with(&pattern, options)
        .map_err(|e| FaturaError::Pattern(format!("{pattern}: {e}")))?
    {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!(path = %e.path().display(), error = %e.error(), "unreadable path skipped"),
        }
    }
    files.sort();
    Ok(files)
}
