//! Pipeline: extract → flatten → publish. Both drivers (fixed archive, newest
//! archive in a source directory) end up here.

use std::path::Path;

use tracing::{info, warn};

use crate::archive::{extract_archive, ArchiveError};
use crate::flatten::{flatten, FlattenError, FlattenReport};
use crate::publish::{PublishError, Publisher};

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    pub flatten: FlattenReport,
    pub published: usize,
}

/// Extracts `archive` into `work_dir`, flattens it and publishes the result.
///
/// Notes that fail to convert are listed in the report; they don't stop
/// publication of the rest.
pub fn run_pipeline(
    archive: &Path,
    work_dir: &Path,
    publisher: &dyn Publisher,
) -> Result<PipelineReport, PipelineError> {
    info!(archive = %archive.display(), "processing archive");
    extract_archive(archive, work_dir)?;
    let flatten = flatten(work_dir)?;
    if !flatten.is_clean() {
        warn!(failed = flatten.failures.len(), "some notes were not converted");
    }
    let published = publisher.publish(work_dir)?;
    Ok(PipelineReport { flatten, published })
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("flatten error: {0}")]
    Flatten(#[from] FlattenError),
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}
