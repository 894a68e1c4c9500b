//! All pipeline logic independent of how it is driven (fixed archive, newest
//! archive in a directory, or a watcher).
//!
//! A vault snapshot is extracted into a disposable working directory, every
//! note becomes a JSON record, the tree is flattened and the result published.

pub mod app_data;
pub mod archive;
pub mod config;
pub mod dates;
pub mod flatten;
pub mod notes;
pub mod pipeline;
pub mod publish;
pub mod watcher;

pub use app_data::{app_data_dir, default_work_dir};
pub use archive::{extract_archive, latest_archive, ArchiveError};
pub use config::{
    default_config_path, load_config, load_config_from, save_config, Config, ConfigError,
};
pub use dates::{infer_created_date, DateError, NoteTimestamps};
pub use flatten::{flatten, FlattenError, FlattenReport, NoteFailure};
pub use notes::{transform_note, NoteError, NoteRecord};
pub use pipeline::{run_pipeline, PipelineError, PipelineReport};
pub use publish::{DirPublisher, PublishError, Publisher};
pub use watcher::{watch_archives, WatchError};
