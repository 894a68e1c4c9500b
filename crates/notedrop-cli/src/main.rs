//! CLI entry point: extract a vault snapshot, flatten it and publish per-note JSON.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser};
use notedrop_core::config::save_config_to;
use notedrop_core::{
    app_data_dir, default_config_path, flatten, latest_archive, load_config, load_config_from,
    run_pipeline, save_config, transform_note, watch_archives, Config, DirPublisher,
    FlattenReport, PipelineReport,
};
use tracing::error;

#[derive(Parser)]
#[command(name = "notedrop", version)]
#[command(about = "notedrop: publish a vault snapshot as flat per-note JSON")]
struct Cli {
    /// Config file to use instead of the one in the app data directory.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace). Overrides the config file.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Process a fixed archive.
    Run {
        /// Archive to process (defaults to `archive` from config).
        #[arg(long, value_name = "FILE")]
        archive: Option<PathBuf>,
        #[command(flatten)]
        targets: Targets,
    },
    /// Process the most recently modified archive in the source directory.
    Latest {
        /// Directory archives land in (defaults to `source_dir` from config).
        #[arg(long, value_name = "DIR")]
        source: Option<PathBuf>,
        #[command(flatten)]
        targets: Targets,
    },
    /// Like `latest`, every time an archive lands in the source directory.
    Watch {
        #[arg(long, value_name = "DIR")]
        source: Option<PathBuf>,
        #[command(flatten)]
        targets: Targets,
    },
    /// Flatten an already extracted vault in place (no publishing).
    Flatten {
        #[arg(value_name = "DIR")]
        path: PathBuf,
    },
    /// Print the record a single note would become.
    Note {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Vault root the record's path is relative to (defaults to the note's directory).
        #[arg(long, value_name = "DIR")]
        vault: Option<PathBuf>,
    },
    /// Show where notedrop stores its config and working directory.
    DataDir,
    /// Show the effective config; any value given is saved first.
    Config {
        #[arg(long, value_name = "FILE")]
        archive: Option<String>,
        #[arg(long, value_name = "DIR")]
        source: Option<String>,
        #[arg(long, value_name = "DIR")]
        dest: Option<String>,
        #[arg(long, value_name = "DIR")]
        work_dir: Option<String>,
        #[arg(long = "set-log-level", value_name = "LEVEL")]
        log_level: Option<String>,
    },
}

#[derive(Args)]
struct Targets {
    /// Publish destination (defaults to `dest_dir` from config).
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,
    /// Extraction directory (defaults to `work_dir` from config, then app data).
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,
}

impl Targets {
    fn resolve(self, config: &Config) -> Result<(PathBuf, PathBuf), String> {
        let dest = self
            .dest
            .or_else(|| config.dest_dir())
            .ok_or("no destination: pass --dest or set dest_dir in config")?;
        let work_dir = self
            .work_dir
            .or_else(|| config.work_dir())
            .ok_or("no working directory: pass --work-dir or set work_dir in config")?;
        Ok((dest, work_dir))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config_from(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => load_config(),
    };
    logging::init(cli.log_level.as_deref().or(config.log_level.as_deref()));

    match execute(cli.command, config, cli.config.as_deref()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(
    command: Commands,
    config: Config,
    config_path: Option<&Path>,
) -> Result<ExitCode, String> {
    match command {
        Commands::Run { archive, targets } => {
            let archive = archive
                .or_else(|| config.archive())
                .ok_or("no archive: pass --archive or set archive in config")?;
            let (dest, work_dir) = targets.resolve(&config)?;
            process(&archive, &work_dir, &dest)
        }
        Commands::Latest { source, targets } => {
            let source = source
                .or_else(|| config.source_dir())
                .ok_or("no source directory: pass --source or set source_dir in config")?;
            let (dest, work_dir) = targets.resolve(&config)?;
            let archive = latest_archive(&source).map_err(|e| e.to_string())?;
            process(&archive, &work_dir, &dest)
        }
        Commands::Watch { source, targets } => {
            let source = source
                .or_else(|| config.source_dir())
                .ok_or("no source directory: pass --source or set source_dir in config")?;
            let (dest, work_dir) = targets.resolve(&config)?;
            watch_archives(&source, move |found| match found {
                Ok(archive) => {
                    if let Err(e) = process(&archive, &work_dir, &dest) {
                        error!(archive = %archive.display(), error = %e, "run failed");
                    }
                }
                Err(e) => error!(error = %e, "no archive to process"),
            })
            .map_err(|e| e.to_string())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Flatten { path } => {
            let report = flatten(&path).map_err(|e| e.to_string())?;
            println!("Flattened {}", path.display());
            Ok(print_flatten(&report))
        }
        Commands::Note { path, vault } => {
            let vault = vault
                .or_else(|| path.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            let record = transform_note(&path, &vault).map_err(|e| e.to_string())?;
            let json = serde_json::to_string_pretty(&record).map_err(|e| e.to_string())?;
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => {
                println!("{}", p.display());
                Ok(ExitCode::SUCCESS)
            }
            None => Err("could not determine app data directory".to_string()),
        },
        Commands::Config { archive, source, dest, work_dir, log_level } => {
            let mut config = config;
            let mut changed = false;
            for (slot, value) in [
                (&mut config.archive, archive),
                (&mut config.source_dir, source),
                (&mut config.dest_dir, dest),
                (&mut config.work_dir, work_dir),
                (&mut config.log_level, log_level),
            ] {
                if value.is_some() {
                    *slot = value;
                    changed = true;
                }
            }
            if changed {
                let saved_to = match config_path {
                    Some(p) => save_config_to(&config, p).map(|()| p.to_path_buf()),
                    None => save_config(&config),
                }
                .map_err(|e| e.to_string())?;
                eprintln!("Saved {}", saved_to.display());
            } else if let Some(p) =
                config_path.map(Path::to_path_buf).or_else(default_config_path)
            {
                eprintln!("# {}", p.display());
            }
            let toml = toml::to_string_pretty(&config).map_err(|e| e.to_string())?;
            print!("{}", toml);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn process(archive: &Path, work_dir: &Path, dest: &Path) -> Result<ExitCode, String> {
    let publisher = DirPublisher::new(dest);
    let report: PipelineReport =
        run_pipeline(archive, work_dir, &publisher).map_err(|e| e.to_string())?;
    println!("Processed {}", archive.display());
    let code = print_flatten(&report.flatten);
    println!("  published: {} file(s) to {}", report.published, dest.display());
    Ok(code)
}

/// Prints a flatten summary; failure exit code if any note was not converted.
fn print_flatten(report: &FlattenReport) -> ExitCode {
    println!(
        "  pruned: {} dir(s), {} file(s)",
        report.pruned_dirs, report.pruned_files
    );
    println!("  converted: {} note(s)", report.converted);
    println!("  moved: {} file(s), {} left behind", report.moved, report.collisions.len());
    for f in &report.failures {
        eprintln!("  failed: {}: {}", f.path.display(), f.error);
    }
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
