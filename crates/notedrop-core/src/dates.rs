//! Best-guess creation date for a note.
//!
//! Evidence is tried in order: a `date:` line in front matter, the periodic-note
//! folder convention (`Periodic/Daily Notes/...` etc.), and finally the oldest
//! plausible filesystem timestamp.

use std::fs::Metadata;
use std::path::Path;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate};
use tracing::debug;

use crate::notes::NOTE_EXTENSION;

/// Timestamps at or before this year are treated as "missing" (epoch-adjacent sentinels).
pub const MIN_PLAUSIBLE_YEAR: i32 = 1990;

const FRONT_MATTER_MARKER: &str = "---";
const DATE_KEY: &str = "date:";
const PERIODIC_DIR: &str = "Periodic";
const DAILY_DIR: &str = "Daily Notes";
const WEEKLY_DIR: &str = "Weekly Notes";
const MONTHLY_DIR: &str = "Monthly Notes";
const YEARLY_DIR: &str = "Yearly Notes";

/// Filesystem timestamps of a note, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteTimestamps {
    /// Inode change time (ctime).
    pub changed: DateTime<Local>,
    pub modified: DateTime<Local>,
    pub accessed: DateTime<Local>,
    /// Birth time; not every platform or filesystem reports it.
    pub created: Option<DateTime<Local>>,
}

impl NoteTimestamps {
    /// Reads the timestamps out of file metadata.
    ///
    /// Times the platform can't provide are replaced by [`missing_sentinel`],
    /// which the fallback rule discards.
    pub fn from_metadata(meta: &Metadata) -> Self {
        let modified = meta
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| missing_sentinel());
        let accessed = meta
            .accessed()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| missing_sentinel());
        let created = meta.created().ok().map(DateTime::<Local>::from);
        Self {
            changed: change_time(meta).unwrap_or(modified),
            modified,
            accessed,
            created,
        }
    }

    /// The four candidates for the fallback rule, birth time substituted by the sentinel.
    fn candidates(&self) -> [DateTime<Local>; 4] {
        [
            self.changed,
            self.modified,
            self.accessed,
            self.created.unwrap_or_else(missing_sentinel),
        ]
    }
}

#[cfg(unix)]
fn change_time(meta: &Metadata) -> Option<DateTime<Local>> {
    use std::os::unix::fs::MetadataExt;
    let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
    DateTime::from_timestamp(meta.ctime(), nanos).map(|t| t.with_timezone(&Local))
}

#[cfg(not(unix))]
fn change_time(_meta: &Metadata) -> Option<DateTime<Local>> {
    None
}

/// Unix epoch + 1s. Stands in for a timestamp the platform could not report.
pub fn missing_sentinel() -> DateTime<Local> {
    DateTime::from_timestamp(1, 0)
        .unwrap_or_default()
        .with_timezone(&Local)
}

/// Returns the creation date of the note at `path` as `YYYY-MM-DD`.
///
/// A front-matter `date:` value is returned verbatim, without validation.
pub fn infer_created_date(
    path: &Path,
    content: &str,
    timestamps: &NoteTimestamps,
) -> Result<String, DateError> {
    if let Some(date) = front_matter_date(content) {
        debug!(path = %path.display(), %date, "created date from front matter");
        return Ok(date.to_string());
    }
    if let Some(date) = periodic_date(path)? {
        debug!(path = %path.display(), %date, "created date from periodic note name");
        return Ok(date);
    }
    let date = oldest_timestamp(timestamps)?;
    debug!(path = %path.display(), %date, "created date from filesystem timestamps");
    Ok(date)
}

/// Second whitespace-separated token of the first usable `date:` line, if the
/// content opens with a front-matter marker. Every line of the content is scanned.
fn front_matter_date(content: &str) -> Option<&str> {
    if !content.starts_with(FRONT_MATTER_MARKER) {
        return None;
    }
    content
        .lines()
        .filter(|line| line.starts_with(DATE_KEY))
        .find_map(|line| line.split_whitespace().nth(1))
}

/// Date derived from the periodic-note naming convention, or `None` when the
/// path is not a daily/weekly/monthly/yearly periodic note.
fn periodic_date(path: &Path) -> Result<Option<String>, DateError> {
    if !has_component(path, PERIODIC_DIR) {
        return Ok(None);
    }
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };
    let stem = file_name.strip_suffix(NOTE_EXTENSION).unwrap_or(file_name);

    if has_component(path, DAILY_DIR) {
        // "2021-07-23 (Friday).md" -> "2021-07-23". Without a space the
        // extension is dropped too, rather than kept as part of the date.
        let date = match file_name.split_once(' ') {
            Some((prefix, _)) => prefix,
            None => stem,
        };
        return Ok(Some(date.to_string()));
    }
    if has_component(path, WEEKLY_DIR) {
        return week_start(stem).map(|d| Some(d.format("%Y-%m-%d").to_string()));
    }
    if has_component(path, MONTHLY_DIR) {
        return Ok(Some(format!("{stem}-01")));
    }
    if has_component(path, YEARLY_DIR) {
        return Ok(Some(format!("{stem}-01-01")));
    }
    Ok(None)
}

fn has_component(path: &Path, name: &str) -> bool {
    path.components().any(|c| c.as_os_str() == name)
}

/// Monday of week `N` in a `YEAR-WN` name.
///
/// Weeks are counted Monday-first: week 1 starts on the first Monday of the
/// year and the days before it are week 0. The Monday of week 0 is the one on
/// or before 1 January.
fn week_start(name: &str) -> Result<NaiveDate, DateError> {
    let malformed = || DateError::MalformedWeeklyName(name.to_string());
    let (year, week) = name.split_once("-W").ok_or_else(malformed)?;
    if year.len() != 4 {
        return Err(malformed());
    }
    let year: i32 = year.parse().map_err(|_| malformed())?;
    let week: u64 = week.parse().map_err(|_| malformed())?;
    if week > 53 {
        return Err(malformed());
    }

    let jan_first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(malformed)?;
    let since_monday = u64::from(jan_first.weekday().num_days_from_monday());
    let monday = if week == 0 {
        jan_first.checked_sub_days(Days::new(since_monday))
    } else {
        let first_monday = jan_first
            .checked_add_days(Days::new((7 - since_monday) % 7))
            .ok_or_else(malformed)?;
        first_monday.checked_add_days(Days::new((week - 1) * 7))
    };
    monday.ok_or_else(malformed)
}

/// Earliest timestamp whose year is after [`MIN_PLAUSIBLE_YEAR`].
fn oldest_timestamp(timestamps: &NoteTimestamps) -> Result<String, DateError> {
    timestamps
        .candidates()
        .into_iter()
        .filter(|t| t.year() > MIN_PLAUSIBLE_YEAR)
        .min()
        .map(|t| t.format("%Y-%m-%d").to_string())
        .ok_or(DateError::NoDateEvidence)
}

#[derive(Debug, thiserror::Error)]
pub enum DateError {
    #[error("weekly note name is not YEAR-Wweek: {0}")]
    MalformedWeeklyName(String),
    #[error("no plausible timestamp (all at or before {MIN_PLAUSIBLE_YEAR})")]
    NoDateEvidence,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn stamps(changed: i32, modified: i32, accessed: i32, created: Option<i32>) -> NoteTimestamps {
        NoteTimestamps {
            changed: at(changed, 3, 1),
            modified: at(modified, 6, 1),
            accessed: at(accessed, 9, 1),
            created: created.map(|y| at(y, 1, 15)),
        }
    }

    fn recent() -> NoteTimestamps {
        stamps(2024, 2024, 2024, Some(2024))
    }

    #[test]
    fn front_matter_date_wins_over_everything() {
        let path = Path::new("vault/Periodic/Daily Notes/2021-07-23 (Friday).md");
        let content = "---\ntags: journal\ndate: 2019-05-04\n---\nbody";
        let date = infer_created_date(path, content, &recent()).unwrap();
        assert_eq!(date, "2019-05-04");
    }

    #[test]
    fn front_matter_date_is_taken_verbatim() {
        let content = "---\ndate: 04/05/2019 extra\n---\n";
        let date = infer_created_date(Path::new("vault/a.md"), content, &recent()).unwrap();
        assert_eq!(date, "04/05/2019");
    }

    #[test]
    fn marker_without_date_line_falls_through() {
        let content = "---\ntitle: x\n---\n";
        let path = Path::new("vault/Periodic/Monthly Notes/2023-07.md");
        assert_eq!(infer_created_date(path, content, &recent()).unwrap(), "2023-07-01");
    }

    #[test]
    fn date_line_without_marker_is_ignored() {
        let content = "date: 2001-01-01\n";
        let date = infer_created_date(Path::new("vault/a.md"), content, &recent()).unwrap();
        assert_eq!(date, "2024-01-15");
    }

    #[test]
    fn daily_note_uses_prefix_before_space() {
        let path = Path::new("vault/Periodic/Daily Notes/2021-07-23 (Friday).md");
        assert_eq!(infer_created_date(path, "hello", &recent()).unwrap(), "2021-07-23");
    }

    #[test]
    fn daily_note_without_space_uses_stem() {
        let path = Path::new("vault/Periodic/Daily Notes/2021-07-23.md");
        assert_eq!(infer_created_date(path, "", &recent()).unwrap(), "2021-07-23");
    }

    #[test]
    fn weekly_note_uses_monday() {
        let path = Path::new("vault/Periodic/Weekly Notes/2023-W29.md");
        assert_eq!(infer_created_date(path, "", &recent()).unwrap(), "2023-07-17");
    }

    #[test]
    fn week_start_counts_from_first_monday() {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        // 2024 starts on a Monday: weeks 0 and 1 share it.
        assert_eq!(week_start("2024-W0").unwrap(), day(2024, 1, 1));
        assert_eq!(week_start("2024-W1").unwrap(), day(2024, 1, 1));
        assert_eq!(week_start("2024-W2").unwrap(), day(2024, 1, 8));
        // 2023 starts on a Sunday, so week 0 begins in 2022.
        assert_eq!(week_start("2023-W0").unwrap(), day(2022, 12, 26));
        assert_eq!(week_start("2023-W01").unwrap(), day(2023, 1, 2));
        // 2025 starts on a Wednesday.
        assert_eq!(week_start("2025-W0").unwrap(), day(2024, 12, 30));
        assert_eq!(week_start("2025-W1").unwrap(), day(2025, 1, 6));
    }

    #[test]
    fn malformed_weekly_name_is_an_error() {
        for name in ["2023-29", "2023-Wxx", "23-W29", "2023-W54"] {
            let path = format!("vault/Periodic/Weekly Notes/{name}.md");
            let err = infer_created_date(Path::new(&path), "", &recent()).unwrap_err();
            assert!(matches!(err, DateError::MalformedWeeklyName(_)), "{name}");
        }
    }

    #[test]
    fn monthly_and_yearly_notes_get_day_suffix() {
        let monthly = Path::new("vault/Periodic/Monthly Notes/2023-07.md");
        let yearly = Path::new("vault/Periodic/Yearly Notes/2023.md");
        assert_eq!(infer_created_date(monthly, "", &recent()).unwrap(), "2023-07-01");
        assert_eq!(infer_created_date(yearly, "", &recent()).unwrap(), "2023-01-01");
    }

    #[test]
    fn daily_takes_priority_over_other_periodic_folders() {
        let path = Path::new("vault/Periodic/Monthly Notes/Daily Notes/2022-02-02 x.md");
        assert_eq!(infer_created_date(path, "", &recent()).unwrap(), "2022-02-02");
    }

    #[test]
    fn periodic_without_known_subfolder_falls_through() {
        let path = Path::new("vault/Periodic/Quarterly/2023-Q1.md");
        assert_eq!(infer_created_date(path, "", &recent()).unwrap(), "2024-01-15");
    }

    #[test]
    fn folder_names_must_match_whole_segments() {
        let path = Path::new("vault/NotPeriodic/Monthly Notes/2023-07.md");
        assert_eq!(infer_created_date(path, "", &recent()).unwrap(), "2024-01-15");
    }

    #[test]
    fn implausible_timestamps_are_discarded() {
        let ts = stamps(1985, 2021, 2022, None);
        let date = infer_created_date(Path::new("vault/a.md"), "", &ts).unwrap();
        assert_eq!(date, "2021-06-01");
    }

    #[test]
    fn earliest_plausible_timestamp_wins() {
        let ts = stamps(2022, 2023, 2024, Some(2020));
        let date = infer_created_date(Path::new("vault/a.md"), "", &ts).unwrap();
        assert_eq!(date, "2020-01-15");
    }

    #[test]
    fn no_plausible_timestamp_is_an_error() {
        let ts = stamps(1970, 1980, 1990, None);
        let err = infer_created_date(Path::new("vault/a.md"), "", &ts).unwrap_err();
        assert!(matches!(err, DateError::NoDateEvidence));
    }

    #[test]
    fn timestamps_from_real_file_are_plausible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "x").unwrap();
        let ts = NoteTimestamps::from_metadata(&std::fs::metadata(&path).unwrap());
        assert!(ts.modified.year() > MIN_PLAUSIBLE_YEAR);
        assert!(oldest_timestamp(&ts).is_ok());
    }
}
