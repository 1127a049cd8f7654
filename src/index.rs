use std::path::{Path, PathBuf};

use regex::Regex;

use crate::domain::FileRecord;
use crate::error::CcvalError;
use crate::fs_util::{expand_home, walk_entries};

pub const DEFAULT_BASE_DIR: &str = "~/dump2hold";

/// Two-letter calendar codes used in monthly dump names.
pub static MONTH_CODES: [(&str, u32); 12] = [
    ("ja", 1),
    ("fb", 2),
    ("mr", 3),
    ("ar", 4),
    ("my", 5),
    ("jn", 6),
    ("jl", 7),
    ("ag", 8),
    ("sp", 9),
    ("ot", 10),
    ("nv", 11),
    ("dc", 12),
];

/// Decodes a month token to `1..=12`, or `0` when the token is not a month.
///
/// Alphabetic tokens go through [`MONTH_CODES`]. Two-character tokens
/// otherwise use the hybrid scheme: a leading `1`-`9` is the month itself,
/// a leading `a`, `b` or `c` is October, November or December.
pub fn decode_month(token: &str) -> u32 {
    if token.is_empty() {
        return 0;
    }
    let lower = token.to_lowercase();

    if lower.chars().all(char::is_alphabetic) {
        return MONTH_CODES
            .iter()
            .find(|(code, _)| *code == lower)
            .map(|(_, month)| *month)
            .unwrap_or(0);
    }

    if lower.chars().count() != 2 {
        return 0;
    }
    match lower.chars().next() {
        Some(ch @ '1'..='9') => ch.to_digit(10).unwrap_or(0),
        Some('a') => 10,
        Some('b') => 11,
        Some('c') => 12,
        _ => 0,
    }
}

/// Selects dumps named `<experiment><model code>#<run id>00000<YYYY><month>+`.
#[derive(Debug, Clone)]
pub struct FileQuery {
    pub experiment: String,
    pub model_codes: String,
    pub run_id: String,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub base_dir: PathBuf,
}

impl FileQuery {
    pub fn new(experiment: &str, model_codes: &str, run_id: &str) -> Self {
        Self {
            experiment: experiment.to_string(),
            model_codes: model_codes.to_string(),
            run_id: run_id.to_string(),
            start_year: None,
            end_year: None,
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
        }
    }

    pub fn with_years(mut self, start_year: Option<i32>, end_year: Option<i32>) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// `<base>/<experiment>/datam` when it exists, otherwise `<base>`.
    pub fn search_root(&self) -> PathBuf {
        let base_dir = expand_home(&self.base_dir);
        let datam = base_dir.join(&self.experiment).join("datam");
        if datam.is_dir() { datam } else { base_dir }
    }

    pub fn pattern(&self) -> Result<Regex, CcvalError> {
        if self.model_codes.is_empty() {
            return Err(CcvalError::InvalidPattern(
                "model code set is empty".to_string(),
            ));
        }
        let model_class = self
            .model_codes
            .chars()
            .map(|ch| regex::escape(&ch.to_string()))
            .collect::<String>();
        let pattern = format!(
            r"{}[{}]#{}00000(\d{{4}})([a-zA-Z]{{2}}|[0-9a-cA-C][0-9])\+",
            regex::escape(&self.experiment),
            model_class,
            regex::escape(&self.run_id),
        );
        Regex::new(&pattern).map_err(|err| CcvalError::InvalidPattern(err.to_string()))
    }

    fn in_range(&self, year: i32) -> bool {
        self.start_year.is_none_or(|start| year >= start)
            && self.end_year.is_none_or(|end| year <= end)
    }

    /// Decodes one path against the naming grammar, base name first.
    pub fn decode(&self, regex: &Regex, path: &Path) -> Option<FileRecord> {
        let base_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let full = path.to_string_lossy();
        let captures = regex
            .captures(&base_name)
            .or_else(|| regex.captures(&full))?;

        let year: i32 = captures.get(1)?.as_str().parse().ok()?;
        let month = decode_month(captures.get(2)?.as_str());
        if month == 0 || !self.in_range(year) {
            return None;
        }
        Some(FileRecord {
            year,
            month,
            path: path.to_path_buf(),
        })
    }
}

/// Lists dumps matching `query`, ordered by `(year, month)`.
///
/// Ties keep discovery order. A missing or unreadable root gives an empty list.
pub fn find_matching_files(query: &FileQuery) -> Vec<FileRecord> {
    let regex = match query.pattern() {
        Ok(regex) => regex,
        Err(err) => {
            tracing::warn!("{err}");
            return Vec::new();
        }
    };

    let root = query.search_root();
    let entries = walk_entries(&root);
    let mut records = entries
        .iter()
        .filter_map(|path| query.decode(&regex, path))
        .collect::<Vec<_>>();
    records.sort_by_key(|record| (record.year, record.month));

    tracing::debug!(
        "{}: {} of {} entries under {} matched",
        query.experiment,
        records.len(),
        entries.len(),
        root.display()
    );
    records
}
