use std::io::{self, Write};

use serde::Serialize;

use crate::assemble::DenseDataset;
use crate::domain::FileRecord;

#[derive(Debug, Clone, Serialize)]
pub struct FilesResult {
    pub experiment: String,
    pub files: Vec<FileRecord>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_files(result: &[FilesResult]) -> io::Result<()> {
        Self::print_json(&result)
    }

    pub fn print_dataset(dataset: &DenseDataset) -> io::Result<()> {
        Self::print_json(dataset)
    }

    pub fn to_json<T: Serialize>(value: &T) -> io::Result<String> {
        serde_json::to_string_pretty(value).map_err(io::Error::other)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = Self::to_json(value)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
