//! JSON file adapter for result records.
//!
//! A batch is stored as one pretty-printed UTF-8 array of records. Non-ASCII
//! text (asset names, legacy interval labels) is written as-is.

use crate::domain::error::BackscanError;
use crate::domain::record::ResultRecord;
use crate::ports::result_port::ResultPort;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct JsonResultAdapter {
    path: PathBuf,
}

impl JsonResultAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultPort for JsonResultAdapter {
    fn save(&self, records: &[ResultRecord]) -> Result<(), BackscanError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<ResultRecord>, BackscanError> {
        let reader = BufReader::new(fs::File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
