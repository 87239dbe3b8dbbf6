// JSONL file operations

use eyre::{Context, Result};
use fs2::FileExt;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Read all records from a JSONL file, in file order
///
/// A missing file reads as empty. Lines that fail to read or parse are skipped
/// with a warning.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(file = ?path, "JSONL file does not exist yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).context("Failed to open JSONL file"),
    };

    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to parse JSON, skipping"
                );
            }
        }
    }

    info!(file = ?path, count = records.len(), "Loaded records from JSONL");

    Ok(records)
}

/// Replace the JSONL file with a full snapshot of `records`
///
/// Writes to a sibling temp file under an exclusive lock, then renames it over
/// the target, so readers never see a half-written snapshot.
pub fn write_jsonl_snapshot<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(sibling(path, "lock"))
        .context("Failed to open JSONL lock file")?;

    lock_file.lock_exclusive().context("Failed to acquire file lock")?;

    let tmp_path = sibling(path, "tmp");
    {
        let file = File::create(&tmp_path).context("Failed to create JSONL temp file")?;
        let mut writer = BufWriter::new(file);
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{}", json)?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?; // Ensure data is flushed to disk
    }

    fs::rename(&tmp_path, path).context("Failed to replace JSONL file")?;
    debug!(file = ?path, count = records.len(), "Wrote JSONL snapshot");

    // Lock is released when lock_file is dropped
    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
