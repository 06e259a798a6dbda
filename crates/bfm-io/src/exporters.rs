//! Output writers for run artifacts.
//!
//! `resolution.txt` holds the human-readable model dump and `output.json`
//! the structured physical-unit result.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

pub const RESOLUTION_FILE: &str = "resolution.txt";
pub const OUTPUT_FILE: &str = "output.json";

/// Serialize `value` as pretty JSON to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing result to JSON")?;
    std::fs::write(path, json).with_context(|| format!("writing JSON to {}", path.display()))?;
    Ok(())
}

/// Write the `Display` rendering of `value` to `path`.
pub fn write_text<T: Display + ?Sized>(path: &Path, value: &T) -> Result<()> {
    std::fs::write(path, value.to_string())
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Create `dir` if needed and return the two artifact paths inside it.
pub fn prepare_output_dir(dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    Ok((dir.join(RESOLUTION_FILE), dir.join(OUTPUT_FILE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn test_writes_both_artifacts() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("outputs");
        let (resolution, output) = prepare_output_dir(&out).unwrap();

        write_text(&resolution, "*** Branch Flow SOCP ***").unwrap();
        let mut voltages = BTreeMap::new();
        voltages.insert(1usize, 1.05);
        write_json(&output, &voltages).unwrap();

        assert!(std::fs::read_to_string(&resolution)
            .unwrap()
            .contains("Branch Flow"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["1"], 1.05);
    }
}
