//! Raw numeric tables read from CSV.
//!
//! Cells are addressed by 0-based row and column offset; the header row is
//! kept only for reporting. Placeholder cells become NaN so the caller can
//! decide whether to default them.

use bfm_core::{BfmError, BfmResult};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;

const PLACEHOLDERS: &[&str] = &["", "nan", "na", "n/a", "null", "none", "-"];

/// Dense table of numbers with NaN standing in for missing cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<f64>>,
    /// Source line of each row (1-based, header is line 1)
    lines: Vec<usize>,
}

impl RawTable {
    pub fn from_path(path: &Path) -> BfmResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file).map_err(|err| match err {
            BfmError::Parse(msg) => BfmError::Parse(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> BfmResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| BfmError::Parse(format!("reading header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut table = RawTable {
            headers,
            ..RawTable::default()
        };
        for (idx, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| BfmError::Parse(e.to_string()))?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            table.rows.push(parse_record(&record, line)?);
            table.lines.push(line);
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Cell value; NaN when the cell is a placeholder or the row is short.
    pub fn cell(&self, row: usize, col: usize) -> f64 {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(f64::NAN)
    }

    pub fn line(&self, row: usize) -> usize {
        self.lines.get(row).copied().unwrap_or(row + 2)
    }

    /// Fail unless the table has at least `min` columns.
    pub fn require_columns(&self, name: &str, min: usize) -> BfmResult<()> {
        if self.width() < min {
            return Err(BfmError::Data(format!(
                "{name} table needs at least {min} columns, found {} ({})",
                self.width(),
                self.headers.join(", ")
            )));
        }
        Ok(())
    }

    /// Read an integer id cell (bus numbers); NaN or fractional values fail.
    pub fn id_cell(&self, row: usize, col: usize) -> BfmResult<usize> {
        let value = self.cell(row, col);
        if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
            let header = self.headers.get(col).map(String::as_str).unwrap_or("?");
            return Err(BfmError::Parse(format!(
                "line {}: column '{header}' must be a positive integer bus id, got {value}",
                self.line(row)
            )));
        }
        Ok(value as usize)
    }
}

fn parse_record(record: &StringRecord, line: usize) -> BfmResult<Vec<f64>> {
    record
        .iter()
        .enumerate()
        .map(|(col, raw)| parse_cell(raw).ok_or_else(|| {
            BfmError::Parse(format!(
                "line {line}, column {}: cannot read '{raw}' as a number",
                col + 1
            ))
        }))
        .collect()
}

fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if PLACEHOLDERS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return Some(f64::NAN);
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_become_nan() {
        let csv = "bus,p,q\n1,,NaN\n2,-40000,-\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.cell(0, 1).is_nan());
        assert!(table.cell(0, 2).is_nan());
        assert_eq!(table.cell(1, 1), -40000.0);
        assert!(table.cell(1, 2).is_nan());
        assert!(table.cell(5, 0).is_nan());
        assert_eq!(table.line(1), 3);
    }

    #[test]
    fn test_garbage_cell_is_parse_error() {
        let csv = "from,to,r,x\n1,2,abc,0.1\n";
        let err = RawTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, BfmError::Parse(msg) if msg.contains("line 2")));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let csv = "from,to,r,x\n1,2,0.1\n";
        assert!(matches!(
            RawTable::from_reader(csv.as_bytes()),
            Err(BfmError::Parse(_))
        ));
    }

    #[test]
    fn test_id_cells() {
        let csv = "bus,p\n3,1\n2.5,1\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.id_cell(0, 0).unwrap(), 3);
        assert!(table.id_cell(1, 0).is_err());
        assert!(table.require_columns("bus", 5).is_err());
    }
}
