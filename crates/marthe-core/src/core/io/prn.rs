//! Parsing of `historiq.prn`, the simulated-history file MARTHE writes at
//! the end of a run, and its extraction into per-locality record files.

use crate::core::pest::fmt;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PrnError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PrnParseErrorKind,
    },
    #[error("No 'Date' column-header row found")]
    MissingHeader,
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error)]
pub enum PrnParseErrorKind {
    #[error("Header row names no localities")]
    EmptyHeader,
    #[error("Invalid date '{value}'")]
    InvalidDate { value: String },
    #[error("Invalid number '{value}'")]
    InvalidNumber { value: String },
    #[error("Expected {expected} values, found {found}")]
    CountMismatch { expected: usize, found: usize },
}

/// One time step of the simulated history.
#[derive(Debug, Clone, PartialEq)]
pub struct PrnRow {
    pub date: NaiveDate,
    /// One value per locality, in header order.
    pub values: Vec<f64>,
}

/// The simulated history: locality names and one row per time step.
#[derive(Debug, Clone, PartialEq)]
pub struct PrnTable {
    localities: Vec<String>,
    rows: Vec<PrnRow>,
}

impl PrnTable {
    /// Returns the locality names, in column order.
    pub fn localities(&self) -> &[String] {
        &self.localities
    }

    /// Returns the time-step rows, in file order.
    pub fn rows(&self) -> &[PrnRow] {
        &self.rows
    }

    /// Returns the dated series of one locality, or `None` for an unknown
    /// name.
    pub fn series(&self, locality: &str) -> Option<impl Iterator<Item = (NaiveDate, f64)> + '_> {
        let idx = self.localities.iter().position(|name| name == locality)?;
        Some(self.rows.iter().map(move |row| (row.date, row.values[idx])))
    }
}

/// Splits a row on tabs when present, otherwise on any whitespace.
///
/// MARTHE writes tab-separated output; hand-edited files tend to use
/// spaces.
fn split_row(line: &str) -> Vec<&str> {
    if line.contains('\t') {
        line.split('\t')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Parses a simulated-history table from a buffered reader.
///
/// Preamble lines are skipped until the column-header row whose first token
/// is `Date`; a units row immediately after the header is tolerated.
pub fn read_from(reader: &mut impl BufRead) -> Result<PrnTable, PrnError> {
    let mut localities: Option<Vec<String>> = None;
    let mut rows: Vec<PrnRow> = Vec::new();
    let mut data_started = false;

    for (line_no, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let line_no = line_no + 1;
        let tokens = split_row(&line);
        if tokens.is_empty() {
            continue;
        }

        let Some(names) = &localities else {
            if tokens[0].eq_ignore_ascii_case("date") {
                let names: Vec<String> = tokens[1..].iter().map(|s| s.to_string()).collect();
                if names.is_empty() {
                    return Err(PrnError::Parse {
                        line: line_no,
                        kind: PrnParseErrorKind::EmptyHeader,
                    });
                }
                let mut seen = HashSet::new();
                for name in &names {
                    if !seen.insert(name.as_str()) {
                        return Err(PrnError::Inconsistency(format!(
                            "duplicate locality '{}' in header",
                            name
                        )));
                    }
                }
                localities = Some(names);
            }
            continue;
        };

        match NaiveDate::parse_from_str(tokens[0], "%Y-%m-%d") {
            Err(_) if !data_started => continue,
            Err(_) => {
                return Err(PrnError::Parse {
                    line: line_no,
                    kind: PrnParseErrorKind::InvalidDate {
                        value: tokens[0].to_string(),
                    },
                });
            }
            Ok(date) => {
                if tokens.len() - 1 != names.len() {
                    return Err(PrnError::Parse {
                        line: line_no,
                        kind: PrnParseErrorKind::CountMismatch {
                            expected: names.len(),
                            found: tokens.len() - 1,
                        },
                    });
                }
                let values = tokens[1..]
                    .iter()
                    .map(|token| {
                        token.parse::<f64>().map_err(|_| PrnError::Parse {
                            line: line_no,
                            kind: PrnParseErrorKind::InvalidNumber {
                                value: token.to_string(),
                            },
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                rows.push(PrnRow { date, values });
                data_started = true;
            }
        }
    }

    let localities = localities.ok_or(PrnError::MissingHeader)?;
    Ok(PrnTable { localities, rows })
}

/// Parses a simulated-history table from a file path.
pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<PrnTable, PrnError> {
    let file = File::open(path)?;
    read_from(&mut BufReader::new(file))
}

/// Extracts the simulated history into one record file per locality.
///
/// Each `<out_dir>/<locality>.dat` holds `date value` rows in the fixed
/// layout the PEST instruction files address. Returns the written paths in
/// header order.
pub fn extract_prn<P: AsRef<Path>, Q: AsRef<Path>>(
    prn_path: P,
    out_dir: Q,
) -> Result<Vec<PathBuf>, PrnError> {
    let table = read_from_path(&prn_path)?;
    std::fs::create_dir_all(&out_dir)?;

    let mut written = Vec::with_capacity(table.localities.len());
    for (idx, locality) in table.localities.iter().enumerate() {
        let path = out_dir.as_ref().join(format!("{locality}.dat"));
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        for row in &table.rows {
            writeln!(
                writer,
                "{:<12} {}",
                row.date.to_string(),
                fmt::ffmt(row.values[idx])
            )?;
        }
        writer.flush()?;
        written.push(path);
    }
    debug!(
        localities = written.len(),
        steps = table.rows.len(),
        "extracted simulated records"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FIXTURE: &str = "\
 Fichier historique des resultats
 Modele mona
\tDate\tP31\tP32\tP33
\t-\tm\tm\tm
\t1998-05-31\t102.5\t88.25\t-3.5
\t1998-06-30\t101.75\t87.5\t-3.25
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_header_units_and_rows() {
        let table = read_from(&mut FIXTURE.as_bytes()).unwrap();
        assert_eq!(table.localities(), ["P31", "P32", "P33"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[0].date, date(1998, 5, 31));
        assert_eq!(table.rows()[1].values, vec![101.75, 87.5, -3.25]);
    }

    #[test]
    fn series_selects_one_column() {
        let table = read_from(&mut FIXTURE.as_bytes()).unwrap();
        let series: Vec<_> = table.series("P32").unwrap().collect();
        assert_eq!(
            series,
            vec![(date(1998, 5, 31), 88.25), (date(1998, 6, 30), 87.5)]
        );
        assert!(table.series("P99").is_none());
    }

    #[test]
    fn space_separated_rows_are_accepted() {
        let text = "Date P31\n1998-05-31 102.5\n";
        let table = read_from(&mut text.as_bytes()).unwrap();
        assert_eq!(table.localities(), ["P31"]);
        assert_eq!(table.rows()[0].values, vec![102.5]);
    }

    #[test]
    fn missing_header_is_an_error() {
        let text = "some preamble\nwithout any header\n";
        assert!(matches!(
            read_from(&mut text.as_bytes()),
            Err(PrnError::MissingHeader)
        ));
    }

    #[test]
    fn bad_dates_after_data_start_are_errors() {
        let text = "Date P31\n1998-05-31 102.5\nnot-a-date 3.0\n";
        let err = read_from(&mut text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            PrnError::Parse {
                line: 3,
                kind: PrnParseErrorKind::InvalidDate { .. },
            }
        ));
    }

    #[test]
    fn short_rows_are_errors() {
        let text = "Date P31 P32\n1998-05-31 102.5\n";
        let err = read_from(&mut text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            PrnError::Parse {
                line: 2,
                kind: PrnParseErrorKind::CountMismatch {
                    expected: 2,
                    found: 1
                },
            }
        ));
    }

    #[test]
    fn duplicate_localities_are_rejected() {
        let text = "Date P31 P31\n";
        assert!(matches!(
            read_from(&mut text.as_bytes()),
            Err(PrnError::Inconsistency(_))
        ));
    }

    #[test]
    fn extract_writes_one_record_file_per_locality() {
        let dir = tempdir().unwrap();
        let prn_path = dir.path().join("historiq.prn");
        std::fs::write(&prn_path, FIXTURE).unwrap();

        let sim_dir = dir.path().join("sim");
        let written = extract_prn(&prn_path, &sim_dir).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0], sim_dir.join("P31.dat"));

        let content = std::fs::read_to_string(&written[2]).unwrap();
        let mut lines = content.lines();
        let first = lines.next().unwrap();
        assert!(first.starts_with("1998-05-31"));
        assert!(first.split_whitespace().any(|tok| tok == "-3.5000000000E0"));
        assert_eq!(lines.count(), 1);
    }
}
