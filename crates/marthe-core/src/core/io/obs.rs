use crate::core::io::traits::TextFile;
use crate::core::pest::fmt;
use chrono::NaiveDate;
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

/// One dated observation or simulated record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObsRecord {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Error)]
pub enum ObsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: ObsParseErrorKind,
    },
}

#[derive(Debug, Error)]
pub enum ObsParseErrorKind {
    #[error("Invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { value: String },
    #[error("Invalid number '{value}'")]
    InvalidNumber { value: String },
    #[error("Expected 'date value' columns, found {found} tokens")]
    WrongColumnCount { found: usize },
    #[error("Missing 'date' and 'value' columns in header")]
    MissingColumns,
}

fn parse_date(token: &str, line: usize) -> Result<NaiveDate, ObsError> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| ObsError::Parse {
        line,
        kind: ObsParseErrorKind::InvalidDate {
            value: token.to_string(),
        },
    })
}

fn parse_value(token: &str, line: usize) -> Result<f64, ObsError> {
    token.parse().map_err(|_| ObsError::Parse {
        line,
        kind: ObsParseErrorKind::InvalidNumber {
            value: token.to_string(),
        },
    })
}

/// Whitespace-separated `date value` record files.
///
/// Blank lines and `#` comments are skipped on read. The writer emits the
/// fixed layout the PEST instruction files address, which makes it the
/// format of the simulated record files too.
pub struct ObsDatFile;

impl TextFile for ObsDatFile {
    type Output = Vec<ObsRecord>;
    type Metadata = ();
    type Error = ObsError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Self::Output, Self::Metadata), Self::Error> {
        let mut records = Vec::new();
        for (line_no, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_no = line_no + 1;
            let content = line.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            let tokens: Vec<&str> = content.split_whitespace().collect();
            if tokens.len() != 2 {
                return Err(ObsError::Parse {
                    line: line_no,
                    kind: ObsParseErrorKind::WrongColumnCount {
                        found: tokens.len(),
                    },
                });
            }
            records.push(ObsRecord {
                date: parse_date(tokens[0], line_no)?,
                value: parse_value(tokens[1], line_no)?,
            });
        }
        Ok((records, ()))
    }

    fn write_to(
        value: &Self::Output,
        _metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for record in value {
            writeln!(
                writer,
                "{:<12} {}",
                record.date.to_string(),
                fmt::ffmt(record.value)
            )?;
        }
        Ok(())
    }
}

/// CSV record files with `date` and `value` columns.
///
/// Extra columns are ignored; header matching is case-insensitive.
pub struct ObsCsvFile;

impl TextFile for ObsCsvFile {
    type Output = Vec<ObsRecord>;
    type Metadata = ();
    type Error = ObsError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Self::Output, Self::Metadata), Self::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(wanted))
        };
        let (Some(date_col), Some(value_col)) = (find("date"), find("value")) else {
            return Err(ObsError::Parse {
                line: 1,
                kind: ObsParseErrorKind::MissingColumns,
            });
        };

        let mut records = Vec::new();
        for (idx, row_res) in csv_reader.records().enumerate() {
            let row = row_res?;
            let line = row
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(idx + 2);
            let date_token = row.get(date_col).unwrap_or_default();
            let value_token = row.get(value_col).unwrap_or_default();
            records.push(ObsRecord {
                date: parse_date(date_token, line)?,
                value: parse_value(value_token, line)?,
            });
        }
        Ok((records, ()))
    }

    fn write_to(
        value: &Self::Output,
        _metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["date", "value"])?;
        for record in value {
            csv_writer.write_record([record.date.to_string(), record.value.to_string()])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Reads a record file, picking the format from the file extension:
/// `.csv` is parsed as CSV, anything else as whitespace columns.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<ObsRecord>, ObsError> {
    let is_csv = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        ObsCsvFile::read_from_path(path).map(|(records, ())| records)
    } else {
        ObsDatFile::read_from_path(path).map(|(records, ())| records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dat_reader_skips_comments_and_blanks() {
        let text = "# piezometer p31\n\n1998-05-31 102.5\n1998-06-30  101.75\n";
        let (records, ()) = ObsDatFile::read_from(&mut text.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                ObsRecord {
                    date: date(1998, 5, 31),
                    value: 102.5
                },
                ObsRecord {
                    date: date(1998, 6, 30),
                    value: 101.75
                },
            ]
        );
    }

    #[test]
    fn dat_reader_reports_malformed_rows() {
        let text = "1998-05-31 102.5 extra\n";
        let err = ObsDatFile::read_from(&mut text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ObsError::Parse {
                line: 1,
                kind: ObsParseErrorKind::WrongColumnCount { found: 3 },
            }
        ));

        let text = "31/05/1998 102.5\n";
        let err = ObsDatFile::read_from(&mut text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ObsError::Parse {
                line: 1,
                kind: ObsParseErrorKind::InvalidDate { .. },
            }
        ));
    }

    #[test]
    fn dat_files_round_trip() {
        let records = vec![
            ObsRecord {
                date: date(1998, 5, 31),
                value: 102.5,
            },
            ObsRecord {
                date: date(1998, 6, 30),
                value: -3.25,
            },
        ];
        let mut buffer = Vec::new();
        ObsDatFile::write_to(&records, &(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("1998-05-31   1.0250000000E2"));

        let (reread, ()) = ObsDatFile::read_from(&mut text.as_bytes()).unwrap();
        assert_eq!(reread, records);
    }

    #[test]
    fn csv_reader_finds_columns_case_insensitively() {
        let text = "station,Date,Value\np31,1998-05-31,102.5\np31,1998-06-30,101.75\n";
        let (records, ()) = ObsCsvFile::read_from(&mut text.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].value, 101.75);
    }

    #[test]
    fn csv_reader_requires_date_and_value_columns() {
        let text = "time,head\n1998-05-31,102.5\n";
        let err = ObsCsvFile::read_from(&mut text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ObsError::Parse {
                line: 1,
                kind: ObsParseErrorKind::MissingColumns,
            }
        ));
    }

    #[test]
    fn csv_reader_reports_bad_values_with_line_numbers() {
        let text = "date,value\n1998-05-31,102.5\n1998-06-30,not-a-number\n";
        let err = ObsCsvFile::read_from(&mut text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ObsError::Parse {
                line: 3,
                kind: ObsParseErrorKind::InvalidNumber { .. },
            }
        ));
    }

    #[test]
    fn record_reading_dispatches_on_extension() {
        let dir = tempdir().unwrap();
        let dat = dir.path().join("p31.dat");
        let csv = dir.path().join("p31.csv");
        std::fs::write(&dat, "1998-05-31 102.5\n").unwrap();
        std::fs::write(&csv, "date,value\n1998-05-31,102.5\n").unwrap();

        assert_eq!(read_records(&dat).unwrap(), read_records(&csv).unwrap());
    }
}
