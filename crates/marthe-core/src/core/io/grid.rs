use crate::core::grid::{GeometryError, GridGeometry};
use crate::core::io::traits::TextFile;
use crate::core::models::field::MartheField;
use ndarray::Array3;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

/// File-level data carried alongside the field values, currently the title
/// line shared by all layer blocks (`<model>;<prop>` by convention).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridMetadata {
    pub title: String,
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: GridParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error)]
pub enum GridParseErrorKind {
    #[error("Expected a 'Marthe_Grid' block header")]
    MissingHeader,
    #[error("Expected a 'Key=Value' entry or a section header")]
    MalformedEntry,
    #[error("Missing required entry '{entry}'")]
    MissingEntry { entry: &'static str },
    #[error("Expected the '{section}' section")]
    MissingSection { section: &'static str },
    #[error("Invalid number '{value}'")]
    InvalidNumber { value: String },
    #[error("Expected {expected} values, found {found}")]
    CountMismatch { expected: usize, found: usize },
    #[error("Unexpected end of file while reading {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("{0}")]
    Geometry(GeometryError),
}

struct Cursor<I> {
    lines: I,
    line_no: usize,
}

impl<I: Iterator<Item = io::Result<String>>> Cursor<I> {
    fn new(lines: I) -> Self {
        Self { lines, line_no: 0 }
    }

    /// Returns the next non-blank line with its 1-based number.
    fn next_content(&mut self) -> Result<Option<(usize, String)>, GridError> {
        for line_res in self.lines.by_ref() {
            self.line_no += 1;
            let line = line_res?;
            if !line.trim().is_empty() {
                return Ok(Some((self.line_no, line)));
            }
        }
        Ok(None)
    }

    fn expect_content(&mut self, expected: &'static str) -> Result<(usize, String), GridError> {
        self.next_content()?.ok_or(GridError::Parse {
            line: self.line_no + 1,
            kind: GridParseErrorKind::UnexpectedEof { expected },
        })
    }
}

struct RawBlock {
    title: String,
    field: String,
    layer: usize,
    ncol: usize,
    nrow: usize,
    xs: Vec<f64>,
    ys: Vec<f64>,
    values: Vec<f64>,
}

fn parse_num<T: FromStr>(value: &str, line: usize) -> Result<T, GridError> {
    value.parse().map_err(|_| GridError::Parse {
        line,
        kind: GridParseErrorKind::InvalidNumber {
            value: value.to_string(),
        },
    })
}

fn parse_float_row(line: &str, line_no: usize, expected: usize) -> Result<Vec<f64>, GridError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != expected {
        return Err(GridError::Parse {
            line: line_no,
            kind: GridParseErrorKind::CountMismatch {
                expected,
                found: tokens.len(),
            },
        });
    }
    tokens
        .into_iter()
        .map(|token| parse_num(token, line_no))
        .collect()
}

type Entries = BTreeMap<String, (usize, String)>;

fn require<'a>(
    entries: &'a Entries,
    entry: &'static str,
    section_line: usize,
) -> Result<(usize, &'a str), GridError> {
    entries
        .get(entry)
        .map(|(line, value)| (*line, value.as_str()))
        .ok_or(GridError::Parse {
            line: section_line,
            kind: GridParseErrorKind::MissingEntry { entry },
        })
}

fn require_parsed<T: FromStr>(
    entries: &Entries,
    entry: &'static str,
    section_line: usize,
) -> Result<T, GridError> {
    let (line, value) = require(entries, entry, section_line)?;
    parse_num(value, line)
}

fn parse_block<I: Iterator<Item = io::Result<String>>>(
    cursor: &mut Cursor<I>,
) -> Result<Option<RawBlock>, GridError> {
    let Some((header_line, header)) = cursor.next_content()? else {
        return Ok(None);
    };
    if !header.trim_start().starts_with("Marthe_Grid") {
        return Err(GridError::Parse {
            line: header_line,
            kind: GridParseErrorKind::MissingHeader,
        });
    }

    // Entries may be spread over [Infos], [Structure] and any other section
    // a simulator version emits; only the known keys are interpreted.
    let mut entries = Entries::new();
    let axes_line = loop {
        let (line_no, line) = cursor.expect_content("a grid section")?;
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            if trimmed == "[Columns_x_and_Rows_y]" {
                break line_no;
            }
            continue;
        }
        match trimmed.split_once('=') {
            Some((key, value)) => {
                entries
                    .entry(key.trim().to_string())
                    .or_insert((line_no, value.trim().to_string()));
            }
            None => {
                return Err(GridError::Parse {
                    line: line_no,
                    kind: GridParseErrorKind::MalformedEntry,
                });
            }
        }
    };

    let field = require(&entries, "Field", axes_line)?.1.to_string();
    let layer: usize = require_parsed(&entries, "Layer", axes_line)?;
    let _x_left: f64 = require_parsed(&entries, "X_Left_Corner", axes_line)?;
    let _y_lower: f64 = require_parsed(&entries, "Y_Lower_Corner", axes_line)?;
    let ncol: usize = require_parsed(&entries, "Ncolumn", axes_line)?;
    let nrow: usize = require_parsed(&entries, "Nrows", axes_line)?;
    let title = entries
        .get("Title")
        .map(|(_, value)| value.clone())
        .unwrap_or_default();

    let (x_line_no, x_line) = cursor.expect_content("column centers")?;
    let xs = parse_float_row(&x_line, x_line_no, ncol)?;
    let (y_line_no, y_line) = cursor.expect_content("row centers")?;
    let ys = parse_float_row(&y_line, y_line_no, nrow)?;

    let (line_no, line) = cursor.expect_content("the '[Data_Values]' section")?;
    if line.trim() != "[Data_Values]" {
        return Err(GridError::Parse {
            line: line_no,
            kind: GridParseErrorKind::MissingSection {
                section: "[Data_Values]",
            },
        });
    }

    let mut values = Vec::with_capacity(nrow * ncol);
    for _ in 0..nrow {
        let (row_line_no, row_line) = cursor.expect_content("a data row")?;
        values.extend(parse_float_row(&row_line, row_line_no, ncol)?);
    }

    let (line_no, line) = cursor.expect_content("the '[End_Grid]' marker")?;
    if line.trim() != "[End_Grid]" {
        return Err(GridError::Parse {
            line: line_no,
            kind: GridParseErrorKind::MissingSection {
                section: "[End_Grid]",
            },
        });
    }

    Ok(Some(RawBlock {
        title,
        field,
        layer,
        ncol,
        nrow,
        xs,
        ys,
        values,
    }))
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Codec for MARTHE exchange grid files: one `Marthe_Grid` block per layer,
/// each carrying the cell-center axes and a row-major value matrix.
pub struct GridFile;

impl TextFile for GridFile {
    type Output = MartheField;
    type Metadata = GridMetadata;
    type Error = GridError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Self::Output, Self::Metadata), Self::Error> {
        let mut cursor = Cursor::new(reader.lines());

        let mut blocks: Vec<RawBlock> = Vec::new();
        while let Some(block) = parse_block(&mut cursor)? {
            let expected_layer = blocks.len() + 1;
            if block.layer != expected_layer {
                return Err(GridError::Inconsistency(format!(
                    "layer blocks out of order: expected layer {}, found layer {}",
                    expected_layer, block.layer
                )));
            }
            if let Some(first) = blocks.first() {
                if block.field != first.field {
                    return Err(GridError::Inconsistency(format!(
                        "field name changes between blocks: '{}' then '{}'",
                        first.field, block.field
                    )));
                }
                if block.ncol != first.ncol
                    || block.nrow != first.nrow
                    || block.xs != first.xs
                    || block.ys != first.ys
                {
                    return Err(GridError::Inconsistency(format!(
                        "grid structure changes at layer {}",
                        block.layer
                    )));
                }
            }
            blocks.push(block);
        }

        let Some(first) = blocks.first() else {
            return Err(GridError::Inconsistency(
                "no 'Marthe_Grid' blocks found".to_string(),
            ));
        };

        let geometry =
            GridGeometry::new(first.xs.clone(), first.ys.clone()).map_err(|e| GridError::Parse {
                line: 0,
                kind: GridParseErrorKind::Geometry(e),
            })?;
        let metadata = GridMetadata {
            title: first.title.clone(),
        };
        let name = first.field.clone();
        let (nlay, nrow, ncol) = (blocks.len(), first.nrow, first.ncol);

        let mut data = Vec::with_capacity(nlay * nrow * ncol);
        for block in &blocks {
            data.extend_from_slice(&block.values);
        }
        let values = Array3::from_shape_vec((nlay, nrow, ncol), data)
            .map_err(|e| GridError::Inconsistency(e.to_string()))?;
        let field = MartheField::new(name, geometry, values)
            .map_err(|e| GridError::Inconsistency(e.to_string()))?;

        Ok((field, metadata))
    }

    fn write_to(
        value: &Self::Output,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let shape = value.shape();
        let geometry = value.geometry();
        for lay in 0..shape.nlay {
            writeln!(writer, "Marthe_Grid 1.0")?;
            writeln!(writer, "Title={}", metadata.title)?;
            writeln!(writer, "[Infos]")?;
            writeln!(writer, "Field={}", value.name())?;
            writeln!(writer, "Layer={}", lay + 1)?;
            writeln!(writer, "[Structure]")?;
            writeln!(writer, "X_Left_Corner={}", geometry.x_left_edge())?;
            writeln!(writer, "Y_Lower_Corner={}", geometry.y_lower_edge())?;
            writeln!(writer, "Ncolumn={}", shape.ncol)?;
            writeln!(writer, "Nrows={}", shape.nrow)?;
            writeln!(writer, "[Columns_x_and_Rows_y]")?;
            writeln!(writer, "{}", join_floats(geometry.x_centers()))?;
            writeln!(writer, "{}", join_floats(geometry.y_centers()))?;
            writeln!(writer, "[Data_Values]")?;
            for row in 0..shape.nrow {
                let line = (0..shape.ncol)
                    .map(|col| format!("{:<15.8E}", value.values()[[lay, row, col]]))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(writer, "{}", line.trim_end())?;
            }
            writeln!(writer, "[End_Grid]")?;
        }
        Ok(())
    }
}
