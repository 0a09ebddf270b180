use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FactorsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: FactorsParseErrorKind,
    },
    #[error("Factor table references {expected} pilot points, got {got} values")]
    ValueCountMismatch { expected: usize, got: usize },
    #[error("Pilot point '{name}' holds non-positive value {value} under log interpolation")]
    NonPositiveValue { name: String, value: f64 },
}

#[derive(Debug, Error)]
pub enum FactorsParseErrorKind {
    #[error("Unexpected end of file while reading {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("Invalid number '{value}'")]
    InvalidNumber { value: String },
    #[error("Expected {expected} tokens, found {found}")]
    CountMismatch { expected: usize, found: usize },
    #[error("Pilot-point index {index} outside 1..={npp}")]
    InvalidPilotIndex { index: usize, npp: usize },
    #[error("Node {node} outside 1..={max}")]
    InvalidNode { node: usize, max: usize },
    #[error("Invalid transform flag '{value}' (expected 0 or 1)")]
    InvalidTransformFlag { value: String },
}

/// The interpolation weights of one grid node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFactors {
    /// 1-based row-major node number within the layer.
    pub node: usize,
    /// Whether the weights combine log10 values.
    pub log_transformed: bool,
    /// `(pilot index, weight)` pairs; indices are 0-based in memory.
    pub weights: Vec<(usize, f64)>,
}

/// A kriging-factor file as written by PEST's `ppk2fac` utility.
///
/// The toolkit only consumes these files; producing them stays with the
/// geostatistical utilities.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpFactors {
    pp_file: String,
    zone_file: String,
    ncol: usize,
    nrow: usize,
    pp_names: Vec<String>,
    nodes: Vec<NodeFactors>,
}

struct Cursor<I> {
    lines: I,
    line_no: usize,
}

impl<I: Iterator<Item = io::Result<String>>> Cursor<I> {
    fn next_content(&mut self) -> Result<Option<(usize, String)>, FactorsError> {
        for line_res in self.lines.by_ref() {
            self.line_no += 1;
            let line = line_res?;
            if !line.trim().is_empty() {
                return Ok(Some((self.line_no, line)));
            }
        }
        Ok(None)
    }

    fn expect_content(&mut self, expected: &'static str) -> Result<(usize, String), FactorsError> {
        self.next_content()?.ok_or(FactorsError::Parse {
            line: self.line_no + 1,
            kind: FactorsParseErrorKind::UnexpectedEof { expected },
        })
    }
}

fn parse_num<T: std::str::FromStr>(token: &str, line: usize) -> Result<T, FactorsError> {
    token.parse().map_err(|_| FactorsError::Parse {
        line,
        kind: FactorsParseErrorKind::InvalidNumber {
            value: token.to_string(),
        },
    })
}

impl InterpFactors {
    /// Parses a factor file from a buffered reader.
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, FactorsError> {
        let mut cursor = Cursor {
            lines: reader.lines(),
            line_no: 0,
        };

        let pp_file = cursor.expect_content("the pilot-points file name")?.1.trim().to_string();
        let zone_file = cursor.expect_content("the zone file name")?.1.trim().to_string();

        let (dims_line_no, dims_line) = cursor.expect_content("the grid dimensions")?;
        let dims: Vec<&str> = dims_line.split_whitespace().collect();
        if dims.len() != 2 {
            return Err(FactorsError::Parse {
                line: dims_line_no,
                kind: FactorsParseErrorKind::CountMismatch {
                    expected: 2,
                    found: dims.len(),
                },
            });
        }
        let ncol: usize = parse_num(dims[0], dims_line_no)?;
        let nrow: usize = parse_num(dims[1], dims_line_no)?;

        let (npp_line_no, npp_line) = cursor.expect_content("the pilot-point count")?;
        let npp: usize = parse_num(npp_line.trim(), npp_line_no)?;

        let mut pp_names = Vec::with_capacity(npp);
        for _ in 0..npp {
            let (_, name_line) = cursor.expect_content("a pilot-point name")?;
            pp_names.push(name_line.trim().to_string());
        }

        let max_node = ncol * nrow;
        let mut nodes = Vec::new();
        while let Some((line_no, line)) = cursor.next_content()? {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 3 {
                return Err(FactorsError::Parse {
                    line: line_no,
                    kind: FactorsParseErrorKind::CountMismatch {
                        expected: 3,
                        found: tokens.len(),
                    },
                });
            }
            let node: usize = parse_num(tokens[0], line_no)?;
            if node == 0 || node > max_node {
                return Err(FactorsError::Parse {
                    line: line_no,
                    kind: FactorsParseErrorKind::InvalidNode {
                        node,
                        max: max_node,
                    },
                });
            }
            let log_transformed = match tokens[1] {
                "0" => false,
                "1" => true,
                other => {
                    return Err(FactorsError::Parse {
                        line: line_no,
                        kind: FactorsParseErrorKind::InvalidTransformFlag {
                            value: other.to_string(),
                        },
                    });
                }
            };
            let nfac: usize = parse_num(tokens[2], line_no)?;
            let expected_tokens = 3 + 2 * nfac;
            if tokens.len() != expected_tokens {
                return Err(FactorsError::Parse {
                    line: line_no,
                    kind: FactorsParseErrorKind::CountMismatch {
                        expected: expected_tokens,
                        found: tokens.len(),
                    },
                });
            }
            let mut weights = Vec::with_capacity(nfac);
            for pair in tokens[3..].chunks(2) {
                let index: usize = parse_num(pair[0], line_no)?;
                if index == 0 || index > npp {
                    return Err(FactorsError::Parse {
                        line: line_no,
                        kind: FactorsParseErrorKind::InvalidPilotIndex { index, npp },
                    });
                }
                let weight: f64 = parse_num(pair[1], line_no)?;
                weights.push((index - 1, weight));
            }
            nodes.push(NodeFactors {
                node,
                log_transformed,
                weights,
            });
        }

        Ok(Self {
            pp_file,
            zone_file,
            ncol,
            nrow,
            pp_names,
            nodes,
        })
    }

    /// Parses a factor file from a file path.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, FactorsError> {
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file))
    }

    pub fn pp_file(&self) -> &str {
        &self.pp_file
    }

    pub fn zone_file(&self) -> &str {
        &self.zone_file
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    /// Returns the pilot-point names, in file order.
    pub fn pp_names(&self) -> &[String] {
        &self.pp_names
    }

    /// Returns the per-node weight tables.
    pub fn nodes(&self) -> &[NodeFactors] {
        &self.nodes
    }

    /// Applies the factors to one value per pilot point, reproducing PEST's
    /// `fac2real`: each node takes the weighted sum of the referenced
    /// values, in log10 space when the node is flagged log-transformed.
    ///
    /// Returns `(node, value)` pairs with 1-based row-major node numbers.
    pub fn interpolate(&self, values: &[f64]) -> Result<Vec<(usize, f64)>, FactorsError> {
        if values.len() != self.pp_names.len() {
            return Err(FactorsError::ValueCountMismatch {
                expected: self.pp_names.len(),
                got: values.len(),
            });
        }
        let mut result = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let value = if node.log_transformed {
                let mut acc = 0.0;
                for &(idx, weight) in &node.weights {
                    if values[idx] <= 0.0 {
                        return Err(FactorsError::NonPositiveValue {
                            name: self.pp_names[idx].clone(),
                            value: values[idx],
                        });
                    }
                    acc += weight * values[idx].log10();
                }
                10f64.powf(acc)
            } else {
                node.weights
                    .iter()
                    .map(|&(idx, weight)| weight * values[idx])
                    .sum()
            };
            result.push((node.node, value));
        }
        Ok(result)
    }
}
