//! PEST template files.
//!
//! A template file repeats a parameter data file line for line, with each
//! value column replaced by a `~`-delimited marker naming the parameter
//! PEST substitutes there.

use std::io::{self, Write};

/// The marker delimiter declared on the `ptf` header line.
pub const DELIMITER: char = '~';

/// Builds the marker slot for one parameter, sized to the 20-character
/// value columns of the data files.
pub fn marker(name: &str) -> String {
    format!("{0}{1:^18}{0}", DELIMITER, name)
}

/// Writes a template file: the `ptf` header, then one line per row made of
/// the row's fixed prefix columns followed by the parameter marker.
///
/// The prefix must be exactly the leading columns of the corresponding data
/// file line, trailing padding included, so both files stay aligned.
pub fn write_template<W, I, S>(writer: &mut W, rows: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = (S, S)>,
    S: AsRef<str>,
{
    writeln!(writer, "ptf {}", DELIMITER)?;
    for (prefix, param) in rows {
        writeln!(writer, "{}{}", prefix.as_ref(), marker(param.as_ref()))?;
    }
    Ok(())
}
