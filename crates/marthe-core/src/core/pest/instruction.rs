//! PEST instruction files.
//!
//! Each simulated record file is addressed by one instruction per line:
//! advance one line, skip the leading date token, read the value into the
//! named observation.

use std::io::{self, Write};

/// The marker delimiter declared on the `pif` header line.
pub const DELIMITER: char = '~';

/// Writes an instruction file for a record file with one observation per
/// line, in record order.
pub fn write_instructions<W, I, S>(writer: &mut W, names: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    writeln!(writer, "pif {}", DELIMITER)?;
    for name in names {
        writeln!(writer, "l1 w !{}!", name.as_ref())?;
    }
    Ok(())
}
