//! Fixed-width field formatting and naming conventions shared by the data,
//! template, instruction and control files.
//!
//! PEST reads whitespace-delimited columns; the fixed widths keep the files
//! human-scannable and make the template files mirror the data files
//! column for column.

/// Formats a float as a left-aligned 20-character scientific field.
pub fn ffmt(value: f64) -> String {
    format!("{:<20.10E}", value)
}

/// Formats an integer as a left-aligned 10-character field.
pub fn ifmt(value: i64) -> String {
    format!("{:<10}", value)
}

/// Formats a string as a left-aligned 20-character field.
pub fn sfmt(text: &str) -> String {
    format!("{:<20}", text)
}

/// Builds the name of a zone-of-piecewise-constancy parameter.
///
/// `lay` is 0-based in memory; names carry 1-based layers.
pub fn zpc_name(prop: &str, lay: usize, zone: i32) -> String {
    format!("{}_l{:02}_zpc{:02}", prop, lay + 1, zone.unsigned_abs())
}

/// Builds the name of a pilot-point parameter.
///
/// `lay` and `index` are 0-based in memory; names carry 1-based values.
pub fn pp_name(prop: &str, lay: usize, zone: i32, index: usize) -> String {
    format!("{}_l{:02}_z{:02}_{:03}", prop, lay + 1, zone, index + 1)
}

/// Builds the prefix of an observation locality (`number` is 1-based).
pub fn loc_prefix(number: usize) -> String {
    format!("loc{:02}", number)
}

/// Builds the name of one observation record (`index` is 0-based).
///
/// The result stays within PEST's 20-character observation-name limit for
/// any realistic record count.
pub fn obs_name(prefix: &str, index: usize) -> String {
    format!("{}_{:05}", prefix, index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_fields_are_padded_scientific() {
        assert_eq!(ffmt(1e-3), "1.0000000000E-3     ");
        assert_eq!(ffmt(-3.5), "-3.5000000000E0     ");
    }

    #[test]
    fn integer_and_string_fields_are_padded() {
        assert_eq!(ifmt(42), "42        ");
        assert_eq!(sfmt("permh"), "permh               ");
    }

    #[test]
    fn zpc_names_use_one_based_layers_and_absolute_zones() {
        assert_eq!(zpc_name("permh", 0, -1), "permh_l01_zpc01");
        assert_eq!(zpc_name("emmca", 9, -12), "emmca_l10_zpc12");
    }

    #[test]
    fn pilot_point_names_carry_layer_zone_and_index() {
        assert_eq!(pp_name("permh", 2, 1, 0), "permh_l03_z01_001");
        assert_eq!(pp_name("kepon", 0, 4, 41), "kepon_l01_z04_042");
    }

    #[test]
    fn observation_names_chain_prefix_and_record_index() {
        assert_eq!(loc_prefix(1), "loc01");
        assert_eq!(obs_name("loc01", 0), "loc01_00001");
        assert_eq!(obs_name("loc12", 99), "loc12_00100");
    }
}
