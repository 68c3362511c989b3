use super::*;

const PREFIXES: [(char, f64); 8] = [
    ('K', 1e3),
    ('M', 1e6),
    ('G', 1e9),
    ('T', 1e12),
    ('P', 1e15),
    ('E', 1e18),
    ('Z', 1e21),
    ('Y', 1e24),
];

/// Writes `value` scaled to the largest prefix it reaches, with at most two decimals.
pub fn format_si(value: f64, unit: &str, f: &mut Formatter<'_>) -> fmt::Result {
    let (prefix, scale) = PREFIXES
        .iter()
        .rev()
        .find(|(_, scale)| value.abs() >= *scale)
        .map_or((None, 1.0), |(prefix, scale)| (Some(*prefix), *scale));

    let scaled = format!("{:.2}", value / scale);
    let scaled = scaled.trim_end_matches('0').trim_end_matches('.');

    match prefix {
        Some(prefix) => write!(f, "{scaled} {prefix}{unit}"),
        None => write!(f, "{scaled} {unit}"),
    }
}

/// Parses a non-negative number with an optional SI prefix (either case) and one of `units`.
pub fn parse_si(s: &str, units: &[&str]) -> Result<f64> {
    let invalid = |reason: &str| InternalError::InvalidValue {
        reason: format!("'{s}': {reason}"),
    };

    let mut rest = s.trim();
    if let Some(stripped) = units.iter().find_map(|unit| rest.strip_suffix(unit)) {
        rest = stripped.trim_end();
    }

    let mut scale = 1.0;
    if let Some(last) = rest.chars().last()
        && let Some((_, factor)) = PREFIXES
            .iter()
            .find(|(prefix, _)| prefix.eq_ignore_ascii_case(&last))
    {
        scale = *factor;
        rest = rest[..rest.len() - last.len_utf8()].trim_end();
    }

    if rest.is_empty() {
        return Err(invalid("missing number"));
    }

    let number = rest.parse::<f64>().map_err(|_| InternalError::Parse {
        message: format!("'{s}': invalid number"),
    })?;

    let value = number * scale;

    if !value.is_finite() || value < 0.0 {
        return Err(invalid("must be finite and non-negative"));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Si(f64);

    impl fmt::Display for Si {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            format_si(self.0, "H/s", f)
        }
    }

    #[test]
    fn formats_with_prefix() {
        assert_eq!(Si(0.0).to_string(), "0 H/s");
        assert_eq!(Si(950.0).to_string(), "950 H/s");
        assert_eq!(Si(5_250_000.0).to_string(), "5.25 MH/s");
        assert_eq!(Si(1.5e12).to_string(), "1.5 TH/s");
    }

    #[test]
    fn parses_with_prefix() {
        assert_eq!(parse_si("5.25 MH/s", &["H/s"]).unwrap(), 5_250_000.0);
        assert_eq!(parse_si("2k", &["H/s"]).unwrap(), 2000.0);
        assert!(parse_si("", &["H/s"]).is_err());
        assert!(parse_si("-1 GH/s", &["H/s"]).is_err());
    }
}
