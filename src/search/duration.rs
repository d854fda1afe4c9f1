use super::compare::Comparison;
use crate::error::PredicateError;

/// Unit suffix to seconds multiplier
const UNITS: &[(char, i64)] = &[
    ('s', 1),
    ('m', 60),
    ('h', 3_600),
    ('d', 86_400),
    ('w', 604_800),
];

/// An elapsed-time constraint such as `>=5m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeFilter {
    pub op: Comparison,
    pub seconds: i64,
}

impl AgeFilter {
    /// Whether `timestamp` satisfies the constraint at `now` (both in seconds).
    pub fn accepts(&self, timestamp: i64, now: i64) -> bool {
        self.op.holds(now - timestamp, self.seconds)
    }
}

/// Parse age strings like ">=5m", "<1h", ">2D".
///
/// An ordering operator is required; `=` and bare values are rejected.
pub fn parse_age(s: &str) -> Result<AgeFilter, PredicateError> {
    let invalid = || PredicateError::InvalidDuration(s.to_string());

    let (op, rest) = match Comparison::split(s) {
        (Some(Comparison::Eq), _) | (None, _) => return Err(invalid()),
        (Some(op), rest) => (op, rest),
    };

    let mut chars = rest.chars();
    let unit = chars.next_back().ok_or_else(invalid)?.to_ascii_lowercase();
    let multiplier = UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .map(|(_, m)| *m)
        .ok_or_else(invalid)?;
    let count: i64 = chars.as_str().parse().map_err(|_| invalid())?;

    let seconds = count.checked_mul(multiplier).ok_or_else(invalid)?;

    Ok(AgeFilter { op, seconds })
}

/// Format a number of seconds as a compact age ("3d", "2h", "45s")
pub fn format_age(seconds: i64) -> String {
    for (suffix, multiplier) in UNITS.iter().rev() {
        if seconds.abs() >= *multiplier && seconds % multiplier == 0 {
            return format!("{}{}", seconds / multiplier, suffix);
        }
    }
    format!("{}s", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes() {
        let f = parse_age(">=5m").unwrap();
        assert_eq!(f.op, Comparison::Ge);
        assert_eq!(f.seconds, 300);
    }

    #[test]
    fn test_parse_uppercase_unit() {
        assert_eq!(parse_age("<2D").unwrap().seconds, 2 * 86_400);
        assert_eq!(parse_age(">1W").unwrap().seconds, 604_800);
    }

    #[test]
    fn test_missing_operator() {
        assert!(parse_age("5m").is_err());
        assert!(parse_age("=5m").is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(parse_age(">=").is_err());
        assert!(parse_age(">=m").is_err());
        assert!(parse_age(">=5y").is_err());
        assert!(parse_age(">=abc").is_err());
    }

    #[test]
    fn test_accepts() {
        let f = parse_age(">=5m").unwrap();
        assert!(f.accepts(1_000, 1_300));
        assert!(!f.accepts(1_000, 1_299));
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(300), "5m");
        assert_eq!(format_age(90), "90s");
        assert_eq!(format_age(172_800), "2d");
    }
}
