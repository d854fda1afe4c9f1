//! Comparison operators for numeric predicate values (`bi:>=3`).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

impl Comparison {
    /// Split a leading operator off `value`.
    ///
    /// Returns `None` for the operator when the value carries none.
    pub fn split(value: &str) -> (Option<Comparison>, &str) {
        // two-character operators first
        for (prefix, op) in [
            (">=", Comparison::Ge),
            ("<=", Comparison::Le),
            (">", Comparison::Gt),
            ("<", Comparison::Lt),
            ("=", Comparison::Eq),
        ] {
            if let Some(rest) = value.strip_prefix(prefix) {
                return (Some(op), rest);
            }
        }
        (None, value)
    }

    pub fn holds<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            Comparison::Ge => lhs >= rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Eq => lhs == rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Ge => ">=",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
            Comparison::Eq => "=",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        assert_eq!(Comparison::split(">=3"), (Some(Comparison::Ge), "3"));
        assert_eq!(Comparison::split("<=3"), (Some(Comparison::Le), "3"));
        assert_eq!(Comparison::split(">3"), (Some(Comparison::Gt), "3"));
        assert_eq!(Comparison::split("<3"), (Some(Comparison::Lt), "3"));
        assert_eq!(Comparison::split("=3"), (Some(Comparison::Eq), "3"));
        assert_eq!(Comparison::split("3"), (None, "3"));
    }

    #[test]
    fn test_holds() {
        assert!(Comparison::Ge.holds(3, 3));
        assert!(!Comparison::Gt.holds(3, 3));
        assert!(Comparison::Lt.holds(2, 3));
        assert!(Comparison::Eq.holds(5, 5));
    }
}
