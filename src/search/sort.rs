use std::cmp::Ordering;

use vantage_types::ItemRef;

/// Result ordering for searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Sort {
    /// By full name.
    #[default]
    Name,
    /// Highest business impact first, then worst state.
    WorstFirst,
    /// Oldest state change first.
    LastStateChange,
}

impl Sort {
    pub fn compare(self, a: &ItemRef<'_>, b: &ItemRef<'_>) -> Ordering {
        match self {
            Sort::Name => a.full_name().cmp(&b.full_name()),
            Sort::WorstFirst => {
                let key = |item: &ItemRef<'_>| {
                    item.as_monitored()
                        .map_or((0, 0), |m| (m.business_impact(), m.state_id()))
                };
                key(b)
                    .cmp(&key(a))
                    .then_with(|| a.full_name().cmp(&b.full_name()))
            }
            Sort::LastStateChange => {
                let key = |item: &ItemRef<'_>| {
                    item.as_monitored()
                        .map_or(i64::MAX, |m| m.status().last_state_change)
                };
                key(a).cmp(&key(b))
            }
        }
    }

    /// Stable in-place sort.
    pub fn apply(self, items: &mut [ItemRef<'_>]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_types::{HostState, Mirror};

    fn sorted(mirror: &Mirror, sort: Sort) -> Vec<&str> {
        let mut items: Vec<ItemRef<'_>> = mirror.hosts().iter().map(ItemRef::Host).collect();
        sort.apply(&mut items);
        items.iter().map(|i| i.name()).collect()
    }

    fn mirror() -> Mirror {
        Mirror::builder()
            .host("charlie", |h| h.state(HostState::Up).business_impact(2).last_state_change(30))
            .host("alpha", |h| h.state(HostState::Down).business_impact(2).last_state_change(10))
            .host("bravo", |h| h.state(HostState::Up).business_impact(5).last_state_change(20))
            .build()
    }

    #[test]
    fn test_sort_by_name() {
        assert_eq!(sorted(&mirror(), Sort::Name), vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_sort_worst_first() {
        assert_eq!(sorted(&mirror(), Sort::WorstFirst), vec!["bravo", "alpha", "charlie"]);
    }

    #[test]
    fn test_sort_last_state_change() {
        assert_eq!(sorted(&mirror(), Sort::LastStateChange), vec!["alpha", "bravo", "charlie"]);
    }
}
