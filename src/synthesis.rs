//! Problem/impact classification and state synthesis.
//!
//! A synthesis is a count of hosts (or services) per state plus problem,
//! acknowledgement, impact and downtime tallies, each with a percentage of
//! the total. Classification never mutates the mirror: recomputed flags are
//! kept in an [`AnnotationTable`] keyed by mirror generation.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;
use vantage_types::{HostState, ItemKind, ItemRef, Mirror, Monitored, ServiceState};

/// How problem and impact flags are obtained during synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisMode {
    /// Recompute flags from state, ignoring SOFT items.
    #[default]
    Recompute,
    /// Use the flags reported by the monitoring framework as-is.
    TrustFramework,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_problem: bool,
    pub is_impact: bool,
}

impl Classification {
    /// Flags as reported by the monitoring framework.
    pub fn reported(item: &dyn Monitored) -> Self {
        Self {
            is_problem: item.status().is_problem,
            is_impact: item.status().is_impact,
        }
    }
}

/// Classify a host or service from its HARD state.
///
/// Returns `None` for SOFT items and for anything that is not checked.
/// A host is a problem when DOWN or UNKNOWN and an impact when UNREACHABLE.
/// A service is a problem when WARNING, CRITICAL or UNKNOWN, and an impact
/// when its host is not UP or it is UNREACHABLE itself.
pub fn classify(item: ItemRef<'_>, mirror: &Mirror) -> Option<Classification> {
    match item {
        ItemRef::Host(host) if host.is_hard() => Some(Classification {
            is_problem: matches!(host.state, HostState::Down | HostState::Unknown),
            is_impact: host.state == HostState::Unreachable,
        }),
        ItemRef::Service(service) if service.is_hard() => {
            let host_down = mirror
                .host(&service.host_name)
                .is_some_and(|h| h.state != HostState::Up);
            Some(Classification {
                is_problem: matches!(
                    service.state,
                    ServiceState::Warning | ServiceState::Critical | ServiceState::Unknown
                ),
                is_impact: host_down || service.state == ServiceState::Unreachable,
            })
        }
        _ => None,
    }
}

/// Side table of recomputed classifications for one mirror generation.
#[derive(Debug, Default)]
pub struct AnnotationTable {
    inner: RwLock<Annotations>,
}

#[derive(Debug, Default)]
struct Annotations {
    generation: u64,
    entries: HashMap<(ItemKind, String), Classification>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a classification, dropping entries from older generations.
    pub fn record(&self, generation: u64, item: ItemRef<'_>, classification: Classification) {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            inner.entries.clear();
            inner.generation = generation;
        }
        inner
            .entries
            .insert((item.kind(), item.full_name().into_owned()), classification);
    }

    pub fn get(&self, generation: u64, item: ItemRef<'_>) -> Option<Classification> {
        let inner = self.inner.read();
        if inner.generation != generation {
            return None;
        }
        inner
            .entries
            .get(&(item.kind(), item.full_name().into_owned()))
            .copied()
    }

    /// Classification of `item` under `mode`, independent of what was
    /// recorded before.
    ///
    /// Recomputed flags are memoized for the mirror's generation. SOFT items
    /// keep the framework's flags in both modes.
    pub fn resolve(&self, mode: SynthesisMode, mirror: &Mirror, item: ItemRef<'_>) -> Classification {
        let reported = || {
            item.as_monitored()
                .map(Classification::reported)
                .unwrap_or_default()
        };
        if mode == SynthesisMode::TrustFramework {
            return reported();
        }

        let generation = mirror.generation();
        if let Some(recorded) = self.get(generation, item) {
            return recorded;
        }
        match classify(item, mirror) {
            Some(c) => {
                self.record(generation, item, c);
                c
            }
            None => reported(),
        }
    }

    pub fn clear(&self) {
        self.inner.write().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Count and percentage for one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTally {
    /// Lower-case state name.
    pub state: &'static str,
    pub nb: usize,
    pub pct: f64,
}

/// State synthesis for a set of hosts or services.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub kind: ItemKind,
    pub nb_elts: usize,
    /// Highest business impact among the elements, 0 when empty.
    pub bi: i32,
    pub states: Vec<StateTally>,
    pub nb_problems: usize,
    pub pct_problems: f64,
    pub nb_ack: usize,
    pub pct_ack: f64,
    pub nb_impacts: usize,
    pub nb_downtime: usize,
    pub pct_downtime: f64,
}

impl Synthesis {
    /// All-zero synthesis.
    pub fn empty(kind: ItemKind) -> Self {
        let (good, bad) = state_buckets(kind);
        Self {
            kind,
            nb_elts: 0,
            bi: 0,
            states: good
                .iter()
                .chain(bad)
                .copied()
                .map(|state| StateTally {
                    state,
                    nb: 0,
                    pct: 0.0,
                })
                .collect(),
            nb_problems: 0,
            pct_problems: 0.0,
            nb_ack: 0,
            pct_ack: 0.0,
            nb_impacts: 0,
            nb_downtime: 0,
            pct_downtime: 0.0,
        }
    }

    /// Count for a lower-case state name, 0 when unknown.
    pub fn nb(&self, state: &str) -> usize {
        self.tally(state).map_or(0, |t| t.nb)
    }

    pub fn pct(&self, state: &str) -> f64 {
        self.tally(state).map_or(0.0, |t| t.pct)
    }

    fn tally(&self, state: &str) -> Option<&StateTally> {
        self.states.iter().find(|t| t.state == state)
    }
}

impl Serialize for Synthesis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("nb_elts", &self.nb_elts)?;
        map.serialize_entry("bi", &self.bi)?;
        for tally in &self.states {
            map.serialize_entry(&format!("nb_{}", tally.state), &tally.nb)?;
            map.serialize_entry(&format!("pct_{}", tally.state), &tally.pct)?;
        }
        map.serialize_entry("nb_problems", &self.nb_problems)?;
        map.serialize_entry("pct_problems", &self.pct_problems)?;
        map.serialize_entry("nb_ack", &self.nb_ack)?;
        map.serialize_entry("pct_ack", &self.pct_ack)?;
        map.serialize_entry("nb_impacts", &self.nb_impacts)?;
        map.serialize_entry("nb_downtime", &self.nb_downtime)?;
        map.serialize_entry("pct_downtime", &self.pct_downtime)?;
        map.end()
    }
}

/// Good states count every element; bad states skip acknowledged items and
/// items in downtime.
fn state_buckets(kind: ItemKind) -> (&'static [&'static str], &'static [&'static str]) {
    match kind {
        ItemKind::Service => (SERVICE_GOOD_STATES, SERVICE_BAD_STATES),
        _ => (HOST_GOOD_STATES, HOST_BAD_STATES),
    }
}

const HOST_GOOD_STATES: &[&str] = &["up", "pending"];
const HOST_BAD_STATES: &[&str] = &["down", "unreachable", "unknown"];
const SERVICE_GOOD_STATES: &[&str] = &["ok", "pending"];
const SERVICE_BAD_STATES: &[&str] = &["warning", "critical", "unreachable", "unknown"];

/// Percentage rounded to one decimal, 0 for an empty total.
pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (1000.0 * count as f64 / total as f64).round() / 10.0
}

/// Computes syntheses over item lists drawn from one mirror.
pub struct Synthesizer<'a> {
    mirror: &'a Mirror,
    mode: SynthesisMode,
    annotations: &'a AnnotationTable,
}

impl<'a> Synthesizer<'a> {
    pub fn new(mirror: &'a Mirror, mode: SynthesisMode, annotations: &'a AnnotationTable) -> Self {
        Self {
            mirror,
            mode,
            annotations,
        }
    }

    /// Synthesis of the hosts in `items`; other kinds are ignored.
    pub fn hosts(&self, items: &[ItemRef<'_>]) -> Synthesis {
        self.synthesize(ItemKind::Host, items)
    }

    /// Synthesis of the services in `items`; other kinds are ignored.
    pub fn services(&self, items: &[ItemRef<'_>]) -> Synthesis {
        self.synthesize(ItemKind::Service, items)
    }

    fn synthesize(&self, kind: ItemKind, items: &[ItemRef<'_>]) -> Synthesis {
        let elts: Vec<(ItemRef<'_>, &dyn Monitored)> = items
            .iter()
            .filter(|item| item.kind() == kind)
            .filter_map(|item| item.as_monitored().map(|m| (*item, m)))
            .collect();

        let nb_elts = elts.len();
        if nb_elts == 0 {
            return Synthesis::empty(kind);
        }

        let mut synthesis = Synthesis::empty(kind);
        synthesis.nb_elts = nb_elts;
        synthesis.bi = elts.iter().map(|(_, m)| m.business_impact()).max().unwrap_or(0);

        let (_, bad) = state_buckets(kind);
        for tally in &mut synthesis.states {
            let state = tally.state;
            let skip_handled = bad.contains(&state);
            let nb = elts
                .iter()
                .filter(|(_, m)| m.state_name().eq_ignore_ascii_case(state))
                .filter(|(_, m)| !skip_handled || !(m.is_acknowledged() || m.in_downtime()))
                .count();
            tally.nb = nb;
            tally.pct = percent(nb, nb_elts);
        }

        for (item, monitored) in &elts {
            let classification = match self.mode {
                SynthesisMode::Recompute => {
                    let Some(c) = classify(*item, self.mirror) else {
                        continue;
                    };
                    self.annotations.record(self.mirror.generation(), *item, c);
                    c
                }
                SynthesisMode::TrustFramework => Classification::reported(*monitored),
            };

            if !classification.is_problem {
                continue;
            }
            if monitored.is_acknowledged() {
                synthesis.nb_ack += 1;
            } else {
                synthesis.nb_problems += 1;
                if classification.is_impact {
                    synthesis.nb_impacts += 1;
                }
            }
        }

        synthesis.nb_downtime = elts.iter().filter(|(_, m)| m.in_downtime()).count();
        synthesis.pct_problems = percent(synthesis.nb_problems, nb_elts);
        synthesis.pct_ack = percent(synthesis.nb_ack, nb_elts);
        synthesis.pct_downtime = percent(synthesis.nb_downtime, nb_elts);

        debug!(
            kind = %kind,
            nb_elts,
            nb_problems = synthesis.nb_problems,
            nb_ack = synthesis.nb_ack,
            "synthesis computed"
        );
        synthesis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_hosts() -> Mirror {
        Mirror::builder()
            .host("h1", |h| h.state(HostState::Up).hard())
            .host("h2", |h| h.state(HostState::Down).hard())
            .host("h3", |h| h.state(HostState::Down).hard().acknowledged())
            .build()
    }

    fn host_items(mirror: &Mirror) -> Vec<ItemRef<'_>> {
        mirror.hosts().iter().map(ItemRef::Host).collect()
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 3), 33.3);
        assert_eq!(percent(2, 3), 66.7);
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(4, 4), 100.0);
    }

    #[test]
    fn test_empty_synthesis() {
        let mirror = Mirror::default();
        let table = AnnotationTable::new();
        let synthesis = Synthesizer::new(&mirror, SynthesisMode::Recompute, &table).hosts(&[]);

        assert_eq!(synthesis, Synthesis::empty(ItemKind::Host));
        assert_eq!(synthesis.nb_elts, 0);
        assert_eq!(synthesis.nb("down"), 0);
        assert_eq!(synthesis.pct_problems, 0.0);
    }

    #[test]
    fn test_host_synthesis() {
        let mirror = three_hosts();
        let table = AnnotationTable::new();
        let items = host_items(&mirror);
        let s = Synthesizer::new(&mirror, SynthesisMode::Recompute, &table).hosts(&items);

        assert_eq!(s.nb_elts, 3);
        assert_eq!(s.nb("up"), 1);
        assert_eq!(s.nb("down"), 1);
        assert_eq!(s.nb_ack, 1);
        assert_eq!(s.nb_problems, 1);
        assert_eq!(s.pct_problems, 33.3);
        assert_eq!(s.pct("up"), 33.3);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_soft_items_not_classified() {
        let mirror = Mirror::builder()
            .host("h1", |h| h.state(HostState::Down).soft())
            .build();
        let table = AnnotationTable::new();
        let items = host_items(&mirror);

        assert_eq!(classify(items[0], &mirror), None);
        let s = Synthesizer::new(&mirror, SynthesisMode::Recompute, &table).hosts(&items);
        assert_eq!(s.nb("down"), 1);
        assert_eq!(s.nb_problems, 0);
    }

    #[test]
    fn test_trust_framework_flags() {
        let mirror = Mirror::builder()
            .host("h1", |h| h.state(HostState::Up).soft().problem().impact())
            .build();
        let table = AnnotationTable::new();
        let items = host_items(&mirror);
        let s = Synthesizer::new(&mirror, SynthesisMode::TrustFramework, &table).hosts(&items);

        assert_eq!(s.nb_problems, 1);
        assert_eq!(s.nb_impacts, 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_service_impact_from_host() {
        let mirror = Mirror::builder()
            .host("web01", |h| h.state(HostState::Down).hard())
            .service("web01", "http", |s| s.state(ServiceState::Critical).hard())
            .build();
        let service = ItemRef::Service(&mirror.services()[0]);

        let c = classify(service, &mirror).unwrap();
        assert!(c.is_problem);
        assert!(c.is_impact);
    }

    #[test]
    fn test_annotations_follow_generation() {
        let mirror = three_hosts();
        let table = AnnotationTable::new();
        let item = ItemRef::Host(&mirror.hosts()[1]);
        let c = Classification {
            is_problem: true,
            is_impact: true,
        };

        table.record(1, item, c);
        assert_eq!(table.get(1, item), Some(c));
        assert_eq!(table.get(2, item), None);

        table.record(2, item, Classification::default());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_does_not_depend_on_prior_synthesis() {
        let mirror = Mirror::builder()
            .host("gw", |h| h.state(HostState::Unreachable).hard())
            .host("edge", |h| h.state(HostState::Down).soft().impact())
            .build();
        let gw = ItemRef::Host(&mirror.hosts()[0]);
        let edge = ItemRef::Host(&mirror.hosts()[1]);

        let table = AnnotationTable::new();
        let before = table.resolve(SynthesisMode::Recompute, &mirror, gw);
        assert!(before.is_impact);
        assert_eq!(table.len(), 1);

        let fresh = AnnotationTable::new();
        Synthesizer::new(&mirror, SynthesisMode::Recompute, &fresh).hosts(&host_items(&mirror));
        assert_eq!(fresh.resolve(SynthesisMode::Recompute, &mirror, gw), before);

        // SOFT items are not recomputed
        assert!(table.resolve(SynthesisMode::Recompute, &mirror, edge).is_impact);
        assert!(!table.resolve(SynthesisMode::TrustFramework, &mirror, gw).is_impact);
    }

    #[test]
    fn test_serialized_keys() {
        let mirror = three_hosts();
        let table = AnnotationTable::new();
        let items = host_items(&mirror);
        let s = Synthesizer::new(&mirror, SynthesisMode::Recompute, &table).hosts(&items);

        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(value["nb_elts"], 3);
        assert_eq!(value["nb_down"], 1);
        assert_eq!(value["pct_problems"], 33.3);
        assert!(value.get("nb_unreachable").is_some());
    }
}
