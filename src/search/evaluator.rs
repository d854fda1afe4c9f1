//! Applies parsed predicates to an item list.

use std::collections::HashSet;

use tracing::{debug, warn};
use vantage_types::{Contact, Host, ItemRef, Mirror, Monitored, StateType};

use super::compare::Comparison;
use super::duration::parse_age;
use super::parser::Predicate;
use super::pattern::Pattern;
use crate::error::PredicateError;
use crate::relation::{related, ContactViewer, Viewer};
use crate::synthesis::{AnnotationTable, SynthesisMode};

/// Everything a search needs besides the items themselves.
pub struct SearchScope<'m, 'v> {
    pub mirror: &'m Mirror,
    pub viewer: Option<&'v dyn Viewer>,
    pub annotations: &'m AnnotationTable,
    /// How `is:impact` is decided; the annotation table only memoizes.
    pub mode: SynthesisMode,
    /// Current time in seconds since the epoch, for age predicates.
    pub now: i64,
    /// Resolve `host:` predicates against templates instead of live items.
    pub want_templates: bool,
}

type Filtered<'m> = Result<Vec<ItemRef<'m>>, PredicateError>;

impl<'m, 'v> SearchScope<'m, 'v> {
    /// Apply `predicates` in order, narrowing `items` at each step.
    ///
    /// Legacy `ack:`, `downtime:` and `crit` terms are rewritten into
    /// `is:`/`isnot:` predicates appended after the original ones. A
    /// predicate that cannot be applied empties the result.
    pub fn evaluate(
        &self,
        mut items: Vec<ItemRef<'m>>,
        templates: &[ItemRef<'m>],
        mut predicates: Vec<Predicate>,
    ) -> Vec<ItemRef<'m>> {
        let mut next = 0;
        while next < predicates.len() {
            let key = predicates[next].key.to_lowercase();
            let value = predicates[next].value.clone();
            next += 1;

            if matches!(key.as_str(), "ack" | "downtime" | "crit") {
                if let Some(rewritten) = legacy_rewrite(&key, &value) {
                    debug!(key = %key, value = %value, rewritten = ?rewritten, "rewriting legacy predicate");
                    predicates.push(rewritten);
                }
                continue;
            }

            let before = items.len();
            items = match self.apply(&key, &value, items, templates) {
                Ok(items) => items,
                Err(e) => {
                    warn!(key = %key, error = %e, "predicate matches nothing");
                    Vec::new()
                }
            };
            debug!(key = %key, value = %value, before, after = items.len(), "applied predicate");
        }
        items
    }

    fn apply(
        &self,
        key: &str,
        value: &str,
        items: Vec<ItemRef<'m>>,
        templates: &[ItemRef<'m>],
    ) -> Filtered<'m> {
        match key {
            "name" => self.by_name(value, items, templates),
            "h" | "host" if !is_all(value) => self.by_host(value, items, templates),
            "s" | "service" if !is_all(value) => by_pattern(value, items, |item| {
                item.as_service().map(|s| s.description.as_str())
            }),
            "c" | "contact" if !is_all(value) => {
                by_pattern(value, items, |item| item.as_contact().map(|c| c.name.as_str()))
            }
            "hg" | "hgroup" | "hostgroup" if !is_all(value) => self.by_hostgroup(value, items),
            "sg" | "sgroup" | "servicegroup" if !is_all(value) => {
                self.by_servicegroup(value, items)
            }
            "cg" | "cgroup" | "contactgroup" if !is_all(value) => {
                self.by_contactgroup(value, items)
            }
            "realm" if !is_all(value) => self.by_realm(value, items),
            "htag" | "stag" if !is_all(value) => Ok(items
                .into_iter()
                .filter(|item| item.as_monitored().is_some_and(|m| m.tags().contains(value)))
                .collect()),
            "ctag" if !is_all(value) => self.by_contact_tag(value, items),
            "type" if !is_all(value) => Ok(items
                .into_iter()
                .filter(|item| item.kind().as_str() == value)
                .collect()),
            "bp" | "bi" => by_business_impact(value, items),
            "duration" => self.by_age(value, items, |m| m.status().last_state_change),
            "last_check" => self.by_age(value, items, |m| m.status().last_check),
            "is" => self.by_state(value, items, true),
            "isnot" => self.by_state(value, items, false),
            _ => Ok(items),
        }
    }

    /// Match on full name or alias, then on related impacts and problems.
    ///
    /// When nothing matches, falls back to templates matching the name and
    /// items whose (or whose related items') check output matches.
    fn by_name(&self, value: &str, items: Vec<ItemRef<'m>>, templates: &[ItemRef<'m>]) -> Filtered<'m> {
        let pattern = Pattern::compile_case_insensitive(value)?;

        let names_match = |item: &ItemRef<'m>| {
            pattern.is_match(&item.full_name())
                || item
                    .as_host()
                    .and_then(|h| Monitored::alias(h))
                    .is_some_and(|alias| pattern.is_match(alias))
        };
        let output_matches = |item: &ItemRef<'m>| {
            item.as_monitored()
                .is_some_and(|m| pattern.is_match(&m.status().output))
        };

        let mut seen = HashSet::new();
        let matched: Vec<ItemRef<'m>> = items
            .iter()
            .copied()
            .filter(|item| names_match(item) || self.related_items(*item).iter().any(names_match))
            .filter(|item| seen.insert(*item))
            .collect();
        if !matched.is_empty() {
            return Ok(matched);
        }

        let mut fallback: Vec<ItemRef<'m>> = templates
            .iter()
            .copied()
            .filter(|t| pattern.is_match(&t.full_name()))
            .collect();
        fallback.extend(items.iter().copied().filter(|item| {
            output_matches(item) || self.related_items(*item).iter().any(output_matches)
        }));
        Ok(fallback)
    }

    /// Impacts and source problems of `item`, resolved in the mirror.
    fn related_items(&self, item: ItemRef<'m>) -> Vec<ItemRef<'m>> {
        let Some(monitored) = item.as_monitored() else {
            return Vec::new();
        };
        monitored
            .impacts()
            .iter()
            .chain(monitored.source_problems())
            .filter_map(|name| self.mirror.item(name))
            .collect()
    }

    fn by_host(&self, value: &str, items: Vec<ItemRef<'m>>, templates: &[ItemRef<'m>]) -> Filtered<'m> {
        let source = if self.want_templates {
            templates.to_vec()
        } else {
            items
        };
        by_pattern(value, source, |item| match *item {
            ItemRef::Host(h) => Some(h.name.as_str()),
            ItemRef::Service(s) => Some(s.host_name.as_str()),
            _ => None,
        })
    }

    fn host_of(&self, item: ItemRef<'m>) -> Option<&'m Host> {
        match item {
            ItemRef::Host(h) => Some(h),
            ItemRef::Service(s) => self.mirror.host(&s.host_name),
            _ => None,
        }
    }

    fn by_hostgroup(&self, value: &str, items: Vec<ItemRef<'m>>) -> Filtered<'m> {
        let Some(group) = self.mirror.hostgroup(value) else {
            debug!(hostgroup = value, "unknown host group");
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter(|item| {
                self.host_of(*item)
                    .is_some_and(|h| h.hostgroups.iter().any(|g| *g == group.name))
            })
            .collect())
    }

    fn by_servicegroup(&self, value: &str, items: Vec<ItemRef<'m>>) -> Filtered<'m> {
        let Some(group) = self.mirror.servicegroup(value) else {
            debug!(servicegroup = value, "unknown service group");
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter(|item| {
                item.as_service()
                    .is_some_and(|s| s.servicegroups.iter().any(|g| *g == group.name))
            })
            .collect())
    }

    fn by_contactgroup(&self, value: &str, items: Vec<ItemRef<'m>>) -> Filtered<'m> {
        let group = self
            .mirror
            .contactgroup(value)
            .and_then(|g| related(ItemRef::ContactGroup(g), self.viewer))
            .and_then(|item| item.as_group());
        let Some(group) = group else {
            debug!(contactgroup = value, "unknown contact group");
            return Ok(Vec::new());
        };

        let members = self.visible_contacts(|c| group.has_member(&c.name));
        Ok(self.related_to_any(&members, items))
    }

    fn by_contact_tag(&self, value: &str, items: Vec<ItemRef<'m>>) -> Filtered<'m> {
        let tagged = self.visible_contacts(|c| c.tags.contains(value));
        Ok(self.related_to_any(&tagged, items))
    }

    fn visible_contacts(&self, keep: impl Fn(&Contact) -> bool) -> Vec<&'m Contact> {
        self.mirror
            .contacts()
            .iter()
            .filter(|c| keep(*c))
            .filter(|c| related(ItemRef::Contact(*c), self.viewer).is_some())
            .collect()
    }

    /// Items visible to at least one of `contacts`, in input order.
    fn related_to_any(&self, contacts: &[&'m Contact], items: Vec<ItemRef<'m>>) -> Vec<ItemRef<'m>> {
        let viewers: Vec<ContactViewer<'m>> = contacts
            .iter()
            .map(|c| ContactViewer::new(*c, self.mirror))
            .collect();
        items
            .into_iter()
            .filter(|item| {
                viewers
                    .iter()
                    .any(|v| related(*item, Some(v as &dyn Viewer)).is_some())
            })
            .collect()
    }

    fn by_realm(&self, value: &str, items: Vec<ItemRef<'m>>) -> Filtered<'m> {
        let Some(realm) = self.mirror.realm(value) else {
            debug!(realm = value, "unknown realm");
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter(|item| {
                self.host_of(*item)
                    .is_some_and(|h| h.realm.as_deref() == Some(realm.name.as_str()))
            })
            .collect())
    }

    fn by_age(
        &self,
        value: &str,
        items: Vec<ItemRef<'m>>,
        timestamp: impl Fn(&dyn Monitored) -> i64,
    ) -> Filtered<'m> {
        let filter = parse_age(value)?;
        Ok(items
            .into_iter()
            .filter(|item| {
                item.as_monitored()
                    .is_some_and(|m| filter.accepts(timestamp(m), self.now))
            })
            .collect())
    }

    fn by_state(&self, value: &str, items: Vec<ItemRef<'m>>, positive: bool) -> Filtered<'m> {
        let test = StateTest::parse(value)?;
        Ok(items
            .into_iter()
            .filter(|item| self.holds(&test, *item) == positive)
            .collect())
    }

    fn holds(&self, test: &StateTest, item: ItemRef<'m>) -> bool {
        let Some(monitored) = item.as_monitored() else {
            return false;
        };
        // a service inherits acknowledgement and downtime from its host
        let host = item.as_service().and_then(|s| self.mirror.host(&s.host_name));

        match test {
            StateTest::Ack => {
                monitored.is_acknowledged() || host.is_some_and(|h| h.is_acknowledged())
            }
            StateTest::Downtime => monitored.in_downtime() || host.is_some_and(|h| h.in_downtime()),
            StateTest::Impact => {
                self.annotations
                    .resolve(self.mode, self.mirror, item)
                    .is_impact
            }
            StateTest::Flapping => monitored.is_flapping(),
            StateTest::Soft => !monitored.is_hard(),
            StateTest::Hard => monitored.is_hard(),
            StateTest::State { state, state_type } => {
                let state_matches = match state {
                    StateRef::Id(id) => monitored.state_id() == *id,
                    StateRef::Name(name) => monitored.state_name() == name.as_str(),
                };
                state_matches
                    && state_type.map_or(true, |t| monitored.status().state_type == t)
            }
        }
    }
}

fn is_all(value: &str) -> bool {
    value.eq_ignore_ascii_case("all")
}

/// Keep items whose extracted field matches `value` (case-sensitive).
fn by_pattern<'m>(
    value: &str,
    items: Vec<ItemRef<'m>>,
    field: impl Fn(&ItemRef<'m>) -> Option<&'m str>,
) -> Filtered<'m> {
    let pattern = Pattern::compile(value)?;
    Ok(items
        .into_iter()
        .filter(|item| field(item).is_some_and(|text| pattern.is_match(text)))
        .collect())
}

fn by_business_impact<'m>(value: &str, items: Vec<ItemRef<'m>>) -> Filtered<'m> {
    let (op, number) = Comparison::split(value);
    let op = op.unwrap_or(Comparison::Eq);
    let bi: i32 = number
        .trim()
        .parse()
        .map_err(|_| PredicateError::InvalidNumber(value.to_string()))?;
    Ok(items
        .into_iter()
        .filter(|item| {
            item.as_monitored()
                .is_some_and(|m| op.holds(m.business_impact(), bi))
        })
        .collect())
}

/// `ack:`, `downtime:` and `crit` shorthands.
fn legacy_rewrite(key: &str, value: &str) -> Option<Predicate> {
    let flag = match value.to_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    };
    match (key, flag) {
        ("ack", Some(true)) => Some(Predicate::new("is", "ack")),
        ("ack", Some(false)) => Some(Predicate::new("isnot", "ack")),
        ("downtime", Some(true)) => Some(Predicate::new("is", "downtime")),
        ("downtime", Some(false)) => Some(Predicate::new("isnot", "downtime")),
        ("crit", _) => Some(Predicate::new("is", "critical")),
        _ => None,
    }
}

/// Parsed value of an `is:`/`isnot:` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StateTest {
    Ack,
    Downtime,
    Impact,
    Flapping,
    Soft,
    Hard,
    State {
        state: StateRef,
        state_type: Option<StateType>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StateRef {
    Id(u8),
    /// Upper-case state name.
    Name(String),
}

impl StateTest {
    /// A single character is a state id and anything longer a state name.
    /// An `s` or `h` prefix additionally requires a SOFT or HARD state.
    fn parse(value: &str) -> Result<Self, PredicateError> {
        let lowered = value.to_lowercase();
        match lowered.as_str() {
            "ack" => return Ok(StateTest::Ack),
            "downtime" => return Ok(StateTest::Downtime),
            "impact" => return Ok(StateTest::Impact),
            "flapping" => return Ok(StateTest::Flapping),
            "soft" => return Ok(StateTest::Soft),
            "hard" => return Ok(StateTest::Hard),
            _ => {}
        }

        let (state_type, rest) = if let Some(rest) = lowered.strip_prefix('s') {
            (Some(StateType::Soft), rest)
        } else if let Some(rest) = lowered.strip_prefix('h') {
            (Some(StateType::Hard), rest)
        } else {
            (None, lowered.as_str())
        };

        let state = if rest.chars().count() == 1 {
            let id = rest
                .parse()
                .map_err(|_| PredicateError::InvalidNumber(rest.to_string()))?;
            StateRef::Id(id)
        } else {
            StateRef::Name(rest.to_uppercase())
        };
        Ok(StateTest::State { state, state_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_types::{HostState, ServiceState};

    fn scope<'m>(mirror: &'m Mirror, annotations: &'m AnnotationTable) -> SearchScope<'m, 'static> {
        SearchScope {
            mirror,
            viewer: None,
            annotations,
            mode: SynthesisMode::Recompute,
            now: 10_000,
            want_templates: false,
        }
    }

    fn all_items(mirror: &Mirror) -> Vec<ItemRef<'_>> {
        mirror
            .hosts()
            .iter()
            .map(ItemRef::Host)
            .chain(mirror.services().iter().map(ItemRef::Service))
            .collect()
    }

    fn names(items: &[ItemRef<'_>]) -> Vec<String> {
        items.iter().map(|i| i.full_name().into_owned()).collect()
    }

    fn run(mirror: &Mirror, query: &str) -> Vec<String> {
        let table = AnnotationTable::new();
        let s = scope(mirror, &table);
        names(&s.evaluate(all_items(mirror), &[], crate::search::parse(query)))
    }

    fn sample() -> Mirror {
        Mirror::builder()
            .host("web01", |h| {
                h.state(HostState::Up)
                    .hard()
                    .alias("Front server")
                    .hostgroup("linux")
                    .realm("paris")
                    .tag("http")
                    .business_impact(4)
                    .last_state_change(9_000)
            })
            .host("db01", |h| {
                h.state(HostState::Down)
                    .soft()
                    .acknowledged()
                    .business_impact(2)
                    .output("connection refused")
                    .last_state_change(1_000)
            })
            .service("web01", "http", |s| {
                s.state(ServiceState::Critical)
                    .hard()
                    .servicegroup("web")
                    .business_impact(5)
            })
            .service("db01", "mysql", |s| s.state(ServiceState::Ok).in_downtime())
            .hostgroup("linux", |g| g)
            .servicegroup("web", |g| g)
            .realm(vantage_types::Realm::new("paris"))
            .build()
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let mirror = sample();
        assert_eq!(run(&mirror, ""), vec!["web01", "db01", "web01/http", "db01/mysql"]);
    }

    #[test]
    fn test_name_matches_alias_case_insensitive() {
        let mirror = sample();
        assert_eq!(run(&mirror, "FRONT"), vec!["web01"]);
        assert_eq!(run(&mirror, "mysql"), vec!["db01/mysql"]);
    }

    /// A DOWN router taking a host and one of its services down with it.
    fn outage() -> Mirror {
        Mirror::builder()
            .host("router", |h| {
                h.state(HostState::Down)
                    .hard()
                    .output("PING CRITICAL - Packet loss = 100%")
                    .impacts("web01")
                    .impacts("web01/portal")
            })
            .host("web01", |h| h.state(HostState::Unreachable).hard().source_problem("router"))
            .host("db02", |h| h.state(HostState::Up).output("PING OK"))
            .host_template("generic-router", |h| h)
            .service("web01", "portal", |s| {
                s.state(ServiceState::Unknown).hard().source_problem("router")
            })
            .build()
    }

    fn run_with_templates(mirror: &Mirror, query: &str) -> Vec<String> {
        let table = AnnotationTable::new();
        let templates: Vec<ItemRef<'_>> = mirror.host_templates().iter().map(ItemRef::Host).collect();
        names(&scope(mirror, &table).evaluate(all_items(mirror), &templates, crate::search::parse(query)))
    }

    #[test]
    fn test_name_matches_through_source_problems() {
        let mirror = outage();
        assert_eq!(
            run_with_templates(&mirror, "^router$"),
            vec!["router", "web01", "web01/portal"]
        );
        assert_eq!(run_with_templates(&mirror, "type:service ^router$"), vec!["web01/portal"]);
    }

    #[test]
    fn test_name_falls_back_to_templates() {
        let mirror = outage();
        assert_eq!(run_with_templates(&mirror, "generic"), vec!["generic-router"]);
        assert!(run(&mirror, "generic").is_empty());
    }

    #[test]
    fn test_name_falls_back_to_related_output() {
        let mirror = outage();
        assert_eq!(
            run_with_templates(&mirror, "packet loss"),
            vec!["router", "web01", "web01/portal"]
        );
        assert_eq!(run(&mirror, "\"PING OK\""), vec!["db02"]);
    }

    #[test]
    fn test_name_falls_back_to_output() {
        let mirror = sample();
        assert_eq!(run(&mirror, "refused"), vec!["db01"]);
    }

    #[test]
    fn test_negated_name() {
        let mirror = sample();
        assert_eq!(run(&mirror, "NOT db"), vec!["web01", "web01/http"]);
    }

    #[test]
    fn test_host_and_service() {
        let mirror = sample();
        assert_eq!(run(&mirror, "host:^web01$"), vec!["web01", "web01/http"]);
        assert_eq!(run(&mirror, "h:all"), run(&mirror, ""));
        assert_eq!(run(&mirror, "s:http"), vec!["web01/http"]);
        assert!(run(&mirror, "contact:admin").is_empty());
    }

    #[test]
    fn test_groups_and_realm() {
        let mirror = sample();
        assert_eq!(run(&mirror, "hg:linux"), vec!["web01", "web01/http"]);
        assert_eq!(run(&mirror, "sg:web"), vec!["web01/http"]);
        assert!(run(&mirror, "hg:missing").is_empty());
        assert_eq!(run(&mirror, "realm:paris"), vec!["web01", "web01/http"]);
        assert!(run(&mirror, "realm:tokyo").is_empty());
    }

    #[test]
    fn test_type_and_tags() {
        let mirror = sample();
        assert_eq!(run(&mirror, "type:host"), vec!["web01", "db01"]);
        assert_eq!(run(&mirror, "htag:http"), vec!["web01"]);
    }

    #[test]
    fn test_business_impact() {
        let mirror = sample();
        assert_eq!(run(&mirror, "bi:>=4"), vec!["web01", "web01/http"]);
        assert_eq!(run(&mirror, "bi:2"), vec!["db01", "db01/mysql"]);
        assert_eq!(run(&mirror, "bp:<3"), vec!["db01", "db01/mysql"]);
        assert!(run(&mirror, "bi:>=abc").is_empty());
    }

    #[test]
    fn test_duration() {
        let mirror = sample();
        // now is 10_000
        assert_eq!(run(&mirror, "type:host duration:>=1h"), vec!["db01"]);
        assert_eq!(run(&mirror, "type:host duration:<1h"), vec!["web01"]);
        assert!(run(&mirror, "duration:5m").is_empty());
    }

    #[test]
    fn test_state_by_name_and_id() {
        let mirror = sample();
        assert_eq!(run(&mirror, "is:critical"), vec!["web01/http"]);
        assert_eq!(run(&mirror, "is:1"), vec!["db01"]);
        assert_eq!(run(&mirror, "type:host is:sdown"), vec!["db01"]);
        assert!(run(&mirror, "type:host is:hdown").is_empty());
        assert_eq!(run(&mirror, "type:service is:h2"), vec!["web01/http"]);
    }

    #[test]
    fn test_ack_and_downtime_inherit_from_host() {
        let mirror = sample();
        assert_eq!(run(&mirror, "is:ack"), vec!["db01", "db01/mysql"]);
        assert_eq!(run(&mirror, "isnot:ack"), vec!["web01", "web01/http"]);
        assert_eq!(run(&mirror, "is:downtime"), vec!["db01/mysql"]);
    }

    #[test]
    fn test_isnot_is_complement() {
        let mirror = sample();
        for value in ["ack", "downtime", "impact", "soft", "hard", "0", "critical", "sdown"] {
            let mut union = run(&mirror, &format!("is:{}", value));
            union.extend(run(&mirror, &format!("isnot:{}", value)));
            union.sort();
            let mut everything = run(&mirror, "");
            everything.sort();
            assert_eq!(union, everything, "value {}", value);
        }
    }

    #[test]
    fn test_legacy_predicates() {
        let mirror = sample();
        assert_eq!(run(&mirror, "ack:no"), run(&mirror, "isnot:ack"));
        assert_eq!(run(&mirror, "downtime:yes"), run(&mirror, "is:downtime"));
        assert_eq!(run(&mirror, "crit:1"), vec!["web01/http"]);
        assert_eq!(run(&mirror, "ack:maybe"), run(&mirror, ""));
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        let mirror = sample();
        assert!(run(&mirror, "host:web(").is_empty());
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let mirror = sample();
        assert_eq!(run(&mirror, "colour:blue"), run(&mirror, ""));
    }

    #[test]
    fn test_state_test_parse() {
        assert_eq!(StateTest::parse("ACK").unwrap(), StateTest::Ack);
        assert_eq!(
            StateTest::parse("hcritical").unwrap(),
            StateTest::State {
                state: StateRef::Name("CRITICAL".into()),
                state_type: Some(StateType::Hard),
            }
        );
        assert!(StateTest::parse("x").is_err());
    }
}
