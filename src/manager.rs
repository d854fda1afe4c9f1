//! The data manager: the query surface used by dashboard handlers.
//!
//! [`DataManager`] owns the current mirror, the settings and the derived
//! caches (problem/impact annotations and group levels). Every lookup goes
//! through the relation filter for the given viewer; most are thin wrappers
//! over [`DataManager::search`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};
use vantage_types::{Command, Contact, Group, Host, ItemRef, Mirror, Realm, Service, TimePeriod};

use crate::config::Settings;
use crate::groups::{assign_levels, GroupKind, GroupLevels};
use crate::relation::{is_unrestricted, only_related, related, Viewer};
use crate::search::{parse, Predicate, SearchScope, Sort};
use crate::source::MirrorSource;
use crate::synthesis::{percent, AnnotationTable, Synthesis, Synthesizer};

/// Source of the current time in seconds since the Unix epoch.
pub type Clock = fn() -> i64;

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Options for [`DataManager::search_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Result ordering; mirror order when `None`.
    pub sort: Option<Sort>,
    /// Resolve `host:` predicates against templates.
    pub want_templates: bool,
}

impl SearchOptions {
    pub fn sorted(sort: Sort) -> Self {
        Self {
            sort: Some(sort),
            want_templates: false,
        }
    }
}

/// Host and service syntheses side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub hosts: Synthesis,
    pub services: Synthesis,
}

/// A node of the business dependency tree returned by
/// [`DataManager::business_parents`].
#[derive(Debug, Clone, Serialize)]
pub struct BusinessNode<'a> {
    #[serde(skip)]
    pub item: ItemRef<'a>,
    pub name: String,
    pub state: &'static str,
    pub state_id: u8,
    pub fathers: Vec<BusinessNode<'a>>,
}

#[derive(Debug)]
pub struct DataManager {
    mirror: Arc<Mirror>,
    settings: Settings,
    annotations: AnnotationTable,
    levels: RwLock<HashMap<GroupKind, GroupLevels>>,
    clock: Clock,
}

impl DataManager {
    pub fn new(mirror: Mirror, settings: Settings) -> Self {
        Self {
            mirror: Arc::new(mirror),
            settings,
            annotations: AnnotationTable::new(),
            levels: RwLock::new(HashMap::new()),
            clock: unix_now,
        }
    }

    /// Replace the clock used by age predicates.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// The current mirror, shareable with other threads.
    pub fn shared_mirror(&self) -> Arc<Mirror> {
        Arc::clone(&self.mirror)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn annotations(&self) -> &AnnotationTable {
        &self.annotations
    }

    /// Swap in a new mirror and drop every derived cache.
    ///
    /// The new mirror's generation is bumped if needed so that it is always
    /// greater than the previous one.
    pub fn replace(&mut self, mirror: Mirror) {
        let generation = mirror.generation().max(self.mirror.generation() + 1);
        let mirror = mirror.with_generation(generation);
        info!(
            generation,
            hosts = mirror.hosts().len(),
            services = mirror.services().len(),
            "mirror replaced"
        );

        self.mirror = Arc::new(mirror);
        self.annotations.clear();
        self.levels.write().clear();
    }

    /// Poll `source` once; returns true when a new mirror was installed.
    pub fn refresh(&mut self, source: &mut dyn MirrorSource) -> bool {
        match source.poll() {
            Some(mirror) => {
                self.replace(mirror);
                true
            }
            None => {
                if let Some(error) = source.error() {
                    warn!(source = source.description(), error, "mirror refresh failed");
                }
                false
            }
        }
    }

    /// True once the regenerator has delivered contacts.
    pub fn is_initialized(&self) -> bool {
        !self.mirror.contacts().is_empty()
    }

    // ------------------------------------------------------------------
    // Searching
    // ------------------------------------------------------------------

    /// Hosts and services matching `query`, in mirror order.
    pub fn search(&self, query: &str, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        self.search_with(query, viewer, SearchOptions::default())
    }

    pub fn search_with(
        &self,
        query: &str,
        viewer: Option<&dyn Viewer>,
        options: SearchOptions,
    ) -> Vec<ItemRef<'_>> {
        debug!(query, "search");
        self.search_predicates(parse(query), viewer, options)
    }

    /// Search with already-built predicates, bypassing the parser.
    pub fn search_predicates(
        &self,
        predicates: Vec<Predicate>,
        viewer: Option<&dyn Viewer>,
        options: SearchOptions,
    ) -> Vec<ItemRef<'_>> {
        let mirror = &*self.mirror;
        let items = only_related(
            mirror
                .hosts()
                .iter()
                .map(ItemRef::Host)
                .chain(mirror.services().iter().map(ItemRef::Service)),
            viewer,
        );
        let templates = only_related(
            mirror
                .host_templates()
                .iter()
                .map(ItemRef::Host)
                .chain(mirror.service_templates().iter().map(ItemRef::Service)),
            viewer,
        );
        debug!(
            items = items.len(),
            templates = templates.len(),
            predicates = predicates.len(),
            "searching hosts and services"
        );

        let scope = SearchScope {
            mirror,
            viewer,
            annotations: &self.annotations,
            mode: self.settings.synthesis_mode(),
            now: (self.clock)(),
            want_templates: options.want_templates,
        };
        let mut found = scope.evaluate(items, &templates, predicates);
        if let Some(sort) = options.sort {
            sort.apply(&mut found);
        }

        debug!(found = found.len(), "search complete");
        found
    }

    // ------------------------------------------------------------------
    // Hosts and services
    // ------------------------------------------------------------------

    pub fn hosts(&self, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        self.search_predicates(vec![Predicate::new("type", "host")], viewer, SearchOptions::default())
    }

    /// Hosts with at least the configured important business impact.
    pub fn important_hosts(&self, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        self.search_predicates(
            vec![Predicate::new("type", "host"), self.important_predicate()],
            viewer,
            SearchOptions::default(),
        )
    }

    /// A host (or host template) by exact name.
    pub fn host(&self, name: &str, viewer: Option<&dyn Viewer>, template: bool) -> Option<&Host> {
        let predicates = vec![Predicate::new("type", "host"), exact("host", name)];
        let options = SearchOptions {
            want_templates: template,
            ..SearchOptions::default()
        };
        self.search_predicates(predicates, viewer, options)
            .into_iter()
            .find_map(|item| item.as_host())
    }

    pub fn host_services(&self, host_name: &str, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        self.search_predicates(
            vec![Predicate::new("type", "service"), exact("host", host_name)],
            viewer,
            SearchOptions::default(),
        )
    }

    pub fn services(&self, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        self.search_predicates(
            vec![Predicate::new("type", "service")],
            viewer,
            SearchOptions::default(),
        )
    }

    pub fn important_services(&self, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        self.search_predicates(
            vec![Predicate::new("type", "service"), self.important_predicate()],
            viewer,
            SearchOptions::default(),
        )
    }

    /// Unhandled problems with at least the configured business impact,
    /// worst first.
    pub fn problems(&self, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        let predicates = vec![
            Predicate::new("isnot", "ack"),
            Predicate::new("isnot", "downtime"),
            Predicate::new("bi", format!(">={}", self.settings.problems_business_impact)),
        ];
        let mode = self.settings.synthesis_mode();
        self.search_predicates(predicates, viewer, SearchOptions::sorted(Sort::WorstFirst))
            .into_iter()
            .filter(|item| self.annotations.resolve(mode, &self.mirror, *item).is_problem)
            .collect()
    }

    /// A service (or service template) by exact host name and description.
    pub fn service(
        &self,
        host_name: &str,
        description: &str,
        viewer: Option<&dyn Viewer>,
        template: bool,
    ) -> Option<&Service> {
        let predicates = vec![
            Predicate::new("type", "service"),
            exact("host", host_name),
            exact("service", description),
        ];
        let options = SearchOptions {
            want_templates: template,
            ..SearchOptions::default()
        };
        self.search_predicates(predicates, viewer, options)
            .into_iter()
            .find_map(|item| item.as_service())
    }

    /// Resolve `host`, `host/service`, or failing that a contact name.
    pub fn element(&self, name: &str, viewer: Option<&dyn Viewer>) -> Option<ItemRef<'_>> {
        if let Some((host_name, description)) = name.split_once('/') {
            return self
                .service(host_name, description, viewer, false)
                .map(ItemRef::Service);
        }
        self.host(name, viewer, false)
            .map(ItemRef::Host)
            .or_else(|| self.contact(name, viewer).map(ItemRef::Contact))
    }

    fn important_predicate(&self) -> Predicate {
        Predicate::new(
            "bi",
            format!(">={}", self.settings.important_problems_business_impact),
        )
    }

    // ------------------------------------------------------------------
    // Synthesis
    // ------------------------------------------------------------------

    fn synthesizer(&self) -> Synthesizer<'_> {
        Synthesizer::new(&self.mirror, self.settings.synthesis_mode(), &self.annotations)
    }

    /// Synthesis of the hosts in `items`, or of every visible host.
    pub fn hosts_synthesis(
        &self,
        items: Option<&[ItemRef<'_>]>,
        viewer: Option<&dyn Viewer>,
    ) -> Synthesis {
        match items {
            Some(items) => self.synthesizer().hosts(items),
            None => self.synthesizer().hosts(&self.hosts(viewer)),
        }
    }

    /// Synthesis of the services in `items`, or of every visible service.
    pub fn services_synthesis(
        &self,
        items: Option<&[ItemRef<'_>]>,
        viewer: Option<&dyn Viewer>,
    ) -> Synthesis {
        match items {
            Some(items) => self.synthesizer().services(items),
            None => self.synthesizer().services(&self.services(viewer)),
        }
    }

    pub fn important_hosts_synthesis(&self, viewer: Option<&dyn Viewer>) -> Synthesis {
        self.synthesizer().hosts(&self.important_hosts(viewer))
    }

    pub fn important_services_synthesis(&self, viewer: Option<&dyn Viewer>) -> Synthesis {
        self.synthesizer().services(&self.important_services(viewer))
    }

    pub fn synthesis(&self, items: Option<&[ItemRef<'_>]>, viewer: Option<&dyn Viewer>) -> Summary {
        Summary {
            hosts: self.hosts_synthesis(items, viewer),
            services: self.services_synthesis(items, viewer),
        }
    }

    /// Percentage of hosts in problem (`problem`) or not.
    pub fn percentage_hosts_state(&self, viewer: Option<&dyn Viewer>, problem: bool) -> f64 {
        problem_share(&self.hosts_synthesis(None, viewer), problem)
    }

    pub fn percentage_services_state(&self, viewer: Option<&dyn Viewer>, problem: bool) -> f64 {
        problem_share(&self.services_synthesis(None, viewer), problem)
    }

    /// State id of the worst unhandled impact, 0 when there is none.
    pub fn overall_state(&self, viewer: Option<&dyn Viewer>) -> u8 {
        worst_state(&self.search_with(
            "isnot:ack isnot:downtime is:impact",
            viewer,
            SearchOptions::sorted(Sort::WorstFirst),
        ))
    }

    /// Worst state of unhandled hosts and services that are not impacts.
    pub fn overall_it_state(&self, viewer: Option<&dyn Viewer>) -> (u8, u8) {
        let options = SearchOptions::sorted(Sort::WorstFirst);
        let hosts = self.search_with(
            "type:host isnot:ack isnot:downtime isnot:impact",
            viewer,
            options,
        );
        let services = self.search_with(
            "type:service isnot:ack isnot:downtime isnot:impact",
            viewer,
            options,
        );
        (worst_state(&hosts), worst_state(&services))
    }

    /// Other services of the same host in a non-OK state.
    pub fn guess_root_problems<'a>(
        &'a self,
        item: ItemRef<'a>,
        viewer: Option<&dyn Viewer>,
    ) -> Vec<ItemRef<'a>> {
        let Some(service) = item.as_service() else {
            return Vec::new();
        };
        only_related(
            self.mirror.services_of(&service.host_name).map(ItemRef::Service),
            viewer,
        )
        .into_iter()
        .filter(|sibling| *sibling != item)
        .filter(|sibling| sibling.as_monitored().is_some_and(|m| m.state_id() != 0))
        .collect()
    }

    /// Tree of business parents (`parent_dependencies`).
    ///
    /// Every parent is followed `levels` deep; beyond that only parents in
    /// a non-OK state are followed.
    pub fn business_parents<'a>(
        &'a self,
        item: ItemRef<'a>,
        levels: u32,
        viewer: Option<&dyn Viewer>,
    ) -> BusinessNode<'a> {
        let mut path = Vec::new();
        self.business_node(item, levels, viewer, &mut path)
    }

    fn business_node<'a>(
        &'a self,
        item: ItemRef<'a>,
        levels: u32,
        viewer: Option<&dyn Viewer>,
        path: &mut Vec<ItemRef<'a>>,
    ) -> BusinessNode<'a> {
        path.push(item);
        let mut fathers = Vec::new();

        let parents = item.as_monitored().map_or(&[][..], |m| m.parent_dependencies());
        for name in parents {
            let Some(parent) = self.mirror.item(name).and_then(|p| related(p, viewer)) else {
                continue;
            };
            if path.contains(&parent) {
                warn!(item = %item.full_name(), parent = %name, "cyclic business dependency");
                continue;
            }
            let bad = parent.as_monitored().is_some_and(|p| p.state_id() != 0);
            if levels > 0 || bad {
                fathers.push(self.business_node(parent, levels.saturating_sub(1), viewer, path));
            }
        }

        path.pop();
        let monitored = item.as_monitored();
        BusinessNode {
            item,
            name: item.full_name().into_owned(),
            state: monitored.map_or("", |m| m.state_name()),
            state_id: monitored.map_or(0, |m| m.state_id()),
            fathers,
        }
    }

    /// 2 if a daemon is dead, 1 if one retried its connection, else 0;
    /// `None` when no daemon is known.
    pub fn framework_status(&self) -> Option<u8> {
        self.mirror
            .daemons()
            .iter()
            .map(|d| match (d.alive, d.attempt) {
                (false, _) => 2,
                (true, 0) => 0,
                (true, _) => 1,
            })
            .max()
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn contacts(&self, viewer: Option<&dyn Viewer>) -> Vec<&Contact> {
        visible(self.mirror.contacts(), viewer, ItemRef::Contact)
    }

    pub fn contact(&self, name: &str, viewer: Option<&dyn Viewer>) -> Option<&Contact> {
        let contact = self.mirror.contact(name)?;
        related(ItemRef::Contact(contact), viewer).map(|_| contact)
    }

    pub fn timeperiods(&self, viewer: Option<&dyn Viewer>) -> Vec<&TimePeriod> {
        visible(self.mirror.timeperiods(), viewer, ItemRef::TimePeriod)
    }

    pub fn timeperiod(&self, name: &str) -> Option<&TimePeriod> {
        self.mirror.timeperiod(name)
    }

    pub fn commands(&self, viewer: Option<&dyn Viewer>) -> Vec<&Command> {
        visible(self.mirror.commands(), viewer, ItemRef::Command)
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        self.mirror.command(name)
    }

    pub fn realms(&self, viewer: Option<&dyn Viewer>) -> Vec<&Realm> {
        visible(self.mirror.realms(), viewer, ItemRef::Realm)
    }

    pub fn realm(&self, name: &str, viewer: Option<&dyn Viewer>) -> Option<&Realm> {
        let realm = self.mirror.realm(name)?;
        related(ItemRef::Realm(realm), viewer).map(|_| realm)
    }

    /// Visible groups of `kind`; with `parent`, only that group's children.
    pub fn groups(
        &self,
        kind: GroupKind,
        viewer: Option<&dyn Viewer>,
        parent: Option<&str>,
    ) -> Vec<&Group> {
        let Some(parent) = parent else {
            return kind.visible(&self.mirror, viewer);
        };
        let Some(parent) = self.group(kind, parent, viewer) else {
            return Vec::new();
        };
        let children = parent
            .children
            .iter()
            .filter_map(|name| kind.find(&self.mirror, name))
            .map(|g| kind.item(g));
        only_related(children, viewer)
            .into_iter()
            .filter_map(|item| item.as_group())
            .collect()
    }

    pub fn group(&self, kind: GroupKind, name: &str, viewer: Option<&dyn Viewer>) -> Option<&Group> {
        let group = kind.find(&self.mirror, name)?;
        related(kind.item(group), viewer).map(|_| group)
    }

    pub fn hostgroups(&self, viewer: Option<&dyn Viewer>, parent: Option<&str>) -> Vec<&Group> {
        self.groups(GroupKind::Host, viewer, parent)
    }

    pub fn hostgroup(&self, name: &str, viewer: Option<&dyn Viewer>) -> Option<&Group> {
        self.group(GroupKind::Host, name, viewer)
    }

    pub fn servicegroups(&self, viewer: Option<&dyn Viewer>, parent: Option<&str>) -> Vec<&Group> {
        self.groups(GroupKind::Service, viewer, parent)
    }

    pub fn servicegroup(&self, name: &str, viewer: Option<&dyn Viewer>) -> Option<&Group> {
        self.group(GroupKind::Service, name, viewer)
    }

    pub fn contactgroups(&self, viewer: Option<&dyn Viewer>, parent: Option<&str>) -> Vec<&Group> {
        self.groups(GroupKind::Contact, viewer, parent)
    }

    pub fn contactgroup(&self, name: &str, viewer: Option<&dyn Viewer>) -> Option<&Group> {
        self.group(GroupKind::Contact, name, viewer)
    }

    /// Group levels for `kind`.
    ///
    /// Levels computed for an unrestricted viewer are memoized until the
    /// next mirror replacement.
    pub fn group_levels(&self, kind: GroupKind, viewer: Option<&dyn Viewer>) -> GroupLevels {
        if !is_unrestricted(viewer) {
            return assign_levels(&self.mirror, kind, viewer);
        }
        if let Some(levels) = self.levels.read().get(&kind) {
            return levels.clone();
        }

        let levels = assign_levels(&self.mirror, kind, None);
        self.levels.write().insert(kind, levels.clone());
        levels
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Host tags with usage counts, sorted by tag.
    pub fn host_tags(&self) -> Vec<(&str, usize)> {
        self.mirror.host_tags().into_iter().collect()
    }

    pub fn service_tags(&self) -> Vec<(&str, usize)> {
        self.mirror.service_tags().into_iter().collect()
    }

    pub fn hosts_tagged_with(&self, tag: &str, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        self.search_predicates(
            vec![Predicate::new("type", "host"), Predicate::new("htag", tag)],
            viewer,
            SearchOptions::default(),
        )
    }

    pub fn services_tagged_with(&self, tag: &str, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'_>> {
        self.search_predicates(
            vec![Predicate::new("type", "service"), Predicate::new("stag", tag)],
            viewer,
            SearchOptions::default(),
        )
    }
}

/// Anchored literal match on `key`.
fn exact(key: &str, name: &str) -> Predicate {
    Predicate::new(key, format!("^{}$", regex::escape(name)))
}

fn visible<'a, T>(
    items: &'a [T],
    viewer: Option<&dyn Viewer>,
    item: impl Fn(&'a T) -> ItemRef<'a>,
) -> Vec<&'a T> {
    items
        .iter()
        .filter(|t| related(item(*t), viewer).is_some())
        .collect()
}

fn worst_state(items: &[ItemRef<'_>]) -> u8 {
    items
        .first()
        .and_then(|item| item.as_monitored())
        .map_or(0, |m| m.state_id())
}

fn problem_share(synthesis: &Synthesis, problem: bool) -> f64 {
    let count = if problem {
        synthesis.nb_problems
    } else {
        synthesis.nb_elts - synthesis.nb_problems
    };
    percent(count, synthesis.nb_elts)
}
