//! Mirror - a point-in-time copy of the monitoring framework state.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::{
    Command, Contact, ContactBuilder, Daemon, FormatVersion, Group, GroupBuilder, Host,
    HostBuilder, ItemRef, Realm, Service, ServiceBuilder, TimePeriod,
};

/// A snapshot of every object known to the monitoring framework.
///
/// Mirrors are rebuilt out-of-band by a regenerator and handed over whole;
/// consumers only read them. `generation` increases each time the
/// regenerator produces a new snapshot and is used to key derived caches.
///
/// # Example
///
/// ```rust
/// use vantage_types::{HostState, Mirror};
///
/// let mirror = Mirror::builder()
///     .generation(7)
///     .host("db01", |h| h.state(HostState::Up).tag("database"))
///     .contact("admin", |c| c.admin())
///     .build();
///
/// assert_eq!(mirror.generation(), 7);
/// assert!(mirror.host("db01").is_some());
/// assert_eq!(mirror.host_tags().get("database"), Some(&1));
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Mirror {
    version: FormatVersion,
    generation: u64,
    /// Unix timestamp in milliseconds when the regenerator built this mirror.
    timestamp_ms: u64,
    hosts: Vec<Host>,
    services: Vec<Service>,
    host_templates: Vec<Host>,
    service_templates: Vec<Service>,
    contacts: Vec<Contact>,
    hostgroups: Vec<Group>,
    servicegroups: Vec<Group>,
    contactgroups: Vec<Group>,
    timeperiods: Vec<TimePeriod>,
    commands: Vec<Command>,
    realms: Vec<Realm>,
    daemons: Vec<Daemon>,
    #[cfg_attr(feature = "serde", serde(skip))]
    index: OnceLock<MirrorIndex>,
}

/// Name lookups, built on first use.
#[derive(Debug, Clone, Default)]
struct MirrorIndex {
    hosts: HashMap<String, usize>,
    services: HashMap<String, usize>,
    services_by_host: HashMap<String, Vec<usize>>,
    contacts: HashMap<String, usize>,
}

impl Mirror {
    /// Create a builder for constructing mirrors.
    pub fn builder() -> MirrorBuilder {
        MirrorBuilder::new()
    }

    /// Record group membership on both sides.
    ///
    /// Dumps may list a member only on the group or only on the member;
    /// after linking, `Group::members` and the member's own group list agree.
    /// Linking twice changes nothing.
    pub fn link_groups(&mut self) {
        for group in &mut self.hostgroups {
            for host in &mut self.hosts {
                link(group, &host.name, &mut host.hostgroups);
            }
        }
        for group in &mut self.servicegroups {
            for service in &mut self.services {
                let full_name = service.full_name();
                link(group, &full_name, &mut service.servicegroups);
            }
        }
        for group in &mut self.contactgroups {
            for contact in &mut self.contacts {
                link(group, &contact.name, &mut contact.contactgroups);
            }
        }
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Return the same mirror tagged with another generation.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn host_templates(&self) -> &[Host] {
        &self.host_templates
    }

    pub fn service_templates(&self) -> &[Service] {
        &self.service_templates
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn hostgroups(&self) -> &[Group] {
        &self.hostgroups
    }

    pub fn servicegroups(&self) -> &[Group] {
        &self.servicegroups
    }

    pub fn contactgroups(&self) -> &[Group] {
        &self.contactgroups
    }

    pub fn timeperiods(&self) -> &[TimePeriod] {
        &self.timeperiods
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn realms(&self) -> &[Realm] {
        &self.realms
    }

    pub fn daemons(&self) -> &[Daemon] {
        &self.daemons
    }

    fn index(&self) -> &MirrorIndex {
        self.index.get_or_init(|| {
            let mut index = MirrorIndex::default();
            for (i, host) in self.hosts.iter().enumerate() {
                index.hosts.insert(host.name.clone(), i);
            }
            for (i, service) in self.services.iter().enumerate() {
                index.services.insert(service.full_name(), i);
                index.services_by_host.entry(service.host_name.clone()).or_default().push(i);
            }
            for (i, contact) in self.contacts.iter().enumerate() {
                index.contacts.insert(contact.name.clone(), i);
            }
            index
        })
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.index().hosts.get(name).map(|&i| &self.hosts[i])
    }

    pub fn service(&self, host_name: &str, description: &str) -> Option<&Service> {
        self.index()
            .services
            .get(&format!("{}/{}", host_name, description))
            .map(|&i| &self.services[i])
    }

    /// Services attached to a host, in mirror order.
    pub fn services_of<'a>(&'a self, host_name: &str) -> impl Iterator<Item = &'a Service> + 'a {
        let indices = self.index().services_by_host.get(host_name).map(Vec::as_slice).unwrap_or(&[]);
        indices.iter().map(move |&i| &self.services[i])
    }

    pub fn contact(&self, name: &str) -> Option<&Contact> {
        self.index().contacts.get(name).map(|&i| &self.contacts[i])
    }

    pub fn hostgroup(&self, name: &str) -> Option<&Group> {
        self.hostgroups.iter().find(|g| g.name == name)
    }

    pub fn servicegroup(&self, name: &str) -> Option<&Group> {
        self.servicegroups.iter().find(|g| g.name == name)
    }

    pub fn contactgroup(&self, name: &str) -> Option<&Group> {
        self.contactgroups.iter().find(|g| g.name == name)
    }

    pub fn timeperiod(&self, name: &str) -> Option<&TimePeriod> {
        self.timeperiods.iter().find(|t| t.name == name)
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn realm(&self, name: &str) -> Option<&Realm> {
        self.realms.iter().find(|r| r.name == name)
    }

    /// Resolve a full name: `host` or `host/service description`.
    pub fn item(&self, full_name: &str) -> Option<ItemRef<'_>> {
        match full_name.split_once('/') {
            Some((host, description)) => self.service(host, description).map(ItemRef::Service),
            None => self.host(full_name).map(ItemRef::Host),
        }
    }

    /// Count of hosts per tag, sorted by tag name.
    pub fn host_tags(&self) -> BTreeMap<&str, usize> {
        let mut tags = BTreeMap::new();
        for tag in self.hosts.iter().flat_map(|h| h.tags.iter()) {
            *tags.entry(tag.as_str()).or_insert(0) += 1;
        }
        tags
    }

    /// Count of services per tag, sorted by tag name.
    pub fn service_tags(&self) -> BTreeMap<&str, usize> {
        let mut tags = BTreeMap::new();
        for tag in self.services.iter().flat_map(|s| s.tags.iter()) {
            *tags.entry(tag.as_str()).or_insert(0) += 1;
        }
        tags
    }
}

/// Builder for constructing [`Mirror`] instances.
///
/// Group membership declared on either side (a group's `members` or an
/// object's group list) is mirrored onto the other side by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct MirrorBuilder {
    generation: u64,
    timestamp_ms: Option<u64>,
    hosts: Vec<Host>,
    services: Vec<Service>,
    host_templates: Vec<Host>,
    service_templates: Vec<Service>,
    contacts: Vec<Contact>,
    hostgroups: Vec<Group>,
    servicegroups: Vec<Group>,
    contactgroups: Vec<Group>,
    timeperiods: Vec<TimePeriod>,
    commands: Vec<Command>,
    realms: Vec<Realm>,
    daemons: Vec<Daemon>,
}

impl MirrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Add a host built using a closure.
    pub fn host<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(HostBuilder) -> HostBuilder,
    {
        self.hosts.push(f(HostBuilder::new(name)).build());
        self
    }

    pub fn host_template<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(HostBuilder) -> HostBuilder,
    {
        self.host_templates.push(f(HostBuilder::new(name)).build());
        self
    }

    /// Add a service built using a closure.
    pub fn service<F>(
        mut self,
        host_name: impl Into<String>,
        description: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: FnOnce(ServiceBuilder) -> ServiceBuilder,
    {
        self.services.push(f(ServiceBuilder::new(host_name, description)).build());
        self
    }

    pub fn service_template<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(ServiceBuilder) -> ServiceBuilder,
    {
        self.service_templates.push(f(ServiceBuilder::new("", name)).build());
        self
    }

    pub fn contact<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(ContactBuilder) -> ContactBuilder,
    {
        self.contacts.push(f(ContactBuilder::new(name)).build());
        self
    }

    pub fn hostgroup<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        self.hostgroups.push(f(GroupBuilder::new(name)).build());
        self
    }

    pub fn servicegroup<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        self.servicegroups.push(f(GroupBuilder::new(name)).build());
        self
    }

    pub fn contactgroup<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(GroupBuilder) -> GroupBuilder,
    {
        self.contactgroups.push(f(GroupBuilder::new(name)).build());
        self
    }

    pub fn timeperiod(mut self, timeperiod: TimePeriod) -> Self {
        self.timeperiods.push(timeperiod);
        self
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn realm(mut self, realm: Realm) -> Self {
        self.realms.push(realm);
        self
    }

    pub fn daemon(mut self, daemon: Daemon) -> Self {
        self.daemons.push(daemon);
        self
    }

    /// Build the mirror, linking group membership both ways.
    pub fn build(self) -> Mirror {
        let mut mirror = Mirror {
            version: FormatVersion::current(),
            generation: self.generation,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            hosts: self.hosts,
            services: self.services,
            host_templates: self.host_templates,
            service_templates: self.service_templates,
            contacts: self.contacts,
            hostgroups: self.hostgroups,
            servicegroups: self.servicegroups,
            contactgroups: self.contactgroups,
            timeperiods: self.timeperiods,
            commands: self.commands,
            realms: self.realms,
            daemons: self.daemons,
            index: OnceLock::new(),
        };
        mirror.link_groups();
        mirror
    }
}

fn link(group: &mut Group, member: &str, member_groups: &mut Vec<String>) {
    let listed_by_group = group.has_member(member);
    let listed_by_member = member_groups.iter().any(|g| *g == group.name);
    if listed_by_group && !listed_by_member {
        member_groups.push(group.name.clone());
    } else if listed_by_member && !listed_by_group {
        group.members.push(member.to_string());
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
