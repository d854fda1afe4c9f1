//! Variant tags, the `Monitored` capability, and borrowed item references.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    CheckStatus, Command, Contact, Group, Host, Realm, Service, StateType, TimePeriod,
};

/// Closed set of object variants held by the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ItemKind {
    Host,
    Service,
    Contact,
    HostGroup,
    ServiceGroup,
    ContactGroup,
    TimePeriod,
    Command,
    Realm,
}

impl ItemKind {
    /// Variant tag as written in `type:` search predicates.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Host => "host",
            ItemKind::Service => "service",
            ItemKind::Contact => "contact",
            ItemKind::HostGroup => "hostgroup",
            ItemKind::ServiceGroup => "servicegroup",
            ItemKind::ContactGroup => "contactgroup",
            ItemKind::TimePeriod => "timeperiod",
            ItemKind::Command => "command",
            ItemKind::Realm => "realm",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities shared by checked items (hosts and services).
pub trait Monitored {
    fn kind(&self) -> ItemKind;

    /// Own name: host name or service description.
    fn name(&self) -> &str;

    /// Display name: host name, or `host/description` for services.
    fn full_name(&self) -> Cow<'_, str>;

    /// Alias used as an alternative display name, if any.
    fn alias(&self) -> Option<&str> {
        None
    }

    /// Upper-case state name (`UP`, `CRITICAL`, ...).
    fn state_name(&self) -> &'static str;

    fn state_id(&self) -> u8;

    fn status(&self) -> &CheckStatus;

    fn tags(&self) -> &BTreeSet<String>;

    fn contacts(&self) -> &[String];

    fn customs(&self) -> &BTreeMap<String, String>;

    fn impacts(&self) -> &[String];

    fn source_problems(&self) -> &[String];

    fn parent_dependencies(&self) -> &[String];

    fn business_impact(&self) -> i32 {
        self.status().business_impact
    }

    fn is_hard(&self) -> bool {
        self.status().state_type == StateType::Hard
    }

    fn is_acknowledged(&self) -> bool {
        self.status().acknowledged
    }

    fn in_downtime(&self) -> bool {
        self.status().in_downtime
    }

    fn is_flapping(&self) -> bool {
        self.status().flapping
    }
}

impl Monitored for Host {
    fn kind(&self) -> ItemKind {
        ItemKind::Host
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn full_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref().filter(|a| !a.is_empty())
    }

    fn state_name(&self) -> &'static str {
        self.state.as_str()
    }

    fn state_id(&self) -> u8 {
        self.state.id()
    }

    fn status(&self) -> &CheckStatus {
        &self.status
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    fn contacts(&self) -> &[String] {
        &self.contacts
    }

    fn customs(&self) -> &BTreeMap<String, String> {
        &self.customs
    }

    fn impacts(&self) -> &[String] {
        &self.impacts
    }

    fn source_problems(&self) -> &[String] {
        &self.source_problems
    }

    fn parent_dependencies(&self) -> &[String] {
        &self.parent_dependencies
    }
}

impl Monitored for Service {
    fn kind(&self) -> ItemKind {
        ItemKind::Service
    }

    fn name(&self) -> &str {
        &self.description
    }

    fn full_name(&self) -> Cow<'_, str> {
        Cow::Owned(Service::full_name(self))
    }

    fn state_name(&self) -> &'static str {
        self.state.as_str()
    }

    fn state_id(&self) -> u8 {
        self.state.id()
    }

    fn status(&self) -> &CheckStatus {
        &self.status
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    fn contacts(&self) -> &[String] {
        &self.contacts
    }

    fn customs(&self) -> &BTreeMap<String, String> {
        &self.customs
    }

    fn impacts(&self) -> &[String] {
        &self.impacts
    }

    fn source_problems(&self) -> &[String] {
        &self.source_problems
    }

    fn parent_dependencies(&self) -> &[String] {
        &self.parent_dependencies
    }
}

/// A borrowed reference to any object held by a [`Mirror`](crate::Mirror).
///
/// Equality and hashing use the identity of the referenced object, not its
/// contents, so two references are equal only when they point at the same
/// object of the same snapshot.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Host(&'a Host),
    Service(&'a Service),
    Contact(&'a Contact),
    HostGroup(&'a Group),
    ServiceGroup(&'a Group),
    ContactGroup(&'a Group),
    TimePeriod(&'a TimePeriod),
    Command(&'a Command),
    Realm(&'a Realm),
}

impl<'a> ItemRef<'a> {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemRef::Host(_) => ItemKind::Host,
            ItemRef::Service(_) => ItemKind::Service,
            ItemRef::Contact(_) => ItemKind::Contact,
            ItemRef::HostGroup(_) => ItemKind::HostGroup,
            ItemRef::ServiceGroup(_) => ItemKind::ServiceGroup,
            ItemRef::ContactGroup(_) => ItemKind::ContactGroup,
            ItemRef::TimePeriod(_) => ItemKind::TimePeriod,
            ItemRef::Command(_) => ItemKind::Command,
            ItemRef::Realm(_) => ItemKind::Realm,
        }
    }

    /// Own name of the object (service description for services).
    pub fn name(&self) -> &'a str {
        match *self {
            ItemRef::Host(h) => &h.name,
            ItemRef::Service(s) => &s.description,
            ItemRef::Contact(c) => &c.name,
            ItemRef::HostGroup(g) | ItemRef::ServiceGroup(g) | ItemRef::ContactGroup(g) => {
                &g.name
            }
            ItemRef::TimePeriod(t) => &t.name,
            ItemRef::Command(c) => &c.name,
            ItemRef::Realm(r) => &r.name,
        }
    }

    /// Display name; `host/description` for services.
    pub fn full_name(&self) -> Cow<'a, str> {
        match *self {
            ItemRef::Service(s) => Cow::Owned(s.full_name()),
            _ => Cow::Borrowed(self.name()),
        }
    }

    /// Host and service references expose the [`Monitored`] capability.
    pub fn as_monitored(&self) -> Option<&'a dyn Monitored> {
        match *self {
            ItemRef::Host(h) => Some(h as &dyn Monitored),
            ItemRef::Service(s) => Some(s as &dyn Monitored),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&'a Host> {
        match *self {
            ItemRef::Host(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&'a Service> {
        match *self {
            ItemRef::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_contact(&self) -> Option<&'a Contact> {
        match *self {
            ItemRef::Contact(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&'a Group> {
        match *self {
            ItemRef::HostGroup(g) | ItemRef::ServiceGroup(g) | ItemRef::ContactGroup(g) => Some(g),
            _ => None,
        }
    }

    fn addr(&self) -> usize {
        match *self {
            ItemRef::Host(h) => h as *const Host as usize,
            ItemRef::Service(s) => s as *const Service as usize,
            ItemRef::Contact(c) => c as *const Contact as usize,
            ItemRef::HostGroup(g) | ItemRef::ServiceGroup(g) | ItemRef::ContactGroup(g) => {
                g as *const Group as usize
            }
            ItemRef::TimePeriod(t) => t as *const TimePeriod as usize,
            ItemRef::Command(c) => c as *const Command as usize,
            ItemRef::Realm(r) => r as *const Realm as usize,
        }
    }
}

impl PartialEq for ItemRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.addr() == other.addr()
    }
}

impl Eq for ItemRef<'_> {}

impl Hash for ItemRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.addr().hash(state);
    }
}

impl<'a> From<&'a Host> for ItemRef<'a> {
    fn from(host: &'a Host) -> Self {
        ItemRef::Host(host)
    }
}

impl<'a> From<&'a Service> for ItemRef<'a> {
    fn from(service: &'a Service) -> Self {
        ItemRef::Service(service)
    }
}

impl<'a> From<&'a Contact> for ItemRef<'a> {
    fn from(contact: &'a Contact) -> Self {
        ItemRef::Contact(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HostState, ServiceState};

    #[test]
    fn test_item_ref_identity() {
        let a = Host::new("web01");
        let b = Host::new("web01");

        assert_eq!(ItemRef::Host(&a), ItemRef::Host(&a));
        assert_ne!(ItemRef::Host(&a), ItemRef::Host(&b));
    }

    #[test]
    fn test_monitored_accessors() {
        let mut host = Host::new("web01");
        host.state = HostState::Unreachable;
        host.alias = Some(String::new());

        let mut service = Service::new("web01", "http");
        service.state = ServiceState::Critical;

        assert_eq!(host.state_name(), "UNREACHABLE");
        assert_eq!(host.state_id(), 2);
        assert_eq!(Monitored::alias(&host), None);
        assert_eq!(Monitored::full_name(&service), "web01/http");
        assert_eq!(Monitored::name(&service), "http");
        assert_eq!(service.state_id(), 2);

        let item = ItemRef::Service(&service);
        assert_eq!(item.kind().as_str(), "service");
        assert_eq!(item.full_name(), "web01/http");
        assert!(item.as_monitored().is_some());
    }
}
