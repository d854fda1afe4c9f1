//! Viewer identity and relation filtering.
//!
//! A viewer sees only the objects it is related to. An absent viewer or an
//! administrator sees everything, and the filters then return their input
//! unchanged.

use vantage_types::{Contact, ItemRef, Mirror};

/// Identity of whoever is looking at the dashboard.
pub trait Viewer {
    fn is_administrator(&self) -> bool;

    /// Whether `item` is visible to this viewer.
    fn is_related_to(&self, item: ItemRef<'_>) -> bool;
}

/// True when no filtering applies for `viewer`.
pub fn is_unrestricted(viewer: Option<&dyn Viewer>) -> bool {
    viewer.map_or(true, |v| v.is_administrator())
}

/// Scalar relation check: the item when visible to `viewer`, else `None`.
pub fn related<'a>(item: ItemRef<'a>, viewer: Option<&dyn Viewer>) -> Option<ItemRef<'a>> {
    match viewer {
        Some(v) if !v.is_administrator() => v.is_related_to(item).then_some(item),
        _ => Some(item),
    }
}

/// Sequence relation check: the items visible to `viewer`, in input order.
pub fn only_related<'a, I>(items: I, viewer: Option<&dyn Viewer>) -> Vec<ItemRef<'a>>
where
    I: IntoIterator<Item = ItemRef<'a>>,
{
    match viewer {
        Some(v) if !v.is_administrator() => {
            items.into_iter().filter(|item| v.is_related_to(*item)).collect()
        }
        _ => items.into_iter().collect(),
    }
}

/// A mirror contact acting as a viewer.
///
/// Hosts and services are related when the contact is one of their
/// contacts; a service is also related through its host. Groups are
/// related when any member is. Time periods, commands and realms are
/// visible to everyone.
#[derive(Debug, Clone, Copy)]
pub struct ContactViewer<'a> {
    contact: &'a Contact,
    mirror: &'a Mirror,
}

impl<'a> ContactViewer<'a> {
    pub fn new(contact: &'a Contact, mirror: &'a Mirror) -> Self {
        Self { contact, mirror }
    }

    /// Look a contact up by name in the mirror.
    pub fn find(name: &str, mirror: &'a Mirror) -> Option<Self> {
        mirror.contact(name).map(|contact| Self::new(contact, mirror))
    }

    pub fn contact(&self) -> &'a Contact {
        self.contact
    }

    fn listed(&self, contacts: &[String]) -> bool {
        contacts.iter().any(|c| *c == self.contact.name)
    }
}

impl Viewer for ContactViewer<'_> {
    fn is_administrator(&self) -> bool {
        self.contact.is_admin
    }

    fn is_related_to(&self, item: ItemRef<'_>) -> bool {
        match item {
            ItemRef::Host(host) => self.listed(&host.contacts),
            ItemRef::Service(service) => {
                self.listed(&service.contacts)
                    || self
                        .mirror
                        .host(&service.host_name)
                        .is_some_and(|host| self.listed(&host.contacts))
            }
            ItemRef::Contact(contact) => contact.name == self.contact.name,
            ItemRef::HostGroup(group) => group.members.iter().any(|m| {
                self.mirror.host(m).is_some_and(|host| self.listed(&host.contacts))
            }),
            ItemRef::ServiceGroup(group) => group
                .members
                .iter()
                .any(|m| self.mirror.item(m).is_some_and(|i| self.is_related_to(i))),
            ItemRef::ContactGroup(group) => group.has_member(&self.contact.name),
            ItemRef::TimePeriod(_) | ItemRef::Command(_) | ItemRef::Realm(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror() -> Mirror {
        Mirror::builder()
            .host("web01", |h| h.contact("alice"))
            .host("db01", |h| h.contact("bob"))
            .service("web01", "http", |s| s)
            .service("db01", "mysql", |s| s.contact("alice"))
            .contact("alice", |c| c)
            .contact("bob", |c| c)
            .contact("root", |c| c.admin())
            .hostgroup("databases", |g| g.member("db01"))
            .build()
    }

    fn all_items(mirror: &Mirror) -> Vec<ItemRef<'_>> {
        mirror
            .hosts()
            .iter()
            .map(ItemRef::Host)
            .chain(mirror.services().iter().map(ItemRef::Service))
            .collect()
    }

    #[test]
    fn test_no_viewer_sees_everything() {
        let mirror = mirror();
        let items = all_items(&mirror);

        assert_eq!(only_related(items.clone(), None), items);
        assert!(related(items[0], None).is_some());
    }

    #[test]
    fn test_administrator_sees_everything() {
        let mirror = mirror();
        let root = ContactViewer::find("root", &mirror).unwrap();
        let items = all_items(&mirror);

        assert_eq!(only_related(items.clone(), Some(&root)).len(), 4);
    }

    #[test]
    fn test_contact_sees_related_items() {
        let mirror = mirror();
        let alice = ContactViewer::find("alice", &mirror).unwrap();

        let visible: Vec<String> = only_related(all_items(&mirror), Some(&alice))
            .iter()
            .map(|i| i.full_name().into_owned())
            .collect();

        // http is related through its host, mysql directly
        assert_eq!(visible, vec!["web01", "web01/http", "db01/mysql"]);
    }

    #[test]
    fn test_scalar_related() {
        let mirror = mirror();
        let bob = ContactViewer::find("bob", &mirror).unwrap();
        let web01 = ItemRef::Host(mirror.host("web01").unwrap());
        let group = ItemRef::HostGroup(mirror.hostgroup("databases").unwrap());

        assert!(related(web01, Some(&bob)).is_none());
        assert!(related(group, Some(&bob)).is_some());
    }
}
