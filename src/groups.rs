//! Group kinds and hierarchy levels.
//!
//! Groups nest through their `children` lists. The level of a group is its
//! depth below a root; a group reachable from several roots takes the level
//! of the last traversal that reached it.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use vantage_types::{Group, ItemRef, Mirror};

use crate::relation::{only_related, related, Viewer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum GroupKind {
    Host,
    Service,
    Contact,
}

impl GroupKind {
    pub fn all(self, mirror: &Mirror) -> &[Group] {
        match self {
            GroupKind::Host => mirror.hostgroups(),
            GroupKind::Service => mirror.servicegroups(),
            GroupKind::Contact => mirror.contactgroups(),
        }
    }

    pub fn find<'a>(self, mirror: &'a Mirror, name: &str) -> Option<&'a Group> {
        match self {
            GroupKind::Host => mirror.hostgroup(name),
            GroupKind::Service => mirror.servicegroup(name),
            GroupKind::Contact => mirror.contactgroup(name),
        }
    }

    pub fn item(self, group: &Group) -> ItemRef<'_> {
        match self {
            GroupKind::Host => ItemRef::HostGroup(group),
            GroupKind::Service => ItemRef::ServiceGroup(group),
            GroupKind::Contact => ItemRef::ContactGroup(group),
        }
    }

    /// Groups of this kind visible to `viewer`, in mirror order.
    pub fn visible<'a>(self, mirror: &'a Mirror, viewer: Option<&dyn Viewer>) -> Vec<&'a Group> {
        only_related(self.all(mirror).iter().map(|g| self.item(g)), viewer)
            .into_iter()
            .filter_map(|item| item.as_group())
            .collect()
    }
}

/// Group name to depth in the hierarchy.
pub type GroupLevels = BTreeMap<String, u32>;

/// Assign a level to every group of `kind` visible to `viewer`.
///
/// Groups are visited in mirror order, each unvisited one becoming a root
/// at level 0. Children are visited in name order at their parent's level
/// plus one; unknown or hidden children are skipped, as are children
/// already on the current path.
pub fn assign_levels(mirror: &Mirror, kind: GroupKind, viewer: Option<&dyn Viewer>) -> GroupLevels {
    let mut levels = GroupLevels::new();
    for group in kind.visible(mirror, viewer) {
        if levels.contains_key(&group.name) {
            continue;
        }
        let mut path = Vec::new();
        assign(mirror, kind, viewer, group, 0, &mut levels, &mut path);
    }
    levels
}

fn assign<'a>(
    mirror: &'a Mirror,
    kind: GroupKind,
    viewer: Option<&dyn Viewer>,
    group: &'a Group,
    level: u32,
    levels: &mut GroupLevels,
    path: &mut Vec<&'a str>,
) {
    debug!(group = %group.name, level, "assigning group level");
    levels.insert(group.name.clone(), level);
    path.push(&group.name);

    let mut children: Vec<&String> = group.children.iter().filter(|c| !c.is_empty()).collect();
    children.sort();

    for child in children {
        if path.contains(&child.as_str()) {
            warn!(group = %group.name, child = %child, "cyclic group nesting");
            continue;
        }
        let child_group = kind
            .find(mirror, child)
            .and_then(|g| related(kind.item(g), viewer))
            .and_then(|item| item.as_group());
        match child_group {
            Some(child_group) => {
                assign(mirror, kind, viewer, child_group, level + 1, levels, path)
            }
            None => debug!(child = %child, "skipping unknown or hidden child group"),
        }
    }

    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_kind() {
        let mirror = Mirror::builder()
            .hostgroup("linux", |g| g)
            .servicegroup("web", |g| g)
            .contactgroup("admins", |g| g)
            .build();

        assert_eq!(GroupKind::Host.find(&mirror, "linux").map(|g| g.name.as_str()), Some("linux"));
        assert_eq!(GroupKind::Service.find(&mirror, "web").map(|g| g.name.as_str()), Some("web"));
        assert!(GroupKind::Contact.find(&mirror, "linux").is_none());
        assert!(matches!(
            GroupKind::Contact.item(GroupKind::Contact.find(&mirror, "admins").unwrap()),
            ItemRef::ContactGroup(_)
        ));
    }

    #[test]
    fn test_nested_levels() {
        let mirror = Mirror::builder()
            .hostgroup("A", |g| g.child("B"))
            .hostgroup("B", |g| g.child("C"))
            .hostgroup("C", |g| g)
            .build();

        let levels = assign_levels(&mirror, GroupKind::Host, None);
        assert_eq!(levels["A"], 0);
        assert_eq!(levels["B"], 1);
        assert_eq!(levels["C"], 2);
    }

    #[test]
    fn test_cycle_terminates() {
        let mirror = Mirror::builder()
            .servicegroup("A", |g| g.child("B"))
            .servicegroup("B", |g| g.child("A"))
            .build();

        let levels = assign_levels(&mirror, GroupKind::Service, None);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels["A"], 0);
        assert_eq!(levels["B"], 1);
    }

    #[test]
    fn test_unknown_children_skipped() {
        let mirror = Mirror::builder()
            .contactgroup("admins", |g| g.child("ghosts").child(""))
            .build();

        let levels = assign_levels(&mirror, GroupKind::Contact, None);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels["admins"], 0);
    }

    #[test]
    fn test_later_root_overwrites_level() {
        // "C" is first reached as a root, then re-levelled under "B"
        let mirror = Mirror::builder()
            .hostgroup("C", |g| g)
            .hostgroup("B", |g| g.child("C"))
            .build();

        let levels = assign_levels(&mirror, GroupKind::Host, None);
        assert_eq!(levels["B"], 0);
        assert_eq!(levels["C"], 1);
    }
}
