//! Monitored objects as mirrored from the monitoring framework.

use std::collections::{BTreeMap, BTreeSet};

use crate::{HostState, ServiceState, StateType};

/// Default business impact assigned by the framework.
pub const DEFAULT_BUSINESS_IMPACT: i32 = 2;

/// Check status shared by hosts and services.
///
/// `is_problem` and `is_impact` are the values reported by the framework.
/// The UI-consistent classification is derived separately and never written
/// back here.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CheckStatus {
    pub state_type: StateType,
    /// Priority of the item; higher is more important.
    pub business_impact: i32,
    pub acknowledged: bool,
    pub in_downtime: bool,
    pub flapping: bool,
    pub is_problem: bool,
    pub is_impact: bool,
    /// Unix timestamp (seconds) of the last state change.
    pub last_state_change: i64,
    /// Unix timestamp (seconds) of the last check.
    pub last_check: i64,
    /// Plugin output of the last check.
    pub output: String,
}

impl Default for CheckStatus {
    fn default() -> Self {
        Self {
            state_type: StateType::Hard,
            business_impact: DEFAULT_BUSINESS_IMPACT,
            acknowledged: false,
            in_downtime: false,
            flapping: false,
            is_problem: false,
            is_impact: false,
            last_state_change: 0,
            last_check: 0,
            output: String::new(),
        }
    }
}

/// A monitored host.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Host {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub alias: Option<String>,
    pub state: HostState,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub status: CheckStatus,
    pub tags: BTreeSet<String>,
    pub hostgroups: Vec<String>,
    pub contacts: Vec<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub realm: Option<String>,
    /// Custom variables, upper-case names with a leading underscore (`_LOC_LAT`).
    pub customs: BTreeMap<String, String>,
    /// Full names of the items this host degrades.
    pub impacts: Vec<String>,
    /// Full names of the problems degrading this host.
    pub source_problems: Vec<String>,
    /// Full names of the items this host depends on.
    pub parent_dependencies: Vec<String>,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A monitored service, attached to a host by name.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Service {
    pub host_name: String,
    pub description: String,
    pub state: ServiceState,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub status: CheckStatus,
    pub tags: BTreeSet<String>,
    pub servicegroups: Vec<String>,
    pub contacts: Vec<String>,
    pub customs: BTreeMap<String, String>,
    pub impacts: Vec<String>,
    pub source_problems: Vec<String>,
    pub parent_dependencies: Vec<String>,
}

impl Service {
    pub fn new(host_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// `host/description`, or the bare description for unattached templates.
    pub fn full_name(&self) -> String {
        if self.host_name.is_empty() {
            self.description.clone()
        } else {
            format!("{}/{}", self.host_name, self.description)
        }
    }
}

/// A contact, which is also the identity of a UI user.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Contact {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub alias: Option<String>,
    pub is_admin: bool,
    pub tags: BTreeSet<String>,
    pub contactgroups: Vec<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A host, service or contact group.
///
/// `members` holds member names (host names, `host/service` full names or
/// contact names). `children` names nested groups of the same kind; the
/// references may form a cycle in malformed configurations.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Group {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub alias: Option<String>,
    pub members: Vec<String>,
    pub children: Vec<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check whether `name` is a direct member.
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimePeriod {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub alias: Option<String>,
}

impl TimePeriod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Command {
    pub name: String,
    pub command_line: String,
}

impl Command {
    pub fn new(name: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_line: command_line.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Realm {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub alias: Option<String>,
    pub default: bool,
}

impl Realm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Role of a framework daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DaemonKind {
    #[default]
    Scheduler,
    Poller,
    Broker,
    Reactionner,
    Receiver,
}

/// Liveness of a framework daemon as seen by the broker.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Daemon {
    pub kind: DaemonKind,
    pub name: String,
    pub alive: bool,
    /// Failed connection attempts since the last success.
    pub attempt: u32,
}

// ============================================================================
// Builders
// ============================================================================

macro_rules! status_setters {
    () => {
        /// Set the state type.
        pub fn state_type(mut self, state_type: StateType) -> Self {
            self.0.status.state_type = state_type;
            self
        }

        pub fn soft(self) -> Self {
            self.state_type(StateType::Soft)
        }

        pub fn hard(self) -> Self {
            self.state_type(StateType::Hard)
        }

        pub fn business_impact(mut self, bi: i32) -> Self {
            self.0.status.business_impact = bi;
            self
        }

        pub fn acknowledged(mut self) -> Self {
            self.0.status.acknowledged = true;
            self
        }

        pub fn in_downtime(mut self) -> Self {
            self.0.status.in_downtime = true;
            self
        }

        pub fn flapping(mut self) -> Self {
            self.0.status.flapping = true;
            self
        }

        /// Mark as a problem, as reported by the framework.
        pub fn problem(mut self) -> Self {
            self.0.status.is_problem = true;
            self
        }

        /// Mark as an impact, as reported by the framework.
        pub fn impact(mut self) -> Self {
            self.0.status.is_impact = true;
            self
        }

        pub fn last_state_change(mut self, ts: i64) -> Self {
            self.0.status.last_state_change = ts;
            self
        }

        pub fn last_check(mut self, ts: i64) -> Self {
            self.0.status.last_check = ts;
            self
        }

        pub fn output(mut self, output: impl Into<String>) -> Self {
            self.0.status.output = output.into();
            self
        }

        pub fn tag(mut self, tag: impl Into<String>) -> Self {
            self.0.tags.insert(tag.into());
            self
        }

        pub fn contact(mut self, contact: impl Into<String>) -> Self {
            self.0.contacts.push(contact.into());
            self
        }

        pub fn custom(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
            self.0.customs.insert(name.into(), value.into());
            self
        }

        /// Record an item degraded by this one.
        pub fn impacts(mut self, full_name: impl Into<String>) -> Self {
            self.0.impacts.push(full_name.into());
            self
        }

        /// Record a problem degrading this item.
        pub fn source_problem(mut self, full_name: impl Into<String>) -> Self {
            self.0.source_problems.push(full_name.into());
            self
        }

        pub fn depends_on(mut self, full_name: impl Into<String>) -> Self {
            self.0.parent_dependencies.push(full_name.into());
            self
        }
    };
}

/// Builder for [`Host`].
#[derive(Debug)]
pub struct HostBuilder(Host);

impl HostBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Host::new(name))
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.0.alias = Some(alias.into());
        self
    }

    pub fn state(mut self, state: HostState) -> Self {
        self.0.state = state;
        self
    }

    pub fn hostgroup(mut self, group: impl Into<String>) -> Self {
        self.0.hostgroups.push(group.into());
        self
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.0.realm = Some(realm.into());
        self
    }

    status_setters!();

    pub fn build(self) -> Host {
        self.0
    }
}

/// Builder for [`Service`].
#[derive(Debug)]
pub struct ServiceBuilder(Service);

impl ServiceBuilder {
    pub fn new(host_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self(Service::new(host_name, description))
    }

    pub fn state(mut self, state: ServiceState) -> Self {
        self.0.state = state;
        self
    }

    pub fn servicegroup(mut self, group: impl Into<String>) -> Self {
        self.0.servicegroups.push(group.into());
        self
    }

    status_setters!();

    pub fn build(self) -> Service {
        self.0
    }
}

/// Builder for [`Contact`].
#[derive(Debug)]
pub struct ContactBuilder(Contact);

impl ContactBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Contact::new(name))
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.0.alias = Some(alias.into());
        self
    }

    pub fn admin(mut self) -> Self {
        self.0.is_admin = true;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.0.tags.insert(tag.into());
        self
    }

    pub fn build(self) -> Contact {
        self.0
    }
}

/// Builder for [`Group`].
#[derive(Debug)]
pub struct GroupBuilder(Group);

impl GroupBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Group::new(name))
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.0.alias = Some(alias.into());
        self
    }

    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.0.members.push(name.into());
        self
    }

    /// Nest another group of the same kind under this one.
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.0.children.push(name.into());
        self
    }

    pub fn build(self) -> Group {
        self.0
    }
}
