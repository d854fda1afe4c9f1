//! # vantage-types
//!
//! Data model for an in-memory mirror of monitoring framework state: hosts,
//! services, contacts, groups, time periods, commands, realms and daemons.
//!
//! The mirror is produced by an external regenerator and consumed read-only
//! by the search and synthesis engine in the `vantage` crate.
//!
//! ## Features
//!
//! - `serde`: JSON (or any serde format) serialization of the mirror
//!
//! ## Example
//!
//! ```rust
//! use vantage_types::{HostState, Mirror, ServiceState};
//!
//! let mirror = Mirror::builder()
//!     .host("router", |h| h.state(HostState::Up).business_impact(5))
//!     .host("web01", |h| h.state(HostState::Down).depends_on("router"))
//!     .service("web01", "http", |s| s.state(ServiceState::Critical))
//!     .hostgroup("linux", |g| g.member("web01"))
//!     .build();
//!
//! assert_eq!(mirror.hosts().len(), 2);
//! assert_eq!(mirror.services_of("web01").count(), 1);
//! assert_eq!(mirror.host("web01").unwrap().hostgroups, vec!["linux".to_string()]);
//! ```

mod item;
mod mirror;
mod objects;
mod state;
mod version;

pub use item::*;
pub use mirror::*;
pub use objects::*;
pub use state::*;
pub use version::*;

/// Current mirror format version.
pub const MIRROR_FORMAT_VERSION: u32 = 1;
