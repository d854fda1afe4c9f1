//! # vantage
//!
//! Search, filtering and synthesis engine for monitoring dashboards.
//!
//! Dashboards query an in-memory [`Mirror`] of the monitoring framework's
//! state (hosts, services, contacts, groups...) with a free-text search
//! language, and reduce the results to per-state counts and percentages.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         DataManager                          │
//! │  ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐ │
//! │  │ relation │──▶│  search  │──▶│ synthesis │──▶│  Summary  │ │
//! │  │ (viewer) │   │ (parser, │   │ (classify,│   │  (JSON)   │ │
//! │  └──────────┘   │ evaluate)│   │  counts)  │   └───────────┘ │
//! │                 └──────────┘   └───────────┘                 │
//! │       ▲                                                      │
//! │  ┌────┴─────┐                                                │
//! │  │  source  │◀── FileSource | ChannelSource                   │
//! │  └──────────┘                                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`relation`]**: which items a [`Viewer`] may see
//! - **[`search`]**: query parsing, predicate evaluation and sorting
//! - **[`synthesis`]**: problem/impact classification and state counts
//! - **[`groups`]**: group hierarchy levels
//! - **[`worldmap`]**: hosts with GPS coordinates
//! - **[`source`]**: mirror sources ([`MirrorSource`] trait)
//!
//! ## Search language
//!
//! A search is a sequence of `key:value` terms narrowing the result one
//! after the other; a bare term is a name search:
//!
//! ```text
//! type:host hg:linux isnot:ack bi:>=3 duration:>1h "web front" NOT backup
//! ```
//!
//! ## Usage
//!
//! ```
//! use vantage::{DataManager, Settings};
//! use vantage_types::{HostState, Mirror};
//!
//! let mirror = Mirror::builder()
//!     .host("web01", |h| h.state(HostState::Down).hard())
//!     .host("web02", |h| h.state(HostState::Up))
//!     .build();
//! let dm = DataManager::new(mirror, Settings::default());
//!
//! let down = dm.search("type:host is:down", None);
//! assert_eq!(down.len(), 1);
//!
//! let synthesis = dm.hosts_synthesis(None, None);
//! assert_eq!(synthesis.nb_problems, 1);
//! assert_eq!(synthesis.pct_problems, 50.0);
//! ```

pub mod config;
pub mod error;
pub mod groups;
pub mod manager;
pub mod relation;
pub mod search;
pub mod source;
pub mod synthesis;
pub mod worldmap;

pub use config::{Settings, WorldmapSettings};
pub use error::{Error, PredicateError, Result};
pub use groups::{assign_levels, GroupKind, GroupLevels};
pub use manager::{BusinessNode, DataManager, SearchOptions, Summary};
pub use relation::{only_related, related, ContactViewer, Viewer};
pub use search::{parse, Predicate, Sort};
pub use source::{load_mirror, ChannelSource, FileSource, MirrorSource};
pub use synthesis::{classify, Classification, Synthesis, SynthesisMode};
pub use vantage_types::{ItemKind, ItemRef, Mirror, Monitored};
