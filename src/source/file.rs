//! Mirrors dumped to disk by the regenerator as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};
use vantage_types::Mirror;

use super::MirrorSource;
use crate::error::{Error, Result};

/// Read a JSON mirror, rejecting incompatible format versions.
///
/// Group membership listed on only one side is linked both ways.
pub fn load_mirror(path: &Path) -> Result<Mirror> {
    let mut mirror: Mirror = serde_json::from_str(&fs::read_to_string(path)?)?;

    let version = mirror.version();
    if !version.is_compatible() {
        return Err(Error::IncompatibleVersion(version));
    }
    mirror.link_groups();
    Ok(mirror)
}

/// Modification time and size of the dump when it was last loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: SystemTime,
    len: u64,
}

impl Stamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok()?,
            len: meta.len(),
        })
    }
}

/// Reloads a mirror dump whenever it is rewritten.
///
/// A dump that disappears keeps the last mirror in place; one that fails
/// to load is retried on the next poll.
#[derive(Debug)]
pub struct FileSource {
    dump: PathBuf,
    label: String,
    loaded: Option<Stamp>,
    failure: Option<String>,
}

impl FileSource {
    pub fn new(dump: impl AsRef<Path>) -> Self {
        let dump = dump.as_ref().to_path_buf();
        Self {
            label: format!("file: {}", dump.display()),
            dump,
            loaded: None,
            failure: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.dump
    }

    fn rewritten(&self, stamp: Option<Stamp>) -> bool {
        match (self.loaded, stamp) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(loaded), Some(now)) => now.modified > loaded.modified || now.len != loaded.len,
        }
    }
}

impl MirrorSource for FileSource {
    fn poll(&mut self) -> Option<Mirror> {
        let stamp = Stamp::of(&self.dump);
        if !self.rewritten(stamp) {
            return None;
        }

        match load_mirror(&self.dump) {
            Ok(mirror) => {
                debug!(
                    dump = %self.dump.display(),
                    generation = mirror.generation(),
                    hosts = mirror.hosts().len(),
                    services = mirror.services().len(),
                    "mirror loaded"
                );
                self.loaded = stamp;
                self.failure = None;
                Some(mirror)
            }
            Err(e) => {
                warn!(dump = %self.dump.display(), error = %e, "mirror load failed");
                self.failure = Some(e.to_string());
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.label
    }

    fn error(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}
