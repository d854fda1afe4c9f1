//! Mirror sources.
//!
//! The regenerator that rebuilds the mirror from the live framework runs
//! out-of-band. A [`MirrorSource`] hands its snapshots over to a
//! [`DataManager`](crate::DataManager), either by polling a JSON file or by
//! receiving them over a channel.

mod channel;
mod file;

pub use channel::ChannelSource;
pub use file::{load_mirror, FileSource};

use std::fmt::Debug;

use vantage_types::Mirror;

/// Trait for receiving mirror snapshots from a regenerator.
///
/// # Example
///
/// ```no_run
/// use vantage::{FileSource, MirrorSource};
///
/// let mut source = FileSource::new("mirror.json");
/// if let Some(mirror) = source.poll() {
///     println!("Got {} hosts", mirror.hosts().len());
/// }
/// ```
pub trait MirrorSource: Send + Debug {
    /// Poll for the latest mirror.
    ///
    /// Returns `Some(mirror)` if a new snapshot is available, `None`
    /// otherwise. Never blocks.
    fn poll(&mut self) -> Option<Mirror>;

    /// Human-readable description of the source, for logs.
    fn description(&self) -> &str;

    /// The error from the last poll, if it failed.
    fn error(&self) -> Option<&str>;
}
