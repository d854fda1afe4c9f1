//! In-process mirror source.

use tokio::sync::watch;
use tracing::debug;
use vantage_types::Mirror;

use super::MirrorSource;

/// Mirrors published by a regenerator running in the same process.
///
/// A mirror is handed over once per generation: republishing a mirror
/// with the generation last delivered is not reported as new.
///
/// # Example
///
/// ```
/// use vantage::{ChannelSource, MirrorSource};
/// use vantage_types::Mirror;
///
/// let (tx, mut source) = ChannelSource::create("regenerator");
/// tx.send(Mirror::builder().generation(1).build()).unwrap();
/// assert_eq!(source.poll().unwrap().generation(), 1);
/// assert!(source.poll().is_none());
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    mirrors: watch::Receiver<Mirror>,
    label: String,
    delivered: Option<u64>,
}

impl ChannelSource {
    pub fn new(mirrors: watch::Receiver<Mirror>, origin: &str) -> Self {
        Self {
            mirrors,
            label: format!("channel: {}", origin),
            delivered: None,
        }
    }

    /// A publishing handle paired with the source reading from it.
    ///
    /// The channel starts out holding an empty mirror of generation 0.
    pub fn create(origin: &str) -> (watch::Sender<Mirror>, Self) {
        let (tx, rx) = watch::channel(Mirror::default());
        (tx, Self::new(rx, origin))
    }
}

impl MirrorSource for ChannelSource {
    fn poll(&mut self) -> Option<Mirror> {
        let current = self.mirrors.borrow_and_update();
        let generation = current.generation();
        if self.delivered == Some(generation) {
            return None;
        }

        debug!(source = %self.label, generation, "mirror received");
        self.delivered = Some(generation);
        Some(current.clone())
    }

    fn description(&self) -> &str {
        &self.label
    }

    fn error(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_types::HostState;

    #[test]
    fn test_first_poll_returns_current_mirror() {
        let (_tx, mut source) = ChannelSource::create("test");

        let mirror = source.poll().unwrap();
        assert!(mirror.hosts().is_empty());
        assert!(source.poll().is_none());
        assert_eq!(source.description(), "channel: test");
    }

    #[test]
    fn test_new_generation_is_delivered() {
        let (tx, mut source) = ChannelSource::create("test");
        source.poll();

        tx.send(
            Mirror::builder()
                .generation(2)
                .host("web01", |h| h.state(HostState::Up))
                .build(),
        )
        .unwrap();

        let mirror = source.poll().unwrap();
        assert_eq!(mirror.generation(), 2);
        assert_eq!(mirror.hosts().len(), 1);
    }

    #[test]
    fn test_republished_generation_is_skipped() {
        let (tx, mut source) = ChannelSource::create("test");
        tx.send(Mirror::builder().generation(5).build()).unwrap();
        assert!(source.poll().is_some());

        tx.send(Mirror::builder().generation(5).build()).unwrap();
        assert!(source.poll().is_none());
    }
}
