use anyhow::{Context, Result};
use tracing::debug;

use crate::host::{DisplayOps, Signal, Subject, SubscriptionId};

/// A group of signal connections torn down together
#[derive(Debug, Default)]
pub struct SubscriptionBatch {
    entries: Vec<(Subject, SubscriptionId)>,
}

impl SubscriptionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `signal` on `subject` and remember the handle
    pub fn connect<H: DisplayOps + ?Sized>(
        &mut self,
        host: &mut H,
        subject: Subject,
        signal: Signal,
    ) -> Result<()> {
        let id = host
            .connect(subject, signal)
            .with_context(|| format!("Failed to connect {signal:?} on {subject:?}"))?;
        self.entries.push((subject, id));
        Ok(())
    }

    /// Connect several signals on the same subject
    pub fn connect_all<H: DisplayOps + ?Sized>(
        &mut self,
        host: &mut H,
        subject: Subject,
        signals: &[Signal],
    ) -> Result<()> {
        for &signal in signals {
            self.connect(host, subject, signal)?;
        }
        Ok(())
    }

    /// Disconnect every entry and clear the list
    pub fn disconnect_all<H: DisplayOps + ?Sized>(&mut self, host: &mut H) {
        for (subject, id) in self.entries.drain(..) {
            debug!(?subject, subscription = %id, "disconnecting");
            host.disconnect(subject, id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
