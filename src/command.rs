//! Rendezvous channel carrying desired settings to the device link.

use anyhow::{Result, anyhow};
use tokio::sync::{mpsc, oneshot};

use crate::status::Settings;

struct Envelope {
    settings: Settings,
    delivered: oneshot::Sender<()>,
}

/// Creates a connected sender/receiver pair.
///
/// The channel has no queueing beyond a single in-flight hand-off: a
/// [`CommandSender::send`] completes only once the receiver has taken the
/// value. Values are delivered exactly once, in send order.
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (CommandSender { tx }, CommandReceiver { rx })
}

/// Producer half. Cheap to clone; every clone feeds the same consumer.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Envelope>,
}

impl CommandSender {
    /// Hands `settings` to the consumer, waiting until it has been received.
    ///
    /// There is no timeout: with no consumer ready this waits indefinitely.
    /// Fails only if the consumer has gone away.
    pub async fn send(&self, settings: Settings) -> Result<()> {
        let (delivered, ack) = oneshot::channel();

        self.tx
            .send(Envelope {
                settings,
                delivered,
            })
            .await
            .map_err(|_| anyhow!("command channel closed"))?;

        ack.await
            .map_err(|_| anyhow!("command dropped before delivery"))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the device link.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<Envelope>,
}

impl CommandReceiver {
    /// Receives the next command, releasing its sender.
    ///
    /// Returns `None` once every sender has been dropped.
    pub async fn recv(&mut self) -> Option<Settings> {
        let envelope = self.rx.recv().await?;
        // The sender may have stopped waiting; delivery still counts.
        let _ = envelope.delivered.send(());
        Some(envelope.settings)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
