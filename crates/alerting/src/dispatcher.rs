//! Fire-and-forget alert dispatch

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::sink::{AlertKind, AlertSink, SoundBackend, SystemSound, TerminalBell};

/// Alert dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Play sounds at all
    pub enabled: bool,
    /// Audio backend
    pub backend: SoundBackend,
    /// Pending alerts kept while one is playing; extra alerts are dropped
    pub queue_depth: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: SoundBackend::Auto,
            queue_depth: 8,
        }
    }
}

/// Hands alerts to a background worker without ever waiting on playback
#[derive(Clone)]
pub struct AlertDispatcher {
    sender: Option<mpsc::Sender<AlertKind>>,
}

impl AlertDispatcher {
    /// Spawn the playback worker on the current tokio runtime
    pub fn spawn(
        primary: Arc<dyn AlertSink>,
        fallback: Arc<dyn AlertSink>,
        queue_depth: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        info!(
            "Starting alert dispatcher: primary={}, fallback={}, queue_depth={}",
            primary.name(),
            fallback.name(),
            queue_depth
        );
        tokio::spawn(run_worker(rx, primary, fallback));
        Self { sender: Some(tx) }
    }

    /// Build the dispatcher described by `config`
    pub fn from_config(config: &AlertConfig) -> Self {
        if !config.enabled {
            info!("Alert sounds disabled");
            return Self::disabled();
        }
        Self::spawn(
            Arc::new(SystemSound::new(config.backend)),
            Arc::new(TerminalBell),
            config.queue_depth,
        )
    }

    /// Dispatcher that drops every alert
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Queue an alert for playback. Returns `false` when it was dropped.
    pub fn trigger(&self, kind: AlertKind) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(kind) {
            Ok(()) => true,
            Err(TrySendError::Full(kind)) => {
                warn!("Alert dropped, playback queue full: {:?}", kind);
                false
            }
            Err(TrySendError::Closed(kind)) => {
                debug!("Alert dropped, playback worker gone: {:?}", kind);
                false
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<AlertKind>,
    primary: Arc<dyn AlertSink>,
    fallback: Arc<dyn AlertSink>,
) {
    while let Some(kind) = receiver.recv().await {
        let primary = Arc::clone(&primary);
        let fallback = Arc::clone(&fallback);

        let result =
            tokio::task::spawn_blocking(move || play_with_fallback(&*primary, &*fallback, kind))
                .await;
        if let Err(e) = result {
            warn!("Alert playback task failed: {}", e);
        }
    }
    debug!("Alert dispatcher stopped");
}

fn play_with_fallback(primary: &dyn AlertSink, fallback: &dyn AlertSink, kind: AlertKind) {
    match primary.play(kind) {
        Ok(()) => debug!("Alert played via {}: {:?}", primary.name(), kind),
        Err(e) => {
            warn!("Alert playback via {} failed: {}", primary.name(), e);
            if let Err(e) = fallback.play(kind) {
                warn!("Fallback alert via {} failed: {}", fallback.name(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertError;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedSender;
    use tokio::time::timeout;

    struct Recording {
        name: &'static str,
        fail: bool,
        played: UnboundedSender<(&'static str, AlertKind)>,
    }

    impl AlertSink for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn play(&self, kind: AlertKind) -> Result<(), AlertError> {
            let _ = self.played.send((self.name, kind));
            if self.fail {
                Err(AlertError::Playback("no audio device".into()))
            } else {
                Ok(())
            }
        }
    }

    type Played = mpsc::UnboundedReceiver<(&'static str, AlertKind)>;

    fn sinks(primary_fails: bool) -> (Arc<dyn AlertSink>, Arc<dyn AlertSink>, Played) {
        let (tx, rx) = mpsc::unbounded_channel();
        let primary: Arc<dyn AlertSink> = Arc::new(Recording {
            name: "primary",
            fail: primary_fails,
            played: tx.clone(),
        });
        let fallback: Arc<dyn AlertSink> = Arc::new(Recording {
            name: "fallback",
            fail: false,
            played: tx,
        });
        (primary, fallback, rx)
    }

    #[tokio::test]
    async fn test_trigger_plays_primary() {
        let (primary, fallback, mut played) = sinks(false);
        let dispatcher = AlertDispatcher::spawn(primary, fallback, 4);

        assert!(dispatcher.trigger(AlertKind::DrowsinessAlarm { alarm_count: 1 }));

        let first = timeout(Duration::from_secs(5), played.recv()).await.unwrap();
        assert_eq!(first, Some(("primary", AlertKind::DrowsinessAlarm { alarm_count: 1 })));
    }

    #[tokio::test]
    async fn test_failure_falls_back() {
        let (primary, fallback, mut played) = sinks(true);
        let dispatcher = AlertDispatcher::spawn(primary, fallback, 4);

        assert!(dispatcher.trigger(AlertKind::EmergencyStarted));

        let first = timeout(Duration::from_secs(5), played.recv()).await.unwrap();
        let second = timeout(Duration::from_secs(5), played.recv()).await.unwrap();
        assert_eq!(first, Some(("primary", AlertKind::EmergencyStarted)));
        assert_eq!(second, Some(("fallback", AlertKind::EmergencyStarted)));
    }

    #[tokio::test]
    async fn test_disabled_drops_alerts() {
        let dispatcher = AlertDispatcher::from_config(&AlertConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(!dispatcher.trigger(AlertKind::EmergencyStarted));
    }

    #[test]
    fn test_default_config() {
        let config = AlertConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, SoundBackend::Auto);
        assert_eq!(config.queue_depth, 8);
    }
}
