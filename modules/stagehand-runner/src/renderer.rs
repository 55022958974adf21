//! A stand-in rendering layer: logs what would be on screen after every
//! publication.

use std::collections::HashMap;

use stagehand_common::{Presence, StepKind};
use stagehand_engine::{Publication, RunSummary, SequenceObserver};
use tokio::sync::watch;
use tracing::{info, warn};

pub async fn render_feed(
    mut feed: watch::Receiver<Publication<String, String>>,
    kinds: HashMap<String, StepKind>,
) {
    while feed.changed().await.is_ok() {
        let publication = feed.borrow_and_update().clone();

        let mut on_screen: Vec<String> = kinds
            .iter()
            .filter_map(|(id, kind)| match publication.state.presence(id, *kind) {
                Presence::Hidden => None,
                Presence::Shown => Some(id.clone()),
                Presence::ShownAs(role) => Some(format!("{id} ({role})")),
            })
            .collect();
        on_screen.sort();

        match serde_json::to_string(&publication.transition) {
            Ok(transition) => info!(
                seq = publication.seq,
                active = ?publication.state.active_id(),
                on_screen = ?on_screen,
                transition = %transition,
                "Render"
            ),
            Err(e) => warn!(error = %e, "Failed to encode transition"),
        }
    }
}

/// Flips a watch value once the run ends.
pub struct CompletionLatch {
    tx: watch::Sender<Option<RunSummary>>,
}

impl CompletionLatch {
    pub fn channel() -> (Self, watch::Receiver<Option<RunSummary>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl SequenceObserver<String, String> for CompletionLatch {
    fn sequence_ended(&self, summary: &RunSummary) {
        self.tx.send_replace(Some(summary.clone()));
    }
}
