pub mod api;
pub mod reconcile;
pub mod tokens;
pub mod tracks;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::note::Note;

/// Tagged change event from the realtime feed.
///
/// The transport guarantees nothing: events may arrive late, duplicated, or
/// reordered. Deletes carry only the id, matching what the store's change
/// stream exposes for removed rows.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Inserted(Note),
    Updated(Note),
    Deleted(Uuid),
}

impl ChangeEvent {
    pub fn note_id(&self) -> Uuid {
        match self {
            Self::Inserted(n) | Self::Updated(n) => n.id,
            Self::Deleted(id) => *id,
        }
    }
}

pub type ChangeSender = mpsc::UnboundedSender<ChangeEvent>;

/// Receiving half of the change feed, exposed as a `Stream` so the session
/// can pump it with `StreamExt::next`.
pub struct ChangeFeed {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl Stream for ChangeFeed {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Channel pair connecting a transport adapter to the reconciler.
pub fn change_channel() -> (ChangeSender, ChangeFeed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ChangeFeed { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn feed_delivers_in_send_order() {
        let (tx, mut feed) = change_channel();
        let id = Uuid::new_v4();
        tx.send(ChangeEvent::Deleted(id)).unwrap();
        drop(tx);

        match feed.next().await {
            Some(ChangeEvent::Deleted(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(feed.next().await.is_none());
    }
}
