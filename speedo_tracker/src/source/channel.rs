use futures::{StreamExt, stream};
use speedo_lib::LocationFix;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{FixStream, LocationSource, SourceError};

const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum Feed {
    Fix(LocationFix),
    Fail(SourceError),
    End,
}

/// Location source fed by pushes, for platforms that deliver fixes through a
/// callback. Each subscription only sees what is pushed after it subscribed.
#[derive(Clone)]
pub struct ChannelSource {
    tx: broadcast::Sender<Feed>,
}

/// The pushing half of a [`ChannelSource`].
#[derive(Clone)]
pub struct FixSender {
    tx: broadcast::Sender<Feed>,
}

impl ChannelSource {
    pub fn new() -> (Self, FixSender) {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        (Self { tx: tx.clone() }, FixSender { tx })
    }
}

impl FixSender {
    /// Returns false when nobody is subscribed and the fix went nowhere.
    pub fn push(&self, fix: LocationFix) -> bool {
        self.tx.send(Feed::Fix(fix)).is_ok()
    }

    pub fn fail(&self, error: SourceError) -> bool {
        self.tx.send(Feed::Fail(error)).is_ok()
    }

    /// Completes every open subscription, as when the platform provider shuts down.
    pub fn end(&self) -> bool {
        self.tx.send(Feed::End).is_ok()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl LocationSource for ChannelSource {
    fn subscribe(&self) -> FixStream {
        // Subscribe now, not on first poll, so nothing pushed in between is lost
        let rx = self.tx.subscribe();

        stream::unfold(rx, |mut rx| async move {
            let item = match rx.recv().await {
                Ok(Feed::Fix(fix)) => Ok(fix),
                Ok(Feed::Fail(error)) => Err(error),
                Ok(Feed::End) | Err(RecvError::Closed) => return None,
                Err(RecvError::Lagged(missed)) => Err(SourceError::Transient(format!("{missed} fixes lost to a slow reader"))),
            };
            Some((item, rx))
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_pushes_in_order() {
        let (source, sender) = ChannelSource::new();
        assert!(!sender.push(LocationFix::new(1.0, 1.0, 1.0, Utc::now())));

        let mut first = source.subscribe();
        let mut second = source.subscribe();
        assert_eq!(sender.subscriber_count(), 2);

        sender.push(LocationFix::new(1.0, 2.0, 3.0, Utc::now()));
        sender.fail(SourceError::Transient("multipath".into()));
        sender.end();

        for stream in [&mut first, &mut second] {
            let fix = stream.next().await.unwrap().unwrap();
            assert_eq!(fix.longitude(), 2.0);
            assert_eq!(stream.next().await, Some(Err(SourceError::Transient("multipath".into()))));
            assert_eq!(stream.next().await, None);
        }
    }

    #[tokio::test]
    async fn dropping_the_stream_unsubscribes() {
        let (source, sender) = ChannelSource::new();
        let stream = source.subscribe();
        assert_eq!(sender.subscriber_count(), 1);

        drop(stream);
        assert_eq!(sender.subscriber_count(), 0);
    }
}
