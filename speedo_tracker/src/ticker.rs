use std::time::Duration;

use futures::{StreamExt, stream};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::source::{TickSource, TickStream};

/// Wall clock ticker backed by a tokio interval.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTicker {
    period: Duration,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl TickSource for IntervalTicker {
    fn subscribe(&self) -> TickStream {
        let period = self.period;
        let mut interval = interval_at(Instant::now() + period, period);
        // A stalled runtime should not produce a burst of catch-up seconds
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        stream::unfold(interval, |mut interval| async move {
            interval.tick().await;
            Some(((), interval))
        })
        .boxed()
    }
}
