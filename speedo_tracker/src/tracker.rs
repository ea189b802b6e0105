use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::StreamExt;
use speedo_lib::{Effect, TripCommand, TripEvent, TripReducer, TripState};
use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
};

use crate::{
    TrackerConfig,
    source::{FixStream, LocationSource, SourceError, TickSource, TickStream},
    subscription::Subscription,
};

/// Non-fatal location source conditions, surfaced to whoever listens.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerNotice {
    /// Location updates could not start or were revoked. The trip keeps its
    /// phase and the timer keeps running; pause and resume to retry.
    PermissionDenied(String),
    /// One fix was lost, the stream continues.
    FixDropped(String),
    /// The location stream completed on its own. The trip was paused.
    SourceEnded,
}

/// Owner of a trip.
///
/// Commands, fixes and ticks are applied to one [`TripReducer`] under a single
/// lock, in the order they acquire it. Commands return as soon as the state
/// has changed and the subscriptions they affect are armed or cancelled.
///
/// Must be created inside a tokio runtime. The commands themselves can be
/// called from any thread.
#[derive(Clone)]
pub struct TripTracker {
    shared: Arc<Shared>,
}

struct Shared {
    engine: Mutex<Engine>,
    snapshots: watch::Sender<TripState>,
    notices: broadcast::Sender<TrackerNotice>,
    location: Arc<dyn LocationSource>,
    ticker: Arc<dyn TickSource>,
    runtime: Handle,
    me: Weak<Shared>,
}

struct Engine {
    reducer: TripReducer,
    /// Bumped whenever subscriptions are armed or cancelled. Events pumped
    /// under an older generation are dropped.
    generation: u64,
    timer: Option<Subscription>,
    location: Option<Subscription>,
}

impl TripTracker {
    pub fn new(location: impl LocationSource, ticker: impl TickSource, config: &TrackerConfig) -> Self {
        Self::with_sources(Arc::new(location), Arc::new(ticker), config)
    }

    pub fn with_sources(location: Arc<dyn LocationSource>, ticker: Arc<dyn TickSource>, config: &TrackerConfig) -> Self {
        let (snapshots, _) = watch::channel(TripState::default());
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));

        let shared = Arc::new_cyclic(|me| Shared {
            engine: Mutex::new(Engine {
                reducer: TripReducer::new(config.distance_model),
                generation: 0,
                timer: None,
                location: None,
            }),
            snapshots,
            notices,
            location,
            ticker,
            runtime: Handle::current(),
            me: me.clone(),
        });

        Self { shared }
    }

    pub fn start(&self) {
        self.shared.command(TripCommand::Start);
    }

    pub fn resume(&self) {
        self.shared.command(TripCommand::Resume);
    }

    pub fn pause(&self) {
        self.shared.command(TripCommand::Pause);
    }

    pub fn stop(&self) {
        self.shared.command(TripCommand::Stop);
    }

    pub fn reset(&self) {
        self.shared.command(TripCommand::Reset);
    }

    pub fn command(&self, command: TripCommand) {
        self.shared.command(command);
    }

    pub fn snapshot(&self) -> TripState {
        self.shared.lock().reducer.state()
    }

    /// Receiver that always holds the latest snapshot.
    ///
    /// A `borrow()` blocks publication while it lives, so don't hold one
    /// across a command issued from the same thread.
    pub fn subscribe(&self) -> watch::Receiver<TripState> {
        self.shared.snapshots.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<TrackerNotice> {
        self.shared.notices.subscribe()
    }

    pub fn is_timer_armed(&self) -> bool {
        self.shared.lock().timer.as_ref().is_some_and(|s| !s.is_finished())
    }

    pub fn is_location_armed(&self) -> bool {
        self.shared.lock().location.as_ref().is_some_and(|s| !s.is_finished())
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Engine> {
        // The engine stays consistent between statements, a panicking observer can't tear it
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn command(&self, command: TripCommand) {
        let outcome = {
            let mut engine = self.lock();
            let phase = engine.reducer.phase();
            let outcome = self.process(&mut engine, TripEvent::Command(command));

            if outcome.changed {
                tracing::info!("{:?}: {:?} -> {:?}", command, phase, engine.reducer.phase());
            } else {
                tracing::debug!("{:?} ignored while {:?}", command, phase);
            }
            outcome
        };

        self.complete(outcome);
    }

    /// Applies an event pumped by a subscription armed under `generation`.
    /// Returns false if the subscription was already cancelled.
    fn deliver(&self, generation: u64, event: TripEvent) -> bool {
        let outcome = {
            let mut engine = self.lock();
            if generation != engine.generation {
                tracing::trace!("Dropping stale {:?} from generation {} (current {})", event, generation, engine.generation);
                return false;
            }
            self.process(&mut engine, event)
        };

        self.complete(outcome);
        true
    }

    /// Runs the reducer and cancels what it disarms. Arming is left to
    /// [`Shared::complete`], outside the lock.
    fn process(&self, engine: &mut Engine, event: TripEvent) -> Outcome {
        let transition = engine.reducer.apply(event);
        let mut outcome = Outcome { changed: transition.changed, arm: None };

        if transition.effects.is_empty() {
            return outcome;
        }
        engine.generation += 1;

        let mut arm = Arm { generation: engine.generation, timer: false, location: false };
        for effect in transition.effects {
            match effect {
                Effect::ArmTimer => arm.timer = true,
                Effect::ArmLocation => arm.location = true,
                Effect::DisarmTimer => {
                    if let Some(timer) = engine.timer.take() {
                        tracing::debug!("Timer from generation {} cancelled", timer.generation());
                    }
                }
                Effect::DisarmLocation => {
                    if let Some(location) = engine.location.take() {
                        tracing::debug!("Location updates from generation {} cancelled", location.generation());
                    }
                }
            }
        }

        if arm.timer || arm.location {
            outcome.arm = Some(arm);
        }
        outcome
    }

    fn complete(&self, outcome: Outcome) {
        if let Some(arm) = outcome.arm {
            self.arm(arm);
        }
        if outcome.changed {
            self.publish();
        }
    }

    fn arm(&self, arm: Arm) {
        // Sources may read the tracker while subscribing, so the engine lock is not held here
        let ticks = arm.timer.then(|| self.enter(|| self.ticker.subscribe()));
        let fixes = arm.location.then(|| self.enter(|| self.location.subscribe()));

        let mut engine = self.lock();
        if engine.generation != arm.generation {
            tracing::debug!("Generation {} superseded before its subscriptions were armed", arm.generation);
            return;
        }

        if let Some(ticks) = ticks {
            let me = self.me.clone();
            engine.timer = Some(Subscription::spawn(&self.runtime, arm.generation, ticks, move |ticks| {
                pump_ticks(me, arm.generation, ticks)
            }));
            tracing::debug!("Timer armed (generation {})", arm.generation);
        }
        if let Some(fixes) = fixes {
            let me = self.me.clone();
            engine.location = Some(Subscription::spawn(&self.runtime, arm.generation, fixes, move |fixes| {
                pump_fixes(me, arm.generation, fixes)
            }));
            tracing::debug!("Location updates armed (generation {})", arm.generation);
        }
    }

    /// Publishes the latest state. Concurrent publishers converge on the
    /// newest snapshot and never overwrite it with an older one.
    fn publish(&self) {
        self.snapshots.send_if_modified(|published| {
            let latest = self.lock().reducer.state();
            let modified = *published != latest;
            *published = latest;
            modified
        });
    }

    /// Closes the location subscription but leaves the trip and timer alone.
    fn location_failed(&self, generation: u64, reason: String) {
        let mut engine = self.lock();
        if generation != engine.generation {
            return;
        }

        engine.location = None;
        tracing::warn!("Location updates unavailable, tracking continues without fixes: {}", reason);
        self.notify(TrackerNotice::PermissionDenied(reason));
    }

    /// Reports a lost fix unless its subscription was already cancelled.
    fn fix_dropped(&self, generation: u64, reason: String) -> bool {
        let engine = self.lock();
        if generation != engine.generation {
            return false;
        }

        tracing::debug!("Fix dropped: {}", reason);
        self.notify(TrackerNotice::FixDropped(reason));
        true
    }

    fn notify(&self, notice: TrackerNotice) {
        // No listeners is fine, the condition is already logged
        let _ = self.notices.send(notice);
    }

    fn enter<T>(&self, f: impl FnOnce() -> T) -> T {
        // Sources may create timers, which need the runtime even when a command comes from a plain thread
        let _guard = self.runtime.enter();
        f()
    }
}

/// What a processed event leaves to do once the engine lock is released.
struct Outcome {
    changed: bool,
    arm: Option<Arm>,
}

#[derive(Clone, Copy)]
struct Arm {
    generation: u64,
    timer: bool,
    location: bool,
}

async fn pump_ticks(shared: Weak<Shared>, generation: u64, mut ticks: TickStream) {
    while ticks.next().await.is_some() {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if !shared.deliver(generation, TripEvent::Tick) {
            return;
        }
    }
}

async fn pump_fixes(shared: Weak<Shared>, generation: u64, mut fixes: FixStream) {
    while let Some(item) = fixes.next().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        match item {
            Ok(fix) => {
                if !shared.deliver(generation, TripEvent::Fix(fix)) {
                    return;
                }
            }
            Err(SourceError::Transient(reason)) => {
                if !shared.fix_dropped(generation, reason) {
                    return;
                }
            }
            Err(SourceError::PermissionDenied(reason)) => {
                shared.location_failed(generation, reason);
                return;
            }
        }
    }

    let Some(shared) = shared.upgrade() else {
        return;
    };
    if shared.deliver(generation, TripEvent::SourceEnded) {
        tracing::warn!("Location stream ended while tracking, trip paused");
        shared.notify(TrackerNotice::SourceEnded);
    }
}
