//! The trip state machine.
//!
//! `TripReducer` owns a [`TripState`] plus the last fix it measured from, and
//! consumes [`TripEvent`]s one at a time. It never touches a clock or a
//! location provider itself: the [`Effect`]s returned from every call tell the
//! runtime which subscriptions to arm or disarm.

use crate::{
    location_fix::{DistanceModel, LocationFix},
    trip_state::{Phase, TripState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripCommand {
    Start,
    Resume,
    Pause,
    Stop,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TripEvent {
    Command(TripCommand),
    Fix(LocationFix),
    Tick,
    /// The location stream completed while the trip was running
    SourceEnded,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ArmTimer,
    DisarmTimer,
    ArmLocation,
    DisarmLocation,
}

const ARM: [Effect; 2] = [Effect::ArmTimer, Effect::ArmLocation];
const DISARM: [Effect; 2] = [Effect::DisarmTimer, Effect::DisarmLocation];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transition {
    /// The published snapshot differs from the one before the event
    pub changed: bool,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn noop() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        !self.changed && self.effects.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TripReducer {
    state: TripState,
    last_fix: Option<LocationFix>,
    model: DistanceModel,
}

impl TripReducer {
    pub fn new(model: DistanceModel) -> Self {
        Self {
            state: TripState::default(),
            last_fix: None,
            model,
        }
    }

    pub fn state(&self) -> TripState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The fix the next distance increment will be measured from.
    pub fn last_fix(&self) -> Option<&LocationFix> {
        self.last_fix.as_ref()
    }

    pub fn apply(&mut self, event: TripEvent) -> Transition {
        match event {
            TripEvent::Command(command) => self.command(command),
            TripEvent::Fix(fix) => self.on_fix(fix),
            TripEvent::Tick => self.on_tick(),
            TripEvent::SourceEnded => self.on_source_ended(),
        }
    }

    pub fn command(&mut self, command: TripCommand) -> Transition {
        match command {
            TripCommand::Start => self.start(),
            TripCommand::Resume => self.resume(),
            TripCommand::Pause => self.pause(),
            TripCommand::Stop => self.stop(),
            TripCommand::Reset => self.reset(),
        }
    }

    /// Begins a fresh trip. Only acts from idle; a stopped trip must be reset first.
    pub fn start(&mut self) -> Transition {
        if self.phase() != Phase::Idle {
            return Transition::noop();
        }

        let before = self.state;
        self.state.distance = 0.0;
        self.state.elapsed_time = 0;
        self.state.is_running = true;
        self.state.has_started = true;
        self.state.has_stopped = false;
        self.last_fix = None;

        self.finish(before, ARM.to_vec())
    }

    /// Continues a paused trip without touching the accumulated totals.
    pub fn resume(&mut self) -> Transition {
        if self.phase() != Phase::Paused {
            return Transition::noop();
        }

        let before = self.state;
        self.state.is_running = true;

        self.finish(before, ARM.to_vec())
    }

    /// Stops consuming fixes and ticks. The last fix is kept, so the first fix
    /// after a resume is measured from where the trip was paused.
    pub fn pause(&mut self) -> Transition {
        if !self.state.is_running {
            return Transition::noop();
        }

        let before = self.state;
        self.state.is_running = false;

        self.finish(before, DISARM.to_vec())
    }

    /// Ends the trip. Totals stay visible until a reset.
    pub fn stop(&mut self) -> Transition {
        if !self.state.has_started {
            return Transition::noop();
        }

        let before = self.state;
        let was_running = self.state.is_running;
        self.state.is_running = false;
        self.state.has_started = false;
        self.state.has_stopped = true;
        self.last_fix = None;

        self.finish(before, if was_running { DISARM.to_vec() } else { Vec::new() })
    }

    pub fn reset(&mut self) -> Transition {
        let before = self.state;
        let was_running = self.state.is_running;
        self.state = TripState::default();
        self.last_fix = None;

        self.finish(before, if was_running { DISARM.to_vec() } else { Vec::new() })
    }

    pub fn on_tick(&mut self) -> Transition {
        if !self.state.is_running {
            return Transition::noop();
        }

        let before = self.state;
        self.state.elapsed_time += 1;

        self.finish(before, Vec::new())
    }

    pub fn on_fix(&mut self, fix: LocationFix) -> Transition {
        if !self.state.is_running {
            return Transition::noop();
        }

        let before = self.state;
        self.state.speed = fix.speed;
        if let Some(last) = &self.last_fix {
            let step = last.distance_to(&fix, self.model);
            if step.is_finite() {
                self.state.distance += step;
            }
        }
        self.last_fix = Some(fix);

        self.finish(before, Vec::new())
    }

    /// The location stream is gone: behave as if the user had paused.
    pub fn on_source_ended(&mut self) -> Transition {
        self.pause()
    }

    fn finish(&self, before: TripState, effects: Vec<Effect>) -> Transition {
        Transition {
            changed: self.state != before,
            effects,
        }
    }
}
