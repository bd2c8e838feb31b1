//! Fixed-rate maneuver execution
//!
//! Each maneuver runs in two phases. Stabilization sends the neutral intent
//! for a fixed number of ticks without logging anything. Scripted execution
//! then runs the maneuver's script tick by tick:
//!
//! ```text
//! receive ─▶ update ─▶ script ─▶ apply ─▶ send ─▶ log ─▶ wait for tick
//! ```
//!
//! Nothing is retried. The first failure ends the maneuver with the tick it
//! happened on.

use maneuver_bus::TransportAdapter;
use maneuver_core::{CarControl, CarState, FrameBatch};
use tokio::sync::watch;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::car::CarInterface;
use crate::config::TimingConfig;
use crate::error::{ManeuverError, Phase};
use crate::maneuver::{Maneuver, SetupCondition};
use crate::trace::Trace;

/// Outcome of a completed scripted phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed and logged
    pub ticks: u32,
    /// The sample cap cut the script short
    pub capped: bool,
    /// Ticks whose work ran past the next tick boundary
    pub overruns: u32,
}

/// Drives one car interface over one transport at the configured rate
pub struct ControlLoop<'a> {
    transport: &'a TransportAdapter,
    car: &'a mut dyn CarInterface,
    timing: &'a TimingConfig,
    stop: Option<watch::Receiver<bool>>,
}

impl<'a> ControlLoop<'a> {
    pub fn new(
        transport: &'a TransportAdapter,
        car: &'a mut dyn CarInterface,
        timing: &'a TimingConfig,
    ) -> Self {
        Self {
            transport,
            car,
            timing,
            stop: None,
        }
    }

    /// Stop between ticks once `stop` turns true
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Stabilize, then execute `maneuver` into `trace`
    pub async fn run(
        &mut self,
        maneuver: &Maneuver,
        trace: &mut Trace,
    ) -> Result<RunSummary, ManeuverError> {
        self.stabilize(maneuver.setup()).await?;
        self.execute(maneuver, trace).await
    }

    /// Send the neutral intent for the configured stabilization period
    ///
    /// The setup condition is only checked against the last decoded state
    /// and reported; it is never waited for.
    pub async fn stabilize(&mut self, setup: SetupCondition) -> Result<(), ManeuverError> {
        let phase = Phase::Stabilization;
        let ticks = self.timing.stabilization_ticks();
        let neutral = CarControl::default();
        let mut clock = TickClock::new(self.timing);
        clock.start().await;

        let mut last_state = None;
        for tick in 0..ticks {
            self.check_stop(phase, tick)?;
            let batch = self.receive(phase, tick).await?;
            let state = self.decode(phase, tick, batch)?;
            self.actuate(phase, tick, &neutral)?;
            last_state = Some(state);
            clock.wait(phase, tick).await;
        }

        debug!(ticks, overruns = clock.overruns, "Stabilization finished");
        if let Some(state) = last_state {
            if !setup.is_observed(&state) {
                warn!(
                    setup = %setup,
                    v_ego = state.v_ego,
                    a_ego = state.a_ego,
                    cruise_enabled = state.cruise_state.enabled,
                    "Setup condition not observed after stabilization"
                );
            }
        }
        Ok(())
    }

    /// Run the maneuver's script, logging every tick into `trace`
    pub async fn execute(
        &mut self,
        maneuver: &Maneuver,
        trace: &mut Trace,
    ) -> Result<RunSummary, ManeuverError> {
        let phase = Phase::Scripted;
        let scheduled = maneuver.tick_count(self.timing.rate_hz);
        let ticks = scheduled.min(self.timing.max_samples);
        let dt = self.timing.tick_period_s();
        let mut clock = TickClock::new(self.timing);
        clock.start().await;

        for tick in 0..ticks {
            self.check_stop(phase, tick)?;
            let batch = self.receive(phase, tick).await?;
            let state = self.decode(phase, tick, batch)?;
            let intent = maneuver.intent_at(tick, dt);
            self.actuate(phase, tick, &intent)?;
            trace.log(tick, &intent, &state)?;
            clock.wait(phase, tick).await;
        }

        let summary = RunSummary {
            ticks,
            capped: scheduled > ticks,
            overruns: clock.overruns,
        };
        info!(
            maneuver = maneuver.description(),
            ticks = summary.ticks,
            capped = summary.capped,
            overruns = summary.overruns,
            "Maneuver complete"
        );
        Ok(summary)
    }

    fn check_stop(&self, phase: Phase, tick: u32) -> Result<(), ManeuverError> {
        match &self.stop {
            Some(stop) if *stop.borrow() => Err(ManeuverError::Cancelled { phase, tick }),
            _ => Ok(()),
        }
    }

    async fn receive(&self, phase: Phase, tick: u32) -> Result<FrameBatch, ManeuverError> {
        let batch = self
            .transport
            .receive(false)
            .await
            .map_err(|source| ManeuverError::Transport { phase, tick, source })?;
        debug!(%phase, tick, frames = batch.len(), "Received batch");
        Ok(batch)
    }

    fn decode(&mut self, phase: Phase, tick: u32, batch: FrameBatch) -> Result<CarState, ManeuverError> {
        self.car
            .update(std::slice::from_ref(&batch))
            .map_err(|source| ManeuverError::Decode { phase, tick, source })
    }

    fn actuate(&mut self, phase: Phase, tick: u32, intent: &CarControl) -> Result<(), ManeuverError> {
        let (_, frames) = self
            .car
            .apply(intent)
            .map_err(|source| ManeuverError::Encode { phase, tick, source })?;
        self.transport
            .send(frames)
            .map_err(|source| ManeuverError::Transport { phase, tick, source })
    }
}

/// Tick boundaries at a fixed period
///
/// Boundaries missed by a slow tick are skipped rather than replayed.
struct TickClock {
    interval: Interval,
    period: time::Duration,
    boundary: Instant,
    overruns: u32,
}

impl TickClock {
    fn new(timing: &TimingConfig) -> Self {
        let period = timing.tick_period();
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            period,
            boundary: Instant::now(),
            overruns: 0,
        }
    }

    /// Align to the first boundary, which fires immediately
    async fn start(&mut self) {
        self.boundary = self.interval.tick().await;
    }

    async fn wait(&mut self, phase: Phase, tick: u32) {
        let now = Instant::now();
        let next = self.boundary + self.period;
        if now > next {
            self.overruns += 1;
            warn!(
                %phase,
                tick,
                late_ms = (now - next).as_secs_f64() * 1000.0,
                "Tick overran its period"
            );
        }
        self.boundary = self.interval.tick().await;
    }
}
