//! Session bracket
//!
//! A session owns the safety scope for its whole lifetime:
//!
//! ```text
//! passive ─▶ fingerprint ─▶ init ─▶ active(param) ─▶ maneuvers... ─▶ disabled
//! ```
//!
//! Whatever happens in between (an error, a stop request, a panic, the
//! future being dropped) the device ends up disabled exactly once.

use std::sync::Arc;

use maneuver_bus::{BusDevice, SafetyModeController, SafetyScope, TransportAdapter};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::car::{FingerprintError, Fingerprinter};
use crate::config::TimingConfig;
use crate::control_loop::ControlLoop;
use crate::error::SessionError;
use crate::maneuver::Maneuver;
use crate::trace::{ManeuverRun, RunStatus, Trace, TraceBook};

/// Runs a list of maneuvers against one bus device
pub struct Session {
    device: Arc<dyn BusDevice>,
    fingerprinter: Arc<dyn Fingerprinter>,
    timing: TimingConfig,
    stop: Option<watch::Receiver<bool>>,
}

impl Session {
    pub fn new(
        device: Arc<dyn BusDevice>,
        fingerprinter: Arc<dyn Fingerprinter>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            device,
            fingerprinter,
            timing,
            stop: None,
        }
    }

    /// Stop the running maneuver between ticks once `stop` turns true
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Run `maneuvers` in order, recording every run into `book`
    ///
    /// The first failing maneuver ends the session. Its partial trace and
    /// those of the maneuvers before it stay in `book`.
    pub async fn run(&self, maneuvers: &[Maneuver], book: &mut TraceBook) -> Result<(), SessionError> {
        let controller = SafetyModeController::new(self.device.clone());
        let scope = controller.scope();
        info!(
            session = %book.session_id,
            device = %self.device.describe(),
            maneuvers = maneuvers.len(),
            "Session starting"
        );

        let result = self.run_in_scope(&scope, maneuvers, book).await;

        match (result, scope.release()) {
            (Ok(()), Ok(())) => {
                info!(session = %book.session_id, runs = book.runs().len(), "Session complete");
                Ok(())
            }
            (Ok(()), Err(e)) => {
                error!(error = %e, "Failed to disable bus device at session end");
                Err(e.into())
            }
            (Err(e), Ok(())) => {
                warn!(error = %e, "Session aborted; bus device disabled");
                Err(e)
            }
            (Err(e), Err(release)) => {
                error!(error = %e, release_error = %release, "Session aborted and disabling the bus device failed");
                Err(e)
            }
        }
    }

    async fn run_in_scope(
        &self,
        scope: &SafetyScope<'_>,
        maneuvers: &[Maneuver],
        book: &mut TraceBook,
    ) -> Result<(), SessionError> {
        let transport =
            TransportAdapter::new(self.device.clone()).with_poll_interval(self.timing.poll_interval());

        scope.enter_passive()?;
        let mut car = self.fingerprinter.fingerprint(&transport).await?;
        let params = car.params().clone();
        book.vehicle = Some(params.car_fingerprint.clone());
        info!(
            car = %params.car_name,
            fingerprint = %params.car_fingerprint,
            longitudinal = params.openpilot_longitudinal_control,
            "Vehicle fingerprinted"
        );

        if !params.openpilot_longitudinal_control {
            return Err(FingerprintError::LongitudinalControlDisabled {
                car: params.car_fingerprint,
            }
            .into());
        }

        car.init(&transport).await?;
        scope.enter_active(params.safety_param)?;

        for maneuver in maneuvers {
            let id = book.next_id();
            info!(
                id = %id,
                maneuver = maneuver.description(),
                setup = %maneuver.setup(),
                "Running maneuver"
            );

            let mut trace = Trace::new(self.timing.tick_period_s());
            let mut control = ControlLoop::new(&transport, car.as_mut(), &self.timing);
            if let Some(stop) = &self.stop {
                control = control.with_stop_signal(stop.clone());
            }
            let outcome = control.run(maneuver, &mut trace).await;

            let status = match &outcome {
                Ok(summary) => RunStatus::Completed {
                    capped: summary.capped,
                    overruns: summary.overruns,
                },
                Err(e) => RunStatus::Aborted {
                    tick: e.tick(),
                    reason: e.to_string(),
                },
            };
            book.push(ManeuverRun {
                id,
                description: maneuver.description().to_string(),
                setup: maneuver.setup(),
                status,
                trace,
            });

            if let Err(source) = outcome {
                return Err(SessionError::Maneuver {
                    description: maneuver.description().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use maneuver_bus::transport::mock::MockBusDevice;
    use maneuver_bus::TransportError;
    use maneuver_core::{
        Actuators, CarControl, CarParams, CarState, DecodeError, EncodeError, FrameBatch,
        OperatingMode,
    };

    use crate::car::CarInterface;
    use crate::maneuver::SetupCondition;

    struct StubCar {
        params: CarParams,
    }

    #[async_trait]
    impl CarInterface for StubCar {
        fn params(&self) -> &CarParams {
            &self.params
        }

        async fn init(&mut self, _transport: &TransportAdapter) -> Result<(), TransportError> {
            Ok(())
        }

        fn update(&mut self, _batches: &[FrameBatch]) -> Result<CarState, DecodeError> {
            Ok(CarState::default())
        }

        fn apply(&mut self, control: &CarControl) -> Result<(Actuators, FrameBatch), EncodeError> {
            Ok((control.actuators.clone(), Vec::new()))
        }
    }

    struct StubFingerprinter {
        longitudinal: bool,
        recognized: bool,
    }

    #[async_trait]
    impl Fingerprinter for StubFingerprinter {
        async fn fingerprint(
            &self,
            _transport: &TransportAdapter,
        ) -> Result<Box<dyn CarInterface>, FingerprintError> {
            if !self.recognized {
                return Err(FingerprintError::Unrecognized("no frames".to_string()));
            }
            Ok(Box::new(StubCar {
                params: CarParams {
                    car_name: "Stub".to_string(),
                    car_fingerprint: "STUB_CAR".to_string(),
                    openpilot_longitudinal_control: self.longitudinal,
                    safety_param: 7,
                },
            }))
        }
    }

    fn session(device: &Arc<MockBusDevice>, longitudinal: bool, recognized: bool) -> Session {
        let timing = TimingConfig {
            stabilization_s: 0.1,
            ..Default::default()
        };
        Session::new(
            device.clone(),
            Arc::new(StubFingerprinter {
                longitudinal,
                recognized,
            }),
            timing,
        )
    }

    fn idle(n: usize) -> Vec<Maneuver> {
        (0..n)
            .map(|i| Maneuver::new(format!("idle {i}"), SetupCondition::Stopped))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_sequence() {
        let device = Arc::new(MockBusDevice::new());
        let mut book = TraceBook::new();
        session(&device, true, true)
            .run(&idle(2), &mut book)
            .await
            .unwrap();

        assert_eq!(
            device.mode_history(),
            vec![
                OperatingMode::Passive,
                OperatingMode::Active { safety_param: 7 },
                OperatingMode::Disabled,
            ]
        );
        assert_eq!(book.vehicle.as_deref(), Some("STUB_CAR"));
        assert_eq!(book.runs().len(), 2);
        assert!(book.runs().iter().all(|r| r.status.is_completed()));
        assert!(book.runs().iter().all(|r| r.trace.len() == 100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_longitudinal_disabled_never_goes_active() {
        let device = Arc::new(MockBusDevice::new());
        let mut book = TraceBook::new();
        let err = session(&device, false, true)
            .run(&idle(1), &mut book)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::Fingerprint(FingerprintError::LongitudinalControlDisabled { .. })
        ));
        assert_eq!(
            device.mode_history(),
            vec![OperatingMode::Passive, OperatingMode::Disabled]
        );
        assert!(book.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_vehicle() {
        let device = Arc::new(MockBusDevice::new());
        let mut book = TraceBook::new();
        let err = session(&device, true, false)
            .run(&idle(1), &mut book)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Fingerprint(FingerprintError::Unrecognized(_))));
        assert_eq!(device.current_mode(), OperatingMode::Disabled);
        assert!(book.vehicle.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_mode_failure_still_disables() {
        let device = Arc::new(MockBusDevice::new());
        device.fail_mode_set(Some(OperatingMode::Active { safety_param: 0 }));
        let mut book = TraceBook::new();
        let err = session(&device, true, true)
            .run(&idle(1), &mut book)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::Transport(TransportError::ModeChangeFailed { .. })
        ));
        assert_eq!(
            device.mode_history(),
            vec![OperatingMode::Passive, OperatingMode::Disabled]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_request_aborts_session() {
        let device = Arc::new(MockBusDevice::new());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let mut book = TraceBook::new();
        let err = session(&device, true, true)
            .with_stop_signal(rx)
            .run(&idle(3), &mut book)
            .await
            .unwrap_err();

        match err {
            SessionError::Maneuver { source, .. } => assert!(source.is_cancelled()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(book.runs().len(), 1);
        assert!(matches!(
            book.runs()[0].status,
            RunStatus::Aborted { tick: Some(0), .. }
        ));
        assert_eq!(device.current_mode(), OperatingMode::Disabled);
    }
}
