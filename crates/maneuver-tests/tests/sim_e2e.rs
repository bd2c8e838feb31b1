//! Full sessions against the simulated vehicle, through to the report

use std::sync::Arc;

use maneuver_bus::OperatingMode;
use maneuver_runner::{
    default_maneuvers, export_json, Maneuver, ReportBuilder, ReportConfig, RunStatus, Script,
    Session, SessionError, SetupCondition, TimingConfig, TraceBook,
};
use maneuver_sim::{PlantConfig, SimBusDevice, SimConfig, SimFingerprinter, CAR_FINGERPRINT, SAFETY_PARAM};
use tokio::sync::watch;

fn sim_session(config: SimConfig) -> (Arc<SimBusDevice>, Session) {
    let device = Arc::new(SimBusDevice::new(config.clone()));
    let session = Session::new(
        device.clone(),
        Arc::new(SimFingerprinter::new(&config)),
        TimingConfig::default(),
    );
    (device, session)
}

#[tokio::test(start_paused = true)]
async fn default_catalogue_runs_and_reports() {
    let (device, session) = sim_session(SimConfig::default());
    let mut book = TraceBook::new();

    session.run(&default_maneuvers(), &mut book).await.unwrap();

    assert_eq!(book.vehicle.as_deref(), Some(CAR_FINGERPRINT));
    assert_eq!(book.runs().len(), 3);
    assert!(book.runs().iter().all(|r| r.status.is_completed()));
    assert!(book.runs().iter().all(|r| r.trace.len() == 100));
    assert_eq!(
        device.mode_history(),
        vec![
            OperatingMode::Passive,
            OperatingMode::Active {
                safety_param: SAFETY_PARAM
            },
            OperatingMode::Disabled,
        ]
    );
    assert!(device.accepted_commands() > 0);

    // The vehicle pulls away during "start from stop"
    let v_ego = book.runs()[0].trace.floats("carState.vEgo").unwrap();
    assert_eq!(v_ego[0], 0.0);
    assert!(*v_ego.last().unwrap() > 0.3);
    assert!(book.runs()[0]
        .trace
        .floats("carState.canValid")
        .unwrap()
        .iter()
        .all(|v| *v == 1.0));

    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.html");
    let traces = dir.path().join("traces.json");
    ReportBuilder::new(ReportConfig::default())
        .write(&book, &report)
        .unwrap();
    export_json(&book, &traces).unwrap();

    let html = std::fs::read_to_string(&report).unwrap();
    assert!(html.contains(CAR_FINGERPRINT));
    assert!(html.contains("creep: alternate between +1m/s^2 and -1m/s^2"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&traces).unwrap()).unwrap();
    assert_eq!(json["runs"].as_array().map(Vec::len), Some(3));
}

#[tokio::test(start_paused = true)]
async fn brake_step_from_cruise_slows_the_vehicle() {
    let config = SimConfig {
        vehicle: PlantConfig {
            initial_speed: 8.94,
            cruise_set_speed: Some(8.94),
            ..Default::default()
        },
        ..Default::default()
    };
    let (_device, session) = sim_session(config);
    let maneuver = Maneuver::new("brake", SetupCondition::SteadyStateSpeed)
        .with_script(Script::accel_profile([(0.0, -1.0), (1.0, -1.0)]));
    let mut book = TraceBook::new();

    session.run(&[maneuver], &mut book).await.unwrap();

    let trace = &book.runs()[0].trace;
    let v_ego = trace.floats("carState.vEgo").unwrap();
    let a_ego = trace.floats("carState.aEgo").unwrap();
    assert!((v_ego[0] - 8.94).abs() < 0.05, "v0 = {}", v_ego[0]);
    assert!(v_ego[99] < v_ego[0] - 0.3);
    assert!(a_ego[99] < -0.8);
    assert!(trace
        .floats("carControl.actuators.accel")
        .unwrap()
        .iter()
        .all(|a| *a == -1.0));
}

#[tokio::test(start_paused = true)]
async fn vehicle_without_longitudinal_control_is_rejected() {
    let (device, session) = sim_session(SimConfig {
        longitudinal_control: false,
        ..Default::default()
    });
    let mut book = TraceBook::new();

    let err = session.run(&default_maneuvers(), &mut book).await.unwrap_err();

    assert!(matches!(err, SessionError::Fingerprint(_)));
    assert_eq!(
        device.mode_history(),
        vec![OperatingMode::Passive, OperatingMode::Disabled]
    );
    assert_eq!(device.accepted_commands(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_request_leaves_partial_report() {
    let (device, session) = sim_session(SimConfig::default());
    let (tx, rx) = watch::channel(false);
    let stop_at = 30;
    let maneuver = Maneuver::new("interrupted", SetupCondition::Stopped).with_script(
        Script::from_fn(move |tick| {
            if tick == stop_at {
                let _ = tx.send(true);
            }
            Script::idle().intent(tick, 0.01)
        }),
    );
    let session = session.with_stop_signal(rx);
    let mut book = TraceBook::new();

    let err = session.run(&[maneuver], &mut book).await.unwrap_err();

    assert!(matches!(err, SessionError::Maneuver { ref source, .. } if source.is_cancelled()));
    assert_eq!(device.mode(), OperatingMode::Disabled);
    let run = &book.runs()[0];
    assert_eq!(run.trace.len(), 31);
    assert!(matches!(run.status, RunStatus::Aborted { tick: Some(31), .. }));

    let html = ReportBuilder::default().render(&book);
    assert!(html.contains("Aborted at tick 31"));
}
