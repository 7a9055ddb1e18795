//! End-to-end lifecycle scenarios against fake collaborators.
//!
//! Time is paused, so probe intervals and shutdown grace periods elapse
//! instantly and deterministically.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeBackend, FakeWindowHost, RecordingEmitter, SIGINT, SIGKILL, ScriptedProbe};
use stitch_core::{
    BackendPort, CoordinatorPhase, LifecycleError, LifecycleEvent, PollerState, ShutdownCause,
    WindowError,
};
use stitch_runtime::{CoordinatorConfig, LifecycleCoordinator, ReadinessPoller, ReadinessPolicy};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn policy() -> ReadinessPolicy {
    ReadinessPolicy::fixed(Duration::from_millis(500), Duration::from_secs(2))
}

struct Harness<B> {
    coordinator: LifecycleCoordinator<B>,
    host: Arc<FakeWindowHost>,
    events: Arc<RecordingEmitter>,
    poller_state: tokio::sync::watch::Receiver<PollerState>,
}

fn harness<B: BackendPort>(
    backend: B,
    probe: Arc<ScriptedProbe>,
    host: FakeWindowHost,
    readiness: ReadinessPolicy,
    cancel: CancellationToken,
) -> Harness<B> {
    let host = Arc::new(host);
    let events = Arc::new(RecordingEmitter::default());
    let poller = ReadinessPoller::new(probe, readiness).with_emitter(events.clone());
    let poller_state = poller.watch_state();
    let coordinator = LifecycleCoordinator::new(
        CoordinatorConfig::default(),
        backend,
        poller,
        host.clone(),
        events.clone(),
    )
    .with_cancel_token(cancel);
    Harness {
        coordinator,
        host,
        events,
        poller_state,
    }
}

fn phases(events: &RecordingEmitter) -> Vec<CoordinatorPhase> {
    events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            LifecycleEvent::PhaseChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn unreachable_backend_cancelled_after_three_probes() {
    let cancel = CancellationToken::new();
    let probe = Arc::new(ScriptedProbe::never_ready().cancelling(3, cancel.clone()));
    let (backend, control) = FakeBackend::new();
    let h = harness(backend, probe.clone(), FakeWindowHost::default(), policy(), cancel);

    let summary = assert_ok!(h.coordinator.run().await);

    assert_eq!(summary.cause, ShutdownCause::Cancelled);
    assert_eq!(summary.probe_attempts, 3);
    assert!(!summary.window_opened);
    assert_eq!(probe.calls(), 3);
    assert_eq!(*h.poller_state.borrow(), PollerState::Cancelled);
    assert_eq!(h.host.open_count(), 0);
    assert_eq!(control.calls.terminates(), 1);
    assert_eq!(summary.exit.signal, Some(SIGINT));
    assert_eq!(
        phases(&h.events),
        vec![
            CoordinatorPhase::WaitingForReady,
            CoordinatorPhase::ShuttingDown,
            CoordinatorPhase::Stopped,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn window_close_terminates_backend_once() {
    let probe = Arc::new(ScriptedProbe::ready_on(1));
    let (backend, control) = FakeBackend::new();
    let h = harness(
        backend,
        probe,
        FakeWindowHost::default(),
        policy(),
        CancellationToken::new(),
    );
    let mut phase = h.coordinator.phase();
    let host = h.host.clone();

    let run = tokio::spawn(h.coordinator.run());
    phase
        .wait_for(|p| *p == CoordinatorPhase::WindowOpen)
        .await
        .unwrap();
    assert_eq!(control.calls.terminates(), 0);
    host.close_by_user();

    let summary = assert_ok!(run.await.unwrap());
    assert_eq!(summary.cause, ShutdownCause::WindowClosed);
    assert!(summary.window_opened);
    assert!(!summary.forced_kill);
    assert!(summary.exit.requested);
    assert_eq!(summary.probe_attempts, 1);
    assert_eq!(control.calls.terminates(), 1);
    assert_eq!(control.calls.kills(), 0);
    // The window is already gone, nothing left for the host to close
    assert!(host.close_calls().is_empty());

    let opened = host.opened.lock().unwrap().clone();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].url, "http://localhost:5000");
    assert_eq!((opened[0].width, opened[0].height), (800, 600));

    assert_eq!(
        phases(&h.events),
        vec![
            CoordinatorPhase::WaitingForReady,
            CoordinatorPhase::WindowOpen,
            CoordinatorPhase::ShuttingDown,
            CoordinatorPhase::Stopped,
        ]
    );
    assert_eq!(h.events.count(LifecycleEvent::is_terminal), 1);
}

#[tokio::test(start_paused = true)]
async fn crash_while_window_open_is_surfaced() {
    let probe = Arc::new(ScriptedProbe::ready_on(2));
    let (backend, control) = FakeBackend::new();
    let h = harness(
        backend,
        probe.clone(),
        FakeWindowHost::default(),
        policy(),
        CancellationToken::new(),
    );
    let mut phase = h.coordinator.phase();
    let host = h.host.clone();

    let run = tokio::spawn(h.coordinator.run());
    phase
        .wait_for(|p| *p == CoordinatorPhase::WindowOpen)
        .await
        .unwrap();
    control.crash(1);

    let err = assert_err!(run.await.unwrap());
    assert_eq!(err.exit_code(), 1);
    match err {
        LifecycleError::BackendCrashed { exit } => {
            assert_eq!(exit.code, Some(1));
            assert!(exit.is_crash());
        }
        other => panic!("expected BackendCrashed, got {other:?}"),
    }

    // Termination is still requested exactly once; it is a no-op on a dead child
    assert_eq!(control.calls.terminates(), 1);
    assert_eq!(control.calls.kills(), 0);
    assert_eq!(host.close_calls(), vec!["main".to_string()]);
    assert_eq!(probe.calls(), 2);
    assert_eq!(host.open_count(), 1);
    assert_eq!(
        h.events
            .count(|e| matches!(e, LifecycleEvent::BackendCrashed { .. })),
        1
    );

    let events = h.events.events();
    let ready = events
        .iter()
        .position(|e| matches!(e, LifecycleEvent::BackendReady { attempts: 2, .. }))
        .expect("ready event");
    let opened = events
        .iter()
        .position(|e| matches!(e, LifecycleEvent::WindowOpened { .. }))
        .expect("window opened event");
    assert!(ready < opened, "window opens only after readiness");
}

#[tokio::test(start_paused = true)]
async fn crash_before_ready_stops_polling() {
    let probe = Arc::new(ScriptedProbe::never_ready());
    let (backend, control) = FakeBackend::new();
    let h = harness(
        backend,
        probe.clone(),
        FakeWindowHost::default(),
        policy(),
        CancellationToken::new(),
    );

    let run = tokio::spawn(h.coordinator.run());
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    control.crash(2);

    assert!(matches!(
        run.await.unwrap(),
        Err(LifecycleError::BackendCrashed { .. })
    ));
    let calls = probe.calls();
    assert_eq!(*h.poller_state.borrow(), PollerState::Cancelled);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(probe.calls(), calls, "no probes after shutdown");
    assert_eq!(h.host.open_count(), 0);
    assert_eq!(control.calls.terminates(), 1);
    assert_eq!(
        phases(&h.events),
        vec![
            CoordinatorPhase::WaitingForReady,
            CoordinatorPhase::ShuttingDown,
            CoordinatorPhase::Stopped,
        ]
    );
    assert_eq!(
        h.events.count(|e| matches!(
            e,
            LifecycleEvent::BackendCrashed { exit } if exit.code == Some(2)
        )),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn ignored_interrupt_escalates_to_kill() {
    let probe = Arc::new(ScriptedProbe::ready_on(1));
    let (backend, control) = FakeBackend::ignoring_interrupt();
    let h = harness(
        backend,
        probe,
        FakeWindowHost::default(),
        policy(),
        CancellationToken::new(),
    );
    let mut phase = h.coordinator.phase();
    let host = h.host.clone();

    let run = tokio::spawn(h.coordinator.run());
    phase
        .wait_for(|p| *p == CoordinatorPhase::WindowOpen)
        .await
        .unwrap();
    host.close_by_user();

    let summary = assert_ok!(run.await.unwrap());
    assert!(summary.forced_kill);
    assert_eq!(summary.exit.signal, Some(SIGKILL));
    assert_eq!(control.calls.terminates(), 1);
    assert_eq!(control.calls.kills(), 1);
    assert_eq!(
        h.events.count(|e| matches!(
            e,
            LifecycleEvent::TerminationTimeout { grace_ms: 5_000 }
        )),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn spawn_failure_stops_without_polling() {
    let probe = Arc::new(ScriptedProbe::ready_on(1));
    let (backend, control) = FakeBackend::failing_spawn();
    let h = harness(
        backend,
        probe.clone(),
        FakeWindowHost::default(),
        policy(),
        CancellationToken::new(),
    );
    let phase = h.coordinator.phase();

    let err = assert_err!(h.coordinator.run().await);
    assert!(matches!(err, LifecycleError::Spawn(_)));
    assert_eq!(err.exit_code(), 71);
    assert_eq!(*phase.borrow(), CoordinatorPhase::Stopped);
    assert_eq!(probe.calls(), 0);
    assert_eq!(control.calls.terminates(), 0);
    assert_eq!(h.host.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn readiness_deadline_shuts_down() {
    let probe = Arc::new(ScriptedProbe::never_ready());
    let (backend, control) = FakeBackend::new();
    let h = harness(
        backend,
        probe,
        FakeWindowHost::default(),
        policy().with_max_wait(Duration::from_secs(3)),
        CancellationToken::new(),
    );

    let err = assert_err!(h.coordinator.run().await);
    match err {
        LifecycleError::ReadinessExpired { waited_ms } => assert_eq!(waited_ms, 3_000),
        other => panic!("expected ReadinessExpired, got {other:?}"),
    }
    assert_eq!(*h.poller_state.borrow(), PollerState::Expired);
    assert_eq!(control.calls.terminates(), 1);
    assert_eq!(h.host.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn window_failure_terminates_backend() {
    let probe = Arc::new(ScriptedProbe::ready_on(1));
    let (backend, control) = FakeBackend::new();
    let h = harness(
        backend,
        probe,
        FakeWindowHost::failing(),
        policy(),
        CancellationToken::new(),
    );

    let err = assert_err!(h.coordinator.run().await);
    assert!(matches!(err, LifecycleError::Window(WindowError::Open(ref msg)) if msg == "no display"));
    assert_eq!(control.calls.terminates(), 1);
    assert!(
        !phases(&h.events).contains(&CoordinatorPhase::WindowOpen),
        "window phase requires a presented window"
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_while_window_open_closes_window() {
    let cancel = CancellationToken::new();
    let probe = Arc::new(ScriptedProbe::ready_on(1));
    let (backend, control) = FakeBackend::new();
    let h = harness(
        backend,
        probe,
        FakeWindowHost::default(),
        policy(),
        cancel.clone(),
    );
    let mut phase = h.coordinator.phase();
    let host = h.host.clone();

    let run = tokio::spawn(h.coordinator.run());
    phase
        .wait_for(|p| *p == CoordinatorPhase::WindowOpen)
        .await
        .unwrap();
    cancel.cancel();

    let summary = assert_ok!(run.await.unwrap());
    assert_eq!(summary.cause, ShutdownCause::Cancelled);
    assert_eq!(host.close_calls(), vec!["main".to_string()]);
    assert_eq!(control.calls.terminates(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_confirmed_exit_after_kill() {
    let probe = Arc::new(ScriptedProbe::ready_on(1));
    let (backend, control) = FakeBackend::unkillable();
    let h = harness(
        backend,
        probe,
        FakeWindowHost::default(),
        policy(),
        CancellationToken::new(),
    );
    let mut phase = h.coordinator.phase();
    let host = h.host.clone();

    let mut run = tokio::spawn(h.coordinator.run());
    phase
        .wait_for(|p| *p == CoordinatorPhase::WindowOpen)
        .await
        .unwrap();
    host.close_by_user();

    // Far beyond grace plus the kill: still shutting down
    assert!(
        tokio::time::timeout(Duration::from_secs(60), &mut run)
            .await
            .is_err()
    );
    assert_eq!(control.calls.kills(), 1);
    assert_eq!(*phase.borrow(), CoordinatorPhase::ShuttingDown);
    assert_eq!(h.events.count(LifecycleEvent::is_terminal), 0);

    control.confirm_exit(SIGKILL);
    let summary = assert_ok!(run.await.unwrap());
    assert!(summary.forced_kill);
    assert_eq!(summary.exit.signal, Some(SIGKILL));
    assert_eq!(*phase.borrow(), CoordinatorPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn close_racing_cancel_is_reported_as_close() {
    let cancel = CancellationToken::new();
    let probe = Arc::new(ScriptedProbe::ready_on(1));
    let (backend, control) = FakeBackend::new();
    let h = harness(
        backend,
        probe,
        FakeWindowHost::default(),
        policy(),
        cancel.clone(),
    );
    let mut phase = h.coordinator.phase();
    let host = h.host.clone();

    let run = tokio::spawn(h.coordinator.run());
    phase
        .wait_for(|p| *p == CoordinatorPhase::WindowOpen)
        .await
        .unwrap();
    // Desktop shells request exit right after the last window is destroyed
    host.close_by_user();
    cancel.cancel();

    let summary = assert_ok!(run.await.unwrap());
    assert_eq!(summary.cause, ShutdownCause::WindowClosed);
    assert_eq!(h.events.count(|e| *e == LifecycleEvent::WindowClosed), 1);
    assert!(host.close_calls().is_empty());
    assert_eq!(control.calls.terminates(), 1);
}

#[tokio::test(start_paused = true)]
async fn hung_window_close_does_not_delay_termination() {
    let cancel = CancellationToken::new();
    let probe = Arc::new(ScriptedProbe::ready_on(1));
    let (backend, control) = FakeBackend::new();
    let h = harness(
        backend,
        probe,
        FakeWindowHost::hanging_close(),
        policy(),
        cancel.clone(),
    );
    let mut phase = h.coordinator.phase();
    let host = h.host.clone();

    let run = tokio::spawn(h.coordinator.run());
    phase
        .wait_for(|p| *p == CoordinatorPhase::WindowOpen)
        .await
        .unwrap();
    cancel.cancel();

    phase
        .wait_for(|p| *p == CoordinatorPhase::ShuttingDown)
        .await
        .unwrap();
    tokio::task::yield_now().await;
    assert_eq!(control.calls.terminates(), 1);
    assert_eq!(host.close_calls(), vec!["main".to_string()]);

    let summary = assert_ok!(run.await.unwrap());
    assert_eq!(summary.cause, ShutdownCause::Cancelled);
    assert_eq!(summary.exit.signal, Some(SIGINT));
    assert!(!summary.forced_kill);
    assert_eq!(control.calls.kills(), 0);
}

#[cfg(unix)]
mod real_process {
    use super::*;
    use stitch_core::LaunchSpec;
    use stitch_runtime::{BackendProcess, HttpReadinessProbe};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer every connection with an empty 200.
    async fn serve(listener: TcpListener) {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            });
        }
    }

    #[tokio::test]
    async fn sleeping_backend_is_interrupted_on_window_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}/", listener.local_addr().unwrap());
        tokio::spawn(serve(listener));

        let mut config = CoordinatorConfig::default();
        config.launch = LaunchSpec::new("sleep").arg("30");
        config.address.clone_from(&address);
        config.window.url.clone_from(&address);

        let host = Arc::new(FakeWindowHost::default());
        let probe = HttpReadinessProbe::new(Duration::from_secs(2)).unwrap();
        let poller = ReadinessPoller::new(
            Arc::new(probe),
            ReadinessPolicy::fixed(Duration::from_millis(50), Duration::from_secs(2)),
        );
        let coordinator = LifecycleCoordinator::new(
            config,
            BackendProcess::new(),
            poller,
            host.clone(),
            Arc::new(RecordingEmitter::default()),
        );
        let mut phase = coordinator.phase();

        let run = tokio::spawn(coordinator.run());
        tokio::time::timeout(
            Duration::from_secs(10),
            phase.wait_for(|p| *p == CoordinatorPhase::WindowOpen),
        )
        .await
        .expect("window should open")
        .unwrap();
        host.close_by_user();

        let summary = assert_ok!(run.await.unwrap());
        assert_eq!(summary.exit.signal, Some(SIGINT));
        assert!(summary.exit.requested);
        assert!(!summary.forced_kill);
    }
}
