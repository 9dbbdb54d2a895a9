//! Control requests issued from threads other than the render context.

mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::{count, position, Call, Gate, Rig, RigOptions};
use tonecam_engine::{wake_channel, EngineError, EngineHandle, RenderThread};
use tonecam_types::{EngineConfig, EngineEvent, RecordingState, RenderLoopConfig, RenderStatus};

const WAIT: Duration = Duration::from_secs(5);

fn loop_config() -> RenderLoopConfig {
    RenderLoopConfig {
        refresh_interval_ms: 2,
        metrics_interval_ms: 20,
        ..RenderLoopConfig::default()
    }
}

/// Deliver frames until `done` holds or the deadline passes.
fn pump_until(handle: &EngineHandle, done: impl Fn(&EngineHandle) -> bool) {
    let deadline = Instant::now() + WAIT;
    while !done(handle) {
        assert!(Instant::now() < deadline, "condition not reached in time");
        handle.on_frame_available();
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_control_request_waits_for_in_flight_pass() {
    let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
    let (release_tx, release_rx) = crossbeam_channel::unbounded();
    let (waker, wake_rx) = wake_channel();

    let rig = Rig::with(RigOptions {
        waker: waker.clone(),
        gate: Some(Gate {
            entered: entered_tx,
            release: release_rx,
        }),
        ..RigOptions::default()
    });
    let Rig {
        log,
        handle,
        renderer,
        ..
    } = rig;
    let render = RenderThread::spawn(renderer, waker, wake_rx, (1080, 1920), loop_config())
        .expect("spawn render thread");

    // First pass creates the instance.
    handle.on_frame_available();
    entered_rx.recv_timeout(WAIT).expect("first pass");
    release_tx.send(()).unwrap();

    // Second pass is held inside the transform call.
    handle.on_frame_available();
    entered_rx.recv_timeout(WAIT).expect("second pass");

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let control = handle.clone();
    let control_log = log.clone();
    let requester = thread::spawn(move || {
        let result = control.start_recording("held.mp4", Duration::ZERO);
        control_log.lock().push(Call::Marker("start returned"));
        done_tx.send(result).unwrap();
    });

    assert!(
        done_rx.recv_timeout(Duration::from_millis(150)).is_err(),
        "start_recording returned while a pass was in flight"
    );

    release_tx.send(()).unwrap();
    done_rx
        .recv_timeout(WAIT)
        .expect("start acknowledged")
        .expect("start accepted");
    requester.join().unwrap();

    let rendered = log
        .lock()
        .iter()
        .rposition(|c| matches!(c, Call::Render { .. }))
        .unwrap();
    let returned = position(&log, |c| *c == Call::Marker("start returned")).unwrap();
    assert!(rendered < returned);
    assert_eq!(handle.recording_state(), RecordingState::Armed);

    // Unblock any later pass so teardown never waits on the gate.
    drop(release_tx);
    render.shutdown();

    assert_eq!(count(&log, |c| matches!(c, Call::Release(_))), 1);
    assert_eq!(handle.status(), RenderStatus::Paused);
}

#[test]
fn test_pause_from_control_thread_finalizes_then_releases() {
    let (waker, wake_rx) = wake_channel();
    let Rig {
        log,
        handle,
        renderer,
        events,
        ..
    } = Rig::with(RigOptions {
        waker: waker.clone(),
        ..RigOptions::default()
    });
    let render = RenderThread::spawn(renderer, waker, wake_rx, (1080, 1920), loop_config())
        .expect("spawn render thread");

    pump_until(&handle, |h| h.metrics().frames_presented >= 1);
    handle
        .start_recording("remote.mp4", Duration::ZERO)
        .expect("start accepted");
    pump_until(&handle, |h| h.metrics().frames_encoded >= 3);

    handle.pause().expect("pause acknowledged");

    // Everything the pause promised has happened by the time it returns.
    let closed = position(&log, |c| matches!(c, Call::EncoderClosed(_))).unwrap();
    let indexed = position(&log, |c| matches!(c, Call::Indexed(_))).unwrap();
    let released = position(&log, |c| matches!(c, Call::Release(_))).unwrap();
    assert!(closed < indexed && indexed < released);
    assert_eq!(handle.status(), RenderStatus::Paused);
    assert_eq!(handle.recording_state(), RecordingState::Idle);

    let presented = handle.metrics().frames_presented;
    handle.on_frame_available();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(handle.metrics().frames_presented, presented);

    render.shutdown();
    let stopped: Vec<_> = events
        .try_iter()
        .filter(|e| matches!(e, EngineEvent::RecordingStopped { .. }))
        .collect();
    assert_eq!(stopped.len(), 1);
}

#[test]
fn test_stop_from_many_threads_finalizes_once() {
    let (waker, wake_rx) = wake_channel();
    let Rig {
        log,
        handle,
        renderer,
        ..
    } = Rig::with(RigOptions {
        waker: waker.clone(),
        ..RigOptions::default()
    });
    let render = RenderThread::spawn(renderer, waker, wake_rx, (1080, 1920), loop_config())
        .expect("spawn render thread");

    pump_until(&handle, |h| h.metrics().frames_presented >= 1);
    handle.start_recording("race.mp4", Duration::ZERO).unwrap();
    pump_until(&handle, |h| h.metrics().frames_encoded >= 1);

    let stoppers: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            thread::spawn(move || handle.stop_recording())
        })
        .collect();
    let summaries = stoppers
        .into_iter()
        .map(|t| t.join().unwrap().expect("stop acknowledged"))
        .filter(Option::is_some)
        .count();

    assert_eq!(summaries, 1);
    assert_eq!(count(&log, |c| matches!(c, Call::Indexed(_))), 1);
    render.shutdown();
}

#[test]
fn test_unserved_request_times_out() {
    let rig = Rig::new();
    let Rig {
        handle,
        mut renderer,
        ..
    } = rig;

    let err = handle.pause_timeout(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, EngineError::AckTimeout(_)));
    assert!(err.is_unconfirmed());

    // The request still runs once the render context catches up.
    assert_eq!(renderer.run_pending_tasks(), 1);
    assert_eq!(handle.status(), RenderStatus::Paused);
}

#[test]
fn test_request_after_render_context_dropped() {
    let Rig {
        handle, renderer, ..
    } = Rig::new();
    drop(renderer);

    let err = handle.stop_recording().unwrap_err();
    assert!(matches!(err, EngineError::RenderContextGone));
    assert!(err.is_unconfirmed());
}

#[test]
fn test_queued_request_abandoned_by_render_context() {
    let Rig {
        handle, renderer, ..
    } = Rig::new();

    let waiting = handle.clone();
    let requester = thread::spawn(move || waiting.pause());
    thread::sleep(Duration::from_millis(50));
    drop(renderer);

    let err = requester.join().unwrap().unwrap_err();
    assert!(matches!(err, EngineError::RenderContextGone));
}

#[test]
fn test_render_thread_end_to_end() {
    let (waker, wake_rx) = wake_channel();
    let Rig {
        log,
        handle,
        renderer,
        events,
        live_instances,
        ..
    } = Rig::with(RigOptions {
        config: EngineConfig::default(),
        waker: waker.clone(),
        ..RigOptions::default()
    });
    let render = RenderThread::spawn(renderer, waker, wake_rx, (1080, 1920), loop_config())
        .expect("spawn render thread");
    assert!(render.is_running());

    let camera = {
        let handle = handle.clone();
        thread::spawn(move || {
            for _ in 0..40 {
                handle.on_frame_available();
                thread::sleep(Duration::from_millis(3));
            }
        })
    };
    camera.join().unwrap();
    pump_until(&handle, |h| h.metrics().frames_presented >= 10);
    thread::sleep(Duration::from_millis(40));

    render.shutdown();

    let metrics = handle.metrics();
    assert!(metrics.frames_presented >= 10);
    assert!(metrics.fps > 0.0);
    assert_eq!(metrics.instances_created, 1);
    assert_eq!(live_instances.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(count(&log, |c| matches!(c, Call::Release(_))), 1);
    assert!(events
        .try_iter()
        .any(|e| matches!(e, EngineEvent::Metrics(_))));
}
