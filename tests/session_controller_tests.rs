use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time;

use mindful_lib::soundscape::SoundscapeCommand;
use mindful_lib::{
    BreathingPattern, ChannelSoundscape, ClockConfig, ConfigError, HistoryRecorder, PhaseKind,
    SessionConfig, SessionController, SessionError, SessionObserver, SessionOptions,
    SessionOutcome, SessionSnapshot, SessionState, SoundscapeId,
};

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    State(SessionState, u32),
    Progress(u32),
    Completed(SessionSnapshot),
    Cancelled(SessionSnapshot),
    Error(SessionError),
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Seen>>,
}

impl Recorder {
    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn progress(&self) -> Vec<u32> {
        self.seen()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::Progress(elapsed) => Some(elapsed),
                _ => None,
            })
            .collect()
    }

    fn completions(&self) -> Vec<SessionSnapshot> {
        self.seen()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::Completed(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect()
    }

    fn cancellations(&self) -> Vec<SessionSnapshot> {
        self.seen()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::Cancelled(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect()
    }
}

impl SessionObserver for Recorder {
    fn on_state_changed(&self, snapshot: SessionSnapshot) {
        self.seen
            .lock()
            .unwrap()
            .push(Seen::State(snapshot.state, snapshot.progress.elapsed_secs));
    }

    fn on_progress(&self, snapshot: SessionSnapshot) {
        self.seen
            .lock()
            .unwrap()
            .push(Seen::Progress(snapshot.progress.elapsed_secs));
    }

    fn on_completed(&self, snapshot: SessionSnapshot) {
        self.seen.lock().unwrap().push(Seen::Completed(snapshot));
    }

    fn on_cancelled(&self, snapshot: SessionSnapshot) {
        self.seen.lock().unwrap().push(Seen::Cancelled(snapshot));
    }

    fn on_error(&self, error: SessionError) {
        self.seen.lock().unwrap().push(Seen::Error(error));
    }
}

fn calm_session(target_secs: u32) -> SessionConfig {
    SessionConfig::new(target_secs, BreathingPattern::calm(), SoundscapeId::default())
}

fn controller_with_recorder(target_secs: u32) -> (SessionController, Arc<Recorder>) {
    let controller = SessionController::new(calm_session(target_secs)).unwrap();
    let recorder = Arc::new(Recorder::default());
    controller.subscribe(recorder.clone()).detach();
    (controller, recorder)
}

#[tokio::test(start_paused = true)]
async fn test_two_minute_session_completes_at_tick_120() {
    let (controller, recorder) = controller_with_recorder(120);
    controller.start().unwrap();

    time::sleep(Duration::from_millis(119_500)).await;
    assert_eq!(controller.state(), SessionState::Running);
    assert!(recorder.completions().is_empty());

    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(controller.state(), SessionState::Completed);

    let completions = recorder.completions();
    assert_eq!(completions.len(), 1);
    let final_snapshot = completions[0];
    assert_eq!(final_snapshot.progress.elapsed_secs, 120);
    assert_eq!(final_snapshot.progress.cycle_index, 10);
    assert_eq!(final_snapshot.remaining_secs, 0);

    let progress = recorder.progress();
    assert_eq!(progress.len(), 119);
    assert!(progress.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(controller.snapshot().progress.elapsed_secs, 120);
}

#[tokio::test(start_paused = true)]
async fn test_start_goes_to_running_exactly_once() {
    let (controller, recorder) = controller_with_recorder(3);
    controller.start().unwrap();
    assert_eq!(controller.state(), SessionState::Running);
    assert_eq!(
        controller.start(),
        Err(SessionError::SessionAlreadyStarted)
    );

    time::sleep(Duration::from_secs(5)).await;
    let seen = recorder.seen();
    assert_eq!(seen[0], Seen::State(SessionState::Running, 0));
    assert_eq!(
        seen.iter()
            .filter(|s| matches!(s, Seen::State(SessionState::Running, _)))
            .count(),
        1
    );
    assert_eq!(seen[1], Seen::Progress(1));
    assert!(matches!(seen.last(), Some(Seen::Completed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_at_thirty_seconds() {
    let (controller, recorder) = controller_with_recorder(300);
    controller.start().unwrap();

    time::sleep(Duration::from_millis(30_500)).await;
    controller.cancel();
    assert_eq!(controller.state(), SessionState::Cancelled);

    let cancellations = recorder.cancellations();
    assert_eq!(cancellations.len(), 1);
    assert_eq!(cancellations[0].progress.elapsed_secs, 30);

    controller.resume();
    controller.pause();
    controller.cancel();
    assert_eq!(controller.state(), SessionState::Cancelled);
    assert_eq!(controller.start(), Err(SessionError::SessionAlreadyFinished));

    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(controller.snapshot().progress.elapsed_secs, 30);
    assert_eq!(recorder.cancellations().len(), 1);
    assert!(matches!(recorder.seen().last(), Some(Seen::Cancelled(_))));
}

#[tokio::test(start_paused = true)]
async fn test_pause_freezes_progress_and_resume_continues() {
    let (controller, recorder) = controller_with_recorder(300);
    controller.start().unwrap();

    time::sleep(Duration::from_millis(45_500)).await;
    controller.pause();
    let paused = controller.snapshot();
    assert_eq!(paused.state, SessionState::Paused);
    assert_eq!(paused.progress.elapsed_secs, 45);
    assert_eq!(paused.progress.phase, PhaseKind::Exhale);
    assert_eq!(paused.progress.phase_elapsed_secs, 3);
    assert_eq!(paused.progress.cycle_index, 3);

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(controller.snapshot().progress, paused.progress);

    controller.resume();
    let resumed = controller.snapshot();
    assert_eq!(resumed.state, SessionState::Running);
    assert_eq!(resumed.progress, paused.progress);

    // Half a second of the interrupted tick carries over.
    time::sleep(Duration::from_millis(600)).await;
    assert_eq!(controller.snapshot().progress.elapsed_secs, 46);
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(controller.snapshot().progress.elapsed_secs, 47);

    let progress = recorder.progress();
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(recorder
        .seen()
        .contains(&Seen::State(SessionState::Paused, 45)));
    assert!(recorder
        .seen()
        .contains(&Seen::State(SessionState::Running, 45)));
    controller.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_paused_keeps_frozen_progress() {
    let (controller, recorder) = controller_with_recorder(300);
    controller.start().unwrap();

    time::sleep(Duration::from_millis(20_500)).await;
    controller.pause();
    time::sleep(Duration::from_secs(30)).await;
    controller.cancel();

    assert_eq!(controller.state(), SessionState::Cancelled);
    let cancellations = recorder.cancellations();
    assert_eq!(cancellations.len(), 1);
    assert_eq!(cancellations[0].state, SessionState::Cancelled);
    assert_eq!(cancellations[0].progress.elapsed_secs, 20);

    let events_at_cancel = recorder.seen().len();
    controller.resume();
    time::sleep(Duration::from_secs(10)).await;

    assert_eq!(controller.state(), SessionState::Cancelled);
    assert_eq!(controller.snapshot().progress.elapsed_secs, 20);
    assert_eq!(recorder.seen().len(), events_at_cancel);
    assert_eq!(recorder.progress().last(), Some(&20));
}

#[tokio::test(start_paused = true)]
async fn test_redundant_commands_are_noops() {
    let (controller, recorder) = controller_with_recorder(60);
    controller.pause();
    controller.resume();
    assert_eq!(controller.state(), SessionState::Idle);

    controller.start().unwrap();
    controller.resume();
    controller.pause();
    controller.pause();
    assert_eq!(controller.state(), SessionState::Paused);

    let paused_events = recorder
        .seen()
        .into_iter()
        .filter(|s| matches!(s, Seen::State(SessionState::Paused, _)))
        .count();
    assert_eq!(paused_events, 1);
    controller.cancel();
}

#[test]
fn test_zero_duration_fails_with_invalid_config() {
    let err = SessionController::new(calm_session(0)).err().unwrap();
    assert_eq!(err, SessionError::InvalidConfig(ConfigError::ZeroDuration));

    let pattern = BreathingPattern::from_pairs(&[(PhaseKind::Inhale, 0)]);
    assert_eq!(pattern, Err(ConfigError::ZeroLengthCycle));
}

struct PauseOnTen {
    controller: Mutex<Option<SessionController>>,
}

impl SessionObserver for PauseOnTen {
    fn on_progress(&self, snapshot: SessionSnapshot) {
        if snapshot.progress.elapsed_secs == 10 {
            if let Some(controller) = self.controller.lock().unwrap().as_ref() {
                controller.pause();
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_observer_may_command_from_callback() {
    let (controller, recorder) = controller_with_recorder(60);
    let pauser = Arc::new(PauseOnTen {
        controller: Mutex::new(Some(controller.clone())),
    });
    controller.subscribe(pauser.clone()).detach();

    controller.start().unwrap();
    time::sleep(Duration::from_secs(20)).await;

    assert_eq!(controller.state(), SessionState::Paused);
    assert_eq!(controller.snapshot().progress.elapsed_secs, 10);
    let seen = recorder.seen();
    let progress_10 = seen.iter().position(|s| *s == Seen::Progress(10)).unwrap();
    assert_eq!(seen[progress_10 + 1], Seen::State(SessionState::Paused, 10));

    pauser.controller.lock().unwrap().take();
    controller.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_unit_secs_and_history() {
    let controller = SessionController::with_options(
        calm_session(12),
        SessionOptions {
            clock: ClockConfig {
                period: Duration::from_secs(1),
                unit_secs: 5,
            },
            ..SessionOptions::default()
        },
    )
    .unwrap();
    let history = Arc::new(HistoryRecorder::new());
    let _subscription = controller.subscribe(history.clone());

    controller.start().unwrap();
    time::sleep(Duration::from_millis(3_500)).await;

    assert_eq!(controller.state(), SessionState::Completed);
    let records = history.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, SessionOutcome::Completed);
    assert_eq!(records[0].elapsed_secs, 12);
    assert_eq!(records[0].cycles, 1);
    assert_eq!(history.total_mindful_secs(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_soundscape_follows_lifecycle() {
    let (soundscape, rx) = ChannelSoundscape::new();
    let controller = SessionController::with_options(
        SessionConfig::new(4, BreathingPattern::coherent(), SoundscapeId::from("rain")),
        SessionOptions {
            soundscape: Arc::new(soundscape),
            ..SessionOptions::default()
        },
    )
    .unwrap();

    controller.start().unwrap();
    time::sleep(Duration::from_millis(1_500)).await;
    controller.pause();
    controller.resume();
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.state(), SessionState::Completed);

    let commands: Vec<_> = rx.try_iter().collect();
    assert_eq!(
        commands,
        vec![
            SoundscapeCommand::Play(SoundscapeId::from("rain")),
            SoundscapeCommand::Pause,
            SoundscapeCommand::Resume,
            SoundscapeCommand::Stop,
        ]
    );
}

#[test]
fn test_missing_runtime_aborts_with_error_then_cancel() {
    let (controller, recorder) = controller_with_recorder(60);
    controller.start().unwrap();

    let seen = recorder.seen();
    assert_eq!(seen[0], Seen::State(SessionState::Running, 0));
    assert_eq!(
        seen[1],
        Seen::Error(SessionError::SessionAborted(mindful_lib::ClockError::Unavailable))
    );
    assert!(matches!(seen[2], Seen::Cancelled(_)));
    assert_eq!(controller.state(), SessionState::Cancelled);
}
