use std::sync::{Arc, Mutex};

use tallypad_core::{
    format_hms, ManualClock, SessionObserver, SessionTimer, SharedSessionTimer, TimerAction,
    TimerError, TimerEvent,
};

#[derive(Default)]
struct SessionLog {
    started: usize,
    stopped: Vec<u64>,
}

#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<SessionLog>>);

impl SessionObserver for SharedLog {
    fn on_session_started(&mut self) {
        self.0.lock().unwrap().started += 1;
    }

    fn on_session_stopped(&mut self, duration_seconds: u64) {
        self.0.lock().unwrap().stopped.push(duration_seconds);
    }
}

fn shared_timer(clock: &ManualClock) -> (SharedSessionTimer<ManualClock>, SharedLog) {
    let log = SharedLog::default();
    let mut timer = SessionTimer::new(clock.clone());
    timer.set_observer(log.clone());
    (SharedSessionTimer::new(timer), log)
}

#[test]
fn confirmed_session_with_a_pause_reports_active_time_only() {
    let clock = ManualClock::new(0);
    let (shared, log) = shared_timer(&clock);

    {
        let mut timer = shared.lock();
        let request = timer.request(TimerAction::Start).unwrap();
        timer.commit(request).unwrap();
    }

    clock.advance(10_000);
    shared.lock().pause().unwrap();
    clock.advance(5_000);
    shared.lock().resume().unwrap();
    clock.advance(5_000);

    // A display refresh only re-reads the clock, it never advances state.
    let display = format_hms(shared.lock().elapsed_seconds());
    assert_eq!(display, "00:00:15");
    assert_eq!(format_hms(shared.lock().elapsed_seconds()), "00:00:15");

    let event = {
        let mut timer = shared.lock();
        let request = timer.request(TimerAction::Stop).unwrap();
        timer.commit(request).unwrap()
    };
    assert_eq!(
        event,
        TimerEvent::Stopped {
            duration_seconds: 15
        }
    );

    let seen = log.0.lock().unwrap();
    assert_eq!(seen.started, 1);
    assert_eq!(seen.stopped, vec![15]);
}

#[test]
fn parent_handle_tears_down_a_session_awaiting_confirmation() {
    let clock = ManualClock::new(0);
    let (shared, log) = shared_timer(&clock);
    let handle = shared.handle();

    {
        let mut timer = shared.lock();
        let request = timer.request(TimerAction::Start).unwrap();
        timer.commit(request).unwrap();
    }
    clock.advance(90_000);

    // The screen has asked the user to confirm a stop, but the parent
    // navigates away first.
    let pending = shared.lock().request(TimerAction::Stop).unwrap();
    assert!(handle.is_active());
    assert_eq!(handle.force_stop(), Some(90));
    assert!(!handle.is_active());

    // The orphaned confirmation can no longer do anything.
    assert_eq!(
        shared.lock().commit(pending).unwrap_err(),
        TimerError::StaleRequest
    );
    assert_eq!(log.0.lock().unwrap().stopped, vec![90]);
}

#[test]
fn back_to_back_sessions_report_each_boundary() {
    let clock = ManualClock::new(0);
    let (shared, log) = shared_timer(&clock);

    {
        let mut timer = shared.lock();
        let request = timer.request(TimerAction::Start).unwrap();
        timer.commit(request).unwrap();
    }
    clock.advance(3_000);
    assert_eq!(shared.lock().force_stop(), Some(3));

    {
        let mut timer = shared.lock();
        let request = timer.request(TimerAction::Start).unwrap();
        timer.commit(request).unwrap();
    }
    assert_eq!(shared.lock().force_stop(), Some(0));

    let seen = log.0.lock().unwrap();
    assert_eq!(seen.started, 2);
    assert_eq!(seen.stopped, vec![3, 0]);
}
