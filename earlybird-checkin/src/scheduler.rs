use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use earlybird_core::{CheckinWindow, FailureSeverity, Notifier, TransportError};
use earlybird_shared::{CheckinEvent, Leg, Reservation, DISPLAY_TIME_FORMAT};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{CheckinTask, TaskReport, TaskStatus};
use crate::navigator::{AttemptOutcome, CheckinAttempt, SoftFailure};

/// Longest single sleep of the dispatch loop. Tokio's timer stops while the host is
/// suspended, so long waits are re-measured against the clock at least this often.
const MAX_NAP: Duration = Duration::from_secs(60);

/// Source of "now" for trigger times.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Check in aborted: {0}")]
    Hard(#[source] TransportError),
    #[error("Reservation has no flight for {0:?}")]
    UnknownLeg(Leg),
}

/// Result of handing a flight to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    Scheduled { task_id: Uuid, trigger_at: DateTime<Utc> },
    /// The check-in window opened before now.
    Skipped { trigger_at: DateTime<Utc> },
}

#[derive(Debug)]
enum Command {
    Cancel(Uuid),
    Shutdown,
}

/// Cancels pending work from outside the dispatch loop.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Drop a pending flight. No effect once its check-in has finished.
    pub fn cancel(&self, task_id: Uuid) {
        let _ = self.commands.send(Command::Cancel(task_id));
    }

    /// Cancel everything still pending and stop the loop.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// Heap entries order by deadline, then by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Deadline {
    trigger_at: DateTime<Utc>,
    sequence: u64,
    task_id: Uuid,
}

/// Runs check-in attempts one at a time, earliest trigger time first, and re-queues
/// soft failures until the window's attempt budget is spent.
pub struct RetryScheduler {
    window: CheckinWindow,
    attempt_timeout: Duration,
    checkin: Arc<dyn CheckinAttempt>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    queue: BinaryHeap<Reverse<Deadline>>,
    pending: HashMap<Uuid, CheckinTask>,
    finished: Vec<TaskReport>,
    sequence: u64,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl RetryScheduler {
    pub fn new(
        window: CheckinWindow,
        attempt_timeout: Duration,
        checkin: Arc<dyn CheckinAttempt>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            window,
            attempt_timeout,
            checkin,
            notifier,
            clock,
            queue: BinaryHeap::new(),
            pending: HashMap::new(),
            finished: Vec::new(),
            sequence: 0,
            commands: rx,
        };
        (scheduler, SchedulerHandle { commands: tx })
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue the first check-in attempt for one flight of `reservation`, or skip it when
    /// its window has already opened.
    pub async fn schedule(
        &mut self,
        reservation: Arc<Reservation>,
        leg: Leg,
    ) -> Result<ScheduleDecision, SchedulerError> {
        let flight = reservation.flight(leg).ok_or(SchedulerError::UnknownLeg(leg))?;
        let trigger_at = self.window.trigger_for(&flight.departs_at);
        let flight_info = reservation.single_flight_message(leg);

        if trigger_at < self.clock.now() {
            info!(
                confirmation = %reservation.confirmation,
                flight = flight.number,
                trigger_at = %trigger_at.format(DISPLAY_TIME_FORMAT),
                "Check in window already open, flight not scheduled"
            );
            self.notifier
                .notify(&CheckinEvent::FlightSkipped { flight_info, trigger_at })
                .await;
            return Ok(ScheduleDecision::Skipped { trigger_at });
        }

        let task = CheckinTask::new(Arc::clone(&reservation), leg, trigger_at);
        let task_id = task.id;
        info!(
            confirmation = %reservation.confirmation,
            flight = flight.number,
            task_id = %task_id,
            trigger_at = %trigger_at.format(DISPLAY_TIME_FORMAT),
            "Check in scheduled"
        );
        self.enqueue(task);
        self.notifier
            .notify(&CheckinEvent::FlightScheduled { flight_info, trigger_at })
            .await;

        Ok(ScheduleDecision::Scheduled { task_id, trigger_at })
    }

    /// Dispatch loop. Returns one report per scheduled flight once nothing is pending,
    /// or the first hard failure, which leaves the rest of the queue unattempted.
    pub async fn run(mut self) -> Result<Vec<TaskReport>, SchedulerError> {
        info!(
            current_time = %self.clock.now().format(DISPLAY_TIME_FORMAT),
            pending = self.pending.len(),
            "Flights scheduled. Waiting..."
        );

        let mut commands_open = true;
        while let Some(next) = self.next_deadline() {
            let wait = (next.trigger_at - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            let due = wait <= MAX_NAP;

            tokio::select! {
                biased;

                command = self.commands.recv(), if commands_open => match command {
                    Some(Command::Cancel(task_id)) => self.cancel(task_id),
                    Some(Command::Shutdown) => {
                        info!(pending = self.pending.len(), "Shutting down scheduler");
                        let ids: Vec<Uuid> = self.pending.keys().copied().collect();
                        for task_id in ids {
                            self.cancel(task_id);
                        }
                        break;
                    }
                    None => commands_open = false,
                },
                _ = tokio::time::sleep(wait.min(MAX_NAP)) => {
                    if due {
                        self.queue.pop();
                        self.dispatch(next.task_id).await?;
                    }
                }
            }
        }

        Ok(self.finished)
    }

    /// Earliest live deadline. Entries of cancelled tasks are dropped on the way.
    fn next_deadline(&mut self) -> Option<Deadline> {
        while let Some(Reverse(head)) = self.queue.peek().copied() {
            if self.pending.contains_key(&head.task_id) {
                return Some(head);
            }
            self.queue.pop();
        }
        None
    }

    fn enqueue(&mut self, task: CheckinTask) {
        self.sequence += 1;
        self.queue.push(Reverse(Deadline {
            trigger_at: task.trigger_at,
            sequence: self.sequence,
            task_id: task.id,
        }));
        self.pending.insert(task.id, task);
    }

    fn cancel(&mut self, task_id: Uuid) {
        if let Some(mut task) = self.pending.remove(&task_id) {
            info!(task_id = %task_id, flight = task.flight().map(|f| f.number), "Check in cancelled");
            task.status = TaskStatus::Cancelled;
            self.finished.push(task.report());
        }
    }

    async fn dispatch(&mut self, task_id: Uuid) -> Result<(), SchedulerError> {
        let Some(mut task) = self.pending.remove(&task_id) else {
            return Ok(());
        };
        let reservation = Arc::clone(&task.reservation);
        let flight = reservation
            .flight(task.leg)
            .ok_or(SchedulerError::UnknownLeg(task.leg))?;

        info!(
            confirmation = %reservation.confirmation,
            flight = flight.number,
            attempt = task.attempt,
            max_attempts = self.window.max_attempts(),
            "Attempting check in"
        );

        let attempt = self.checkin.attempt(&reservation, flight);
        let outcome = match tokio::time::timeout(self.attempt_timeout, attempt).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) if e.severity() == FailureSeverity::Retry => {
                AttemptOutcome::SoftFailed(SoftFailure::SlowSite(e))
            }
            Ok(Err(e)) => {
                error!(
                    confirmation = %reservation.confirmation,
                    flight = flight.number,
                    error = %e,
                    "Check in failed, giving up on all flights"
                );
                return Err(SchedulerError::Hard(e));
            }
            Err(_) => AttemptOutcome::SoftFailed(SoftFailure::TimedOut(self.attempt_timeout)),
        };

        match outcome {
            AttemptOutcome::Succeeded { position } => {
                task.status = TaskStatus::Succeeded { position };
                self.notifier
                    .notify(&CheckinEvent::CheckedIn {
                        flight_info: task.flight_info(),
                        position,
                        attempt: task.attempt,
                    })
                    .await;
                self.finished.push(task.report());
            }
            AttemptOutcome::SoftFailed(reason) if self.window.should_retry(task.attempt) => {
                warn!(
                    confirmation = %reservation.confirmation,
                    flight = flight.number,
                    attempt = task.attempt,
                    reason = %reason,
                    "FAILURE.  Scheduling another try in {} seconds",
                    self.window.retry_interval().as_secs()
                );
                task.attempt += 1;
                task.trigger_at = self.window.next_attempt_at(self.clock.now());
                self.enqueue(task);
            }
            AttemptOutcome::SoftFailed(reason) => {
                warn!(
                    confirmation = %reservation.confirmation,
                    flight = flight.number,
                    attempts = task.attempt,
                    reason = %reason,
                    "FAILURE.  Too many failures, giving up."
                );
                task.status = TaskStatus::Exhausted { attempts: task.attempt };
                self.notifier
                    .notify(&CheckinEvent::CheckinAbandoned {
                        flight_info: task.flight_info(),
                        attempts: task.attempt,
                    })
                    .await;
                self.finished.push(task.report());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PausedClock, RecordingNotifier};
    use async_trait::async_trait;
    use chrono::{SubsecRound, TimeZone};
    use earlybird_shared::{BoardingGroup, BoardingPosition, Flight, Trip};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers attempts from a script and records which flight each one was for.
    #[derive(Default)]
    struct ScriptedAttempts {
        script: Mutex<VecDeque<Result<AttemptOutcome, TransportError>>>,
        calls: Mutex<Vec<(u32, DateTime<Utc>)>>,
        clock: Option<Arc<PausedClock>>,
        delay: Option<Duration>,
    }

    impl ScriptedAttempts {
        fn new(clock: Arc<PausedClock>, script: Vec<Result<AttemptOutcome, TransportError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                clock: Some(clock),
                ..Self::default()
            }
        }

        fn flights(&self) -> Vec<u32> {
            self.calls.lock().unwrap().iter().map(|(n, _)| *n).collect()
        }

        fn times(&self) -> Vec<DateTime<Utc>> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl CheckinAttempt for ScriptedAttempts {
        async fn attempt(
            &self,
            _reservation: &Reservation,
            flight: &Flight,
        ) -> Result<AttemptOutcome, TransportError> {
            let now = self.clock.as_ref().map(|c| c.now()).unwrap().trunc_subsecs(0);
            self.calls.lock().unwrap().push((flight.number, now));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(AttemptOutcome::SoftFailed(SoftFailure::Rejected)))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2009, 10, 20, 12, 0, 0).unwrap()
    }

    /// Outbound 1476 on Oct 22, return 34 on Oct 25.
    fn reservation(confirmation: &str) -> Arc<Reservation> {
        let departs_at = chrono_tz::US::Pacific
            .with_ymd_and_hms(2009, 10, 22, 11, 15, 0)
            .unwrap();
        let returns_at = chrono_tz::US::Central
            .with_ymd_and_hms(2009, 10, 25, 17, 45, 0)
            .unwrap();
        let mut reservation = Reservation::new("Ada".into(), "Lovelace".into(), confirmation.into());
        reservation.attach_trip(
            Trip::new(
                vec![Flight::new(1476, "SJC".into(), departs_at)],
                vec![Flight::new(34, "TUL".into(), returns_at)],
            )
            .unwrap(),
        );
        Arc::new(reservation)
    }

    fn success(number: u32) -> Result<AttemptOutcome, TransportError> {
        Ok(AttemptOutcome::Succeeded {
            position: Some(BoardingPosition { group: BoardingGroup::A, number }),
        })
    }

    fn scheduler(
        window: CheckinWindow,
        clock: Arc<PausedClock>,
        attempts: Arc<ScriptedAttempts>,
        notifier: Arc<RecordingNotifier>,
    ) -> (RetryScheduler, SchedulerHandle) {
        RetryScheduler::new(window, Duration::from_secs(120), attempts, notifier, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_in_trigger_order() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![success(5), success(7)]));
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut scheduler, _handle) =
            scheduler(CheckinWindow::default(), clock, attempts.clone(), notifier.clone());

        let reservation = reservation("ABC123");
        // Return flight queued first; it still runs last.
        scheduler.schedule(reservation.clone(), Leg::inbound(0)).await.unwrap();
        let decision = scheduler.schedule(reservation, Leg::outbound(0)).await.unwrap();
        assert!(matches!(
            decision,
            ScheduleDecision::Scheduled { trigger_at, .. }
                if trigger_at == Utc.with_ymd_and_hms(2009, 10, 21, 18, 12, 0).unwrap()
        ));

        let reports = scheduler.run().await.unwrap();

        assert_eq!(attempts.flights(), vec![1476, 34]);
        assert_eq!(
            attempts.times(),
            vec![
                Utc.with_ymd_and_hms(2009, 10, 21, 18, 12, 0).unwrap(),
                Utc.with_ymd_and_hms(2009, 10, 24, 22, 42, 0).unwrap(),
            ]
        );
        let outcomes: Vec<String> = reports.iter().map(|r| r.outcome()).collect();
        assert_eq!(outcomes, vec!["checked in at A5", "checked in at A7"]);
        assert_eq!(
            notifier.subjects(),
            vec![
                "Waiting for SW flight",
                "Waiting for SW flight",
                "Flight checked in!",
                "Flight checked in!",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_trigger_times_keep_insertion_order() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![success(1), success(2)]));
        let (mut scheduler, _handle) = scheduler(
            CheckinWindow::default(),
            clock,
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
        );

        let first = reservation("AAA111");
        let second = reservation("BBB222");
        scheduler.schedule(first, Leg::outbound(0)).await.unwrap();
        scheduler.schedule(second, Leg::outbound(0)).await.unwrap();

        let reports = scheduler.run().await.unwrap();
        let order: Vec<String> = reports.iter().map(|r| r.confirmation.expose().to_string()).collect();
        assert_eq!(order, vec!["AAA111", "BBB222"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_soft_failures_retry_then_succeed() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts::new(
            clock.clone(),
            vec![
                Ok(AttemptOutcome::SoftFailed(SoftFailure::Rejected)),
                Ok(AttemptOutcome::SoftFailed(SoftFailure::IncompleteForm { found: 2 })),
                success(23),
            ],
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut scheduler, _handle) =
            scheduler(CheckinWindow::default(), clock, attempts.clone(), notifier.clone());

        scheduler.schedule(reservation("ABC123"), Leg::outbound(0)).await.unwrap();
        let reports = scheduler.run().await.unwrap();

        let trigger = Utc.with_ymd_and_hms(2009, 10, 21, 18, 12, 0).unwrap();
        assert_eq!(
            attempts.times(),
            vec![
                trigger,
                trigger + chrono::Duration::seconds(5),
                trigger + chrono::Duration::seconds(10),
            ]
        );
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome(), "checked in at A23");
        match notifier.events().last() {
            Some(CheckinEvent::CheckedIn { attempt, .. }) => assert_eq!(*attempt, 3),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempt_budget() {
        let clock = PausedClock::at(start());
        // Every attempt is rejected.
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![]));
        let notifier = Arc::new(RecordingNotifier::default());
        let window = CheckinWindow::new(Duration::from_secs(60), Duration::from_secs(7)).unwrap();
        let (mut scheduler, _handle) = scheduler(window, clock, attempts.clone(), notifier.clone());

        scheduler.schedule(reservation("ABC123"), Leg::outbound(0)).await.unwrap();
        let reports = scheduler.run().await.unwrap();

        assert_eq!(attempts.flights().len(), 19);
        assert_eq!(reports[0].status, TaskStatus::Exhausted { attempts: 19 });
        assert_eq!(reports[0].outcome(), "gave up after 19 attempts");
        assert_eq!(
            notifier.subjects(),
            vec!["Waiting for SW flight", "Flight check in failed"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_budget_is_73_attempts() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![]));
        let (mut scheduler, _handle) = scheduler(
            CheckinWindow::default(),
            clock,
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
        );

        scheduler.schedule(reservation("ABC123"), Leg::outbound(0)).await.unwrap();
        let reports = scheduler.run().await.unwrap();

        // The first attempt plus 72 retries, the last one 6 minutes after the trigger.
        assert_eq!(attempts.flights().len(), 73);
        assert_eq!(reports[0].outcome(), "gave up after 73 attempts");
        let times = attempts.times();
        assert_eq!(
            times.last().copied(),
            Some(Utc.with_ymd_and_hms(2009, 10, 21, 18, 18, 0).unwrap())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_trigger_is_skipped() {
        // Past the outbound window, before the return one.
        let clock = PausedClock::at(Utc.with_ymd_and_hms(2009, 10, 22, 0, 0, 0).unwrap());
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![success(9)]));
        let notifier = Arc::new(RecordingNotifier::default());
        let (mut scheduler, _handle) =
            scheduler(CheckinWindow::default(), clock, attempts.clone(), notifier.clone());

        let reservation = reservation("ABC123");
        let outbound = scheduler.schedule(reservation.clone(), Leg::outbound(0)).await.unwrap();
        let inbound = scheduler.schedule(reservation, Leg::inbound(0)).await.unwrap();

        assert!(matches!(outbound, ScheduleDecision::Skipped { .. }));
        assert!(matches!(inbound, ScheduleDecision::Scheduled { .. }));
        assert_eq!(scheduler.pending(), 1);

        let reports = scheduler.run().await.unwrap();
        assert_eq!(attempts.flights(), vec![34]);
        assert_eq!(reports.len(), 1);
        assert_eq!(notifier.subjects()[0], "Flight not scheduled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_leg() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![]));
        let (mut scheduler, _handle) = scheduler(
            CheckinWindow::default(),
            clock,
            attempts,
            Arc::new(RecordingNotifier::default()),
        );

        let err = scheduler
            .schedule(reservation("ABC123"), Leg::inbound(3))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownLeg(leg) if leg == Leg::inbound(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_failure_aborts_remaining_tasks() {
        let clock = PausedClock::at(start());
        let refused = TransportError::Connect {
            url: "https://www.southwest.com/".into(),
            reason: "connection refused".into(),
        };
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![Err(refused.clone())]));
        let (mut scheduler, _handle) = scheduler(
            CheckinWindow::default(),
            clock,
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
        );

        let reservation = reservation("ABC123");
        scheduler.schedule(reservation.clone(), Leg::outbound(0)).await.unwrap();
        scheduler.schedule(reservation, Leg::inbound(0)).await.unwrap();

        let err = scheduler.run().await.unwrap_err();
        assert!(matches!(err, SchedulerError::Hard(ref e) if *e == refused));
        assert_eq!(attempts.flights(), vec![1476]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_is_retried() {
        let clock = PausedClock::at(start());
        let timeout = TransportError::Timeout { url: "https://www.southwest.com/".into() };
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![Err(timeout), success(4)]));
        let (mut scheduler, _handle) = scheduler(
            CheckinWindow::default(),
            clock,
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
        );

        scheduler.schedule(reservation("ABC123"), Leg::outbound(0)).await.unwrap();
        let reports = scheduler.run().await.unwrap();

        assert_eq!(attempts.flights().len(), 2);
        assert_eq!(reports[0].outcome(), "checked in at A4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts {
            delay: Some(Duration::from_secs(600)),
            ..ScriptedAttempts::new(clock.clone(), vec![success(1)])
        });
        let window = CheckinWindow::new(Duration::from_secs(5), Duration::from_secs(5)).unwrap();
        let (mut scheduler, _handle) = scheduler(
            window,
            clock,
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
        );

        scheduler.schedule(reservation("ABC123"), Leg::outbound(0)).await.unwrap();
        let reports = scheduler.run().await.unwrap();

        // Every attempt outlasts the 120 second limit.
        assert_eq!(attempts.flights().len(), 3);
        assert_eq!(reports[0].status, TaskStatus::Exhausted { attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_task() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![success(3)]));
        let (mut scheduler, handle) = scheduler(
            CheckinWindow::default(),
            clock,
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
        );

        let reservation = reservation("ABC123");
        scheduler.schedule(reservation.clone(), Leg::outbound(0)).await.unwrap();
        let inbound = scheduler.schedule(reservation, Leg::inbound(0)).await.unwrap();
        let ScheduleDecision::Scheduled { task_id, .. } = inbound else {
            panic!("return flight not scheduled");
        };
        handle.cancel(task_id);

        let reports = scheduler.run().await.unwrap();

        assert_eq!(attempts.flights(), vec![1476]);
        let outcomes: Vec<String> = reports.iter().map(|r| r.outcome()).collect();
        assert_eq!(outcomes, vec!["cancelled", "checked in at A3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_everything() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![]));
        let (mut scheduler, handle) = scheduler(
            CheckinWindow::default(),
            clock,
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
        );

        let reservation = reservation("ABC123");
        scheduler.schedule(reservation.clone(), Leg::outbound(0)).await.unwrap();
        scheduler.schedule(reservation, Leg::inbound(0)).await.unwrap();
        handle.shutdown();

        let reports = scheduler.run().await.unwrap();

        assert!(attempts.flights().is_empty());
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.status == TaskStatus::Cancelled));
    }

    /// Wall clock that can leap ahead of tokio's timer, as it does across a host suspend.
    struct SuspendingClock {
        base: Arc<PausedClock>,
        slept: Mutex<chrono::Duration>,
    }

    impl SuspendingClock {
        fn suspend_for(&self, span: chrono::Duration) {
            *self.slept.lock().unwrap() += span;
        }
    }

    impl Clock for SuspendingClock {
        fn now(&self) -> DateTime<Utc> {
            self.base.now() + *self.slept.lock().unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_survives_host_suspend() {
        let base = PausedClock::at(start());
        let clock = Arc::new(SuspendingClock {
            base: base.clone(),
            slept: Mutex::new(chrono::Duration::zero()),
        });
        let attempts = Arc::new(ScriptedAttempts::new(base, vec![success(6)]));
        let (mut scheduler, _handle) = RetryScheduler::new(
            CheckinWindow::default(),
            Duration::from_secs(120),
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
            clock.clone(),
        );

        // Trigger is 30h12m away; the host sleeps through it two minutes in.
        scheduler.schedule(reservation("ABC123"), Leg::outbound(0)).await.unwrap();
        let suspend = async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            clock.suspend_for(chrono::Duration::hours(31));
        };
        let (reports, ()) = tokio::join!(scheduler.run(), suspend);

        let reports = reports.unwrap();
        assert_eq!(reports[0].outcome(), "checked in at A6");
        let fired = attempts.times()[0];
        assert!(fired <= start() + chrono::Duration::minutes(3), "fired at {}", fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_does_not_stop_loop() {
        let clock = PausedClock::at(start());
        let attempts = Arc::new(ScriptedAttempts::new(clock.clone(), vec![success(8)]));
        let (mut scheduler, handle) = scheduler(
            CheckinWindow::default(),
            clock,
            attempts.clone(),
            Arc::new(RecordingNotifier::default()),
        );
        drop(handle);

        scheduler.schedule(reservation("ABC123"), Leg::outbound(0)).await.unwrap();
        let reports = scheduler.run().await.unwrap();

        assert_eq!(reports[0].outcome(), "checked in at A8");
    }
}
