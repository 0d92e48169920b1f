//! Debounced reward batching.
//!
//! Every non-zero science event is credited to the ledger right away and
//! queued as a [`ReportRecord`]. Each new record re-arms a one-shot timer;
//! when the timer expires and the backlog holds more than `queueLength`
//! records, the whole backlog is flushed into a single notification.
//!
//! Overflow is only checked on expiry, so a backlog that crosses the
//! threshold is flushed once events have stopped for a full interval.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::Amount;
use crate::ledger::Ledger;
use crate::model::{ReportRecord, ScienceEvent, TransactionReason};
use crate::notify::{MessageColor, MessageIcon, Notification, Notifier};
use crate::settings::Settings;
use crate::timer::OneShotTimer;

mod error;
pub use error::{PersistError, RecordError};

mod persist;
pub use persist::{QUEUE_KEY, SaveNode};

mod summary;
pub use summary::{SUMMARY_TITLE, Summary};

pub const CONFIG_ERROR_TITLE: &str = "Science rewards error!";
const CONFIG_ERROR_BODY: &str = "Sorry to break your immersion, but there seems to be an error in \
    the configuration and science rewards are not working properly right now. You should check \
    the values in the settings file.";

/// Backlog of converted rewards plus the debounce timer that flushes it.
pub struct BatchQueue<L, N> {
    backlog: VecDeque<ReportRecord>,
    timer: OneShotTimer,
    settings: Settings,
    ledger: L,
    notifier: N,
}

/// Public API
impl<L: Ledger, N: Notifier> BatchQueue<L, N> {
    pub fn new(settings: Settings, ledger: L, notifier: N) -> Self {
        info!(
            funds = settings.funds,
            rep = settings.rep,
            queue_length = settings.queue_length,
            interval = ?settings.interval(),
            "configuration is set"
        );
        Self {
            backlog: VecDeque::new(),
            timer: OneShotTimer::new(settings.interval()),
            settings,
            ledger,
            notifier,
        }
    }

    /// Build the queue from the settings file at `path`.
    ///
    /// Any problem with the file falls back to [`Settings::default`] and posts
    /// one error notification.
    pub fn with_settings_file(path: impl AsRef<Path>, ledger: L, mut notifier: N) -> Self {
        let settings = match Settings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("there was an error while loading the configuration: {e}");
                notifier.post(Notification::new(
                    CONFIG_ERROR_TITLE,
                    CONFIG_ERROR_BODY,
                    MessageColor::Red,
                    MessageIcon::Alert,
                ));
                Settings::default()
            }
        };
        Self::new(settings, ledger, notifier)
    }

    /// Drive the queue from `events`, ticking the timer every `tick_every`.
    ///
    /// Returns once the event stream ends; a pending timer is left armed.
    pub async fn run(
        &mut self,
        mut events: impl Stream<Item = ScienceEvent> + Unpin,
        tick_every: Duration,
    ) {
        let mut ticker = tokio::time::interval(tick_every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(event) => self.handle(event, Instant::now()),
                    None => break,
                },
                now = ticker.tick() => {
                    self.tick(now);
                }
            }
        }
        debug!(pending = self.backlog.len(), "event stream ended");
    }

    /// Handle one science event received at `now`.
    ///
    /// Credits the ledger with the converted amounts and queues a record.
    /// Zero science is ignored entirely, as is science that is not finite or
    /// converts to an amount out of range.
    pub fn handle(&mut self, event: ScienceEvent, now: Instant) {
        debug!(science = event.science, subject = %event.subject, "received science");

        if event.science == 0.0 {
            return;
        }

        let funds = Amount::checked_from_float(event.science * self.settings.funds);
        let reputation = Amount::checked_from_float(event.science * self.settings.rep);
        let (Some(funds), Some(reputation)) = (funds, reputation) else {
            warn!(
                science = event.science,
                subject = %event.subject,
                "ignoring science that does not convert to a valid reward"
            );
            return;
        };

        let reason = TransactionReason::ScienceTransmission;
        self.ledger.add_funds(funds, reason);
        self.ledger.add_reputation(reputation, reason);
        info!(
            funds = %funds,
            reputation = %reputation,
            subject = %event.subject,
            "science converted"
        );

        self.submit(funds, reputation, event.subject, now);
    }

    /// Queue a converted reward and re-arm the timer.
    pub fn submit(
        &mut self,
        funds: Amount,
        reputation: Amount,
        subject: impl Into<String>,
        now: Instant,
    ) {
        self.backlog.push_back(ReportRecord::new(funds, reputation, subject));
        self.timer.start(now);
    }

    /// Advance the timer to `now`; returns the summary if this tick flushed.
    pub fn tick(&mut self, now: Instant) -> Option<Summary> {
        if self.timer.tick(now) {
            self.on_timer()
        } else {
            None
        }
    }

    /// Drain the whole backlog into one notification.
    ///
    /// An empty backlog posts nothing and returns `None`.
    pub fn flush(&mut self) -> Option<Summary> {
        if self.backlog.is_empty() {
            return None;
        }

        let summary = Summary::new(std::mem::take(&mut self.backlog).into());
        info!(
            records = summary.records().len(),
            funds = %summary.total_funds(),
            reputation = %summary.total_reputation(),
            "posting the user notification"
        );
        self.notifier.post(summary.to_notification());
        Some(summary)
    }

    /// Pending records, oldest first.
    pub fn backlog(&self) -> impl ExactSizeIterator<Item = &ReportRecord> + '_ {
        self.backlog.iter()
    }

    pub fn len(&self) -> usize {
        self.backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backlog.is_empty()
    }

    pub fn timer(&self) -> &OneShotTimer {
        &self.timer
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}

/// Private API
impl<L: Ledger, N: Notifier> BatchQueue<L, N> {
    /// Expiry handler: flush only once the backlog is over the threshold.
    fn on_timer(&mut self) -> Option<Summary> {
        if self.backlog.len() > self.settings.queue_length {
            self.flush()
        } else {
            debug!(
                pending = self.backlog.len(),
                queue_length = self.settings.queue_length,
                "timer expired below threshold"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Treasury;
    use crate::notify::Outbox;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    // test utils

    fn queue() -> BatchQueue<Treasury, Outbox> {
        BatchQueue::new(Settings::default(), Treasury::default(), Outbox::default())
    }

    fn queue_with(queue_length: usize) -> BatchQueue<Treasury, Outbox> {
        let settings = Settings {
            queue_length,
            ..Settings::default()
        };
        BatchQueue::new(settings, Treasury::default(), Outbox::default())
    }

    fn science(amount: f64, subject: &str) -> ScienceEvent {
        ScienceEvent::new(amount, subject)
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn new_queue_is_empty_and_unarmed() {
        let q = queue();
        assert!(q.is_empty());
        assert!(!q.timer().is_armed());
        assert_eq!(q.timer().interval(), Duration::from_secs(1));
    }

    // handle / submit

    #[test]
    fn handle_credits_ledger_and_queues_record() {
        let mut q = queue();
        q.handle(science(2.0, "Mystery Goo"), Instant::now());

        assert_eq!(q.ledger().funds(), Amount::from_float(2000.0));
        assert_eq!(q.ledger().reputation(), Amount::from_float(2.0));
        assert_eq!(q.ledger().credits(), 2);

        let records: Vec<_> = q.backlog().cloned().collect();
        assert_eq!(
            records,
            vec![ReportRecord::new(
                Amount::from_float(2000.0),
                Amount::from_float(2.0),
                "Mystery Goo"
            )]
        );
        assert!(q.timer().is_armed());
    }

    #[test]
    fn handle_uses_configured_multipliers() {
        let settings = Settings {
            funds: 12.5,
            rep: 0.5,
            ..Settings::default()
        };
        let mut q = BatchQueue::new(settings, Treasury::default(), Outbox::default());
        q.handle(science(4.0, "Crew Report"), Instant::now());

        let record = q.backlog().next().unwrap();
        assert_eq!(record.funds(), Amount::from_float(50.0));
        assert_eq!(record.reputation(), Amount::from_float(2.0));
    }

    #[test]
    fn zero_science_is_ignored() {
        let mut q = queue();
        q.handle(science(0.0, "Nothing"), Instant::now());

        assert!(q.is_empty());
        assert!(!q.timer().is_armed());
        assert_eq!(q.ledger().credits(), 0);
    }

    #[test]
    fn zero_science_does_not_rearm() {
        let t0 = Instant::now();
        let mut q = queue();
        q.handle(science(1.0, "EVA Report"), t0);
        q.handle(science(0.0, "Nothing"), t0 + ms(900));

        assert_eq!(q.timer().deadline(), Some(t0 + Duration::from_secs(1)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn non_finite_science_is_ignored() {
        let mut q = queue();
        q.handle(science(f64::NAN, "Broken"), Instant::now());
        q.handle(science(f64::INFINITY, "Broken"), Instant::now());

        assert!(q.is_empty());
        assert_eq!(q.ledger().credits(), 0);
    }

    #[test]
    fn unrepresentable_reward_is_ignored() {
        let settings = Settings {
            funds: 1e16,
            ..Settings::default()
        };
        let mut q = BatchQueue::new(settings, Treasury::default(), Outbox::default());
        q.handle(science(1.0, "Too Much"), Instant::now());
        q.handle(science(1.0, "Too Much"), Instant::now());

        assert!(q.is_empty());
        assert!(!q.timer().is_armed());
        assert_eq!(q.ledger().credits(), 0);
        assert_eq!(q.ledger().funds(), Amount::ZERO);
    }

    #[test]
    fn backlog_grows_with_each_event() {
        let t0 = Instant::now();
        let mut q = queue();
        for i in 0..12 {
            q.handle(science(1.0, "Temperature Scan"), t0 + ms(i * 10));
            assert_eq!(q.len(), i as usize + 1);
        }
        assert!(q.notifier().is_empty());
    }

    #[test]
    fn backlog_preserves_insertion_order() {
        let t0 = Instant::now();
        let mut q = queue();
        for subject in ["first", "second", "third"] {
            q.handle(science(1.0, subject), t0);
        }
        let subjects: Vec<_> = q.backlog().map(ReportRecord::subject).collect();
        assert_eq!(subjects, vec!["first", "second", "third"]);
    }

    // tick

    #[test]
    fn expiry_under_threshold_only_disarms() {
        let t0 = Instant::now();
        let mut q = queue();
        q.handle(science(2.0, "Mystery Goo"), t0);

        assert!(q.tick(t0 + ms(1100)).is_none());
        assert!(!q.timer().is_armed());
        assert_eq!(q.len(), 1);
        assert!(q.notifier().is_empty());
    }

    #[test]
    fn exactly_threshold_does_not_flush() {
        let t0 = Instant::now();
        let mut q = queue();
        for _ in 0..5 {
            q.handle(science(1.0, "Seismic Scan"), t0);
        }

        assert!(q.tick(t0 + ms(1100)).is_none());
        assert_eq!(q.len(), 5);
        assert!(q.notifier().is_empty());
    }

    #[test]
    fn overflow_flushes_on_expiry() {
        let t0 = Instant::now();
        let mut q = queue();
        for i in 0..6 {
            q.handle(science(1.0, "Seismic Scan"), t0 + ms(i * 100));
        }

        // overflow is not acted on before the timer expires
        assert!(q.tick(t0 + ms(1000)).is_none());
        assert_eq!(q.len(), 6);

        let summary = q.tick(t0 + ms(1600)).unwrap();
        assert_eq!(summary.records().len(), 6);
        assert_eq!(summary.total_funds(), Amount::from_float(6000.0));
        assert!(q.is_empty());
        assert_eq!(q.notifier().len(), 1);

        // nothing left to fire
        assert!(q.tick(t0 + ms(5000)).is_none());
        assert_eq!(q.notifier().len(), 1);
    }

    #[test]
    fn burst_collapses_into_one_fire() {
        let t0 = Instant::now();
        let mut q = queue_with(1);
        q.handle(science(1.0, "first"), t0);
        q.handle(science(1.0, "second"), t0 + ms(500));

        // one interval after the first event, but not after the second
        assert!(q.tick(t0 + ms(1200)).is_none());
        assert!(q.timer().is_armed());

        assert!(q.tick(t0 + ms(1600)).is_some());
        assert!(q.tick(t0 + ms(3000)).is_none());
        assert_eq!(q.notifier().len(), 1);
    }

    #[test]
    fn under_threshold_backlog_flushes_after_later_overflow() {
        let t0 = Instant::now();
        let mut q = queue_with(2);
        q.handle(science(1.0, "a"), t0);
        q.handle(science(1.0, "b"), t0);
        assert!(q.tick(t0 + ms(1100)).is_none());

        q.handle(science(1.0, "c"), t0 + ms(2000));
        let summary = q.tick(t0 + ms(3100)).unwrap();
        let records = summary.records().iter();
        let subjects: Vec<_> = records.map(ReportRecord::subject).collect();
        assert_eq!(subjects, vec!["a", "b", "c"]);
    }

    // flush

    #[test]
    fn flush_empty_backlog_posts_nothing() {
        let mut q = queue();
        assert!(q.flush().is_none());
        assert!(q.notifier().is_empty());
    }

    #[test]
    fn flush_posts_summary_notification() {
        let t0 = Instant::now();
        let mut q = queue();
        q.handle(science(2.0, "Mystery Goo"), t0);
        q.handle(science(0.5, "Crew Report"), t0);

        let summary = q.flush().unwrap();
        assert!(q.is_empty());

        let posted = q.notifier().last().unwrap();
        assert_eq!(posted.title, SUMMARY_TITLE);
        assert_eq!(posted.color, MessageColor::Blue);
        assert_eq!(posted.icon, MessageIcon::Message);
        assert_eq!(posted.body, summary.body());
        let totals = "Total: 2500 funds, 2.5 reputation.\n";
        assert!(posted.body.ends_with(totals));
    }

    #[test]
    fn flush_does_not_touch_ledger() {
        let mut q = queue();
        q.handle(science(3.0, "EVA Report"), Instant::now());
        q.flush();
        assert_eq!(q.ledger().funds(), Amount::from_float(3000.0));
        assert_eq!(q.ledger().credits(), 2);
    }

    // settings

    #[test]
    fn bad_settings_fall_back_with_one_notification() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ \"funds\": oops }").unwrap();

        let q = BatchQueue::with_settings_file(file.path(), Treasury::default(), Outbox::default());

        assert_eq!(q.settings(), &Settings::default());
        assert_eq!(q.notifier().len(), 1);
        let posted = q.notifier().last().unwrap();
        assert_eq!(posted.title, CONFIG_ERROR_TITLE);
        assert_eq!(posted.color, MessageColor::Red);
        assert_eq!(posted.icon, MessageIcon::Alert);
    }

    #[test]
    fn missing_settings_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let q = BatchQueue::with_settings_file(
            dir.path().join("settings.json"),
            Treasury::default(),
            Outbox::default(),
        );
        assert_eq!(q.settings(), &Settings::default());
        assert_eq!(q.notifier().len(), 1);
    }

    #[test]
    fn valid_settings_file_is_used_silently() {
        let mut file = NamedTempFile::new().unwrap();
        let content = br#"{ "funds": 10, "rep": 0.1, "queueLength": 2, "interval": 0.5 }"#;
        file.write_all(content).unwrap();

        let q = BatchQueue::with_settings_file(file.path(), Treasury::default(), Outbox::default());

        assert_eq!(q.settings().queue_length, 2);
        assert_eq!(q.timer().interval(), ms(500));
        assert!(q.notifier().is_empty());
    }

    #[test]
    fn queue_accepts_borrowed_collaborators() {
        let mut treasury = Treasury::default();
        let mut outbox = Outbox::default();
        {
            let mut q = BatchQueue::new(Settings::default(), &mut treasury, &mut outbox);
            q.handle(science(1.0, "EVA Report"), Instant::now());
            q.flush();
        }
        assert_eq!(treasury.credits(), 2);
        assert_eq!(outbox.len(), 1);
    }

    //  Async run()

    #[tokio::test(start_paused = true)]
    async fn run_flushes_overflow_after_quiet_period() {
        let mut q = queue();
        let (sender, receiver) = mpsc::channel(16);

        let feed = async move {
            for i in 0..6 {
                let event = science(1.0, &format!("scan {i}"));
                sender.send(event).await.unwrap();
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        };
        tokio::join!(q.run(ReceiverStream::new(receiver), ms(20)), feed);

        assert!(q.is_empty());
        assert_eq!(q.notifier().len(), 1);
        assert_eq!(q.ledger().credits(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn run_keeps_backlog_below_threshold() {
        let mut q = queue();
        let events = vec![science(2.0, "Mystery Goo"), science(0.0, "Nothing")];

        q.run(tokio_stream::iter(events), ms(20)).await;

        assert_eq!(q.len(), 1);
        assert!(q.timer().is_armed());
        assert!(q.notifier().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_stream_of_steady_events_never_fires() {
        let mut q = queue();
        let (sender, receiver) = mpsc::channel(16);

        // events every 500ms keep re-arming a 1s timer
        let feed = async move {
            for _ in 0..8 {
                sender.send(science(1.0, "Temperature Scan")).await.unwrap();
                tokio::time::sleep(ms(500)).await;
            }
        };
        tokio::join!(q.run(ReceiverStream::new(receiver), ms(20)), feed);

        assert_eq!(q.len(), 8);
        assert!(q.notifier().is_empty());
    }
}
