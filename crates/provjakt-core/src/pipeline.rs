//! The poll cycle: fetch the current occasion bundles, flatten them, run the
//! filter chain, notify on matches inside the configured window, and log
//! every match.
//!
//! A cycle never propagates an error to the scheduler; anything that goes
//! wrong is logged and turns into "zero results this cycle".

use std::sync::Arc;

use chrono::{Local, Months, NaiveDate};
use tracing::{error, info, warn};

use crate::{
    config::Config,
    domain::Occasion,
    ports::{ExamSearchPort, NotifierPort},
    Result,
};

const ATTENTION_BANNER: &str = "!!!!!!!!!!!!!!!!!!!!!!!!\n-------\n";

/// How far ahead of "today" an occasion may lie and still count as a match.
const SEARCH_HORIZON_MONTHS: u32 = 6;

pub struct PollPipeline {
    cfg: Arc<Config>,
    exams: Arc<dyn ExamSearchPort>,
    notifier: Arc<dyn NotifierPort>,
}

impl PollPipeline {
    pub fn new(
        cfg: Arc<Config>,
        exams: Arc<dyn ExamSearchPort>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            cfg,
            exams,
            notifier,
        }
    }

    /// Run one poll cycle and return the occasions that survived the filter
    /// chain, in wire order. Errors never escape this boundary.
    pub async fn run_once(&self) -> Vec<Occasion> {
        let today = Local::now().date_naive();
        match self.poll(today).await {
            Ok(matched) => matched,
            Err(e) => {
                error!("poll cycle failed: {e}");
                Vec::new()
            }
        }
    }

    async fn poll(&self, today: NaiveDate) -> Result<Vec<Occasion>> {
        let response = self.exams.fetch_exams(&self.cfg.search_profile).await?;
        if !response.is_successful() {
            warn!(
                "exam search returned status {}, skipping cycle",
                response.status_code
            );
            return Ok(Vec::new());
        }
        let Some(data) = response.data else {
            warn!("exam search returned no data, skipping cycle");
            return Ok(Vec::new());
        };

        let horizon = today
            .checked_add_months(Months::new(SEARCH_HORIZON_MONTHS))
            .unwrap_or(NaiveDate::MAX);

        let mut matched = Vec::new();
        for occasion in data.bundles.into_iter().flat_map(|b| b.occasions) {
            if !occasion.is_around_uppsala() {
                continue;
            }
            if occasion.date <= today || occasion.date >= horizon {
                continue;
            }

            let summary = match occasion.summary() {
                Ok(s) => s,
                Err(e) => {
                    warn!("skipping occasion {}: {e}", occasion.examination_id);
                    continue;
                }
            };

            if self.cfg.notify_window.contains(occasion.date) {
                self.dispatch_notification(&summary);
            }
            info!("{summary}");
            matched.push(occasion);
        }

        Ok(matched)
    }

    /// Fire-and-forget: the send is not awaited and its outcome is discarded
    /// beyond a log line. At-most-once, no confirmation.
    fn dispatch_notification(&self, summary: &str) {
        let text = format!("{ATTENTION_BANNER} new suitable exam found on {summary}");
        let notifier = Arc::clone(&self.notifier);
        let chat_id = self.cfg.chat_id.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_message(&chat_id, &text).await {
                warn!("failed to send notification: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        config::NotifyWindow,
        domain::{
            Bundle, ExamSearchResponse, SearchData, SearchProfile, TimeRange,
            UPPSALA_LOCATION_ID,
        },
        errors::Error,
    };

    struct CannedSearch(ExamSearchResponse);

    #[async_trait]
    impl ExamSearchPort for CannedSearch {
        async fn fetch_exams(&self, _profile: &SearchProfile) -> Result<ExamSearchResponse> {
            Ok(self.0.clone())
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl ExamSearchPort for FailingSearch {
        async fn fetch_exams(&self, _profile: &SearchProfile) -> Result<ExamSearchResponse> {
            Err(Error::Transport("connection refused".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotifierPort for RecordingNotifier {
        async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn occasion(location_id: i64, on: NaiveDate, start: &str) -> Occasion {
        Occasion {
            examination_id: format!("exam-{on}"),
            examination_category: 0,
            examination_type_id: 3,
            location_id,
            occasion_choice_id: 1,
            vehicle_type_id: 0,
            language_id: 7,
            tachograph_type_id: 1,
            name: String::new(),
            properties: None,
            time_range: TimeRange {
                start: start.to_string(),
                end: start.to_string(),
            },
            date: on,
            time: "09:00".to_string(),
            location_name: "Uppsala".to_string(),
            place_address: String::new(),
            place_coordinate: String::new(),
            cost: String::new(),
            cost_text: String::new(),
            increased_fee: false,
            is_educator_booking: "false".to_string(),
            is_late_cancellation: false,
            is_outside_valid_duration: false,
            is_using_taxi_knowledge_valid_duration: false,
        }
    }

    fn response(status_code: i64, occasions: Vec<Occasion>) -> ExamSearchResponse {
        ExamSearchResponse {
            data: Some(SearchData {
                bundles: vec![Bundle {
                    occasions,
                    cost: "800 kr".to_string(),
                }],
                searched_months: 6,
            }),
            status_code,
            source_url: "https://fp.trafikverket.se/Boka/occasion-bundles".to_string(),
        }
    }

    fn test_config(window: NotifyWindow) -> Arc<Config> {
        Arc::new(Config {
            ssn: "19900101-0000".to_string(),
            telegram_bot_token: "bot-token".to_string(),
            chat_id: "4711".to_string(),
            notify_window: window,
            search_profile: SearchProfile::TheoryPersian,
            poll_interval: Duration::from_secs(1800),
            http_timeout: Duration::from_secs(30),
        })
    }

    fn pipeline(
        cfg: Arc<Config>,
        resp: ExamSearchResponse,
        notifier: Arc<RecordingNotifier>,
    ) -> PollPipeline {
        PollPipeline::new(cfg, Arc::new(CannedSearch(resp)), notifier)
    }

    /// Give detached notification tasks a chance to run on the test runtime.
    async fn drain_spawned_tasks() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn non_success_status_yields_no_matches_and_no_notification() {
        let today = date(2026, 9, 1);
        let window = NotifyWindow::new(date(2026, 9, 1), date(2026, 12, 1)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let resp = response(
            500,
            vec![occasion(
                UPPSALA_LOCATION_ID,
                date(2026, 9, 15),
                "2026-09-15T09:00:00+02:00",
            )],
        );
        let pipeline = pipeline(test_config(window), resp, Arc::clone(&notifier));

        let matched = pipeline.poll(today).await.unwrap();
        drain_spawned_tasks().await;

        assert!(matched.is_empty());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed_by_run_once() {
        let window = NotifyWindow::new(date(2026, 9, 1), date(2026, 12, 1)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let pipeline = PollPipeline::new(
            test_config(window),
            Arc::new(FailingSearch),
            Arc::clone(&notifier) as Arc<dyn NotifierPort>,
        );

        let matched = pipeline.run_once().await;

        assert!(matched.is_empty());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_chain_keeps_only_nearby_upcoming_occasions() {
        let today = date(2026, 9, 1);
        let window = NotifyWindow::new(date(2020, 1, 1), date(2020, 1, 2)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());

        let passing = occasion(
            UPPSALA_LOCATION_ID,
            date(2026, 9, 15),
            "2026-09-15T09:00:00+02:00",
        );
        let wrong_location = occasion(1_000_001, date(2026, 9, 15), "2026-09-15T09:00:00+02:00");
        let too_far_out = occasion(
            UPPSALA_LOCATION_ID,
            date(2027, 9, 15),
            "2027-09-15T09:00:00+02:00",
        );
        let already_past = occasion(
            UPPSALA_LOCATION_ID,
            date(2026, 8, 1),
            "2026-08-01T09:00:00+02:00",
        );
        let resp = response(
            200,
            vec![passing.clone(), wrong_location, too_far_out, already_past],
        );
        let pipeline = pipeline(test_config(window), resp, notifier);

        let matched = pipeline.poll(today).await.unwrap();

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].examination_id, passing.examination_id);
    }

    #[tokio::test]
    async fn occasion_inside_notify_window_triggers_exactly_one_notification() {
        let today = date(2026, 9, 1);
        let window = NotifyWindow::new(date(2026, 9, 1), date(2026, 12, 1)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let resp = response(
            200,
            vec![occasion(
                UPPSALA_LOCATION_ID,
                date(2026, 9, 15),
                "2026-09-15T09:00:00+02:00",
            )],
        );
        let pipeline = pipeline(test_config(window), resp, Arc::clone(&notifier));

        let matched = pipeline.poll(today).await.unwrap();
        drain_spawned_tasks().await;

        assert_eq!(matched.len(), 1);
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (chat_id, text) = &sent[0];
        assert_eq!(chat_id, "4711");
        assert!(text.starts_with(ATTENTION_BANNER));
        assert!(text.contains("new suitable exam found on"));
        assert!(text.contains(&matched[0].summary().unwrap()));
    }

    #[tokio::test]
    async fn occasion_outside_notify_window_is_returned_but_not_notified() {
        let today = date(2026, 9, 1);
        // Window well before the occasion date.
        let window = NotifyWindow::new(date(2026, 9, 1), date(2026, 9, 10)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let resp = response(
            200,
            vec![occasion(
                UPPSALA_LOCATION_ID,
                date(2026, 10, 15),
                "2026-10-15T09:00:00+02:00",
            )],
        );
        let pipeline = pipeline(test_config(window), resp, Arc::clone(&notifier));

        let matched = pipeline.poll(today).await.unwrap();
        drain_spawned_tasks().await;

        assert_eq!(matched.len(), 1);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_polls_renotify_every_cycle() {
        let today = date(2026, 9, 1);
        let window = NotifyWindow::new(date(2026, 9, 1), date(2026, 12, 1)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let resp = response(
            200,
            vec![occasion(
                UPPSALA_LOCATION_ID,
                date(2026, 9, 15),
                "2026-09-15T09:00:00+02:00",
            )],
        );
        let pipeline = pipeline(test_config(window), resp, Arc::clone(&notifier));

        let first = pipeline.poll(today).await.unwrap();
        let second = pipeline.poll(today).await.unwrap();
        drain_spawned_tasks().await;

        // No state between cycles: same matches, one notification per cycle.
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].examination_id, second[0].examination_id);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_start_timestamp_drops_the_occasion_not_the_cycle() {
        let today = date(2026, 9, 1);
        let window = NotifyWindow::new(date(2026, 9, 1), date(2026, 12, 1)).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let broken = occasion(UPPSALA_LOCATION_ID, date(2026, 9, 15), "not-a-timestamp");
        let intact = occasion(
            UPPSALA_LOCATION_ID,
            date(2026, 9, 20),
            "2026-09-20T13:30:00+02:00",
        );
        let resp = response(200, vec![broken, intact.clone()]);
        let pipeline = pipeline(test_config(window), resp, notifier);

        let matched = pipeline.poll(today).await.unwrap();

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].examination_id, intact.examination_id);
    }
}
