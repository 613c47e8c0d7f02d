//! Trafikverket adapter (occasion-bundle search).
//!
//! Speaks to the same endpoint the public booking UI uses, so the request
//! carries the headers a browser would send.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde_json::json;

use provjakt_core::{
    domain::{ExamSearchResponse, SearchProfile},
    errors::Error,
    ports::ExamSearchPort,
    Result,
};

const BASE_URL: &str = "https://fp.trafikverket.se";
const SEARCH_PATH: &str = "/Boka/occasion-bundles";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.80 Safari/537.36";

/// Sentinel start date meaning "earliest available".
const EPOCH_START_DATE: &str = "1970-01-01T00:00:00.000Z";

#[derive(Clone, Debug)]
pub struct TrafikverketClient {
    http: reqwest::Client,
    base_url: String,
    ssn: String,
}

impl TrafikverketClient {
    pub fn new(ssn: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("http client build error: {e}")))?;
        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
            ssn: ssn.into(),
        })
    }
}

#[async_trait]
impl ExamSearchPort for TrafikverketClient {
    async fn fetch_exams(&self, profile: &SearchProfile) -> Result<ExamSearchResponse> {
        let body = request_body(&self.ssn, profile);

        let resp = self
            .http
            .post(format!("{}{SEARCH_PATH}", self.base_url))
            .header(header::REFERER, "https://fp.trafikverket.se/Boka/")
            .header(header::ORIGIN, "https://fp.trafikverket.se")
            .header("sec-ch-ua-platform", "\"macOS\"")
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("trafikverket request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "trafikverket search failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("trafikverket body read error: {e}")))?;
        let parsed = serde_json::from_str::<ExamSearchResponse>(&text)?;
        Ok(parsed)
    }
}

fn request_body(ssn: &str, profile: &SearchProfile) -> serde_json::Value {
    json!({
        "bookingSession": booking_session(ssn),
        "occasionBundleQuery": occasion_bundle_query(profile),
    })
}

fn booking_session(ssn: &str) -> serde_json::Value {
    json!({
        "socialSecurityNumber": ssn,
        "licenceId": 5,
        "bookingModeId": 0,
        "ignoreDebt": false,
        "ignoreBookingHindrance": false,
        "examinationTypeId": 0,
        "excludeExaminationCategories": [],
        "rescheduleTypeId": 0,
        "paymentIsActive": false,
        "paymentReference": null,
        "paymentUrl": null,
        "searchedMonths": 0,
    })
}

fn occasion_bundle_query(profile: &SearchProfile) -> serde_json::Value {
    match profile {
        SearchProfile::TheoryEnglish => json!({
            "startDate": EPOCH_START_DATE,
            "searchedMonths": 0,
            "locationId": 1_000_140,
            "nearbyLocationIds": [1_000_071],
            "languageId": 4,
            "tachographTypeId": 1,
            "occasionChoiceId": 1,
            "examinationTypeId": 3,
        }),
        SearchProfile::TheoryPersian => json!({
            "startDate": EPOCH_START_DATE,
            "searchedMonths": 0,
            "locationId": 1_000_071,
            "nearbyLocationIds": [1_000_071],
            "languageId": 7,
            "tachographTypeId": 1,
            "occasionChoiceId": 1,
            "examinationTypeId": 3,
        }),
        SearchProfile::PracticalManual => json!({
            "startDate": EPOCH_START_DATE,
            "searchedMonths": 0,
            "locationId": 1_000_071,
            "nearbyLocationIds": [],
            "vehicleTypeId": 2,
            "tachographTypeId": 1,
            "occasionChoiceId": 1,
            "examinationTypeId": 12,
        }),
    }
}
