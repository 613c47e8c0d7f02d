//! Wire model for the Trafikverket occasion-bundle search, plus the derived
//! predicates the polling pipeline filters on.
//!
//! Everything here is an immutable value record deserialized fresh on each
//! poll cycle and discarded once the cycle is done.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;

use crate::{errors::Error, Result};

pub const STOCKHOLM_CITY_LOCATION_ID: i64 = 1_000_140;
pub const UPPSALA_LOCATION_ID: i64 = 1_000_071;

/// Top-level search result. The API wraps its own status code in the body;
/// a 200 HTTP response can still carry a non-success `statusCode`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSearchResponse {
    pub data: Option<SearchData>,
    pub status_code: i64,
    #[serde(default)]
    pub source_url: String,
}

impl ExamSearchResponse {
    pub fn is_successful(&self) -> bool {
        self.status_code == 200
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    #[serde(default)]
    pub bundles: Vec<Bundle>,
    #[serde(default)]
    pub searched_months: i64,
}

/// A group of occasions sharing a quoted cost tier.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default)]
    pub occasions: Vec<Occasion>,
    #[serde(default)]
    pub cost: String,
}

/// One concrete, bookable exam appointment slot.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occasion {
    pub examination_id: String,
    #[serde(default)]
    pub examination_category: i64,
    #[serde(default)]
    pub examination_type_id: i64,
    pub location_id: i64,
    #[serde(default)]
    pub occasion_choice_id: i64,
    #[serde(default)]
    pub vehicle_type_id: i64,
    #[serde(default)]
    pub language_id: i64,
    #[serde(default)]
    pub tachograph_type_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Option<String>,
    pub time_range: TimeRange,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: String,
    pub location_name: String,
    #[serde(default)]
    pub place_address: String,
    #[serde(default)]
    pub place_coordinate: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub cost_text: String,
    #[serde(default)]
    pub increased_fee: bool,
    // String-typed boolean on the wire; kept as-is.
    #[serde(default)]
    pub is_educator_booking: String,
    #[serde(default)]
    pub is_late_cancellation: bool,
    #[serde(default)]
    pub is_outside_valid_duration: bool,
    #[serde(default)]
    pub is_using_taxi_knowledge_valid_duration: bool,
}

impl Occasion {
    pub fn is_in_stockholm_city(&self) -> bool {
        self.location_id == STOCKHOLM_CITY_LOCATION_ID
    }

    pub fn is_in_uppsala(&self) -> bool {
        self.location_id == UPPSALA_LOCATION_ID
    }

    pub fn is_around_uppsala(&self) -> bool {
        self.is_in_uppsala() || self.is_in_stockholm_city()
    }

    pub fn start_timestamp(&self) -> Result<NaiveDateTime> {
        self.time_range.starts_at()
    }

    /// Human-readable one-liner, e.g.
    /// `MONDAY     MAY  16  at 09:00  in Uppsala`.
    pub fn summary(&self) -> Result<String> {
        let start = self.start_timestamp()?;
        let time = if start.second() == 0 {
            start.format("%H:%M").to_string()
        } else {
            start.format("%H:%M:%S").to_string()
        };
        Ok(format!(
            "{}     {}  {}  at {}  in {}",
            start.format("%A").to_string().to_uppercase(),
            start.format("%B").to_string().to_uppercase(),
            start.day(),
            time,
            self.location_name
        ))
    }
}

/// Raw start/end timestamps as received from the API. Not parsed at rest.
#[derive(Clone, Debug, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    /// Parse the start of the range as a naive local date-time.
    ///
    /// Everything from the first `+` onward is stripped before parsing, so
    /// the UTC offset suffix is discarded rather than converted.
    pub fn starts_at(&self) -> Result<NaiveDateTime> {
        let local = match self.start.find('+') {
            Some(idx) => &self.start[..idx],
            None => self.start.as_str(),
        };
        NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S").map_err(|e| {
            Error::Timestamp(format!("bad start timestamp {:?}: {e}", self.start))
        })
    }
}

/// Which fixed search-criteria template the exam client sends.
///
/// The original service shipped one hardcoded template per build; here the
/// template is a configuration choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchProfile {
    /// English-language theory exam, Stockholm City with Uppsala nearby.
    TheoryEnglish,
    /// Persian-language theory exam in Uppsala.
    TheoryPersian,
    /// Practical exam with a manual-transmission vehicle in Uppsala.
    PracticalManual,
}

impl FromStr for SearchProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "theory-english" => Ok(Self::TheoryEnglish),
            "theory-persian" => Ok(Self::TheoryPersian),
            "practical-manual" => Ok(Self::PracticalManual),
            other => Err(Error::Config(format!("unknown search profile: {other}"))),
        }
    }
}
