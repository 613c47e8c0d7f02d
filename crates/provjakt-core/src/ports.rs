use async_trait::async_trait;

use crate::{
    domain::{ExamSearchResponse, SearchProfile},
    Result,
};

/// Port for the remote exam-booking search API.
///
/// Trafikverket is the only implementation today; the pipeline only ever
/// sees this trait so tests can feed it canned responses.
#[async_trait]
pub trait ExamSearchPort: Send + Sync {
    async fn fetch_exams(&self, profile: &SearchProfile) -> Result<ExamSearchResponse>;
}

/// Port for the outbound notification channel.
///
/// Telegram is the first implementation; the shape is messenger-agnostic so
/// another bot API could fit behind the same interface.
#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()>;
}
