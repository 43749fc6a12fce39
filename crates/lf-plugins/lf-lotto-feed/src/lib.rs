//! # lf-lotto-feed Implementation
//!
//! `DrawFeed` backed by the public Dong-haeng lottery endpoint. The feed is
//! optional at assembly time; operators may record draws with an explicit
//! bonus number instead.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use lf_core::DrawFeed;

const DEFAULT_BASE_URL: &str = "https://www.dhlottery.co.kr";

/// Subset of the upstream payload we care about. The endpoint answers
/// `returnValue: "fail"` with no number fields for unknown sequences.
#[derive(Debug, Deserialize)]
struct DrawPayload {
    #[serde(rename = "returnValue")]
    return_value: String,
    #[serde(rename = "bnusNo")]
    bonus_number: Option<u8>,
}

pub struct HttpDrawFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDrawFeed {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for HttpDrawFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DrawFeed for HttpDrawFeed {
    async fn fetch_bonus_number(&self, draw_sequence_number: i64) -> anyhow::Result<Option<u8>> {
        let url = format!(
            "{}/common.do?method=getLottoNumber&drwNo={}",
            self.base_url, draw_sequence_number
        );
        let payload: DrawPayload = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if payload.return_value != "success" {
            warn!(draw_sequence_number, "lottery feed has no result yet");
            return Ok(None);
        }
        Ok(payload.bonus_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_parses_published_draw() {
        let raw = r#"{"returnValue":"success","drwNo":980,"bnusNo":33,
                      "drwtNo1":1,"drwtNo2":7,"drwtNo3":14,"drwtNo4":21,"drwtNo5":28,"drwtNo6":35}"#;
        let payload: DrawPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.return_value, "success");
        assert_eq!(payload.bonus_number, Some(33));
    }

    #[test]
    fn payload_parses_unpublished_draw() {
        let payload: DrawPayload = serde_json::from_str(r#"{"returnValue":"fail"}"#).unwrap();
        assert_eq!(payload.return_value, "fail");
        assert_eq!(payload.bonus_number, None);
    }
}
