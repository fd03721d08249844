use super::FundSource;
use crate::errors::RetrievalError;
use crate::models::{LofListResponse, RawFundRecord};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::USER_AGENT;

pub const DEFAULT_LIST_URL: &str = "https://www.jisilu.cn/data/lof/index_lof_list/?___jsl=LST___t=";

/// The endpoint refuses clients that do not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/71.0.3578.80 Safari/537.36";

pub struct Jisilu {
    client: reqwest::Client,
    list_url: String,
}

impl Jisilu {
    /// `list_url` gets the current unix millis appended to bust caches.
    pub fn new(list_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            list_url: list_url.into(),
        }
    }
}

impl Default for Jisilu {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_URL)
    }
}

#[async_trait]
impl FundSource for Jisilu {
    fn name(&self) -> &'static str {
        "jisilu"
    }

    async fn fetch_records(&self) -> Result<Vec<RawFundRecord>, RetrievalError> {
        let url = format!("{}{}", self.list_url, Utc::now().timestamp_millis());

        tracing::debug!("[{}] GET {url}", self.name());

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status));
        }

        let body = response.text().await?;
        let records = serde_json::from_str::<LofListResponse>(&body)?.into_records();

        tracing::info!("[{}] fetched {} funds", self.name(), records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const BODY: &str = r#"{"page":1,"rows":[
        {"id":"160106","cell":{"fund_id":"160106","fund_nm":"南方高增","discount_rt":"2.50%","apply_status":"开放"}},
        {"id":"161005","cell":{"fund_id":"161005","fund_nm":"富国天惠","discount_rt":"-","apply_status":"暂停"}}
    ],"total":2}"#;

    fn source_for(server: &mockito::Server) -> Jisilu {
        Jisilu::new(format!("{}/data/lof/index_lof_list/?___jsl=LST___t=", server.url()))
    }

    #[tokio::test]
    async fn fetches_rows_with_browser_agent_and_timestamp() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/data/lof/index_lof_list/".to_string()))
            .match_query(Matcher::Regex(r"___jsl=LST___t=\d+".to_string()))
            .match_header("user-agent", BROWSER_USER_AGENT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let records = source_for(&server).fetch_records().await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fund_id, "160106");
        assert_eq!(records[1].discount_rt, "-");
    }

    #[tokio::test]
    async fn non_success_status_is_a_retrieval_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = source_for(&server).fetch_records().await.unwrap_err();
        assert!(matches!(err, RetrievalError::Status(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn unparsable_body_is_a_retrieval_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body("<html>blocked</html>")
            .create_async()
            .await;

        let err = source_for(&server).fetch_records().await.unwrap_err();
        assert!(matches!(err, RetrievalError::Parse(_)));
    }
}
