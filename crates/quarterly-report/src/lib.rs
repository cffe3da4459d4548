#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quarterly/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Narrative report generation for tidy quarterly tables.
//!
//! [`ChatReportGenerator`] implements [`ReportGenerator`] against any
//! OpenAI-compatible chat-completions API.
//!
//! # Example
//!
//! ```no_run
//! use quarterly_core::{ReportGenerator, TidyTable};
//! use quarterly_report::ChatReportGenerator;
//!
//! # async fn example(table: TidyTable) -> Result<(), Box<dyn std::error::Error>> {
//! let generator = ChatReportGenerator::from_env()?.with_model("gpt-4o-mini");
//! let report = generator.generate(&table).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use quarterly_core::{ReportError, ReportGenerator, TidyTable};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default chat-completions API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Environment variable read first by [`ChatReportGenerator::from_env`].
pub const API_KEY_ENV: &str = "QUARTERLY_REPORT_API_KEY";

/// Environment variable read when [`API_KEY_ENV`] is unset.
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Upper bound on a single generation request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Placeholder replaced by the table JSON in a template.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Instruction template sent with every table.
pub const DEFAULT_TEMPLATE: &str = "You are a financial analyst. Below is a company's quarterly \
financial data as JSON, most recent quarter first. Amounts are as reported on the source page.\n\n\
{table}\n\n\
Write a concise analyst report covering revenue and net income trends, quarter-over-quarter and \
year-over-year changes, notable movements in any other metrics present, and an overall \
assessment of the company's recent financial performance.";

/// Report generator backed by a chat-completions API.
#[derive(Clone)]
pub struct ChatReportGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    template: String,
}

impl fmt::Debug for ChatReportGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatReportGenerator")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatReportGenerator {
    /// Create a generator with the given API key and default settings.
    ///
    /// Requests time out after [`DEFAULT_TIMEOUT`].
    pub fn new(api_key: impl Into<String>) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ReportError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, api_key))
    }

    /// Create a generator with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Create a generator from `QUARTERLY_REPORT_API_KEY` or `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, ReportError> {
        std::env::var(API_KEY_ENV)
            .or_else(|_| std::env::var(FALLBACK_API_KEY_ENV))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ReportError::MissingCredential(format!(
                    "set {API_KEY_ENV} or {FALLBACK_API_KEY_ENV}"
                ))
            })
            .and_then(Self::new)
    }

    /// Sets the API base URL (without the `/chat/completions` suffix).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the instruction template. It should contain `{table}`.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Fills the template's `{table}` slot with the table's JSON.
    pub fn render_prompt(&self, table: &TidyTable) -> Result<String, ReportError> {
        let json = table
            .to_json()
            .map_err(|e| ReportError::Serialization(e.to_string()))?;
        Ok(self.template.replace(TABLE_PLACEHOLDER, &json))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ReportGenerator for ChatReportGenerator {
    fn name(&self) -> &str {
        "chat-completions"
    }

    async fn generate(&self, table: &TidyTable) -> Result<String, ReportError> {
        if self.api_key.trim().is_empty() {
            return Err(ReportError::MissingCredential("API key is empty".to_string()));
        }

        let prompt = self.render_prompt(table)?;
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        debug!(model = %self.model, periods = table.len(), "Requesting analyst report");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ReportError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| ReportError::Api {
            status: status.as_u16(),
            message: format!("unexpected response: {e}"),
        })?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ReportError::EmptyResponse)
    }
}

// ============================================================================
// Chat Completions API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quarterly_core::TidyRow;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn sample_table() -> TidyTable {
        TidyTable::new(
            Vec::new(),
            vec![TidyRow {
                period_ending: NaiveDate::from_ymd_opt(2024, 3, 31),
                revenue: "90,753".to_string(),
                net_income: "23,636".to_string(),
                extra: Vec::new(),
                year: 2024,
                quarter: "Q1".to_string(),
            }],
        )
    }

    /// Serves one canned JSON response and returns the full request text.
    async fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_ascii_lowercase();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}/v1"), handle)
    }

    fn local_generator(base_url: &str) -> ChatReportGenerator {
        let client = Client::builder().no_proxy().build().unwrap();
        ChatReportGenerator::with_client(client, "sk-test").with_base_url(base_url)
    }

    #[test]
    fn test_new_builds_client_with_defaults() {
        let generator = ChatReportGenerator::new("key").unwrap();
        assert_eq!(generator.model, DEFAULT_MODEL);
        assert_eq!(generator.endpoint(), format!("{DEFAULT_BASE_URL}/chat/completions"));
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(120));
    }

    #[test]
    fn test_prompt_embeds_table_json() {
        let generator = ChatReportGenerator::new("key").unwrap();
        let prompt = generator.render_prompt(&sample_table()).unwrap();
        assert!(prompt.starts_with("You are a financial analyst."));
        assert!(prompt.contains(r#""Period Ending": "2024-03-31""#));
        assert!(!prompt.contains(TABLE_PLACEHOLDER));

        let custom = generator.with_template("Summarize: {table}");
        assert!(
            custom
                .render_prompt(&sample_table())
                .unwrap()
                .starts_with("Summarize: [")
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let generator = ChatReportGenerator::new("secret_key_12345").unwrap();
        let debug_str = format!("{:?}", generator);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let generator = ChatReportGenerator::new("key")
            .unwrap()
            .with_base_url("http://localhost:8000/v1/");
        assert_eq!(generator.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Revenue grew."}}]}"#;
        let (base_url, server) = serve_once("200 OK", body).await;

        let report = local_generator(&base_url)
            .generate(&sample_table())
            .await
            .unwrap();
        assert_eq!(report, "Revenue grew.");

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(lower.starts_with("post /v1/chat/completions"));
        assert!(lower.contains("authorization: bearer sk-test"));
        assert!(request.contains(r#""model":"gpt-4o-mini""#));
        assert!(request.contains("90,753"));
    }

    #[tokio::test]
    async fn test_api_failure_is_reported_as_is() {
        let body = r#"{"error":{"message":"invalid api key"}}"#;
        let (base_url, server) = serve_once("401 Unauthorized", body).await;

        let err = local_generator(&base_url)
            .generate(&sample_table())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ReportError::Api {
                status: 401,
                message: body.to_string()
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_choices_is_empty_response() {
        let (base_url, server) = serve_once("200 OK", r#"{"choices":[]}"#).await;

        let err = local_generator(&base_url)
            .generate(&sample_table())
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::EmptyResponse);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_key_is_missing_credential() {
        let err = ChatReportGenerator::new("  ")
            .unwrap()
            .generate(&sample_table())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingCredential(_)));
    }
}
