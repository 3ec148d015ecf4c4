use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ArticleStore;
use crate::config::AppConfig;
use crate::feed::Summary;
use crate::{Error, Result};

const PAGES_URL: &str = "https://api.notion.com/v1/pages";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion caps a single rich-text object at 2000 characters
const MAX_TEXT_CHARS: usize = 2000;

// Column names of the target database
const TITLE_PROPERTY: &str = "Title";
const SUMMARY_PROPERTY: &str = "Summary";
const URL_PROPERTY: &str = "URL";

#[derive(Deserialize)]
struct NotionError {
    code: Option<String>,
    message: Option<String>,
}

/// Split text into rich-text objects of at most `MAX_TEXT_CHARS` characters
fn rich_text(content: &str) -> Vec<Value> {
    let chars: Vec<char> = content.chars().collect();
    chars
        .chunks(MAX_TEXT_CHARS)
        .map(|chunk| {
            let text: String = chunk.iter().collect();
            json!({ "type": "text", "text": { "content": text } })
        })
        .collect()
}

/// Build the create-page payload for a summary
fn page_payload(database_id: &str, summary: &Summary) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            TITLE_PROPERTY: { "title": rich_text(&summary.title) },
            SUMMARY_PROPERTY: { "rich_text": rich_text(&summary.summary_text) },
            URL_PROPERTY: { "url": summary.url },
        }
    })
}

fn validate(summary: &Summary) -> Result<()> {
    let missing: Vec<&str> = [
        ("title", summary.title.as_str()),
        ("url", summary.url.as_str()),
        ("summary", summary.summary_text.as_str()),
    ]
    .iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| *name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::StoreWrite(format!(
            "Missing required field(s) {} for {}",
            missing.join(", "),
            summary.url
        )))
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<NotionError>(body) {
        Ok(NotionError { code, message }) => format!(
            "Notion API returned HTTP {}: {} ({})",
            status,
            message.unwrap_or_else(|| "no message".to_string()),
            code.unwrap_or_else(|| "unknown".to_string())
        ),
        Err(_) => format!("Notion API returned HTTP {}", status),
    }
}

/// Writes summaries as pages of a Notion database
pub struct NotionWriter {
    client: Client,
    api_key: String,
    database_id: String,
}

impl NotionWriter {
    pub fn new(config: &AppConfig, client: Client) -> Result<Self> {
        if config.notion.api_key.trim().is_empty() || config.notion.database_id.trim().is_empty() {
            return Err(Error::Config("Notion API key or database ID not configured".to_string()));
        }

        Ok(Self {
            client,
            api_key: config.notion.api_key.clone(),
            database_id: config.notion.database_id.clone(),
        })
    }

    /// Create a Notion page for the summary
    pub async fn create_page(&self, summary: &Summary) -> Result<()> {
        validate(summary)?;

        let response = self.client
            .post(PAGES_URL)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&page_payload(&self.database_id, summary))
            .send()
            .await
            .map_err(|e| Error::StoreWrite(format!("Notion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StoreWrite(describe_failure(status, &body)));
        }

        tracing::info!("Created Notion page for: {}", summary.title);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArticleStore for NotionWriter {
    async fn write(&self, summary: &Summary) -> Result<()> {
        self.create_page(summary).await
    }
}
