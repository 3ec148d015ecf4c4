use chrono::{DateTime, Utc};

/// One article reference taken from a feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Readable text pulled from an article page
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleContent {
    pub url: String,
    pub raw_text: String,
}

/// Record written to the document store, one per processed entry
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub url: String,
    pub title: String,
    pub summary_text: String,
}

impl ArticleContent {
    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
    }

    /// Character count, for logging
    pub fn char_len(&self) -> usize {
        self.raw_text.chars().count()
    }
}

impl Summary {
    pub fn new(entry: &FeedEntry, summary_text: String) -> Self {
        Self {
            url: entry.url.clone(),
            title: entry.title.clone(),
            summary_text,
        }
    }

    /// Get a preview of the summary (first N characters)
    pub fn preview(&self, max_len: usize) -> String {
        if max_len == 0 {
            return String::new();
        }

        match self.summary_text.char_indices().nth(max_len) {
            Some((idx, _)) => format!("{}...", &self.summary_text[..idx]),
            None => self.summary_text.clone(),
        }
    }
}
