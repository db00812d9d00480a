//! Dashboard widgets.
//!
//! The dashboard shows a handful of counters about the current session.  Each
//! counter is rendered as a [`StatsWidget`]; [`DashboardStats`] decides which
//! widgets to show and what goes in them.

use serde::Serialize;

use crate::chat::SessionStats;

/// Direction of a widget's change indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[default]
    Up,
    Down,
}

/// One dashboard tile: a title, a value, and an optional change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsWidget {
    pub title: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
    pub trend: Trend,
}

impl StatsWidget {
    /// A widget with no change indicator.
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            change: None,
            trend: Trend::Up,
        }
    }

    /// Attach a change indicator.
    pub fn with_change(mut self, change: impl Into<String>, trend: Trend) -> Self {
        self.change = Some(change.into());
        self.trend = trend;
        self
    }
}

/// The numbers behind the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_documents: usize,
    pub queries: usize,
    pub chats: usize,
    pub api_calls: u64,
    pub failed_calls: u64,
}

impl DashboardStats {
    /// Derive dashboard numbers from a session's statistics.
    pub fn from_session(stats: &SessionStats) -> Self {
        Self {
            total_documents: stats.documents_uploaded,
            queries: stats.user_messages,
            chats: stats.chats,
            api_calls: stats.requests,
            failed_calls: stats.failed_requests,
        }
    }

    /// The widgets to render, in display order.
    pub fn widgets(&self) -> Vec<StatsWidget> {
        let mut documents =
            StatsWidget::new("Total Documents", format_count(self.total_documents as u64));
        if self.total_documents > 0 {
            documents = documents.with_change(format!("+{}", self.total_documents), Trend::Up);
        }
        let mut api_calls = StatsWidget::new("API Calls", format_count(self.api_calls));
        if self.failed_calls > 0 {
            api_calls = api_calls.with_change(format!("{} failed", self.failed_calls), Trend::Down);
        }
        vec![
            documents,
            StatsWidget::new("Active Queries", format_count(self.queries as u64)),
            StatsWidget::new("Chats", format_count(self.chats as u64)),
            api_calls,
        ]
    }
}

/// Format a count the way the dashboard shows it: `1,234`, then `12.4K`, `3.1M`.
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 10_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else if n >= 1_000 {
        format!("{},{:03}", n / 1_000, n % 1_000)
    } else {
        n.to_string()
    }
}
