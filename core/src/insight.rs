//! AI-written summary of the most recent week.
//!
//! The prompt is built locally from at most [`PROMPT_WINDOW`] records and sent
//! once to a [`CompletionService`]. Whatever text comes back is shown as-is.
//! Failures never escape: the caller always gets something to display.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, error};

use crate::error::Result;
use crate::models::{HealthRecord, WEIGHT_UNIT};

pub const MIN_RECORDS: usize = 3;
pub const PROMPT_WINDOW: usize = 7;
pub const DEFAULT_LANGUAGE: &str = "Chinese";

pub const NOT_ENOUGH_DATA: &str = "请至少记录3天的数据后再使用AI分析。";
pub const FALLBACK_MESSAGE: &str = "生成建议时出错了，请稍后再试。";
pub const BUSY_MESSAGE: &str = "分析正在进行中，请稍候。";

/// A single-turn request: one role, one block of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub role: String,
    pub text: String,
}

/// External text-completion endpoint. No streaming, no conversation state.
#[allow(async_fn_in_trait)]
pub trait CompletionService {
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum InsightOutcome {
    /// Text returned by the service, verbatim.
    Generated(String),
    /// The service failed; this is the fixed local message.
    Fallback(String),
    /// Not attempted; the reason is for the user.
    Refused(String),
}

impl InsightOutcome {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Generated(m) | Self::Fallback(m) | Self::Refused(m) => m,
        }
    }
}

#[derive(Serialize)]
struct PromptEntry<'a> {
    date: String,
    morning: f64,
    evening: f64,
    bm: String,
    notes: &'a str,
}

/// The refusal for a history too short to analyse, if it applies.
///
/// Needs no service, so callers can check it before setting one up.
#[must_use]
pub fn check_enough_data(records: &[HealthRecord]) -> Option<InsightOutcome> {
    (records.len() < MIN_RECORDS).then(|| InsightOutcome::Refused(NOT_ENOUGH_DATA.to_string()))
}

/// Build the prompt from the most recent records, newest first as held.
#[must_use]
pub fn build_prompt(records: &[HealthRecord], language: &str) -> Prompt {
    let entries: Vec<PromptEntry<'_>> = records
        .iter()
        .take(PROMPT_WINDOW)
        .map(|r| PromptEntry {
            date: r.date.format("%Y-%m-%d").to_string(),
            morning: r.morning_weight,
            evening: r.evening_weight,
            bm: if r.has_bm {
                format!("Yes ({} times)", r.bm_count)
            } else {
                "No".to_string()
            },
            notes: r.notes.as_deref().unwrap_or_default(),
        })
        .collect();
    let data = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());

    let text = format!(
        "As a health advisor, analyse the user's body weight and bowel movement records \
         from the past week and give brief, positive and professional advice.\n\
         Focus on: whether the morning/evening weight swing is too large (ideally within \
         1-2 {WEIGHT_UNIT}), bowel movement frequency, and the long-term weight trend.\n\
         Weights are in {WEIGHT_UNIT} (1 {WEIGHT_UNIT} = 0.5 kg).\n\
         Data: {data}\n\
         Language: {language}\n\
         Output format: plain advice text in clear paragraphs."
    );

    Prompt {
        role: "user".to_string(),
        text,
    }
}

/// Runs at most one analysis at a time and remembers the last good answer
/// until it is cleared for regeneration.
pub struct InsightRequester {
    language: String,
    in_flight: AtomicBool,
    current: Mutex<Option<String>>,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl InsightRequester {
    #[must_use]
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            in_flight: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    /// Restore a previously generated insight, e.g. from a cache file.
    #[must_use]
    pub fn with_current(self, text: Option<String>) -> Self {
        self.set_current(text);
        self
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.current.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        self.set_current(None);
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn set_current(&self, text: Option<String>) {
        if let Ok(mut current) = self.current.lock() {
            *current = text;
        }
    }

    /// Ask the service once. Never returns an error.
    pub async fn request<C: CompletionService>(
        &self,
        service: &C,
        records: &[HealthRecord],
    ) -> InsightOutcome {
        if let Some(refused) = check_enough_data(records) {
            return refused;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return InsightOutcome::Refused(BUSY_MESSAGE.to_string());
        }
        let _guard = InFlight(&self.in_flight);

        let prompt = build_prompt(records, &self.language);
        debug!(chars = prompt.text.len(), "requesting insight");

        match service.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                self.set_current(Some(text.clone()));
                InsightOutcome::Generated(text)
            }
            Ok(_) => {
                error!("completion service returned an empty response");
                InsightOutcome::Fallback(FALLBACK_MESSAGE.to_string())
            }
            Err(e) => {
                error!("insight request failed: {e}");
                InsightOutcome::Fallback(FALLBACK_MESSAGE.to_string())
            }
        }
    }
}
