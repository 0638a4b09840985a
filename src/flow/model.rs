//! Answer options and the payloads they carry.

use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::slide::Slide;

/// What an option shows to the user and records as the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OptionContent {
    Text(String),
    Rating(u8),
    Date(NaiveDate),
    Flag(bool),
}

impl std::fmt::Display for OptionContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Rating(value) => write!(f, "{value}"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Flag(true) => write!(f, "yes"),
            Self::Flag(false) => write!(f, "no"),
        }
    }
}

/// A selectable answer.
///
/// Identity is the `id` alone: two options with the same id compare equal even
/// when their content or payloads differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub content: OptionContent,
    /// Full-screen response shown instead of advancing immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_configuration: Option<ResponseConfig>,
    /// Inline feedback panel shown on the current slide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_configuration: Option<FeedbackConfig>,
    /// Slides to splice into the flow once this answer is submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_configuration: Option<Vec<InsertSlideData>>,
}

impl ChoiceOption {
    pub fn new(id: impl Into<String>, content: OptionContent) -> Self {
        Self {
            id: id.into(),
            content,
            response_configuration: None,
            feedback_configuration: None,
            insert_configuration: None,
        }
    }

    /// A text answer; the text doubles as the id.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(text.clone(), OptionContent::Text(text))
    }

    pub fn rating(value: u8) -> Self {
        Self::new(value.to_string(), OptionContent::Rating(value))
    }

    /// A date answer, identified by its ISO-8601 form.
    pub fn date(date: NaiveDate) -> Self {
        Self::new(date.format("%Y-%m-%d").to_string(), OptionContent::Date(date))
    }

    pub fn flag(id: impl Into<String>, value: bool) -> Self {
        Self::new(id, OptionContent::Flag(value))
    }

    pub fn with_response(mut self, response: ResponseConfig) -> Self {
        self.response_configuration = Some(response);
        self
    }

    pub fn with_feedback(mut self, feedback: FeedbackConfig) -> Self {
        self.feedback_configuration = Some(feedback);
        self
    }

    pub fn with_insert(mut self, inserts: Vec<InsertSlideData>) -> Self {
        self.insert_configuration = Some(inserts);
        self
    }
}

impl PartialEq for ChoiceOption {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChoiceOption {}

impl Hash for ChoiceOption {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn default_button_title() -> String {
    "Continue".to_string()
}

/// A modal response presented in front of the flow until acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseConfig {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default = "default_button_title")]
    pub button_title: String,
}

impl ResponseConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            button_title: default_button_title(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

/// Tone of an inline feedback panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTone {
    Positive,
    #[default]
    Neutral,
    Negative,
}

/// Inline feedback shown alongside the current slide's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub tone: FeedbackTone,
}

impl FeedbackConfig {
    pub fn new(title: impl Into<String>, tone: FeedbackTone) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            tone,
        }
    }
}

/// Where an inserted slide lands, relative to the slide being answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InsertPlacement {
    /// Directly after the current slide.
    Next,
    /// `count` slides after the current one, clamped to the end of the flow.
    AfterCount { count: usize },
    /// Directly after the first slide with this id ahead of the current one.
    AfterSlide { slide_id: String },
}

/// A slide to splice into the flow and where to put it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertSlideData {
    pub placement: InsertPlacement,
    pub slide: Slide,
}

impl InsertSlideData {
    pub fn new(placement: InsertPlacement, slide: Slide) -> Self {
        Self { placement, slide }
    }
}

/// How many options a slide accepts and whether choosing one moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionBehavior {
    Single {
        #[serde(default)]
        auto_advance: bool,
    },
    Multi,
}

impl Default for SelectionBehavior {
    fn default() -> Self {
        Self::Single { auto_advance: false }
    }
}

impl SelectionBehavior {
    pub fn auto_advances(&self) -> bool {
        matches!(self, Self::Single { auto_advance: true })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn equality_is_by_id_only() {
        let plain = ChoiceOption::text("coffee");
        let decorated = ChoiceOption::new("coffee", OptionContent::Text("Coffee ☕".to_string()))
            .with_response(ResponseConfig::new("Great pick"));
        assert_eq!(plain, decorated);

        let mut set = HashSet::new();
        set.insert(plain);
        assert!(!set.insert(decorated));
        assert!(set.insert(ChoiceOption::text("tea")));
    }

    #[test]
    fn date_option_uses_iso_id() {
        let date = NaiveDate::from_ymd_opt(1990, 4, 2).unwrap();
        let option = ChoiceOption::date(date);
        assert_eq!(option.id, "1990-04-02");
        assert_eq!(option.content.to_string(), "1990-04-02");
    }

    #[test]
    fn placement_serde_shape() {
        let json = serde_json::to_value(InsertPlacement::AfterCount { count: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "after_count", "count": 2}));

        let parsed: InsertPlacement =
            serde_json::from_str(r#"{"type": "after_slide", "slide_id": "goals"}"#).unwrap();
        assert_eq!(
            parsed,
            InsertPlacement::AfterSlide {
                slide_id: "goals".to_string()
            }
        );
    }

    #[test]
    fn response_button_defaults_to_continue() {
        let parsed: ResponseConfig = serde_json::from_str(r#"{"title": "Nice"}"#).unwrap();
        assert_eq!(parsed.button_title, "Continue");
        assert!(parsed.subtitle.is_none());
    }

    #[test]
    fn selection_behavior_defaults() {
        assert_eq!(
            SelectionBehavior::default(),
            SelectionBehavior::Single { auto_advance: false }
        );
        let parsed: SelectionBehavior = serde_json::from_str(r#"{"type": "single"}"#).unwrap();
        assert!(!parsed.auto_advances());
        let parsed: SelectionBehavior =
            serde_json::from_str(r#"{"type": "single", "auto_advance": true}"#).unwrap();
        assert!(parsed.auto_advances());
        assert!(!SelectionBehavior::Multi.auto_advances());
    }

    #[test]
    fn payloads_omitted_when_absent() {
        let json = serde_json::to_value(ChoiceOption::rating(4)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "4", "content": {"type": "rating", "value": 4}})
        );
    }
}
