//! Slide variants: one record per kind, combined into [`Slide`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{
    ChoiceOption, FeedbackConfig, InsertSlideData, ResponseConfig, SelectionBehavior,
};

/// One screen of the onboarding flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slide {
    Regular(RegularSlide),
    MultipleChoice(MultipleChoiceSlide),
    YesNo(YesNoSlide),
    Rating(RatingSlide),
    TextInput(TextInputSlide),
    DatePicker(DatePickerSlide),
    Picker(PickerSlide),
    PrimaryAction(PrimaryActionSlide),
}

/// Discriminant of a [`Slide`], handy for logging and renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideKind {
    Regular,
    MultipleChoice,
    YesNo,
    Rating,
    TextInput,
    DatePicker,
    Picker,
    PrimaryAction,
}

impl std::fmt::Display for SlideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Regular => "regular",
            Self::MultipleChoice => "multiple_choice",
            Self::YesNo => "yes_no",
            Self::Rating => "rating",
            Self::TextInput => "text_input",
            Self::DatePicker => "date_picker",
            Self::Picker => "picker",
            Self::PrimaryAction => "primary_action",
        };
        write!(f, "{s}")
    }
}

impl Slide {
    pub fn id(&self) -> &str {
        match self {
            Self::Regular(s) => &s.id,
            Self::MultipleChoice(s) => &s.id,
            Self::YesNo(s) => &s.id,
            Self::Rating(s) => &s.id,
            Self::TextInput(s) => &s.id,
            Self::DatePicker(s) => &s.id,
            Self::Picker(s) => &s.id,
            Self::PrimaryAction(s) => &s.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Regular(s) => &s.title,
            Self::MultipleChoice(s) => &s.title,
            Self::YesNo(s) => &s.title,
            Self::Rating(s) => &s.title,
            Self::TextInput(s) => &s.title,
            Self::DatePicker(s) => &s.title,
            Self::Picker(s) => &s.title,
            Self::PrimaryAction(s) => &s.title,
        }
    }

    pub fn kind(&self) -> SlideKind {
        match self {
            Self::Regular(_) => SlideKind::Regular,
            Self::MultipleChoice(_) => SlideKind::MultipleChoice,
            Self::YesNo(_) => SlideKind::YesNo,
            Self::Rating(_) => SlideKind::Rating,
            Self::TextInput(_) => SlideKind::TextInput,
            Self::DatePicker(_) => SlideKind::DatePicker,
            Self::Picker(_) => SlideKind::Picker,
            Self::PrimaryAction(_) => SlideKind::PrimaryAction,
        }
    }

    /// Options the user can pick from. Empty for slides whose answer is free
    /// input (text, date) or that take no answer at all.
    pub fn options(&self) -> Vec<ChoiceOption> {
        match self {
            Self::MultipleChoice(s) => s.options.clone(),
            Self::YesNo(s) => vec![s.yes.clone(), s.no.clone()],
            Self::Rating(s) => s.options(),
            Self::Picker(s) => s.options.clone(),
            Self::Regular(_) | Self::TextInput(_) | Self::DatePicker(_) | Self::PrimaryAction(_) => {
                Vec::new()
            }
        }
    }

    pub fn find_option(&self, option_id: &str) -> Option<ChoiceOption> {
        match self {
            Self::MultipleChoice(s) => s.options.iter().find(|o| o.id == option_id).cloned(),
            Self::YesNo(s) => [&s.yes, &s.no]
                .into_iter()
                .find(|o| o.id == option_id)
                .cloned(),
            Self::Rating(s) => option_id
                .parse::<u8>()
                .ok()
                .filter(|value| (1..=s.scale).contains(value))
                .map(|value| s.option_for(value)),
            Self::Picker(s) => s.options.iter().find(|o| o.id == option_id).cloned(),
            _ => None,
        }
    }

    /// Selection policy for slides with selectable options.
    pub fn selection_behavior(&self) -> Option<SelectionBehavior> {
        match self {
            Self::MultipleChoice(s) => Some(s.selection_behavior),
            Self::YesNo(s) => Some(s.selection_behavior),
            Self::Rating(_) => Some(SelectionBehavior::Single { auto_advance: true }),
            Self::Picker(_) => Some(SelectionBehavior::Single { auto_advance: false }),
            _ => None,
        }
    }
}

/// Plain content slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularSlide {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleChoiceSlide {
    pub id: String,
    pub title: String,
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub selection_behavior: SelectionBehavior,
}

fn default_yes() -> ChoiceOption {
    ChoiceOption::flag("yes", true)
}

fn default_no() -> ChoiceOption {
    ChoiceOption::flag("no", false)
}

fn auto_advance_single() -> SelectionBehavior {
    SelectionBehavior::Single { auto_advance: true }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YesNoSlide {
    pub id: String,
    pub title: String,
    #[serde(default = "default_yes")]
    pub yes: ChoiceOption,
    #[serde(default = "default_no")]
    pub no: ChoiceOption,
    #[serde(default = "auto_advance_single")]
    pub selection_behavior: SelectionBehavior,
}

impl YesNoSlide {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            yes: default_yes(),
            no: default_no(),
            selection_behavior: auto_advance_single(),
        }
    }
}

fn default_scale() -> u8 {
    5
}

/// Maps a range of ratings to the payloads attached to those answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRule {
    pub min: u8,
    pub max: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<Vec<InsertSlideData>>,
}

impl RatingRule {
    pub fn range(min: u8, max: u8) -> Self {
        Self {
            min,
            max,
            response: None,
            feedback: None,
            insert: None,
        }
    }

    pub fn contains(&self, rating: u8) -> bool {
        (self.min..=self.max).contains(&rating)
    }
}

/// A 1..=`scale` rating. Payloads for each answer come from `rules`; the first
/// matching rule that carries a given payload wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSlide {
    pub id: String,
    pub title: String,
    #[serde(default = "default_scale")]
    pub scale: u8,
    #[serde(default)]
    pub rules: Vec<RatingRule>,
}

impl RatingSlide {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            scale: default_scale(),
            rules: Vec::new(),
        }
    }

    pub fn get_response_configuration(&self, rating: u8) -> Option<ResponseConfig> {
        self.matching(rating).find_map(|r| r.response.clone())
    }

    pub fn get_feedback_configuration(&self, rating: u8) -> Option<FeedbackConfig> {
        self.matching(rating).find_map(|r| r.feedback.clone())
    }

    pub fn get_insert_configuration(&self, rating: u8) -> Option<Vec<InsertSlideData>> {
        self.matching(rating).find_map(|r| r.insert.clone())
    }

    /// The option for `rating`, with its rule payloads attached.
    pub fn option_for(&self, rating: u8) -> ChoiceOption {
        let mut option = ChoiceOption::rating(rating);
        option.response_configuration = self.get_response_configuration(rating);
        option.feedback_configuration = self.get_feedback_configuration(rating);
        option.insert_configuration = self.get_insert_configuration(rating);
        option
    }

    pub fn options(&self) -> Vec<ChoiceOption> {
        (1..=self.scale).map(|rating| self.option_for(rating)).collect()
    }

    fn matching(&self, rating: u8) -> impl Iterator<Item = &RatingRule> {
        self.rules.iter().filter(move |r| r.contains(rating))
    }
}

/// Free-text answer, submitted as [`ChoiceOption::text`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextInputSlide {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Date answer, submitted as [`ChoiceOption::date`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatePickerSlide {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_date: Option<NaiveDate>,
}

/// Wheel-style picker; always a single selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickerSlide {
    pub id: String,
    pub title: String,
    pub options: Vec<ChoiceOption>,
}

fn default_action_title() -> String {
    "Continue".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryActionSlide {
    pub id: String,
    pub title: String,
    #[serde(default = "default_action_title")]
    pub button_title: String,
}
