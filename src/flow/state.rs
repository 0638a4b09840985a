//! Flow state machine: position, saved answers, overlays and slide insertion.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{
    ChoiceOption, FeedbackConfig, InsertPlacement, InsertSlideData, ResponseConfig,
    SelectionBehavior,
};
use super::slide::Slide;
use crate::error::FlowError;

/// What a forward-moving operation did to the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    /// A response overlay is now showing; the flow stays put until acknowledged.
    ResponsePresented { configuration: ResponseConfig },
    /// Moved from one slide to the next. `inserted` lists slide ids spliced in first.
    Advanced {
        from: usize,
        to: usize,
        inserted: Vec<String>,
    },
    /// Advanced while on the last slide; the host should close the flow.
    Completed,
}

/// Read model of the flow for renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub current_index: usize,
    pub slide_count: usize,
    pub current_slide: Slide,
    pub slide_ids: Vec<String>,
    pub current_selections: Vec<ChoiceOption>,
    pub show_response_view: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_configuration: Option<ResponseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackConfig>,
    pub is_first: bool,
    pub is_last: bool,
    /// Fraction of the flow reached, in `(0, 1]`.
    pub progress: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// The onboarding flow controller.
///
/// `current_index` always points into `slides`, which is never empty.
#[derive(Debug, Clone)]
pub struct FlowState {
    slides: Vec<Slide>,
    current_index: usize,
    saved_selections: HashMap<String, Vec<ChoiceOption>>,
    show_response_view: bool,
    response_configuration: Option<ResponseConfig>,
    completed_at: Option<DateTime<Utc>>,
}

impl FlowState {
    /// Start a flow at its first slide. Slide ids must be unique.
    pub fn new(slides: Vec<Slide>) -> Result<Self, FlowError> {
        if slides.is_empty() {
            return Err(FlowError::EmptyFlow);
        }
        let mut seen = HashSet::new();
        for slide in &slides {
            if !seen.insert(slide.id()) {
                return Err(FlowError::DuplicateSlideId {
                    id: slide.id().to_string(),
                });
            }
        }
        Ok(Self {
            slides,
            current_index: 0,
            saved_selections: HashMap::new(),
            show_response_view: false,
            response_configuration: None,
            completed_at: None,
        })
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_slide(&self) -> &Slide {
        &self.slides[self.current_index]
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index == self.slides.len() - 1
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn show_response_view(&self) -> bool {
        self.show_response_view
    }

    pub fn response_configuration(&self) -> Option<&ResponseConfig> {
        self.response_configuration.as_ref()
    }

    pub fn saved_selections(&self) -> &HashMap<String, Vec<ChoiceOption>> {
        &self.saved_selections
    }

    /// Saved answer for a slide; empty when it was never answered.
    pub fn selections(&self, slide_id: &str) -> &[ChoiceOption] {
        self.saved_selections
            .get(slide_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn current_selections(&self) -> &[ChoiceOption] {
        self.selections(self.current_slide().id())
    }

    /// Feedback of the first current selection that carries one.
    pub fn current_feedback(&self) -> Option<&FeedbackConfig> {
        self.current_selections()
            .iter()
            .find_map(|o| o.feedback_configuration.as_ref())
    }

    /// Record the answer for the current slide, then either present its
    /// response overlay or move on.
    pub fn submit_answer(&mut self, selections: Vec<ChoiceOption>) -> Transition {
        let slide_id = self.current_slide().id().to_string();
        let response = selections
            .iter()
            .find_map(|o| o.response_configuration.clone());
        self.saved_selections.insert(slide_id, selections);

        match response {
            Some(configuration) => {
                self.response_configuration = Some(configuration.clone());
                self.show_response_view = true;
                Transition::ResponsePresented { configuration }
            }
            None => self.advance(),
        }
    }

    /// Dismiss the response overlay and move on.
    pub fn acknowledge_response(&mut self) -> Transition {
        self.show_response_view = false;
        self.response_configuration = None;
        self.advance()
    }

    /// Step back one slide. Returns `false` on the first slide.
    ///
    /// Saved answers and inserted slides are kept.
    pub fn go_back(&mut self) -> bool {
        if self.current_index > 0 {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }

    /// Toggle `option` in the current slide's selection under `behavior`.
    pub fn toggle_selection(&mut self, option: ChoiceOption, behavior: SelectionBehavior) {
        let slide_id = self.current_slide().id().to_string();
        let current = self.saved_selections.entry(slide_id).or_default();

        match behavior {
            SelectionBehavior::Single { .. } => {
                if current.len() == 1 && current[0] == option {
                    current.clear();
                } else {
                    *current = vec![option];
                }
            }
            SelectionBehavior::Multi => {
                if let Some(pos) = current.iter().position(|o| *o == option) {
                    current.remove(pos);
                } else {
                    current.push(option);
                }
            }
        }
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            current_index: self.current_index,
            slide_count: self.slides.len(),
            current_slide: self.current_slide().clone(),
            slide_ids: self.slides.iter().map(|s| s.id().to_string()).collect(),
            current_selections: self.current_selections().to_vec(),
            show_response_view: self.show_response_view,
            response_configuration: self.response_configuration.clone(),
            feedback: self.current_feedback().cloned(),
            is_first: self.is_first(),
            is_last: self.is_last(),
            progress: (self.current_index + 1) as f32 / self.slides.len() as f32,
            completed_at: self.completed_at,
        }
    }

    fn advance(&mut self) -> Transition {
        let inserted = self.insert_slides_for_current();

        if self.current_index < self.slides.len() - 1 {
            let from = self.current_index;
            self.current_index += 1;
            Transition::Advanced {
                from,
                to: self.current_index,
                inserted,
            }
        } else {
            debug_assert!(inserted.is_empty());
            self.completed_at.get_or_insert_with(Utc::now);
            Transition::Completed
        }
    }

    /// Splice in the slides requested by the current slide's saved answer.
    ///
    /// Selections are walked last-to-first and each insert list first-to-last;
    /// every target index is computed against the list as already mutated.
    fn insert_slides_for_current(&mut self) -> Vec<String> {
        let slide_id = self.current_slide().id().to_string();
        let Some(selections) = self.saved_selections.get(&slide_id) else {
            return Vec::new();
        };

        let pending: Vec<InsertSlideData> = selections
            .iter()
            .rev()
            .filter_map(|o| o.insert_configuration.as_ref())
            .flat_map(|inserts| inserts.iter().cloned())
            .collect();

        let mut inserted = Vec::new();
        for data in pending {
            let new_id = data.slide.id().to_string();
            if self.slides.iter().any(|s| s.id() == new_id) {
                tracing::warn!(slide_id = %new_id, "Skipping insert of slide already in flow");
                continue;
            }
            let Some(at) = self.insertion_index(&data.placement) else {
                tracing::debug!(
                    slide_id = %new_id,
                    placement = ?data.placement,
                    "Insert target not found ahead of current slide"
                );
                continue;
            };
            self.slides.insert(at, data.slide);
            inserted.push(new_id);
        }
        inserted
    }

    fn insertion_index(&self, placement: &InsertPlacement) -> Option<usize> {
        match placement {
            InsertPlacement::Next => Some(self.current_index + 1),
            InsertPlacement::AfterCount { count } => {
                Some(self.current_index.saturating_add(*count).min(self.slides.len()))
            }
            InsertPlacement::AfterSlide { slide_id } => self.slides[self.current_index + 1..]
                .iter()
                .position(|s| s.id() == slide_id)
                .map(|offset| self.current_index + 1 + offset + 1),
        }
    }
}
