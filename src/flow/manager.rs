//! FlowManager: shares one flow between a renderer and its observers, and
//! owns the delayed auto-advance task.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::definition::HeaderConfig;
use super::model::{ChoiceOption, ResponseConfig, SelectionBehavior};
use super::slide::{Slide, SlideKind};
use super::state::{FlowSnapshot, FlowState, Transition};
use crate::config::FlowConfig;
use crate::error::FlowError;

/// Snapshot plus the session-level data a renderer needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStatus {
    pub session_id: Uuid,
    pub header: HeaderConfig,
    #[serde(flatten)]
    pub snapshot: FlowSnapshot,
}

/// Everything the host needs once the user finishes the flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub session_id: Uuid,
    pub selections: HashMap<String, Vec<ChoiceOption>>,
    pub completed_at: DateTime<Utc>,
}

/// Events broadcast to observers after each change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// Full state, sent when an observer connects or falls behind.
    Sync { status: FlowStatus },
    SelectionChanged {
        slide_id: String,
        selections: Vec<ChoiceOption>,
    },
    ResponsePresented {
        slide_id: String,
        configuration: ResponseConfig,
    },
    ResponseDismissed { slide_id: String },
    SlidesInserted {
        after_slide_id: String,
        slide_ids: Vec<String>,
    },
    Advanced {
        from: usize,
        to: usize,
        slide_id: String,
    },
    WentBack { to: usize, slide_id: String },
    Completed { summary: CompletionSummary },
}

/// State shared with the auto-advance task.
struct Shared {
    session_id: Uuid,
    state: RwLock<FlowState>,
    tx: broadcast::Sender<FlowEvent>,
    /// Bumped by every user interaction; a scheduled advance only runs if the
    /// epoch it captured is still current.
    epoch: AtomicU64,
}

impl Shared {
    /// Invalidate any scheduled advance. Called with the state write lock
    /// held, so the returned epoch is ordered against every other interaction.
    fn interrupt(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn submit_locked(&self, state: &mut FlowState, selections: Vec<ChoiceOption>) -> Transition {
        let slide_id = state.current_slide().id().to_string();
        info!(
            session_id = %self.session_id,
            slide_id = %slide_id,
            count = selections.len(),
            "Answer submitted"
        );
        let transition = state.submit_answer(selections);
        let _ = self.tx.send(FlowEvent::SelectionChanged {
            slide_id: slide_id.clone(),
            selections: state.selections(&slide_id).to_vec(),
        });
        self.publish(&slide_id, &transition, state);
        transition
    }

    fn publish(&self, slide_id: &str, transition: &Transition, state: &FlowState) {
        match transition {
            Transition::ResponsePresented { configuration } => {
                debug!(session_id = %self.session_id, slide_id, "Response view presented");
                let _ = self.tx.send(FlowEvent::ResponsePresented {
                    slide_id: slide_id.to_string(),
                    configuration: configuration.clone(),
                });
            }
            Transition::Advanced { from, to, inserted } => {
                if !inserted.is_empty() {
                    info!(
                        session_id = %self.session_id,
                        after = slide_id,
                        inserted = ?inserted,
                        "Slides inserted"
                    );
                    let _ = self.tx.send(FlowEvent::SlidesInserted {
                        after_slide_id: slide_id.to_string(),
                        slide_ids: inserted.clone(),
                    });
                }
                let _ = self.tx.send(FlowEvent::Advanced {
                    from: *from,
                    to: *to,
                    slide_id: state.current_slide().id().to_string(),
                });
            }
            Transition::Completed => {
                let summary = CompletionSummary {
                    session_id: self.session_id,
                    selections: state.saved_selections().clone(),
                    completed_at: state.completed_at().unwrap_or_else(Utc::now),
                };
                info!(
                    session_id = %self.session_id,
                    answered = summary.selections.len(),
                    "Onboarding flow completed"
                );
                let _ = self.tx.send(FlowEvent::Completed { summary });
            }
        }
    }

    async fn auto_advance(&self, epoch: u64, slide_id: &str) {
        let mut state = self.state.write().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(session_id = %self.session_id, slide_id, "Auto-advance superseded");
            return;
        }
        if state.current_slide().id() != slide_id || state.show_response_view() {
            debug!(session_id = %self.session_id, slide_id, "Auto-advance no longer applies");
            return;
        }
        let selections = state.current_selections().to_vec();
        self.submit_locked(&mut state, selections);
    }
}

/// Owns a running flow. Every operation is async only because the state sits
/// behind a lock shared with the auto-advance task.
pub struct FlowManager {
    shared: Arc<Shared>,
    header: HeaderConfig,
    config: FlowConfig,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl FlowManager {
    pub fn new(state: FlowState, header: HeaderConfig, config: FlowConfig) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(config.event_capacity);
        let session_id = Uuid::new_v4();
        info!(
            session_id = %session_id,
            slides = state.slides().len(),
            "Onboarding flow started"
        );
        Arc::new(Self {
            shared: Arc::new(Shared {
                session_id,
                state: RwLock::new(state),
                tx,
                epoch: AtomicU64::new(0),
            }),
            header,
            config,
            pending: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    pub fn header(&self) -> &HeaderConfig {
        &self.header
    }

    /// Subscribe to flow events. Each observer calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.shared.tx.subscribe()
    }

    pub async fn status(&self) -> FlowStatus {
        FlowStatus {
            session_id: self.shared.session_id,
            header: self.header.clone(),
            snapshot: self.snapshot().await,
        }
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        self.shared.state.read().await.snapshot()
    }

    pub async fn current_slide(&self) -> Slide {
        self.shared.state.read().await.current_slide().clone()
    }

    pub async fn selections(&self, slide_id: &str) -> Vec<ChoiceOption> {
        self.shared.state.read().await.selections(slide_id).to_vec()
    }

    pub async fn current_selections(&self) -> Vec<ChoiceOption> {
        self.shared.state.read().await.current_selections().to_vec()
    }

    /// Submit `selections` as the answer to the current slide.
    pub async fn submit_answer(&self, selections: Vec<ChoiceOption>) -> Transition {
        self.cancel_pending().await;
        let mut state = self.shared.state.write().await;
        self.shared.interrupt();
        self.shared.submit_locked(&mut state, selections)
    }

    /// Submit whatever is currently selected (the "continue" button).
    pub async fn submit_current(&self) -> Transition {
        self.cancel_pending().await;
        let mut state = self.shared.state.write().await;
        self.shared.interrupt();
        let selections = state.current_selections().to_vec();
        self.shared.submit_locked(&mut state, selections)
    }

    /// Submit options of the current slide by id.
    pub async fn submit_options(&self, option_ids: &[String]) -> Result<Transition, FlowError> {
        self.cancel_pending().await;
        let mut state = self.shared.state.write().await;
        self.shared.interrupt();
        let slide = state.current_slide();
        if !option_ids.is_empty() && slide.selection_behavior().is_none() {
            return Err(FlowError::NotSelectable {
                slide_id: slide.id().to_string(),
            });
        }
        let selections = option_ids
            .iter()
            .map(|id| {
                slide.find_option(id).ok_or_else(|| FlowError::OptionNotFound {
                    slide_id: slide.id().to_string(),
                    option_id: id.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.shared.submit_locked(&mut state, selections))
    }

    /// Submit a free-form answer (typed text, a picked date) to the current
    /// slide, which must be of the `expected` kind.
    pub async fn submit_input(
        &self,
        expected: SlideKind,
        answer: ChoiceOption,
    ) -> Result<Transition, FlowError> {
        self.cancel_pending().await;
        let mut state = self.shared.state.write().await;
        self.shared.interrupt();
        let slide = state.current_slide();
        if slide.kind() != expected {
            return Err(FlowError::UnexpectedInput {
                slide_id: slide.id().to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(self.shared.submit_locked(&mut state, vec![answer]))
    }

    /// Dismiss the response view and move on.
    pub async fn acknowledge_response(&self) -> Transition {
        self.cancel_pending().await;
        let mut state = self.shared.state.write().await;
        self.shared.interrupt();
        let slide_id = state.current_slide().id().to_string();
        let transition = state.acknowledge_response();
        let _ = self.shared.tx.send(FlowEvent::ResponseDismissed {
            slide_id: slide_id.clone(),
        });
        self.shared.publish(&slide_id, &transition, &state);
        transition
    }

    /// Step back one slide. Returns `false` when already on the first.
    pub async fn go_back(&self) -> bool {
        self.cancel_pending().await;
        let mut state = self.shared.state.write().await;
        self.shared.interrupt();
        if !state.go_back() {
            return false;
        }
        let slide_id = state.current_slide().id().to_string();
        debug!(session_id = %self.shared.session_id, slide_id = %slide_id, "Went back");
        let _ = self.shared.tx.send(FlowEvent::WentBack {
            to: state.current_index(),
            slide_id,
        });
        true
    }

    /// Toggle an option on the current slide and return the new selection.
    ///
    /// Under single selection with auto-advance, a non-empty result schedules
    /// a submit after the configured delay. Any later interaction cancels it.
    pub async fn toggle_selection(
        &self,
        option: ChoiceOption,
        behavior: SelectionBehavior,
    ) -> Vec<ChoiceOption> {
        self.cancel_pending().await;
        let mut state = self.shared.state.write().await;
        let epoch = self.shared.interrupt();
        state.toggle_selection(option, behavior);
        let slide_id = state.current_slide().id().to_string();
        let selections = state.current_selections().to_vec();
        let _ = self.shared.tx.send(FlowEvent::SelectionChanged {
            slide_id: slide_id.clone(),
            selections: selections.clone(),
        });

        // Scheduled while still holding the lock: the next interaction bumps
        // the epoch only after this task has captured it.
        if behavior.auto_advances() && !selections.is_empty() {
            self.schedule_auto_advance(epoch, slide_id).await;
        }
        selections
    }

    /// Toggle an option of the current slide by id, using the slide's own
    /// selection behavior.
    pub async fn toggle_option(&self, option_id: &str) -> Result<Vec<ChoiceOption>, FlowError> {
        let (option, behavior) = {
            let state = self.shared.state.read().await;
            let slide = state.current_slide();
            let behavior = slide
                .selection_behavior()
                .ok_or_else(|| FlowError::NotSelectable {
                    slide_id: slide.id().to_string(),
                })?;
            let option = slide
                .find_option(option_id)
                .ok_or_else(|| FlowError::OptionNotFound {
                    slide_id: slide.id().to_string(),
                    option_id: option_id.to_string(),
                })?;
            (option, behavior)
        };
        Ok(self.toggle_selection(option, behavior).await)
    }

    /// Cancel a scheduled auto-advance. Returns `true` if one was pending.
    pub async fn cancel_pending(&self) -> bool {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        match self.pending.lock().await.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                debug!(session_id = %self.shared.session_id, "Pending auto-advance cancelled");
                true
            }
            _ => false,
        }
    }

    /// Tear down background work. The flow state itself is left as is.
    pub async fn shutdown(&self) {
        self.cancel_pending().await;
        info!(session_id = %self.shared.session_id, "Onboarding flow shut down");
    }

    async fn schedule_auto_advance(&self, epoch: u64, slide_id: String) {
        let shared = Arc::clone(&self.shared);
        let delay = self.config.auto_advance_delay;
        debug!(
            session_id = %self.shared.session_id,
            slide_id = %slide_id,
            delay_ms = delay.as_millis() as u64,
            "Auto-advance scheduled"
        );
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.auto_advance(epoch, &slide_id).await;
        });
        if let Some(displaced) = self.pending.lock().await.replace(handle) {
            displaced.abort();
        }
    }
}

impl Drop for FlowManager {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
