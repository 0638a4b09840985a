//! Onboarding flow: a linear sequence of slides driven by a small state
//! machine.
//!
//! The flow records an answer per slide, can put a response view in front of
//! the sequence until the user acknowledges it, and splices extra slides in
//! based on the answers given. [`FlowState`] is the synchronous core;
//! [`FlowManager`] shares it with observers and runs delayed auto-advance;
//! [`flow_routes`] exposes both to a renderer over HTTP and WebSocket.

pub mod definition;
pub mod manager;
pub mod model;
pub mod routes;
pub mod slide;
pub mod state;

pub use definition::{FlowDefinition, HeaderConfig};
pub use manager::{CompletionSummary, FlowEvent, FlowManager, FlowStatus};
pub use model::{
    ChoiceOption, FeedbackConfig, FeedbackTone, InsertPlacement, InsertSlideData, OptionContent,
    ResponseConfig, SelectionBehavior,
};
pub use routes::{FlowAction, FlowRouteState, flow_routes};
pub use slide::{Slide, SlideKind};
pub use state::{FlowSnapshot, FlowState, Transition};
