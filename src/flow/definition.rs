//! Flow definitions authored as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::slide::Slide;
use super::state::FlowState;
use crate::error::{ConfigError, FlowError};

fn default_true() -> bool {
    true
}

/// Header chrome the renderer draws above every slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderConfig {
    #[serde(default = "default_true")]
    pub show_back_button: bool,
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            show_back_button: true,
            show_progress: true,
        }
    }
}

/// Everything needed to start a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDefinition {
    #[serde(default)]
    pub header: HeaderConfig,
    pub slides: Vec<Slide>,
}

impl FlowDefinition {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Read and parse a definition file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let definition = Self::from_json_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            slides = definition.slides.len(),
            "Loaded flow definition"
        );
        Ok(definition)
    }

    /// Validate the slides and position a new flow at the first one.
    pub fn into_state(self) -> Result<(HeaderConfig, FlowState), FlowError> {
        let state = FlowState::new(self.slides)?;
        Ok((self.header, state))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::flow::slide::SlideKind;

    const MINIMAL: &str = r#"{
        "slides": [
            {"kind": "regular", "id": "welcome", "title": "Welcome"},
            {"kind": "yes_no", "id": "notify", "title": "Turn on notifications?"}
        ]
    }"#;

    #[test]
    fn header_defaults_when_omitted() {
        let definition = FlowDefinition::from_json_str(MINIMAL).unwrap();
        assert_eq!(definition.header, HeaderConfig::default());
        assert_eq!(definition.slides.len(), 2);
        assert_eq!(definition.slides[1].kind(), SlideKind::YesNo);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = FlowDefinition::from_json_str(r#"{"slides": [{"kind": "carousel"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        let definition = FlowDefinition::from_json_str(
            r#"{"slides": [
                {"kind": "regular", "id": "intro", "title": "Hi"},
                {"kind": "regular", "id": "intro", "title": "Hi again"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            definition.into_state().unwrap_err(),
            FlowError::DuplicateSlideId {
                id: "intro".to_string()
            }
        );
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let definition = FlowDefinition::load(file.path()).unwrap();
        let (header, state) = definition.into_state().unwrap();
        assert!(header.show_back_button);
        assert_eq!(state.current_slide().id(), "welcome");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FlowDefinition::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn bundled_demo_flow_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/welcome_flow.json");
        let (_, state) = FlowDefinition::load(&path).unwrap().into_state().unwrap();
        assert!(state.slides().len() >= 8);
    }
}
