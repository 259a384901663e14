//! Declarative YAML scenarios

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// A Given/When/Then scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,

    /// Wipe local storage once the scenario finishes, pass or fail
    #[serde(default = "default_true")]
    pub clear_storage_after: bool,
}

fn default_true() -> bool {
    true
}

/// One named step; the name is the sentence reported for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub name: String,

    #[serde(flatten)]
    pub action: StepAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    ImageUrl,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::ImageUrl => "image_url",
        }
    }
}

/// A color given either by state name from the page object's table or as CSS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorRef {
    Named { named: String },
    Css(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Navigate to a path on the app under test
    Visit {
        #[serde(default = "default_path")]
        path: String,
    },

    /// Type into the title field (empty text leaves it blank)
    TypeTitle {
        #[serde(default)]
        text: String,
    },

    /// Type into the image URL field (empty text leaves it blank)
    TypeImageUrl {
        #[serde(default)]
        text: String,
    },

    ClickSubmit,

    /// Submit with the Enter key on the focused field
    HitEnter,

    Reload,

    ClearStorage,

    /// Capture the stored collection for later comparison
    RememberStorage,

    ExpectFeedback {
        field: Field,
        text: String,
    },

    ExpectBorderColor {
        field: Field,
        color: ColorRef,
    },

    ExpectLastCardSrc {
        src: String,
    },

    ExpectLastStored {
        title: String,
        image_url: String,
    },

    /// Stored collection grew by exactly `by` since the last `remember_storage`
    ExpectStoredGrowth {
        by: usize,
    },

    /// Stored collection equals the one captured by `remember_storage`
    ExpectStorageUnchanged,

    ExpectInputsCleared,

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

fn default_path() -> String {
    "/".to_string()
}

impl StepAction {
    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::Visit { .. } => "visit",
            StepAction::TypeTitle { .. } => "type_title",
            StepAction::TypeImageUrl { .. } => "type_image_url",
            StepAction::ClickSubmit => "click_submit",
            StepAction::HitEnter => "hit_enter",
            StepAction::Reload => "reload",
            StepAction::ClearStorage => "clear_storage",
            StepAction::RememberStorage => "remember_storage",
            StepAction::ExpectFeedback { .. } => "expect_feedback",
            StepAction::ExpectBorderColor { .. } => "expect_border_color",
            StepAction::ExpectLastCardSrc { .. } => "expect_last_card_src",
            StepAction::ExpectLastStored { .. } => "expect_last_stored",
            StepAction::ExpectStoredGrowth { .. } => "expect_stored_growth",
            StepAction::ExpectStorageUnchanged => "expect_storage_unchanged",
            StepAction::ExpectInputsCleared => "expect_inputs_cleared",
            StepAction::Log { .. } => "log",
        }
    }

    /// The field and text of a typing step
    fn typed(&self) -> Option<(Field, &str)> {
        match self {
            StepAction::TypeTitle { text } => Some((Field::Title, text)),
            StepAction::TypeImageUrl { text } => Some((Field::ImageUrl, text)),
            _ => None,
        }
    }
}

/// A step whose sentence disagrees with what it does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintWarning {
    pub step: String,
    pub message: String,
}

fn field_mention() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(title|url|image\s*url)\s+field\b").expect("static regex")
    })
}

fn quoted_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]*)""#).expect("static regex"))
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by file path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SpecParse("scenario name is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("scenario '{}' has no steps", self.name)));
        }
        if let Some(step) = self.steps.iter().find(|s| s.name.trim().is_empty()) {
            return Err(E2eError::SpecParse(format!(
                "scenario '{}' has an unnamed {} step",
                self.name,
                step.action.kind()
            )));
        }
        Ok(())
    }

    /// Flag typing steps whose sentence names a different field or value
    /// than the action actually types.
    pub fn lint(&self) -> Vec<LintWarning> {
        let mut warnings = Vec::new();

        for step in &self.steps {
            let Some((field, text)) = step.action.typed() else {
                continue;
            };

            if let Some(caps) = field_mention().captures(&step.name) {
                let mentioned = if caps[1].eq_ignore_ascii_case("title") {
                    Field::Title
                } else {
                    Field::ImageUrl
                };
                if mentioned != field {
                    warnings.push(LintWarning {
                        step: step.name.clone(),
                        message: format!(
                            "sentence mentions the {} field but the action types into {}",
                            mentioned.as_str(),
                            field.as_str()
                        ),
                    });
                }
            }

            if let Some(caps) = quoted_value().captures(&step.name) {
                if &caps[1] != text {
                    warnings.push(LintWarning {
                        step: step.name.clone(),
                        message: format!("sentence quotes \"{}\" but the action types \"{}\"", &caps[1], text),
                    });
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_scenario() {
        let yaml = r#"
name: invalid-inputs
description: Submitting an image with invalid inputs
tags:
  - validation
steps:
  - name: Given I am on the image registration page
    action: visit
  - name: When I enter "" in the title field
    action: type_title
  - name: Then I click the submit button
    action: click_submit
  - name: And I should see an exclamation icon in the URL field
    action: expect_border_color
    field: image_url
    color:
      named: error
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "invalid-inputs");
        assert_eq!(scenario.steps.len(), 4);
        assert!(scenario.clear_storage_after);
        assert!(matches!(&scenario.steps[0].action, StepAction::Visit { path } if path == "/"));
        assert!(matches!(
            &scenario.steps[3].action,
            StepAction::ExpectBorderColor { field: Field::ImageUrl, color: ColorRef::Named { named } } if named == "error"
        ));
        assert!(scenario.lint().is_empty());
    }

    #[test]
    fn test_literal_color() {
        let yaml = r#"
name: literal
steps:
  - name: Then the border is red
    action: expect_border_color
    field: title
    color: "rgb(220, 53, 69)"
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert!(matches!(
            &scenario.steps[0].action,
            StepAction::ExpectBorderColor { color: ColorRef::Css(css), .. } if css == "rgb(220, 53, 69)"
        ));
    }

    #[test]
    fn test_rejects_empty_steps() {
        let yaml = "name: nothing\nsteps: []\n";
        assert!(matches!(Scenario::from_yaml(yaml), Err(E2eError::SpecParse(_))));
    }

    #[test]
    fn test_lint_flags_wrong_field() {
        let yaml = r#"
name: copy-paste
steps:
  - name: Then I enter "" in the URL field
    action: type_title
    text: ""
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        let warnings = scenario.lint();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("image_url field"));
    }

    #[test]
    fn test_lint_flags_wrong_value() {
        let yaml = r#"
name: stale-value
steps:
  - name: When I enter "Alien BR" in the title field
    action: type_title
    text: "Alien"
"#;
        let warnings = Scenario::from_yaml(yaml).unwrap().lint();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("\"Alien BR\""));
    }
}
