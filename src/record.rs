//! Per-declaration records and the typed field set they share with the
//! grammar.

use serde::{Deserialize, Serialize};

/// An annotation field of a [`Record`].
///
/// Grammar capture names resolve to this enum once, at grammar
/// construction, so folding matches into a record is static dispatch
/// instead of a by-name lookup. A capture name that does not resolve means
/// the grammar and the record definition have drifted apart, which is a
/// fatal construction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Model,
    Function,
    Component,
    Threat,
    Mitigation,
    Exposure,
    Action,
    Ref,
}

impl Field {
    /// Resolve a capture name case-insensitively.
    pub fn from_capture_name(name: &str) -> Option<Field> {
        match name.to_ascii_lowercase().as_str() {
            "model" => Some(Field::Model),
            "function" => Some(Field::Function),
            "component" => Some(Field::Component),
            "threat" => Some(Field::Threat),
            "mitigation" => Some(Field::Mitigation),
            "exposure" => Some(Field::Exposure),
            "action" => Some(Field::Action),
            "ref" => Some(Field::Ref),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Model => "model",
            Field::Function => "function",
            Field::Component => "component",
            Field::Threat => "threat",
            Field::Mitigation => "mitigation",
            Field::Exposure => "exposure",
            Field::Action => "action",
            Field::Ref => "ref",
        }
    }
}

/// One extracted record per function declaration.
///
/// Identity fields are derived structurally and always populated.
/// Annotation fields are populated only from matching comment lines and
/// are omitted from structured output when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub package: String,
    pub begin: usize,
    pub end: usize,
    pub filepath: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Function reference from the ThreatSpec line (distinct from `name`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Record {
    /// Create a record with identity fields only.
    pub fn new(name: String, package: String, begin: usize, end: usize, filepath: String) -> Self {
        Record {
            name,
            package,
            begin,
            end,
            filepath,
            mitigation: None,
            model: None,
            threat: None,
            exposure: None,
            component: None,
            action: None,
            function: None,
            reference: None,
        }
    }

    /// Fold one matched capture into the record.
    ///
    /// Assignment is unconditional, so a later match for the same field
    /// overwrites an earlier one (last-match-wins). An empty capture, as
    /// produced by an optional group that did not participate, stores the
    /// field as absent.
    pub fn apply(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::Model => &mut self.model,
            Field::Function => &mut self.function,
            Field::Component => &mut self.component,
            Field::Threat => &mut self.threat,
            Field::Mitigation => &mut self.mitigation,
            Field::Exposure => &mut self.exposure,
            Field::Action => &mut self.action,
            Field::Ref => &mut self.reference,
        };

        *slot = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }

    /// Whether any annotation field was populated.
    pub fn is_annotated(&self) -> bool {
        self.mitigation.is_some()
            || self.model.is_some()
            || self.threat.is_some()
            || self.exposure.is_some()
            || self.component.is_some()
            || self.action.is_some()
            || self.function.is_some()
            || self.reference.is_some()
    }
}
