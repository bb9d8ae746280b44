//! Step types and their payload shapes.
//!
//! A node's payload is a tagged union keyed on `type`; each variant carries
//! exactly its own fields plus the shared `title`.  Field names on the wire
//! are camelCase (`senderName`, `trueLabel`, `inputType`, ...).
//!
//! Every payload struct is `#[serde(default)]`: fields missing from stored
//! data are filled with the same values the registry hands out for a fresh
//! node.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::NodeError;

/// Handle id of the condition node's "false" output port.
///
/// The "true" branch leaves through the default (unnamed) handle.
pub const FALSE_HANDLE: &str = "false";

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// The closed set of campaign step types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Trigger,
    Sms,
    Email,
    Delay,
    Condition,
    Input,
}

impl NodeType {
    /// All step types, in palette order.
    pub const ALL: [NodeType; 6] = [
        NodeType::Trigger,
        NodeType::Sms,
        NodeType::Email,
        NodeType::Delay,
        NodeType::Condition,
        NodeType::Input,
    ];

    /// Wire name, also used as the node id prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Delay => "delay",
            Self::Condition => "condition",
            Self::Input => "input",
        }
    }

    /// Palette section the step is offered under.
    pub fn category(self) -> NodeCategory {
        match self {
            Self::Trigger => NodeCategory::Trigger,
            Self::Sms | Self::Email => NodeCategory::Message,
            Self::Delay | Self::Condition => NodeCategory::FlowControl,
            Self::Input => NodeCategory::Input,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigger"   => Ok(Self::Trigger),
            "sms"       => Ok(Self::Sms),
            "email"     => Ok(Self::Email),
            "delay"     => Ok(Self::Delay),
            "condition" => Ok(Self::Condition),
            "input"     => Ok(Self::Input),
            other       => Err(NodeError::UnknownNodeType(other.to_owned())),
        }
    }
}

/// Palette grouping of step types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Trigger,
    Message,
    FlowControl,
    Input,
}

impl NodeCategory {
    /// Section heading shown above the group.
    pub fn label(self) -> &'static str {
        match self {
            Self::Trigger => "Triggers",
            Self::Message => "Messages",
            Self::FlowControl => "Flow Control",
            Self::Input => "Input",
        }
    }
}

// ---------------------------------------------------------------------------
// Per-variant payloads
// ---------------------------------------------------------------------------

/// How a campaign is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    #[default]
    Event,
    Date,
}

/// Campaign entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerData {
    pub title: String,
    pub trigger_type: TriggerKind,
    /// Event name, used when `trigger_type` is `event`.
    pub event_name: String,
    /// Calendar date, used when `trigger_type` is `date`.
    pub trigger_date: String,
    pub trigger_time: String,
}

impl Default for TriggerData {
    fn default() -> Self {
        Self {
            title: NodeType::Trigger.default_title().to_owned(),
            trigger_type: TriggerKind::Event,
            event_name: String::new(),
            trigger_date: String::new(),
            trigger_time: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SmsData {
    pub title: String,
    pub template: String,
}

impl Default for SmsData {
    fn default() -> Self {
        Self {
            title: NodeType::Sms.default_title().to_owned(),
            template: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailData {
    pub title: String,
    pub subject: String,
    pub template: String,
    pub sender_name: String,
}

impl Default for EmailData {
    fn default() -> Self {
        Self {
            title: NodeType::Email.default_title().to_owned(),
            subject: String::new(),
            template: String::new(),
            sender_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    #[default]
    Minutes,
    Hours,
    Days,
}

/// Wait step.  `delay` is a positive count of `unit`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DelayData {
    pub title: String,
    pub delay: NonZeroU32,
    pub unit: DelayUnit,
}

impl Default for DelayData {
    fn default() -> Self {
        Self {
            title: NodeType::Delay.default_title().to_owned(),
            delay: NonZeroU32::MIN,
            unit: DelayUnit::Minutes,
        }
    }
}

/// Branching step.  The expression text is stored verbatim and never
/// evaluated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionData {
    pub title: String,
    pub condition: String,
    pub true_label: String,
    pub false_label: String,
}

impl Default for ConditionData {
    fn default() -> Self {
        Self {
            title: NodeType::Condition.default_title().to_owned(),
            condition: String::new(),
            true_label: "Yes".to_owned(),
            false_label: "No".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Text,
    Number,
    Date,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputData {
    pub title: String,
    pub input_type: InputKind,
    pub placeholder: String,
    /// Choices offered when `input_type` is `select`; ignored otherwise.
    pub options: Vec<String>,
}

impl Default for InputData {
    fn default() -> Self {
        Self {
            title: NodeType::Input.default_title().to_owned(),
            input_type: InputKind::Text,
            placeholder: "Enter value...".to_owned(),
            options: Vec::new(),
        }
    }
}

impl InputData {
    /// Replace the options from multi-line text, one option per line.
    /// Blank lines are dropped.
    pub fn set_options_from_text(&mut self, text: &str) {
        self.options = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect();
    }

    /// Options that actually apply: empty unless this is a select input.
    pub fn effective_options(&self) -> &[String] {
        match self.input_type {
            InputKind::Select => &self.options,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// NodeData
// ---------------------------------------------------------------------------

/// A node payload, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeData {
    Trigger(TriggerData),
    Sms(SmsData),
    Email(EmailData),
    Delay(DelayData),
    Condition(ConditionData),
    Input(InputData),
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Trigger(_) => NodeType::Trigger,
            Self::Sms(_) => NodeType::Sms,
            Self::Email(_) => NodeType::Email,
            Self::Delay(_) => NodeType::Delay,
            Self::Condition(_) => NodeType::Condition,
            Self::Input(_) => NodeType::Input,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Trigger(d) => &d.title,
            Self::Sms(d) => &d.title,
            Self::Email(d) => &d.title,
            Self::Delay(d) => &d.title,
            Self::Condition(d) => &d.title,
            Self::Input(d) => &d.title,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        match self {
            Self::Trigger(d) => d.title = title,
            Self::Sms(d) => d.title = title,
            Self::Email(d) => d.title = title,
            Self::Delay(d) => d.title = title,
            Self::Condition(d) => d.title = title,
            Self::Input(d) => d.title = title,
        }
    }

    /// `true` when the title is empty or whitespace only.
    pub fn has_blank_title(&self) -> bool {
        self.title().trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_type_names_round_trip_through_from_str() {
        for ty in NodeType::ALL {
            assert_eq!(ty.as_str().parse::<NodeType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_node_type_name_is_rejected() {
        assert_eq!(
            "webhook".parse::<NodeType>(),
            Err(NodeError::UnknownNodeType("webhook".into()))
        );
    }

    #[test]
    fn payload_serializes_with_type_tag_and_camel_case_fields() {
        let data = NodeData::Email(EmailData {
            title: "Welcome".into(),
            subject: "Hi".into(),
            template: "Hello {{name}}".into(),
            sender_name: "Shop".into(),
        });

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "email",
                "title": "Welcome",
                "subject": "Hi",
                "template": "Hello {{name}}",
                "senderName": "Shop"
            })
        );
    }

    #[test]
    fn missing_payload_fields_take_their_defaults() {
        let data: NodeData =
            serde_json::from_value(json!({ "type": "condition", "title": "Paid?" })).unwrap();

        match data {
            NodeData::Condition(c) => {
                assert_eq!(c.title, "Paid?");
                assert_eq!(c.true_label, "Yes");
                assert_eq!(c.false_label, "No");
                assert_eq!(c.condition, "");
            }
            other => panic!("expected condition payload, got {other:?}"),
        }
    }

    #[test]
    fn zero_delay_is_not_a_valid_payload() {
        let result: Result<NodeData, _> =
            serde_json::from_value(json!({ "type": "delay", "title": "Wait", "delay": 0 }));
        assert!(result.is_err());
    }

    #[test]
    fn options_from_text_drop_blank_lines() {
        let mut input = InputData::default();
        input.set_options_from_text("red\n\n  \ngreen\nblue\n");
        assert_eq!(input.options, vec!["red", "green", "blue"]);
    }

    #[test]
    fn options_only_apply_to_select_inputs() {
        let mut input = InputData {
            options: vec!["a".into(), "b".into()],
            ..InputData::default()
        };
        assert!(input.effective_options().is_empty());

        input.input_type = InputKind::Select;
        assert_eq!(input.effective_options(), ["a", "b"]);
    }

    #[test]
    fn whitespace_title_counts_as_blank() {
        let mut data = NodeData::Sms(SmsData::default());
        assert!(!data.has_blank_title());
        data.set_title("   ");
        assert!(data.has_blank_title());
    }

    #[test]
    fn palette_categories() {
        assert_eq!(NodeType::Trigger.category(), NodeCategory::Trigger);
        assert_eq!(NodeType::Email.category().label(), "Messages");
        assert_eq!(NodeType::Condition.category(), NodeCategory::FlowControl);
    }
}
