//! Default payloads for each step type.
//!
//! Pure functions: every call builds a fresh payload, so callers may mutate
//! the result freely.

use tracing::debug;

use crate::schema::{
    ConditionData, DelayData, EmailData, InputData, NodeData, NodeType, SmsData, TriggerData,
};
use crate::NodeError;

/// Canonical title for a step type.
///
/// Also used to restore a title the user blanked out.
pub fn default_title(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Trigger => "Start Campaign",
        NodeType::Sms => "SMS Message",
        NodeType::Email => "Email Message",
        NodeType::Delay => "Delay Step",
        NodeType::Condition => "Condition Step",
        NodeType::Input => "Input Step",
    }
}

/// Build the default payload for `node_type`.
pub fn defaults_for(node_type: NodeType) -> NodeData {
    match node_type {
        NodeType::Trigger => NodeData::Trigger(TriggerData::default()),
        NodeType::Sms => NodeData::Sms(SmsData::default()),
        NodeType::Email => NodeData::Email(EmailData::default()),
        NodeType::Delay => NodeData::Delay(DelayData::default()),
        NodeType::Condition => NodeData::Condition(ConditionData::default()),
        NodeType::Input => NodeData::Input(InputData::default()),
    }
}

/// Build the default payload for a step type given by name.
///
/// # Errors
/// [`NodeError::UnknownNodeType`] if `name` is outside the closed set.
pub fn defaults_for_name(name: &str) -> Result<NodeData, NodeError> {
    let node_type: NodeType = name.parse().inspect_err(|e| debug!("{e}"))?;
    Ok(defaults_for(node_type))
}

impl NodeType {
    /// See [`default_title`].
    pub fn default_title(self) -> &'static str {
        default_title(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DelayUnit, InputKind, TriggerKind};

    #[test]
    fn defaults_carry_their_own_type() {
        for ty in NodeType::ALL {
            let data = defaults_for(ty);
            assert_eq!(data.node_type(), ty);
            assert_eq!(data.title(), default_title(ty));
        }
    }

    #[test]
    fn delay_defaults_to_one_minute() {
        match defaults_for(NodeType::Delay) {
            NodeData::Delay(d) => {
                assert_eq!(d.delay.get(), 1);
                assert_eq!(d.unit, DelayUnit::Minutes);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn condition_defaults_to_yes_no_labels() {
        match defaults_for(NodeType::Condition) {
            NodeData::Condition(c) => {
                assert_eq!(c.condition, "");
                assert_eq!(c.true_label, "Yes");
                assert_eq!(c.false_label, "No");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn email_and_sms_defaults_are_empty() {
        match defaults_for(NodeType::Email) {
            NodeData::Email(e) => {
                assert_eq!(e.title, "Email Message");
                assert!(e.subject.is_empty() && e.template.is_empty() && e.sender_name.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }
        match defaults_for(NodeType::Sms) {
            NodeData::Sms(s) => {
                assert_eq!(s.title, "SMS Message");
                assert!(s.template.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn input_and_trigger_defaults() {
        match defaults_for(NodeType::Input) {
            NodeData::Input(i) => {
                assert_eq!(i.input_type, InputKind::Text);
                assert_eq!(i.placeholder, "Enter value...");
                assert!(i.options.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }
        match defaults_for(NodeType::Trigger) {
            NodeData::Trigger(t) => {
                assert_eq!(t.title, "Start Campaign");
                assert_eq!(t.trigger_type, TriggerKind::Event);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(defaults_for_name("sms").unwrap().node_type(), NodeType::Sms);
        assert!(matches!(
            defaults_for_name("push"),
            Err(NodeError::UnknownNodeType(name)) if name == "push"
        ));
    }
}
