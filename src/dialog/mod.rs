//! Conversational engine turn types and the photo search dialog.

pub mod state_machine;
pub mod validator;

pub use state_machine::DialogStateMachine;
pub use validator::{SlotValidator, ValidationResult};

use crate::labels::LabelSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Slot name to value; `None` marks a slot the engine knows about but has not filled.
pub type Slots = BTreeMap<String, Option<Slot>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub value: SlotValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreted_value: Option<String>,
}

#[cfg(test)]
impl Slot {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: SlotValue {
                original_value: Some(value.to_string()),
                interpreted_value: Some(value.to_string()),
            },
        }
    }
}

/// Interpreted value of a filled, non-blank slot.
pub fn slot_value<'a>(slots: &'a Slots, name: &str) -> Option<&'a str> {
    slots
        .get(name)?
        .as_ref()?
        .value
        .interpreted_value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentState {
    InProgress,
    Failed,
    ReadyForFulfillment,
    Fulfilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationSource {
    /// Validation turn: slots may still be missing or invalid.
    DialogCodeHook,
    /// Fulfillment turn: the engine considers every slot filled.
    FulfillmentCodeHook,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: Slots,
    #[serde(default)]
    pub state: Option<IntentState>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub intent: Intent,
    #[serde(default)]
    pub session_attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub slot_to_elicit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedNextState {
    pub dialog_action: ProposedAction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bot {
    pub name: String,
}

/// One turn as delivered by the conversational engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogRequest {
    pub session_state: SessionState,
    pub invocation_source: InvocationSource,
    #[serde(default)]
    pub request_attributes: HashMap<String, String>,
    #[serde(default)]
    pub proposed_next_state: Option<ProposedNextState>,
    #[serde(default)]
    pub bot: Option<Bot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "plain_text")]
    pub content_type: String,
    pub content: String,
}

fn plain_text() -> String {
    "PlainText".to_string()
}

impl Message {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content_type: plain_text(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DialogAction {
    ElicitSlot {
        #[serde(rename = "slotToElicit")]
        slot_to_elicit: String,
    },
    Close,
    Delegate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseIntent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Slots>,
    pub state: IntentState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSessionState {
    pub dialog_action: DialogAction,
    pub intent: ResponseIntent,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub session_attributes: HashMap<String, String>,
}

/// Envelope returned to the conversational engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    pub session_state: ResponseSessionState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub request_attributes: HashMap<String, String>,
}

/// What the dialog decided for this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    ElicitSlot {
        intent_name: String,
        slot_to_elicit: String,
        slots: Slots,
        message: Message,
    },
    Close {
        intent_name: String,
        state: IntentState,
        message: Message,
    },
    /// Hand slot filling back to the engine.
    Delegate { intent_name: String, slots: Slots },
}

impl Directive {
    pub fn into_response(
        self,
        session_attributes: HashMap<String, String>,
        request_attributes: HashMap<String, String>,
    ) -> DialogResponse {
        let (dialog_action, intent, messages) = match self {
            Directive::ElicitSlot { intent_name, slot_to_elicit, slots, message } => (
                DialogAction::ElicitSlot { slot_to_elicit },
                ResponseIntent { name: intent_name, slots: Some(slots), state: IntentState::InProgress },
                vec![message],
            ),
            Directive::Close { intent_name, state, message } => (
                DialogAction::Close,
                ResponseIntent { name: intent_name, slots: None, state },
                vec![message],
            ),
            Directive::Delegate { intent_name, slots } => (
                DialogAction::Delegate,
                ResponseIntent { name: intent_name, slots: Some(slots), state: IntentState::InProgress },
                Vec::new(),
            ),
        };
        DialogResponse {
            session_state: ResponseSessionState {
                dialog_action,
                intent,
                session_attributes,
            },
            messages,
            request_attributes,
        }
    }
}

/// Result of single-turn text recognition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedText {
    #[serde(default)]
    pub messages: Vec<Message>,
    pub session_state: RecognizedSession,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecognizedSession {
    #[serde(default)]
    pub intent: Option<Intent>,
}

impl RecognizedText {
    #[cfg(test)]
    pub fn new(slots: Slots) -> Self {
        Self {
            messages: Vec::new(),
            session_state: RecognizedSession {
                intent: Some(Intent {
                    name: state_machine::SEARCH_INTENT.to_string(),
                    slots,
                    state: Some(IntentState::InProgress),
                }),
            },
        }
    }

    /// Every non-empty slot value, in slot-name order.
    pub fn labels(&self) -> LabelSet {
        let Some(intent) = &self.session_state.intent else {
            return LabelSet::new();
        };
        intent
            .slots
            .keys()
            .filter_map(|name| slot_value(&intent.slots, name))
            .collect()
    }
}
