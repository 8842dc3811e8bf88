use super::validator::{LABEL1_SLOT, LABEL2_SLOT};
use super::{
    slot_value, DialogRequest, DialogResponse, Directive, Intent, IntentState, InvocationSource,
    Message, ProposedNextState, SessionState, SlotValidator, ValidationResult,
};
use crate::error::AppError;
use crate::services::queue::WorkQueue;
use std::collections::HashMap;
use std::sync::Arc;

pub const SEARCH_INTENT: &str = "SearchIntent";

const CURRENT_REQUIREMENT: &str = "currentRequirement";
const ELICIT_ATTEMPTS: &str = "elicitAttempts";
const KEYWORDS_EXTRACTED: &str = "Keywords extracted";
const GAVE_UP: &str = "Sorry, I could not find any labels to search for.";

/// Drives one photo search conversation turn.
///
/// A validation turn either re-elicits the violated slot (intent stays
/// `InProgress`), delegates back to the engine when it plans to elicit
/// another slot, or closes the intent as `Fulfilled`. A fulfillment turn
/// always closes. Repeated failed validations end in `Failed` once
/// `max_elicit_attempts` is reached (0 disables the limit).
pub struct DialogStateMachine {
    validator: SlotValidator,
    max_elicit_attempts: u32,
    queue: Option<Arc<dyn WorkQueue>>,
}

impl DialogStateMachine {
    pub fn new(max_elicit_attempts: u32) -> Self {
        Self {
            validator: SlotValidator,
            max_elicit_attempts,
            queue: None,
        }
    }

    /// Fulfilled requirements are enqueued for out-of-band processing.
    pub fn with_queue(mut self, queue: Arc<dyn WorkQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn handle(&self, request: DialogRequest) -> Result<DialogResponse, AppError> {
        if let Some(bot) = &request.bot {
            log::debug!("event.bot.name={}", bot.name);
        }
        let intent_name = request.session_state.intent.name.as_str();
        log::debug!("dispatch intentName={}", intent_name);

        if intent_name != SEARCH_INTENT {
            log::error!("Intent with name {} not supported", intent_name);
            return Err(AppError::UnsupportedIntent(intent_name.to_string()));
        }
        Ok(self.photo_search(request))
    }

    fn photo_search(&self, request: DialogRequest) -> DialogResponse {
        let DialogRequest {
            session_state,
            invocation_source,
            mut request_attributes,
            proposed_next_state,
            ..
        } = request;
        let SessionState { intent, mut session_attributes } = session_state;

        let requirement = serde_json::json!({
            LABEL1_SLOT: slot_value(&intent.slots, LABEL1_SLOT),
            LABEL2_SLOT: slot_value(&intent.slots, LABEL2_SLOT),
        })
        .to_string();
        request_attributes.insert(CURRENT_REQUIREMENT.to_string(), requirement.clone());

        let directive = if intent.state == Some(IntentState::Fulfilled) {
            log::debug!("Intent {} already fulfilled", intent.name);
            close(intent.name, IntentState::Fulfilled, KEYWORDS_EXTRACTED)
        } else {
            match invocation_source {
                InvocationSource::DialogCodeHook => {
                    self.validation_turn(intent, &mut session_attributes, proposed_next_state.as_ref())
                }
                InvocationSource::FulfillmentCodeHook => self.fulfillment_turn(intent, requirement),
            }
        };

        directive.into_response(session_attributes, request_attributes)
    }

    fn validation_turn(
        &self,
        mut intent: Intent,
        session_attributes: &mut HashMap<String, String>,
        proposed: Option<&ProposedNextState>,
    ) -> Directive {
        match self.validator.validate(&intent.slots) {
            ValidationResult::Invalid { violated_slot, message } => {
                let attempts = session_attributes
                    .get(ELICIT_ATTEMPTS)
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(0)
                    + 1;

                if self.max_elicit_attempts > 0 && attempts >= self.max_elicit_attempts {
                    log::info!("Giving up on {} after {} attempts", intent.name, attempts);
                    session_attributes.remove(ELICIT_ATTEMPTS);
                    return close(intent.name, IntentState::Failed, GAVE_UP);
                }

                log::debug!("Eliciting slot {} (attempt {})", violated_slot, attempts);
                session_attributes.insert(ELICIT_ATTEMPTS.to_string(), attempts.to_string());
                intent.slots.insert(violated_slot.clone(), None);
                Directive::ElicitSlot {
                    intent_name: intent.name,
                    slot_to_elicit: violated_slot,
                    slots: intent.slots,
                    message,
                }
            }
            ValidationResult::Valid => {
                session_attributes.remove(ELICIT_ATTEMPTS);
                match proposed.map(|p| &p.dialog_action) {
                    Some(action) if action.action_type == "ElicitSlot" => {
                        log::debug!(
                            "Delegating to the engine to elicit {:?}",
                            action.slot_to_elicit
                        );
                        Directive::Delegate {
                            intent_name: intent.name,
                            slots: intent.slots,
                        }
                    }
                    _ => close(intent.name, IntentState::Fulfilled, KEYWORDS_EXTRACTED),
                }
            }
        }
    }

    fn fulfillment_turn(&self, intent: Intent, requirement: String) -> Directive {
        if let Some(queue) = &self.queue {
            if let Err(e) = queue.enqueue(requirement) {
                log::warn!("Could not enqueue requirement for {}: {}", intent.name, e);
            }
        }
        close(intent.name, IntentState::Fulfilled, KEYWORDS_EXTRACTED)
    }
}

fn close(intent_name: String, state: IntentState, message: &str) -> Directive {
    Directive::Close {
        intent_name,
        state,
        message: Message::plain(message),
    }
}
