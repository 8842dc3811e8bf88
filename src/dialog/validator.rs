use super::{slot_value, Message, Slots};

/// The first search label; a search needs at least this one.
pub const LABEL1_SLOT: &str = "label1";
pub const LABEL2_SLOT: &str = "label2";

const MISSING_LABEL_PROMPT: &str = "Please provide at least 1 label";

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid,
    Invalid { violated_slot: String, message: Message },
}

#[cfg(test)]
impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotValidator;

impl SlotValidator {
    pub fn validate(&self, slots: &Slots) -> ValidationResult {
        if slot_value(slots, LABEL1_SLOT).is_none() {
            return ValidationResult::Invalid {
                violated_slot: LABEL1_SLOT.to_string(),
                message: Message::plain(MISSING_LABEL_PROMPT),
            };
        }
        ValidationResult::Valid
    }
}
