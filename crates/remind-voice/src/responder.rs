//! Keyword reply rules for reminder calls.
//!
//! The chain is evaluated top to bottom and the first match wins, so a caller
//! who mentions both a payment and the EMI gets the payment acknowledgement.

use crate::config::ResponderSettings;
use crate::error::VoiceResult;
use crate::profile::ClientProfile;

/// Spoken when a responder fails; processing then continues as usual.
pub const APOLOGY: &str = "Sorry, couldn't understand. Please repeat.";

pub const NO_PROFILE_PROMPT: &str = "Please submit client information first.";

/// Turns a caller utterance into the agent's reply.
pub trait Responder: Send {
    fn respond(&self, utterance: &str, profile: Option<&ClientProfile>) -> VoiceResult<String>;
}

/// The fixed keyword ruleset. Never fails.
#[derive(Debug, Clone, Default)]
pub struct KeywordResponder {
    accept_thanks_as_farewell: bool,
}

impl KeywordResponder {
    pub fn new(settings: &ResponderSettings) -> Self {
        Self {
            accept_thanks_as_farewell: settings.accept_thanks_as_farewell,
        }
    }

    /// Variant that also closes the call on "thank you".
    pub fn courteous() -> Self {
        Self {
            accept_thanks_as_farewell: true,
        }
    }

    pub fn reply(&self, utterance: &str, profile: Option<&ClientProfile>) -> String {
        let Some(client) = profile else {
            return NO_PROFILE_PROMPT.to_string();
        };
        let input = utterance.to_lowercase();

        if input.contains("paid") || input.contains("payment") {
            return format!("Thank you for confirming your payment, {}.", client.name);
        }
        if input.contains("balance") || input.contains("due") {
            return format!("Your total due amount is {}.", client.total_due_display());
        }
        if input.contains("emi") {
            return format!("Your EMI amount is {}.", client.emi_display());
        }
        if input.contains("bye") || (self.accept_thanks_as_farewell && input.contains("thank you"))
        {
            return format!("Thank you, {}. Have a good day!", client.name);
        }
        format!(
            "Hello, {}. Please ask any questions about your loan or payments.",
            client.name
        )
    }
}

impl Responder for KeywordResponder {
    fn respond(&self, utterance: &str, profile: Option<&ClientProfile>) -> VoiceResult<String> {
        Ok(self.reply(utterance, profile))
    }
}

/// Reply with the default ruleset.
pub fn generate(utterance: &str, profile: Option<&ClientProfile>) -> String {
    KeywordResponder::default().reply(utterance, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn asha() -> ClientProfile {
        ClientProfile::new(
            "Asha",
            "9876543210",
            5000.0,
            1200.0,
            NaiveDate::from_ymd_opt(2026, 10, 21).unwrap(),
        )
    }

    #[test]
    fn no_profile_short_circuits() {
        assert_eq!(generate("I paid already", None), NO_PROFILE_PROMPT);
    }

    #[test]
    fn payment_beats_emi() {
        let reply = generate("I already made the payment, what about my emi", Some(&asha()));
        assert_eq!(reply, "Thank you for confirming your payment, Asha.");
    }

    #[test]
    fn balance_and_due_state_total() {
        let p = asha();
        assert_eq!(
            generate("What is my BALANCE", Some(&p)),
            "Your total due amount is ₹5000."
        );
        assert_eq!(
            generate("how much is due", Some(&p)),
            "Your total due amount is ₹5000."
        );
    }

    #[test]
    fn emi_states_installment() {
        assert_eq!(
            generate("tell me the EMI", Some(&asha())),
            "Your EMI amount is ₹1200."
        );
    }

    #[test]
    fn farewell_variants() {
        let p = asha();
        assert_eq!(generate("ok bye", Some(&p)), "Thank you, Asha. Have a good day!");
        assert_eq!(
            generate("thank you", Some(&p)),
            "Hello, Asha. Please ask any questions about your loan or payments."
        );
        assert_eq!(
            KeywordResponder::courteous().reply("thank you", Some(&p)),
            "Thank you, Asha. Have a good day!"
        );
    }

    #[test]
    fn default_prompts_for_question() {
        assert_eq!(
            generate("hello?", Some(&asha())),
            "Hello, Asha. Please ask any questions about your loan or payments."
        );
    }

    #[test]
    fn replies_are_deterministic() {
        let p = asha();
        let first = generate("what about my emi", Some(&p));
        for _ in 0..10 {
            assert_eq!(generate("what about my emi", Some(&p)), first);
        }
    }
}
