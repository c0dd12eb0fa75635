//! Client profile handed over by the intake form.

use crate::error::{VoiceError, VoiceResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Currency symbol used in every spoken amount.
pub const RUPEE: &str = "₹";

/// The borrower a reminder call is about. Immutable for the life of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    pub name: String,
    pub mobile: String,
    pub total_due: f64,
    pub emi_amount: f64,
    pub due_date: NaiveDate,
}

impl ClientProfile {
    pub fn new(
        name: impl Into<String>,
        mobile: impl Into<String>,
        total_due: f64,
        emi_amount: f64,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            mobile: mobile.into(),
            total_due,
            emi_amount,
            due_date,
        }
    }

    /// Parse the JSON the intake form produces (camelCase keys, ISO date).
    pub fn from_json(json: &str) -> VoiceResult<Self> {
        let profile: ClientProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> VoiceResult<()> {
        if self.name.trim().is_empty() {
            return Err(VoiceError::InvalidProfile("name is required".to_string()));
        }
        if self.mobile.trim().is_empty() {
            return Err(VoiceError::InvalidProfile(
                "mobile number is required".to_string(),
            ));
        }
        for (field, value) in [("totalDue", self.total_due), ("emiAmount", self.emi_amount)] {
            if !value.is_finite() || value < 0.0 {
                return Err(VoiceError::InvalidProfile(format!(
                    "{field} must be a non-negative amount, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn total_due_display(&self) -> String {
        rupees(self.total_due)
    }

    pub fn emi_display(&self) -> String {
        rupees(self.emi_amount)
    }
}

/// Render an amount the way the reminder scripts speak it: `₹5000`, `₹1200.5`.
pub fn rupees(amount: f64) -> String {
    format!("{RUPEE}{amount}")
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn rupees_uses_shortest_form() {
        assert_eq!(rupees(5000.0), "₹5000");
        assert_eq!(rupees(1200.5), "₹1200.5");
        assert_eq!(rupees(0.0), "₹0");
    }

    #[test]
    fn parses_intake_json() {
        let p = ClientProfile::from_json(
            r#"{"name":"Asha","mobile":"9876543210","totalDue":5000,"emiAmount":1200,"dueDate":"2026-10-21"}"#,
        )
        .unwrap();
        assert_eq!(p, asha());
        assert_eq!(p.total_due_display(), "₹5000");
        assert_eq!(p.emi_display(), "₹1200");
    }

    #[test]
    fn rejects_incomplete_profiles() {
        let mut p = asha();
        p.name = "   ".to_string();
        assert!(p.validate().is_err());

        let mut p = asha();
        p.mobile.clear();
        assert!(p.validate().is_err());

        let mut p = asha();
        p.emi_amount = -1.0;
        assert!(p.validate().is_err());

        let mut p = asha();
        p.total_due = f64::NAN;
        assert!(p.validate().is_err());
    }

    #[test]
    fn malformed_json_is_an_invalid_profile() {
        let err = ClientProfile::from_json(r#"{"name":"Asha"}"#).unwrap_err();
        assert!(matches!(err, VoiceError::InvalidProfile(_)));
    }
}
