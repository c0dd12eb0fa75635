//! Opening line of a reminder call, derived from the due date.

use crate::profile::ClientProfile;
use chrono::NaiveDate;

/// Calendar days from `today` until the due date; negative once overdue.
///
/// The due date counts from the start of its day, so any time later than
/// midnight today rounds up to the same whole-day figure.
pub fn days_until_due(due_date: NaiveDate, today: NaiveDate) -> i64 {
    due_date.signed_duration_since(today).num_days()
}

pub fn greeting(profile: &ClientProfile, today: NaiveDate) -> String {
    let days_left = days_until_due(profile.due_date, today);
    let emi = profile.emi_display();
    let total = profile.total_due_display();

    if days_left >= 0 {
        format!(
            "Hello {}, your EMI of {} is due in {} days on {}. Your total due is {}. How can I assist you?",
            profile.name,
            emi,
            days_left,
            profile.due_date.format("%-d/%-m/%Y"),
            total
        )
    } else {
        format!(
            "Hello {}, your EMI of {} was due {} days ago. Your total due is {}. How can I assist you?",
            profile.name, emi, -days_left, total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn profile_due(offset_days: i64) -> ClientProfile {
        ClientProfile::new(
            "Asha",
            "9876543210",
            5000.0,
            1200.0,
            today() + Duration::days(offset_days),
        )
    }

    #[test]
    fn due_in_future() {
        let text = greeting(&profile_due(3), today());
        assert!(text.contains("due in 3 days on 19/10/2026"), "{text}");
        assert!(text.contains("₹1200") && text.contains("₹5000"));
    }

    #[test]
    fn overdue() {
        let text = greeting(&profile_due(-2), today());
        assert!(text.contains("was due 2 days ago"), "{text}");
        assert!(!text.contains("due in"));
        assert!(text.contains("₹1200") && text.contains("₹5000"));
    }

    #[test]
    fn due_today_is_zero_days() {
        let text = greeting(&profile_due(0), today());
        assert!(text.contains("due in 0 days"), "{text}");
    }

    #[test]
    fn full_sentence_shape() {
        assert_eq!(
            greeting(&profile_due(5), today()),
            "Hello Asha, your EMI of ₹1200 is due in 5 days on 21/10/2026. Your total due is ₹5000. How can I assist you?"
        );
    }

    #[test]
    fn crosses_month_and_year_boundaries() {
        let dec = NaiveDate::from_ymd_opt(2026, 12, 30).unwrap();
        let jan = NaiveDate::from_ymd_opt(2027, 1, 2).unwrap();
        assert_eq!(days_until_due(jan, dec), 3);
        assert_eq!(days_until_due(dec, jan), -3);
    }
}
