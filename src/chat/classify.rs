//! Keyword routing for tickets opened from chat.

use crate::models::ticket::TicketCategory;

/// Keyword groups checked in order; the first group with a hit wins.
const CATEGORY_KEYWORDS: [(TicketCategory, &[&str]); 3] = [
    (TicketCategory::Claim, &["claim", "accident", "hospital"]),
    (TicketCategory::Payment, &["pay", "bill", "price"]),
    (
        TicketCategory::Policy,
        &["policy", "coverage", "plan", "deductible"],
    ),
];

const SUBJECT_WORDS: usize = 5;

/// Plain case-insensitive substring matching, falling back to ACCOUNT.
pub fn classify(query: &str) -> TicketCategory {
    let lowered = query.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(TicketCategory::Account)
}

/// First five words of the query followed by `...`.
pub fn subject_from_query(query: &str) -> String {
    let words: Vec<&str> = query.split_whitespace().take(SUBJECT_WORDS).collect();
    format!("{}...", words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_keyword_group() {
        assert_eq!(classify("I had an accident yesterday"), TicketCategory::Claim);
        assert_eq!(classify("Hospital bill is wrong"), TicketCategory::Claim);
        assert_eq!(classify("Why did my PRICE go up?"), TicketCategory::Payment);
        assert_eq!(classify("How do I pay online"), TicketCategory::Payment);
        assert_eq!(classify("what is my deductible"), TicketCategory::Policy);
        assert_eq!(classify("Does my coverage include dental"), TicketCategory::Policy);
        assert_eq!(classify("I forgot my password"), TicketCategory::Account);
    }

    #[test]
    fn earlier_groups_win() {
        // mentions both a claim and a payment
        assert_eq!(
            classify("When will my claim payout be paid"),
            TicketCategory::Claim
        );
    }

    #[test]
    fn subject_takes_first_five_words() {
        assert_eq!(
            subject_from_query("My  car was hit in the parking lot"),
            "My car was hit in..."
        );
        assert_eq!(subject_from_query("Refund status"), "Refund status...");
    }
}
