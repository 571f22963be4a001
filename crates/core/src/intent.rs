//! Health-intent gate for the chat route.
//!
//! A keyword heuristic decides whether free text is a health question before any paid call to
//! the AI service is made. It is deterministic and does no I/O. Misclassifying a health
//! question as off-topic is an accepted cost; the point is to turn away obviously unrelated
//! traffic cheaply.
//!
//! Matching is plain substring search on the lower-cased text, so `"bp"` also matches inside
//! longer words. Both term lists are ordered and the order is part of the behaviour: only the
//! first off-topic indicator found is acted upon, and the reported health term is the first
//! one in list order.

/// Symptom names, condition names and care-seeking phrases.
pub const HEALTH_TERMS: &[&str] = &[
    "fever",
    "cough",
    "throat",
    "pain",
    "headache",
    "dizzy",
    "nausea",
    "vomit",
    "bleed",
    "breath",
    "shortness of breath",
    "breathing",
    "rash",
    "infection",
    "diarrhea",
    "constipation",
    "abdominal",
    "chest pain",
    "heart",
    "blood pressure",
    "bp",
    "diabetes",
    "insulin",
    "cholesterol",
    "allergy",
    "allergic",
    "asthma",
    "symptom",
    "symptoms",
    "treatment",
    "prescribe",
    "diagnosis",
    "sore throat",
    "flu",
    "cold",
    "covid",
    "vaccine",
    "pregnant",
    "pregnancy",
    "mental health",
    "depression",
    "anxiety",
    "sleep",
    "insomnia",
    "weight",
    "bmi",
    "obesity",
    "exercise",
    "nutrition",
    "diet",
    "clinic",
    "doctor",
    "physician",
    "emergency",
    "urgent",
    "tumor",
    "cancer",
    "kidney",
    "lung",
    "liver",
    "skin",
    "stomach",
    "antibiotic",
];

/// Clearly off-topic phrases: education, entertainment, navigation, trivia, commerce.
pub const NON_HEALTH_INDICATORS: &[&str] = &[
    "school",
    "college",
    "university",
    "restaurant",
    "movie",
    "song",
    "lyrics",
    "weather",
    "directions",
    "map",
    "how to go",
    "code",
    "programming",
    "javascript",
    "react",
    "history",
    "definition of",
    "meaning of",
    "who is",
    "where is",
    "price of",
    "buy",
    "shop",
    "salary",
    "which school",
    "best school",
    "famous school",
];

/// Texts shorter than this (in characters) with no keyword evidence are rejected.
pub const MIN_UNMATCHED_LEN: usize = 20;

/// Outcome of [`evaluate`], with the evidence that decided it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentVerdict {
    /// A health term was found. `overrode` is the off-topic indicator that was also present.
    Health {
        term: &'static str,
        overrode: Option<&'static str>,
    },
    /// An off-topic indicator was found and no health term.
    OffTopic { indicator: &'static str },
    /// No keyword at all and fewer than [`MIN_UNMATCHED_LEN`] characters.
    TooShort,
    /// No keyword evidence in a longer text.
    NoEvidence,
}

impl IntentVerdict {
    pub fn is_health(&self) -> bool {
        matches!(self, IntentVerdict::Health { .. })
    }
}

fn first_health_term(lowered: &str) -> Option<&'static str> {
    HEALTH_TERMS.iter().copied().find(|t| lowered.contains(t))
}

/// Classifies `text` and reports why.
pub fn evaluate(text: &str) -> IntentVerdict {
    let lowered = text.to_lowercase();

    if let Some(indicator) = NON_HEALTH_INDICATORS
        .iter()
        .copied()
        .find(|p| lowered.contains(p))
    {
        // Health wins when both kinds of term appear.
        return match first_health_term(&lowered) {
            Some(term) => IntentVerdict::Health {
                term,
                overrode: Some(indicator),
            },
            None => IntentVerdict::OffTopic { indicator },
        };
    }

    if let Some(term) = first_health_term(&lowered) {
        return IntentVerdict::Health {
            term,
            overrode: None,
        };
    }

    if lowered.chars().count() < MIN_UNMATCHED_LEN {
        IntentVerdict::TooShort
    } else {
        IntentVerdict::NoEvidence
    }
}

/// Returns `true` if `text` looks like a health question.
pub fn classify(text: &str) -> bool {
    evaluate(text).is_health()
}

/// Like [`classify`] for input that may be absent; `None` is never health related.
pub fn classify_opt(text: Option<&str>) -> bool {
    text.is_some_and(classify)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symptom_question_is_health() {
        assert!(classify("I have a sore throat and fever"));
    }

    #[test]
    fn test_off_topic_question_is_rejected() {
        assert!(!classify("what's a good movie to watch"));
        assert_eq!(
            evaluate("what's a good movie to watch"),
            IntentVerdict::OffTopic { indicator: "movie" }
        );
    }

    #[test]
    fn test_health_term_wins_over_indicator() {
        let verdict = evaluate("best school for treatment of asthma");
        assert!(verdict.is_health());
        assert_eq!(
            verdict,
            IntentVerdict::Health {
                term: "asthma",
                overrode: Some("school"),
            }
        );
    }

    #[test]
    fn test_short_text_without_keywords_is_rejected() {
        assert!(!classify("hi there"));
        assert_eq!(evaluate("hi there"), IntentVerdict::TooShort);
    }

    #[test]
    fn test_long_text_without_keywords_defaults_to_off_topic() {
        let text = "tell me something interesting about the ocean tides";
        assert!(!classify(text));
        assert_eq!(evaluate(text), IntentVerdict::NoEvidence);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert!(classify("MY CHEST PAIN GETS WORSE AT NIGHT"));
        assert!(!classify("Who Is the president"));
    }

    #[test]
    fn test_first_indicator_in_list_order_is_reported() {
        // "map" precedes "buy" in the indicator list.
        assert_eq!(
            evaluate("buy a map"),
            IntentVerdict::OffTopic { indicator: "map" }
        );
    }

    #[test]
    fn test_substring_matching_counts_embedded_terms() {
        // "cold" is found inside "scolding"; the heuristic does not tokenise.
        assert!(classify("stop scolding me"));
    }

    #[test]
    fn test_empty_and_absent_input() {
        assert!(!classify(""));
        assert!(!classify_opt(None));
        assert!(classify_opt(Some("is insulin safe")));
    }

    #[test]
    fn test_length_threshold_counts_characters() {
        // 19 multi-byte characters: still "short" even though it is more than 20 bytes.
        let text = "ééééééééééééééééééé";
        assert_eq!(text.chars().count(), 19);
        assert_eq!(evaluate(text), IntentVerdict::TooShort);
    }
}
