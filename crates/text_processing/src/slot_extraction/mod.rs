//! Slot Value Extraction
//!
//! Pulls service, date, time and name out of free-form SMS text. The
//! deterministic path is an ordered pipeline of pure matchers; each one fills
//! only what the earlier ones left empty. History is folded oldest to newest
//! so the latest mention of a field wins, unless the current message signals
//! a change, in which case history is ignored entirely.
//!
//! An optional language-model fallback runs only when the caller still has
//! empty fields after the deterministic pass. Its answer is validated against
//! the same normalizers and never overwrites a value the rules produced.

mod fallback;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use receptionist_core::{CivilDate, ConversationTurn, ServiceEntry, SlotField, Slots, TextGenerator, TurnRole};

use crate::intent::{detect_scope_signal, ScopeSignal};
use crate::temporal::{normalize_date, normalize_time};

pub use fallback::{build_instructions, parse_response};

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything a matcher may look at besides the text itself
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    /// Tenant-local civil date used to resolve relative dates
    pub today: CivilDate,
    /// Tenant service catalog
    pub services: &'a [ServiceEntry],
    /// Field the conversation is currently asking for
    pub expecting: Option<SlotField>,
    /// Tenant display name; its words are never taken as the sender's name
    pub business_name: Option<&'a str>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(today: CivilDate, services: &'a [ServiceEntry]) -> Self {
        Self {
            today,
            services,
            expecting: None,
            business_name: None,
        }
    }

    pub fn with_business_name(mut self, name: &'a str) -> Self {
        self.business_name = Some(name);
        self
    }

    pub fn expecting(mut self, field: SlotField) -> Self {
        self.expecting = Some(field);
        self
    }
}

/// Result of a deterministic extraction pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub slots: Slots,
    /// Current message asked to replace earlier answers; history was not used
    pub scope_signal: Option<ScopeSignal>,
}

impl Extraction {
    pub fn change_requested(&self) -> bool {
        self.scope_signal.is_some()
    }

    pub fn starts_over(&self) -> bool {
        self.scope_signal == Some(ScopeSignal::StartOver)
    }
}

// =============================================================================
// MATCHER PIPELINE
// =============================================================================

type Matcher = fn(&str, &ExtractionContext<'_>) -> Slots;

/// Run in order; earlier matchers win on conflicts.
const PIPELINE: [(&str, Matcher); 4] = [
    ("service", match_service),
    ("date", match_date),
    ("time", match_time),
    ("name", match_name),
];

/// Extract from a single message.
pub fn extract_message(text: &str, ctx: &ExtractionContext<'_>) -> Slots {
    let mut slots = Slots::default();
    for (label, matcher) in PIPELINE.iter() {
        if slots.fill_from(&matcher(text, ctx)) {
            tracing::trace!(matcher = *label, "Matcher filled a slot");
        }
    }
    slots
}

fn match_service(text: &str, ctx: &ExtractionContext<'_>) -> Slots {
    Slots {
        service: find_service(text, ctx.services),
        ..Default::default()
    }
}

fn match_date(text: &str, ctx: &ExtractionContext<'_>) -> Slots {
    Slots {
        date: normalize_date(text, ctx.today),
        ..Default::default()
    }
}

fn match_time(text: &str, _ctx: &ExtractionContext<'_>) -> Slots {
    Slots {
        time: normalize_time(text),
        ..Default::default()
    }
}

fn match_name(text: &str, ctx: &ExtractionContext<'_>) -> Slots {
    Slots {
        name: find_name(text, ctx),
        ..Default::default()
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Catalog key of the longest service phrase in `text`. Plurals are tolerated.
pub fn find_service(text: &str, services: &[ServiceEntry]) -> Option<String> {
    let words = lowercase_words(text);
    let mut best: Option<(&str, usize)> = None;
    for entry in services {
        for phrase in entry.phrases() {
            let phrase = phrase.trim();
            if phrase.is_empty() || !contains_phrase(&words, &lowercase_words(phrase)) {
                continue;
            }
            if best.map_or(true, |(_, len)| phrase.len() > len) {
                best = Some((entry.key.as_str(), phrase.len()));
            }
        }
    }
    best.map(|(key, _)| key.to_string())
}

/// Split on anything that is not a letter or digit, lowercased.
fn lowercase_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Consecutive word match; only the last word may carry a plural suffix.
fn contains_phrase(words: &[String], phrase: &[String]) -> bool {
    let Some((last, head)) = phrase.split_last() else {
        return false;
    };
    words.windows(phrase.len()).any(|window| {
        window[..head.len()] == *head
            && match window[head.len()].strip_prefix(last.as_str()) {
                Some(rest) => matches!(rest, "" | "s" | "es"),
                None => false,
            }
    })
}

// =============================================================================
// NAME
// =============================================================================

/// "my name is alex" style phrases, any casing
static EXPLICIT_NAME: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bmy name is\s+([a-z][a-z'\-]*(?:\s+[a-z][a-z'\-]*){0,2})").unwrap(),
        Regex::new(r"(?i)\bname'?s\s+([a-z][a-z'\-]*(?:\s+[a-z][a-z'\-]*){0,2})").unwrap(),
        Regex::new(r"(?i)\bcall me\s+([a-z][a-z'\-]*)").unwrap(),
        Regex::new(r"(?i)\b(?:under|for) the name\s+([a-z][a-z'\-]*(?:\s+[a-z][a-z'\-]*){0,2})").unwrap(),
    ]
});

/// "I'm Sam" style introductions; the name itself must be capitalized
static INTRO_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[Ii]'?m|[Ii] am|[Tt]his is|[Ii]t'?s)\s+([A-Z][A-Za-z'\-]*(?:\s+[A-Z][A-Za-z'\-]*){0,2})")
        .unwrap()
});

static NOT_A_NAME: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // greetings and acknowledgements
        "hi", "hello", "hey", "yo", "thanks", "thank", "thx", "ty", "yes", "yeah", "yep", "no", "nope", "ok",
        "okay", "sure", "cool", "great", "perfect", "awesome", "fine", "good", "nice", "sounds", "works",
        "please", "pls", "sorry", "morning", "afternoon", "evening", "night",
        // function words
        "i", "i'm", "im", "i'd", "i'll", "it's", "that's", "a", "an", "the", "my", "me", "we", "us", "you",
        "your", "our", "it", "its", "this", "that",
        "these", "those", "there", "here", "and", "or", "but", "so", "also", "just", "not", "at", "on", "in",
        "for", "to", "of", "with", "by", "from", "about", "any", "some", "all", "is", "are", "was", "be",
        "do", "does", "did", "can", "could", "would", "will", "should", "may", "might", "what", "when",
        "where", "who", "how", "which", "why", "let", "lets", "let's", "if", "then", "maybe", "actually",
        // booking vocabulary
        "book", "booking", "appointment", "appt", "schedule", "reserve", "reservation", "need", "want",
        "like", "looking", "interested", "trying", "wondering", "hoping", "available", "availability",
        "open", "free", "confirm", "confirmed", "cancel", "reschedule", "change", "instead", "different",
        "new", "stop", "start", "help", "info", "time", "date", "day", "today", "tomorrow", "tonight",
        "weekend", "next", "noon", "midnight", "am", "pm", "asap", "soon", "later", "earlier", "spa",
        "salon", "studio", "session", "treatment", "service", "services", "price", "prices", "cost",
        "hours", "address", "ready", "back", "again", "still", "only", "too", "very", "much",
    ]
    .into_iter()
    .collect()
});

const MONTH_WORDS: [&str; 24] = [
    "jan", "january", "feb", "february", "mar", "march", "apr", "april", "may", "jun", "june", "jul",
    "july", "aug", "august", "sep", "sept", "september", "oct", "october", "nov", "november", "dec",
    "december",
];

fn is_name_word(word: &str, ctx: &ExtractionContext<'_>) -> bool {
    if word.len() < 2 || !word.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-') {
        return false;
    }
    let lower = word.to_lowercase();
    if NOT_A_NAME.contains(lower.as_str()) || MONTH_WORDS.contains(&lower.as_str()) {
        return false;
    }
    if receptionist_core::Weekday::parse(&lower).is_some() {
        return false;
    }
    if ctx
        .business_name
        .map_or(false, |business| lowercase_words(business).contains(&lower))
    {
        return false;
    }
    !ctx.services
        .iter()
        .flat_map(|s| s.phrases())
        .flat_map(str::split_whitespace)
        .any(|w| {
            let w = w.to_lowercase();
            lower == w || lower.strip_suffix('s') == Some(w.as_str())
        })
}

fn title_case(word: &str) -> String {
    if word.chars().any(char::is_uppercase) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Keep the leading run of name-like words, title-cased.
pub(crate) fn clean_name(raw: &str, ctx: &ExtractionContext<'_>) -> Option<String> {
    let words: Vec<String> = raw
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
        .take_while(|w| is_name_word(w, ctx))
        .take(3)
        .map(title_case)
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn find_name(text: &str, ctx: &ExtractionContext<'_>) -> Option<String> {
    for pattern in EXPLICIT_NAME.iter() {
        if let Some(name) = pattern.captures(text).and_then(|c| c.get(1)).and_then(|m| clean_name(m.as_str(), ctx)) {
            return Some(name);
        }
    }

    if let Some(name) = INTRO_NAME.captures(text).and_then(|c| c.get(1)).and_then(|m| clean_name(m.as_str(), ctx)) {
        return Some(name);
    }

    // First run of capitalized words that are not vocabulary
    let tokens: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
        .collect();
    for (idx, token) in tokens.iter().enumerate() {
        let capitalized = token.chars().next().map_or(false, char::is_uppercase);
        if capitalized && is_name_word(token, ctx) {
            let run: Vec<&str> = tokens[idx..]
                .iter()
                .take_while(|t| t.chars().next().map_or(false, char::is_uppercase))
                .copied()
                .collect();
            return clean_name(&run.join(" "), ctx);
        }
    }

    // A short bare reply to "what name should I use?"
    if ctx.expecting == Some(SlotField::Name) {
        let word_count = text.split_whitespace().count();
        if (1..=3).contains(&word_count) {
            let name = clean_name(text, ctx)?;
            if name.split_whitespace().count() == word_count {
                return Some(name);
            }
        }
    }

    None
}

// =============================================================================
// SLOT EXTRACTOR
// =============================================================================

/// Deterministic extractor with an optional language-model fallback
#[derive(Clone)]
pub struct SlotExtractor {
    generator: Option<Arc<dyn TextGenerator>>,
    fallback_deadline: Duration,
}

impl std::fmt::Debug for SlotExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotExtractor")
            .field("fallback", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field("fallback_deadline", &self.fallback_deadline)
            .finish()
    }
}

impl SlotExtractor {
    /// Rules only
    pub fn new() -> Self {
        Self {
            generator: None,
            fallback_deadline: Duration::from_secs(5),
        }
    }

    /// Rules plus a generator consulted for fields the rules missed.
    /// `deadline` bounds the whole fallback call.
    pub fn with_fallback(generator: Arc<dyn TextGenerator>, deadline: Duration) -> Self {
        Self {
            generator: Some(generator),
            fallback_deadline: deadline,
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.generator.is_some()
    }

    /// Extract from the current message and the prior user turns.
    ///
    /// `history` is oldest first and should not contain `text` itself.
    pub fn extract(&self, text: &str, history: &[ConversationTurn], ctx: &ExtractionContext<'_>) -> Extraction {
        let current = extract_message(text, ctx);

        if let Some(signal) = detect_scope_signal(text) {
            tracing::debug!(signal = ?signal, "Scope signal, ignoring history");
            return Extraction {
                slots: current,
                scope_signal: Some(signal),
            };
        }

        let history_ctx = ExtractionContext {
            expecting: None,
            ..*ctx
        };
        let from_history = history
            .iter()
            .filter(|turn| turn.role == TurnRole::User)
            .fold(Slots::default(), |acc, turn| {
                acc.overlaid_with(&extract_message(&turn.text, &history_ctx))
            });

        Extraction {
            slots: from_history.overlaid_with(&current),
            scope_signal: None,
        }
    }

    /// Ask the generator for the fields the rules could not find.
    ///
    /// Returns `None` when there is no generator, the call fails or times
    /// out, or nothing in the answer survives validation.
    pub async fn fallback(
        &self,
        text: &str,
        history: &[ConversationTurn],
        ctx: &ExtractionContext<'_>,
    ) -> Option<Slots> {
        let generator = self.generator.as_ref()?;
        let instructions = build_instructions(ctx);

        let raw = match tokio::time::timeout(self.fallback_deadline, generator.generate(&instructions, history, text)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(generator = generator.name(), error = %e, "Extraction fallback failed");
                return None;
            },
            Err(_) => {
                tracing::warn!(generator = generator.name(), "Extraction fallback timed out");
                return None;
            },
        };

        let mut user_texts: Vec<&str> = history
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .map(|t| t.text.as_str())
            .collect();
        user_texts.push(text);

        let slots = parse_response(&raw, &user_texts, ctx);
        if slots.is_empty() {
            tracing::debug!("Extraction fallback produced nothing usable");
            None
        } else {
            Some(slots)
        }
    }
}

impl Default for SlotExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn catalog() -> Vec<ServiceEntry> {
        vec![
            ServiceEntry::new("massage").with_variants(&["deep tissue", "hot stone", "back rub"]),
            ServiceEntry::new("facial").with_variants(&["hydrafacial"]),
            ServiceEntry::new("manicure").with_variants(&["mani", "nails"]),
        ]
    }

    fn today() -> CivilDate {
        CivilDate::new(2026, 10, 15).unwrap()
    }

    fn user(text: &str, minute: u32) -> ConversationTurn {
        ConversationTurn::user(text, Utc.with_ymd_and_hms(2026, 10, 15, 14, minute, 0).unwrap())
    }

    #[test]
    fn test_full_message() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services);
        let slots = extract_message("book a massage for tomorrow at 3pm", &ctx);
        assert_eq!(slots.service.as_deref(), Some("massage"));
        assert_eq!(slots.date.map(|d| d.to_string()).as_deref(), Some("2026-10-16"));
        assert_eq!(slots.time.map(|t| t.to_string()).as_deref(), Some("15:00"));
        assert_eq!(slots.name, None);
    }

    #[test]
    fn test_service_variants_and_plurals() {
        let services = catalog();
        assert_eq!(find_service("two hot stone massages please", &services).as_deref(), Some("massage"));
        assert_eq!(find_service("Deep-tissue?", &services).as_deref(), Some("massage"));
        assert_eq!(find_service("a HydraFacial", &services).as_deref(), Some("facial"));
        assert_eq!(find_service("get my nails done", &services).as_deref(), Some("manicure"));
        assert_eq!(find_service("a haircut", &services), None);
        // "mani" must not match inside another word
        assert_eq!(find_service("so many options", &services), None);
    }

    #[test]
    fn test_name_patterns() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services);
        let name = |text: &str| extract_message(text, &ctx).name;

        assert_eq!(name("I'm Sam, book a facial for today at 11pm").as_deref(), Some("Sam"));
        assert_eq!(name("my name is alex smith and I want a massage").as_deref(), Some("Alex Smith"));
        assert_eq!(name("Alex").as_deref(), Some("Alex"));
        assert_eq!(name("Tomorrow works, thanks Jordan").as_deref(), Some("Jordan"));
        assert_eq!(name("I'm looking for a massage"), None);
        assert_eq!(name("Book a Massage on Friday"), None);
        assert_eq!(name("Hi"), None);
        assert_eq!(name("alex"), None);
    }

    #[test]
    fn test_bare_name_when_expecting_one() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services).expecting(SlotField::Name);
        assert_eq!(extract_message("alex", &ctx).name.as_deref(), Some("Alex"));
        assert_eq!(extract_message("sam lee", &ctx).name.as_deref(), Some("Sam Lee"));
        assert_eq!(extract_message("yes please", &ctx).name, None);
        assert_eq!(extract_message("not sure yet honestly", &ctx).name, None);
    }

    #[test]
    fn test_history_latest_wins() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services);
        let history = vec![
            user("can I get a massage tomorrow at 3pm", 0),
            ConversationTurn::assistant("We offer facial and massage. What name?", Utc::now()),
            user("actually 4pm", 2),
        ];
        let extraction = SlotExtractor::new().extract("Alex", &history, &ctx);
        assert!(!extraction.change_requested());
        let slots = extraction.slots;
        assert_eq!(slots.service.as_deref(), Some("massage"));
        assert_eq!(slots.time.map(|t| t.to_string()).as_deref(), Some("16:00"));
        assert_eq!(slots.name.as_deref(), Some("Alex"));
    }

    #[test]
    fn test_change_signal_drops_history() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services);
        let history = vec![user("massage tomorrow at 3pm", 0)];
        let extraction = SlotExtractor::new().extract("make it a facial instead", &history, &ctx);
        assert!(extraction.change_requested());
        assert!(!extraction.starts_over());
        assert_eq!(extraction.slots.service.as_deref(), Some("facial"));
        assert_eq!(extraction.slots.date, None);
        assert_eq!(extraction.slots.time, None);
    }

    #[test]
    fn test_start_over_drops_history() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services);
        let history = vec![user("massage tomorrow at 3pm, I'm Alex", 0)];
        let extraction = SlotExtractor::new().extract("can we start over", &history, &ctx);
        assert!(extraction.starts_over());
        assert!(extraction.slots.is_empty());
    }

    #[test]
    fn test_business_name_is_not_a_customer_name() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services).with_business_name("Serenity Day Spa");
        let name = |text: &str| extract_message(text, &ctx).name;

        assert_eq!(name("Can I book a massage at Serenity Spa tomorrow at 3pm"), None);
        assert_eq!(name("Hi Serenity, this is Jordan"), Some("Jordan".to_string()));
        assert_eq!(name("Serenity Day Spa? Dana here"), Some("Dana".to_string()));

        let expecting = ctx.expecting(SlotField::Name);
        assert_eq!(extract_message("serenity", &expecting).name, None);
    }

    struct CannedGenerator {
        answer: &'static str,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _: &str, _: &[ConversationTurn], _: &str) -> receptionist_core::Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok(self.answer.to_string())
        }
    }

    #[tokio::test]
    async fn test_fallback_fills_validated_fields() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services);
        let generator = Arc::new(CannedGenerator {
            answer: r#"{"service": "massage", "date": null, "time": "17:30", "name": "Riley"}"#,
            delay: Duration::ZERO,
        });
        let extractor = SlotExtractor::with_fallback(generator, Duration::from_secs(1));
        let slots = extractor
            .fallback("hey riley here, could I get a rubdown around half five", &[], &ctx)
            .await
            .unwrap();
        assert_eq!(slots.service.as_deref(), Some("massage"));
        assert_eq!(slots.time.map(|t| t.to_string()).as_deref(), Some("17:30"));
        assert_eq!(slots.name.as_deref(), Some("Riley"));
        assert_eq!(slots.date, None);
    }

    #[tokio::test]
    async fn test_fallback_deadline() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services);
        let generator = Arc::new(CannedGenerator {
            answer: r#"{"service": "facial"}"#,
            delay: Duration::from_millis(200),
        });
        let extractor = SlotExtractor::with_fallback(generator, Duration::from_millis(20));
        assert!(extractor.fallback("something", &[], &ctx).await.is_none());
    }

    #[tokio::test]
    async fn test_fallback_absent_without_generator() {
        let services = catalog();
        let ctx = ExtractionContext::new(today(), &services);
        let extractor = SlotExtractor::new();
        assert!(!extractor.has_fallback());
        assert!(extractor.fallback("whatever", &[], &ctx).await.is_none());
    }
}
