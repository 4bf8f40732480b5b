//! Language-model extraction fallback: prompt and answer validation

use serde_json::Value;

use receptionist_core::Slots;

use super::{clean_name, find_service, ExtractionContext};
use crate::temporal::{normalize_date, normalize_time};

/// System instructions asking for a single JSON object.
pub fn build_instructions(ctx: &ExtractionContext<'_>) -> String {
    let services: Vec<&str> = ctx.services.iter().map(|s| s.key.as_str()).collect();
    format!(
        "You extract booking details from SMS messages sent to a spa.\n\
         Today is {weekday}, {today}.\n\
         Known services: {services}.\n\
         Reply with ONLY a JSON object with the keys \"service\", \"date\", \"time\" and \"name\".\n\
         - service: one of the known services, or null\n\
         - date: YYYY-MM-DD, or null\n\
         - time: HH:MM in 24-hour format, or null\n\
         - name: the customer's own name exactly as they wrote it, or null\n\
         Use null for anything the customer did not clearly say. Do not guess.",
        weekday = ctx.today.weekday().name(),
        today = ctx.today,
        services = services.join(", "),
    )
}

/// Parse and validate a generator answer.
///
/// Accepts prose or code fences around the object. Every value is re-run
/// through the deterministic normalizers; a name is only kept if the
/// customer actually wrote it in one of `user_texts`.
pub fn parse_response(raw: &str, user_texts: &[&str], ctx: &ExtractionContext<'_>) -> Slots {
    let Some(object) = extract_object(raw) else {
        tracing::debug!(raw_len = raw.len(), "No JSON object in fallback answer");
        return Slots::default();
    };

    let field = |key: &str| string_field(&object, key);

    let service = field("service").and_then(|v| find_service(v, ctx.services));
    let date = field("date").and_then(|v| normalize_date(v, ctx.today));
    let time = field("time").and_then(normalize_time_lenient);
    let name = field("name")
        .and_then(|v| clean_name(v, ctx))
        .filter(|name| written_by_customer(name, user_texts));

    Slots {
        service,
        date,
        time,
        name,
    }
}

fn extract_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn string_field<'a>(object: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null") && !v.eq_ignore_ascii_case("unknown"))
}

/// Models sometimes answer "15" or "1500" for a time.
fn normalize_time_lenient(value: &str) -> Option<receptionist_core::ClockTime> {
    if let Some(time) = normalize_time(value) {
        return Some(time);
    }
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        1 | 2 => receptionist_core::ClockTime::new(digits.parse().ok()?, 0),
        4 => receptionist_core::ClockTime::new(digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        _ => None,
    }
}

fn written_by_customer(name: &str, user_texts: &[&str]) -> bool {
    let haystack = user_texts.join(" ").to_lowercase();
    name.split_whitespace().all(|part| {
        let part = part.to_lowercase();
        haystack
            .split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
            .any(|word| word == part)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::{CivilDate, ServiceEntry};

    fn services() -> Vec<ServiceEntry> {
        vec![
            ServiceEntry::new("massage").with_variants(&["deep tissue"]),
            ServiceEntry::new("facial"),
        ]
    }

    fn ctx(services: &[ServiceEntry]) -> ExtractionContext<'_> {
        ExtractionContext::new(CivilDate::new(2026, 10, 15).unwrap(), services)
    }

    #[test]
    fn test_instructions_mention_catalog_and_date() {
        let services = services();
        let prompt = build_instructions(&ctx(&services));
        assert!(prompt.contains("massage, facial"));
        assert!(prompt.contains("Thursday, 2026-10-15"));
    }

    #[test]
    fn test_parse_wrapped_json() {
        let services = services();
        let raw = "Sure! ```json\n{\"service\": \"Deep Tissue\", \"date\": \"2026-10-16\", \"time\": \"15:00\", \"name\": \"jo\"}\n```";
        let slots = parse_response(raw, &["hey it's jo, deep tissue friday 3?"], &ctx(&services));
        assert_eq!(slots.service.as_deref(), Some("massage"));
        assert_eq!(slots.date.map(|d| d.to_string()).as_deref(), Some("2026-10-16"));
        assert_eq!(slots.time.map(|t| t.to_string()).as_deref(), Some("15:00"));
        assert_eq!(slots.name.as_deref(), Some("Jo"));
    }

    #[test]
    fn test_rejects_invented_values() {
        let services = services();
        let raw = r#"{"service": "haircut", "date": "someday", "time": null, "name": "Jennifer"}"#;
        let slots = parse_response(raw, &["can I come in sometime"], &ctx(&services));
        assert!(slots.is_empty());
    }

    #[test]
    fn test_garbage_is_empty() {
        let services = services();
        assert!(parse_response("I cannot help with that", &["hi"], &ctx(&services)).is_empty());
        assert!(parse_response("{not json}", &["hi"], &ctx(&services)).is_empty());
        assert!(parse_response("[1, 2]", &["hi"], &ctx(&services)).is_empty());
    }

    #[test]
    fn test_lenient_times() {
        assert_eq!(normalize_time_lenient("15").map(|t| t.to_string()).as_deref(), Some("15:00"));
        assert_eq!(normalize_time_lenient("1530").map(|t| t.to_string()).as_deref(), Some("15:30"));
        assert_eq!(normalize_time_lenient("3 PM").map(|t| t.to_string()).as_deref(), Some("15:00"));
        assert_eq!(normalize_time_lenient("later"), None);
    }
}
