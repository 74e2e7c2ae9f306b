//! Prompt templates and context formatting.
//!
//! Every generation call in the pipeline goes through one of the builders
//! here: the consultation reply, per-turn insight extraction, condition
//! detection, and cumulative summarization.

use medconsult_types::consultation::{Consultation, TimelineEntry};
use medconsult_types::retrieval::ContextRecord;

/// Shown in place of the session history for the first turn.
pub const NO_SESSION_HISTORY: &str = "No prior history in this session.";

/// Seed for the first summarization of a consultation.
pub const EMPTY_SUMMARY: &str = "This is the start of the summary.";

/// Fallback when retrieval found nothing above the threshold.
pub fn no_records_found(similarity_threshold: f32) -> String {
    format!("No highly relevant historical records found (Similarity < {similarity_threshold:.2}).")
}

/// Session continuity block: heading, start time, and current summary.
pub fn format_session_metadata(consultation: &Consultation) -> String {
    let summary = if consultation.summary.trim().is_empty() {
        "No current summary available."
    } else {
        consultation.summary.trim()
    };
    format!(
        "Current Session Heading: {}\nCurrent Session Start Date: {}\nCurrent Session Summary: {}",
        consultation.heading,
        consultation.created_at.format("%Y-%m-%d %H:%M:%S"),
        summary,
    )
}

/// Dialogue transcript of the given entries, in the order given.
///
/// Callers pass entries oldest first. Returns an empty string for no entries.
pub fn format_timeline(entries: &[TimelineEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("USER: {}\nMODEL: {}", e.user_query, e.model_response))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Numbered historical-record blocks for the prompt.
///
/// Returns an empty string for no records.
pub fn format_health_records(records: &[ContextRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "--- [{}] {} - {} ---\nRelevance: {:.4}\nDate: {}\nSource Snippet: {}",
                i + 1,
                r.kind,
                r.title,
                r.similarity,
                r.date.format("%Y-%m-%d"),
                r.snippet,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Full consultation prompt with the four context blocks.
pub fn consultation_prompt(
    session_metadata: &str,
    timeline_context: &str,
    health_records_context: &str,
    similarity_threshold: f32,
    max_chunks: usize,
    recent_turns: u32,
    user_query: &str,
) -> String {
    let timeline = non_empty_or(timeline_context, NO_SESSION_HISTORY.to_string());
    let records = non_empty_or(health_records_context, no_records_found(similarity_threshold));
    format!(
        r#"You are a specialized medical consultation assistant. You interpret the patient's health question in light of their structured medical history.

### ROLE AND GUIDELINES
1. Keep a compassionate, objective, and professional tone.
2. Ground your answer in the HISTORICAL HEALTH RECORDS below. They were pre-filtered for relevance (cosine similarity > {similarity_threshold:.2}) and capped at the best {max_chunks}.
3. Safety first:
   * NEVER give a definitive diagnosis, specific dosages, or advice that only a licensed practitioner should give.
   * Frame answers as informational and contextual ("Based on your records, ...", "This symptom could be related to ...").
   * If the context does not support an answer, say so and advise the patient to consult their physician.
4. Use the SESSION METADATA and SESSION HISTORY to keep continuity across follow-up questions.
5. Keep the response concise, clinically accurate, and easy to read.

--- CONTEXT: CURRENT SESSION METADATA ---
{session_metadata}

--- CONTEXT: CURRENT SESSION HISTORY (Last {recent_turns} Turns) ---
{timeline}

--- CONTEXT: HISTORICAL HEALTH RECORDS (Top {max_chunks} Relevant Chunks) ---
{records}

--- USER QUERY ---
{user_query}

### YOUR RESPONSE:
"#
    )
}

/// Insight extraction prompt for a single turn.
pub fn insight_prompt(user_query: &str, model_response: &str, schema_json: &str) -> String {
    format!(
        r#"You compress single consultation turns into structured, searchable clinical insights.

### INSTRUCTIONS
1. If the turn is trivial (greetings, "yes", "no", "thank you"), set `insight_found` to false and leave `compressed_summary` and `primary_condition_or_symptom` empty.
2. Otherwise set `insight_found` to true. `compressed_summary` must cover the core clinical finding (symptom change, medication context, or advice given) in at most three lines. It is the text used for future semantic search.
3. Output a single JSON object matching the schema. No markdown, no commentary.

--- CONVERSATION TURN ---
USER QUERY: {user_query}
MODEL RESPONSE: {model_response}

--- JSON SCHEMA ---
{schema_json}

OUTPUT:
"#
    )
}

/// Numbered model responses of the entries under review.
pub fn format_new_entries(entries: &[TimelineEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{}] {}", i + 1, e.model_response))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Condition detection prompt.
pub fn detection_prompt(
    summary_context: &str,
    new_entries_context: &str,
    health_records_context: &str,
    schema_json: &str,
) -> String {
    format!(
        r#"You are a medical entity extraction system. Analyze the consultation data and decide which database actions are needed for conditions, symptoms, and adverse drug reactions.

### INSTRUCTIONS
1. Return an object with an `actions` list. Each action has a `mode`.
2. 'add': a new condition, symptom, or adverse drug reaction (ADR) strongly suggested by the NEW CONVERSATION ENTRIES and not already documented in the HISTORICAL RECORDS. Provide `condition_name` and `condition_type`.
3. 'update': a change of status (resolution, recurrence) for a condition identifiable in the HISTORICAL RECORDS. Give the condition's exact name and a placeholder `condition_id` (e.g. 101); the caller maps it to the real record.
4. 'ignore': trivial findings or conditions already fully covered by the history.
5. Every action carries short `notes` and a `certainty_level` between 0.0 and 1.0.
6. Output JSON only, matching the schema. No markdown, no commentary.

--- CONTEXT DATA FOR ANALYSIS ---

1. CONSULTATION SUMMARY:
{summary_context}

2. NEW CONVERSATION ENTRIES (Model Responses):
{new_entries_context}

3. HISTORICAL HEALTH RECORDS (For determining novelty):
{health_records_context}

--- JSON SCHEMA ---
{schema_json}

OUTPUT:
"#
    )
}

/// Timeline block for summarization: `USER (HH:MM): ...` / `MODEL (HH:MM): ...`.
pub fn format_summary_timeline(entries: &[TimelineEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            let at = e.created_at.format("%H:%M");
            format!("USER ({at}): {}\nMODEL ({at}): {}", e.user_query, e.model_response)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Cumulative summarization prompt.
pub fn summarization_prompt(existing_summary: &str, conversation_timeline: &str) -> String {
    let existing = non_empty_or(existing_summary, EMPTY_SUMMARY.to_string());
    format!(
        r#"You are a clinical summarization engine. Update the EXISTING SUMMARY by integrating the new clinical information from the CONVERSATION TIMELINE.

### INSTRUCTIONS
1. Produce one cohesive narrative that replaces the existing summary.
2. Keep only chief complaints, symptom changes, medication discussions, key findings, and final recommendations. Drop conversational filler.
3. Use 3 to 5 sentences, at most 80 words.
4. No headings, bullet points, or introductory phrases. Start directly with the summary text.

--- EXISTING SUMMARY (To be updated) ---
{existing}

--- CONVERSATION TIMELINE (New Entries) ---
{conversation_timeline}

--- NEW CUMULATIVE SUMMARY ---
"#
    )
}

fn non_empty_or(value: &str, fallback: String) -> String {
    if value.trim().is_empty() {
        fallback
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use medconsult_types::retrieval::RecordKind;
    use uuid::Uuid;

    fn entry(query: &str, response: &str, hour: u32, minute: u32) -> TimelineEntry {
        let mut e = TimelineEntry::new(Uuid::now_v7(), query, response);
        e.created_at = Utc.with_ymd_and_hms(2025, 3, 1, hour, minute, 0).unwrap();
        e
    }

    #[test]
    fn test_consultation_prompt_uses_fallbacks() {
        let prompt = consultation_prompt("Heading: x", "", "", 0.5, 4, 5, "Should I stop my Lisinopril?");
        assert!(prompt.contains(NO_SESSION_HISTORY));
        assert!(prompt.contains("No highly relevant historical records found (Similarity < 0.50)."));
        assert!(prompt.contains("Should I stop my Lisinopril?"));
        assert!(prompt.contains("(Last 5 Turns)"));
    }

    #[test]
    fn test_format_timeline_dialogue() {
        let text = format_timeline(&[entry("hi", "hello", 9, 0), entry("cough?", "since when?", 9, 5)]);
        assert_eq!(text, "USER: hi\nMODEL: hello\n\nUSER: cough?\nMODEL: since when?");
    }

    #[test]
    fn test_summary_timeline_has_clock_times() {
        let text = format_summary_timeline(&[entry("dizzy", "check BP", 14, 7)]);
        assert_eq!(text, "USER (14:07): dizzy\nMODEL (14:07): check BP");
    }

    #[test]
    fn test_summarization_prompt_seeds_empty_summary() {
        let prompt = summarization_prompt("  ", "USER (10:00): x");
        assert!(prompt.contains(EMPTY_SUMMARY));
        assert!(prompt.ends_with("--- NEW CUMULATIVE SUMMARY ---\n"));
    }

    #[test]
    fn test_format_health_records_numbered() {
        let record = ContextRecord {
            kind: RecordKind::Condition,
            id: Uuid::now_v7(),
            title: "Hypertension".to_string(),
            snippet: "Controlled with lifestyle changes.".to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(),
            similarity: 0.77,
        };
        let text = format_health_records(&[record]);
        assert!(text.starts_with("--- [1] Condition - Hypertension ---"));
        assert!(text.contains("Relevance: 0.7700"));
        assert!(text.contains("Date: 2024-03-15"));
    }

    #[test]
    fn test_session_metadata_without_summary() {
        let c = Consultation::new(Uuid::now_v7(), "Chest pain follow-up", None);
        let text = format_session_metadata(&c);
        assert!(text.contains("Current Session Heading: Chest pain follow-up"));
        assert!(text.contains("No current summary available."));
    }
}
