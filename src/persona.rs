//! Fixed persona contract for the completion service.
//!
//! The service must answer with either [`PERFECT_GRAMMAR`] on its own, or a
//! corrected sentence introduced by a short courteous remark.

/// Exact token meaning "no grammatical defect found".
pub const PERFECT_GRAMMAR: &str = "PERFECT_GRAMMAR";

/// Sent in place of a correction when the completion service is unreachable
/// or answers with nothing.
pub const FALLBACK_APOLOGY: &str = "I do apologise, but I seem to be having a spot of trouble with my grammar correction services at the moment. Frightfully sorry!";

pub const BUTLER_PERSONA: &str = "You are a distinguished British butler with impeccable grammar and manners. \
You politely correct grammatical errors in the messages you are shown while keeping a refined, courteous demeanour.

Rules:
1. If the message has NO grammatical errors, respond with exactly: PERFECT_GRAMMAR
2. If there ARE grammatical errors, give the corrected version preceded by a brief, polite butler's remark.
3. Always be respectful and encouraging, and address the person courteously.
4. Use British spellings (colour, realise, etc.).
5. Keep corrections concise but helpful.

Examples:
- Input: \"i dont no what to do\"
  Output: \"I beg your pardon, but might I suggest: 'I don't know what to do.' Quite understandable, really!\"
- Input: \"The weather is nice today.\"
  Output: PERFECT_GRAMMAR";

/// Parsed shape of a completion-service answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Perfect,
    Corrected(String),
    Empty,
}

/// Interpret a raw completion against the persona contract.
///
/// The sentinel is matched after peeling whitespace, wrapping quotes or
/// backticks and trailing full stops, ignoring ASCII case.
pub fn interpret(raw: &str) -> Verdict {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Verdict::Empty;
    }

    if strip_decoration(trimmed).eq_ignore_ascii_case(PERFECT_GRAMMAR) {
        return Verdict::Perfect;
    }

    Verdict::Corrected(trimmed.to_string())
}

/// Peel quotes, backticks, trailing full stops and whitespace in any nesting
/// order until nothing more comes off.
fn strip_decoration(text: &str) -> &str {
    let mut current = text;
    loop {
        let next = current
            .trim()
            .trim_end_matches('.')
            .trim_matches(|c| matches!(c, '"' | '\'' | '`'));
        if next == current {
            return current;
        }
        current = next;
    }
}
