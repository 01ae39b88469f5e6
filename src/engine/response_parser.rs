use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::tutor_reply::{ParsedReply, ReplyData, SessionSummary, TurnMetadata};

/// A `{` followed by anything up to the last `}` of the text, with nothing
/// but whitespace after it.
static TRAILING_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}\s*$").expect("invalid trailing object regex"));

/// Splits a raw tutor reply into display text and its trailing tracking block.
///
/// Never fails: a block that does not parse is left in the display text,
/// flagged with `block_rejected` and logged. The block is classified by key
/// presence, `total_turns` before `scene`, so a summary always wins over turn
/// metadata.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let (start, object) = match find_trailing_object(raw) {
        Candidate::Found(start, object) => (start, object),
        Candidate::Absent => return ParsedReply::plain(raw.trim()),
        Candidate::Unparsable => {
            return ParsedReply {
                display_text: raw.trim().to_string(),
                data: None,
                block_rejected: true,
            }
        }
    };

    let data = classify(object);
    ParsedReply {
        display_text: raw[..start].trim().to_string(),
        block_rejected: matches!(data, Err(())),
        data: data.unwrap_or(None),
    }
}

enum Candidate {
    Found(usize, Map<String, Value>),
    Absent,
    Unparsable,
}

/// Tries each candidate opening brace from the left; the first one whose
/// tail parses as a JSON object wins.
fn find_trailing_object(raw: &str) -> Candidate {
    let mut from = 0;
    let mut last_error = None;

    while let Some(candidate) = TRAILING_OBJECT.find_at(raw, from) {
        match serde_json::from_str::<Value>(candidate.as_str()) {
            Ok(Value::Object(object)) => return Candidate::Found(candidate.start(), object),
            Ok(_) => {}
            Err(err) => last_error = Some(err),
        }
        // `{` is a single byte, so this stays on a char boundary.
        from = candidate.start() + 1;
    }

    match last_error {
        Some(err) => {
            warn!(error = %err, "failed to parse trailing JSON in reply; showing it as plain text");
            Candidate::Unparsable
        }
        None => Candidate::Absent,
    }
}

/// `Err` when a recognised block has a shape that cannot be read.
fn classify(object: Map<String, Value>) -> Result<Option<ReplyData>, ()> {
    if object.contains_key("total_turns") {
        return serde_json::from_value::<SessionSummary>(Value::Object(object))
            .map(|summary| Some(ReplyData::Summary(summary)))
            .map_err(|err| warn!(error = %err, "session summary block has an unexpected shape"));
    }

    if object.contains_key("scene") {
        return serde_json::from_value::<TurnMetadata>(Value::Object(object))
            .map(|meta| Some(ReplyData::Turn(meta)))
            .map_err(|err| warn!(error = %err, "turn metadata block has an unexpected shape"));
    }

    debug!(keys = ?object.keys().collect::<Vec<_>>(), "trailing JSON is neither metadata nor summary");
    Ok(None)
}
