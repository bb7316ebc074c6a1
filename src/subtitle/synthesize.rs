use log::warn;
use serde_json::Value;

use crate::subtitle::timecode::{format_seconds, parse_time_to_seconds};

/// Display duration used when the next cue cannot supply an end time.
const DEFAULT_DURATION: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleBlock {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Derives one timed subtitle block per usable transcript entry.
///
/// Transcripts arrive with sparse start-only timestamps, so each entry's end
/// time is inferred: the next entry's start when it parses and is strictly
/// later, otherwise start plus a fixed default duration. Entries with
/// missing or non-string fields, or unparsable timestamps, are skipped.
///
/// Block indices follow the entry's position in the input (`i + 1`), not a
/// compacted count of emitted blocks, so skipped entries leave gaps.
/// Downstream consumers read those gaps as dropped entries; keep it that way.
pub fn synthesize(entries: &[Value]) -> Vec<SubtitleBlock> {
    let mut blocks = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        let fields = (
            entry.get("text").and_then(Value::as_str),
            entry.get("timestamp").and_then(Value::as_str),
            entry.get("speaker").and_then(Value::as_str),
        );
        let (Some(text), Some(timestamp), Some(_speaker)) = fields else {
            warn!("Skipping entry with missing/invalid fields at index {i}: {entry}");
            continue;
        };

        let Some(start) = parse_time_to_seconds(timestamp) else {
            warn!("Skipping entry due to invalid timestamp format at index {i}: \"{timestamp}\"");
            continue;
        };

        let end = match entries.get(i + 1) {
            Some(next) => match next.get("timestamp").and_then(Value::as_str) {
                Some(next_timestamp) => match parse_time_to_seconds(next_timestamp) {
                    Some(next_start) if next_start > start => next_start,
                    _ => {
                        warn!(
                            "Invalid, out-of-order, or unparsable timestamp for next entry at index {} (\"{next_timestamp}\"). Using default duration for entry {i}.",
                            i + 1
                        );
                        start + DEFAULT_DURATION
                    }
                },
                None => {
                    warn!(
                        "Invalid next entry or timestamp field at index {}. Using default duration for entry {i}.",
                        i + 1
                    );
                    start + DEFAULT_DURATION
                }
            },
            None => start + DEFAULT_DURATION,
        };

        blocks.push(SubtitleBlock {
            index: i + 1,
            start,
            end,
            text: text.to_string(),
        });
    }

    blocks
}

/// Renders subtitle blocks in SubRip format.
pub fn render_srt(blocks: &[SubtitleBlock]) -> String {
    let mut srt = String::new();
    for block in blocks {
        srt.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            block.index,
            format_seconds(block.start),
            format_seconds(block.end),
            block.text
        ));
    }
    srt
}
