// Read-only export of the ledger.

use serde::Serialize;

use crate::submission::Submission;

/// Export shape mirroring the persisted layout: counter plus records.
#[derive(Debug, Serialize)]
pub struct ExportDump<'a> {
    pub counter: u64,
    pub records: &'a [Submission],
}

/// Render all records as pretty JSON. The next counter value is derived
/// from the highest id so the dump stands alone.
pub fn render_dump(records: &[Submission]) -> Result<String, serde_json::Error> {
    let counter = records.iter().map(|s| s.id.0).max().unwrap_or(0) + 1;
    serde_json::to_string_pretty(&ExportDump { counter, records })
}

/// Split rendered text into chunks no longer than `max_len`, breaking on
/// line boundaries where possible so a chat delivery channel with a
/// message-size cap can post the dump verbatim.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    // max_message_len comes from configuration; treat a zero as 1
    // rather than panicking.
    let max_len = max_len.max(1);

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.len() + line.len() > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if line.len() > max_len {
            // A single oversized line gets hard-split.
            let mut rest = line;
            while rest.len() > max_len {
                let (head, tail) = rest.split_at(split_index(rest, max_len));
                chunks.push(head.to_string());
                rest = tail;
            }
            current.push_str(rest);
        } else {
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Largest char boundary at or below `max_len`. Falls back to the width
/// of the first char when `max_len` cannot hold even one, so a split
/// always makes progress.
fn split_index(s: &str, max_len: usize) -> usize {
    let mut index = max_len.min(s.len());
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    if index == 0 {
        index = s.chars().next().map(char::len_utf8).unwrap_or(0);
    }
    index
}
