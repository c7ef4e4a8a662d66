//! Selection hints for per-frame text artifacts.
//!
//! Lines whose first field is a selected frame index gain one trailing token
//! such as `sel=Bright;score=0.820;src=select_v1.0`. Existing fields are left
//! as they are, so readers that split on whitespace and ignore extra columns
//! keep working. A hint from an earlier run is replaced, not stacked.

use std::collections::BTreeMap;
use std::path::Path;

use super::atomic::write_atomic;
use crate::error::CoreResult;
use crate::selection::SelectionRecord;

const HINT_PREFIX: &str = "sel=";

/// Renders the hint token for one record.
pub fn hint_token(record: &SelectionRecord) -> String {
    match record.score {
        Some(score) => format!(
            "{HINT_PREFIX}{};score={:.3};src={}",
            record.category, score, record.source_tag
        ),
        None => format!("{HINT_PREFIX}{};src={}", record.category, record.source_tag),
    }
}

/// Leading frame index of a line, if it has one.
fn leading_frame_index(line: &str) -> Option<u64> {
    line.trim_start()
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .next()
        .and_then(|field| field.parse().ok())
}

/// Removes a trailing hint token left by an earlier run.
fn strip_hint(line: &str) -> &str {
    let trimmed = line.trim_end();
    match trimmed.rfind(char::is_whitespace) {
        Some(pos) if trimmed[pos..].trim_start().starts_with(HINT_PREFIX) => trimmed[..pos].trim_end(),
        _ => trimmed,
    }
}

/// Annotates `text`, returning the new text and how many lines changed.
pub fn annotate_text(text: &str, selections: &[SelectionRecord]) -> (String, usize) {
    let by_frame: BTreeMap<u64, &SelectionRecord> =
        selections.iter().map(|s| (s.frame_index, s)).collect();

    let mut changed = 0;
    let mut out = String::with_capacity(text.len() + selections.len() * 48);
    for line in text.split_inclusive('\n') {
        let (body, ending) = match line.strip_suffix("\r\n") {
            Some(body) => (body, "\r\n"),
            None => match line.strip_suffix('\n') {
                Some(body) => (body, "\n"),
                None => (line, ""),
            },
        };
        match leading_frame_index(body).and_then(|i| by_frame.get(&i)) {
            Some(record) => {
                let annotated = format!("{} {}", strip_hint(body), hint_token(record));
                if annotated != body {
                    changed += 1;
                }
                out.push_str(&annotated);
            }
            None => out.push_str(body),
        }
        out.push_str(ending);
    }
    (out, changed)
}

/// Annotates the frame list at `path` in place. Returns the number of lines
/// that changed; the file is only rewritten when that is non-zero.
pub fn annotate_frame_list(path: &Path, selections: &[SelectionRecord]) -> CoreResult<usize> {
    let text = std::fs::read_to_string(path)?;
    let (annotated, changed) = annotate_text(&text, selections);
    if changed > 0 {
        write_atomic(path, annotated.as_bytes())?;
    }
    log::debug!("Annotated {} line(s) of {}", changed, path.display());
    Ok(changed)
}
