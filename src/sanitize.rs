//! Strips translator meta-commentary from raw model output.
//!
//! Translation models tend to wrap their answer in helpfulness artifacts:
//! label lines ("Translation: ..."), markdown fences, whole-text bold
//! markers, and trailing notes. Only the enumerated patterns below are ever
//! removed; anything else passes through untouched so real content is never
//! truncated. `clean` runs to a fixpoint and is therefore idempotent.

/// Leading label lines the translator likes to prepend, lowercase.
const LEADING_LABELS: &[&str] = &[
    "translation:",
    "here is the translation:",
    "here's the translation:",
    "translated text:",
    "vietnamese translation:",
    "bản dịch:",
    "bản dịch tiếng việt:",
];

/// Prefixes of trailing explanation lines, lowercase.
const TRAILING_PHRASES: &[&str] = &[
    "note:",
    "please note",
    "i hope this helps",
    "let me know if",
];

/// Prefixes of standalone parenthetical note lines, lowercase.
const NOTE_LINE_PREFIXES: &[&str] = &["(note", "(lưu ý"];

/// Remove known translator artifacts from `raw`. Idempotent.
pub fn clean(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let text = strip_code_fence(text.trim());
    let text = strip_wrapping_bold(&text);

    let mut lines: Vec<&str> = text.lines().collect();

    // Drop standalone parenthetical note lines anywhere in the text.
    lines.retain(|line| !is_note_line(line));

    // Drop leading empty lines and label-only lines; strip inline labels.
    let mut owned: Vec<String> = Vec::with_capacity(lines.len());
    let mut at_start = true;
    for line in lines {
        if at_start {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(rest) = strip_label_prefix(trimmed) {
                if rest.is_empty() {
                    continue;
                }
                owned.push(rest.to_string());
                at_start = false;
                continue;
            }
            at_start = false;
        }
        owned.push(line.to_string());
    }

    // Drop trailing empty lines and known explanation lines.
    while let Some(last) = owned.last() {
        let trimmed = last.trim();
        let lower = trimmed.to_lowercase();
        if trimmed.is_empty() || TRAILING_PHRASES.iter().any(|p| lower.starts_with(p)) {
            owned.pop();
        } else {
            break;
        }
    }

    owned.join("\n").trim().to_string()
}

/// Strip a single markdown code fence wrapping the entire text.
fn strip_code_fence(text: &str) -> String {
    let text = text.trim();

    if text.starts_with("```") && text.ends_with("```") && text.len() > 6 {
        let inner = &text[3..text.len() - 3];
        // Tolerate a language tag on the opening fence.
        let inner = match inner.split_once('\n') {
            Some((first, rest)) if !first.trim().contains(' ') && !first.trim().is_empty() => rest,
            _ => inner,
        };
        return inner.trim().to_string();
    }

    if text.starts_with('`') && text.ends_with('`') && text.len() > 2 {
        return text[1..text.len() - 1].trim().to_string();
    }

    text.to_string()
}

/// Strip a single pair of bold markers spanning the entire text.
fn strip_wrapping_bold(text: &str) -> String {
    let text = text.trim();
    if text.starts_with("**") && text.ends_with("**") && text.len() > 4 {
        let inner = &text[2..text.len() - 2];
        if !inner.contains("**") {
            return inner.trim().to_string();
        }
    }
    text.to_string()
}

fn strip_label_prefix(line: &str) -> Option<&str> {
    let lower = line.to_lowercase();
    for label in LEADING_LABELS {
        if lower.starts_with(label) {
            return Some(line[label.len()..].trim_start());
        }
    }
    None
}

fn is_note_line(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed.starts_with('(') || !trimmed.ends_with(')') {
        return false;
    }
    let lower = trimmed.to_lowercase();
    NOTE_LINE_PREFIXES.iter().any(|p| lower.starts_with(p))
}
