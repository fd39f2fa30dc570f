//! Karma shorthand in channel text.
//!
//! `alice+` and `alice-` move a counter by one; a multi-word line that
//! mentions "thank" and starts with `name:` credits `name`.

/// A counter change requested by a channel line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KarmaChange {
    pub name: String,
    pub delta: i64,
}

impl KarmaChange {
    fn new(name: &str, delta: i64) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            delta,
        })
    }
}

/// Recognise karma shorthand. `None` means the line is not karma.
pub fn parse(text: &str) -> Option<KarmaChange> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.contains(' ') {
        if !text.contains("thank") {
            return None;
        }
        return match text.find(':') {
            Some(i) if i > 0 => KarmaChange::new(&text[..i], 1),
            _ => None,
        };
    }

    if let Some(name) = text.strip_suffix('+') {
        return KarmaChange::new(name.trim_end_matches('+'), 1);
    }
    if let Some(name) = text.strip_suffix('-') {
        return KarmaChange::new(name.trim_end_matches('-'), -1);
    }
    None
}
