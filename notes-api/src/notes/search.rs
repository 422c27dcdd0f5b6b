use indexmap::IndexMap;

use super::{Note, NoteId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FullTextIndex {
    Title,
    Content,
}

impl FullTextIndex {
    pub fn table(self) -> &'static str {
        match self {
            Self::Title => "notes_title_fts",
            Self::Content => "notes_content_fts",
        }
    }
}

/// Builds an FTS5 match expression where every word is a prefix term.
///
/// Control characters separate words like whitespace does; FTS5 rejects them
/// inside quoted strings.
///
/// Returns `None` when the text has no searchable words.
pub fn match_expression(text: &str) -> Option<String> {
    let terms = text
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .map(|word| format!("\"{}\"*", word.replace('"', "\"\"")))
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" "))
}

/// Unions title and content hits, keeping the first occurrence of every note,
/// then applies the exact tag filter.
pub fn merge_hits(by_title: Vec<Note>, by_content: Vec<Note>, tag: Option<&str>) -> Vec<Note> {
    let mut merged: IndexMap<NoteId, Note> = IndexMap::with_capacity(by_title.len() + by_content.len());

    for note in by_title.into_iter().chain(by_content) {
        merged.entry(note.id).or_insert(note);
    }

    merged
        .into_values()
        .filter(|note| tag.map_or(true, |tag| note.has_tag(tag)))
        .collect()
}
