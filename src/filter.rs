//! Stream filtering for table and canvas views.

use crate::stream::DfgStream;

/// Group filter entry matching streams without a group.
pub const NO_GROUP: &str = "nogroup";

/// Criteria combined with AND; an empty list matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFilter {
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    pub groups: Vec<String>,
    /// Free-text query; ignored when empty, never matches with one character.
    pub search: String,
}

impl StreamFilter {
    /// Filter on the free-text query only.
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            search: query.into(),
            ..Self::default()
        }
    }

    /// Whether `stream` passes every criterion.
    pub fn matches(&self, stream: &DfgStream) -> bool {
        self.matches_sources(stream)
            && self.matches_destinations(stream)
            && self.matches_groups(stream)
            && self.matches_search(stream)
    }

    /// Matching streams in model order.
    pub fn apply<'a>(&self, streams: &'a [DfgStream]) -> Vec<&'a DfgStream> {
        streams.iter().filter(|s| self.matches(s)).collect()
    }

    fn matches_sources(&self, stream: &DfgStream) -> bool {
        self.sources.is_empty() || self.sources.contains(&stream.source.gasket)
    }

    fn matches_destinations(&self, stream: &DfgStream) -> bool {
        self.destinations.is_empty()
            || stream
                .destinations
                .iter()
                .any(|d| self.destinations.contains(&d.gasket))
    }

    fn matches_groups(&self, stream: &DfgStream) -> bool {
        self.groups.is_empty()
            || self.groups.contains(&stream.group)
            || (stream.group.is_empty() && self.groups.iter().any(|g| g == NO_GROUP))
    }

    fn matches_search(&self, stream: &DfgStream) -> bool {
        let query = self.search.as_str();
        if query.is_empty() {
            return true;
        }
        if query.chars().count() < 2 {
            return false;
        }
        matches_start_of_word(&stream.description, query)
            || matches_start_of_word(&stream.group, query)
            || matches_start_of_word(&stream.source.gasket, query)
            || stream
                .destinations
                .iter()
                .any(|d| matches_start_of_word(&d.gasket, query))
    }
}

/// Case-insensitive match of `query` at the start of any word in `text`.
///
/// A word starts where a word character (alphanumeric or `_`) follows a
/// non-word character or the start of the text.
pub fn matches_start_of_word(text: &str, query: &str) -> bool {
    if text.is_empty() || query.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    let query = query.to_lowercase();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let starts_with_word = query.chars().next().is_some_and(is_word);

    let mut previous: Option<char> = None;
    for (offset, c) in text.char_indices() {
        let at_boundary = if starts_with_word {
            is_word(c) && !previous.is_some_and(is_word)
        } else {
            true
        };
        if at_boundary && text[offset..].starts_with(&query) {
            return true;
        }
        previous = Some(c);
    }
    false
}
