use crate::error::IngestError;
use crate::models::{
    Chunk, Document, IngestionOptions, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
use regex::Regex;
use std::collections::VecDeque;
use tracing::warn;

pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Tried in order, coarsest first. An empty separator splits into characters.
    pub separators: Vec<String>,
    pub separators_are_regex: bool,
    pub strip_whitespace: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            separators_are_regex: false,
            strip_whitespace: true,
        }
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
            ..Self::default()
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.separators.is_empty() {
            return Err(IngestError::InvalidChunkConfig(
                "at least one separator is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Separator {
    Pattern(Regex),
    Characters,
}

impl Separator {
    fn matches(&self, text: &str) -> bool {
        match self {
            Self::Pattern(pattern) => pattern.is_match(text),
            Self::Characters => true,
        }
    }

    /// Splits `text` keeping each separator at the start of the piece that follows it.
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        match self {
            Self::Characters => text
                .char_indices()
                .map(|(start, ch)| &text[start..start + ch.len_utf8()])
                .collect(),
            Self::Pattern(pattern) => {
                let mut pieces = Vec::new();
                let mut last = 0;
                for found in pattern.find_iter(text) {
                    pieces.push(&text[last..found.start()]);
                    last = found.start();
                }
                pieces.push(&text[last..]);
                pieces.retain(|piece| !piece.is_empty());
                pieces
            }
        }
    }
}

/// Splits text on the coarsest boundary that keeps pieces under `chunk_size`,
/// falling back to finer boundaries, and merges neighbouring pieces into
/// overlapping chunks.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    config: ChunkingConfig,
    separators: Vec<Separator>,
}

impl RecursiveCharacterSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;

        let separators = config
            .separators
            .iter()
            .map(|separator| -> Result<Separator, IngestError> {
                if separator.is_empty() {
                    Ok(Separator::Characters)
                } else if config.separators_are_regex {
                    Ok(Separator::Pattern(Regex::new(separator)?))
                } else {
                    Ok(Separator::Pattern(Regex::new(&regex::escape(separator))?))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { config, separators })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|document| {
                self.split_text(&document.text)
                    .into_iter()
                    .enumerate()
                    .map(|(index, text)| Chunk {
                        text,
                        metadata: document.metadata.clone(),
                        index,
                    })
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        let (separator, finer) = match separators.iter().position(|sep| sep.matches(text)) {
            Some(found) => (&separators[found], &separators[found + 1..]),
            None => match separators.last() {
                Some(last) => (last, &separators[separators.len()..]),
                None => return self.finish(text).into_iter().collect(),
            },
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in separator.split(text) {
            if char_len(piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }

            if finer.is_empty() {
                chunks.extend(self.finish(piece));
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut merged = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > size && !window.is_empty() {
                if total > size {
                    warn!(
                        chunk_chars = total,
                        chunk_size = size,
                        "created chunk longer than chunk_size"
                    );
                }
                merged.extend(self.join(&window));

                while total > overlap || (total + len > size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((*piece, len));
            total += len;
        }

        merged.extend(self.join(&window));
        merged
    }

    fn join(&self, window: &VecDeque<(&str, usize)>) -> Option<String> {
        let joined = window.iter().map(|(piece, _)| *piece).collect::<String>();
        self.finish(&joined)
    }

    fn finish(&self, text: &str) -> Option<String> {
        let text = if self.config.strip_whitespace {
            text.trim()
        } else {
            text
        };

        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;
    use std::path::Path;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveCharacterSplitter {
        RecursiveCharacterSplitter::new(ChunkingConfig {
            chunk_size,
            chunk_overlap,
            ..ChunkingConfig::default()
        })
        .expect("valid config")
    }

    /// Lowercase letters only, so splitting falls through to single characters.
    fn unbroken_text(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'a' + ((i * 7 + i / 26) % 26) as u8))
            .collect()
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let config = ChunkingConfig {
            chunk_size: 50,
            chunk_overlap: 50,
            ..ChunkingConfig::default()
        };
        assert!(matches!(
            RecursiveCharacterSplitter::new(config),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn zero_size_and_empty_separators_are_rejected() {
        let zero = ChunkingConfig {
            chunk_size: 0,
            chunk_overlap: 0,
            ..ChunkingConfig::default()
        };
        let no_separators = ChunkingConfig {
            separators: Vec::new(),
            ..ChunkingConfig::default()
        };
        assert!(zero.validate().is_err());
        assert!(no_separators.validate().is_err());
    }

    #[test]
    fn invalid_regex_separator_is_reported() {
        let config = ChunkingConfig {
            separators: vec!["(".to_string()],
            separators_are_regex: true,
            ..ChunkingConfig::default()
        };
        assert!(matches!(
            RecursiveCharacterSplitter::new(config),
            Err(IngestError::RegexError(_))
        ));
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunks = splitter(500, 50).split_text("  Hello world.\n");
        assert_eq!(chunks, vec!["Hello world.".to_string()]);
    }

    #[test]
    fn blank_text_produces_no_chunks() {
        assert!(splitter(500, 50).split_text("").is_empty());
        assert!(splitter(500, 50).split_text(" \n\n \t").is_empty());
    }

    #[test]
    fn unbroken_text_splits_into_overlapping_windows() {
        let text = unbroken_text(1200);
        let chunks = splitter(500, 50).split_text(&text);

        let lengths = chunks.iter().map(|c| c.chars().count()).collect::<Vec<_>>();
        assert_eq!(lengths, vec![500, 500, 300]);
        assert_eq!(chunks[0], text[0..500]);
        assert_eq!(chunks[1], text[450..950]);
        assert_eq!(chunks[2], text[900..1200]);
    }

    #[test]
    fn removing_overlaps_reconstructs_the_text() {
        let text = unbroken_text(2345);
        let chunks = splitter(500, 50).split_text(&text);

        let mut rebuilt = chunks[0].clone();
        for pair in chunks.windows(2) {
            let shared = &pair[0][pair[0].len() - 50..];
            assert!(pair[1].starts_with(shared));
            rebuilt.push_str(&pair[1][50..]);
        }

        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn paragraphs_are_preferred_over_words() {
        let first = "alpha ".repeat(10);
        let second = "beta ".repeat(10);
        let text = format!("{}\n\n{}", first.trim_end(), second.trim_end());

        let chunks = splitter(70, 10).split_text(&text);

        assert_eq!(chunks, vec![first.trim_end().to_string(), second.trim_end().to_string()]);
    }

    #[test]
    fn long_paragraph_falls_back_to_word_boundaries() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = splitter(20, 5).split_text(text);

        assert_eq!(
            chunks,
            vec![
                "one two three four".to_string(),
                "four five six seven".to_string(),
                "eight nine ten".to_string(),
            ]
        );
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn lengths_are_counted_in_characters() {
        let text = "é".repeat(30);
        let chunks = splitter(10, 2).split_text(&text);

        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks[0], "é".repeat(10));
        assert_eq!(chunks[1], "é".repeat(10));
    }

    #[test]
    fn regex_separators_split_on_matches() {
        let splitter = RecursiveCharacterSplitter::new(ChunkingConfig {
            chunk_size: 12,
            chunk_overlap: 0,
            separators: vec![r"\d\.".to_string(), String::new()],
            separators_are_regex: true,
            strip_whitespace: true,
        })
        .expect("valid config");

        let chunks = splitter.split_text("1. first 2. second");
        assert_eq!(chunks, vec!["1. first".to_string(), "2. second".to_string()]);
    }

    #[test]
    fn documents_keep_metadata_and_order() {
        let source = Path::new("docs/guide.pdf");
        let documents = vec![
            Document::new(unbroken_text(700), DocumentMetadata::page(source, 1)),
            Document::new("   ", DocumentMetadata::page(source, 2)),
            Document::new("short page", DocumentMetadata::page(source, 3)),
        ];

        let chunks = splitter(500, 50).split_documents(&documents);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].metadata.page, Some(1));
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].metadata.page, Some(1));
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[2].metadata.page, Some(3));
        assert_eq!(chunks[2].index, 0);
        assert_eq!(chunks[2].text, "short page");
        assert!(chunks.iter().all(|c| c.metadata.source == source));
    }
}
