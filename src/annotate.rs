//! Sentence splitting, translation and entity tagging of a transcript.
//!
//! Sentences are found with a plain `". "` split. That heuristic mis-splits
//! abbreviations ("Dr. Smith") and some decimals, but the rendered chunks
//! have to line up exactly with the transcript text, so it is kept as is.

use anyhow::{Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::ner::{EntityRecognizer, EntitySpan};
use crate::translate::Translator;

pub const SENTENCE_DELIMITER: &str = ". ";

/// A piece of a sentence; `label` is set for recognized entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub label: Option<String>,
}

impl Span {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            label: None,
        }
    }

    fn tagged(text: &str, label: &str) -> Self {
        Self {
            text: text.to_string(),
            label: Some(label.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    pub source_sentence: String,
    pub translation: String,
    /// Chunks covering the sentence left to right, plus the restored
    /// delimiter when the sentence had one.
    pub entities: Vec<Span>,
}

impl AnnotatedSentence {
    /// Text of all chunks, labels dropped.
    pub fn plain_text(&self) -> String {
        self.entities.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Splits on the literal `". "`. The last piece never carries a delimiter.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(SENTENCE_DELIMITER).collect()
}

/// Cuts `sentence` into plain gaps and labelled entity chunks.
///
/// Span offsets are in characters. They must be ordered and non-overlapping;
/// a span that breaks this is an error.
pub fn tag_sentence(sentence: &str, spans: &[EntitySpan]) -> Result<Vec<Span>> {
    // byte offset of every char boundary, including the end
    let boundaries: Vec<usize> = sentence
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(sentence.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(spans.len() * 2 + 1);
    let mut last_end = 0;

    for span in spans {
        if span.start < last_end || span.start >= span.end || span.end > char_len {
            bail!(
                "entity span {}..{} ({}) is out of order or out of range for a {} char sentence",
                span.start,
                span.end,
                span.label,
                char_len
            );
        }

        let gap = &sentence[boundaries[last_end]..boundaries[span.start]];
        if !gap.is_empty() {
            chunks.push(Span::plain(gap));
        }
        let entity = &sentence[boundaries[span.start]..boundaries[span.end]];
        chunks.push(Span::tagged(entity, &span.label));
        last_end = span.end;
    }

    let rest = &sentence[boundaries[last_end]..];
    if !rest.is_empty() {
        chunks.push(Span::plain(rest));
    }

    Ok(chunks)
}

/// Translates and tags every sentence of `full_text`.
///
/// Joining [`AnnotatedSentence::plain_text`] over the result gives back
/// `full_text`. Translator and recognizer failures abort the whole call.
pub async fn annotate(
    full_text: &str,
    translator: &dyn Translator,
    recognizer: &dyn EntityRecognizer,
) -> Result<Vec<AnnotatedSentence>> {
    let pieces = split_sentences(full_text);
    let last = pieces.len() - 1;
    let mut sentences = Vec::with_capacity(pieces.len());

    for (i, sentence) in pieces.into_iter().enumerate() {
        let has_delimiter = i < last;
        if sentence.is_empty() && !has_delimiter {
            continue;
        }

        let (translation, mut entities) = if sentence.is_empty() {
            (String::new(), Vec::new())
        } else {
            let translation = translator.translate(sentence).await?;
            let spans = recognizer.recognize(sentence).await?;
            (translation, tag_sentence(sentence, &spans)?)
        };

        if has_delimiter {
            entities.push(Span::plain(SENTENCE_DELIMITER));
        }

        debug!(
            "Sentence {}: {} chunks, {} entities",
            i,
            entities.len(),
            entities.iter().filter(|s| s.label.is_some()).count()
        );

        sentences.push(AnnotatedSentence {
            source_sentence: sentence.to_string(),
            translation,
            entities,
        });
    }

    Ok(sentences)
}
