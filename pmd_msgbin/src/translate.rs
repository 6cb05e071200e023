//! Replacement of japanese text runs with their translation.
//!
//! The unit of work is a column of cells. Every maximal run of japanese
//! characters found in the text cells is collected, the distinct runs are
//! submitted in a single batch to a [`Translator`], and each run is then
//! substituted by its translation where it appeared. Everything else
//! (ascii, punctuation, whitespace, non text cells) is passed through
//! untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use thiserror::Error as ThisError;

/// A value of a tabular column: either a text, or an opaque non text cell
/// that is carried through substitution unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// a text cell, candidate for substitution
    Text(String),
    /// a non text cell (empty or otherwise untyped), left untouched
    Opaque,
}

/// An error that may occur during [`replace_japanese_runs`]
#[derive(ThisError, Debug)]
pub enum SubstituteError {
    #[error("the translator failed")]
    Translator(#[source] Box<dyn Error + Send + Sync>),
    #[error("the translator returned {got} translations for {expected} inputs")]
    LengthMismatch { expected: usize, got: usize },
}

/// An external capability that turn a batch of japanese strings into their
/// translation.
///
/// The implementation can be anything from a fixed glossary to a neural
/// model. The returned list must be parallel to the input one. A stateful
/// translator (a model loaded on a gpu for example) is initialised by the
/// caller, once per process.
pub trait Translator {
    /// Translate every string of the batch, keeping the order.
    fn translate_many(&mut self, inputs: &[String])
        -> Result<Vec<String>, Box<dyn Error + Send + Sync>>;
}

/// A [`Translator`] backed by a fixed mapping. Inputs absent from the
/// mapping are returned unchanged.
#[derive(Debug, Default)]
pub struct GlossaryTranslator {
    translations: BTreeMap<String, String>,
}

impl GlossaryTranslator {
    /// Create a glossary with no translation.
    pub fn new_empty() -> Self {
        GlossaryTranslator {
            translations: BTreeMap::new(),
        }
    }

    /// Register a translation.
    pub fn add_translation(&mut self, source: impl Into<String>, translation: impl Into<String>) {
        self.translations.insert(source.into(), translation.into());
    }

    /// return the number of known translations
    pub fn len(&self) -> usize {
        self.translations.len()
    }

    /// return true if the glossary know no translation
    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

impl Translator for GlossaryTranslator {
    fn translate_many(
        &mut self,
        inputs: &[String],
    ) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        Ok(inputs
            .iter()
            .map(|input| {
                self.translations
                    .get(input)
                    .cloned()
                    .unwrap_or_else(|| input.clone())
            })
            .collect())
    }
}

// Hiragana, katakana and the common kanji block
fn is_japanese(chara: char) -> bool {
    matches!(chara, '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FAF}')
}

/// Enumerate the maximal japanese runs of the text, in order of occurence,
/// with their byte position.
fn japanese_runs(text: &str) -> Vec<(usize, &str)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (position, chara) in text.char_indices() {
        if is_japanese(chara) {
            if start.is_none() {
                start = Some(position);
            }
        } else if let Some(begin) = start.take() {
            runs.push((begin, &text[begin..position]));
        }
    }
    if let Some(begin) = start {
        runs.push((begin, &text[begin..]));
    }
    runs
}

/// Replace every japanese run of the text cells with its translation.
///
/// The translator is consulted at most once, with the list of distinct runs
/// found across all the cells. Cells keep their order, non text cells and
/// every character outside a japanese run are passed through unchanged.
pub fn replace_japanese_runs(
    cells: &[Cell],
    translator: &mut dyn Translator,
) -> Result<Vec<Cell>, SubstituteError> {
    let mut distinct: BTreeSet<&str> = BTreeSet::new();
    for cell in cells {
        if let Cell::Text(text) = cell {
            for (_, run) in japanese_runs(text) {
                distinct.insert(run);
            }
        }
    }

    let inputs: Vec<String> = distinct.iter().map(|run| run.to_string()).collect();
    let translations = if inputs.is_empty() {
        Vec::new()
    } else {
        translator
            .translate_many(&inputs)
            .map_err(SubstituteError::Translator)?
    };
    if translations.len() != inputs.len() {
        return Err(SubstituteError::LengthMismatch {
            expected: inputs.len(),
            got: translations.len(),
        });
    }
    let substitutions: BTreeMap<&str, &str> = inputs
        .iter()
        .map(String::as_str)
        .zip(translations.iter().map(String::as_str))
        .collect();

    Ok(cells
        .iter()
        .map(|cell| match cell {
            Cell::Opaque => Cell::Opaque,
            Cell::Text(text) => Cell::Text(substitute(text, &substitutions)),
        })
        .collect())
}

fn substitute(text: &str, substitutions: &BTreeMap<&str, &str>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut plain_start = 0;
    for (begin, run) in japanese_runs(text) {
        result.push_str(&text[plain_start..begin]);
        result.push_str(substitutions.get(run).copied().unwrap_or(run));
        plain_start = begin + run.len();
    }
    result.push_str(&text[plain_start..]);
    result
}
