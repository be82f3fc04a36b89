//! Collection of the guesses labelled for a game.

use std::collections::HashSet;

use crate::dao::{
    models::{Game, Guess},
    object_store::ObjectStore,
    storage::StorageResult,
};

/// Guesses submitted against one game, split by shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedGuesses {
    letters: HashSet<char>,
    phrases: Vec<String>,
    total: usize,
}

impl ClassifiedGuesses {
    /// Split raw guess texts into single letters and full-phrase attempts.
    ///
    /// Every text counts towards the total, duplicates included.
    pub fn classify<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classified = Self::default();
        for text in texts {
            classified.total += 1;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) => {
                    classified.letters.insert(letter);
                }
                _ => classified.phrases.push(text.to_owned()),
            }
        }
        classified
    }

    /// Classify stored guess objects.
    pub fn from_guesses(guesses: &[Guess]) -> Self {
        Self::classify(guesses.iter().map(|guess| guess.spec.guess.as_str()))
    }

    /// Whether `letter` was guessed on its own.
    pub fn has_letter(&self, letter: char) -> bool {
        self.letters.contains(&letter)
    }

    /// Whether some full-phrase attempt matches `solution` exactly.
    pub fn contains_phrase(&self, solution: &str) -> bool {
        self.phrases.iter().any(|attempt| attempt == solution)
    }

    /// Number of guesses seen.
    pub fn total(&self) -> usize {
        self.total
    }
}

/// List and classify every guess labelled with the game's name in its
/// namespace.
pub async fn aggregate(store: &dyn ObjectStore, game: &Game) -> StorageResult<ClassifiedGuesses> {
    let guesses = store
        .list_guesses(Some(game.metadata.namespace.clone()), game.guess_selector())
        .await?;
    Ok(ClassifiedGuesses::from_guesses(&guesses))
}
