//! Provisioning of the hidden solution record a game is played against.

use rand::{rng, seq::IndexedRandom};
use tracing::{debug, info};

use crate::{
    controller::error::ReconcileError,
    dao::{
        models::{Game, Phrase},
        object_store::ObjectStore,
    },
};

/// Source of fresh solution phrases.
pub trait PhraseGenerator: Send + Sync {
    /// A new phrase.
    fn generate(&self) -> String;
}

const WORDS: &[&str] = &[
    "amber", "anchor", "apple", "arrow", "badger", "banjo", "beacon", "biscuit", "bramble",
    "breeze", "candle", "canyon", "cedar", "cherry", "cobalt", "comet", "copper", "cricket",
    "dragon", "ember", "falcon", "fern", "fiddle", "fish", "forest", "garnet", "glacier",
    "harbor", "hazel", "island", "jigsaw", "juniper", "kettle", "lantern", "lemon", "maple",
    "marble", "meadow", "mirror", "nectar", "nutmeg", "orchid", "otter", "paddle", "pebble",
    "pepper", "quartz", "quill", "raven", "ribbon", "river", "saddle", "salmon", "thistle",
    "thunder", "tulip", "umbrella", "velvet", "violet", "walnut", "willow", "winter", "yarrow",
    "zephyr",
];

/// Picks random dictionary words joined by single spaces.
#[derive(Debug, Clone, Copy)]
pub struct BabbleGenerator {
    words: usize,
}

impl BabbleGenerator {
    /// Generator joining `words` words, at least one.
    pub fn new(words: usize) -> Self {
        Self {
            words: words.max(1),
        }
    }
}

impl Default for BabbleGenerator {
    fn default() -> Self {
        Self::new(2)
    }
}

impl PhraseGenerator for BabbleGenerator {
    fn generate(&self) -> String {
        let mut rng = rng();
        (0..self.words)
            .filter_map(|_| WORDS.choose(&mut rng).copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resolve the game's solution, creating `<game>-secret` when the reference
/// is unset or dangling.
///
/// On success `game.spec.solution` points at the returned record; the caller
/// persists that spec change. A record left behind by an earlier run whose
/// spec write was lost is adopted rather than treated as a collision.
pub async fn ensure_phrase(
    store: &dyn ObjectStore,
    generator: &dyn PhraseGenerator,
    game: &mut Game,
) -> Result<Phrase, ReconcileError> {
    if let Some(key) = game.spec.solution.clone() {
        if let Some(phrase) = store.get_phrase(key.clone()).await? {
            return Ok(phrase);
        }
        debug!(game = %game.key(), phrase = %key, "solution reference is dangling");
    }

    let key = game.phrase_key();
    let phrase = match store
        .create_phrase(Phrase::new(key.clone(), generator.generate()))
        .await
    {
        Ok(phrase) => {
            info!(game = %game.key(), phrase = %key, "created solution phrase");
            phrase
        }
        Err(err) if err.is_already_exists() => match store.get_phrase(key.clone()).await? {
            Some(existing) => {
                info!(game = %game.key(), phrase = %key, "adopted existing solution phrase");
                existing
            }
            None => {
                return Err(ReconcileError::DependencyCreate { key, source: err });
            }
        },
        Err(source) => return Err(ReconcileError::DependencyCreate { key, source }),
    };

    game.spec.solution = Some(phrase.key());
    Ok(phrase)
}
