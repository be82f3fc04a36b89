use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    time::SystemTime,
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use utoipa::ToSchema;
use uuid::Uuid;

/// Label stamped on every guess naming the game it belongs to.
pub const GAME_LABEL: &str = "null-game";
/// Key under which a phrase record stores its solution text.
pub const PHRASE_DATA_KEY: &str = "phrase";
/// Suffix appended to a game's name to derive its phrase record name.
pub const PHRASE_NAME_SUFFIX: &str = "-secret";

/// Namespace-qualified identity shared by every resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct ObjectKey {
    /// Namespace the object lives in.
    pub namespace: String,
    /// Name of the object, unique within its namespace and kind.
    pub name: String,
}

impl ObjectKey {
    /// Build a key from a namespace and a name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Resource kinds known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// A word-guessing game.
    Game,
    /// A player's guess attached to a game.
    Guess,
    /// The hidden solution of a game.
    Phrase,
}

impl Kind {
    /// Stable lowercase name used in document ids and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Game => "game",
            Kind::Guess => "guess",
            Kind::Phrase => "phrase",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata carried by every stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ObjectMeta {
    /// Name, unique per kind within the namespace.
    pub name: String,
    /// Namespace the object lives in.
    pub namespace: String,
    /// Assigned by the store on creation.
    #[serde(default)]
    pub uid: Option<Uuid>,
    /// Opaque optimistic-concurrency token, replaced on every write.
    #[serde(default)]
    pub resource_version: Option<String>,
    /// Bumped by the store whenever the spec changes.
    #[serde(default)]
    pub generation: i64,
    /// Free-form key/value labels used for selection.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Markers that block physical deletion until removed.
    #[serde(default)]
    pub finalizers: Vec<String>,
    /// Set by the store when deletion was requested while finalizers remain.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub deletion_timestamp: Option<SystemTime>,
}

impl ObjectMeta {
    /// Fresh metadata for an object that has not been persisted yet.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Identity of the object.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Whether deletion has been requested for this object.
    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// Whether the named finalizer is registered.
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|item| item == finalizer)
    }

    /// Register a finalizer, returning `true` when the list changed.
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.finalizers.push(finalizer.to_owned());
        true
    }

    /// Drop a finalizer, returning `true` when the list changed.
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|item| item != finalizer);
        before != self.finalizers.len()
    }
}

/// Lifecycle phase reported on a game's status.
///
/// Wire names are kept from the first published version of the resource so
/// existing clients keep parsing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum GamePhase {
    /// No guesses have been made yet.
    Pending,
    /// Reserved transitional phase; no transition leads here.
    #[serde(rename = "ClusterCreating")]
    Creating,
    /// At least one guess has been made.
    #[serde(rename = "OperatorInstalling")]
    Active,
    /// The guess limit has been exceeded.
    #[serde(rename = "Provisioned")]
    Finished,
}

/// Desired state of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GameSpec {
    /// Reference to the phrase record holding the solution, set once.
    #[serde(default)]
    pub solution: Option<ObjectKey>,
}

/// Observed state of a game, recomputed on every reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    /// Lifecycle phase, unset until the first reconciliation.
    #[serde(default)]
    pub phase: Option<GamePhase>,
    /// Partially revealed phrase, or `FAILED` once the game is lost.
    #[serde(default)]
    pub current: String,
    /// Guesses counted for the game, duplicates included.
    #[serde(default)]
    pub number_of_guesses: usize,
    /// Free-form message describing the last reconciliation.
    #[serde(default)]
    pub status: String,
    /// Generation of the spec the last error-free reconciliation observed.
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

/// A word-guessing game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Game {
    /// Identity and bookkeeping.
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: GameSpec,
    /// Observed state written by the reconciler.
    #[serde(default)]
    pub status: GameStatus,
}

impl Game {
    /// A new, unpersisted game.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: GameSpec::default(),
            status: GameStatus::default(),
        }
    }

    /// Identity of the game.
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Selector matching every guess that belongs to this game.
    pub fn guess_selector(&self) -> LabelSelector {
        LabelSelector::new().with(GAME_LABEL, self.metadata.name.clone())
    }

    /// Name of the phrase record this game's solution is stored under.
    pub fn phrase_key(&self) -> ObjectKey {
        ObjectKey::new(
            self.metadata.namespace.clone(),
            format!("{}{}", self.metadata.name, PHRASE_NAME_SUFFIX),
        )
    }
}

/// A player's submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GuessSpec {
    /// A single letter or a full-phrase attempt.
    pub guess: String,
    /// Name of the game this guess belongs to.
    pub game: String,
}

/// A guess submitted against a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Guess {
    /// Identity and bookkeeping.
    pub metadata: ObjectMeta,
    /// The submission itself.
    pub spec: GuessSpec,
}

impl Guess {
    /// A new, unpersisted guess for `game`.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        game: impl Into<String>,
        guess: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: GuessSpec {
                guess: guess.into(),
                game: game.into(),
            },
        }
    }

    /// Identity of the guess.
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Label value naming the owning game, if stamped.
    pub fn game_label(&self) -> Option<&str> {
        self.metadata.labels.get(GAME_LABEL).map(String::as_str)
    }
}

/// Hidden record holding a game's solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    /// Identity and bookkeeping.
    pub metadata: ObjectMeta,
    /// Payload; the solution sits under the `phrase` key.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl Phrase {
    /// A new, unpersisted phrase record holding `text`.
    pub fn new(key: ObjectKey, text: impl Into<String>) -> Self {
        let mut data = BTreeMap::new();
        data.insert(PHRASE_DATA_KEY.to_owned(), text.into());
        Self {
            metadata: ObjectMeta::new(key.namespace, key.name),
            data,
        }
    }

    /// Identity of the phrase record.
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Solution text, if the record carries one.
    pub fn text(&self) -> Option<&str> {
        self.data.get(PHRASE_DATA_KEY).map(String::as_str)
    }
}

/// Behaviour shared by every stored kind, used by the store backends.
pub trait Resource: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Kind tag of the implementing type.
    const KIND: Kind;

    /// Shared metadata.
    fn metadata(&self) -> &ObjectMeta;

    /// Shared metadata, mutably.
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Whether the desired-state part of two objects is identical.
    fn same_spec(&self, other: &Self) -> bool;

    /// Wrap into the polymorphic envelope delivered to watchers.
    fn into_dynamic(self) -> DynamicObject;
}

impl Resource for Game {
    const KIND: Kind = Kind::Game;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn same_spec(&self, other: &Self) -> bool {
        self.spec == other.spec
    }

    fn into_dynamic(self) -> DynamicObject {
        DynamicObject::Game(self)
    }
}

impl Resource for Guess {
    const KIND: Kind = Kind::Guess;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn same_spec(&self, other: &Self) -> bool {
        self.spec == other.spec
    }

    fn into_dynamic(self) -> DynamicObject {
        DynamicObject::Guess(self)
    }
}

impl Resource for Phrase {
    const KIND: Kind = Kind::Phrase;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn same_spec(&self, other: &Self) -> bool {
        self.data == other.data
    }

    fn into_dynamic(self) -> DynamicObject {
        DynamicObject::Phrase(self)
    }
}

/// Any stored object, discriminated by its `kind` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DynamicObject {
    /// A game.
    Game(Game),
    /// A guess.
    Guess(Guess),
    /// A phrase record.
    Phrase(Phrase),
}

impl DynamicObject {
    /// Kind of the wrapped object.
    pub fn kind(&self) -> Kind {
        match self {
            DynamicObject::Game(_) => Kind::Game,
            DynamicObject::Guess(_) => Kind::Guess,
            DynamicObject::Phrase(_) => Kind::Phrase,
        }
    }

    /// Metadata of the wrapped object.
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            DynamicObject::Game(game) => &game.metadata,
            DynamicObject::Guess(guess) => &guess.metadata,
            DynamicObject::Phrase(phrase) => &phrase.metadata,
        }
    }

    /// Identity of the wrapped object.
    pub fn key(&self) -> ObjectKey {
        self.metadata().key()
    }
}

/// Equality-based label selector; every listed pair must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    match_labels: HashMap<String, String>,
}

impl LabelSelector {
    /// A selector that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key=value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    /// Whether `labels` satisfies every requirement.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}
