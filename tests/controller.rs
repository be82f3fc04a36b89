use std::{sync::Arc, time::Duration};

use nullgame_controller::{
    controller::{
        GameReconciler, GameReconcilerConfig, GuessReconciler, guess_to_game,
        phase::FAILED_MARKER, phrase::PhraseGenerator,
    },
    dao::{
        models::{Game, GamePhase, Guess, Kind, LabelSelector, ObjectKey},
        object_store::{MemoryStore, ObjectStore},
    },
    runtime::Controller,
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{sleep, timeout},
};

struct Fixed(&'static str);

impl PhraseGenerator for Fixed {
    fn generate(&self) -> String {
        self.0.to_owned()
    }
}

struct Harness {
    store: Arc<dyn ObjectStore>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Harness {
    fn start(max_guesses: usize) -> Self {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let (shutdown, rx) = watch::channel(false);
        let reconciler = GameReconciler::new(store.clone(), GameReconcilerConfig { max_guesses })
            .with_phrase_generator(Arc::new(Fixed("go fish")));
        let games = Controller::new("game", Kind::Game, store.clone(), reconciler)
            .watches(Kind::Guess, guess_to_game)
            .backoff(Duration::from_millis(10), Duration::from_millis(100));
        let labeler = Controller::new(
            "guess-labeler",
            Kind::Guess,
            store.clone(),
            GuessReconciler::new(store.clone()),
        )
        .backoff(Duration::from_millis(10), Duration::from_millis(100));

        let tasks = vec![
            tokio::spawn(games.run(rx.clone())),
            tokio::spawn(labeler.run(rx)),
        ];
        Self {
            store,
            shutdown,
            tasks,
        }
    }

    async fn game_until(&self, name: &str, check: impl Fn(&Game) -> bool) -> Game {
        let key = ObjectKey::new("ns", name);
        timeout(Duration::from_secs(5), async {
            loop {
                if let Some(game) = self.store.get_game(key.clone()).await.unwrap() {
                    if check(&game) {
                        return game;
                    }
                }
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("game never reached the expected state")
    }

    async fn guess(&self, name: &str, game: &str, text: &str) {
        self.store
            .create_guess(Guess::new("ns", name, game, text))
            .await
            .unwrap();
    }

    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        for task in self.tasks {
            timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        }
    }
}

#[tokio::test]
async fn guesses_drive_game_status() {
    let harness = Harness::start(5);
    harness
        .store
        .create_game(Game::new("ns", "g1"))
        .await
        .unwrap();

    let game = harness
        .game_until("g1", |game| game.status.phase == Some(GamePhase::Pending))
        .await;
    assert_eq!(game.status.current, "__ ____");

    harness.guess("guess-g", "g1", "g").await;
    harness.guess("guess-o", "g1", "o").await;

    let game = harness
        .game_until("g1", |game| game.status.number_of_guesses == 2)
        .await;
    assert_eq!(game.status.current, "go ____");
    assert_eq!(game.status.phase, Some(GamePhase::Active));

    harness.guess("guess-win", "g1", "go fish").await;
    let game = harness
        .game_until("g1", |game| game.status.number_of_guesses == 3)
        .await;
    assert_eq!(game.status.current, "go fish");

    harness.stop().await;
}

#[tokio::test]
async fn running_out_of_guesses_fails_the_game() {
    let harness = Harness::start(2);
    harness
        .store
        .create_game(Game::new("ns", "g1"))
        .await
        .unwrap();
    for letter in ["x", "y", "z"] {
        harness.guess(&format!("guess-{letter}"), "g1", letter).await;
    }

    let game = harness
        .game_until("g1", |game| game.status.number_of_guesses == 3)
        .await;
    assert_eq!(game.status.phase, Some(GamePhase::Finished));
    assert_eq!(game.status.current, FAILED_MARKER);

    harness.stop().await;
}

#[tokio::test]
async fn deleting_a_game_removes_its_guesses() {
    let harness = Harness::start(5);
    harness
        .store
        .create_game(Game::new("ns", "g1"))
        .await
        .unwrap();
    for name in ["a", "b", "c"] {
        harness.guess(name, "g1", name).await;
    }
    harness.guess("other", "g2", "q").await;
    harness
        .game_until("g1", |game| game.status.number_of_guesses == 3)
        .await;

    harness
        .store
        .delete_game(ObjectKey::new("ns", "g1"))
        .await
        .unwrap();

    timeout(Duration::from_secs(5), async {
        while harness
            .store
            .get_game(ObjectKey::new("ns", "g1"))
            .await
            .unwrap()
            .is_some()
        {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("game was never removed");

    let left = harness
        .store
        .list_guesses(None, LabelSelector::new())
        .await
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].spec.game, "g2");

    harness.stop().await;
}
