use crate::{PLAYER, Player};
use depot_core::{Clause, ConnectionProvider, DepotRepository, Key, Limit, TraverseWithFilter};
use std::sync::LazyLock;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn players<P: ConnectionProvider>(repository: &DepotRepository<P>) {
    let _lock = MUTEX.lock().await;

    // Cleanup
    let result = repository
        .delete_all(
            &PLAYER,
            PLAYER.col("id").gt(0),
            Some(Box::new(TraverseWithFilter::new("Player", |_, _| true))),
        )
        .await;
    assert!(
        result.is_ok(),
        "Failed to delete the players: {:?}",
        result.unwrap_err()
    );

    // Keys come from the sequence table, one after the other
    let mut ids = Vec::new();
    for (i, nickname) in ["ace", "blaze", "comet"].into_iter().enumerate() {
        let mut player = Player {
            id: 0,
            nickname: nickname.into(),
            level: i as i16 + 1,
            last_seen: None,
        };
        repository
            .insert(&mut player)
            .await
            .expect("Failed to insert the player");
        assert!(player.id > 0);
        ids.push(player.id);
    }
    assert!(
        ids.windows(2).all(|w| w[0] < w[1]),
        "Sequence values are not increasing: {:?}",
        ids
    );

    // An assigned key is kept
    let mut manual = Player {
        id: ids[2] + 1000,
        nickname: "manual".into(),
        level: 9,
        last_seen: None,
    };
    repository
        .insert(&mut manual)
        .await
        .expect("Failed to insert the player with a key");
    assert_eq!(manual.id, ids[2] + 1000);

    let loaded = repository
        .load::<Player>(Key::simple(&PLAYER, ids[1]).expect("Failed to build the key"))
        .await
        .expect("Failed to load blaze")
        .expect("Blaze was not found");
    assert_eq!(loaded.nickname, "blaze");
    assert_eq!(loaded.level, 2);

    let page = repository
        .find_all::<Player>([
            Clause::where_(PLAYER.col("level").le(3)),
            Clause::Limit(Limit::new(0, 2)),
        ])
        .await
        .expect("Failed to find the first page of players");
    assert_eq!(page.len(), 2);

    let updated = repository
        .update_literal(
            Key::simple(&PLAYER, ids[0]).expect("Failed to build the key"),
            [("level", "5")],
        )
        .await
        .expect("Failed to level up ace");
    assert_eq!(updated, 1);
}
