use crate::{ACCOUNT, ACCOUNT_NAME, Account, AccountName};
use depot_core::{
    Clause, ConnectionProvider, DepotError, DepotRepository, Key, KeySet, TraverseWithFilter,
    Value,
};
use std::sync::LazyLock;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn accounts<P: ConnectionProvider>(repository: &DepotRepository<P>) {
    let _lock = MUTEX.lock().await;

    // Cleanup
    let result = repository
        .delete_all(
            &ACCOUNT,
            ACCOUNT.col("id").gt(0),
            Some(Box::new(TraverseWithFilter::new("Account", |_, _| true))),
        )
        .await;
    assert!(
        result.is_ok(),
        "Failed to delete the accounts: {:?}",
        result.unwrap_err()
    );

    // Insert
    let mut bob = Account {
        id: 0,
        name: "bob".into(),
        email: Some("bob@example.com".into()),
        balance: 100,
    };
    let inserted = repository
        .insert(&mut bob)
        .await
        .expect("Failed to insert bob");
    assert_eq!(inserted, 1);
    assert!(bob.id > 0, "The identity was not assigned to bob");
    let key = Key::simple(&ACCOUNT, bob.id).expect("Failed to build the key of bob");
    let loaded = repository
        .load::<Account>(key.clone())
        .await
        .expect("Failed to load bob")
        .expect("Bob was not found");
    assert_eq!(loaded, bob);

    // A second account with the same email
    let mut impostor = Account {
        id: 0,
        name: "impostor".into(),
        email: bob.email.clone(),
        balance: 0,
    };
    let error = repository
        .insert(&mut impostor)
        .await
        .expect_err("The duplicate email was accepted");
    assert!(
        DepotError::is_duplicate_key(&error),
        "Expected a duplicate key, got: {:#}",
        error
    );

    // Partial update
    let updated = repository
        .update_partial(key.clone(), [("name", Value::from("alice"))])
        .await
        .expect("Failed to rename bob");
    assert_eq!(updated, 1);
    let alice = repository
        .load::<Account>(key.clone())
        .await
        .expect("Failed to load alice")
        .expect("Alice was not found");
    assert_eq!(alice.name, "alice");
    assert_eq!(alice.balance, 100);

    // Whole record update
    let mut carol = Account {
        id: 0,
        name: "carol".into(),
        email: None,
        balance: 5,
    };
    repository
        .insert(&mut carol)
        .await
        .expect("Failed to insert carol");
    carol.balance = 50;
    let updated = repository
        .update(&carol)
        .await
        .expect("Failed to update carol");
    assert_eq!(updated, 1);
    let loaded = repository
        .load::<Account>(Key::simple(&ACCOUNT, carol.id).expect("Failed to build the key"))
        .await
        .expect("Failed to load carol");
    assert_eq!(loaded, Some(carol.clone()));

    // Several keys at once
    let keys = KeySet::new(
        &ACCOUNT,
        [
            key.clone(),
            Key::simple(&ACCOUNT, carol.id).expect("Failed to build the key"),
        ],
    )
    .expect("Failed to build the key set");
    let mut found = repository
        .find_all::<Account>([Clause::where_(keys)])
        .await
        .expect("Failed to find the accounts");
    found.sort_by_key(|a| a.id);
    assert_eq!(
        found.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
        ["alice", "carol"]
    );
    let rich = repository
        .find_all::<Account>([Clause::where_(ACCOUNT.col("balance").ge(100))])
        .await
        .expect("Failed to find the rich accounts");
    assert_eq!(rich.len(), 1);
    assert_eq!(rich[0].name, "alice");

    // Projection reading the same table
    let name = repository
        .load::<AccountName>(Key::simple(&ACCOUNT_NAME, carol.id).expect("Failed to build the key"))
        .await
        .expect("Failed to load the name of carol")
        .expect("The name of carol was not found");
    assert_eq!(
        name,
        AccountName {
            id: carol.id,
            name: "carol".into(),
            rich: None,
        }
    );

    // Store
    let mut dave = Account {
        id: 0,
        name: "dave".into(),
        email: Some("dave@example.com".into()),
        balance: 0,
    };
    let created = repository
        .store(&mut dave)
        .await
        .expect("Failed to store dave");
    assert!(created);
    assert!(dave.id > 0);
    dave.balance = 7;
    let created = repository
        .store(&mut dave)
        .await
        .expect("Failed to store dave again");
    assert!(!created);
    let loaded = repository
        .load::<Account>(Key::simple(&ACCOUNT, dave.id).expect("Failed to build the key"))
        .await
        .expect("Failed to load dave");
    assert_eq!(loaded.map(|a| a.balance), Some(7));

    // Delete
    let deleted = repository
        .delete(&dave)
        .await
        .expect("Failed to delete dave");
    assert_eq!(deleted, 1);
    let loaded = repository
        .load::<Account>(Key::simple(&ACCOUNT, dave.id).expect("Failed to build the key"))
        .await
        .expect("Failed to load dave");
    assert_eq!(loaded, None);
}
