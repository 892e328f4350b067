#[cfg(test)]
mod tests {
    use depot::{
        Clause, DepotConfig, DepotError, DepotRepository, Key, PersistenceContext, Value,
    };
    use depot_tests::{
        ACCOUNT, Account, MEMBERSHIP, Membership, MockDatabase, MockProvider, PLAYER, Player,
        Role, execute_tests, init_logs,
    };
    use indoc::indoc;
    use std::sync::Arc;

    fn repository(database: &MockDatabase, config: DepotConfig) -> DepotRepository<MockProvider> {
        DepotRepository::new(Arc::new(PersistenceContext::new(
            database.provider(),
            config,
        )))
    }

    fn bob() -> Account {
        Account {
            id: 0,
            name: "bob".into(),
            email: Some("bob@example.com".into()),
            balance: 10,
        }
    }

    #[tokio::test]
    async fn shared_scenarios() {
        init_logs();
        let database = MockDatabase::new();
        let repository = repository(&database, DepotConfig::new("mock"));
        execute_tests(&repository).await;
        // Running twice finds every table already resolved and cleans up
        execute_tests(&repository).await;
        assert_eq!(database.acquired(), database.released() + database.failed());
    }

    #[tokio::test]
    async fn insert_then_load_hits_the_cache() {
        init_logs();
        let database = MockDatabase::new();
        let repository = repository(&database, DepotConfig::new("mock"));
        let mut bob = bob();
        repository.insert(&mut bob).await.expect("Failed to insert bob");
        assert!(bob.id > 0);
        let insert = database
            .statements()
            .into_iter()
            .find(|s| s.sql.starts_with("INSERT INTO \"Account\""))
            .expect("No insert was sent");
        assert_eq!(
            insert.sql,
            "INSERT INTO \"Account\" (\"id\", \"name\", \"email\", \"balance\") \
            VALUES (DEFAULT, ?, ?, ?)"
        );
        assert_eq!(
            insert.values,
            [
                Value::Varchar(Some("bob".into())),
                Value::Varchar(Some("bob@example.com".into())),
                Value::Int64(Some(10)),
            ]
        );

        database.clear_log();
        let key = Key::simple(&ACCOUNT, bob.id).expect("Key");
        let loaded = repository
            .load::<Account>(key.clone())
            .await
            .expect("Failed to load bob");
        assert_eq!(loaded, Some(bob.clone()));
        assert!(database.sql_log().is_empty(), "{:?}", database.sql_log());

        // The update evicts the entry, the next load reads the row
        let updated = repository
            .update_partial(key.clone(), [("balance", Value::from(25_i64))])
            .await
            .expect("Failed to update bob");
        assert_eq!(updated, 1);
        let loaded = repository
            .load::<Account>(key.clone())
            .await
            .expect("Failed to load bob")
            .expect("Bob is gone");
        assert_eq!(loaded.balance, 25);
        assert_eq!(
            database.sql_log().join("\n"),
            indoc! {r#"
                UPDATE "Account" AS "T1" SET "balance" = ? WHERE "T1"."id" = ?
                SELECT "T1"."id", "T1"."name", "T1"."email", "T1"."balance" FROM "Account" AS "T1" WHERE "T1"."id" = ?
            "#}
            .trim()
        );

        // Absent rows are cached as well
        database.clear_log();
        let missing = Key::simple(&ACCOUNT, 999).expect("Key");
        for _ in 0..2 {
            let loaded = repository
                .load::<Account>(missing.clone())
                .await
                .expect("Failed to load a missing account");
            assert_eq!(loaded, None);
        }
        assert_eq!(database.sql_log().len(), 1);
    }

    #[tokio::test]
    async fn disabled_cache_always_queries() {
        init_logs();
        let database = MockDatabase::new();
        let repository = repository(&database, DepotConfig::new("mock").with_cache(false));
        let mut bob = bob();
        repository.insert(&mut bob).await.expect("Failed to insert bob");
        database.clear_log();
        let key = Key::simple(&ACCOUNT, bob.id).expect("Key");
        for _ in 0..2 {
            let loaded = repository
                .load::<Account>(key.clone())
                .await
                .expect("Failed to load bob");
            assert_eq!(loaded.as_ref(), Some(&bob));
        }
        assert_eq!(database.sql_log().len(), 2);
    }

    #[tokio::test]
    async fn store_updates_first_when_keyed() {
        init_logs();
        let database = MockDatabase::new();
        let repository = repository(&database, DepotConfig::new("mock"));
        let mut membership = Membership {
            account_id: 7,
            group_name: "chess".into(),
            role: Role::Moderator,
            active: true,
        };
        database.clear_log();
        let created = repository
            .store(&mut membership)
            .await
            .expect("Failed to store the membership");
        assert!(created);
        let log = database.sql_log();
        let kinds: Vec<&str> = log
            .iter()
            .filter(|s| s.contains("\"Membership\""))
            .filter_map(|s| s.split(' ').next())
            .collect();
        assert_eq!(kinds.last_chunk::<2>(), Some(&["UPDATE", "INSERT"]));

        membership.role = Role::Owner;
        database.clear_log();
        let created = repository
            .store(&mut membership)
            .await
            .expect("Failed to store the membership again");
        assert!(!created);
        assert_eq!(
            database.sql_log(),
            [indoc! {r#"
                UPDATE "Membership" AS "T1" SET "accountId" = ?, "groupName" = ?, "role" = ?, "active" = ? WHERE "T1"."accountId" = ? AND "T1"."groupName" = ?
            "#}
            .trim()]
        );
        let rows = database.rows("Membership");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_column("role"), Some(&Value::Int8(Some(3))));

        // An unassigned identity goes straight to the insert
        let mut bob = bob();
        repository.store(&mut bob).await.expect("Failed to store bob");
        assert!(bob.id > 0);
        assert!(
            !database
                .sql_log()
                .iter()
                .any(|s| s.starts_with("UPDATE \"Account\"")),
            "{:?}",
            database.sql_log()
        );
    }

    #[tokio::test]
    async fn table_generated_keys() {
        init_logs();
        let database = MockDatabase::new();
        let repository = repository(&database, DepotConfig::new("mock"));
        let mut ids = Vec::new();
        for nickname in ["ace", "blaze"] {
            let mut player = Player {
                nickname: nickname.into(),
                ..Default::default()
            };
            repository
                .insert(&mut player)
                .await
                .expect("Failed to insert the player");
            ids.push(player.id);
        }
        assert_eq!(ids, [1, 2]);
        let sequence = database.rows("IdSequences");
        assert_eq!(sequence.len(), 1);
        assert_eq!(
            sequence[0].get_column("sequence"),
            Some(&Value::Varchar(Some("player".into())))
        );
        assert_eq!(
            sequence[0].get_column("value").and_then(Value::as_i64),
            Some(3)
        );
        assert!(
            database
                .sql_log()
                .contains(&"SELECT \"value\" FROM \"IdSequences\" WHERE \"sequence\" = ? FOR UPDATE".to_string())
        );

        let found = repository
            .find_all::<Player>([Clause::where_(PLAYER.col("nickname").eq("blaze"))])
            .await
            .expect("Failed to find blaze");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[tokio::test]
    async fn contended_sequences_are_read_again() {
        init_logs();
        let database = MockDatabase::new();
        let repository = repository(&database, DepotConfig::new("mock"));
        let mut ace = Player {
            nickname: "ace".into(),
            ..Default::default()
        };
        repository.insert(&mut ace).await.expect("Failed to insert ace");
        database.clear_log();

        // Another allocator advances the row between the read and the swap
        database.respond_affected_once("UPDATE \"IdSequences\"", 0);
        let mut blaze = Player {
            nickname: "blaze".into(),
            ..Default::default()
        };
        repository
            .insert(&mut blaze)
            .await
            .expect("Failed to insert blaze");
        assert_eq!(blaze.id, 2);
        let sequence: Vec<_> = database
            .sql_log()
            .into_iter()
            .filter(|s| s.contains("\"IdSequences\""))
            .collect();
        assert_eq!(
            sequence.join("\n"),
            indoc! {r#"
                SELECT "value" FROM "IdSequences" WHERE "sequence" = ? FOR UPDATE
                UPDATE "IdSequences" SET "value" = ? WHERE "sequence" = ? AND "value" = ?
                SELECT "value" FROM "IdSequences" WHERE "sequence" = ? FOR UPDATE
                UPDATE "IdSequences" SET "value" = ? WHERE "sequence" = ? AND "value" = ?
            "#}
            .trim()
        );
        assert_eq!(
            database.rows("IdSequences")[0]
                .get_column("value")
                .and_then(Value::as_i64),
            Some(3)
        );

        // A sequence that never settles gives up instead of reusing a value
        database.respond_affected("UPDATE \"IdSequences\"", 0);
        let mut comet = Player {
            nickname: "comet".into(),
            ..Default::default()
        };
        let error = repository
            .insert(&mut comet)
            .await
            .expect_err("The sequence is always contended");
        assert!(
            format!("{:#}", error).contains("Could not allocate a value from sequence player"),
            "{:#}",
            error
        );
        assert_eq!(database.rows("Player").len(), 2);
    }

    #[tokio::test]
    async fn delete_evicts_and_removes() {
        init_logs();
        let database = MockDatabase::new();
        let repository = repository(&database, DepotConfig::new("mock"));
        let mut bob = bob();
        repository.insert(&mut bob).await.expect("Failed to insert bob");
        let key = Key::simple(&ACCOUNT, bob.id).expect("Key");
        assert_eq!(
            repository.delete_key(key.clone()).await.expect("Delete"),
            1
        );
        assert_eq!(
            repository.load::<Account>(key.clone()).await.expect("Load"),
            None
        );
        assert_eq!(repository.delete(&bob).await.expect("Delete again"), 0);
        assert!(database.rows("Account").is_empty());
    }

    #[tokio::test]
    async fn in_lists_are_bounded() {
        init_logs();
        let database = MockDatabase::new();
        let repository = repository(&database, DepotConfig::new("mock").with_max_in_values(2));
        let found = repository
            .find_all::<Account>([Clause::where_(ACCOUNT.col("id").in_values([1, 2]))])
            .await
            .expect("Two values are allowed");
        assert!(found.is_empty());
        let error = repository
            .find_all::<Account>([Clause::where_(ACCOUNT.col("id").in_values([1, 2, 3]))])
            .await
            .expect_err("Three values are too many");
        assert!(DepotError::is_configuration(&error), "{:#}", error);

        let nothing = repository
            .find_all::<Membership>([Clause::where_(
                MEMBERSHIP.col("group_name").in_values(Vec::<String>::new()),
            )])
            .await
            .expect("An empty list matches nothing");
        assert!(nothing.is_empty());
    }
}
