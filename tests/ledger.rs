#[cfg(test)]
mod tests {
    use depot::{
        CacheKey, CachedValue, ConnectionProvider, DataMigration, DepotConfig, Error,
        PersistenceContext, Result, Value, future,
    };
    use depot_tests::{MockDatabase, MockProvider, init_logs, silent_logs};
    use std::{
        future::Future,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    /// Flushes the scores cache, failing on demand.
    struct ResetScores {
        ident: &'static str,
        runs: AtomicUsize,
        fail: AtomicBool,
    }

    impl ResetScores {
        fn new(ident: &'static str) -> Self {
            Self {
                ident,
                runs: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    impl DataMigration for ResetScores {
        fn ident(&self) -> &str {
            self.ident
        }

        fn invoke<P: ConnectionProvider>(
            &self,
            context: &PersistenceContext<P>,
        ) -> impl Future<Output = Result<()>> + Send {
            self.runs.fetch_add(1, Ordering::Relaxed);
            let outcome = if self.fail.load(Ordering::Relaxed) {
                Err(Error::msg("scores are locked"))
            } else {
                context.cache_traverse("Scores", |_, _| true);
                Ok(())
            };
            future::ready(outcome)
        }
    }

    fn context(database: &MockDatabase) -> PersistenceContext<MockProvider> {
        PersistenceContext::new(database.provider(), DepotConfig::new("mock"))
    }

    #[tokio::test]
    async fn runs_exactly_once() {
        init_logs();
        let database = MockDatabase::new();
        let context = context(&database);
        let score = CacheKey::new("Scores", [Value::from("ace")]);
        context.cache_store(score.clone(), CachedValue::new(12_i64));

        let migration = ResetScores::new("reset-scores-2024");
        assert!(context.run_migration(&migration).await.expect("First run"));
        assert!(context.cache_lookup(&score).is_none());
        assert!(database.has_table("DepotMigrationHistory"));
        let rows = database.rows("DepotMigrationHistory");
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get_column("ident"),
            Some(&Value::Varchar(Some("reset-scores-2024".into())))
        );
        assert!(matches!(
            rows[0].get_column("whenCompleted"),
            Some(Value::Timestamp(Some(..)))
        ));

        // The ledger remembers, even from another context
        assert!(!context.run_migration(&migration).await.expect("Second run"));
        let other = self::context(&database);
        assert!(!other.run_migration(&migration).await.expect("Third run"));
        assert_eq!(migration.runs.load(Ordering::Relaxed), 1);
        assert_eq!(database.rows("DepotMigrationHistory").len(), 1);
    }

    #[tokio::test]
    async fn failure_releases_the_claim() {
        init_logs();
        let database = MockDatabase::new();
        let context = context(&database);
        let migration = ResetScores::new("reset-scores-2025");
        migration.fail.store(true, Ordering::Relaxed);
        let error = silent_logs! {
            context
                .run_migration(&migration)
                .await
                .expect_err("The migration fails")
        };
        let message = format!("{:#}", error);
        assert!(
            message.contains("Data migration reset-scores-2025 failed"),
            "{}",
            message
        );
        assert!(message.contains("scores are locked"), "{}", message);
        assert!(database.rows("DepotMigrationHistory").is_empty());

        migration.fail.store(false, Ordering::Relaxed);
        assert!(context.run_migration(&migration).await.expect("Rerun"));
        assert_eq!(migration.runs.load(Ordering::Relaxed), 2);
        assert_eq!(database.rows("DepotMigrationHistory").len(), 1);
    }

    #[tokio::test]
    async fn independent_migrations() {
        init_logs();
        let database = MockDatabase::new();
        let context = context(&database);
        let first = ResetScores::new("first");
        let second = ResetScores::new("second");
        assert!(context.run_migration(&first).await.expect("First"));
        assert!(context.run_migration(&second).await.expect("Second"));
        assert_eq!(database.rows("DepotMigrationHistory").len(), 2);
        let creates = database
            .sql_log()
            .into_iter()
            .filter(|s| s.starts_with("CREATE TABLE \"DepotMigrationHistory\""))
            .count();
        assert_eq!(creates, 1);
    }
}
