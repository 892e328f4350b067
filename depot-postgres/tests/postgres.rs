#[cfg(test)]
mod tests {
    use depot_core::{DepotConfig, DepotRepository, PersistenceContext};
    use depot_postgres::PostgresConnectionProvider;
    use depot_tests::{execute_tests, init_logs};
    use std::{env, sync::Arc};

    #[tokio::test]
    async fn postgres() {
        init_logs();
        let Ok(url) = env::var("DEPOT_POSTGRES_URL") else {
            log::warn!("DEPOT_POSTGRES_URL is not set, skipping the Postgres tests");
            return;
        };
        let provider = PostgresConnectionProvider::new(&url)
            .expect("Could not create the provider")
            .with_max_idle(2);
        let context = Arc::new(PersistenceContext::new(
            provider,
            DepotConfig::new("postgres"),
        ));
        let repository = DepotRepository::new(context);
        execute_tests(&repository).await;
    }

    #[test]
    fn rejects_foreign_urls() {
        let error = PostgresConnectionProvider::new("mysql://localhost/db")
            .err()
            .expect("Only postgres urls are accepted");
        assert!(format!("{:#}", error).contains("must start with `postgres://`"));
    }
}
