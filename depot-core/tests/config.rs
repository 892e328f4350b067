#[cfg(test)]
mod tests {
    use depot_core::DepotConfig;
    use std::env;

    #[test]
    fn config_defaults() {
        let config = DepotConfig::default();
        assert_eq!(config.ident, "depot");
        assert_eq!(config.max_in_values, 32767);
        assert!(config.retry_transient);
        assert!(config.use_cache);
        assert!(config.drop_undeclared_columns);
        assert_eq!(config.schema_version_table, "DepotSchemaVersion");
        assert_eq!(config.migration_history_table, "DepotMigrationHistory");

        let config = DepotConfig::new("reports")
            .with_max_in_values(10)
            .with_retry_transient(false)
            .with_cache(false)
            .with_drop_undeclared_columns(false)
            .with_schema_version_table("Versions")
            .with_migration_history_table("Ledger");
        assert_eq!(
            config,
            DepotConfig {
                ident: "reports".into(),
                max_in_values: 10,
                retry_transient: false,
                use_cache: false,
                drop_undeclared_columns: false,
                schema_version_table: "Versions".into(),
                migration_history_table: "Ledger".into(),
            }
        );
    }

    #[test]
    fn config_from_env() {
        // The only test of this binary touching the environment
        unsafe {
            env::set_var("DEPOT_IDENT", "replica");
            env::set_var("DEPOT_MAX_IN_VALUES", " 64 ");
            env::set_var("DEPOT_USE_CACHE", "false");
            env::remove_var("DEPOT_RETRY_TRANSIENT");
        }
        let config = DepotConfig::from_env().expect("Could not read the environment");
        assert_eq!(config.ident, "replica");
        assert_eq!(config.max_in_values, 64);
        assert!(!config.use_cache);
        assert!(config.retry_transient);

        unsafe {
            env::set_var("DEPOT_MAX_IN_VALUES", "many");
        }
        let error = DepotConfig::from_env().expect_err("Not a number");
        assert!(format!("{:#}", error).contains("DEPOT_MAX_IN_VALUES"));

        unsafe {
            env::remove_var("DEPOT_IDENT");
            env::remove_var("DEPOT_MAX_IN_VALUES");
            env::remove_var("DEPOT_USE_CACHE");
        }
    }
}
