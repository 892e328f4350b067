#[cfg(test)]
mod tests {
    use depot::{
        DepotConfig, DepotError, EntityDef, EntityMigration, FieldDef, FullTextIndex,
        MigrationConnection, PersistenceContext, Result, SchemaMigration, TableState, Value,
    };
    use depot_tests::{
        ACCOUNT, ACCOUNT_NAME, MEMBERSHIP, MockConnection, MockDatabase, MockProvider, init_logs,
        silent_logs,
    };
    use futures::future::{BoxFuture, join};
    use indoc::indoc;
    use std::sync::{Arc, Mutex};

    /// Records the columns it finds, then runs `sql`.
    struct Inspect {
        name: &'static str,
        sql: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, Vec<String>)>>>,
    }

    impl EntityMigration for Inspect {
        fn apply<'a>(
            &'a self,
            entity: &'static EntityDef,
            connection: &'a mut dyn MigrationConnection,
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                let meta = connection
                    .describe_table(entity.table)
                    .await?
                    .unwrap_or_default();
                self.seen.lock().unwrap().push((self.name, meta.columns));
                connection.execute_sql(self.sql.into()).await?;
                Ok(())
            })
        }

        fn description(&self) -> String {
            format!("inspect {}", self.name)
        }
    }

    static WIDGET_FIELDS: [FieldDef; 4] = [
        FieldDef::new("id", Value::Int32(None)).primary_key(),
        FieldDef::new("title", Value::Varchar(None)).length(40),
        FieldDef::new("weight", Value::Int32(None)).default_value("1"),
        FieldDef::new("stamped", Value::Timestamp(None)).nullable(),
    ];
    static WIDGET: EntityDef = EntityDef::new("Widget", &WIDGET_FIELDS).version(2);
    static FROZEN_WIDGET: EntityDef = EntityDef::new("FrozenWidget", &WIDGET_FIELDS)
        .table("Widget")
        .version(-1);

    static GADGET_FIELDS: [FieldDef; 3] = [
        FieldDef::new("id", Value::Int32(None)).primary_key(),
        FieldDef::new("name", Value::Varchar(None)),
        FieldDef::new("extra", Value::Int16(None)).nullable(),
    ];
    static GADGET: EntityDef = EntityDef::new("Gadget", &GADGET_FIELDS);
    static NOWHERE: EntityDef = EntityDef::new("Nowhere", &GADGET_FIELDS);

    static NOTE_FIELDS: [FieldDef; 2] = [
        FieldDef::new("id", Value::Int32(None)).primary_key(),
        FieldDef::new("text", Value::Varchar(None)).length(4000),
    ];
    static NOTE: EntityDef = EntityDef::new("Note", &NOTE_FIELDS).full_text_indexes(&[
        FullTextIndex {
            name: "text",
            fields: &["text"],
        },
    ]);

    fn context(database: &MockDatabase) -> PersistenceContext<MockProvider> {
        PersistenceContext::new(database.provider(), DepotConfig::new("mock"))
    }

    fn widget_migrations(context: &PersistenceContext<MockProvider>) {
        for migration in [
            SchemaMigration::rename(2, "label", "title"),
            SchemaMigration::add(2, "weight", "5"),
            SchemaMigration::drop(2, "legacy"),
            SchemaMigration::retype(2, "title"),
        ] {
            context
                .register_migration(&WIDGET, migration)
                .expect("Failed to register the migration");
        }
    }

    fn legacy_widget_table(database: &MockDatabase) {
        database
            .execute(
                "CREATE TABLE \"Widget\" (\"id\" INTEGER NOT NULL, \"label\" VARCHAR(40) NOT NULL, \
                \"legacy\" INTEGER, PRIMARY KEY (\"id\"))",
                Vec::new(),
            )
            .expect("Failed to create the legacy table");
        database
            .execute(
                "INSERT INTO \"Widget\" (\"id\", \"label\", \"legacy\") VALUES (?, ?, ?)",
                vec![Value::Int32(Some(1)), "gear".into(), Value::Int32(Some(0))],
            )
            .expect("Failed to insert the legacy row");
    }

    #[tokio::test]
    async fn create_missing_tables() {
        init_logs();
        let database = MockDatabase::new();
        let context = context(&database);
        let marshaller = context
            .marshaller(&ACCOUNT)
            .await
            .expect("Failed to resolve the accounts");
        assert_eq!(
            marshaller.history(),
            [
                TableState::Unresolved,
                TableState::Resolving,
                TableState::Created,
                TableState::Ready,
            ]
        );
        assert_eq!(marshaller.state(), TableState::Ready);
        assert!(marshaller.key_generator().is_some_and(|g| g.is_post_factum()));
        let log = database.sql_log();
        assert!(log.contains(
            &indoc! {r#"
                CREATE TABLE "Account" ("id" SERIAL UNIQUE, "name" VARCHAR(64) NOT NULL, "email" VARCHAR(255) UNIQUE, "balance" BIGINT NOT NULL DEFAULT 0, PRIMARY KEY ("id"))
            "#}
            .trim()
            .to_string()
        ), "{:#?}", log);
        assert!(log.contains(&"CREATE INDEX \"Account_name\" ON \"Account\" (\"name\")".to_string()));

        let versions = database.rows("DepotSchemaVersion");
        assert_eq!(versions.len(), 1);
        assert_eq!(
            versions[0].get_column("persistentClass"),
            Some(&Value::Varchar(Some("Account".into())))
        );
        assert_eq!(
            versions[0].get_column("version").and_then(Value::as_i64),
            Some(1)
        );

        // Created directly at the declared version
        context
            .marshaller(&MEMBERSHIP)
            .await
            .expect("Failed to resolve the memberships");
        let version = database
            .rows("DepotSchemaVersion")
            .into_iter()
            .find(|r| r.get_column("persistentClass") == Some(&"Membership".into()))
            .and_then(|r| r.get_column("version").and_then(Value::as_i64));
        assert_eq!(version, Some(2));
    }

    #[tokio::test]
    async fn resolution_happens_once() {
        init_logs();
        let database = MockDatabase::new();
        let context = context(&database);
        let (a, b) = join(context.marshaller(&ACCOUNT), context.marshaller(&ACCOUNT)).await;
        let (a, b) = (a.expect("First resolution"), b.expect("Second resolution"));
        assert!(Arc::ptr_eq(&a, &b));
        let creates = database
            .sql_log()
            .iter()
            .filter(|s| s.starts_with("CREATE TABLE \"Account\""))
            .count();
        assert_eq!(creates, 1);

        // Computed entities have no table of their own
        let projection = context
            .marshaller(&ACCOUNT_NAME)
            .await
            .expect("Failed to resolve the projection");
        assert_eq!(
            projection.history(),
            [TableState::Unresolved, TableState::Resolving, TableState::Ready]
        );

        let error = context
            .register_migration(&ACCOUNT, SchemaMigration::drop(2, "email"))
            .expect_err("Too late to register");
        assert!(DepotError::is_configuration(&error));
        let error = context
            .register_migration(&WIDGET, SchemaMigration::retype(3, "color"))
            .expect_err("No such field");
        assert!(DepotError::is_configuration(&error));
    }

    #[tokio::test]
    async fn migrate_existing_table() {
        init_logs();
        let database = MockDatabase::new();
        legacy_widget_table(&database);
        database.clear_log();

        let context = context(&database);
        widget_migrations(&context);
        let marshaller = context
            .marshaller(&WIDGET)
            .await
            .expect("Failed to migrate the widgets");
        assert_eq!(
            marshaller.history(),
            [
                TableState::Unresolved,
                TableState::Resolving,
                TableState::Migrating,
                TableState::Migrated,
                TableState::Ready,
            ]
        );
        let log = database.sql_log();
        let alter: Vec<&str> = log
            .iter()
            .map(String::as_str)
            .filter(|s| s.starts_with("ALTER TABLE \"Widget\""))
            .collect();
        assert_eq!(
            alter.join("\n"),
            indoc! {r#"
                ALTER TABLE "Widget" RENAME COLUMN "label" TO "title"
                ALTER TABLE "Widget" ADD COLUMN "weight" INTEGER NOT NULL DEFAULT 5
                ALTER TABLE "Widget" ALTER COLUMN "weight" TYPE INTEGER
                ALTER TABLE "Widget" ALTER COLUMN "weight" SET NOT NULL
                ALTER TABLE "Widget" ALTER COLUMN "weight" SET DEFAULT 1
                ALTER TABLE "Widget" DROP COLUMN "legacy"
                ALTER TABLE "Widget" ADD COLUMN "stamped" TIMESTAMP
                ALTER TABLE "Widget" ALTER COLUMN "title" TYPE VARCHAR(40)
                ALTER TABLE "Widget" ALTER COLUMN "title" SET NOT NULL
                ALTER TABLE "Widget" ALTER COLUMN "title" DROP DEFAULT
            "#}
            .trim()
        );
        assert!(log.contains(&"UPDATE \"Widget\" SET \"stamped\" = NOW()".to_string()));

        let meta = database.table_metadata("Widget").expect("The table is gone");
        assert_eq!(meta.columns, ["id", "title", "weight", "stamped"]);
        let rows = database.rows("Widget");
        assert_eq!(
            rows[0].get_column("title"),
            Some(&Value::Varchar(Some("gear".into())))
        );
        let version = database
            .rows("DepotSchemaVersion")
            .into_iter()
            .find(|r| r.get_column("persistentClass") == Some(&"Widget".into()))
            .and_then(|r| r.get_column("version").and_then(Value::as_i64));
        assert_eq!(version, Some(2));

        // A later process finds the table up to date
        database.clear_log();
        let context = self::context(&database);
        widget_migrations(&context);
        let marshaller = context
            .marshaller(&WIDGET)
            .await
            .expect("Failed to resolve the widgets");
        assert_eq!(
            marshaller.history(),
            [TableState::Unresolved, TableState::Resolving, TableState::Ready]
        );
        assert!(
            !database.sql_log().iter().any(|s| s.starts_with("ALTER")),
            "{:#?}",
            database.sql_log()
        );
    }

    #[tokio::test]
    async fn custom_migrations_around_the_diff() {
        init_logs();
        let database = MockDatabase::new();
        legacy_widget_table(&database);
        database.clear_log();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let register = |context: &PersistenceContext<MockProvider>| {
            widget_migrations(context);
            for (name, before, sql) in [
                ("after", false, "UPDATE \"Widget\" SET \"title\" = UPPER(\"title\")"),
                ("before", true, "UPDATE \"Widget\" SET \"weight\" = 7"),
            ] {
                let migration = Inspect {
                    name,
                    sql,
                    seen: seen.clone(),
                };
                context
                    .register_migration(&WIDGET, SchemaMigration::custom(2, before, migration))
                    .expect("Failed to register the custom migration");
            }
        };
        let context = context(&database);
        register(&context);
        context
            .marshaller(&WIDGET)
            .await
            .expect("Failed to migrate the widgets");
        let columns: Vec<(&str, String)> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|(name, columns)| (*name, columns.join(", ")))
            .collect();
        assert_eq!(
            columns,
            [
                ("before", "id, title, weight".to_string()),
                ("after", "id, title, weight, stamped".to_string()),
            ]
        );
        let log = database.sql_log();
        let position = |sql: &str| {
            log.iter()
                .position(|s| s == sql)
                .unwrap_or_else(|| panic!("{} was not run: {:#?}", sql, log))
        };
        let before = position("UPDATE \"Widget\" SET \"weight\" = 7");
        let after = position("UPDATE \"Widget\" SET \"title\" = UPPER(\"title\")");
        assert!(position("ALTER TABLE \"Widget\" DROP COLUMN \"legacy\"") < before);
        assert!(before < position("ALTER TABLE \"Widget\" ADD COLUMN \"stamped\" TIMESTAMP"));
        assert!(position("ALTER TABLE \"Widget\" ALTER COLUMN \"title\" DROP DEFAULT") < after);

        // Recorded at the target version, nothing runs twice
        let context = self::context(&database);
        register(&context);
        context
            .marshaller(&WIDGET)
            .await
            .expect("Failed to resolve the widgets");
        assert_eq!(seen.lock().unwrap().len(), 2);

        let migration = SchemaMigration::custom(
            3,
            false,
            Inspect {
                name: "later",
                sql: "",
                seen: seen.clone(),
            },
        );
        assert!(migration.should_run(2));
        assert!(!migration.run_before_default());
        assert!(format!("{:?}", migration).contains("inspect later"));
    }

    #[tokio::test]
    async fn negative_version_skips_migration() {
        init_logs();
        let database = MockDatabase::new();
        legacy_widget_table(&database);
        database.clear_log();
        let context = context(&database);
        let marshaller = context
            .marshaller(&FROZEN_WIDGET)
            .await
            .expect("Failed to resolve the frozen widgets");
        assert_eq!(marshaller.state(), TableState::Ready);
        assert!(!database.sql_log().iter().any(|s| s.contains("\"Widget\"")));
        let meta = database.table_metadata("Widget").expect("The table is gone");
        assert_eq!(meta.columns, ["id", "label", "legacy"]);
    }

    #[tokio::test]
    async fn unsupported_full_text() {
        init_logs();
        let database = MockDatabase::new();
        let context = context(&database);
        let error = silent_logs! {
            context
                .marshaller(&NOTE)
                .await
                .expect_err("The generic dialect has no full text search")
        };
        assert!(DepotError::is_configuration(&error), "{:#}", error);
    }

    #[tokio::test]
    async fn schema_migration_edge_cases() {
        init_logs();
        let database = MockDatabase::new();
        database
            .execute(
                "CREATE TABLE \"Gadget\" (\"id\" INTEGER NOT NULL, \"old\" VARCHAR(255), \
                \"name\" VARCHAR(255) NOT NULL, PRIMARY KEY (\"id\"))",
                Vec::new(),
            )
            .expect("Failed to create the gadgets");
        let mut connection = MockConnection::new(database.clone());

        silent_logs! {
            let error = SchemaMigration::rename(2, "old", "name")
                .apply(&GADGET, &mut connection)
                .await
                .expect_err("Both columns are present");
            assert!(DepotError::is_migration(&error));

            let error = SchemaMigration::rename(2, "ghost", "extra")
                .apply(&GADGET, &mut connection)
                .await
                .expect_err("Neither column is present");
            assert!(DepotError::is_migration(&error));

            let error = SchemaMigration::drop(2, "old")
                .apply(&NOWHERE, &mut connection)
                .await
                .expect_err("No table");
            assert!(DepotError::is_migration(&error));
        }

        // Work already done
        database.clear_log();
        for migration in [
            SchemaMigration::rename(2, "ghost", "name"),
            SchemaMigration::drop(2, "ghost"),
            SchemaMigration::add(2, "name", "'unnamed'"),
            SchemaMigration::retype(2, "extra"),
        ] {
            let result = migration
                .apply(&GADGET, &mut connection)
                .await
                .expect("Migrations tolerate finished work");
            assert_eq!(result.rows_affected, 0, "{:?}", migration);
        }
        assert!(database.sql_log().is_empty());

        let result = SchemaMigration::rename(2, "old", "extra")
            .apply(&GADGET, &mut connection)
            .await
            .expect("Failed to rename");
        assert_eq!(result.rows_affected, 1);
        assert_eq!(
            database.sql_log(),
            ["ALTER TABLE \"Gadget\" RENAME COLUMN \"old\" TO \"extra\""]
        );
        assert!(SchemaMigration::retype(3, "extra").should_run(2));
        assert!(!SchemaMigration::retype(3, "extra").run_before_default());
        assert!(!SchemaMigration::drop(2, "old").should_run(2));
    }
}
