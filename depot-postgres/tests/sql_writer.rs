#[cfg(test)]
mod tests {
    use depot_core::{
        Clause, DepotTypes, EntityDef, Expression, FieldDef, FullTextIndex, Generation, Limit,
        SelectClause, SqlWriter, Statement, TableMeta, Value, bind,
    };
    use depot_postgres::PostgresSqlWriter;
    use indoc::indoc;

    static POST_FIELDS: [FieldDef; 6] = [
        FieldDef::new("id", Value::Int32(None))
            .primary_key()
            .generated(Generation::Identity),
        FieldDef::new("title", Value::Varchar(None)).length(120),
        FieldDef::new("body", Value::Varchar(None)).length(65535),
        FieldDef::new("published", Value::Boolean(None)),
        FieldDef::new("thumbnail", Value::Blob(None)).length(1 << 20).nullable(),
        FieldDef::new("guid", Value::Uuid(None)).unique(),
    ];
    static POST: EntityDef = EntityDef::new("Post", &POST_FIELDS).full_text_indexes(&[
        FullTextIndex {
            name: "text",
            fields: &["title", "body"],
        },
    ]);

    static READING_FIELDS: [FieldDef; 6] = [
        FieldDef::new("sensor", Value::Int8(None)).primary_key(),
        FieldDef::new("taken", Value::Timestamp(None)).primary_key(),
        FieldDef::new("celsius", Value::Float32(None)),
        FieldDef::new("precise", Value::Float64(None)).nullable(),
        FieldDef::new("cost", Value::Decimal(None)).nullable(),
        FieldDef::new("day", Value::Date(None)),
    ];
    static READING: EntityDef = EntityDef::new("Reading", &READING_FIELDS);

    fn render(statement: impl Into<Statement>) -> (String, Vec<Value>) {
        let statement = statement.into();
        let types = DepotTypes::new(&statement, 100);
        let mut out = String::new();
        let placeholders = PostgresSqlWriter::default()
            .write_statement(&types, &mut out, &statement)
            .expect("Could not write the statement");
        let values = bind::collect_bindings(&types, &statement, placeholders)
            .expect("Placeholders and values do not line up");
        (out, values)
    }

    #[test]
    fn numbered_placeholders() {
        let select = SelectClause::with_fields(
            &POST,
            ["id"],
            [
                Clause::where_(Expression::and(vec![
                    POST.col("published").eq(true),
                    POST.col("id").in_values([4, 8]),
                ])),
                Clause::Limit(Limit::new(5, 10)),
            ],
        )
        .expect("Select");
        let (sql, values) = render(select);
        assert_eq!(
            sql,
            "SELECT \"T1\".\"id\" FROM \"Post\" AS \"T1\" \
            WHERE ((\"T1\".\"published\" = $1)) AND (\"T1\".\"id\" IN ($2, $3)) \
            LIMIT $4 OFFSET $5"
        );
        assert_eq!(
            values,
            [
                Value::Boolean(Some(true)),
                Value::Int32(Some(4)),
                Value::Int32(Some(8)),
                Value::Int64(Some(10)),
                Value::Int64(Some(5)),
            ]
        );
    }

    #[test]
    fn full_text_match() {
        let select = SelectClause::with_fields(
            &POST,
            ["title"],
            [Clause::where_(Expression::and(vec![
                Expression::full_text(&POST, "text", "rust & tokio"),
                POST.col("id").ne(1),
            ]))],
        )
        .expect("Select");
        let (sql, values) = render(select);
        assert!(
            sql.starts_with(
                "SELECT \"T1\".\"title\" FROM \"Post\" AS \"T1\" \
                WHERE (\"T1\".\"ftsCol_text\" @@ TO_TSQUERY('pg_catalog.english', $1))"
            ),
            "{}",
            sql
        );
        assert_eq!(
            values,
            [Value::Varchar(Some("rust & tokio".into())), Value::Int32(Some(1))]
        );
    }

    #[test]
    fn full_text_index() {
        let writer = PostgresSqlWriter::default();
        let index = &POST.full_text_indexes[0];
        let statements = writer
            .full_text_index_statements(&POST, index)
            .expect("Full text index");
        assert_eq!(
            statements.join("\n"),
            indoc! {r#"
                ALTER TABLE "Post" ADD COLUMN "ftsCol_text" TSVECTOR
                UPDATE "Post" SET "ftsCol_text" = TO_TSVECTOR('pg_catalog.english', COALESCE("title", '') || ' ' || COALESCE("body", ''))
                CREATE INDEX "ftsIx_text" ON "Post" USING GIST("ftsCol_text")
                CREATE TRIGGER "ftsTrig_text" BEFORE UPDATE OR INSERT ON "Post" FOR EACH ROW EXECUTE PROCEDURE tsvector_update_trigger("ftsCol_text", 'pg_catalog.english', "title", "body")
            "#}
            .trim()
        );

        let meta = TableMeta {
            columns: vec!["id".into(), "title".into(), "FTSCOL_TEXT".into()],
            indexes: vec!["ftsIx_text".into()],
            has_primary_key: true,
        };
        assert!(writer.has_full_text_index(&meta, index));
        assert!(!writer.has_full_text_index(&TableMeta::default(), index));
        assert!(writer.is_private_column("ftsCol_text"));
        assert!(!writer.is_private_column("title"));
    }

    #[test]
    fn create_table() {
        let writer = PostgresSqlWriter::default();
        let mut out = String::new();
        writer
            .write_create_table(&mut out, &POST)
            .expect("Could not write the table");
        assert_eq!(
            out,
            "CREATE TABLE \"Post\" (\"id\" SERIAL UNIQUE, \"title\" VARCHAR(120) NOT NULL, \
            \"body\" TEXT NOT NULL, \"published\" BOOLEAN NOT NULL, \"thumbnail\" BYTEA, \
            \"guid\" UUID NOT NULL UNIQUE, PRIMARY KEY (\"id\"))"
        );

        let mut out = String::new();
        writer
            .write_create_table(&mut out, &READING)
            .expect("Could not write the table");
        assert_eq!(
            out,
            "CREATE TABLE \"Reading\" (\"sensor\" SMALLINT NOT NULL, \
            \"taken\" TIMESTAMP NOT NULL, \"celsius\" REAL NOT NULL, \
            \"precise\" DOUBLE PRECISION, \"cost\" NUMERIC, \"day\" DATE NOT NULL, \
            PRIMARY KEY (\"sensor\", \"taken\"))"
        );
    }

    #[test]
    fn alter_table() {
        let writer = PostgresSqlWriter::default();
        assert_eq!(
            writer
                .change_column_statements("Reading", &READING_FIELDS[2], None)
                .expect("Could not change the column")
                .join("\n"),
            indoc! {r#"
                ALTER TABLE "Reading" ALTER COLUMN "celsius" TYPE REAL
                ALTER TABLE "Reading" ALTER COLUMN "celsius" SET NOT NULL
                ALTER TABLE "Reading" ALTER COLUMN "celsius" DROP DEFAULT
            "#}
            .trim()
        );

        let mut out = String::new();
        writer.write_drop_primary_key(&mut out, "Reading");
        assert_eq!(out, "ALTER TABLE \"Reading\" DROP CONSTRAINT \"Reading_pkey\"");

        let mut out = String::new();
        writer.write_last_insert_id(&mut out, "Post", "id");
        assert_eq!(out, "SELECT currval('\"Post_id_seq\"')");
    }
}
