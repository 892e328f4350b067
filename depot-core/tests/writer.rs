#[cfg(test)]
mod tests {
    use depot_core::{
        Clause, Computed, DeleteClause, DepotTypes, Entity, EntityDef, Error, Expression,
        FieldDef, GenericSqlWriter, Generation, GroupBy, IndexDef, InsertClause, Join, Key,
        KeySet, Limit, MultiKey, OrderBy, Result, SelectClause, SqlWriter, Statement,
        UpdateClause, Value, bind,
    };
    use indoc::indoc;

    const WRITER: GenericSqlWriter = GenericSqlWriter;

    static ITEM_FIELDS: [FieldDef; 4] = [
        FieldDef::new("id", Value::Int32(None))
            .primary_key()
            .generated(Generation::Identity),
        FieldDef::new("title", Value::Varchar(None)).length(80),
        FieldDef::new("price", Value::Float64(None)).nullable(),
        FieldDef::new("stock", Value::Int32(None)).default_value("0"),
    ];
    static ITEM: EntityDef = EntityDef::new("Item", &ITEM_FIELDS).indexes(&[IndexDef {
        name: "Item_title",
        fields: &["title"],
        unique: true,
    }]);

    static LINE_FIELDS: [FieldDef; 3] = [
        FieldDef::new("order_id", Value::Int64(None))
            .column("orderId")
            .primary_key(),
        FieldDef::new("item_id", Value::Int32(None))
            .column("itemId")
            .primary_key(),
        FieldDef::new("quantity", Value::Int16(None)),
    ];
    static LINE: EntityDef = EntityDef::new("OrderLine", &LINE_FIELDS).table("order_lines");

    static SUMMARY_FIELDS: [FieldDef; 3] = [
        FieldDef::new("id", Value::Int32(None)).primary_key(),
        FieldDef::new("title", Value::Varchar(None)),
        FieldDef::new("lines", Value::Int64(None)).computed(Computed::new()),
    ];
    static SUMMARY: EntityDef = EntityDef::new("ItemSummary", &SUMMARY_FIELDS)
        .computed(Computed::new().shadow_of(&ITEM));

    static TALLY_FIELDS: [FieldDef; 2] = [
        FieldDef::new("title", Value::Varchar(None)),
        FieldDef::new("copies", Value::Int64(None))
            .computed(Computed::new().definition("COUNT(*)")),
    ];
    static TALLY: EntityDef = EntityDef::new("TitleTally", &TALLY_FIELDS)
        .computed(Computed::new().shadow_of(&ITEM));

    #[derive(Default, Clone)]
    struct Item {
        id: i32,
        title: String,
        price: Option<f64>,
        stock: i32,
    }

    impl Entity for Item {
        fn entity_def() -> &'static EntityDef {
            &ITEM
        }
        fn get_field(&self, field: &str) -> Result<Value> {
            Ok(match field {
                "id" => self.id.into(),
                "title" => self.title.clone().into(),
                "price" => self.price.into(),
                "stock" => self.stock.into(),
                _ => return Err(Error::msg(format!("Unknown field {}", field))),
            })
        }
        fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
            use depot_core::AsValue;
            match field {
                "id" => self.id = AsValue::try_from_value(value)?,
                "title" => self.title = AsValue::try_from_value(value)?,
                "price" => self.price = AsValue::try_from_value(value)?,
                "stock" => self.stock = AsValue::try_from_value(value)?,
                _ => return Err(Error::msg(format!("Unknown field {}", field))),
            }
            Ok(())
        }
    }

    fn render(statement: impl Into<Statement>) -> (String, Vec<Value>) {
        let statement = statement.into();
        let types = DepotTypes::new(&statement, 100);
        let mut out = String::new();
        let placeholders = WRITER
            .write_statement(&types, &mut out, &statement)
            .expect("Could not write the statement");
        let values = bind::collect_bindings(&types, &statement, placeholders)
            .expect("Placeholders and values do not line up");
        (out, values)
    }

    fn select(entity: &'static EntityDef, clauses: impl IntoIterator<Item = Clause>) -> SelectClause {
        SelectClause::new(entity, clauses).expect("Could not build the select")
    }

    #[test]
    fn select_by_key() {
        let key = Key::simple(&ITEM, 7).expect("Could not build the key");
        let (sql, values) = render(select(&ITEM, [Clause::where_(key)]));
        assert_eq!(
            sql,
            "SELECT \"T1\".\"id\", \"T1\".\"title\", \"T1\".\"price\", \"T1\".\"stock\" \
            FROM \"Item\" AS \"T1\" WHERE \"T1\".\"id\" = ?"
        );
        assert_eq!(values, [Value::Int32(Some(7))]);
    }

    #[test]
    fn select_in_values() {
        let (sql, values) = render(select(
            &ITEM,
            [Clause::where_(ITEM.col("id").in_values([1, 2, 3]))],
        ));
        assert!(sql.ends_with("WHERE \"T1\".\"id\" IN (?, ?, ?)"), "{}", sql);
        assert_eq!(
            values,
            [
                Value::Int32(Some(1)),
                Value::Int32(Some(2)),
                Value::Int32(Some(3))
            ]
        );

        let (sql, values) = render(select(
            &ITEM,
            [Clause::where_(ITEM.col("id").in_values(Vec::<i32>::new()))],
        ));
        assert!(sql.ends_with(" WHERE false"), "{}", sql);
        assert!(values.is_empty());
    }

    #[test]
    fn select_condition_order_and_limit() {
        let (sql, values) = render(select(
            &ITEM,
            [
                Clause::where_(Expression::and(vec![
                    ITEM.col("stock").gt(0),
                    ITEM.col("title").like("A%"),
                ])),
                Clause::OrderBy(OrderBy::descending(ITEM.col("price"))),
                Clause::Limit(Limit::new(20, 10)),
                Clause::ForUpdate,
            ],
        ));
        assert_eq!(
            sql,
            "SELECT \"T1\".\"id\", \"T1\".\"title\", \"T1\".\"price\", \"T1\".\"stock\" \
            FROM \"Item\" AS \"T1\" \
            WHERE ((\"T1\".\"stock\" > ?)) AND ((\"T1\".\"title\" LIKE ?)) \
            ORDER BY \"T1\".\"price\" DESC LIMIT ? OFFSET ? FOR UPDATE"
        );
        assert_eq!(
            values,
            [
                Value::Int32(Some(0)),
                Value::Varchar(Some("A%".into())),
                Value::Int64(Some(10)),
                Value::Int64(Some(20)),
            ]
        );
    }

    #[test]
    fn select_is_null_and_not() {
        let (sql, values) = render(select(
            &ITEM,
            [Clause::where_(Expression::or(vec![
                ITEM.col("price").is_null(),
                ITEM.col("stock").le(5).not(),
            ]))],
        ));
        assert!(
            sql.ends_with(
                "WHERE (\"T1\".\"price\" IS NULL) OR (NOT ((\"T1\".\"stock\" <= ?)))"
            ),
            "{}",
            sql
        );
        assert_eq!(values, [Value::Int32(Some(5))]);
    }

    #[test]
    fn composite_keys() {
        let key = Key::new(&LINE, [("item_id", 3_i64), ("order_id", 10_i64)])
            .expect("Could not build the key");
        let (sql, values) = render(select(&LINE, [Clause::where_(key.clone())]));
        assert_eq!(
            sql,
            "SELECT \"T1\".\"orderId\", \"T1\".\"itemId\", \"T1\".\"quantity\" \
            FROM \"order_lines\" AS \"T1\" \
            WHERE \"T1\".\"orderId\" = ? AND \"T1\".\"itemId\" = ?"
        );
        assert_eq!(values, [Value::Int64(Some(10)), Value::Int32(Some(3))]);

        let other = Key::new(&LINE, [("order_id", 11_i64), ("item_id", 4_i64)])
            .expect("Could not build the key");
        let keys = KeySet::new(&LINE, [key, other]).expect("Could not build the key set");
        let (sql, values) = render(select(&LINE, [Clause::where_(keys)]));
        assert!(
            sql.ends_with(
                "WHERE (\"T1\".\"orderId\" = ? AND \"T1\".\"itemId\" = ?) \
                OR (\"T1\".\"orderId\" = ? AND \"T1\".\"itemId\" = ?)"
            ),
            "{}",
            sql
        );
        assert_eq!(
            values,
            [
                Value::Int64(Some(10)),
                Value::Int32(Some(3)),
                Value::Int64(Some(11)),
                Value::Int32(Some(4)),
            ]
        );

        let multi = MultiKey::new(&LINE, [("order_id", 10)], "item_id", [1, 2])
            .expect("Could not build the multi key");
        let (sql, values) = render(select(&LINE, [Clause::where_(multi)]));
        assert!(
            sql.ends_with("WHERE \"T1\".\"orderId\" = ? AND \"T1\".\"itemId\" IN (?, ?)"),
            "{}",
            sql
        );
        assert_eq!(
            values,
            [
                Value::Int64(Some(10)),
                Value::Int32(Some(1)),
                Value::Int32(Some(2)),
            ]
        );

        let nothing = MultiKey::new(&LINE, [("order_id", 10)], "item_id", Vec::<i32>::new())
            .expect("Could not build the multi key");
        let (sql, values) = render(select(&LINE, [Clause::where_(nothing)]));
        assert!(sql.ends_with(" WHERE false"), "{}", sql);
        assert!(values.is_empty());
    }

    #[test]
    fn single_column_key_set() {
        let keys = [4, 8]
            .into_iter()
            .map(|id| Key::simple(&ITEM, id))
            .collect::<Result<Vec<_>>>()
            .expect("Could not build the keys");
        let (sql, values) = render(select(
            &ITEM,
            [Clause::where_(KeySet::new(&ITEM, keys).expect("Key set"))],
        ));
        assert!(sql.ends_with("WHERE \"T1\".\"id\" IN (?, ?)"), "{}", sql);
        assert_eq!(values, [Value::Int32(Some(4)), Value::Int32(Some(8))]);

        let (sql, values) = render(select(
            &ITEM,
            [Clause::where_(KeySet::new(&ITEM, Vec::new()).expect("Key set"))],
        ));
        assert!(sql.ends_with("WHERE false"), "{}", sql);
        assert!(values.is_empty());
    }

    #[test]
    fn join_and_exists() {
        let lines = select(
            &LINE,
            [Clause::where_(LINE.col("item_id").eq(ITEM.col("id")))],
        );
        let (sql, values) = render(select(
            &ITEM,
            [Clause::where_(Expression::and(vec![
                Expression::exists(lines),
                ITEM.col("stock").lt(3),
            ]))],
        ));
        assert_eq!(
            sql,
            "SELECT \"T1\".\"id\", \"T1\".\"title\", \"T1\".\"price\", \"T1\".\"stock\" \
            FROM \"Item\" AS \"T1\" \
            WHERE (EXISTS (SELECT \"T2\".\"orderId\", \"T2\".\"itemId\", \"T2\".\"quantity\" \
            FROM \"order_lines\" AS \"T2\" WHERE (\"T2\".\"itemId\" = \"T1\".\"id\"))) \
            AND ((\"T1\".\"stock\" < ?))"
        );
        assert_eq!(values, [Value::Int32(Some(3))]);

        let (sql, values) = render(select(
            &ITEM,
            [
                Clause::Join(
                    Join::new(&LINE, LINE.col("item_id").eq(ITEM.col("id"))).left_outer(),
                ),
                Clause::where_(LINE.col("quantity").ge(2)),
            ],
        ));
        assert!(
            sql.ends_with(
                "FROM \"Item\" AS \"T1\" LEFT OUTER JOIN \"order_lines\" AS \"T2\" \
                ON (\"T2\".\"itemId\" = \"T1\".\"id\") WHERE (\"T2\".\"quantity\" >= ?)"
            ),
            "{}",
            sql
        );
        assert_eq!(values, [Value::Int32(Some(2))]);
    }

    #[test]
    fn computed_entity_reads_its_shadow() {
        let lines = SelectClause::with_fields(
            &LINE,
            ["quantity"],
            [Clause::where_(LINE.col("item_id").eq(ITEM.col("id")))],
        )
        .expect("Could not build the subquery");
        let key = Key::simple(&SUMMARY, 7).expect("Could not build the key");
        let (sql, values) = render(select(
            &SUMMARY,
            [
                Clause::field_definition("lines", Expression::select(lines)),
                Clause::where_(key),
            ],
        ));
        assert_eq!(
            sql,
            "SELECT \"T2\".\"id\", \"T2\".\"title\", \
            (SELECT \"T3\".\"quantity\" FROM \"order_lines\" AS \"T3\" \
            WHERE (\"T3\".\"itemId\" = \"T2\".\"id\")) AS \"lines\" \
            FROM \"Item\" AS \"T2\" WHERE \"T2\".\"id\" = ?"
        );
        assert_eq!(values, [Value::Int32(Some(7))]);
    }

    #[test]
    fn literal_definitions_and_group_by() {
        let (sql, values) = render(select(
            &TALLY,
            [
                Clause::where_(ITEM.col("stock").gt(0)),
                Clause::GroupBy(GroupBy {
                    values: vec![
                        TALLY.col("title"),
                        Expression::function(
                            "ROUND",
                            vec![ITEM.col("price"), Expression::value(1)],
                        ),
                    ],
                }),
                Clause::OrderBy(OrderBy::descending(TALLY.col("copies"))),
                Clause::Limit(Limit::new(0, 5)),
            ],
        ));
        assert_eq!(
            sql,
            "SELECT \"T2\".\"title\", COUNT(*) AS \"copies\" \
            FROM \"Item\" AS \"T2\" WHERE (\"T2\".\"stock\" > ?) \
            GROUP BY \"T2\".\"title\", ROUND(\"T2\".\"price\", ?) \
            ORDER BY COUNT(*) DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            values,
            [
                Value::Int32(Some(0)),
                Value::Int32(Some(1)),
                Value::Int64(Some(5)),
                Value::Int64(Some(0)),
            ]
        );
    }

    #[test]
    fn field_override_applies_to_keys() {
        let key = Key::simple(&ITEM, 1).expect("Could not build the key");
        let (sql, values) = render(select(
            &ITEM,
            [
                Clause::field_override(
                    "stock",
                    Expression::function("COALESCE", vec![ITEM.col("stock"), 0.into()]),
                ),
                Clause::where_(key),
            ],
        ));
        assert_eq!(
            sql,
            "SELECT \"T1\".\"id\", \"T1\".\"title\", \"T1\".\"price\", \
            COALESCE(\"T1\".\"stock\", ?) AS \"stock\" \
            FROM \"Item\" AS \"T1\" WHERE \"T1\".\"id\" = ?"
        );
        assert_eq!(values, [Value::Int32(Some(0)), Value::Int32(Some(1))]);
    }

    #[test]
    fn insert_leaves_identity_to_the_database() {
        let item = Item {
            title: "Lamp".into(),
            stock: 2,
            ..Default::default()
        };
        let (sql, values) = render(InsertClause::new(&item).expect("Could not build the insert"));
        assert_eq!(
            sql,
            "INSERT INTO \"Item\" (\"id\", \"title\", \"price\", \"stock\") VALUES (DEFAULT, ?, ?, ?)"
        );
        assert_eq!(
            values,
            [
                Value::Varchar(Some("Lamp".into())),
                Value::Float64(None),
                Value::Int32(Some(2)),
            ]
        );

        let item = Item { id: 9, ..item };
        let (sql, values) = render(InsertClause::new(&item).expect("Could not build the insert"));
        assert!(sql.ends_with("VALUES (?, ?, ?, ?)"), "{}", sql);
        assert_eq!(values[0], Value::Int32(Some(9)));
    }

    #[test]
    fn update_and_delete() {
        let key = Key::simple(&ITEM, 5).expect("Could not build the key");
        let update = UpdateClause::new(
            &ITEM,
            Some(key.clone().into()),
            [
                ("title", Expression::value("Desk")),
                (
                    "stock",
                    Expression::binary(ITEM.col("stock"), depot_core::BinaryOp::Add, 1.into()),
                ),
            ],
        )
        .expect("Could not build the update");
        let (sql, values) = render(update);
        assert_eq!(
            sql,
            "UPDATE \"Item\" AS \"T1\" SET \"title\" = ?, \"stock\" = (\"T1\".\"stock\" + ?) \
            WHERE \"T1\".\"id\" = ?"
        );
        assert_eq!(
            values,
            [
                Value::Varchar(Some("Desk".into())),
                Value::Int32(Some(1)),
                Value::Int32(Some(5)),
            ]
        );

        let (sql, values) = render(DeleteClause::new(&ITEM, key).expect("Delete"));
        assert_eq!(sql, "DELETE FROM \"Item\" AS \"T1\" WHERE \"T1\".\"id\" = ?");
        assert_eq!(values, [Value::Int32(Some(5))]);
    }

    #[test]
    fn update_requires_a_where_clause() {
        let update = UpdateClause::new(&ITEM, None, [("stock", Expression::value(1))])
            .expect("Could not build the update");
        let statement = Statement::from(update);
        let types = DepotTypes::new(&statement, 100);
        let mut out = String::new();
        let error = WRITER
            .write_statement(&types, &mut out, &statement)
            .expect_err("Update without where must fail");
        assert!(depot_core::DepotError::is_configuration(&error));
    }

    #[test]
    fn computed_entities_are_read_only() {
        assert!(DeleteClause::new(&SUMMARY, Key::simple(&SUMMARY, 1).expect("Key")).is_err());
        assert!(UpdateClause::new(&SUMMARY, None, [("title", Expression::value("x"))]).is_err());
        assert!(UpdateClause::new(&ITEM, None, Vec::<(&str, Expression)>::new()).is_err());
    }

    #[test]
    fn create_table_and_index() {
        let mut out = String::new();
        WRITER
            .write_create_table(&mut out, &ITEM)
            .expect("Could not write the table");
        assert_eq!(
            out,
            "CREATE TABLE \"Item\" (\"id\" SERIAL UNIQUE, \"title\" VARCHAR(80) NOT NULL, \
            \"price\" DOUBLE, \"stock\" INTEGER NOT NULL DEFAULT 0, PRIMARY KEY (\"id\"))"
        );

        let mut out = String::new();
        WRITER
            .write_create_table(&mut out, &LINE)
            .expect("Could not write the table");
        assert_eq!(
            out,
            "CREATE TABLE \"order_lines\" (\"orderId\" BIGINT NOT NULL, \"itemId\" INTEGER NOT NULL, \
            \"quantity\" SMALLINT NOT NULL, PRIMARY KEY (\"orderId\", \"itemId\"))"
        );

        let mut out = String::new();
        let index = &ITEM.indexes[0];
        WRITER.write_create_index(&mut out, ITEM.table, index.name, &["title"], index.unique);
        assert_eq!(out, "CREATE UNIQUE INDEX \"Item_title\" ON \"Item\" (\"title\")");
    }

    #[test]
    fn alter_table() {
        let stock = &ITEM_FIELDS[3];
        let mut out = String::new();
        let definition = WRITER
            .column_definition(stock, Some("5"))
            .expect("Could not write the column");
        WRITER.write_add_column(&mut out, "Item", "stock", &definition);
        assert_eq!(
            out,
            "ALTER TABLE \"Item\" ADD COLUMN \"stock\" INTEGER NOT NULL DEFAULT 5"
        );

        let mut out = String::new();
        WRITER.write_rename_column(&mut out, "Item", "name", "title", "VARCHAR(80) NOT NULL");
        assert_eq!(out, "ALTER TABLE \"Item\" RENAME COLUMN \"name\" TO \"title\"");

        assert_eq!(
            WRITER
                .change_column_statements("Item", stock, None)
                .expect("Could not change the column")
                .join("\n"),
            indoc! {r#"
                ALTER TABLE "Item" ALTER COLUMN "stock" TYPE INTEGER
                ALTER TABLE "Item" ALTER COLUMN "stock" SET NOT NULL
                ALTER TABLE "Item" ALTER COLUMN "stock" SET DEFAULT 0
            "#}
            .trim()
        );
        assert_eq!(
            WRITER
                .change_column_statements("Item", &ITEM_FIELDS[2], None)
                .expect("Could not change the column")
                .join("\n"),
            indoc! {r#"
                ALTER TABLE "Item" ALTER COLUMN "price" TYPE DOUBLE
                ALTER TABLE "Item" ALTER COLUMN "price" DROP NOT NULL
                ALTER TABLE "Item" ALTER COLUMN "price" DROP DEFAULT
            "#}
            .trim()
        );

        let mut out = String::new();
        WRITER.write_drop_primary_key(&mut out, "Item");
        assert_eq!(out, "ALTER TABLE \"Item\" DROP CONSTRAINT \"Item_pkey\"");
    }

    #[test]
    fn untyped_fields_have_no_column() {
        static VAGUE_FIELDS: [FieldDef; 2] = [
            FieldDef::new("id", Value::Int32(None)).primary_key(),
            FieldDef::new("mystery", Value::Null),
        ];
        static VAGUE: EntityDef = EntityDef::new("Vague", &VAGUE_FIELDS);

        let mut out = String::new();
        let error = WRITER
            .write_create_table(&mut out, &VAGUE)
            .expect_err("The table has an untyped column");
        assert!(depot_core::DepotError::is_configuration(&error));
        assert!(format!("{:#}", error).contains("mystery"), "{:#}", error);

        let mystery = &VAGUE_FIELDS[1];
        assert!(WRITER.column_definition(mystery, None).is_err());
        assert!(WRITER.change_column_statements("Vague", mystery, None).is_err());
    }

    #[test]
    fn identifiers_are_escaped() {
        let mut out = String::new();
        WRITER.write_identifier(&mut out, "odd\"name");
        assert_eq!(out, "\"odd\"\"name\"");
    }

    #[test]
    fn in_values_limit() {
        let statement = Statement::from(select(
            &ITEM,
            [Clause::where_(ITEM.col("id").in_values(0..5))],
        ));
        let types = DepotTypes::new(&statement, 4);
        let mut out = String::new();
        let error = WRITER
            .write_statement(&types, &mut out, &statement)
            .expect_err("Too many values");
        assert!(depot_core::DepotError::is_configuration(&error));
        assert!(bind::collect_bindings(&types, &statement, 5).is_err());
    }

    #[test]
    fn ambiguous_clauses() {
        let first = Key::simple(&ITEM, 1).expect("Key");
        let second = Key::simple(&ITEM, 2).expect("Key");
        let error = SelectClause::new(&ITEM, [Clause::where_(first), Clause::where_(second)])
            .expect_err("Two where clauses");
        assert!(depot_core::DepotError::is_configuration(&error));
        assert!(
            SelectClause::new(&ITEM, [Clause::ForUpdate, Clause::ForUpdate]).is_err()
        );
        assert!(
            SelectClause::new(
                &ITEM,
                [Clause::field_definition("stock", Expression::literal("1"))]
            )
            .and_then(|s| {
                let statement = Statement::from(s);
                let types = DepotTypes::new(&statement, 100);
                WRITER.write_statement(&types, &mut String::new(), &statement)
            })
            .is_err()
        );
    }
}
