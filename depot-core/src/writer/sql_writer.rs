use crate::{
    DeleteClause, DepotTypes, EntityDef, Error, Expression, FieldDef, FieldSource, FullTextIndex,
    FullTextMatch, InsertClause, Join, JoinType, Key, KeySet, MultiKey, Order, Result,
    SelectClause, Statement, TableMeta, UpdateClause, Value, WhereClause,
    error::configuration_error,
    separated_by, try_separated_by,
    writer::{Context, Fragment},
};
use std::mem;

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}

/// Dialect printer turning statements into parameterized SQL and DDL.
///
/// Every `write_*` method taking a [`Context`] must write one placeholder
/// (through [`SqlWriter::write_placeholder`]) for each value the bind pass
/// supplies for the same node, in the same order.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', "\"\"");
        out.push('"');
    }

    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        out.push('?');
    }

    fn write_table_name(&self, out: &mut String, entity: &EntityDef) {
        self.write_identifier(out, entity.table);
    }

    /// Render `table AS T<n>`.
    fn write_table_declaration(
        &self,
        context: &mut Context,
        out: &mut String,
        entity: &EntityDef,
    ) -> Result<()> {
        self.write_table_name(out, entity);
        out.push_str(" AS ");
        self.write_identifier(out, &context.types.abbreviation(entity)?);
        Ok(())
    }

    /// Render a column qualified by the table abbreviation, or by the table
    /// name when abbreviations are off.
    fn write_column(
        &self,
        context: &mut Context,
        out: &mut String,
        table: &EntityDef,
        column: &str,
    ) -> Result<()> {
        if context.use_abbreviations {
            self.write_identifier(out, &context.types.abbreviation(table)?);
        } else {
            self.write_table_name(out, table);
        }
        out.push('.');
        self.write_identifier(out, column);
        Ok(())
    }

    /// A bare column name, the target of an assignment.
    fn write_lhs_column(&self, out: &mut String, field: &FieldDef) {
        self.write_identifier(out, field.column);
    }

    /// A field used as a value: a qualified column, an override or the
    /// definition of a computed field.
    fn write_rhs_column<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        entity: &'static EntityDef,
        field: &str,
    ) -> Result<()> {
        let alias = context.alias_declaration();
        match context.scope.resolve(entity, field)? {
            FieldSource::Definition(expression) => {
                let mut context = context.switch_fragment(Fragment::SqlFieldDefinition);
                // The target of an override is never expanded again
                context.with_overrides(false, |context| {
                    self.write_expression(context, out, expression)
                })?;
            }
            FieldSource::Literal(definition) => out.push_str(definition),
            FieldSource::Omitted => return Ok(()),
            FieldSource::Column { table, field } => {
                return self.write_column(context, out, table, field.column);
            }
        }
        if alias {
            out.push_str(" AS ");
            self.write_identifier(out, field);
        }
        Ok(())
    }

    fn write_expression<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a Expression,
    ) -> Result<()> {
        match value {
            Expression::Column(v) => self.write_rhs_column(context, out, v.entity, v.field)?,
            Expression::Value(..) => self.write_placeholder(context, out),
            Expression::Literal(v) => out.push_str(v),
            Expression::Function { name, arguments } => {
                out.push_str(name);
                out.push('(');
                try_separated_by(
                    out,
                    arguments,
                    |out, v| self.write_expression(context, out, v),
                    ", ",
                )?;
                out.push(')');
            }
            Expression::Binary { lhs, op, rhs } => {
                out.push('(');
                self.write_expression(context, out, lhs)?;
                out.push_str(op.as_sql());
                self.write_expression(context, out, rhs)?;
                out.push(')');
            }
            Expression::Logic { op, conditions } => {
                try_separated_by(
                    out,
                    conditions,
                    |out, v| {
                        out.push('(');
                        self.write_expression(context, out, v)?;
                        out.push(')');
                        Ok::<_, crate::Error>(())
                    },
                    op.as_sql(),
                )?;
            }
            Expression::Not(v) => {
                out.push_str("NOT (");
                self.write_expression(context, out, v)?;
                out.push(')');
            }
            Expression::In { column, values } => {
                self.write_in(context, out, column, values)?;
            }
            Expression::IsNull(v) => {
                self.write_expression(context, out, v)?;
                out.push_str(" IS NULL");
            }
            Expression::Exists(v) => {
                out.push_str("EXISTS ");
                self.write_select(context, out, v)?;
            }
            Expression::Select(v) => self.write_select(context, out, v)?,
            Expression::FullText(v) => self.write_full_text_match(context, out, v)?,
        }
        Ok(())
    }

    /// Render `column IN (?, ...)`, an empty list matches nothing.
    fn write_in<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        column: &'a Expression,
        values: &'a [Value],
    ) -> Result<()> {
        context.types.check_in_size(values.len())?;
        if values.is_empty() {
            out.push_str("false");
            return Ok(());
        }
        self.write_expression(context, out, column)?;
        self.write_in_list(context, out, values.len());
        Ok(())
    }

    fn write_in_list(&self, context: &mut Context, out: &mut String, len: usize) {
        out.push_str(" IN (");
        for i in 0..len {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_placeholder(context, out);
        }
        out.push(')');
    }

    fn write_full_text_match<'a>(
        &self,
        _context: &mut Context<'a>,
        _out: &mut String,
        value: &'a FullTextMatch,
    ) -> Result<()> {
        Err(configuration_error(format!(
            "Full text search on {} is not supported by this dialect",
            value.entity.name
        )))
    }

    fn write_where<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a WhereClause,
    ) -> Result<()> {
        out.push_str(" WHERE ");
        self.write_where_condition(context, out, value)
    }

    fn write_where_condition<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a WhereClause,
    ) -> Result<()> {
        match value {
            WhereClause::Condition(v) => self.write_expression(context, out, v),
            WhereClause::Key(v) => self.write_key(context, out, v),
            WhereClause::MultiKey(v) => self.write_multi_key(context, out, v),
            WhereClause::KeySet(v) => self.write_key_set(context, out, v),
        }
    }

    /// Render `col = ?` per key field joined by `AND`, `col IS NULL` for nulls.
    fn write_key<'a>(&self, context: &mut Context<'a>, out: &mut String, value: &'a Key) -> Result<()> {
        // Keys must match what is actually selected for the record
        context.with_overrides(true, |context| {
            try_separated_by(
                out,
                value.fields(),
                |out, (field, v)| {
                    self.write_rhs_column(context, out, value.entity(), field.name)?;
                    self.write_comparison_with(context, out, v);
                    Ok::<_, crate::Error>(())
                },
                " AND ",
            )
        })
    }

    /// ` = ?`, or ` IS NULL` when the value is null.
    fn write_comparison_with(&self, context: &mut Context, out: &mut String, value: &Value) {
        if value.is_null() {
            out.push_str(" IS NULL");
        } else {
            out.push_str(" = ");
            self.write_placeholder(context, out);
        }
    }

    fn write_multi_key<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a MultiKey,
    ) -> Result<()> {
        context.types.check_in_size(value.multi_values().len())?;
        if value.multi_values().is_empty() {
            out.push_str("false");
            return Ok(());
        }
        context.with_overrides(true, |context| {
            for (field, v) in value.singles() {
                self.write_rhs_column(context, out, value.entity(), field.name)?;
                self.write_comparison_with(context, out, v);
                out.push_str(" AND ");
            }
            self.write_rhs_column(context, out, value.entity(), value.multi_field().name)?;
            self.write_in_list(context, out, value.multi_values().len());
            Ok(())
        })
    }

    /// No keys match nothing, single column keys become an `IN`, composite
    /// keys an `OR` of key conditions.
    fn write_key_set<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a KeySet,
    ) -> Result<()> {
        let entity = value.entity();
        let mut key_fields = entity.primary_key_fields();
        match (value.is_empty(), key_fields.next(), key_fields.next()) {
            (true, ..) => out.push_str("false"),
            (false, Some(field), None) => {
                context.types.check_in_size(value.len())?;
                self.write_rhs_column(context, out, entity, field.name)?;
                self.write_in_list(context, out, value.len());
            }
            _ => try_separated_by(
                out,
                value.keys(),
                |out, key| {
                    out.push('(');
                    self.write_key(context, out, key)?;
                    out.push(')');
                    Ok::<_, crate::Error>(())
                },
                " OR ",
            )?,
        }
        Ok(())
    }

    fn write_join<'a>(&self, context: &mut Context<'a>, out: &mut String, value: &'a Join) -> Result<()> {
        out.push_str(match value.join_type {
            JoinType::Inner => " INNER JOIN ",
            JoinType::LeftOuter => " LEFT OUTER JOIN ",
            JoinType::RightOuter => " RIGHT OUTER JOIN ",
        });
        self.write_table_declaration(context, out, value.entity)?;
        out.push_str(" ON ");
        self.write_expression(context, out, &value.condition)
    }

    fn write_limit(&self, context: &mut Context, out: &mut String) {
        out.push_str(" LIMIT ");
        self.write_placeholder(context, out);
        out.push_str(" OFFSET ");
        self.write_placeholder(context, out);
    }

    /// Render a select, parenthesized when nested in another statement.
    fn write_select<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a SelectClause,
    ) -> Result<()> {
        let inner = context.is_inner();
        if inner {
            out.push('(');
        }
        context.scope.push(value.entity, &value.definitions)?;
        let result = self.write_select_body(context, out, value);
        context.scope.pop();
        result?;
        if inner {
            out.push(')');
        }
        Ok(())
    }

    fn write_select_body<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a SelectClause,
    ) -> Result<()> {
        let entity = value.entity;
        out.push_str("SELECT ");
        let mut context = context.switch_fragment(Fragment::SqlSelect);
        context.with_overrides(true, |context| {
            try_separated_by(
                out,
                &value.fields,
                |out, field| self.write_rhs_column(context, out, entity, field),
                ", ",
            )
        })?;

        context.fragment = Fragment::SqlSelectFrom;
        out.push_str(" FROM ");
        if let Some(from) = &value.from_override {
            try_separated_by(
                out,
                &from.entities,
                |out, v| self.write_table_declaration(&mut context, out, v),
                ", ",
            )?;
        } else {
            let table = match entity.computed {
                None => entity,
                Some(computed) => computed.shadow_of.ok_or_else(|| {
                    configuration_error(format!(
                        "Query on computed entity {} with no FromOverride",
                        entity.name
                    ))
                })?,
            };
            self.write_table_declaration(&mut context, out, table)?;
        }

        context.fragment = Fragment::SqlJoin;
        for join in &value.joins {
            self.write_join(&mut context, out, join)?;
        }
        if let Some(where_clause) = &value.where_clause {
            context.fragment = Fragment::SqlSelectWhere;
            self.write_where(&mut context, out, where_clause)?;
        }
        if let Some(group_by) = &value.group_by {
            context.fragment = Fragment::SqlSelectGroupBy;
            out.push_str(" GROUP BY ");
            try_separated_by(
                out,
                &group_by.values,
                |out, v| self.write_expression(&mut context, out, v),
                ", ",
            )?;
        }
        if let Some(order_by) = &value.order_by {
            context.fragment = Fragment::SqlSelectOrderBy;
            out.push_str(" ORDER BY ");
            try_separated_by(
                out,
                &order_by.values,
                |out, (v, order)| {
                    self.write_expression(&mut context, out, v)?;
                    out.push_str(match order {
                        Order::Asc => " ASC",
                        Order::Desc => " DESC",
                    });
                    Ok::<_, crate::Error>(())
                },
                ", ",
            )?;
        }
        if value.limit.is_some() {
            self.write_limit(&mut context, out);
        }
        if value.for_update {
            out.push_str(" FOR UPDATE");
        }
        Ok(())
    }

    fn write_insert<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a InsertClause,
    ) -> Result<()> {
        let mut context = context.switch_fragment(Fragment::SqlInsertInto);
        out.push_str("INSERT INTO ");
        self.write_table_name(out, value.entity);
        out.push_str(" (");
        separated_by(
            out,
            &value.values,
            |out, (field, _)| self.write_lhs_column(out, field),
            ", ",
        );
        out.push_str(") VALUES (");
        context.fragment = Fragment::SqlInsertIntoValues;
        separated_by(
            out,
            &value.values,
            |out, (field, _)| {
                if value.is_identity(field.name) {
                    out.push_str("DEFAULT");
                } else {
                    self.write_placeholder(&mut context, out);
                }
            },
            ", ",
        );
        out.push(')');
        Ok(())
    }

    fn write_update<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a UpdateClause,
    ) -> Result<()> {
        let Some(where_clause) = &value.where_clause else {
            return Err(configuration_error(format!(
                "Can't update {} without a where clause",
                value.entity.name
            )));
        };
        let mut context = context.switch_fragment(Fragment::SqlUpdate);
        out.push_str("UPDATE ");
        self.write_table_declaration(&mut context, out, value.entity)?;
        out.push_str(" SET ");
        context.fragment = Fragment::SqlUpdateSet;
        try_separated_by(
            out,
            &value.assignments,
            |out, (field, expression)| {
                self.write_lhs_column(out, field);
                out.push_str(" = ");
                self.write_expression(&mut context, out, expression)
            },
            ", ",
        )?;
        self.write_where(&mut context, out, where_clause)
    }

    fn write_delete<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a DeleteClause,
    ) -> Result<()> {
        let mut context = context.switch_fragment(Fragment::SqlDeleteFrom);
        out.push_str("DELETE FROM ");
        self.write_table_declaration(&mut context, out, value.entity)?;
        context.fragment = Fragment::SqlDeleteFromWhere;
        self.write_where(&mut context, out, &value.where_clause)
    }

    /// Render a whole statement, returning the number of placeholders.
    fn write_statement(
        &self,
        types: &DepotTypes,
        out: &mut String,
        statement: &Statement,
    ) -> Result<u32> {
        let mut context = Context::new(types);
        match statement {
            Statement::Select(v) => self.write_select(&mut context, out, v)?,
            Statement::Insert(v) => self.write_insert(&mut context, out, v)?,
            Statement::Update(v) => self.write_update(&mut context, out, v)?,
            Statement::Delete(v) => self.write_delete(&mut context, out, v)?,
        }
        Ok(context.counter)
    }

    /// Render the SQL type for a field.
    fn write_column_type(&self, out: &mut String, field: &FieldDef) -> Result<()> {
        match field.value {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::Int8(..) => out.push_str("TINYINT"),
            Value::Int16(..) => out.push_str("SMALLINT"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float32(..) => out.push_str("FLOAT"),
            Value::Float64(..) => out.push_str("DOUBLE"),
            Value::Decimal(..) => out.push_str("DECIMAL"),
            Value::Varchar(..) => self.write_varchar_type(out, field.length),
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Date(..) => out.push_str("DATE"),
            Value::Time(..) => out.push_str("TIME"),
            Value::Timestamp(..) => out.push_str("TIMESTAMP"),
            Value::Uuid(..) => out.push_str("UUID"),
            Value::Null => return Err(untyped_field(field)),
        }
        Ok(())
    }

    /// `VARCHAR(len)`, or `TEXT` for lengths beyond 32767.
    fn write_varchar_type(&self, out: &mut String, length: u32) {
        if length < (1 << 15) {
            out.push_str("VARCHAR(");
            write_integer!(out, length);
            out.push(')');
        } else {
            out.push_str("TEXT");
        }
    }

    /// The default of a column lacking an explicit one.
    fn column_default(&self, field: &FieldDef) -> Option<&'static str> {
        field.default
    }

    /// Render `type [NOT NULL] [UNIQUE] [DEFAULT d]`, `default` replaces the
    /// declared default.
    fn write_column_definition(
        &self,
        out: &mut String,
        field: &FieldDef,
        default: Option<&str>,
    ) -> Result<()> {
        if field.is_identity() {
            out.push_str("SERIAL UNIQUE");
            return Ok(());
        }
        match field.column_type {
            Some(column_type) => out.push_str(column_type),
            None => self.write_column_type(out, field)?,
        }
        if !field.nullable {
            out.push_str(" NOT NULL");
        }
        if field.unique {
            out.push_str(" UNIQUE");
        }
        if let Some(default) = default.or_else(|| self.column_default(field)) {
            out.push_str(" DEFAULT ");
            out.push_str(default);
        }
        Ok(())
    }

    fn column_definition(&self, field: &FieldDef, default: Option<&str>) -> Result<String> {
        let mut out = String::with_capacity(32);
        self.write_column_definition(&mut out, field, default)?;
        Ok(out)
    }

    /// Emit CREATE TABLE from literal column definitions.
    fn write_create_table_columns(
        &self,
        out: &mut String,
        table: &str,
        columns: &[(&str, String)],
        primary_key: &[&str],
    ) {
        out.reserve(32 + columns.len() * 32);
        out.push_str("CREATE TABLE ");
        self.write_identifier(out, table);
        out.push_str(" (");
        separated_by(
            out,
            columns,
            |out, (name, definition)| {
                self.write_identifier(out, name);
                out.push(' ');
                out.push_str(definition);
            },
            ", ",
        );
        if !primary_key.is_empty() {
            out.push_str(", PRIMARY KEY (");
            separated_by(out, primary_key, |out, v| self.write_identifier(out, v), ", ");
            out.push(')');
        }
        out.push(')');
    }

    /// Emit CREATE TABLE for the column fields of an entity.
    fn write_create_table(&self, out: &mut String, entity: &'static EntityDef) -> Result<()> {
        let columns = entity
            .column_fields()
            .map(|f| Ok((f.column, self.column_definition(f, None)?)))
            .collect::<Result<Vec<(&str, String)>>>()?;
        let primary_key: Vec<&str> = entity.primary_key_fields().map(|f| f.column).collect();
        self.write_create_table_columns(out, entity.table, &columns, &primary_key);
        Ok(())
    }

    fn write_alter_table(&self, out: &mut String, table: &str) {
        out.push_str("ALTER TABLE ");
        self.write_identifier(out, table);
    }

    fn write_add_column(&self, out: &mut String, table: &str, column: &str, definition: &str) {
        self.write_alter_table(out, table);
        out.push_str(" ADD COLUMN ");
        self.write_identifier(out, column);
        out.push(' ');
        out.push_str(definition);
    }

    fn write_drop_column(&self, out: &mut String, table: &str, column: &str) {
        self.write_alter_table(out, table);
        out.push_str(" DROP COLUMN ");
        self.write_identifier(out, column);
    }

    fn write_rename_column(
        &self,
        out: &mut String,
        table: &str,
        old_column: &str,
        new_column: &str,
        _definition: &str,
    ) {
        self.write_alter_table(out, table);
        out.push_str(" RENAME COLUMN ");
        self.write_identifier(out, old_column);
        out.push_str(" TO ");
        self.write_identifier(out, new_column);
    }

    /// Statements changing a column to the field declaration, with `default`
    /// replacing the declared default.
    fn change_column_statements(
        &self,
        table: &str,
        field: &FieldDef,
        default: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut result = Vec::with_capacity(3);
        let mut out = String::with_capacity(64);
        self.write_alter_table(&mut out, table);
        out.push_str(" ALTER COLUMN ");
        self.write_identifier(&mut out, field.column);
        out.push_str(" TYPE ");
        match field.column_type {
            Some(column_type) => out.push_str(column_type),
            None => self.write_column_type(&mut out, field)?,
        }
        result.push(mem::take(&mut out));

        self.write_alter_table(&mut out, table);
        out.push_str(" ALTER COLUMN ");
        self.write_identifier(&mut out, field.column);
        out.push_str(if field.nullable {
            " DROP NOT NULL"
        } else {
            " SET NOT NULL"
        });
        result.push(mem::take(&mut out));

        self.write_alter_table(&mut out, table);
        out.push_str(" ALTER COLUMN ");
        self.write_identifier(&mut out, field.column);
        match default.or_else(|| self.column_default(field)) {
            Some(default) => {
                out.push_str(" SET DEFAULT ");
                out.push_str(default);
            }
            None => out.push_str(" DROP DEFAULT"),
        }
        result.push(out);
        Ok(result)
    }

    fn write_add_primary_key(&self, out: &mut String, table: &str, columns: &[&str]) {
        self.write_alter_table(out, table);
        out.push_str(" ADD PRIMARY KEY (");
        separated_by(out, columns, |out, v| self.write_identifier(out, v), ", ");
        out.push(')');
    }

    fn write_drop_primary_key(&self, out: &mut String, table: &str) {
        self.write_alter_table(out, table);
        out.push_str(" DROP CONSTRAINT ");
        self.write_identifier(out, &format!("{}_pkey", table));
    }

    fn write_create_index(
        &self,
        out: &mut String,
        table: &str,
        name: &str,
        columns: &[&str],
        unique: bool,
    ) {
        out.push_str(if unique {
            "CREATE UNIQUE INDEX "
        } else {
            "CREATE INDEX "
        });
        self.write_identifier(out, name);
        out.push_str(" ON ");
        self.write_identifier(out, table);
        out.push_str(" (");
        separated_by(out, columns, |out, v| self.write_identifier(out, v), ", ");
        out.push(')');
    }

    /// Statements creating a full text index.
    fn full_text_index_statements(
        &self,
        entity: &'static EntityDef,
        _index: &FullTextIndex,
    ) -> Result<Vec<String>> {
        Err(configuration_error(format!(
            "Full text search on {} is not supported by this dialect",
            entity.name
        )))
    }

    fn has_full_text_index(&self, _meta: &TableMeta, _index: &FullTextIndex) -> bool {
        false
    }

    /// Columns maintained by the dialect itself, never dropped as undeclared.
    fn is_private_column(&self, _column: &str) -> bool {
        false
    }

    /// Query returning the identity value generated by the last insert.
    fn write_last_insert_id(&self, out: &mut String, _table: &str, _column: &str) {
        out.push_str("SELECT LAST_INSERT_ID()");
    }

    fn write_set_now(&self, out: &mut String, table: &str, column: &str) {
        out.push_str("UPDATE ");
        self.write_identifier(out, table);
        out.push_str(" SET ");
        self.write_identifier(out, column);
        out.push_str(" = NOW()");
    }

    /// `col = ?` conditions joined by `AND`.
    fn write_simple_condition(&self, context: &mut Context, out: &mut String, columns: &[&str]) {
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_identifier(out, v);
                out.push_str(" = ");
                self.write_placeholder(context, out);
            },
            " AND ",
        );
    }

    fn write_simple_select(
        &self,
        context: &mut Context,
        out: &mut String,
        table: &str,
        columns: &[&str],
        where_columns: &[&str],
        for_update: bool,
    ) {
        out.push_str("SELECT ");
        separated_by(out, columns, |out, v| self.write_identifier(out, v), ", ");
        out.push_str(" FROM ");
        self.write_identifier(out, table);
        if !where_columns.is_empty() {
            out.push_str(" WHERE ");
            self.write_simple_condition(context, out, where_columns);
        }
        if for_update {
            out.push_str(" FOR UPDATE");
        }
    }

    fn write_simple_insert(
        &self,
        context: &mut Context,
        out: &mut String,
        table: &str,
        columns: &[&str],
    ) {
        out.push_str("INSERT INTO ");
        self.write_identifier(out, table);
        out.push_str(" (");
        separated_by(out, columns, |out, v| self.write_identifier(out, v), ", ");
        out.push_str(") VALUES (");
        separated_by(
            out,
            columns,
            |out, _| self.write_placeholder(context, out),
            ", ",
        );
        out.push(')');
    }

    fn write_simple_delete(
        &self,
        context: &mut Context,
        out: &mut String,
        table: &str,
        where_columns: &[&str],
    ) {
        out.push_str("DELETE FROM ");
        self.write_identifier(out, table);
        out.push_str(" WHERE ");
        self.write_simple_condition(context, out, where_columns);
    }

    fn write_simple_update(
        &self,
        context: &mut Context,
        out: &mut String,
        table: &str,
        set_columns: &[&str],
        where_columns: &[&str],
    ) {
        out.push_str("UPDATE ");
        self.write_identifier(out, table);
        out.push_str(" SET ");
        separated_by(
            out,
            set_columns,
            |out, v| {
                self.write_identifier(out, v);
                out.push_str(" = ");
                self.write_placeholder(context, out);
            },
            ", ",
        );
        if !where_columns.is_empty() {
            out.push_str(" WHERE ");
            self.write_simple_condition(context, out, where_columns);
        }
    }
}

/// A field declared with an untyped null has no column type.
pub fn untyped_field(field: &FieldDef) -> Error {
    configuration_error(format!(
        "Field {} has no type, declare it with a typed null value",
        field.name
    ))
}

/// Fallback writer: double quoted identifiers and `?` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub fn new() -> Self {
        Self
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
