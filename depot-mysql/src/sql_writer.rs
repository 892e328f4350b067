use depot_core::{
    DeleteClause, DepotError, EntityDef, Error, FieldDef, FullTextIndex, FullTextMatch, Result,
    SqlWriter, TableMeta, Value,
    writer::{Context, Fragment, untyped_field},
    separated_by, try_separated_by,
};
use std::{fmt::Write, mem};

/// MySQL dialect: backtick identifiers, no alias on `DELETE`, columns
/// changed with `CHANGE` and full text through `MATCH ... AGAINST`.
#[derive(Default)]
pub struct MySQLSqlWriter {}

impl MySQLSqlWriter {
    fn full_text_index_name(index: &FullTextIndex) -> String {
        format!("ftsIx_{}", index.name)
    }
}

impl SqlWriter for MySQLSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(out, value, '`', "``");
        out.push('`');
    }

    fn write_column_type(&self, out: &mut String, field: &FieldDef) -> Result<()> {
        match field.value {
            Value::Boolean(..) => out.push_str("TINYINT"),
            Value::Int8(..) => out.push_str("TINYINT"),
            Value::Int16(..) => out.push_str("SMALLINT"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float32(..) => out.push_str("FLOAT"),
            Value::Float64(..) => out.push_str("DOUBLE"),
            Value::Decimal(..) => out.push_str("DECIMAL(28,10)"),
            Value::Varchar(..) => self.write_varchar_type(out, field.length),
            Value::Blob(..) => match field.length {
                v if v < (1 << 15) => {
                    let _ = write!(out, "VARBINARY({})", v);
                }
                v if v < (1 << 16) => out.push_str("BLOB"),
                v if v < (1 << 24) => out.push_str("MEDIUMBLOB"),
                _ => out.push_str("LONGBLOB"),
            },
            Value::Date(..) => out.push_str("DATE"),
            Value::Time(..) => out.push_str("TIME"),
            Value::Timestamp(..) => out.push_str("DATETIME"),
            Value::Uuid(..) => out.push_str("CHAR(36)"),
            Value::Null => return Err(untyped_field(field)),
        }
        Ok(())
    }

    fn column_default(&self, field: &FieldDef) -> Option<&'static str> {
        match (field.default, &field.value) {
            (None, Value::Boolean(..)) if !field.nullable => Some("0"),
            (default, _) => default,
        }
    }

    fn write_full_text_match<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a FullTextMatch,
    ) -> Result<()> {
        let entity = value.entity;
        let index = entity.full_text_index(value.index)?;
        out.push_str("MATCH(");
        try_separated_by(
            out,
            index.fields,
            |out, field| {
                let column = entity.field(field)?.column;
                self.write_column(context, out, entity, column)
            },
            ", ",
        )?;
        out.push_str(") AGAINST (");
        self.write_placeholder(context, out);
        out.push_str(" IN BOOLEAN MODE)");
        Ok(())
    }

    /// MySQL rejects `DELETE FROM t AS T1`, columns are qualified by the
    /// table name instead.
    fn write_delete<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a DeleteClause,
    ) -> Result<()> {
        let mut context = context.switch_fragment(Fragment::SqlDeleteFrom);
        out.push_str("DELETE FROM ");
        self.write_table_name(out, value.entity);
        context.fragment = Fragment::SqlDeleteFromWhere;
        let saved = mem::replace(&mut context.use_abbreviations, false);
        let result = self.write_where(&mut context, out, &value.where_clause);
        context.use_abbreviations = saved;
        result
    }

    fn write_rename_column(
        &self,
        out: &mut String,
        table: &str,
        old_column: &str,
        new_column: &str,
        definition: &str,
    ) {
        self.write_alter_table(out, table);
        out.push_str(" CHANGE ");
        self.write_identifier(out, old_column);
        out.push(' ');
        self.write_identifier(out, new_column);
        out.push(' ');
        out.push_str(definition);
    }

    fn change_column_statements(
        &self,
        table: &str,
        field: &FieldDef,
        default: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut out = String::with_capacity(64);
        let definition = self.column_definition(field, default)?;
        self.write_rename_column(&mut out, table, field.column, field.column, &definition);
        Ok(vec![out])
    }

    fn write_drop_primary_key(&self, out: &mut String, table: &str) {
        self.write_alter_table(out, table);
        out.push_str(" DROP PRIMARY KEY");
    }

    fn full_text_index_statements(
        &self,
        entity: &'static EntityDef,
        index: &FullTextIndex,
    ) -> Result<Vec<String>> {
        let columns = index
            .fields
            .iter()
            .map(|f| entity.field(f).map(|f| f.column))
            .collect::<Result<Vec<_>>>()?;
        if columns.is_empty() {
            return Err(Error::new(DepotError::Configuration(format!(
                "Full text index {} of {} has no fields",
                index.name, entity.name
            ))));
        }
        let mut out = String::with_capacity(64);
        self.write_alter_table(&mut out, entity.table);
        out.push_str(" ADD FULLTEXT INDEX ");
        self.write_identifier(&mut out, &Self::full_text_index_name(index));
        out.push_str(" (");
        separated_by(&mut out, &columns, |out, v| self.write_identifier(out, v), ", ");
        out.push(')');
        Ok(vec![out])
    }

    fn has_full_text_index(&self, meta: &TableMeta, index: &FullTextIndex) -> bool {
        meta.has_index(&Self::full_text_index_name(index))
    }
}
