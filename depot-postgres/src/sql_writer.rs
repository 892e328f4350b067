use depot_core::{
    DepotError, EntityDef, Error, FieldDef, FullTextIndex, FullTextMatch, Result, SqlWriter,
    TableMeta, Value, separated_by,
    writer::{Context, untyped_field},
};
use std::fmt::Write;

/// Text search configuration used for both indexing and matching.
const TEXT_SEARCH_CONFIG: &str = "pg_catalog.english";
const FULL_TEXT_COLUMN_PREFIX: &str = "ftsCol_";

/// PostgreSQL dialect: `$n` placeholders and full text search through a
/// private `tsvector` column kept current by a trigger.
#[derive(Default)]
pub struct PostgresSqlWriter {}

impl PostgresSqlWriter {
    fn full_text_column(name: &str) -> String {
        format!("{}{}", FULL_TEXT_COLUMN_PREFIX, name)
    }

    fn write_string_literal(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }
}

impl SqlWriter for PostgresSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        let _ = write!(out, "${}", context.counter);
    }

    fn write_column_type(&self, out: &mut String, field: &FieldDef) -> Result<()> {
        match field.value {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::Int8(..) => out.push_str("SMALLINT"),
            Value::Int16(..) => out.push_str("SMALLINT"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float32(..) => out.push_str("REAL"),
            Value::Float64(..) => out.push_str("DOUBLE PRECISION"),
            Value::Decimal(..) => out.push_str("NUMERIC"),
            Value::Varchar(..) => self.write_varchar_type(out, field.length),
            Value::Blob(..) => out.push_str("BYTEA"),
            Value::Date(..) => out.push_str("DATE"),
            Value::Time(..) => out.push_str("TIME"),
            Value::Timestamp(..) => out.push_str("TIMESTAMP"),
            Value::Uuid(..) => out.push_str("UUID"),
            Value::Null => return Err(untyped_field(field)),
        }
        Ok(())
    }

    fn write_full_text_match<'a>(
        &self,
        context: &mut Context<'a>,
        out: &mut String,
        value: &'a FullTextMatch,
    ) -> Result<()> {
        let index = value.entity.full_text_index(value.index)?;
        self.write_column(
            context,
            out,
            value.entity,
            &Self::full_text_column(index.name),
        )?;
        out.push_str(" @@ TO_TSQUERY(");
        self.write_string_literal(out, TEXT_SEARCH_CONFIG);
        out.push_str(", ");
        self.write_placeholder(context, out);
        out.push(')');
        Ok(())
    }

    /// Add the `tsvector` column, fill it, index it and install the trigger
    /// maintaining it.
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
        let table = entity.table;
        let column = Self::full_text_column(index.name);
        let mut result = Vec::with_capacity(4);

        let mut out = String::with_capacity(64);
        self.write_add_column(&mut out, table, &column, "TSVECTOR");
        result.push(out);

        let mut out = String::with_capacity(128);
        out.push_str("UPDATE ");
        self.write_identifier(&mut out, table);
        out.push_str(" SET ");
        self.write_identifier(&mut out, &column);
        out.push_str(" = TO_TSVECTOR(");
        self.write_string_literal(&mut out, TEXT_SEARCH_CONFIG);
        out.push_str(", ");
        separated_by(
            &mut out,
            &columns,
            |out, v| {
                out.push_str("COALESCE(");
                self.write_identifier(out, v);
                out.push_str(", '')");
            },
            " || ' ' || ",
        );
        out.push(')');
        result.push(out);

        let mut out = String::with_capacity(64);
        out.push_str("CREATE INDEX ");
        self.write_identifier(&mut out, &format!("ftsIx_{}", index.name));
        out.push_str(" ON ");
        self.write_identifier(&mut out, table);
        out.push_str(" USING GIST(");
        self.write_identifier(&mut out, &column);
        out.push(')');
        result.push(out);

        let mut out = String::with_capacity(128);
        out.push_str("CREATE TRIGGER ");
        self.write_identifier(&mut out, &format!("ftsTrig_{}", index.name));
        out.push_str(" BEFORE UPDATE OR INSERT ON ");
        self.write_identifier(&mut out, table);
        out.push_str(" FOR EACH ROW EXECUTE PROCEDURE tsvector_update_trigger(");
        self.write_identifier(&mut out, &column);
        out.push_str(", ");
        self.write_string_literal(&mut out, TEXT_SEARCH_CONFIG);
        for v in &columns {
            out.push_str(", ");
            self.write_identifier(&mut out, v);
        }
        out.push(')');
        result.push(out);
        Ok(result)
    }

    fn has_full_text_index(&self, meta: &TableMeta, index: &FullTextIndex) -> bool {
        meta.has_column(&Self::full_text_column(index.name))
    }

    fn is_private_column(&self, column: &str) -> bool {
        column.starts_with(FULL_TEXT_COLUMN_PREFIX)
    }

    /// `SERIAL` columns draw from the `<table>_<column>_seq` sequence.
    fn write_last_insert_id(&self, out: &mut String, table: &str, column: &str) {
        let mut sequence = String::with_capacity(table.len() + column.len() + 8);
        self.write_identifier(&mut sequence, &format!("{}_{}_seq", table, column));
        out.push_str("SELECT currval(");
        self.write_string_literal(out, &sequence);
        out.push(')');
    }
}
