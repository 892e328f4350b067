use crate::{
    Computed, Error, Expression, FieldDef, Generation, Key, Result, RowLabeled, Value,
    error::configuration_error,
};
use std::{
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    mem,
};

/// A named full text index over one or more text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullTextIndex {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

/// A secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub unique: bool,
}

/// Static description of a persistent record type.
///
/// Equality and hashing use the type name, which is also the cache namespace.
pub struct EntityDef {
    pub name: &'static str,
    /// Backing table, ignored for computed entities.
    pub table: &'static str,
    pub fields: &'static [FieldDef],
    /// Schema version, a negative value disables migrations for the entity.
    pub version: i32,
    pub computed: Option<Computed>,
    pub full_text_indexes: &'static [FullTextIndex],
    pub indexes: &'static [IndexDef],
}

impl EntityDef {
    pub const fn new(name: &'static str, fields: &'static [FieldDef]) -> Self {
        Self {
            name,
            table: name,
            fields,
            version: 1,
            computed: None,
            full_text_indexes: &[],
            indexes: &[],
        }
    }
    pub const fn table(mut self, table: &'static str) -> Self {
        self.table = table;
        self
    }
    pub const fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }
    pub const fn computed(mut self, computed: Computed) -> Self {
        self.computed = Some(computed);
        self
    }
    pub const fn full_text_indexes(mut self, indexes: &'static [FullTextIndex]) -> Self {
        self.full_text_indexes = indexes;
        self
    }
    pub const fn indexes(mut self, indexes: &'static [IndexDef]) -> Self {
        self.indexes = indexes;
        self
    }

    /// Whether the entity is stored in a table of its own.
    pub fn has_table(&self) -> bool {
        self.computed.is_none()
    }

    pub fn find_field(&'static self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field(&'static self, name: &str) -> Result<&'static FieldDef> {
        self.find_field(name).ok_or_else(|| {
            configuration_error(format!(
                "Unknown field on persistent record [record={}, field={}]",
                self.name, name
            ))
        })
    }

    /// Fields stored in table columns, in declaration order.
    pub fn column_fields(&'static self) -> impl Iterator<Item = &'static FieldDef> + Clone {
        self.fields.iter().filter(|f| f.is_column())
    }

    pub fn primary_key_fields(&'static self) -> impl Iterator<Item = &'static FieldDef> + Clone {
        self.fields.iter().filter(|f| f.primary_key)
    }

    pub fn has_primary_key(&'static self) -> bool {
        self.primary_key_fields().next().is_some()
    }

    /// The field whose value is generated on insert, if any.
    pub fn generated_field(&'static self) -> Option<(&'static FieldDef, Generation)> {
        self.fields
            .iter()
            .find_map(|f| f.generation.map(|g| (f, g)))
    }

    pub fn full_text_index(&'static self, name: &str) -> Result<&'static FullTextIndex> {
        self.full_text_indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| {
                configuration_error(format!(
                    "Persistent record {} has no full text index named {}",
                    self.name, name
                ))
            })
    }

    /// Column expression for one of the entity fields.
    pub fn col(&'static self, field: &'static str) -> Expression {
        Expression::column(self, field)
    }
}

impl PartialEq for EntityDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityDef {}

impl Hash for EntityDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Debug for EntityDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDef")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// A persistent record.
///
/// Implementors describe themselves through a static [`EntityDef`] and give
/// dynamic access to their fields by name.
pub trait Entity: Default + Clone + Send + Sync + 'static {
    fn entity_def() -> &'static EntityDef;

    fn get_field(&self, field: &str) -> Result<Value>;

    fn set_field(&mut self, field: &str, value: Value) -> Result<()>;

    /// Decode a row produced by a select over all the entity fields.
    fn from_row(row: RowLabeled) -> Result<Self> {
        let def = Self::entity_def();
        let RowLabeled { labels, mut values } = row;
        let mut result = Self::default();
        for field in def.fields {
            let position = labels
                .iter()
                .position(|l| l == field.column)
                .or_else(|| labels.iter().position(|l| l == field.name));
            match position {
                Some(i) => {
                    let value = mem::take(&mut values[i]).try_as(&field.value)?;
                    result.set_field(field.name, value)?;
                }
                None if field.computed.is_some_and(|c| !c.required) => {}
                None => {
                    return Err(Error::msg(format!(
                        "ResultSet missing field: {} of {}",
                        field.name, def.name
                    )));
                }
            }
        }
        Ok(result)
    }

    /// The values of every column field, in declaration order.
    fn column_values(&self) -> Result<Vec<(&'static FieldDef, Value)>> {
        Self::entity_def()
            .column_fields()
            .map(|f| Ok((f, self.get_field(f.name)?)))
            .collect()
    }

    /// The key of this record, `None` when a key field holds no value yet.
    fn primary_key(&self) -> Result<Option<Key>> {
        let def = Self::entity_def();
        let mut values = Vec::new();
        for field in def.primary_key_fields() {
            let value = self.get_field(field.name)?;
            if value.is_null() {
                return Ok(None);
            }
            values.push((field.name, value));
        }
        Key::new(def, values).map(Some)
    }
}
