use crate::{EntityDef, Value};

/// How the value of a primary key field is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Database auto increment, known only after the row is inserted.
    Identity,
    /// Allocated from a sequence table before the row is inserted.
    Table(TableGenerator),
}

/// Sequence table backing a [`Generation::Table`] key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableGenerator {
    pub table: &'static str,
    pub pk_column: &'static str,
    pub pk_value: &'static str,
    pub value_column: &'static str,
    pub allocation_size: i64,
}

impl TableGenerator {
    pub const fn new() -> Self {
        Self {
            table: "IdSequences",
            pk_column: "sequence",
            pk_value: "default",
            value_column: "value",
            allocation_size: 1,
        }
    }
    pub const fn table(mut self, table: &'static str) -> Self {
        self.table = table;
        self
    }
    /// The sequence row name, one row per generator sharing a table.
    pub const fn sequence(mut self, pk_value: &'static str) -> Self {
        self.pk_value = pk_value;
        self
    }
    pub const fn columns(mut self, pk_column: &'static str, value_column: &'static str) -> Self {
        self.pk_column = pk_column;
        self.value_column = value_column;
        self
    }
    pub const fn allocation_size(mut self, allocation_size: i64) -> Self {
        self.allocation_size = allocation_size;
        self
    }
    /// Value stored in a freshly created sequence row.
    pub const fn initial_value(&self) -> i64 {
        if self.allocation_size > 0 {
            self.allocation_size
        } else {
            1
        }
    }
}

impl Default for TableGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks a field or a whole entity as not backed by a plain table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Computed {
    /// A non required field without definition is left out of selects.
    pub required: bool,
    /// Literal SQL inlined in the select list.
    pub definition: Option<&'static str>,
    /// Read the column from this entity's table instead.
    pub shadow_of: Option<&'static EntityDef>,
}

impl Computed {
    pub const fn new() -> Self {
        Self {
            required: true,
            definition: None,
            shadow_of: None,
        }
    }
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
    pub const fn definition(mut self, definition: &'static str) -> Self {
        self.definition = Some(definition);
        self
    }
    pub const fn shadow_of(mut self, entity: &'static EntityDef) -> Self {
        self.shadow_of = Some(entity);
        self
    }
}

impl Default for Computed {
    fn default() -> Self {
        Self::new()
    }
}

/// Static description of one persistent field.
///
/// Built with const methods so entities can declare their descriptors in a
/// `static`:
/// ```rust,ignore
/// FieldDef::new("name", Value::Varchar(None)).length(64).unique()
/// ```
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
    /// Type prototype, a null of the field type.
    pub value: Value,
    pub length: u32,
    pub nullable: bool,
    pub unique: bool,
    /// Literal SQL default.
    pub default: Option<&'static str>,
    pub primary_key: bool,
    pub generation: Option<Generation>,
    pub computed: Option<Computed>,
    /// Replaces the dialect type mapping.
    pub column_type: Option<&'static str>,
}

impl FieldDef {
    pub const fn new(name: &'static str, value: Value) -> Self {
        Self {
            name,
            column: name,
            value,
            length: 255,
            nullable: false,
            unique: false,
            default: None,
            primary_key: false,
            generation: None,
            computed: None,
            column_type: None,
        }
    }
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = column;
        self
    }
    pub const fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
    pub const fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
    pub const fn generated(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }
    pub const fn computed(mut self, computed: Computed) -> Self {
        self.computed = Some(computed);
        self
    }
    pub const fn column_type(mut self, column_type: &'static str) -> Self {
        self.column_type = Some(column_type);
        self
    }

    /// Whether the field maps to a real column of the table.
    pub fn is_column(&self) -> bool {
        self.computed.is_none()
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.generation, Some(Generation::Identity))
    }

    /// Whether a value counts as "not yet assigned" for this field.
    ///
    /// Nulls are never assigned, the integer zero is unassigned only for
    /// generated fields.
    pub fn is_unset(&self, value: &Value) -> bool {
        value.is_null() || (self.generation.is_some() && value.is_zero_integer())
    }
}
