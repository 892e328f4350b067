use crate::{
    Definition, EntityDef, Expression, FieldDef, Result, Statement, error::configuration_error,
};

/// The entities a statement brings into scope.
///
/// The position of an entity gives its table abbreviation: the main entity
/// of the statement is `T1`, the others follow in order of appearance.
#[derive(Debug, Clone)]
pub struct DepotTypes {
    entities: Vec<&'static EntityDef>,
    max_in_values: usize,
}

impl DepotTypes {
    pub fn new(statement: &Statement, max_in_values: usize) -> Self {
        Self {
            entities: statement.entities(),
            max_in_values,
        }
    }

    /// Types for statements that do not reference any entity.
    pub fn trivial() -> Self {
        Self {
            entities: Vec::new(),
            max_in_values: usize::MAX,
        }
    }

    pub fn entities(&self) -> &[&'static EntityDef] {
        &self.entities
    }

    pub fn max_in_values(&self) -> usize {
        self.max_in_values
    }

    pub fn abbreviation(&self, entity: &EntityDef) -> Result<String> {
        self.entities
            .iter()
            .position(|e| *e == entity)
            .map(|i| format!("T{}", i + 1))
            .ok_or_else(|| {
                configuration_error(format!("Unknown persistent record: {}", entity.name))
            })
    }

    /// Fail when an `IN` list is longer than allowed.
    pub fn check_in_size(&self, len: usize) -> Result<()> {
        if len > self.max_in_values {
            return Err(configuration_error(format!(
                "Can't create an IN condition with more than {} values (got {})",
                self.max_in_values, len
            )));
        }
        Ok(())
    }
}

/// Where the value of a field comes from in the current scope.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource<'a> {
    /// A field override or a field definition.
    Definition(&'a Expression),
    /// Literal SQL of a computed field.
    Literal(&'static str),
    /// A non required computed field, not selected at all.
    Omitted,
    Column {
        table: &'static EntityDef,
        field: &'static FieldDef,
    },
}

/// State shared by the build and the bind pass while they walk a statement.
///
/// Both passes must take the same decisions for the placeholders to line up
/// with the values, so the decisions live here.
#[derive(Debug, Default)]
pub struct Scope<'a> {
    definitions: Vec<(&'static EntityDef, &'a [Definition])>,
    /// Whether field overrides replace concrete columns.
    pub enable_overrides: bool,
}

impl<'a> Scope<'a> {
    pub fn push(&mut self, entity: &'static EntityDef, definitions: &'a [Definition]) -> Result<()> {
        if self.definitions.iter().any(|(e, _)| *e == entity) {
            return Err(configuration_error(format!(
                "Can't nest selects on the same persistent record: {}",
                entity.name
            )));
        }
        self.definitions.push((entity, definitions));
        Ok(())
    }

    pub fn pop(&mut self) {
        self.definitions.pop();
    }

    pub fn resolve(&self, entity: &'static EntityDef, field: &str) -> Result<FieldSource<'a>> {
        let fm = entity.field(field)?;
        let definition = self
            .definitions
            .iter()
            .find(|(e, _)| *e == entity)
            .and_then(|(_, defs)| defs.iter().find(|d| d.field == field));
        if let Some(definition) = definition {
            let computed = fm.computed.is_some() || entity.computed.is_some();
            let use_definition = if definition.is_override {
                if computed {
                    return Err(configuration_error(format!(
                        "FieldOverride cannot be used on computed field: {}",
                        field
                    )));
                }
                self.enable_overrides
            } else if !computed {
                return Err(configuration_error(format!(
                    "FieldDefinition must not be used on concrete field: {}",
                    field
                )));
            } else {
                true
            };
            if use_definition {
                return Ok(FieldSource::Definition(&definition.expression));
            }
        }
        let mut table = match entity.computed {
            None => Some(entity),
            Some(computed) => computed.shadow_of,
        };
        if let Some(computed) = fm.computed {
            if let Some(definition) = computed.definition {
                return Ok(FieldSource::Literal(definition));
            }
            if !computed.required {
                return Ok(FieldSource::Omitted);
            }
            if let Some(shadow) = computed.shadow_of {
                table = Some(shadow);
            }
        }
        match table {
            Some(table) => Ok(FieldSource::Column { table, field: fm }),
            None => Err(configuration_error(format!(
                "Persistent field has no definition [record={}, field={}]",
                entity.name, field
            ))),
        }
    }
}
