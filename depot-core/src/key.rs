use crate::{EntityDef, FieldDef, Result, Value, error::configuration_error};
use std::{
    borrow::Cow,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

/// Identifies a cached entry: a namespace plus a structural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub cache_id: Cow<'static, str>,
    pub key: Box<[Value]>,
}

impl CacheKey {
    pub fn new(cache_id: impl Into<Cow<'static, str>>, key: impl Into<Box<[Value]>>) -> Self {
        Self {
            cache_id: cache_id.into(),
            key: key.into(),
        }
    }

    /// Key for a parameterless query cached under a hand picked namespace.
    pub fn simple(cache_id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(cache_id, [Value::Boolean(Some(true))])
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[cacheId={}, key=(", self.cache_id)?;
        for (i, v) in self.key.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", v)?;
        }
        f.write_str(")]")
    }
}

/// The primary key of one row.
///
/// Values are stored in the order the entity declares its key fields and
/// already converted to the field types, so two keys naming the same row
/// compare equal regardless of how they were built.
#[derive(Debug, Clone)]
pub struct Key {
    entity: &'static EntityDef,
    values: Box<[Value]>,
}

impl Key {
    /// Build a key from `(field, value)` pairs.
    ///
    /// Fails unless the fields are exactly the declared key fields.
    pub fn new<N, V>(entity: &'static EntityDef, pairs: impl IntoIterator<Item = (N, V)>) -> Result<Self>
    where
        N: AsRef<str>,
        V: Into<Value>,
    {
        let key_fields: Vec<&'static FieldDef> = entity.primary_key_fields().collect();
        if key_fields.is_empty() {
            return Err(configuration_error(format!(
                "Persistent record {} does not declare a primary key",
                entity.name
            )));
        }
        let mut values: Vec<Option<Value>> = vec![None; key_fields.len()];
        for (name, value) in pairs {
            let name = name.as_ref();
            let Some(i) = key_fields.iter().position(|f| f.name == name) else {
                return Err(configuration_error(format!(
                    "Field {} is not a key field of {}",
                    name, entity.name
                )));
            };
            if values[i].is_some() {
                return Err(configuration_error(format!(
                    "Key field {} of {} given more than once",
                    name, entity.name
                )));
            }
            values[i] = Some(value.into().try_as(&key_fields[i].value)?);
        }
        let values = values
            .into_iter()
            .zip(&key_fields)
            .map(|(v, f)| {
                v.ok_or_else(|| {
                    configuration_error(format!(
                        "Key for {} is missing key field {}",
                        entity.name, f.name
                    ))
                })
            })
            .collect::<Result<Box<[Value]>>>()?;
        Ok(Self { entity, values })
    }

    /// Key of an entity whose primary key is a single field.
    pub fn simple(entity: &'static EntityDef, value: impl Into<Value>) -> Result<Self> {
        let mut fields = entity.primary_key_fields();
        match (fields.next(), fields.next()) {
            (Some(field), None) => Self::new(entity, [(field.name, value.into())]),
            _ => Err(configuration_error(format!(
                "Persistent record {} does not have a single field primary key",
                entity.name
            ))),
        }
    }

    pub fn entity(&self) -> &'static EntityDef {
        self.entity
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static FieldDef, &Value)> {
        self.entity.primary_key_fields().zip(self.values.iter())
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.entity.name, self.values.clone())
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && self.values == other.values
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
        self.values.hash(state);
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.entity.name)?;
        for (i, (field, value)) in self.fields().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", field.name, value)?;
        }
        f.write_str(")")
    }
}

/// Matches rows by some single valued fields plus one field taking any of
/// several values.
#[derive(Debug, Clone)]
pub struct MultiKey {
    entity: &'static EntityDef,
    singles: Vec<(&'static FieldDef, Value)>,
    multi_field: &'static FieldDef,
    multi_values: Vec<Value>,
}

impl MultiKey {
    pub fn new<N, V, M>(
        entity: &'static EntityDef,
        singles: impl IntoIterator<Item = (N, V)>,
        multi_field: &str,
        multi_values: impl IntoIterator<Item = M>,
    ) -> Result<Self>
    where
        N: AsRef<str>,
        V: Into<Value>,
        M: Into<Value>,
    {
        let singles = singles
            .into_iter()
            .map(|(n, v)| {
                let field = entity.field(n.as_ref())?;
                Ok((field, v.into().try_as(&field.value)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let multi_field = entity.field(multi_field)?;
        let multi_values = multi_values
            .into_iter()
            .map(|v| v.into().try_as(&multi_field.value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            entity,
            singles,
            multi_field,
            multi_values,
        })
    }

    pub fn entity(&self) -> &'static EntityDef {
        self.entity
    }

    pub fn singles(&self) -> &[(&'static FieldDef, Value)] {
        &self.singles
    }

    pub fn multi_field(&self) -> &'static FieldDef {
        self.multi_field
    }

    pub fn multi_values(&self) -> &[Value] {
        &self.multi_values
    }

    /// The keys of every row this matches, when its fields are exactly the
    /// primary key.
    pub fn keys(&self) -> Option<Vec<Key>> {
        let pk_count = self.entity.primary_key_fields().count();
        if pk_count != self.singles.len() + 1 {
            return None;
        }
        self.multi_values
            .iter()
            .map(|v| {
                Key::new(
                    self.entity,
                    self.singles
                        .iter()
                        .map(|(f, v)| (f.name, v.clone()))
                        .chain([(self.multi_field.name, v.clone())]),
                )
                .ok()
            })
            .collect()
    }
}

/// A set of keys of the same entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    entity: &'static EntityDef,
    keys: Vec<Key>,
}

impl KeySet {
    pub fn new(entity: &'static EntityDef, keys: impl IntoIterator<Item = Key>) -> Result<Self> {
        let keys: Vec<Key> = keys.into_iter().collect();
        if let Some(key) = keys.iter().find(|k| k.entity != entity) {
            return Err(configuration_error(format!(
                "Key {} does not belong to {}",
                key, entity.name
            )));
        }
        Ok(Self { entity, keys })
    }

    pub fn entity(&self) -> &'static EntityDef {
        self.entity
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}
