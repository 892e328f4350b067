use crate::{ValueHolder, postgres_type_to_value};
use depot_core::{Error, Prepared, Result, Value, truncate_long};
use std::{
    fmt::{self, Display},
    mem,
};
use tokio_postgres::Statement;

pub struct PostgresPrepared {
    pub(crate) statement: Statement,
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

impl PostgresPrepared {
    pub(crate) fn new(statement: Statement, sql: String) -> Self {
        Self {
            statement,
            sql,
            params: Vec::new(),
        }
    }

    /// Bound values converted to the types postgres inferred for the
    /// parameters, an `Int64` bound to an `INTEGER` column is sent as `i32`.
    pub(crate) fn take_params(&mut self) -> Result<Vec<ValueHolder>> {
        let types = self.statement.params();
        if self.params.len() != types.len() {
            return Err(Error::msg(format!(
                "The query expects {} parameters but {} were bound",
                types.len(),
                self.params.len()
            )));
        }
        mem::take(&mut self.params)
            .into_iter()
            .zip(types)
            .map(|(value, ty)| Ok(ValueHolder(value.try_as(&postgres_type_to_value(ty))?)))
            .collect()
    }
}

impl Prepared for PostgresPrepared {
    fn bind(&mut self, value: Value) -> Result<&mut Self> {
        let index = self.params.len() as u64 + 1;
        self.bind_index(value, index)
    }
    fn bind_index(&mut self, value: Value, index: u64) -> Result<&mut Self> {
        let len = self.statement.params().len();
        if self.params.is_empty() {
            self.params.resize_with(len, Default::default);
        }
        let target = (index as usize)
            .checked_sub(1)
            .and_then(|i| self.params.get_mut(i))
            .ok_or_else(|| {
                Error::msg(format!(
                    "Index {} cannot be bound, the query has {} parameters",
                    index, len
                ))
            })?;
        *target = value;
        Ok(self)
    }
    fn bound_values(&self) -> &[Value] {
        &self.params
    }
}

impl Display for PostgresPrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&truncate_long(&self.sql))
    }
}
