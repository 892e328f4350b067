use crate::ValueWrap;
use depot_core::{Error, Prepared, Result, Value, truncate_long};
use mysql_async::Statement;
use std::{
    fmt::{self, Display},
    mem,
};

#[derive(Debug)]
pub struct MySQLPrepared {
    pub(crate) statement: Statement,
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

impl MySQLPrepared {
    pub(crate) fn new(statement: Statement, sql: String) -> Self {
        Self {
            statement,
            sql,
            params: Vec::new(),
        }
    }
    pub(crate) fn take_params(&mut self) -> Result<mysql_async::Params> {
        if self.params.is_empty() {
            return Ok(mysql_async::Params::Empty);
        }
        Ok(mysql_async::Params::Positional(
            mem::take(&mut self.params)
                .into_iter()
                .map(|v| ValueWrap(v).try_into())
                .collect::<Result<_>>()?,
        ))
    }
}

impl Prepared for MySQLPrepared {
    fn bind(&mut self, value: Value) -> Result<&mut Self> {
        let index = self.params.len() as u64 + 1;
        self.bind_index(value, index)
    }
    fn bind_index(&mut self, value: Value, index: u64) -> Result<&mut Self> {
        let len = self.statement.num_params() as usize;
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

impl Display for MySQLPrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&truncate_long(&self.sql))
    }
}
