use depot_core::{Error, Prepared, Result, Value, truncate_long};
use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
pub struct MockPrepared {
    pub(crate) sql: String,
    pub(crate) values: Vec<Value>,
}

impl MockPrepared {
    pub(crate) fn new(sql: String) -> Self {
        Self {
            sql,
            values: Vec::new(),
        }
    }
}

impl Prepared for MockPrepared {
    fn bind(&mut self, value: Value) -> Result<&mut Self> {
        let index = self.values.len() as u64 + 1;
        self.bind_index(value, index)
    }

    fn bind_index(&mut self, value: Value, index: u64) -> Result<&mut Self> {
        if index == 0 {
            return Err(Error::msg("Parameter indexes start from 1"));
        }
        let index = index as usize - 1;
        if index >= self.values.len() {
            self.values.resize(index + 1, Value::Null);
        }
        self.values[index] = value;
        Ok(self)
    }

    fn bound_values(&self) -> &[Value] {
        &self.values
    }
}

impl Display for MockPrepared {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&truncate_long(&self.sql))
    }
}
