use crate::{Result, Value};
use std::fmt::Display;

/// A driver prepared statement accepting positional parameters.
///
/// * `bind` appends a value after the last one bound.
/// * `bind_index` sets the parameter at `index`, starting from 1.
///
/// Methods return `&mut Self` for chaining:
/// ```rust,ignore
/// prepared.bind(42.into())?.bind("hello".into())?;
/// ```
pub trait Prepared: Send + Sync + Display {
    fn bind(&mut self, value: Value) -> Result<&mut Self>;
    fn bind_index(&mut self, value: Value, index: u64) -> Result<&mut Self>;
    /// Values bound so far, in positional order.
    fn bound_values(&self) -> &[Value];
}
