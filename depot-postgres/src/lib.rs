mod connection;
mod driver;
mod prepared;
mod provider;
mod sql_writer;
mod value_holder;

pub use connection::*;
pub use driver::*;
pub use prepared::*;
pub use provider::*;
pub use sql_writer::*;
pub(crate) use value_holder::*;
