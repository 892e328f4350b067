mod as_value;
pub mod bind;
mod cache;
mod clause;
mod config;
mod connection;
mod driver;
mod entity;
mod error;
mod expression;
mod field;
mod key;
mod key_generator;
mod marshaller;
mod migration;
pub mod operation;
mod persistence;
mod prepared;
mod query;
mod repository;
mod types;
mod util;
mod value;
pub mod writer;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use cache::*;
pub use clause::*;
pub use config::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use error::DepotError;
pub use expression::*;
pub use field::*;
pub use key::*;
pub use key_generator::*;
pub use marshaller::{Marshaller, TableState};
pub use migration::{DataMigration, EntityMigration, MigrationConnection, SchemaMigration};
pub use operation::{
    DepotModifier, DepotQuery, FindAllQuery, FindOneQuery, InsertModifier, StatementModifier,
    StoreModifier,
};
pub use persistence::*;
pub use prepared::*;
pub use query::*;
pub use repository::*;
pub use types::*;
pub use util::*;
pub use value::*;
pub use writer::{GenericSqlWriter, SqlWriter};
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
