mod accounts;
mod connection;
mod database;
mod driver;
mod entities;
mod memberships;
mod players;
mod prepared;

pub use accounts::accounts;
pub use connection::*;
pub use database::*;
pub use driver::*;
pub use entities::*;
pub use memberships::memberships;
pub use players::players;
pub use prepared::*;

use depot_core::{ConnectionProvider, DepotRepository};
use log::LevelFilter;
use std::env;

#[doc(hidden)]
pub use depot_core as __depot;
#[doc(hidden)]
pub use log as __log;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run the scenarios shared by every driver.
pub async fn execute_tests<P: ConnectionProvider>(repository: &DepotRepository<P>) {
    accounts(repository).await;
    players(repository).await;
    memberships(repository).await;
}

/// Implements `Entity` for a struct whose field names match the field
/// descriptors of `$def`.
///
/// ```rust,ignore
/// impl_entity!(Account, ACCOUNT, { id, name, email, balance });
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($entity:ty, $def:expr, { $($field:ident),+ $(,)? }) => {
        impl $crate::__depot::Entity for $entity {
            fn entity_def() -> &'static $crate::__depot::EntityDef {
                &$def
            }

            fn get_field(&self, field: &str) -> $crate::__depot::Result<$crate::__depot::Value> {
                match field {
                    $(stringify!($field) => {
                        Ok($crate::__depot::AsValue::as_value(self.$field.clone()))
                    })+
                    _ => Err($crate::__depot::Error::msg(format!(
                        "Unknown field {} of {}",
                        field,
                        stringify!($entity)
                    ))),
                }
            }

            fn set_field(
                &mut self,
                field: &str,
                value: $crate::__depot::Value,
            ) -> $crate::__depot::Result<()> {
                match field {
                    $(stringify!($field) => {
                        self.$field = $crate::__depot::AsValue::try_from_value(value)?;
                    })+
                    _ => {
                        return Err($crate::__depot::Error::msg(format!(
                            "Unknown field {} of {}",
                            field,
                            stringify!($entity)
                        )));
                    }
                }
                Ok(())
            }
        }
    };
}

/// Run the code with logging turned off, yielding its value.
#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = $crate::__log::max_level();
        $crate::__log::set_max_level($crate::__log::LevelFilter::Off);
        let result = { $($code)+ };
        $crate::__log::set_max_level(level);
        result
    }};
}
