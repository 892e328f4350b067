use crate::{Error, Result, Value};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::any;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamic [`Value`] used for
/// bindings and decoded rows.
///
/// `try_from_value` accepts the canonical variant of the type and, where it
/// is lossless, the representations drivers commonly hand back (every MySQL
/// integer arrives as 64 bit, text may arrive as bytes).
pub trait AsValue {
    /// The NULL of this type, also used as the field type prototype.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn conversion_error<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {:?} to {}",
        value,
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                #[allow(unreachable_patterns)]
                let wide: i64 = match value {
                    $destination(Some(v)) => return Ok(v),
                    Value::Boolean(Some(v)) => v as i64,
                    Value::Int8(Some(v)) => v as i64,
                    Value::Int16(Some(v)) => v as i64,
                    Value::Int32(Some(v)) => v as i64,
                    Value::Int64(Some(v)) => v,
                    Value::Decimal(Some(v)) if v.is_integer() => {
                        v.to_i64().ok_or_else(|| conversion_error::<Self>(&value))?
                    }
                    _ => return Err(conversion_error::<Self>(&value)),
                };
                <$source>::try_from(wide).map_err(|_| {
                    Error::msg(format!(
                        "Value {} is out of range for {}",
                        wide,
                        any::type_name::<Self>()
                    ))
                })
            }
        }
    };
}

impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);

/// The extra arms may refer to the converted value through the name given
/// before `=>`.
macro_rules! impl_as_value {
    ($value:ident => $source:ty, $destination:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self.into()))
            }
            fn try_from_value($value: Value) -> Result<Self> {
                match $value {
                    $destination(Some(v)) => Ok(v.into()),
                    $($pat_rest => $expr_rest,)*
                    #[allow(unreachable_patterns)]
                    _ => Err(conversion_error::<Self>(&$value)),
                }
            }
        }
    };
    ($source:ty, $destination:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl_as_value!(value => $source, $destination $(, $pat_rest => $expr_rest)*);
    };
}

impl_as_value!(
    bool,
    Value::Boolean,
    Value::Int8(Some(v)) => Ok(v != 0),
    Value::Int16(Some(v)) => Ok(v != 0),
    Value::Int32(Some(v)) => Ok(v != 0),
    Value::Int64(Some(v)) => Ok(v != 0),
);
impl_as_value!(
    value => f32,
    Value::Float32,
    Value::Float64(Some(v)) => Ok(v as f32),
    Value::Decimal(Some(v)) => v.to_f32().ok_or_else(|| conversion_error::<Self>(&value)),
);
impl_as_value!(
    value => f64,
    Value::Float64,
    Value::Float32(Some(v)) => Ok(v as f64),
    Value::Decimal(Some(v)) => v.to_f64().ok_or_else(|| conversion_error::<Self>(&value)),
);
impl_as_value!(
    value => Decimal,
    Value::Decimal,
    Value::Int8(Some(v)) => Ok(v.into()),
    Value::Int16(Some(v)) => Ok(v.into()),
    Value::Int32(Some(v)) => Ok(v.into()),
    Value::Int64(Some(v)) => Ok(v.into()),
    Value::Float64(Some(v)) => Decimal::from_f64(v).ok_or_else(|| conversion_error::<Self>(&value)),
    Value::Varchar(Some(ref v)) => v.parse::<Decimal>().map_err(|e| Error::new(e).context(conversion_error::<Self>(&value))),
    Value::Blob(Some(ref v)) => std::str::from_utf8(v)
        .map_err(Error::new)
        .and_then(|v| v.parse::<Decimal>().map_err(Error::new))
        .map_err(|e| e.context(conversion_error::<Self>(&value))),
);
impl_as_value!(
    String,
    Value::Varchar,
    Value::Blob(Some(v)) => String::from_utf8(v.into_vec())
        .map_err(|e| Error::new(e).context("Text column is not valid UTF-8")),
);
impl_as_value!(
    Box<[u8]>,
    Value::Blob,
    Value::Varchar(Some(v)) => Ok(v.into_bytes().into_boxed_slice()),
);
impl_as_value!(
    Vec<u8>,
    Value::Blob,
    Value::Varchar(Some(v)) => Ok(v.into_bytes()),
);
impl_as_value!(
    Date,
    Value::Date,
    Value::Timestamp(Some(v)) => Ok(v.date()),
);
impl_as_value!(
    Time,
    Value::Time,
    Value::Timestamp(Some(v)) => Ok(v.time()),
);
impl_as_value!(
    PrimitiveDateTime,
    Value::Timestamp,
    Value::Date(Some(v)) => Ok(v.midnight()),
);
impl_as_value!(
    value => Uuid,
    Value::Uuid,
    Value::Varchar(Some(ref v)) => Uuid::parse_str(v).map_err(|e| Error::new(e).context(conversion_error::<Self>(&value))),
    // Raw 16 bytes, or the textual form stored in a CHAR(36)
    Value::Blob(Some(ref v)) => match v.len() {
        16 => Uuid::from_slice(v).map_err(Error::new),
        _ => std::str::from_utf8(v)
            .map_err(Error::new)
            .and_then(|v| Uuid::parse_str(v).map_err(Error::new)),
    }
    .map_err(|e| e.context(conversion_error::<Self>(&value))),
);

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
}

/// An enum persisted as a small integer code.
///
/// Codes must be stable across releases: they are what the database stores.
/// Use [`impl_byte_enum!`](crate::impl_byte_enum) to make the enum usable as
/// a field value.
pub trait ByteEnum: Sized {
    fn code(&self) -> i8;
    fn from_code(code: i8) -> Option<Self>;
}

/// Implements [`AsValue`] for a [`ByteEnum`], stored as `Value::Int8`.
#[macro_export]
macro_rules! impl_byte_enum {
    ($enum:ty) => {
        impl $crate::AsValue for $enum {
            fn as_empty_value() -> $crate::Value {
                $crate::Value::Int8(None)
            }
            fn as_value(self) -> $crate::Value {
                $crate::Value::Int8(Some($crate::ByteEnum::code(&self)))
            }
            fn try_from_value(value: $crate::Value) -> $crate::Result<Self> {
                let code = <i8 as $crate::AsValue>::try_from_value(value)?;
                <$enum as $crate::ByteEnum>::from_code(code).ok_or_else(|| {
                    $crate::Error::msg(format!(
                        "Invalid code {} for byte enum {}",
                        code,
                        ::std::any::type_name::<$enum>()
                    ))
                })
            }
        }
    };
}
