use depot_core::{Error, Value};
use mysql_async::{FromValueError, prelude::FromValue};
use time::{Date, Month, PrimitiveDateTime, Time};

pub(crate) struct ValueWrap(pub(crate) Value);

impl From<Value> for ValueWrap {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
impl From<ValueWrap> for Value {
    fn from(value: ValueWrap) -> Self {
        value.0
    }
}

impl FromValue for ValueWrap {
    type Intermediate = ValueWrap;
}

impl TryFrom<mysql_async::Value> for ValueWrap {
    type Error = FromValueError;
    fn try_from(value: mysql_async::Value) -> Result<Self, Self::Error> {
        type MySQLValue = mysql_async::Value;
        Ok(match value {
            MySQLValue::NULL => Value::Null,
            MySQLValue::Bytes(v) => Value::Blob(Some(v.into())),
            MySQLValue::Int(v) => Value::Int64(Some(v)),
            MySQLValue::UInt(v) => match i64::try_from(v) {
                Ok(v) => Value::Int64(Some(v)),
                Err(..) => return Err(FromValueError(value)),
            },
            MySQLValue::Float(v) => Value::Float32(Some(v)),
            MySQLValue::Double(v) => Value::Float64(Some(v)),
            MySQLValue::Date(year, month, day, hour, minute, second, microsecond) => {
                let date = Month::try_from(month)
                    .ok()
                    .and_then(|month| Date::from_calendar_date(year as _, month, day).ok());
                let time = Time::from_hms_micro(hour, minute, second, microsecond).ok();
                match (date, time) {
                    (Some(date), Some(time)) => {
                        Value::Timestamp(Some(PrimitiveDateTime::new(date, time)))
                    }
                    _ => return Err(FromValueError(value)),
                }
            }
            // Only a time of day, intervals have no counterpart
            MySQLValue::Time(false, 0, hours, minutes, seconds, micro) => {
                match Time::from_hms_micro(hours, minutes, seconds, micro) {
                    Ok(v) => Value::Time(Some(v)),
                    Err(..) => return Err(FromValueError(value)),
                }
            }
            MySQLValue::Time(..) => return Err(FromValueError(value)),
        }
        .into())
    }
}

impl TryFrom<ValueWrap> for mysql_async::Value {
    type Error = Error;

    fn try_from(value: ValueWrap) -> Result<Self, Self::Error> {
        type MySQLValue = mysql_async::Value;
        Ok(match value.0 {
            ref v if v.is_null() => MySQLValue::NULL,
            Value::Boolean(Some(v)) => MySQLValue::from(v),
            Value::Int8(Some(v)) => MySQLValue::from(v),
            Value::Int16(Some(v)) => MySQLValue::from(v),
            Value::Int32(Some(v)) => MySQLValue::from(v),
            Value::Int64(Some(v)) => MySQLValue::from(v),
            Value::Float32(Some(v)) => MySQLValue::from(v),
            Value::Float64(Some(v)) => MySQLValue::from(v),
            Value::Decimal(Some(v)) => MySQLValue::from(v),
            Value::Varchar(Some(v)) => MySQLValue::from(v),
            Value::Blob(Some(v)) => MySQLValue::Bytes(v.into_vec()),
            Value::Date(Some(v)) => MySQLValue::from(v),
            Value::Time(Some(v)) => MySQLValue::from(v),
            Value::Timestamp(Some(v)) => {
                if !(0..=9999).contains(&v.year()) {
                    return Err(Error::msg(format!(
                        "Timestamp {} is out of range for MySQL",
                        v
                    )));
                }
                MySQLValue::Date(
                    v.year() as _,
                    v.month().into(),
                    v.day(),
                    v.hour(),
                    v.minute(),
                    v.second(),
                    v.microsecond(),
                )
            }
            Value::Uuid(Some(v)) => MySQLValue::from(v.to_string()),
            v => {
                return Err(Error::msg(format!(
                    "Value {:?} is not supported by MySQL",
                    v
                )));
            }
        })
    }
}
