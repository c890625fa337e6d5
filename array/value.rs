use crate::{convert, ByteArray, DataType, Element, LongDouble, Rgba};
use num_complex::{Complex32, Complex64};
use std::{any::Any, fmt, sync::Arc};

/// A single element of any type, boxed.
#[derive(Clone, Debug)]
pub enum Value {
	Null,
	Bool(bool),
	Int8(i8),
	UInt8(u8),
	Int16(i16),
	UInt16(u16),
	Int32(i32),
	UInt32(u32),
	Int64(i64),
	UInt64(u64),
	Float32(f32),
	Float64(f64),
	LongDouble(LongDouble),
	Complex32(Complex32),
	Complex64(Complex64),
	String(String),
	ByteArray(ByteArray),
	Rgba(Rgba),
	/// An element of a registered user type.
	Other(DataType, Arc<dyn Any + Send + Sync>),
}

impl Default for Value {
	fn default() -> Value {
		Value::Null
	}
}

impl Value {
	pub fn data_type(&self) -> DataType {
		match self {
			Value::Null => DataType::Null,
			Value::Bool(_) => DataType::Bool,
			Value::Int8(_) => DataType::Int8,
			Value::UInt8(_) => DataType::UInt8,
			Value::Int16(_) => DataType::Int16,
			Value::UInt16(_) => DataType::UInt16,
			Value::Int32(_) => DataType::Int32,
			Value::UInt32(_) => DataType::UInt32,
			Value::Int64(_) => DataType::Int64,
			Value::UInt64(_) => DataType::UInt64,
			Value::Float32(_) => DataType::Float32,
			Value::Float64(_) => DataType::Float64,
			Value::LongDouble(_) => DataType::LongDouble,
			Value::Complex32(_) => DataType::Complex32,
			Value::Complex64(_) => DataType::Complex64,
			Value::String(_) => DataType::String,
			Value::ByteArray(_) => DataType::ByteArray,
			Value::Rgba(_) => DataType::Rgba,
			Value::Other(data_type, _) => *data_type,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Converts the value to `T` with the same rules arrays are converted with. Returns `None` if the pair of types is not convertible.
	pub fn to<T: Element>(&self) -> Option<T> {
		match self {
			Value::Null => None,
			Value::Bool(value) => convert::convert_element(value),
			Value::Int8(value) => convert::convert_element(value),
			Value::UInt8(value) => convert::convert_element(value),
			Value::Int16(value) => convert::convert_element(value),
			Value::UInt16(value) => convert::convert_element(value),
			Value::Int32(value) => convert::convert_element(value),
			Value::UInt32(value) => convert::convert_element(value),
			Value::Int64(value) => convert::convert_element(value),
			Value::UInt64(value) => convert::convert_element(value),
			Value::Float32(value) => convert::convert_element(value),
			Value::Float64(value) => convert::convert_element(value),
			Value::LongDouble(value) => convert::convert_element(value),
			Value::Complex32(value) => convert::convert_element(value),
			Value::Complex64(value) => convert::convert_element(value),
			Value::String(value) => convert::convert_element(value),
			Value::ByteArray(value) => convert::convert_element(value),
			Value::Rgba(value) => convert::convert_element(value),
			Value::Other(data_type, value) => {
				if *data_type == T::DATA_TYPE {
					return value.downcast_ref::<T>().cloned();
				}
				convert::convert_value(self, T::DATA_TYPE).and_then(|value| value.exact())
			}
		}
	}

	/// Extracts the value as `T` only if it already has `T`'s type.
	pub(crate) fn exact<T: Element>(&self) -> Option<T> {
		if self.data_type() != T::DATA_TYPE {
			return None;
		}
		match self {
			Value::Other(_, value) => value.downcast_ref::<T>().cloned(),
			value => value.to(),
		}
	}

	/// The text form of the value, if its type can be formatted.
	pub fn to_text(&self) -> Option<String> {
		self.to::<String>()
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Int8(a), Value::Int8(b)) => a == b,
			(Value::UInt8(a), Value::UInt8(b)) => a == b,
			(Value::Int16(a), Value::Int16(b)) => a == b,
			(Value::UInt16(a), Value::UInt16(b)) => a == b,
			(Value::Int32(a), Value::Int32(b)) => a == b,
			(Value::UInt32(a), Value::UInt32(b)) => a == b,
			(Value::Int64(a), Value::Int64(b)) => a == b,
			(Value::UInt64(a), Value::UInt64(b)) => a == b,
			(Value::Float32(a), Value::Float32(b)) => a == b,
			(Value::Float64(a), Value::Float64(b)) => a == b,
			(Value::LongDouble(a), Value::LongDouble(b)) => a == b,
			(Value::Complex32(a), Value::Complex32(b)) => a == b,
			(Value::Complex64(a), Value::Complex64(b)) => a == b,
			(Value::String(a), Value::String(b)) => a == b,
			(Value::ByteArray(a), Value::ByteArray(b)) => a == b,
			(Value::Rgba(a), Value::Rgba(b)) => a == b,
			(Value::Other(a_type, a), Value::Other(b_type, b)) => {
				a_type == b_type && Arc::ptr_eq(a, b)
			}
			_ => false,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => Ok(()),
			Value::Other(data_type, _) => match self.to_text() {
				Some(text) => write!(f, "{}", text),
				None => write!(f, "<{}>", data_type),
			},
			value => write!(f, "{}", value.to_text().unwrap_or_default()),
		}
	}
}

macro_rules! value_from {
	($t:ty, $variant:ident) => {
		impl From<$t> for Value {
			fn from(value: $t) -> Value {
				Value::$variant(value)
			}
		}
	};
}

value_from!(bool, Bool);
value_from!(i8, Int8);
value_from!(u8, UInt8);
value_from!(i16, Int16);
value_from!(u16, UInt16);
value_from!(i32, Int32);
value_from!(u32, UInt32);
value_from!(i64, Int64);
value_from!(u64, UInt64);
value_from!(f32, Float32);
value_from!(f64, Float64);
value_from!(LongDouble, LongDouble);
value_from!(Complex32, Complex32);
value_from!(Complex64, Complex64);
value_from!(String, String);
value_from!(ByteArray, ByteArray);
value_from!(Rgba, Rgba);

impl From<&str> for Value {
	fn from(value: &str) -> Value {
		Value::String(value.to_owned())
	}
}

impl From<&Value> for Value {
	fn from(value: &Value) -> Value {
		value.clone()
	}
}

#[test]
fn test_value_conversions() {
	assert_eq!(Value::from(3.9f64).to::<i32>(), Some(3));
	assert_eq!(Value::from(-1i32).to::<u8>(), Some(255));
	assert_eq!(Value::from(300i32).to::<u8>(), Some(44));
	assert_eq!(Value::from(1e10f64).to::<i32>(), Some(i32::MAX));
	assert_eq!(Value::from(2u8).to::<bool>(), Some(true));
	assert_eq!(Value::from("12.5").to::<f32>(), Some(12.5));
	assert_eq!(Value::from("nope").to::<f64>(), Some(0.0));
	assert_eq!(Value::from(0.25f64).to::<String>(), Some("0.25".to_owned()));
	assert_eq!(
		Value::from(2i16).to::<Complex64>(),
		Some(Complex64::new(2.0, 0.0))
	);
	assert_eq!(Value::from(Complex64::new(1.0, 2.0)).to::<f64>(), None);
	assert_eq!(Value::from(Rgba::new(1, 2, 3, 4)).to::<i32>(), None);
	assert_eq!(Value::Null.to::<i32>(), None);
	assert_eq!(Value::from(true).to_string(), "true");
	assert_eq!(Value::from(7u64).data_type(), DataType::UInt64);
}
