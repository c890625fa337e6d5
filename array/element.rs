use crate::Value;
use num_complex::{Complex32, Complex64};
use num_traits::AsPrimitive;
use std::{
	borrow::Cow,
	fmt,
	io::{self, Read, Write},
	sync::Arc,
};

/// Ids below this value are reserved for built-in element types.
pub const FIRST_USER_TYPE: u32 = 1024;

/// The runtime identifier of an array's element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
	Null,
	Bool,
	Int8,
	UInt8,
	Int16,
	UInt16,
	Int32,
	UInt32,
	Int64,
	UInt64,
	Float32,
	Float64,
	LongDouble,
	Complex32,
	Complex64,
	String,
	ByteArray,
	Rgba,
	/// A registered user type. The id must be at least `FIRST_USER_TYPE`.
	User(u32),
}

impl DataType {
	pub const BUILTIN: [DataType; 17] = [
		DataType::Bool,
		DataType::Int8,
		DataType::UInt8,
		DataType::Int16,
		DataType::UInt16,
		DataType::Int32,
		DataType::UInt32,
		DataType::Int64,
		DataType::UInt64,
		DataType::Float32,
		DataType::Float64,
		DataType::LongDouble,
		DataType::Complex32,
		DataType::Complex64,
		DataType::String,
		DataType::ByteArray,
		DataType::Rgba,
	];

	/// The stable numeric id written to binary streams.
	pub fn id(self) -> u32 {
		match self {
			DataType::Null => 0,
			DataType::Bool => 1,
			DataType::Int8 => 2,
			DataType::UInt8 => 3,
			DataType::Int16 => 4,
			DataType::UInt16 => 5,
			DataType::Int32 => 6,
			DataType::UInt32 => 7,
			DataType::Int64 => 8,
			DataType::UInt64 => 9,
			DataType::Float32 => 10,
			DataType::Float64 => 11,
			DataType::LongDouble => 12,
			DataType::Complex32 => 13,
			DataType::Complex64 => 14,
			DataType::String => 15,
			DataType::ByteArray => 16,
			DataType::Rgba => 17,
			DataType::User(id) => id,
		}
	}

	pub fn from_id(id: u32) -> Option<DataType> {
		match id {
			0 => Some(DataType::Null),
			1..=17 => Some(DataType::BUILTIN[id as usize - 1]),
			id if id >= FIRST_USER_TYPE => Some(DataType::User(id)),
			_ => None,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			DataType::Null => "null",
			DataType::Bool => "bool",
			DataType::Int8 => "int8",
			DataType::UInt8 => "uint8",
			DataType::Int16 => "int16",
			DataType::UInt16 => "uint16",
			DataType::Int32 => "int32",
			DataType::UInt32 => "uint32",
			DataType::Int64 => "int64",
			DataType::UInt64 => "uint64",
			DataType::Float32 => "float32",
			DataType::Float64 => "float64",
			DataType::LongDouble => "long double",
			DataType::Complex32 => "complex32",
			DataType::Complex64 => "complex64",
			DataType::String => "string",
			DataType::ByteArray => "byte array",
			DataType::Rgba => "rgba",
			DataType::User(_) => "user",
		}
	}

	pub fn is_builtin(self) -> bool {
		!matches!(self, DataType::Null | DataType::User(_))
	}

	/// Bool, integers and floating point types.
	pub fn is_numeric(self) -> bool {
		self.is_integral() || self.is_floating()
	}

	pub fn is_integral(self) -> bool {
		matches!(
			self,
			DataType::Bool
				| DataType::Int8 | DataType::UInt8
				| DataType::Int16 | DataType::UInt16
				| DataType::Int32 | DataType::UInt32
				| DataType::Int64 | DataType::UInt64
		)
	}

	pub fn is_floating(self) -> bool {
		matches!(
			self,
			DataType::Float32 | DataType::Float64 | DataType::LongDouble
		)
	}

	pub fn is_complex(self) -> bool {
		matches!(self, DataType::Complex32 | DataType::Complex64)
	}

	pub fn is_text(self) -> bool {
		matches!(self, DataType::String | DataType::ByteArray)
	}

	/// The in-memory size of one element of a built-in type.
	pub fn size_of(self) -> Option<usize> {
		use std::mem::size_of;
		let size = match self {
			DataType::Bool => size_of::<bool>(),
			DataType::Int8 => size_of::<i8>(),
			DataType::UInt8 => size_of::<u8>(),
			DataType::Int16 => size_of::<i16>(),
			DataType::UInt16 => size_of::<u16>(),
			DataType::Int32 => size_of::<i32>(),
			DataType::UInt32 => size_of::<u32>(),
			DataType::Int64 => size_of::<i64>(),
			DataType::UInt64 => size_of::<u64>(),
			DataType::Float32 => size_of::<f32>(),
			DataType::Float64 => size_of::<f64>(),
			DataType::LongDouble => size_of::<LongDouble>(),
			DataType::Complex32 => size_of::<Complex32>(),
			DataType::Complex64 => size_of::<Complex64>(),
			DataType::String => size_of::<String>(),
			DataType::ByteArray => size_of::<ByteArray>(),
			DataType::Rgba => size_of::<Rgba>(),
			DataType::Null | DataType::User(_) => return None,
		};
		Some(size)
	}

	/// The floating point precision elements of this type are streamed with.
	pub fn precision(self) -> Precision {
		match self {
			DataType::Float32 | DataType::Complex32 => Precision::Single,
			DataType::Float64 | DataType::LongDouble | DataType::Complex64 => Precision::Double,
			_ => Precision::Unspecified,
		}
	}
}

impl fmt::Display for DataType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DataType::User(id) => write!(f, "user({})", id),
			data_type => write!(f, "{}", data_type.name()),
		}
	}
}

/// The floating point precision recorded in a binary stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
	Unspecified,
	Single,
	Double,
}

impl Precision {
	pub fn code(self) -> u8 {
		match self {
			Precision::Unspecified => 0,
			Precision::Single => 1,
			Precision::Double => 2,
		}
	}

	pub fn from_code(code: u8) -> Option<Precision> {
		match code {
			0 => Some(Precision::Unspecified),
			1 => Some(Precision::Single),
			2 => Some(Precision::Double),
			_ => None,
		}
	}
}

/// A type that can be stored in an array.
///
/// The built-in types implement this trait. To store your own type, implement it with a `DataType::User` id and register it with [`register_element`](fn.register_element.html).
pub trait Element: Clone + Default + fmt::Debug + Send + Sync + 'static {
	const DATA_TYPE: DataType;

	fn name() -> &'static str {
		Self::DATA_TYPE.name()
	}

	fn to_value(&self) -> Value {
		Value::Other(Self::DATA_TYPE, Arc::new(self.clone()))
	}

	fn to_text(&self) -> String {
		format!("{:?}", self)
	}

	fn parse_text(_text: &str) -> Option<Self> {
		None
	}

	fn write_binary(&self, _writer: &mut dyn Write) -> io::Result<()> {
		Err(io::Error::new(
			io::ErrorKind::InvalidInput,
			format!("{} elements have no binary encoding", Self::name()),
		))
	}

	fn read_binary(_reader: &mut dyn Read, _precision: Precision) -> io::Result<Self> {
		Err(io::Error::new(
			io::ErrorKind::InvalidInput,
			format!("{} elements have no binary encoding", Self::name()),
		))
	}
}

/// A numeric value in the widest form that preserves `as` cast semantics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
	Int(i128),
	Float(f64),
}

/// Bool, integer and floating point elements. Conversions between them behave like `as` casts.
pub trait Numeric: Element + Copy {
	fn to_scalar(self) -> Scalar;
	fn from_scalar(scalar: Scalar) -> Self;
	fn to_f64(self) -> f64;
}

pub trait ComplexElement: Element + Copy {
	fn to_parts(self) -> (f64, f64);
	fn from_parts(re: f64, im: f64) -> Self;
}

/// Elements that every other type can be formatted into and parsed from.
pub trait TextElement: Element {
	fn from_text(text: String) -> Self;
	fn text(&self) -> Cow<'_, str>;
}

/// An extended precision float. It is stored as an `f64` since that is the widest float Rust provides.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct LongDouble(pub f64);

impl fmt::Display for LongDouble {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteArray(pub Vec<u8>);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: u8,
}

impl Rgba {
	pub fn new(r: u8, g: u8, b: u8, a: u8) -> Rgba {
		Rgba { r, g, b, a }
	}
}

fn parse_integer(text: &str) -> Option<i128> {
	let text = text.trim();
	lexical::parse::<i128, _>(text)
		.ok()
		.or_else(|| lexical::parse::<f64, _>(text).ok().map(|value| value as i128))
}

fn parse_float(text: &str) -> Option<f64> {
	lexical::parse::<f64, _>(text.trim()).ok()
}

/// Splits `(re,im)` into its parts. A bare number is a real value.
fn split_complex(text: &str) -> Option<(&str, &str)> {
	let text = text.trim();
	if let Some(inner) = text.strip_prefix('(').and_then(|text| text.strip_suffix(')')) {
		let (re, im) = inner.split_once(',')?;
		Some((re.trim(), im.trim()))
	} else {
		Some((text, "0"))
	}
}

fn read_bytes<const N: usize>(reader: &mut dyn Read) -> io::Result<[u8; N]> {
	let mut bytes = [0u8; N];
	reader.read_exact(&mut bytes)?;
	Ok(bytes)
}

fn read_f32(reader: &mut dyn Read, precision: Precision) -> io::Result<f32> {
	match precision {
		Precision::Double => Ok(f64::from_be_bytes(read_bytes(reader)?) as f32),
		_ => Ok(f32::from_be_bytes(read_bytes(reader)?)),
	}
}

fn read_f64(reader: &mut dyn Read, precision: Precision) -> io::Result<f64> {
	match precision {
		Precision::Single => Ok(f32::from_be_bytes(read_bytes(reader)?) as f64),
		_ => Ok(f64::from_be_bytes(read_bytes(reader)?)),
	}
}

fn write_len_prefixed(writer: &mut dyn Write, bytes: &[u8]) -> io::Result<()> {
	writer.write_all(&(bytes.len() as u32).to_be_bytes())?;
	writer.write_all(bytes)
}

fn read_len_prefixed(reader: &mut dyn Read) -> io::Result<Vec<u8>> {
	let len = u32::from_be_bytes(read_bytes(reader)?) as usize;
	let mut bytes = vec![0; len];
	reader.read_exact(&mut bytes)?;
	Ok(bytes)
}

impl Element for bool {
	const DATA_TYPE: DataType = DataType::Bool;

	fn to_value(&self) -> Value {
		Value::Bool(*self)
	}

	fn to_text(&self) -> String {
		let text = if *self { "true" } else { "false" };
		text.to_owned()
	}

	fn parse_text(text: &str) -> Option<bool> {
		let text = text.trim();
		Some(!(text.is_empty() || text == "0" || text.eq_ignore_ascii_case("false")))
	}

	fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
		writer.write_all(&[*self as u8])
	}

	fn read_binary(reader: &mut dyn Read, _precision: Precision) -> io::Result<bool> {
		Ok(read_bytes::<1>(reader)?[0] != 0)
	}
}

impl Numeric for bool {
	fn to_scalar(self) -> Scalar {
		Scalar::Int(self as i128)
	}

	fn from_scalar(scalar: Scalar) -> bool {
		match scalar {
			Scalar::Int(value) => value != 0,
			Scalar::Float(value) => value != 0.0,
		}
	}

	fn to_f64(self) -> f64 {
		if self {
			1.0
		} else {
			0.0
		}
	}
}

macro_rules! integer_element {
	($t:ty, $data_type:ident) => {
		impl Element for $t {
			const DATA_TYPE: DataType = DataType::$data_type;

			fn to_value(&self) -> Value {
				Value::$data_type(*self)
			}

			fn to_text(&self) -> String {
				lexical::to_string(*self)
			}

			fn parse_text(text: &str) -> Option<$t> {
				parse_integer(text).map(|value| value as $t)
			}

			fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
				writer.write_all(&self.to_be_bytes())
			}

			fn read_binary(reader: &mut dyn Read, _precision: Precision) -> io::Result<$t> {
				Ok(<$t>::from_be_bytes(read_bytes(reader)?))
			}
		}

		impl Numeric for $t {
			fn to_scalar(self) -> Scalar {
				Scalar::Int(self.as_())
			}

			fn from_scalar(scalar: Scalar) -> $t {
				match scalar {
					Scalar::Int(value) => value.as_(),
					Scalar::Float(value) => value.as_(),
				}
			}

			fn to_f64(self) -> f64 {
				self.as_()
			}
		}
	};
}

integer_element!(i8, Int8);
integer_element!(u8, UInt8);
integer_element!(i16, Int16);
integer_element!(u16, UInt16);
integer_element!(i32, Int32);
integer_element!(u32, UInt32);
integer_element!(i64, Int64);
integer_element!(u64, UInt64);

impl Element for f32 {
	const DATA_TYPE: DataType = DataType::Float32;

	fn to_value(&self) -> Value {
		Value::Float32(*self)
	}

	fn to_text(&self) -> String {
		lexical::to_string(*self)
	}

	fn parse_text(text: &str) -> Option<f32> {
		lexical::parse::<f32, _>(text.trim()).ok()
	}

	fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
		writer.write_all(&self.to_be_bytes())
	}

	fn read_binary(reader: &mut dyn Read, precision: Precision) -> io::Result<f32> {
		read_f32(reader, precision)
	}
}

impl Element for f64 {
	const DATA_TYPE: DataType = DataType::Float64;

	fn to_value(&self) -> Value {
		Value::Float64(*self)
	}

	fn to_text(&self) -> String {
		lexical::to_string(*self)
	}

	fn parse_text(text: &str) -> Option<f64> {
		parse_float(text)
	}

	fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
		writer.write_all(&self.to_be_bytes())
	}

	fn read_binary(reader: &mut dyn Read, precision: Precision) -> io::Result<f64> {
		read_f64(reader, precision)
	}
}

impl Element for LongDouble {
	const DATA_TYPE: DataType = DataType::LongDouble;

	fn to_value(&self) -> Value {
		Value::LongDouble(*self)
	}

	fn to_text(&self) -> String {
		lexical::to_string(self.0)
	}

	fn parse_text(text: &str) -> Option<LongDouble> {
		parse_float(text).map(LongDouble)
	}

	fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
		writer.write_all(&self.0.to_be_bytes())
	}

	fn read_binary(reader: &mut dyn Read, precision: Precision) -> io::Result<LongDouble> {
		read_f64(reader, precision).map(LongDouble)
	}
}

macro_rules! float_numeric {
	($t:ty, $wrap:expr, $unwrap:expr) => {
		impl Numeric for $t {
			fn to_scalar(self) -> Scalar {
				Scalar::Float(self.to_f64())
			}

			fn from_scalar(scalar: Scalar) -> $t {
				let value: f64 = match scalar {
					Scalar::Int(value) => value as f64,
					Scalar::Float(value) => value,
				};
				$wrap(value)
			}

			fn to_f64(self) -> f64 {
				$unwrap(self)
			}
		}
	};
}

float_numeric!(f32, |value: f64| value as f32, |value: f32| value as f64);
float_numeric!(f64, |value: f64| value, |value: f64| value);
float_numeric!(LongDouble, LongDouble, |value: LongDouble| value.0);

macro_rules! complex_element {
	($t:ty, $data_type:ident, $float:ty, $read:ident) => {
		impl Element for $t {
			const DATA_TYPE: DataType = DataType::$data_type;

			fn to_value(&self) -> Value {
				Value::$data_type(*self)
			}

			fn to_text(&self) -> String {
				format!(
					"({},{})",
					lexical::to_string(self.re),
					lexical::to_string(self.im)
				)
			}

			fn parse_text(text: &str) -> Option<$t> {
				let (re, im) = split_complex(text)?;
				let re = lexical::parse::<$float, _>(re).ok()?;
				let im = lexical::parse::<$float, _>(im).ok()?;
				Some(<$t>::new(re, im))
			}

			fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
				writer.write_all(&self.re.to_be_bytes())?;
				writer.write_all(&self.im.to_be_bytes())
			}

			fn read_binary(reader: &mut dyn Read, precision: Precision) -> io::Result<$t> {
				let re = $read(reader, precision)?;
				let im = $read(reader, precision)?;
				Ok(<$t>::new(re, im))
			}
		}

		impl ComplexElement for $t {
			fn to_parts(self) -> (f64, f64) {
				(self.re as f64, self.im as f64)
			}

			fn from_parts(re: f64, im: f64) -> $t {
				<$t>::new(re as $float, im as $float)
			}
		}
	};
}

complex_element!(Complex32, Complex32, f32, read_f32);
complex_element!(Complex64, Complex64, f64, read_f64);

impl Element for String {
	const DATA_TYPE: DataType = DataType::String;

	fn to_value(&self) -> Value {
		Value::String(self.clone())
	}

	fn to_text(&self) -> String {
		self.clone()
	}

	fn parse_text(text: &str) -> Option<String> {
		Some(text.to_owned())
	}

	fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
		write_len_prefixed(writer, self.as_bytes())
	}

	fn read_binary(reader: &mut dyn Read, _precision: Precision) -> io::Result<String> {
		String::from_utf8(read_len_prefixed(reader)?)
			.map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
	}
}

impl TextElement for String {
	fn from_text(text: String) -> String {
		text
	}

	fn text(&self) -> Cow<'_, str> {
		Cow::Borrowed(self)
	}
}

impl Element for ByteArray {
	const DATA_TYPE: DataType = DataType::ByteArray;

	fn to_value(&self) -> Value {
		Value::ByteArray(self.clone())
	}

	fn to_text(&self) -> String {
		String::from_utf8_lossy(&self.0).into_owned()
	}

	fn parse_text(text: &str) -> Option<ByteArray> {
		Some(ByteArray(text.as_bytes().to_vec()))
	}

	fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
		write_len_prefixed(writer, &self.0)
	}

	fn read_binary(reader: &mut dyn Read, _precision: Precision) -> io::Result<ByteArray> {
		read_len_prefixed(reader).map(ByteArray)
	}
}

impl TextElement for ByteArray {
	fn from_text(text: String) -> ByteArray {
		ByteArray(text.into_bytes())
	}

	fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.0)
	}
}

impl Element for Rgba {
	const DATA_TYPE: DataType = DataType::Rgba;

	fn to_value(&self) -> Value {
		Value::Rgba(*self)
	}

	fn to_text(&self) -> String {
		format!("({},{},{},{})", self.r, self.g, self.b, self.a)
	}

	fn parse_text(text: &str) -> Option<Rgba> {
		let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
		let mut parts = inner.split(',').map(|part| lexical::parse::<u8, _>(part.trim()));
		let mut next = || parts.next().and_then(|part| part.ok());
		let rgba = Rgba::new(next()?, next()?, next()?, next()?);
		if parts.next().is_some() {
			return None;
		}
		Some(rgba)
	}

	fn write_binary(&self, writer: &mut dyn Write) -> io::Result<()> {
		writer.write_all(&[self.r, self.g, self.b, self.a])
	}

	fn read_binary(reader: &mut dyn Read, _precision: Precision) -> io::Result<Rgba> {
		let [r, g, b, a] = read_bytes::<4>(reader)?;
		Ok(Rgba::new(r, g, b, a))
	}
}

#[test]
fn test_data_type_ids() {
	for data_type in DataType::BUILTIN.iter().copied() {
		assert_eq!(DataType::from_id(data_type.id()), Some(data_type));
		assert!(data_type.size_of().is_some());
	}
	assert_eq!(DataType::from_id(0), Some(DataType::Null));
	assert_eq!(DataType::from_id(18), None);
	assert_eq!(DataType::from_id(2048), Some(DataType::User(2048)));
	assert!(DataType::LongDouble.is_numeric());
	assert!(!DataType::Complex64.is_numeric());
	assert_eq!(DataType::Complex32.precision(), Precision::Single);
	assert_eq!(DataType::User(2048).to_string(), "user(2048)");
}

#[test]
fn test_text_format() {
	assert_eq!(true.to_text(), "true");
	assert_eq!(bool::parse_text("0"), Some(false));
	assert_eq!(bool::parse_text("FALSE"), Some(false));
	assert_eq!(bool::parse_text(""), Some(false));
	assert_eq!(bool::parse_text("yes"), Some(true));
	assert_eq!(i16::parse_text(" -42 "), Some(-42));
	assert_eq!(u8::parse_text("300"), Some(44));
	assert_eq!(i32::parse_text("2.75"), Some(2));
	assert_eq!(i32::parse_text("abc"), None);
	assert_eq!(f64::parse_text(&0.1f64.to_text()), Some(0.1));
	assert_eq!(f32::parse_text(&(1.0f32 / 3.0).to_text()), Some(1.0f32 / 3.0));
	let c = Complex64::new(1.5, -2.0);
	assert_eq!(Complex64::parse_text(&c.to_text()), Some(c));
	assert_eq!(Complex32::parse_text("3"), Some(Complex32::new(3.0, 0.0)));
	let rgba = Rgba::new(1, 2, 3, 255);
	assert_eq!(rgba.to_text(), "(1,2,3,255)");
	assert_eq!(Rgba::parse_text("(1, 2, 3, 255)"), Some(rgba));
	assert_eq!(Rgba::parse_text("(1,2,3)"), None);
	assert_eq!(Rgba::parse_text("(1,2,3,4,5)"), None);
}

#[test]
fn test_binary_precision() {
	let mut bytes = Vec::new();
	1.25f64.write_binary(&mut bytes).unwrap();
	assert_eq!(bytes.len(), 8);
	assert_eq!(
		f32::read_binary(&mut bytes.as_slice(), Precision::Double).unwrap(),
		1.25
	);
	let mut bytes = Vec::new();
	0.5f32.write_binary(&mut bytes).unwrap();
	assert_eq!(
		f64::read_binary(&mut bytes.as_slice(), Precision::Single).unwrap(),
		0.5
	);
	let mut bytes = Vec::new();
	"héllo".to_owned().write_binary(&mut bytes).unwrap();
	assert_eq!(
		String::read_binary(&mut bytes.as_slice(), Precision::Unspecified).unwrap(),
		"héllo"
	);
}
