/*!
This module implements element-wise conversion between element types.

Built-in pairs are looked up in a dispatch table keyed by `(source, destination)` that is populated on first use. Each entry is a monomorphized function that runs the `transform` walker over the two regions. Pairs missing from the table fall back to a value hook registered with [`register_converter`](fn.register_converter.html), which is called once per element.
*/

use crate::{
	config, ByteArray, ComplexElement, DataType, Element, Layout, LongDouble, Numeric, Rgba,
	SliceMut, SliceRef, TextElement, Value,
};
use fnv::FnvHashMap;
use num_complex::{Complex32, Complex64};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use tessera_iter::{for_each, for_each_mut, par_transform, transform};
use tessera_shape::shape_size;

/// Converts the source region into the destination region. Both slices start at the first element of their region.
pub type ConvertFn = fn(SliceRef<'_>, &Layout<'_>, SliceMut<'_>, &Layout<'_>) -> bool;

/// Converts one boxed value into another type. Returns `None` if the value cannot be converted.
pub type ValueConverter = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

type ReadValuesFn = fn(SliceRef<'_>, &Layout<'_>) -> Option<Vec<Value>>;
type WriteValuesFn = fn(SliceMut<'_>, &Layout<'_>, &[Value]) -> bool;

/// Moves elements of one type in and out of `Value`s, for the hook path.
#[derive(Clone, Copy)]
struct ElementOps {
	read_values: ReadValuesFn,
	write_values: WriteValuesFn,
}

#[derive(Default)]
struct ConvertTable {
	entries: FnvHashMap<(DataType, DataType), ConvertFn>,
}

impl ConvertTable {
	fn add(&mut self, from: DataType, to: DataType, f: ConvertFn) {
		self.entries.insert((from, to), f);
	}

	fn add_numeric_source<S: Numeric>(&mut self) {
		let from = S::DATA_TYPE;
		self.add(from, DataType::Bool, numeric_to_numeric::<S, bool>);
		self.add(from, DataType::Int8, numeric_to_numeric::<S, i8>);
		self.add(from, DataType::UInt8, numeric_to_numeric::<S, u8>);
		self.add(from, DataType::Int16, numeric_to_numeric::<S, i16>);
		self.add(from, DataType::UInt16, numeric_to_numeric::<S, u16>);
		self.add(from, DataType::Int32, numeric_to_numeric::<S, i32>);
		self.add(from, DataType::UInt32, numeric_to_numeric::<S, u32>);
		self.add(from, DataType::Int64, numeric_to_numeric::<S, i64>);
		self.add(from, DataType::UInt64, numeric_to_numeric::<S, u64>);
		self.add(from, DataType::Float32, numeric_to_numeric::<S, f32>);
		self.add(from, DataType::Float64, numeric_to_numeric::<S, f64>);
		self.add(from, DataType::LongDouble, numeric_to_numeric::<S, LongDouble>);
		self.add(from, DataType::Complex32, numeric_to_complex::<S, Complex32>);
		self.add(from, DataType::Complex64, numeric_to_complex::<S, Complex64>);
		self.add_text_destinations::<S>();
	}

	fn add_complex_source<S: ComplexElement>(&mut self) {
		let from = S::DATA_TYPE;
		self.add(from, DataType::Complex32, complex_to_complex::<S, Complex32>);
		self.add(from, DataType::Complex64, complex_to_complex::<S, Complex64>);
		self.add_text_destinations::<S>();
	}

	fn add_text_destinations<S: Element>(&mut self) {
		self.add(S::DATA_TYPE, DataType::String, to_text::<S, String>);
		self.add(S::DATA_TYPE, DataType::ByteArray, to_text::<S, ByteArray>);
	}

	/// Every type can be parsed from text.
	fn add_text_source<S: TextElement>(&mut self) {
		let from = S::DATA_TYPE;
		self.add(from, DataType::Bool, from_text::<S, bool>);
		self.add(from, DataType::Int8, from_text::<S, i8>);
		self.add(from, DataType::UInt8, from_text::<S, u8>);
		self.add(from, DataType::Int16, from_text::<S, i16>);
		self.add(from, DataType::UInt16, from_text::<S, u16>);
		self.add(from, DataType::Int32, from_text::<S, i32>);
		self.add(from, DataType::UInt32, from_text::<S, u32>);
		self.add(from, DataType::Int64, from_text::<S, i64>);
		self.add(from, DataType::UInt64, from_text::<S, u64>);
		self.add(from, DataType::Float32, from_text::<S, f32>);
		self.add(from, DataType::Float64, from_text::<S, f64>);
		self.add(from, DataType::LongDouble, from_text::<S, LongDouble>);
		self.add(from, DataType::Complex32, from_text::<S, Complex32>);
		self.add(from, DataType::Complex64, from_text::<S, Complex64>);
		self.add(from, DataType::String, from_text::<S, String>);
		self.add(from, DataType::ByteArray, from_text::<S, ByteArray>);
		self.add(from, DataType::Rgba, from_text::<S, Rgba>);
	}

	fn add_identity<T: Element>(&mut self) {
		self.add(T::DATA_TYPE, T::DATA_TYPE, identity::<T>);
	}

	fn builtin() -> ConvertTable {
		let mut table = ConvertTable::default();
		table.add_numeric_source::<bool>();
		table.add_numeric_source::<i8>();
		table.add_numeric_source::<u8>();
		table.add_numeric_source::<i16>();
		table.add_numeric_source::<u16>();
		table.add_numeric_source::<i32>();
		table.add_numeric_source::<u32>();
		table.add_numeric_source::<i64>();
		table.add_numeric_source::<u64>();
		table.add_numeric_source::<f32>();
		table.add_numeric_source::<f64>();
		table.add_numeric_source::<LongDouble>();
		table.add_complex_source::<Complex32>();
		table.add_complex_source::<Complex64>();
		table.add_text_source::<String>();
		table.add_text_source::<ByteArray>();
		table.add_text_destinations::<Rgba>();
		// Same type pairs copy without going through a cast.
		table.add_identity::<bool>();
		table.add_identity::<i8>();
		table.add_identity::<u8>();
		table.add_identity::<i16>();
		table.add_identity::<u16>();
		table.add_identity::<i32>();
		table.add_identity::<u32>();
		table.add_identity::<i64>();
		table.add_identity::<u64>();
		table.add_identity::<f32>();
		table.add_identity::<f64>();
		table.add_identity::<LongDouble>();
		table.add_identity::<Complex32>();
		table.add_identity::<Complex64>();
		table.add_identity::<String>();
		table.add_identity::<ByteArray>();
		table.add_identity::<Rgba>();
		table
	}
}

static TABLE: Lazy<RwLock<ConvertTable>> = Lazy::new(|| RwLock::new(ConvertTable::builtin()));

static HOOKS: Lazy<RwLock<FnvHashMap<(DataType, DataType), ValueConverter>>> =
	Lazy::new(|| RwLock::new(FnvHashMap::default()));

static ELEMENTS: Lazy<RwLock<FnvHashMap<DataType, ElementOps>>> = Lazy::new(|| {
	let mut elements = FnvHashMap::default();
	fn ops<T: Element>() -> ElementOps {
		ElementOps {
			read_values: read_values::<T>,
			write_values: write_values::<T>,
		}
	}
	elements.insert(DataType::Bool, ops::<bool>());
	elements.insert(DataType::Int8, ops::<i8>());
	elements.insert(DataType::UInt8, ops::<u8>());
	elements.insert(DataType::Int16, ops::<i16>());
	elements.insert(DataType::UInt16, ops::<u16>());
	elements.insert(DataType::Int32, ops::<i32>());
	elements.insert(DataType::UInt32, ops::<u32>());
	elements.insert(DataType::Int64, ops::<i64>());
	elements.insert(DataType::UInt64, ops::<u64>());
	elements.insert(DataType::Float32, ops::<f32>());
	elements.insert(DataType::Float64, ops::<f64>());
	elements.insert(DataType::LongDouble, ops::<LongDouble>());
	elements.insert(DataType::Complex32, ops::<Complex32>());
	elements.insert(DataType::Complex64, ops::<Complex64>());
	elements.insert(DataType::String, ops::<String>());
	elements.insert(DataType::ByteArray, ops::<ByteArray>());
	elements.insert(DataType::Rgba, ops::<Rgba>());
	RwLock::new(elements)
});

fn run<S, D, F>(
	src: SliceRef<'_>,
	src_layout: &Layout<'_>,
	dst: SliceMut<'_>,
	dst_layout: &Layout<'_>,
	f: F,
) -> bool
where
	S: Element,
	D: Element,
	F: Fn(&S) -> D + Sync,
{
	let (src, dst) = match (src.downcast::<S>(), dst.downcast::<D>()) {
		(Some(src), Some(dst)) => (src, dst),
		_ => return false,
	};
	let workers = config::workers_for(shape_size(src_layout.shape));
	if workers > 1 {
		par_transform(
			src,
			src_layout.shape,
			src_layout.strides,
			dst,
			dst_layout.shape,
			dst_layout.strides,
			f,
			workers,
		)
	} else {
		transform(
			src,
			src_layout.shape,
			src_layout.strides,
			dst,
			dst_layout.shape,
			dst_layout.strides,
			f,
		)
	}
}

fn identity<T: Element>(
	src: SliceRef<'_>,
	src_layout: &Layout<'_>,
	dst: SliceMut<'_>,
	dst_layout: &Layout<'_>,
) -> bool {
	run(src, src_layout, dst, dst_layout, |value: &T| value.clone())
}

fn numeric_to_numeric<S: Numeric, D: Numeric>(
	src: SliceRef<'_>,
	src_layout: &Layout<'_>,
	dst: SliceMut<'_>,
	dst_layout: &Layout<'_>,
) -> bool {
	run(src, src_layout, dst, dst_layout, |value: &S| {
		D::from_scalar(value.to_scalar())
	})
}

fn numeric_to_complex<S: Numeric, D: ComplexElement>(
	src: SliceRef<'_>,
	src_layout: &Layout<'_>,
	dst: SliceMut<'_>,
	dst_layout: &Layout<'_>,
) -> bool {
	run(src, src_layout, dst, dst_layout, |value: &S| {
		D::from_parts(value.to_f64(), 0.0)
	})
}

fn complex_to_complex<S: ComplexElement, D: ComplexElement>(
	src: SliceRef<'_>,
	src_layout: &Layout<'_>,
	dst: SliceMut<'_>,
	dst_layout: &Layout<'_>,
) -> bool {
	run(src, src_layout, dst, dst_layout, |value: &S| {
		let (re, im) = value.to_parts();
		D::from_parts(re, im)
	})
}

fn to_text<S: Element, D: TextElement>(
	src: SliceRef<'_>,
	src_layout: &Layout<'_>,
	dst: SliceMut<'_>,
	dst_layout: &Layout<'_>,
) -> bool {
	run(src, src_layout, dst, dst_layout, |value: &S| {
		D::from_text(value.to_text())
	})
}

/// Text that does not parse becomes the default value.
fn from_text<S: TextElement, D: Element>(
	src: SliceRef<'_>,
	src_layout: &Layout<'_>,
	dst: SliceMut<'_>,
	dst_layout: &Layout<'_>,
) -> bool {
	run(src, src_layout, dst, dst_layout, |value: &S| {
		D::parse_text(&value.text()).unwrap_or_default()
	})
}

fn read_values<T: Element>(src: SliceRef<'_>, layout: &Layout<'_>) -> Option<Vec<Value>> {
	let src = src.downcast::<T>()?;
	let mut values = Vec::with_capacity(shape_size(layout.shape).max(0) as usize);
	if !for_each(src, layout.shape, layout.strides, |value| {
		values.push(value.to_value())
	}) {
		return None;
	}
	Some(values)
}

fn write_values<T: Element>(dst: SliceMut<'_>, layout: &Layout<'_>, values: &[Value]) -> bool {
	let dst = match dst.downcast::<T>() {
		Some(dst) => dst,
		None => return false,
	};
	let values = match values.iter().map(|value| value.exact::<T>()).collect::<Option<Vec<T>>>() {
		Some(values) => values,
		None => return false,
	};
	if values.len() != shape_size(layout.shape).max(0) as usize {
		return false;
	}
	let mut values = values.into_iter();
	for_each_mut(dst, layout.shape, layout.strides, |slot| {
		if let Some(value) = values.next() {
			*slot = value;
		}
	})
}

fn hook(from: DataType, to: DataType) -> Option<ValueConverter> {
	HOOKS.read().get(&(from, to)).cloned()
}

/// Converts the source region into the destination region element by element. Returns false, leaving the destination untouched, if the element counts differ or are zero, if either region does not fit its slice, or if no conversion between the two types exists.
pub fn convert_slices(
	src: SliceRef<'_>,
	src_type: DataType,
	src_layout: &Layout<'_>,
	dst: SliceMut<'_>,
	dst_type: DataType,
	dst_layout: &Layout<'_>,
) -> bool {
	let builtin = TABLE.read().entries.get(&(src_type, dst_type)).copied();
	if let Some(f) = builtin {
		return f(src, src_layout, dst, dst_layout);
	}
	let converter = match hook(src_type, dst_type) {
		Some(converter) => converter,
		None => {
			log::warn!("no conversion from {} to {}", src_type, dst_type);
			return false;
		}
	};
	let (src_ops, dst_ops) = {
		let elements = ELEMENTS.read();
		match (
			elements.get(&src_type).copied(),
			elements.get(&dst_type).copied(),
		) {
			(Some(src_ops), Some(dst_ops)) => (src_ops, dst_ops),
			_ => return false,
		}
	};
	log::debug!("converting {} to {} with a value hook", src_type, dst_type);
	let values = match (src_ops.read_values)(src, src_layout) {
		Some(values) => values,
		None => return false,
	};
	let converted = match values
		.iter()
		.map(|value| converter(value))
		.collect::<Option<Vec<Value>>>()
	{
		Some(converted) => converted,
		None => return false,
	};
	(dst_ops.write_values)(dst, dst_layout, &converted)
}

/// Converts a single element with the same rules as `convert_slices`.
pub fn convert_element<S: Element, D: Element>(value: &S) -> Option<D> {
	let mut converted = [D::default()];
	let layout = Layout::unit();
	if convert_slices(
		SliceRef::new(std::slice::from_ref(value)),
		S::DATA_TYPE,
		&layout,
		SliceMut::new(&mut converted),
		D::DATA_TYPE,
		&layout,
	) {
		let [converted] = converted;
		Some(converted)
	} else {
		None
	}
}

/// Converts a boxed value of a registered type with its value hook.
pub(crate) fn convert_value(value: &Value, to: DataType) -> Option<Value> {
	let from = value.data_type();
	if from == to {
		return Some(value.clone());
	}
	let converter = hook(from, to)?;
	converter(value).filter(|converted| converted.data_type() == to)
}

/// Returns true if elements of type `from` can be converted to type `to`.
pub fn can_convert(from: DataType, to: DataType) -> bool {
	if from == DataType::Null || to == DataType::Null {
		return false;
	}
	TABLE.read().entries.contains_key(&(from, to)) || HOOKS.read().contains_key(&(from, to))
}

/// Registers a value hook converting elements of type `from` to type `to`. Built-in pairs always use the dispatch table, so a hook only takes effect for pairs the table does not cover.
pub fn register_converter<F>(from: DataType, to: DataType, converter: F)
where
	F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
{
	log::debug!("registered a value hook from {} to {}", from, to);
	HOOKS.write().insert((from, to), Arc::new(converter));
}

/// Adds the table entries every registered element type gets: copying to its own type, and formatting to and parsing from text.
pub(crate) fn register_element_conversions<T: Element>() {
	{
		let mut table = TABLE.write();
		table.add_identity::<T>();
		table.add_text_destinations::<T>();
		table.add(DataType::String, T::DATA_TYPE, from_text::<String, T>);
		table.add(DataType::ByteArray, T::DATA_TYPE, from_text::<ByteArray, T>);
	}
	ELEMENTS.write().insert(
		T::DATA_TYPE,
		ElementOps {
			read_values: read_values::<T>,
			write_values: write_values::<T>,
		},
	);
}

#[test]
fn test_builtin_capabilities() {
	assert!(can_convert(DataType::Int8, DataType::Float64));
	assert!(can_convert(DataType::Bool, DataType::Complex32));
	assert!(can_convert(DataType::Complex64, DataType::Complex32));
	assert!(can_convert(DataType::Complex64, DataType::String));
	assert!(!can_convert(DataType::Complex64, DataType::Float64));
	assert!(can_convert(DataType::String, DataType::Rgba));
	assert!(can_convert(DataType::ByteArray, DataType::UInt64));
	assert!(can_convert(DataType::Rgba, DataType::ByteArray));
	assert!(can_convert(DataType::Rgba, DataType::Rgba));
	assert!(!can_convert(DataType::Rgba, DataType::UInt8));
	assert!(!can_convert(DataType::Float64, DataType::Rgba));
	assert!(!can_convert(DataType::Null, DataType::Null));
	for from in DataType::BUILTIN.iter().copied() {
		assert!(can_convert(from, from));
		assert!(can_convert(from, DataType::String));
		assert!(can_convert(DataType::String, from));
	}
}

#[test]
fn test_convert_strided_region() {
	// The second column of a 3x2 row-major buffer, written into every other slot of the destination.
	let src = [1i32, -2, 3, -4, 5, -6];
	let mut dst = [0.0f32; 6];
	assert!(convert_slices(
		SliceRef::new(&src).skip(1).unwrap(),
		DataType::Int32,
		&Layout::new(&[3], &[2]),
		SliceMut::new(&mut dst),
		DataType::Float32,
		&Layout::new(&[3], &[2]),
	));
	assert_eq!(dst, [-2.0, 0.0, -4.0, 0.0, -6.0, 0.0]);
}

#[test]
fn test_complex_to_real_leaves_destination() {
	let src = [Complex64::new(1.0, 1.0); 4];
	let mut dst = [7.0f64; 4];
	assert!(!convert_slices(
		SliceRef::new(&src),
		DataType::Complex64,
		&Layout::new(&[4], &[1]),
		SliceMut::new(&mut dst),
		DataType::Float64,
		&Layout::new(&[4], &[1]),
	));
	assert_eq!(dst, [7.0; 4]);
	// Mismatched sizes fail the same way.
	let src = [1u8, 2, 3];
	assert!(!convert_slices(
		SliceRef::new(&src),
		DataType::UInt8,
		&Layout::new(&[3], &[1]),
		SliceMut::new(&mut dst),
		DataType::Float64,
		&Layout::new(&[4], &[1]),
	));
	assert_eq!(dst, [7.0; 4]);
}

#[test]
fn test_convert_element_round_trip() {
	for value in [i32::MIN, -1, 0, 1, i32::MAX].iter() {
		let wide: i64 = convert_element(value).unwrap();
		assert_eq!(convert_element::<i64, i32>(&wide), Some(*value));
		let text: String = convert_element(value).unwrap();
		assert_eq!(convert_element::<String, i32>(&text), Some(*value));
	}
	let value = 0.1f32;
	let wide: f64 = convert_element(&value).unwrap();
	assert_eq!(convert_element::<f64, f32>(&wide), Some(value));
	let text: ByteArray = convert_element(&Complex32::new(0.5, -1.25)).unwrap();
	assert_eq!(text, ByteArray(b"(0.5,-1.25)".to_vec()));
	assert_eq!(
		convert_element::<ByteArray, Complex32>(&text),
		Some(Complex32::new(0.5, -1.25))
	);
	assert_eq!(convert_element::<String, Rgba>(&"junk".to_owned()), Some(Rgba::default()));
}
