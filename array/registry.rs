/*!
This module holds the process-wide type registry. It maps a handle kind and an element type to a prototype handle, which is cloned whenever an array of that kind and type is created. The registry is populated with the built-in element types on first use, and new types are added with [`register_element`](fn.register_element.html).
*/

use crate::{
	convert, ByteArray, DataType, DenseHandle, Deleter, Element, Handle, HandleKind,
	LongDouble, MultiArrayHandle, Rgba, SharedHandle, FIRST_USER_TYPE,
};
use fnv::FnvHashMap;
use num_complex::{Complex32, Complex64};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tessera_shape::{shape_size, ShapeVector};

type RegistryMap = FnvHashMap<(HandleKind, DataType), SharedHandle>;

static REGISTRY: Lazy<RwLock<RegistryMap>> = Lazy::new(|| {
	let mut registry = RegistryMap::default();
	fn dense<T: Element>(registry: &mut RegistryMap) {
		registry.insert(
			(HandleKind::Dense, T::DATA_TYPE),
			SharedHandle::new(Handle::Dense(Box::new(DenseHandle::<T>::new()))),
		);
	}
	dense::<bool>(&mut registry);
	dense::<i8>(&mut registry);
	dense::<u8>(&mut registry);
	dense::<i16>(&mut registry);
	dense::<u16>(&mut registry);
	dense::<i32>(&mut registry);
	dense::<u32>(&mut registry);
	dense::<i64>(&mut registry);
	dense::<u64>(&mut registry);
	dense::<f32>(&mut registry);
	dense::<f64>(&mut registry);
	dense::<LongDouble>(&mut registry);
	dense::<Complex32>(&mut registry);
	dense::<Complex64>(&mut registry);
	dense::<String>(&mut registry);
	dense::<ByteArray>(&mut registry);
	dense::<Rgba>(&mut registry);
	registry.insert(
		(HandleKind::MultiArray, DataType::Null),
		SharedHandle::new(Handle::Multi(MultiArrayHandle::new())),
	);
	log::debug!("populated the type registry with {} handles", registry.len());
	RwLock::new(registry)
});

/// Looks up the prototype for `kind` and `data_type`. If there is none but `kind` has exactly one registered type, that one is returned whatever type was asked for. Otherwise the result is the null handle.
pub fn get_handle(kind: HandleKind, data_type: DataType) -> SharedHandle {
	let registry = REGISTRY.read();
	if let Some(handle) = registry.get(&(kind, data_type)) {
		return handle.clone();
	}
	let mut of_kind = registry.iter().filter(|((k, _), _)| *k == kind);
	match (of_kind.next(), of_kind.next()) {
		(Some((_, handle)), None) => handle.clone(),
		_ => SharedHandle::null(),
	}
}

/// Inserts or replaces the prototype for `kind` and `data_type`.
pub fn register_type(kind: HandleKind, data_type: DataType, prototype: SharedHandle) {
	log::debug!("registered a {:?} handle for {}", kind, data_type);
	REGISTRY.write().insert((kind, data_type), prototype);
}

/// Makes `T` usable by the whole engine: arrays of it can be created, copied, converted to and from text, and converted to other types through value hooks. Returns false if `T` does not have a user type id.
pub fn register_element<T: Element>() -> bool {
	match T::DATA_TYPE {
		DataType::User(id) if id >= FIRST_USER_TYPE => {}
		data_type => {
			log::warn!("cannot register {} as a user element type", data_type);
			return false;
		}
	}
	convert::register_element_conversions::<T>();
	register_type(
		HandleKind::Dense,
		T::DATA_TYPE,
		SharedHandle::new(Handle::Dense(Box::new(DenseHandle::<T>::new()))),
	);
	true
}

/// Clones the prototype for `kind` and `data_type` and, if `shape` holds any elements, allocates that many default elements.
pub fn create_handle(kind: HandleKind, data_type: DataType, shape: Option<&ShapeVector>) -> SharedHandle {
	let mut handle = get_handle(kind, data_type);
	if let Some(shape) = shape {
		if shape_size(shape) > 0 {
			match handle.get_mut() {
				Some(prototype) => {
					prototype.realloc(shape);
				}
				None => return SharedHandle::null(),
			}
		}
	}
	handle
}

/// Creates a dense handle of `data_type` over foreign memory. Returns the null handle if `data_type` is not registered or is not `T`.
///
/// # Safety
///
/// See [`DenseHandle::from_foreign`](struct.DenseHandle.html#method.from_foreign).
pub unsafe fn create_foreign_handle<T: Element>(
	ptr: *mut T,
	shape: ShapeVector,
	strides: Option<ShapeVector>,
	deleter: Option<Deleter>,
) -> SharedHandle {
	let registered = get_handle(HandleKind::Dense, T::DATA_TYPE);
	if registered.get().data_type() != T::DATA_TYPE {
		return SharedHandle::null();
	}
	match DenseHandle::from_foreign(ptr, shape, strides, deleter) {
		Some(handle) => SharedHandle::new(Handle::Dense(Box::new(handle))),
		None => SharedHandle::null(),
	}
}

/// Every element type with a registered dense prototype, sorted by id.
pub fn registered_types() -> Vec<DataType> {
	let mut data_types = REGISTRY
		.read()
		.keys()
		.filter(|(kind, _)| *kind == HandleKind::Dense)
		.map(|(_, data_type)| *data_type)
		.collect::<Vec<_>>();
	data_types.sort_by_key(|data_type| data_type.id());
	data_types
}

#[test]
fn test_builtin_registry() {
	let data_types = registered_types();
	for data_type in DataType::BUILTIN.iter() {
		assert!(data_types.contains(data_type));
	}
	let handle = create_handle(HandleKind::Dense, DataType::Complex32, Some(&tessera_shape::shape![2, 2]));
	assert_eq!(handle.get().data_type(), DataType::Complex32);
	assert_eq!(handle.get().size(), 4);
	assert!(create_handle(HandleKind::Dense, DataType::Null, None).is_null());
	assert!(create_handle(HandleKind::View, DataType::Float64, None).is_null());
	// The multi-array kind has a single prototype, which is returned for any type.
	let multi = create_handle(HandleKind::MultiArray, DataType::Int32, None);
	assert_eq!(multi.get().kind(), HandleKind::MultiArray);
	// Creating from a prototype never mutates it.
	assert_eq!(get_handle(HandleKind::Dense, DataType::Complex32).get().size(), 0);
}

#[cfg(test)]
#[derive(Clone, Debug, Default, PartialEq)]
struct Celsius(f64);

#[cfg(test)]
impl Element for Celsius {
	const DATA_TYPE: DataType = DataType::User(2048);
	fn name() -> &'static str {
		"celsius"
	}
}

#[test]
fn test_user_element() {
	use crate::{can_convert, register_converter, Array, Value};
	assert!(!register_element::<i32>());
	assert!(register_element::<Celsius>());
	assert!(registered_types().contains(&Celsius::DATA_TYPE));
	let mut array = Array::new(Celsius::DATA_TYPE, &[3]);
	assert_eq!(array.data_type(), Celsius::DATA_TYPE);
	assert_eq!(array.data_name(), "celsius");
	assert!(array.set(&[1], Celsius(21.5)));
	assert_eq!(array.get::<Celsius>(&[1]), Some(Celsius(21.5)));
	assert_eq!(array.copy().get::<Celsius>(&[1]), Some(Celsius(21.5)));
	assert!(can_convert(Celsius::DATA_TYPE, Celsius::DATA_TYPE));
	assert!(can_convert(Celsius::DATA_TYPE, DataType::String));
	assert!(!can_convert(Celsius::DATA_TYPE, DataType::Float64));
	assert!(array.convert(DataType::Float64).is_null());
	register_converter(Celsius::DATA_TYPE, DataType::Float64, |value| {
		Some(Value::Float64(value.to::<Celsius>()?.0))
	});
	register_converter(DataType::Float64, Celsius::DATA_TYPE, |value| {
		Some(Celsius(value.to::<f64>()?).to_value())
	});
	assert!(can_convert(Celsius::DATA_TYPE, DataType::Float64));
	assert!(can_convert(DataType::Float64, Celsius::DATA_TYPE));
	assert_eq!(
		array.convert(DataType::Float64).to_vec::<f64>(),
		Some(vec![0.0, 21.5, 0.0])
	);
	let back = Array::from_vec(vec![1.0f64, -4.0], &[2]).convert(Celsius::DATA_TYPE);
	assert_eq!(back.to_vec::<Celsius>(), Some(vec![Celsius(1.0), Celsius(-4.0)]));
	assert_eq!(Value::Float64(3.0).to::<Celsius>(), Some(Celsius(3.0)));
	assert!(!can_convert(Celsius::DATA_TYPE, DataType::Int32));
	assert!(array.convert(DataType::Int32).is_null());
	// A kind with a single prototype answers for every type.
	assert_eq!(
		get_handle(HandleKind::MultiArray, Celsius::DATA_TYPE).get().kind(),
		HandleKind::MultiArray
	);
	register_type(
		HandleKind::Dense,
		DataType::User(2049),
		SharedHandle::new(Handle::Dense(Box::new(DenseHandle::<Celsius>::new()))),
	);
	assert!(!create_handle(HandleKind::Dense, DataType::User(2049), None).is_null());
}
