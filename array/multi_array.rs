use crate::{registry, Array, DataType, Handle, HandleKind, MultiArrayHandle};
use std::ops::Deref;

/// A collection of named arrays that behaves like its current array. Array operations on a `MultiArray` act on the current array.
#[derive(Clone, Debug)]
pub struct MultiArray {
	array: Array,
}

impl Default for MultiArray {
	fn default() -> MultiArray {
		MultiArray::new()
	}
}

impl Deref for MultiArray {
	type Target = Array;
	fn deref(&self) -> &Array {
		&self.array
	}
}

impl MultiArray {
	pub fn new() -> MultiArray {
		let handle = registry::create_handle(HandleKind::MultiArray, DataType::Null, None);
		let array = if handle.is_null() {
			Array::from_handle(Handle::Multi(MultiArrayHandle::new()))
		} else {
			Array::from_shared(handle)
		};
		MultiArray { array }
	}

	/// Wraps `array` if it is a multi-array.
	pub fn from_array(array: Array) -> Option<MultiArray> {
		match array.handle() {
			Handle::Multi(_) => Some(MultiArray { array }),
			_ => None,
		}
	}

	pub fn into_array(self) -> Array {
		self.array
	}

	fn multi(&self) -> Option<&MultiArrayHandle> {
		match self.array.handle() {
			Handle::Multi(multi) => Some(multi),
			_ => None,
		}
	}

	fn multi_mut(&mut self) -> Option<&mut MultiArrayHandle> {
		match self.array.handle.get_mut() {
			Some(Handle::Multi(multi)) => Some(multi),
			_ => None,
		}
	}

	/// Inserts or replaces the array called `name`. It becomes current if there was no current array or if it replaces the current one.
	pub fn add_array(&mut self, name: &str, array: Array) {
		if let Some(multi) = self.multi_mut() {
			multi.add_array(name, array);
		}
	}

	/// Removes the array called `name`. If it was current, the array with the smallest remaining name becomes current.
	pub fn remove_array(&mut self, name: &str) -> Option<Array> {
		self.multi_mut()?.remove_array(name)
	}

	pub fn set_current_array(&mut self, name: &str) -> bool {
		self.multi_mut()
			.map(|multi| multi.set_current_array(name))
			.unwrap_or(false)
	}

	/// The names of the arrays, sorted.
	pub fn names(&self) -> Vec<String> {
		self.multi()
			.map(|multi| multi.arrays().keys().cloned().collect())
			.unwrap_or_default()
	}

	pub fn array(&self, name: &str) -> Option<&Array> {
		self.multi()?.arrays().get(name)
	}

	pub fn current_name(&self) -> Option<&str> {
		self.multi()?.current_name()
	}

	pub fn current_array(&self) -> Option<&Array> {
		self.multi()?.current_array()
	}

	pub fn len(&self) -> usize {
		self.multi().map(|multi| multi.arrays().len()).unwrap_or(0)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The underlying array, for the mutating array operations that forward to the current array.
	pub fn as_array_mut(&mut self) -> &mut Array {
		&mut self.array
	}
}

#[test]
fn test_current_array() {
	let mut multi = MultiArray::new();
	assert_eq!(multi.kind(), HandleKind::MultiArray);
	assert_eq!(multi.data_type(), DataType::Null);
	assert!(multi.current_name().is_none());
	multi.add_array("b", Array::from_vec(vec![1u8, 2, 3], &[3]));
	multi.add_array("a", Array::from_vec(vec![1.0f64; 4], &[2, 2]));
	assert_eq!(multi.current_name(), Some("b"));
	assert_eq!(multi.data_type(), DataType::UInt8);
	assert_eq!(multi.shape(), [3]);
	assert_eq!(multi.names(), vec!["a".to_owned(), "b".to_owned()]);
	assert!(!multi.set_current_array("c"));
	assert_eq!(multi.current_name(), Some("b"));
	assert!(multi.set_current_array("a"));
	assert_eq!(multi.shape(), [2, 2]);
	// Replacing the current array keeps it current.
	multi.add_array("a", Array::from_vec(vec![7i32; 2], &[2]));
	assert_eq!(multi.data_type(), DataType::Int32);
	// Removing the current array promotes the smallest remaining name.
	multi.add_array("c", Array::new(DataType::Bool, &[1]));
	assert!(multi.remove_array("a").is_some());
	assert_eq!(multi.current_name(), Some("b"));
	assert!(multi.remove_array("a").is_none());
	assert_eq!(multi.len(), 2);
	assert!(MultiArray::from_array(Array::null()).is_none());
}

#[test]
fn test_forwarding() {
	let mut multi = MultiArray::new();
	multi.add_array("x", Array::from_vec(vec![1i64, 2, 3, 4], &[4]));
	let view = multi.as_array_mut().mid(&[1], Some(&[2][..]));
	assert!(view.is_view());
	assert_eq!(view.to_vec::<i64>(), Some(vec![2, 3]));
	assert!(multi.as_array_mut().fill(9));
	assert_eq!(multi.array("x").and_then(|x| x.to_vec::<i64>()), Some(vec![9; 4]));
	assert!(multi.as_array_mut().reset(&[2]));
	assert_eq!(multi.shape(), [2]);
	assert_eq!(multi.value(&[1]), crate::Value::Int64(0));
	// Multi-arrays are not shared between clones once one is changed.
	let copy = multi.clone();
	multi.add_array("y", Array::new(DataType::Float32, &[1]));
	assert_eq!(copy.len(), 1);
	assert_eq!(multi.len(), 2);
}

#[test]
fn test_multi_array_stream() {
	let mut multi = MultiArray::new();
	multi.add_array("first", Array::from_vec(vec![1u16, 2], &[2]));
	multi.add_array("second", Array::from_vec(vec!["x".to_owned()], &[1]));
	assert!(multi.set_current_array("second"));
	let mut bytes = Vec::new();
	multi.write_binary(&mut bytes).unwrap();
	let read = MultiArray::from_array(Array::read_binary(&mut bytes.as_slice()).unwrap()).unwrap();
	assert_eq!(read.names(), multi.names());
	assert_eq!(read.current_name(), Some("second"));
	assert_eq!(read.data_type(), DataType::String);
	assert_eq!(
		read.array("first").and_then(|first| first.to_vec::<u16>()),
		Some(vec![1, 2])
	);
}
