use crate::{Array, DataType};
use std::collections::BTreeMap;
use tessera_shape::ShapeVector;

/// Named arrays, one of which is current. The handle's shape, strides and element type mirror the current array, and every array operation is forwarded to it.
#[derive(Clone)]
pub struct MultiArrayHandle {
	arrays: BTreeMap<String, Array>,
	current: Option<String>,
	shape: ShapeVector,
	strides: ShapeVector,
	data_type: DataType,
}

impl Default for MultiArrayHandle {
	fn default() -> MultiArrayHandle {
		MultiArrayHandle::new()
	}
}

impl MultiArrayHandle {
	pub fn new() -> MultiArrayHandle {
		MultiArrayHandle {
			arrays: BTreeMap::new(),
			current: None,
			shape: ShapeVector::new(),
			strides: ShapeVector::new(),
			data_type: DataType::Null,
		}
	}

	/// The arrays, sorted by name.
	pub fn arrays(&self) -> &BTreeMap<String, Array> {
		&self.arrays
	}

	pub fn current_name(&self) -> Option<&str> {
		self.current.as_deref()
	}

	pub fn current_array(&self) -> Option<&Array> {
		self.current.as_ref().and_then(|name| self.arrays.get(name))
	}

	pub(crate) fn current_array_mut(&mut self) -> Option<&mut Array> {
		let arrays = &mut self.arrays;
		self.current.as_ref().and_then(move |name| arrays.get_mut(name))
	}

	pub fn shape(&self) -> &ShapeVector {
		&self.shape
	}

	pub fn strides(&self) -> &ShapeVector {
		&self.strides
	}

	pub fn data_type(&self) -> DataType {
		self.data_type
	}

	/// Inserts or replaces the array called `name`. It becomes current if there was no current array or if it replaces the current one.
	pub fn add_array(&mut self, name: &str, array: Array) {
		self.arrays.insert(name.to_owned(), array);
		if self.current.is_none() || self.current.as_deref() == Some(name) {
			self.current = Some(name.to_owned());
		}
		self.remirror();
	}

	/// Removes the array called `name`. If it was current, the array with the smallest remaining name becomes current.
	pub fn remove_array(&mut self, name: &str) -> Option<Array> {
		let removed = self.arrays.remove(name)?;
		if self.current.as_deref() == Some(name) {
			self.current = self.arrays.keys().next().cloned();
		}
		self.remirror();
		Some(removed)
	}

	/// Makes the array called `name` current. Returns false and changes nothing if there is no such array.
	pub fn set_current_array(&mut self, name: &str) -> bool {
		if !self.arrays.contains_key(name) {
			return false;
		}
		self.current = Some(name.to_owned());
		self.remirror();
		true
	}

	/// Copies the current array's layout and element type into this handle. Call after anything that may change them.
	pub(crate) fn remirror(&mut self) {
		let (shape, strides, data_type) = match self.current_array() {
			Some(array) => (array.shape(), array.strides(), array.data_type()),
			None => (ShapeVector::new(), ShapeVector::new(), DataType::Null),
		};
		self.shape = shape;
		self.strides = strides;
		self.data_type = data_type;
	}
}
