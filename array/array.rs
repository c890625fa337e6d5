use crate::{
	registry, resize::resize_handle, DataType, Deleter, DenseHandle, DenseStorage,
	Element, Handle, HandleKind, Interpolation, SharedHandle, Value, ViewHandle,
};
use num_complex::Complex64;
use std::{borrow::Cow, fmt};
use tessera_iter::{for_each, for_each_mut, inplace_transform, Coordinates};
use tessera_shape::{
	default_strides, flat_offset, is_unstrided, offset_checked, shape_size, Ordering, Region, ShapeVector,
};

/// An N-dimensional array whose element type is chosen at runtime.
///
/// Cloning an array is cheap. Clones share their handle until one of them is mutated, at which point the mutated clone gets its own copy. Views are the exception: a view made with [`make_view`](#method.make_view) or [`mid`](#method.mid) aliases the buffer of the array it was made from, so writes through either are visible through the other.
#[derive(Clone, Default)]
pub struct Array {
	pub(crate) handle: SharedHandle,
}

impl fmt::Debug for Array {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Array")
			.field("kind", &self.kind())
			.field("data_type", &self.data_type())
			.field("shape", &self.shape())
			.finish()
	}
}

impl Array {
	/// Allocates an array of `shape` default elements of `data_type`. Returns the null array if the type is not registered or `shape` has too many dimensions.
	pub fn new(data_type: DataType, shape: &[isize]) -> Array {
		let shape = match ShapeVector::from_slice(shape) {
			Ok(shape) => shape,
			Err(_) => return Array::null(),
		};
		Array::from_shared(registry::create_handle(
			HandleKind::Dense,
			data_type,
			Some(&shape),
		))
	}

	pub fn null() -> Array {
		Array::default()
	}

	pub(crate) fn from_shared(handle: SharedHandle) -> Array {
		Array { handle }
	}

	pub fn from_handle(handle: Handle) -> Array {
		Array::from_shared(SharedHandle::new(handle))
	}

	/// Takes ownership of `data`, laid out in first-major order. Returns the null array if its length does not match `shape`.
	pub fn from_vec<T: Element>(data: Vec<T>, shape: &[isize]) -> Array {
		let shape = match ShapeVector::from_slice(shape) {
			Ok(shape) => shape,
			Err(_) => return Array::null(),
		};
		match DenseHandle::from_vec(data, shape) {
			Some(handle) => Array::from_handle(Handle::Dense(Box::new(handle))),
			None => Array::null(),
		}
	}

	/// Copies `data` into a new array.
	pub fn from_slice<T: Element>(data: &[T], shape: &[isize]) -> Array {
		Array::from_vec(data.to_vec(), shape)
	}

	/// Wraps memory owned by the caller. The deleter runs once no array refers to the memory any more.
	///
	/// # Safety
	///
	/// `ptr` must point to `shape_size(shape)` valid, initialized elements laid out in first-major order, and stay valid until the deleter runs or, without a deleter, for as long as any array shares it.
	pub unsafe fn from_foreign<T: Element>(
		ptr: *mut T,
		shape: &[isize],
		deleter: Option<Deleter>,
	) -> Array {
		let shape = match ShapeVector::from_slice(shape) {
			Ok(shape) => shape,
			Err(_) => return Array::null(),
		};
		Array::from_shared(registry::create_foreign_handle(ptr, shape, None, deleter))
	}

	/// Wraps memory owned by the caller without ever releasing it. `strides` defaults to first-major strides and may describe any non-negative layout, including last-major.
	///
	/// # Safety
	///
	/// `ptr` must be valid for every element `shape` and `strides` address for as long as any array shares it.
	pub unsafe fn make_pointer_view<T: Element>(
		ptr: *mut T,
		shape: &[isize],
		strides: Option<&[isize]>,
	) -> Array {
		let shape = match ShapeVector::from_slice(shape) {
			Ok(shape) => shape,
			Err(_) => return Array::null(),
		};
		let strides = match strides.map(ShapeVector::from_slice).transpose() {
			Ok(strides) => strides,
			Err(_) => return Array::null(),
		};
		match DenseHandle::from_foreign(ptr, shape, strides, None) {
			Some(handle) => {
				Array::from_handle(Handle::View(ViewHandle::whole(Box::new(handle))))
			}
			None => Array::null(),
		}
	}

	/// A view of the whole array. A view of a view is the same view. Making a view detaches this array from its clones first, so the view aliases only this array.
	pub fn make_view(&mut self) -> Array {
		if self.is_view() {
			return self.clone();
		}
		match self.handle.get_mut() {
			Some(Handle::Dense(storage)) if storage.has_data() => {
				// Nothing borrows the buffer while self is borrowed mutably, and typed views of a shared buffer copy it.
				let backing = unsafe { storage.share() };
				Array::from_handle(Handle::View(ViewHandle::whole(backing)))
			}
			Some(Handle::Multi(multi)) => multi
				.current_array_mut()
				.map(|array| array.make_view())
				.unwrap_or_default(),
			_ => Array::null(),
		}
	}

	/// A view of the sub-region starting at `start` with extent `shape`. The start is clamped into the array, missing dimensions start at zero, and missing or oversized extents take the rest of the array. Called on a view, the result is a view of the same buffer.
	pub fn mid(&mut self, start: &[isize], shape: Option<&[isize]>) -> Array {
		if self.is_empty() {
			return Array::null();
		}
		let region = Region::clamped(start, shape, &self.shape());
		if let Handle::View(view) = self.handle.get() {
			return Array::from_handle(Handle::View(view.sub_view(&region)));
		}
		match self.handle.get_mut() {
			Some(Handle::Dense(storage)) => {
				// See make_view.
				let backing = unsafe { storage.share() };
				Array::from_handle(Handle::View(ViewHandle::new(backing, region)))
			}
			Some(Handle::Multi(multi)) => multi
				.current_array_mut()
				.map(|array| array.mid(start, shape))
				.unwrap_or_default(),
			_ => Array::null(),
		}
	}

	pub fn kind(&self) -> HandleKind {
		self.handle.get().kind()
	}

	pub fn handle(&self) -> &Handle {
		self.handle.get()
	}

	pub fn shared_handle(&self) -> &SharedHandle {
		&self.handle
	}

	pub fn is_null(&self) -> bool {
		self.handle.is_null()
	}

	/// True for the null array and for arrays without elements.
	pub fn is_empty(&self) -> bool {
		self.size() <= 0
	}

	pub fn is_view(&self) -> bool {
		self.kind() == HandleKind::View
	}

	pub fn is_numeric(&self) -> bool {
		self.data_type().is_numeric()
	}

	pub fn is_complex(&self) -> bool {
		self.data_type().is_complex()
	}

	pub fn is_unstrided(&self) -> bool {
		self.handle.get().is_unstrided()
	}

	pub fn data_type(&self) -> DataType {
		self.handle.get().data_type()
	}

	pub fn data_name(&self) -> &'static str {
		self.handle.get().data_name()
	}

	pub fn data_size(&self) -> usize {
		self.handle.get().data_size()
	}

	pub fn shape(&self) -> ShapeVector {
		self.handle.get().shape()
	}

	pub fn strides(&self) -> ShapeVector {
		self.handle.get().strides()
	}

	pub fn ndim(&self) -> usize {
		self.shape().len()
	}

	pub fn size(&self) -> isize {
		self.handle.get().size()
	}

	/// A pointer to the first element, or null if the array has no data.
	pub fn data_ptr(&self) -> *const u8 {
		self.handle.get().data_ptr()
	}

	/// Like `data_ptr`, but detaches the array from its clones first so the data can be written.
	pub fn data_ptr_mut(&mut self) -> *mut u8 {
		match self.handle.get_mut().and_then(|handle| handle.target_mut()) {
			Some(target) => target.storage.element_ptr(target.offset) as *mut u8,
			None => std::ptr::null_mut(),
		}
	}

	/// Returns true if both arrays read from the same buffer.
	pub fn shares_storage_with(&self, other: &Array) -> bool {
		match (self.handle.get().storage(), other.handle.get().storage()) {
			(Some(a), Some(b)) => a.buffer_id() == b.buffer_id(),
			_ => false,
		}
	}

	/// A dense array owning a contiguous copy of the elements.
	pub fn copy(&self) -> Array {
		Array::from_handle(self.handle.get().copy())
	}

	/// This array if it is already dense, otherwise a dense copy.
	pub fn dense(&self) -> Array {
		match self.handle.get() {
			Handle::Dense(storage) if is_unstrided(storage.shape(), storage.strides()) => {
				self.clone()
			}
			_ => self.copy(),
		}
	}

	pub fn can_convert(&self, data_type: DataType) -> bool {
		self.can_export(data_type)
	}

	pub fn can_export(&self, data_type: DataType) -> bool {
		self.handle.get().can_export(data_type)
	}

	pub fn can_import(&self, data_type: DataType) -> bool {
		self.handle.get().can_import(data_type)
	}

	/// A new array of `data_type` holding the converted elements, or the null array if the conversion is not possible. Converting a dense array or an unstrided view to its own type shares it.
	pub fn convert(&self, data_type: DataType) -> Array {
		if self.is_empty() {
			return Array::null();
		}
		if data_type == self.data_type() {
			match self.handle.get() {
				Handle::Dense(_) => return self.clone(),
				Handle::View(view) if view.is_unstrided() => return self.clone(),
				_ => {}
			}
		}
		let mut converted = Array::new(data_type, &self.shape());
		if self.convert_into(&mut converted) {
			converted
		} else {
			Array::null()
		}
	}

	/// Converts all elements into `dst`, which must hold the same number of elements. On failure `dst` is left unmodified.
	pub fn convert_into(&self, dst: &mut Array) -> bool {
		if self.is_empty() || dst.is_empty() {
			return false;
		}
		let src_region = Region::full(&self.shape());
		let dst_region = Region::full(&dst.shape());
		match dst.handle.get_mut() {
			Some(dst) => self
				.handle
				.get()
				.export_data(&src_region, dst, &dst_region),
			None => false,
		}
	}

	/// Converts all elements of `src` into this array. The counterpart of `convert_into`.
	pub fn import(&mut self, src: &Array) -> bool {
		if self.is_empty() || src.is_empty() {
			return false;
		}
		let src_region = Region::full(&src.shape());
		let dst_region = Region::full(&self.shape());
		match self.handle.get_mut() {
			Some(dst) => dst.import_data(&dst_region, src.handle.get(), &src_region),
			None => false,
		}
	}

	/// Sets every element to `value`, converted to the element type.
	pub fn fill(&mut self, value: impl Into<Value>) -> bool {
		let region = Region::full(&self.shape());
		self.fill_region_with(&region, &value.into())
	}

	/// Sets every element of the sub-region starting at `start` with extent `shape`. Fails if the region does not fit.
	pub fn fill_region(&mut self, start: &[isize], shape: &[isize], value: impl Into<Value>) -> bool {
		let region = match (ShapeVector::from_slice(start), ShapeVector::from_slice(shape)) {
			(Ok(start), Ok(shape)) => Region::new(start, shape),
			_ => return false,
		};
		self.fill_region_with(&region, &value.into())
	}

	fn fill_region_with(&mut self, region: &Region, value: &Value) -> bool {
		match self.handle.get_mut() {
			Some(handle) => handle.fill(region, value),
			None => false,
		}
	}

	/// The element at `pos`, boxed. Returns `Value::Null` if `pos` is out of bounds.
	pub fn value(&self, pos: &[isize]) -> Value {
		self.handle.get().value(pos)
	}

	pub fn set_value(&mut self, pos: &[isize], value: impl Into<Value>) -> bool {
		let value = value.into();
		match self.handle.get_mut() {
			Some(handle) => handle.set_value(pos, &value),
			None => false,
		}
	}

	/// The element at `pos` if the array holds `T`s.
	pub fn get<T: Element>(&self, pos: &[isize]) -> Option<T> {
		if self.data_type() != T::DATA_TYPE {
			return None;
		}
		self.value(pos).to::<T>()
	}

	/// Sets the element at `pos` if the array holds `T`s.
	pub fn set<T: Element>(&mut self, pos: &[isize], value: T) -> bool {
		if self.data_type() != T::DATA_TYPE {
			return false;
		}
		self.set_value(pos, value.to_value())
	}

	/// The elements in first-major order, converted to `T`.
	pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
		if self.data_type() == T::DATA_TYPE {
			return self.view::<T>().map(|view| view.to_vec());
		}
		self.convert(T::DATA_TYPE)
			.view::<T>()
			.map(|view| view.to_vec())
	}

	/// The elements as `T`s. Returns `None` if the array is empty or holds another type. The elements are borrowed if this array is the only owner of its buffer. Views, and arrays whose buffer a view shares, hand out a first-major copy.
	pub fn view<T: Element>(&self) -> Option<ArrayView<'_, T>> {
		let handle = self.handle.get();
		let target = handle.target()?;
		let dense = target.storage.as_any().downcast_ref::<DenseHandle<T>>()?;
		if handle.is_exclusive() {
			if let Some(data) = dense.as_slice() {
				return Some(ArrayView {
					data: Cow::Borrowed(data.get(target.offset..)?),
					shape: target.shape,
					strides: *dense.strides(),
				});
			}
		}
		let data = dense.region_to_vec(target.offset, &target.shape)?;
		Some(ArrayView {
			data: Cow::Owned(data),
			shape: target.shape,
			strides: default_strides(&target.shape, Ordering::FirstMajor),
		})
	}

	/// Mutably borrows the elements as `T`s, detaching from clones first. Returns `None` for views and for arrays whose buffer a view shares. Write to those with `set` or `set_value`.
	pub fn view_mut<T: Element>(&mut self) -> Option<ArrayViewMut<'_, T>> {
		let handle = self.handle.get_mut()?;
		if !handle.is_exclusive() {
			return None;
		}
		let target = handle.target_mut()?;
		let offset = target.offset;
		let shape = target.shape;
		let storage = target.storage;
		let dense = storage.as_any_mut().downcast_mut::<DenseHandle<T>>()?;
		let strides = *dense.strides();
		Some(ArrayViewMut {
			data: dense.as_slice_mut()?.get_mut(offset..)?,
			shape,
			strides,
		})
	}

	/// Reinterprets the elements with a new shape of the same size. Fails on views, strided arrays and size changes.
	pub fn reshape(&mut self, shape: &[isize]) -> bool {
		let shape = match ShapeVector::from_slice(shape) {
			Ok(shape) => shape,
			Err(_) => return false,
		};
		if self.is_view() || !self.is_unstrided() || shape_size(&shape) != self.size() {
			return false;
		}
		match self.handle.get_mut() {
			Some(handle) => handle.reshape(&shape),
			None => false,
		}
	}

	/// Reallocates the array with `shape` default elements of its current type. Fails on the null array and on views.
	pub fn reset(&mut self, shape: &[isize]) -> bool {
		if self.data_type() == DataType::Null {
			return false;
		}
		let shape = match ShapeVector::from_slice(shape) {
			Ok(shape) => shape,
			Err(_) => return false,
		};
		if self.shape() == shape {
			return true;
		}
		if self.is_view() {
			return false;
		}
		match self.handle.get_mut() {
			Some(handle) => handle.realloc(&shape),
			None => false,
		}
	}

	/// Replaces the array with `shape` default elements of `data_type`. Fails on views.
	pub fn reset_with_type(&mut self, shape: &[isize], data_type: DataType) -> bool {
		let shape = match ShapeVector::from_slice(shape) {
			Ok(shape) => shape,
			Err(_) => return false,
		};
		if self.shape() == shape && self.data_type() == data_type {
			return true;
		}
		if self.is_view() {
			return false;
		}
		self.handle = registry::create_handle(HandleKind::Dense, data_type, Some(&shape));
		!self.handle.is_null()
	}

	/// Releases the handle, leaving the null array.
	pub fn clear(&mut self) {
		self.handle = SharedHandle::null();
	}

	/// A new array of the same type with `shape`, resampled from this one.
	pub fn resize(&self, shape: &[isize], interpolation: Interpolation) -> Array {
		if self.is_empty() {
			return Array::null();
		}
		if self.shape().as_slice() == shape {
			return self.clone();
		}
		let mut resized = Array::new(self.data_type(), shape);
		if self.resize_into(&mut resized, interpolation) {
			resized
		} else {
			Array::null()
		}
	}

	/// Resamples this array into `dst`, which must have the same number of dimensions. Arrays of the same shape are converted instead.
	pub fn resize_into(&self, dst: &mut Array, interpolation: Interpolation) -> bool {
		if self.is_empty() || dst.is_empty() {
			return false;
		}
		if self.shape() == dst.shape() {
			return self.convert_into(dst);
		}
		match dst.handle.get_mut() {
			Some(dst) => resize_handle(self.handle.get(), dst, interpolation),
			None => false,
		}
	}

	/// The real parts of a complex array as `Float64`. Other arrays are converted to `Float64`.
	pub fn to_real(&self) -> Array {
		self.complex_part(|value| value.re, |value| value)
	}

	/// The imaginary parts of a complex array as `Float64`. Other arrays give zeros.
	pub fn to_imag(&self) -> Array {
		self.complex_part(|value| value.im, |_| 0.0)
	}

	/// The arguments of a complex array as `Float64`. Other arrays give zeros.
	pub fn to_argument(&self) -> Array {
		self.complex_part(|value| value.arg(), |_| 0.0)
	}

	/// The magnitudes of a complex array as `Float64`. Other arrays are converted to `Float64`.
	pub fn to_amplitude(&self) -> Array {
		self.complex_part(|value| value.norm(), |value| value)
	}

	fn complex_part(&self, complex: fn(Complex64) -> f64, real: fn(f64) -> f64) -> Array {
		let shape = self.shape();
		let values = if self.is_complex() {
			self.to_vec::<Complex64>()
				.map(|values| values.into_iter().map(complex).collect::<Vec<_>>())
		} else {
			self.to_vec::<f64>()
				.map(|values| values.into_iter().map(real).collect::<Vec<_>>())
		};
		match values {
			Some(values) => Array::from_vec(values, &shape),
			None => Array::null(),
		}
	}
}

impl<T: Element> From<Vec<T>> for Array {
	/// A one dimensional array.
	fn from(data: Vec<T>) -> Array {
		let len = data.len() as isize;
		Array::from_vec(data, &[len])
	}
}

/// A typed view of an array's elements, borrowed or copied.
pub struct ArrayView<'a, T: Clone> {
	data: Cow<'a, [T]>,
	shape: ShapeVector,
	strides: ShapeVector,
}

impl<'a, T: Element> ArrayView<'a, T> {
	pub fn shape(&self) -> &ShapeVector {
		&self.shape
	}

	pub fn strides(&self) -> &ShapeVector {
		&self.strides
	}

	pub fn len(&self) -> usize {
		shape_size(&self.shape).max(0) as usize
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The buffer from the first element on. Elements are addressed in it with the strides.
	pub fn data(&self) -> &[T] {
		&self.data
	}

	pub fn get(&self, pos: &[isize]) -> Option<&T> {
		let offset = offset_checked(&self.shape, &self.strides, pos)?;
		self.data.get(offset as usize)
	}

	/// The elements as one slice, if they are contiguous.
	pub fn as_slice(&self) -> Option<&[T]> {
		if is_unstrided(&self.shape, &self.strides) {
			self.data.get(..self.len())
		} else {
			None
		}
	}

	/// Iterates the elements in first-major order.
	pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
		let data: &[T] = &self.data;
		let strides = self.strides;
		Coordinates::new(&self.shape, Ordering::FirstMajor)
			.map(move |pos| &data[flat_offset(&strides, &pos) as usize])
	}

	pub fn for_each<F: FnMut(&T)>(&self, f: F) -> bool {
		for_each(&self.data, &self.shape, &self.strides, f)
	}

	pub fn to_vec(&self) -> Vec<T> {
		let mut values = Vec::with_capacity(self.len());
		self.for_each(|value| values.push(value.clone()));
		values
	}
}

/// A mutably borrowed, typed view of an array's elements.
pub struct ArrayViewMut<'a, T> {
	data: &'a mut [T],
	shape: ShapeVector,
	strides: ShapeVector,
}

impl<'a, T: Element> ArrayViewMut<'a, T> {
	pub fn shape(&self) -> &ShapeVector {
		&self.shape
	}

	pub fn strides(&self) -> &ShapeVector {
		&self.strides
	}

	pub fn len(&self) -> usize {
		shape_size(&self.shape).max(0) as usize
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, pos: &[isize]) -> Option<&T> {
		let offset = offset_checked(&self.shape, &self.strides, pos)?;
		self.data.get(offset as usize)
	}

	pub fn get_mut(&mut self, pos: &[isize]) -> Option<&mut T> {
		let offset = offset_checked(&self.shape, &self.strides, pos)?;
		self.data.get_mut(offset as usize)
	}

	pub fn set(&mut self, pos: &[isize], value: T) -> bool {
		match self.get_mut(pos) {
			Some(slot) => {
				*slot = value;
				true
			}
			None => false,
		}
	}

	pub fn as_slice_mut(&mut self) -> Option<&mut [T]> {
		if is_unstrided(&self.shape, &self.strides) {
			let len = self.len();
			self.data.get_mut(..len)
		} else {
			None
		}
	}

	pub fn for_each_mut<F: FnMut(&mut T)>(&mut self, f: F) -> bool {
		for_each_mut(self.data, &self.shape, &self.strides, f)
	}

	/// Replaces every element with `f` applied to it.
	pub fn map_inplace<F: FnMut(&T) -> T>(&mut self, f: F) -> bool {
		inplace_transform(self.data, &self.shape, &self.strides, f)
	}

	pub fn fill(&mut self, value: T) -> bool {
		self.for_each_mut(|slot| *slot = value.clone())
	}
}

#[test]
fn test_new_arrays() {
	for data_type in DataType::BUILTIN.iter().copied() {
		let array = Array::new(data_type, &[2, 3]);
		assert_eq!(array.data_type(), data_type);
		assert_eq!(array.shape(), [2, 3]);
		assert_eq!(array.size(), 6);
		assert!(!array.is_null());
		assert_eq!(array.data_size(), data_type.size_of().unwrap());
	}
	let null = Array::null();
	assert!(null.is_null());
	assert!(null.is_empty());
	assert_eq!(null.data_size(), 1);
	assert_eq!(null.data_type(), DataType::Null);
	assert!(null.data_ptr().is_null());
	assert!(Array::new(DataType::Null, &[2]).is_null());
	assert!(Array::new(DataType::Float64, &[1, 1, 1, 1, 1, 1, 1, 1, 1]).is_null());
	insta::assert_debug_snapshot!(Array::new(DataType::Int16, &[4, 5]), @r###"
 Array {
     kind: Dense,
     data_type: Int16,
     shape: [
         4,
         5,
     ],
 }
 "###);
}

#[test]
fn test_copy_on_write() {
	let mut a = Array::from_vec((0..6).collect::<Vec<i32>>(), &[2, 3]);
	let mut b = a.clone();
	assert!(a.shared_handle().ptr_eq(b.shared_handle()));
	assert!(a.shares_storage_with(&b));
	assert!(b.set(&[1, 2], 50));
	assert!(!a.shared_handle().ptr_eq(b.shared_handle()));
	assert!(!a.shares_storage_with(&b));
	assert_eq!(a.get::<i32>(&[1, 2]), Some(5));
	assert_eq!(b.get::<i32>(&[1, 2]), Some(50));
	// The sole owner mutates in place.
	let before = a.data_ptr();
	assert!(a.fill(1.9f64));
	assert_eq!(a.data_ptr(), before);
	assert_eq!(a.to_vec::<i32>(), Some(vec![1; 6]));
}

#[test]
fn test_views_alias() {
	let mut a = Array::from_vec((0..12).collect::<Vec<u8>>(), &[3, 4]);
	let mut view = a.mid(&[1, 1], Some(&[2, 2][..]));
	assert!(view.is_view());
	assert_eq!(view.shape(), [2, 2]);
	assert_eq!(view.to_vec::<u8>(), Some(vec![5, 6, 9, 10]));
	assert!(a.set(&[2, 2], 100u8));
	assert_eq!(view.get::<u8>(&[1, 1]), Some(100));
	assert!(view.set_value(&[0, 0], 55));
	assert_eq!(a.get::<u8>(&[1, 1]), Some(55));
	// A view of a view composes the starts.
	let inner = view.mid(&[1, 0], None);
	assert_eq!(inner.shape(), [1, 2]);
	assert_eq!(inner.to_vec::<u8>(), Some(vec![9, 100]));
	// Starts are clamped and missing extents take the rest.
	let clamped = a.mid(&[5, -1], None);
	assert_eq!(clamped.shape(), [1, 4]);
	assert_eq!(clamped.to_vec::<u8>(), Some(vec![8, 9, 100, 11]));
	assert!(!view.reshape(&[4]));
	assert!(!view.reset(&[3, 3]));
	assert!(Array::null().mid(&[0], None).is_null());
}

#[test]
fn test_last_major_pointer_view() {
	let mut data = [0i32, 1, 2, 3, 4, 5];
	let array = unsafe { Array::make_pointer_view(data.as_mut_ptr(), &[2, 3], Some(&[1, 2][..])) };
	assert!(array.is_view());
	assert!(!array.is_unstrided());
	assert_eq!(array.to_vec::<i32>(), Some(vec![0, 2, 4, 1, 3, 5]));
	// A dense copy reads back in first-major order and no longer aliases the buffer.
	let copy = array.copy();
	assert_eq!(copy.kind(), HandleKind::Dense);
	assert!(copy.is_unstrided());
	let values = copy.view::<i32>().unwrap().as_slice().unwrap().to_vec();
	assert_eq!(values, vec![0, 2, 4, 1, 3, 5]);
	assert!(!copy.shares_storage_with(&array));
	// Row-major values written into last-major memory.
	let mut memory = [0i32; 6];
	let strides = tessera_shape::default_strides(&tessera_shape::shape![2, 3], Ordering::LastMajor);
	let mut last_major =
		unsafe { Array::make_pointer_view(memory.as_mut_ptr(), &[2, 3], Some(strides.as_slice())) };
	assert!(last_major.import(&Array::from_vec((0..6).collect::<Vec<i32>>(), &[2, 3])));
	drop(last_major);
	assert_eq!(memory, [0, 3, 1, 4, 2, 5]);
}

#[test]
fn test_convert() {
	let array = Array::from_vec(vec![1.5f64, -2.5, 300.0], &[3]);
	let converted = array.convert(DataType::UInt8);
	assert_eq!(converted.data_type(), DataType::UInt8);
	assert_eq!(converted.to_vec::<u8>(), Some(vec![1, 0, 255]));
	let text = array.convert(DataType::String);
	assert_eq!(
		text.to_vec::<String>(),
		Some(vec!["1.5".to_owned(), "-2.5".to_owned(), "300.0".to_owned()])
	);
	assert_eq!(text.convert(DataType::Float64).to_vec::<f64>(), array.to_vec::<f64>());
	// Converting to the same type shares the handle.
	assert!(array.convert(DataType::Float64).shared_handle().ptr_eq(array.shared_handle()));
	let complex = array.convert(DataType::Complex64);
	assert!(complex.convert(DataType::Float64).is_null());
	let mut dst = Array::from_vec(vec![9.0f64; 3], &[3]);
	assert!(!complex.convert_into(&mut dst));
	assert_eq!(dst.to_vec::<f64>(), Some(vec![9.0; 3]));
	assert!(!Array::from_vec(vec![1i8, 2], &[2]).convert_into(&mut dst));
	assert!(dst.import(&Array::from_vec(vec![7i64, 8, 9], &[3])));
	assert_eq!(dst.to_vec::<f64>(), Some(vec![7.0, 8.0, 9.0]));
}

#[test]
fn test_import_overlapping_view() {
	let mut a = Array::from_vec((0..5).collect::<Vec<i64>>(), &[5]);
	let source = a.mid(&[0], Some(&[4][..]));
	let mut destination = a.mid(&[1], Some(&[4][..]));
	assert!(destination.import(&source));
	assert_eq!(a.to_vec::<i64>(), Some(vec![0, 0, 1, 2, 3]));
	assert!(a.reshape(&[5, 1]));
	assert!(!a.reshape(&[2, 2]));
}

#[test]
fn test_fill_region_idempotent() {
	let mut a = Array::new(DataType::Float32, &[3, 3]);
	assert!(a.fill_region(&[1, 1], &[2, 2], 2.5f32));
	let once = a.to_vec::<f32>();
	assert!(a.fill_region(&[1, 1], &[2, 2], 2.5f32));
	assert_eq!(a.to_vec::<f32>(), once);
	assert_eq!(
		once,
		Some(vec![0.0, 0.0, 0.0, 0.0, 2.5, 2.5, 0.0, 2.5, 2.5])
	);
	assert!(!a.fill_region(&[2, 2], &[2, 2], 1.0f32));
	assert!(!a.fill(crate::Rgba::default()));
	assert!(!Array::null().fill(1));
}

#[test]
fn test_reset_and_clear() {
	let mut a = Array::new(DataType::Int8, &[2]);
	assert!(a.reset(&[4, 4]));
	assert_eq!(a.shape(), [4, 4]);
	assert_eq!(a.data_type(), DataType::Int8);
	assert!(a.reset_with_type(&[3], DataType::Rgba));
	assert_eq!(a.data_type(), DataType::Rgba);
	assert_eq!(a.size(), 3);
	a.clear();
	assert!(a.is_null());
	assert!(!a.reset(&[2]));
	assert!(a.reset_with_type(&[2], DataType::Bool));
	assert!(!a.reset_with_type(&[2], DataType::User(5000)));
}

#[test]
fn test_resize() {
	let a = Array::from_vec(vec![0u16, 10, 20, 30], &[4]);
	let resized = a.resize(&[7], Interpolation::Linear);
	assert_eq!(resized.data_type(), DataType::UInt16);
	assert_eq!(resized.to_vec::<u16>(), Some(vec![0, 5, 10, 15, 20, 25, 30]));
	let mut complex = Array::new(DataType::Complex32, &[2]);
	assert!(a.resize_into(&mut complex, Interpolation::Nearest));
	assert_eq!(
		complex.to_vec::<crate::Complex32>(),
		Some(vec![crate::Complex32::new(0.0, 0.0), crate::Complex32::new(30.0, 0.0)])
	);
	let mut real = Array::new(DataType::Float64, &[3]);
	assert!(!complex.resize_into(&mut real, Interpolation::Linear));
	assert!(Array::from_vec(vec!["a".to_owned()], &[1]).resize(&[2], Interpolation::Linear).is_null());
	assert!(a.resize(&[2, 2], Interpolation::Linear).is_null());
}

#[test]
fn test_complex_parts() {
	let a = Array::from_vec(
		vec![Complex64::new(3.0, 4.0), Complex64::new(0.0, -1.0)],
		&[2],
	);
	assert_eq!(a.to_real().to_vec::<f64>(), Some(vec![3.0, 0.0]));
	assert_eq!(a.to_imag().to_vec::<f64>(), Some(vec![4.0, -1.0]));
	assert_eq!(a.to_amplitude().to_vec::<f64>(), Some(vec![5.0, 1.0]));
	assert_eq!(
		a.to_argument().to_vec::<f64>(),
		Some(vec![4.0f64.atan2(3.0), -std::f64::consts::FRAC_PI_2])
	);
	let b = Array::from(vec![-2i32, 2]);
	assert_eq!(b.to_real().data_type(), DataType::Float64);
	assert_eq!(b.to_amplitude().to_vec::<f64>(), Some(vec![-2.0, 2.0]));
	assert_eq!(b.to_imag().to_vec::<f64>(), Some(vec![0.0, 0.0]));
}

#[test]
fn test_typed_views() {
	let mut a = Array::from_vec((1..=6).collect::<Vec<i64>>(), &[2, 3]);
	assert!(a.view::<i32>().is_none());
	{
		let mut view = a.view_mut::<i64>().unwrap();
		assert!(view.map_inplace(|value| value * 10));
		assert!(!view.set(&[2, 0], 1));
	}
	let view = a.view::<i64>().unwrap();
	assert_eq!(view.len(), 6);
	assert_eq!(view.iter().copied().collect::<Vec<_>>(), vec![10, 20, 30, 40, 50, 60]);
	assert_eq!(view.get(&[1, 0]), Some(&40));
	let column = a.mid(&[0, 1], Some(&[2, 1][..]));
	let column_view = column.view::<i64>().unwrap();
	assert_eq!(column_view.as_slice(), Some(&[20, 50][..]));
	assert_eq!(column_view.to_vec(), vec![20, 50]);
	assert_eq!(a.value(&[0, 2]), Value::Int64(30));
	assert_eq!(a.value(&[0, 3]), Value::Null);
}

#[test]
fn test_typed_views_of_shared_buffers() {
	let mut a = Array::from_vec(vec![1i32, 2, 3, 4], &[4]);
	assert_eq!(a.view::<i32>().unwrap().data().as_ptr() as *const u8, a.data_ptr());
	let mut view = a.make_view();
	assert!(a.view_mut::<i32>().is_none());
	assert!(view.view_mut::<i32>().is_none());
	let snapshot = a.view::<i32>().unwrap();
	assert_ne!(snapshot.data().as_ptr() as *const u8, a.data_ptr());
	assert!(view.set(&[0], 99));
	assert_eq!(snapshot.data(), &[1, 2, 3, 4]);
	assert_eq!(a.get::<i32>(&[0]), Some(99));
	assert_eq!(view.to_vec::<i32>(), Some(vec![99, 2, 3, 4]));
	drop(view);
	assert!(a.view_mut::<i32>().is_some());
	let mut b = a.clone();
	let mut b_view = b.make_view();
	assert!(b_view.set(&[1], -1));
	assert_eq!(a.get::<i32>(&[1]), Some(2));
	assert_eq!(b.get::<i32>(&[1]), Some(-1));
	assert!(!a.shares_storage_with(&b));
}
