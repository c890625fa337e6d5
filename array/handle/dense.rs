use crate::{DataType, Element, Precision, SliceMut, SliceRef, Value};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::{
	any::Any,
	cell::UnsafeCell,
	io::{self, Read, Write},
	ops::{Deref, DerefMut},
	sync::Arc,
};
use tessera_iter::{for_each, for_each_mut, region_fits, transform};
use tessera_shape::{default_strides, required_len, shape_size, Ordering, ShapeVector};

/// Called with the buffer pointer when the last handle to a foreign buffer is dropped.
pub type Deleter = Box<dyn FnOnce(*mut u8) + Send>;

enum Storage<T> {
	Owned(Vec<T>),
	Foreign {
		ptr: *mut T,
		len: usize,
		deleter: Option<Deleter>,
	},
}

/// The element buffer of a dense handle. Views share it with the handle they were made from and write through it directly. Every access from a handle goes through the lock, so aliasing handles on different threads do not race.
pub(crate) struct Buffer<T> {
	lock: RwLock<()>,
	foreign: bool,
	storage: UnsafeCell<Storage<T>>,
}

unsafe impl<T: Send + Sync> Send for Buffer<T> {}
unsafe impl<T: Send + Sync> Sync for Buffer<T> {}

impl<T> Buffer<T> {
	fn new(storage: Storage<T>) -> Buffer<T> {
		Buffer {
			lock: RwLock::new(()),
			foreign: matches!(storage, Storage::Foreign { .. }),
			storage: UnsafeCell::new(storage),
		}
	}

	unsafe fn as_slice(&self) -> &[T] {
		match &*self.storage.get() {
			Storage::Owned(data) => data.as_slice(),
			Storage::Foreign { len: 0, .. } => &[],
			Storage::Foreign { ptr, len, .. } => std::slice::from_raw_parts(*ptr, *len),
		}
	}

	#[allow(clippy::mut_from_ref)]
	unsafe fn as_mut_slice(&self) -> &mut [T] {
		match &mut *self.storage.get() {
			Storage::Owned(data) => data.as_mut_slice(),
			Storage::Foreign { len: 0, .. } => &mut [],
			Storage::Foreign { ptr, len, .. } => std::slice::from_raw_parts_mut(*ptr, *len),
		}
	}

	fn read(&self) -> BufferRead<'_, T> {
		let guard = self.lock.read();
		BufferRead {
			data: unsafe { self.as_slice() },
			_guard: Some(guard),
		}
	}

	fn write(&self) -> BufferWrite<'_, T> {
		let guard = self.lock.write();
		BufferWrite {
			data: unsafe { self.as_mut_slice() },
			_guard: Some(guard),
		}
	}
}

impl<T> Drop for Buffer<T> {
	fn drop(&mut self) {
		if let Storage::Foreign { ptr, deleter, .. } = self.storage.get_mut() {
			if let Some(deleter) = deleter.take() {
				deleter(*ptr as *mut u8);
			}
		}
	}
}

struct BufferRead<'a, T> {
	data: &'a [T],
	_guard: Option<RwLockReadGuard<'a, ()>>,
}

impl<'a, T> Deref for BufferRead<'a, T> {
	type Target = [T];
	fn deref(&self) -> &[T] {
		self.data
	}
}

struct BufferWrite<'a, T> {
	data: &'a mut [T],
	_guard: Option<RwLockWriteGuard<'a, ()>>,
}

impl<'a, T> Deref for BufferWrite<'a, T> {
	type Target = [T];
	fn deref(&self) -> &[T] {
		self.data
	}
}

impl<'a, T> DerefMut for BufferWrite<'a, T> {
	fn deref_mut(&mut self) -> &mut [T] {
		self.data
	}
}

/// The type-erased interface of [`DenseHandle`](struct.DenseHandle.html). Regions are given as the offset of their first element in the buffer and their shape. They are laid out with the handle's strides.
pub trait DenseStorage: Send + Sync {
	fn data_type(&self) -> DataType;
	fn data_name(&self) -> &'static str;
	fn data_size(&self) -> usize;
	fn shape(&self) -> &ShapeVector;
	fn strides(&self) -> &ShapeVector;
	fn has_data(&self) -> bool;
	fn is_foreign(&self) -> bool;
	/// A new handle owning a contiguous copy of the region.
	fn copy_region(&self, offset: usize, shape: &ShapeVector) -> Box<dyn DenseStorage>;
	/// True if another handle shares the buffer.
	fn is_shared(&self) -> bool;
	/// A new handle over the same buffer. Writes through either handle are visible through the other.
	///
	/// # Safety
	///
	/// Slices borrowed from a [`DenseHandle`](struct.DenseHandle.html) with `as_slice` or `as_slice_mut` must not be alive while the buffer is shared.
	unsafe fn share(&self) -> Box<dyn DenseStorage>;
	/// A handle of the same element type allocated with `shape`.
	fn allocate(&self, shape: &ShapeVector) -> Box<dyn DenseStorage>;
	/// Drops the buffer and allocates `shape` default elements.
	fn realloc(&mut self, shape: &ShapeVector);
	fn set_layout(&mut self, shape: ShapeVector, strides: ShapeVector);
	/// The address of the start of the buffer, which identifies it.
	fn buffer_id(&self) -> usize;
	fn element_ptr(&self, offset: usize) -> *const u8;
	/// Calls `f` with the whole buffer, type-erased, holding the buffer's read lock.
	fn read_slice(&self, f: &mut dyn FnMut(SliceRef<'_>) -> bool) -> bool;
	/// Calls `f` with the whole buffer, type-erased and writable, holding the buffer's write lock.
	fn write_slice(&mut self, f: &mut dyn FnMut(SliceMut<'_>) -> bool) -> bool;
	fn value(&self, offset: usize) -> Value;
	fn set_value(&mut self, offset: usize, value: &Value) -> bool;
	fn fill(&mut self, offset: usize, shape: &[isize], value: &Value) -> bool;
	fn write_binary(&self, offset: usize, shape: &[isize], writer: &mut dyn Write) -> io::Result<()>;
	fn read_binary(
		&mut self,
		offset: usize,
		shape: &[isize],
		reader: &mut dyn Read,
		precision: Precision,
	) -> io::Result<()>;
	/// Reads `shape` elements from a binary stream into a new handle of the same element type. The buffer grows as elements arrive, so a truncated stream fails before a large allocation is made.
	fn read_new(
		&self,
		shape: &ShapeVector,
		reader: &mut dyn Read,
		precision: Precision,
	) -> io::Result<Box<dyn DenseStorage>>;
	fn write_text(
		&self,
		offset: usize,
		shape: &[isize],
		writer: &mut dyn Write,
		separator: &str,
	) -> io::Result<()>;
	fn as_any(&self) -> &dyn Any;
	fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A buffer of elements of type `T` with a shape and strides. The buffer is either owned or foreign memory handed over by the caller.
pub struct DenseHandle<T> {
	shape: ShapeVector,
	strides: ShapeVector,
	buffer: Option<Arc<Buffer<T>>>,
}

impl<T: Element> Default for DenseHandle<T> {
	fn default() -> DenseHandle<T> {
		DenseHandle::new()
	}
}

impl<T: Element> DenseHandle<T> {
	/// A handle with no shape and no buffer. This is the prototype the registry holds.
	pub fn new() -> DenseHandle<T> {
		DenseHandle {
			shape: ShapeVector::new(),
			strides: ShapeVector::new(),
			buffer: None,
		}
	}

	pub fn zeros(shape: &ShapeVector) -> DenseHandle<T> {
		let mut handle = DenseHandle::new();
		handle.realloc_typed(shape);
		handle
	}

	/// Takes ownership of `data` laid out in first-major order. Returns `None` if its length is not the size of `shape`.
	pub fn from_vec(data: Vec<T>, shape: ShapeVector) -> Option<DenseHandle<T>> {
		if shape_size(&shape) <= 0 || data.len() != shape_size(&shape) as usize {
			return None;
		}
		Some(DenseHandle {
			strides: default_strides(&shape, Ordering::FirstMajor),
			shape,
			buffer: Some(Arc::new(Buffer::new(Storage::Owned(data)))),
		})
	}

	/// Wraps a buffer the handle does not own. `strides` defaults to first-major strides. The deleter, if any, runs when the last handle sharing the buffer is dropped.
	///
	/// # Safety
	///
	/// `ptr` must be valid for reads and writes of every element the shape and strides address, for as long as any handle sharing the buffer is alive.
	pub unsafe fn from_foreign(
		ptr: *mut T,
		shape: ShapeVector,
		strides: Option<ShapeVector>,
		deleter: Option<Deleter>,
	) -> Option<DenseHandle<T>> {
		let strides = strides.unwrap_or_else(|| default_strides(&shape, Ordering::FirstMajor));
		if ptr.is_null() || strides.len() != shape.len() || shape_size(&shape) <= 0 {
			return None;
		}
		let len = required_len(&shape, &strides)?;
		Some(DenseHandle {
			shape,
			strides,
			buffer: Some(Arc::new(Buffer::new(Storage::Foreign {
				ptr,
				len,
				deleter,
			}))),
		})
	}

	/// True if no other handle shares the buffer.
	pub fn is_exclusive(&self) -> bool {
		self.buffer
			.as_ref()
			.map(|buffer| Arc::strong_count(buffer) == 1)
			.unwrap_or(true)
	}

	/// The buffer, if no other handle shares it.
	pub fn as_slice(&self) -> Option<&[T]> {
		if !self.is_exclusive() {
			return None;
		}
		// An exclusive buffer is only written through `&mut self`.
		Some(match &self.buffer {
			Some(buffer) => unsafe { buffer.as_slice() },
			None => &[],
		})
	}

	/// The buffer, writable, if no other handle shares it.
	pub fn as_slice_mut(&mut self) -> Option<&mut [T]> {
		if !self.is_exclusive() {
			return None;
		}
		Some(match &self.buffer {
			Some(buffer) => unsafe { buffer.as_mut_slice() },
			None => &mut [],
		})
	}

	/// The elements of the region starting at `offset` with extent `shape`, copied in first-major order.
	pub fn region_to_vec(&self, offset: usize, shape: &[isize]) -> Option<Vec<T>> {
		let data = self.read();
		let src = region(&*data, offset, shape, &self.strides)?;
		let mut values = Vec::with_capacity(shape_size(shape).max(0) as usize);
		for_each(src, shape, &self.strides, |value| values.push(value.clone()));
		Some(values)
	}

	fn read(&self) -> BufferRead<'_, T> {
		match &self.buffer {
			Some(buffer) => buffer.read(),
			None => BufferRead {
				data: &[],
				_guard: None,
			},
		}
	}

	fn write(&mut self) -> BufferWrite<'_, T> {
		match &self.buffer {
			Some(buffer) => buffer.write(),
			None => BufferWrite {
				data: &mut [],
				_guard: None,
			},
		}
	}

	fn realloc_typed(&mut self, shape: &ShapeVector) {
		let size = shape_size(shape);
		self.shape = *shape;
		self.strides = default_strides(shape, Ordering::FirstMajor);
		self.buffer = if size > 0 {
			let data = vec![T::default(); size as usize];
			Some(Arc::new(Buffer::new(Storage::Owned(data))))
		} else {
			None
		};
	}
}

fn region<'a, T>(data: &'a [T], offset: usize, shape: &[isize], strides: &[isize]) -> Option<&'a [T]> {
	let data = data.get(offset..)?;
	if region_fits(data.len(), shape, strides) {
		Some(data)
	} else {
		None
	}
}

fn region_mut<'a, T>(
	data: &'a mut [T],
	offset: usize,
	shape: &[isize],
	strides: &[isize],
) -> Option<&'a mut [T]> {
	let data = data.get_mut(offset..)?;
	if region_fits(data.len(), shape, strides) {
		Some(data)
	} else {
		None
	}
}

/// The most elements `read_new` allocates for before any have been read.
const READ_CAPACITY: usize = 1 << 16;

fn invalid_region() -> io::Error {
	io::Error::new(io::ErrorKind::InvalidInput, "the region does not fit the array")
}

impl<T: Element> DenseStorage for DenseHandle<T> {
	fn data_type(&self) -> DataType {
		T::DATA_TYPE
	}

	fn data_name(&self) -> &'static str {
		T::name()
	}

	fn data_size(&self) -> usize {
		std::mem::size_of::<T>()
	}

	fn shape(&self) -> &ShapeVector {
		&self.shape
	}

	fn strides(&self) -> &ShapeVector {
		&self.strides
	}

	fn has_data(&self) -> bool {
		self.buffer.is_some()
	}

	fn is_foreign(&self) -> bool {
		self.buffer
			.as_ref()
			.map(|buffer| buffer.foreign)
			.unwrap_or(false)
	}

	fn copy_region(&self, offset: usize, shape: &ShapeVector) -> Box<dyn DenseStorage> {
		let mut copy = DenseHandle::<T>::zeros(shape);
		let dst_strides = copy.strides;
		let src = self.read();
		if let Some(src) = region(&*src, offset, shape, &self.strides) {
			transform(
				src,
				shape,
				&self.strides,
				&mut *copy.write(),
				shape,
				&dst_strides,
				|value| value.clone(),
			);
		}
		Box::new(copy)
	}

	fn is_shared(&self) -> bool {
		!self.is_exclusive()
	}

	unsafe fn share(&self) -> Box<dyn DenseStorage> {
		Box::new(DenseHandle {
			shape: self.shape,
			strides: self.strides,
			buffer: self.buffer.clone(),
		})
	}

	fn allocate(&self, shape: &ShapeVector) -> Box<dyn DenseStorage> {
		Box::new(DenseHandle::<T>::zeros(shape))
	}

	fn realloc(&mut self, shape: &ShapeVector) {
		self.realloc_typed(shape);
	}

	fn set_layout(&mut self, shape: ShapeVector, strides: ShapeVector) {
		self.shape = shape;
		self.strides = strides;
	}

	fn buffer_id(&self) -> usize {
		self.read().as_ptr() as usize
	}

	fn element_ptr(&self, offset: usize) -> *const u8 {
		match self.read().get(offset) {
			Some(element) => element as *const T as *const u8,
			None => std::ptr::null(),
		}
	}

	fn read_slice(&self, f: &mut dyn FnMut(SliceRef<'_>) -> bool) -> bool {
		let data = self.read();
		f(SliceRef::new(&*data))
	}

	fn write_slice(&mut self, f: &mut dyn FnMut(SliceMut<'_>) -> bool) -> bool {
		let mut data = self.write();
		f(SliceMut::new(&mut *data))
	}

	fn value(&self, offset: usize) -> Value {
		self.read()
			.get(offset)
			.map(|value| value.to_value())
			.unwrap_or(Value::Null)
	}

	fn set_value(&mut self, offset: usize, value: &Value) -> bool {
		let value = match value.to::<T>() {
			Some(value) => value,
			None => return false,
		};
		match self.write().get_mut(offset) {
			Some(slot) => {
				*slot = value;
				true
			}
			None => false,
		}
	}

	fn fill(&mut self, offset: usize, shape: &[isize], value: &Value) -> bool {
		let value = match value.to::<T>() {
			Some(value) => value,
			None => return false,
		};
		let strides = self.strides;
		let mut data = self.write();
		match region_mut(&mut *data, offset, shape, &strides) {
			Some(data) => for_each_mut(data, shape, &strides, |slot| *slot = value.clone()),
			None => false,
		}
	}

	fn write_binary(&self, offset: usize, shape: &[isize], writer: &mut dyn Write) -> io::Result<()> {
		let data = self.read();
		let data = region(&*data, offset, shape, &self.strides).ok_or_else(invalid_region)?;
		let mut result = Ok(());
		for_each(data, shape, &self.strides, |value| {
			if result.is_ok() {
				result = value.write_binary(writer);
			}
		});
		result
	}

	fn read_binary(
		&mut self,
		offset: usize,
		shape: &[isize],
		reader: &mut dyn Read,
		precision: Precision,
	) -> io::Result<()> {
		let strides = self.strides;
		let mut data = self.write();
		let data = region_mut(&mut *data, offset, shape, &strides).ok_or_else(invalid_region)?;
		let mut result = Ok(());
		for_each_mut(data, shape, &strides, |slot| {
			if result.is_ok() {
				match T::read_binary(reader, precision) {
					Ok(value) => *slot = value,
					Err(error) => result = Err(error),
				}
			}
		});
		result
	}

	fn read_new(
		&self,
		shape: &ShapeVector,
		reader: &mut dyn Read,
		precision: Precision,
	) -> io::Result<Box<dyn DenseStorage>> {
		let size = shape_size(shape).max(0) as usize;
		let mut data = Vec::with_capacity(size.min(READ_CAPACITY));
		for _ in 0..size {
			data.push(T::read_binary(reader, precision)?);
		}
		match DenseHandle::from_vec(data, *shape) {
			Some(handle) => Ok(Box::new(handle)),
			None => Err(invalid_region()),
		}
	}

	fn write_text(
		&self,
		offset: usize,
		shape: &[isize],
		writer: &mut dyn Write,
		separator: &str,
	) -> io::Result<()> {
		let data = self.read();
		let data = region(&*data, offset, shape, &self.strides).ok_or_else(invalid_region)?;
		let mut result = Ok(());
		for_each(data, shape, &self.strides, |value| {
			if result.is_ok() {
				result = writer
					.write_all(value.to_text().as_bytes())
					.and_then(|_| writer.write_all(separator.as_bytes()));
			}
		});
		result
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

#[test]
fn test_dense_handle() {
	let mut handle = DenseHandle::<i16>::zeros(&tessera_shape::shape![2, 3]);
	assert_eq!(handle.as_slice().unwrap(), &[0; 6]);
	assert_eq!(handle.strides, [3, 1]);
	assert!(handle.fill(1, &[2, 2], &Value::from(7i32)));
	assert_eq!(handle.as_slice().unwrap(), &[0, 7, 7, 0, 7, 7]);
	assert!(handle.set_value(0, &Value::from("-3")));
	assert_eq!(handle.value(0), Value::Int16(-3));
	assert!(!handle.set_value(0, &Value::from(crate::Rgba::default())));
	let copy = handle.copy_region(1, &tessera_shape::shape![2, 2]);
	let copy = copy.as_any().downcast_ref::<DenseHandle<i16>>().unwrap();
	assert_eq!(copy.as_slice().unwrap(), &[7, 7, 7, 7]);
	assert_eq!(handle.as_slice(), Some(&[-3, 7, 7, 0, 7, 7][..]));
	let shared = unsafe { handle.share() };
	assert!(handle.is_shared());
	assert_eq!(handle.as_slice(), None);
	assert!(handle.as_slice_mut().is_none());
	assert_eq!(shared.buffer_id(), handle.buffer_id());
	handle.realloc(&tessera_shape::shape![4]);
	assert_ne!(shared.buffer_id(), handle.buffer_id());
	assert_eq!(shared.value(1), Value::Int16(7));
}

#[test]
fn test_foreign_buffer_deleter() {
	use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
	static DELETED: AtomicUsize = AtomicUsize::new(0);
	let mut data = vec![1.0f64, 2.0, 3.0, 4.0].into_boxed_slice();
	let ptr = data.as_mut_ptr();
	std::mem::forget(data);
	let handle = unsafe {
		DenseHandle::from_foreign(
			ptr,
			tessera_shape::shape![2, 2],
			None,
			Some(Box::new(|ptr: *mut u8| {
				drop(Box::from_raw(std::slice::from_raw_parts_mut(ptr as *mut f64, 4)));
				DELETED.fetch_add(1, AtomicOrdering::SeqCst);
			})),
		)
	}
	.unwrap();
	assert!(handle.is_foreign());
	let shared = unsafe { handle.share() };
	drop(handle);
	assert_eq!(DELETED.load(AtomicOrdering::SeqCst), 0);
	assert_eq!(shared.value(3), Value::Float64(4.0));
	drop(shared);
	assert_eq!(DELETED.load(AtomicOrdering::SeqCst), 1);
}

#[test]
fn test_shared_buffer_across_threads() {
	let handle = DenseHandle::<u32>::zeros(&tessera_shape::shape![64]);
	let mut shared = unsafe { handle.share() };
	let writer = std::thread::spawn(move || {
		for offset in 0..64 {
			assert!(shared.set_value(offset, &Value::from(1u32)));
		}
		shared
	});
	for _ in 0..64 {
		let value = handle.value(0);
		assert!(value == Value::UInt32(0) || value == Value::UInt32(1));
	}
	let shared = writer.join().unwrap();
	assert_eq!(shared.value(63), Value::UInt32(1));
	assert_eq!(handle.value(0), Value::UInt32(1));
}
