use std::{any::TypeId, marker::PhantomData, slice};

/// A shared slice whose element type is only known at runtime. It can only be recovered as the type it was created from.
#[derive(Clone, Copy)]
pub struct SliceRef<'a> {
	ptr: *const u8,
	len: usize,
	element_size: usize,
	type_id: TypeId,
	marker: PhantomData<&'a ()>,
}

impl<'a> SliceRef<'a> {
	pub fn new<T: 'static>(slice: &'a [T]) -> SliceRef<'a> {
		SliceRef {
			ptr: slice.as_ptr() as *const u8,
			len: slice.len(),
			element_size: std::mem::size_of::<T>(),
			type_id: TypeId::of::<T>(),
			marker: PhantomData,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn downcast<T: 'static>(self) -> Option<&'a [T]> {
		if self.type_id != TypeId::of::<T>() {
			return None;
		}
		Some(unsafe { slice::from_raw_parts(self.ptr as *const T, self.len) })
	}

	/// The elements from `offset` on.
	pub fn skip(self, offset: usize) -> Option<SliceRef<'a>> {
		if offset > self.len {
			return None;
		}
		Some(SliceRef {
			ptr: self.ptr.wrapping_add(offset * self.element_size),
			len: self.len - offset,
			..self
		})
	}
}

/// The mutable counterpart of [`SliceRef`](struct.SliceRef.html).
pub struct SliceMut<'a> {
	ptr: *mut u8,
	len: usize,
	element_size: usize,
	type_id: TypeId,
	marker: PhantomData<&'a mut ()>,
}

impl<'a> SliceMut<'a> {
	pub fn new<T: 'static>(slice: &'a mut [T]) -> SliceMut<'a> {
		SliceMut {
			ptr: slice.as_mut_ptr() as *mut u8,
			len: slice.len(),
			element_size: std::mem::size_of::<T>(),
			type_id: TypeId::of::<T>(),
			marker: PhantomData,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn downcast<T: 'static>(self) -> Option<&'a mut [T]> {
		if self.type_id != TypeId::of::<T>() {
			return None;
		}
		Some(unsafe { slice::from_raw_parts_mut(self.ptr as *mut T, self.len) })
	}

	pub fn skip(self, offset: usize) -> Option<SliceMut<'a>> {
		if offset > self.len {
			return None;
		}
		Some(SliceMut {
			ptr: self.ptr.wrapping_add(offset * self.element_size),
			len: self.len - offset,
			..self
		})
	}
}

/// The shape and strides of a region, relative to the start of a slice.
#[derive(Clone, Copy, Debug)]
pub struct Layout<'a> {
	pub shape: &'a [isize],
	pub strides: &'a [isize],
}

const UNIT: [isize; 1] = [1];

impl<'a> Layout<'a> {
	pub fn new(shape: &'a [isize], strides: &'a [isize]) -> Layout<'a> {
		Layout { shape, strides }
	}

	/// A single element.
	pub fn unit() -> Layout<'static> {
		Layout {
			shape: &UNIT,
			strides: &UNIT,
		}
	}
}

#[test]
fn test_downcast() {
	let data = [1.0f64, 2.0, 3.0];
	let erased = SliceRef::new(&data);
	assert!(erased.downcast::<f32>().is_none());
	assert_eq!(erased.skip(1).unwrap().downcast::<f64>(), Some(&data[1..]));
	assert!(erased.skip(4).is_none());
	let mut data = vec![1u8, 2, 3];
	let erased = SliceMut::new(&mut data).skip(2).unwrap();
	erased.downcast::<u8>().unwrap()[0] = 9;
	assert_eq!(data, vec![1, 2, 9]);
}
