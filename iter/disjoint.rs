use std::marker::PhantomData;

/// A mutable slice shared by several threads that each touch their own disjoint set of indices.
pub struct DisjointSlice<'a, T> {
	ptr: *mut T,
	len: usize,
	marker: PhantomData<&'a mut [T]>,
}

unsafe impl<'a, T: Send> Send for DisjointSlice<'a, T> {}
unsafe impl<'a, T: Send> Sync for DisjointSlice<'a, T> {}

impl<'a, T> DisjointSlice<'a, T> {
	pub fn new(slice: &'a mut [T]) -> DisjointSlice<'a, T> {
		DisjointSlice {
			ptr: slice.as_mut_ptr(),
			len: slice.len(),
			marker: PhantomData,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// # Safety
	/// No other reference to the element at `index` may be live while the returned reference is.
	#[allow(clippy::mut_from_ref)]
	pub unsafe fn get(&self, index: usize) -> &mut T {
		assert!(index < self.len);
		&mut *self.ptr.add(index)
	}
}
