use super::Handle;
use std::sync::Arc;

static NULL_HANDLE: Handle = Handle::Null;

/// A clone-on-write pointer to a handle. Cloning it is cheap and shares the handle. `get_mut` gives the caller a private copy first if the handle is shared. The null handle is not reference counted at all.
#[derive(Clone, Default)]
pub struct SharedHandle(Option<Arc<Handle>>);

impl SharedHandle {
	pub fn new(handle: Handle) -> SharedHandle {
		match handle {
			Handle::Null => SharedHandle(None),
			handle => SharedHandle(Some(Arc::new(handle))),
		}
	}

	pub fn null() -> SharedHandle {
		SharedHandle(None)
	}

	pub fn is_null(&self) -> bool {
		self.0.is_none()
	}

	pub fn get(&self) -> &Handle {
		self.0.as_deref().unwrap_or(&NULL_HANDLE)
	}

	/// Detaches from other owners and returns the handle. Returns `None` for the null handle, which cannot be mutated.
	pub fn get_mut(&mut self) -> Option<&mut Handle> {
		self.0.as_mut().map(Arc::make_mut)
	}

	/// Makes sure no other `SharedHandle` refers to this handle.
	pub fn detach(&mut self) {
		self.get_mut();
	}

	/// Returns true if both point to the same handle.
	pub fn ptr_eq(&self, other: &SharedHandle) -> bool {
		match (&self.0, &other.0) {
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			(None, None) => true,
			_ => false,
		}
	}

	/// The number of `SharedHandle`s pointing to this handle. The null handle reports zero.
	pub fn ref_count(&self) -> usize {
		self.0.as_ref().map(Arc::strong_count).unwrap_or(0)
	}
}

#[test]
fn test_detach_on_write() {
	use super::DenseHandle;
	let mut a = SharedHandle::new(Handle::Dense(Box::new(DenseHandle::<u8>::zeros(
		&tessera_shape::shape![3],
	))));
	let b = a.clone();
	assert!(a.ptr_eq(&b));
	assert_eq!(b.ref_count(), 2);
	a.detach();
	assert!(!a.ptr_eq(&b));
	assert_eq!(b.ref_count(), 1);
	let mut null = SharedHandle::null();
	assert!(null.get_mut().is_none());
	assert!(null.ptr_eq(&SharedHandle::default()));
	assert_eq!(null.ref_count(), 0);
}
