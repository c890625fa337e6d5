use super::DenseStorage;
use tessera_shape::{flat_offset, is_unstrided, Region, ShapeVector};

/// A window onto the buffer of a dense handle. The view shares the buffer, so writes through either side are visible through the other. Coordinates are relative to `start`.
pub struct ViewHandle {
	backing: Box<dyn DenseStorage>,
	start: ShapeVector,
	shape: ShapeVector,
}

impl Clone for ViewHandle {
	fn clone(&self) -> ViewHandle {
		ViewHandle {
			// Views only reach the buffer through transient slices.
			backing: unsafe { self.backing.share() },
			start: self.start,
			shape: self.shape,
		}
	}
}

impl ViewHandle {
	/// `region` is in the coordinates of `backing` and must fit inside it.
	pub(crate) fn new(backing: Box<dyn DenseStorage>, region: Region) -> ViewHandle {
		ViewHandle {
			backing,
			start: region.start,
			shape: region.shape,
		}
	}

	/// A view of all of `backing`, which is how foreign buffers with custom strides are wrapped.
	pub(crate) fn whole(backing: Box<dyn DenseStorage>) -> ViewHandle {
		let region = Region::full(backing.shape());
		ViewHandle::new(backing, region)
	}

	/// A view of a region given relative to this view.
	pub(crate) fn sub_view(&self, region: &Region) -> ViewHandle {
		ViewHandle {
			backing: unsafe { self.backing.share() },
			start: self.start + region.start,
			shape: region.shape,
		}
	}

	pub(crate) fn backing(&self) -> &dyn DenseStorage {
		&*self.backing
	}

	pub(crate) fn backing_mut(&mut self) -> &mut dyn DenseStorage {
		&mut *self.backing
	}

	pub fn start(&self) -> &ShapeVector {
		&self.start
	}

	pub fn shape(&self) -> &ShapeVector {
		&self.shape
	}

	pub fn strides(&self) -> &ShapeVector {
		self.backing.strides()
	}

	/// The buffer offset of the first element of the view.
	pub fn offset(&self) -> usize {
		flat_offset(self.backing.strides(), &self.start) as usize
	}

	pub fn is_unstrided(&self) -> bool {
		is_unstrided(&self.shape, self.backing.strides())
	}
}
