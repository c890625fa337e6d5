use crate::{shape_size, ShapeVector};

/// A rectangular sub-region described by a start coordinate and an extent per dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
	pub start: ShapeVector,
	pub shape: ShapeVector,
}

impl Region {
	pub fn new(start: ShapeVector, shape: ShapeVector) -> Region {
		Region { start, shape }
	}

	/// The region covering all of `shape`.
	pub fn full(shape: &ShapeVector) -> Region {
		Region {
			start: shape.zeroed(),
			shape: *shape,
		}
	}

	/// One past the last coordinate in each dimension.
	pub fn end(&self) -> ShapeVector {
		self.start + self.shape
	}

	pub fn size(&self) -> isize {
		shape_size(&self.shape)
	}

	/// Returns true if the region lies within `bounds`.
	pub fn fits_in(&self, bounds: &[isize]) -> bool {
		self.start.len() == bounds.len()
			&& self.shape.len() == bounds.len()
			&& self
				.start
				.iter()
				.zip(self.shape.iter())
				.zip(bounds)
				.all(|((start, extent), bound)| {
					*start >= 0 && *extent >= 0 && start + extent <= *bound
				})
	}

	/// Builds the sub-region of `bounds` starting at `start` with extent `shape`, clamped so it always fits. Missing start coordinates are zero, and missing or oversized extents take whatever remains of `bounds` past the start.
	pub fn clamped(start: &[isize], shape: Option<&[isize]>, bounds: &ShapeVector) -> Region {
		let mut region = Region::full(bounds);
		for i in 0..bounds.len() {
			let max_start = (bounds[i] - 1).max(0);
			let first = start.get(i).copied().unwrap_or(0).max(0).min(max_start);
			let remaining = (bounds[i] - first).max(0);
			let extent = shape
				.and_then(|shape| shape.get(i))
				.copied()
				.map(|extent| extent.max(0).min(remaining))
				.unwrap_or(remaining);
			region.start[i] = first;
			region.shape[i] = extent;
		}
		region
	}
}

#[test]
fn test_clamped() {
	let bounds = crate::shape![4, 5];
	let region = Region::clamped(&[1, 2], Some(&[2, 2][..]), &bounds);
	assert_eq!(region.start, [1, 2]);
	assert_eq!(region.shape, [2, 2]);
	assert_eq!(region.end(), [3, 4]);
	let region = Region::clamped(&[3], None, &bounds);
	assert_eq!(region.start, [3, 0]);
	assert_eq!(region.shape, [1, 5]);
	let region = Region::clamped(&[9, -3], Some(&[7][..]), &bounds);
	assert_eq!(region.start, [3, 0]);
	assert_eq!(region.shape, [1, 5]);
	assert!(region.fits_in(&bounds));
	assert!(!Region::new(crate::shape![3, 0], crate::shape![2, 5]).fits_in(&bounds));
}
