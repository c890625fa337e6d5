use crate::ShapeVector;
use itertools::izip;

/// The two supported stride orderings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ordering {
	/// The outermost dimension has the largest stride.
	FirstMajor,
	/// The outermost dimension has the smallest stride.
	LastMajor,
}

impl Default for Ordering {
	fn default() -> Ordering {
		Ordering::FirstMajor
	}
}

/// The flat element count of `shape`. An empty shape holds no elements.
pub fn shape_size(shape: &[isize]) -> isize {
	if shape.is_empty() {
		0
	} else {
		shape.iter().product()
	}
}

/// Returns true if both shapes hold the same number of elements.
pub fn same_size(a: &[isize], b: &[isize]) -> bool {
	shape_size(a) == shape_size(b)
}

/// Writes the default strides of `shape` into `strides` and returns the flat element count.
pub fn compute_default_strides(shape: &[isize], strides: &mut [isize], ordering: Ordering) -> isize {
	let n = shape.len();
	if n == 0 {
		return 0;
	}
	match ordering {
		Ordering::FirstMajor => {
			strides[n - 1] = 1;
			for i in (0..n - 1).rev() {
				strides[i] = strides[i + 1] * shape[i + 1];
			}
			strides[0] * shape[0]
		}
		Ordering::LastMajor => {
			strides[0] = 1;
			for i in 1..n {
				strides[i] = strides[i - 1] * shape[i - 1];
			}
			strides[n - 1] * shape[n - 1]
		}
	}
}

pub fn default_strides(shape: &ShapeVector, ordering: Ordering) -> ShapeVector {
	let mut strides = *shape;
	compute_default_strides(shape, &mut strides, ordering);
	strides
}

/// Returns the flat element count of `shape` and whether `strides` are the contiguous first-major strides for it. Strides of another length are never contiguous, and a count that overflows is reported as zero.
pub fn size_and_unstrided(shape: &[isize], strides: &[isize]) -> (isize, bool) {
	let n = shape.len();
	if n == 0 {
		return (0, true);
	}
	let size = shape[..n - 1]
		.iter()
		.try_fold(shape[n - 1], |size, extent| size.checked_mul(*extent))
		.unwrap_or(0);
	if strides.len() != n {
		return (size, false);
	}
	let mut unstrided = strides[n - 1] == 1;
	for i in (0..n - 1).rev() {
		if strides[i] != strides[i + 1] * shape[i + 1] {
			unstrided = false;
		}
	}
	(size, unstrided)
}

pub fn is_unstrided(shape: &[isize], strides: &[isize]) -> bool {
	size_and_unstrided(shape, strides).1
}

/// The offset of the element at `pos`.
#[inline]
pub fn flat_offset(strides: &[isize], pos: &[isize]) -> isize {
	match pos.len() {
		1 => pos[0] * strides[0],
		2 => pos[0] * strides[0] + pos[1] * strides[1],
		3 => pos[0] * strides[0] + pos[1] * strides[1] + pos[2] * strides[2],
		_ => pos.iter().zip(strides).map(|(p, s)| p * s).sum(),
	}
}

/// Like `flat_offset`, but assumes the innermost stride is one.
#[inline]
pub fn flat_offset_unit_inner(strides: &[isize], pos: &[isize]) -> isize {
	match pos.len() {
		0 => 0,
		1 => pos[0],
		2 => pos[0] * strides[0] + pos[1],
		3 => pos[0] * strides[0] + pos[1] * strides[1] + pos[2],
		n => {
			pos[..n - 1]
				.iter()
				.zip(strides)
				.map(|(p, s)| p * s)
				.sum::<isize>()
				+ pos[n - 1]
		}
	}
}

/// The offset of the element at `index`, or `None` if `index` is outside `shape`.
pub fn offset_checked(shape: &[isize], strides: &[isize], index: &[isize]) -> Option<isize> {
	if index.len() != shape.len() || strides.len() != shape.len() {
		return None;
	}
	let mut offset = 0;
	for (shape, stride, index) in izip!(shape, strides, index) {
		if *index < 0 || index >= shape {
			return None;
		}
		offset += stride * index;
	}
	Some(offset)
}

/// Converts a flat offset into a coordinate of `shape`, using the default strides for `ordering`.
pub fn coordinate_of(offset: isize, shape: &ShapeVector, ordering: Ordering) -> ShapeVector {
	let strides = default_strides(shape, ordering);
	let mut pos = shape.zeroed();
	let mut offset = offset;
	let mut step = |i: usize, offset: &mut isize| {
		if strides[i] != 0 {
			pos[i] = *offset / strides[i];
			*offset %= strides[i];
		}
	};
	match ordering {
		Ordering::FirstMajor => {
			for i in 0..shape.len() {
				step(i, &mut offset);
			}
		}
		Ordering::LastMajor => {
			for i in (0..shape.len()).rev() {
				step(i, &mut offset);
			}
		}
	}
	pos
}

/// The number of buffer elements a region of `shape` laid out with `strides` spans, or `None` if any extent or stride is negative.
pub fn required_len(shape: &[isize], strides: &[isize]) -> Option<usize> {
	if shape.iter().any(|s| *s < 0) || strides.iter().any(|s| *s < 0) {
		return None;
	}
	if shape_size(shape) == 0 {
		return Some(0);
	}
	let last = shape
		.iter()
		.zip(strides)
		.map(|(sh, st)| (sh - 1) * st)
		.sum::<isize>();
	Some(last as usize + 1)
}

/// Returns true if no two coordinates of `shape` map to the same offset under `strides`.
pub fn is_non_overlapping(shape: &[isize], strides: &[isize]) -> bool {
	let mut axes = shape
		.iter()
		.zip(strides)
		.filter(|(sh, _)| **sh > 1)
		.map(|(sh, st)| (*st, *sh))
		.collect::<Vec<_>>();
	axes.sort_unstable();
	let mut span = 0;
	for (stride, extent) in axes {
		if stride <= span {
			return false;
		}
		span += (extent - 1) * stride;
	}
	true
}

#[test]
fn test_default_strides() {
	let shape = crate::shape![2, 3, 4];
	assert_eq!(default_strides(&shape, Ordering::FirstMajor), [12, 4, 1]);
	assert_eq!(default_strides(&shape, Ordering::LastMajor), [1, 2, 6]);
	let mut strides = [0; 3];
	assert_eq!(
		compute_default_strides(&shape, &mut strides, Ordering::LastMajor),
		24
	);
	assert!(default_strides(&crate::shape![], Ordering::FirstMajor).is_empty());
}

#[test]
fn test_unstrided() {
	assert_eq!(size_and_unstrided(&[2, 3], &[3, 1]), (6, true));
	assert_eq!(size_and_unstrided(&[2, 3], &[6, 1]), (6, false));
	assert_eq!(size_and_unstrided(&[2, 3], &[1, 2]), (6, false));
	assert_eq!(size_and_unstrided(&[5], &[1]), (5, true));
	assert_eq!(size_and_unstrided(&[5], &[2]), (5, false));
	assert_eq!(size_and_unstrided(&[2, 3], &[1]), (6, false));
	assert_eq!(size_and_unstrided(&[2, 3], &[]), (6, false));
	assert_eq!(size_and_unstrided(&[isize::MAX, 2], &[2, 1]), (0, false));
}

#[test]
fn test_flat_offset() {
	assert_eq!(flat_offset(&[3], &[2]), 6);
	assert_eq!(flat_offset(&[3, 1], &[1, 2]), 5);
	assert_eq!(flat_offset(&[12, 4, 1], &[1, 2, 3]), 23);
	assert_eq!(flat_offset(&[60, 12, 4, 1], &[1, 1, 2, 3]), 83);
	assert_eq!(flat_offset_unit_inner(&[60, 12, 4, 1], &[1, 1, 2, 3]), 83);
	assert_eq!(flat_offset_unit_inner(&[3, 1], &[1, 2]), 5);
	assert_eq!(offset_checked(&[2, 3], &[3, 1], &[1, 2]), Some(5));
	assert_eq!(offset_checked(&[2, 3], &[3, 1], &[2, 0]), None);
	assert_eq!(offset_checked(&[2, 3], &[3, 1], &[0, -1]), None);
}

#[test]
fn test_coordinate_of() {
	let shape = crate::shape![2, 3, 4];
	for ordering in [Ordering::FirstMajor, Ordering::LastMajor].iter().copied() {
		let strides = default_strides(&shape, ordering);
		for offset in 0..shape.product() {
			let pos = coordinate_of(offset, &shape, ordering);
			assert_eq!(flat_offset(&strides, &pos), offset);
		}
	}
	assert_eq!(coordinate_of(5, &crate::shape![2, 3], Ordering::FirstMajor), [1, 2]);
	assert_eq!(coordinate_of(5, &crate::shape![2, 3], Ordering::LastMajor), [1, 2]);
	assert_eq!(coordinate_of(3, &crate::shape![2, 3], Ordering::LastMajor), [1, 1]);
}

#[test]
fn test_layout_checks() {
	assert_eq!(required_len(&[2, 3], &[3, 1]), Some(6));
	assert_eq!(required_len(&[2, 3], &[6, 1]), Some(9));
	assert_eq!(required_len(&[0, 3], &[3, 1]), Some(0));
	assert_eq!(required_len(&[2, 3], &[-3, 1]), None);
	assert!(is_non_overlapping(&[2, 3], &[3, 1]));
	assert!(is_non_overlapping(&[2, 3], &[1, 2]));
	assert!(is_non_overlapping(&[2, 3], &[6, 2]));
	assert!(!is_non_overlapping(&[2, 3], &[1, 1]));
	assert!(!is_non_overlapping(&[2, 3], &[0, 1]));
	assert!(is_non_overlapping(&[1, 3], &[0, 1]));
}
