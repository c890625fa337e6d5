use crate::{increment, inplace_transform, region_fits, transform, DisjointSlice};
use rayon::prelude::*;
use tessera_shape::{
	coordinate_of, flat_offset, is_non_overlapping, shape_size, Ordering, ShapeVector,
};

/// Splits `size` elements into one contiguous chunk per worker. The last chunk takes the remainder.
pub fn chunk_ranges(size: usize, workers: usize) -> Vec<std::ops::Range<usize>> {
	if size == 0 {
		return Vec::new();
	}
	let workers = workers.max(1).min(size);
	let chunk = size / workers;
	(0..workers)
		.map(|worker| {
			let start = worker * chunk;
			let end = if worker == workers - 1 {
				size
			} else {
				start + chunk
			};
			start..end
		})
		.collect()
}

/// The parallel version of `transform`. Each worker converts its own contiguous chunk of the traversal order, starting from the coordinate its first element maps to. If the destination strides let two coordinates share an offset, this falls back to the sequential `transform`.
#[allow(clippy::too_many_arguments)]
pub fn par_transform<T, U, F>(
	src: &[T],
	src_shape: &[isize],
	src_strides: &[isize],
	dst: &mut [U],
	dst_shape: &[isize],
	dst_strides: &[isize],
	f: F,
	workers: usize,
) -> bool
where
	T: Sync,
	U: Send,
	F: Fn(&T) -> U + Sync,
{
	let size = shape_size(src_shape);
	if size <= 0
		|| size != shape_size(dst_shape)
		|| !region_fits(src.len(), src_shape, src_strides)
		|| !region_fits(dst.len(), dst_shape, dst_strides)
	{
		return false;
	}
	if workers <= 1 || !is_non_overlapping(dst_shape, dst_strides) {
		return transform(
			src,
			src_shape,
			src_strides,
			dst,
			dst_shape,
			dst_strides,
			f,
		);
	}
	let (src_shape_vector, dst_shape_vector) = match (
		ShapeVector::from_slice(src_shape),
		ShapeVector::from_slice(dst_shape),
	) {
		(Ok(src_shape), Ok(dst_shape)) => (src_shape, dst_shape),
		_ => return false,
	};
	let dst = DisjointSlice::new(dst);
	chunk_ranges(size as usize, workers)
		.into_par_iter()
		.for_each(|range| {
			let mut src_pos =
				coordinate_of(range.start as isize, &src_shape_vector, Ordering::FirstMajor);
			let mut dst_pos =
				coordinate_of(range.start as isize, &dst_shape_vector, Ordering::FirstMajor);
			for _ in range {
				let src_offset = flat_offset(src_strides, &src_pos) as usize;
				let dst_offset = flat_offset(dst_strides, &dst_pos) as usize;
				// Chunks cover disjoint coordinates and the destination layout is non overlapping.
				unsafe {
					*dst.get(dst_offset) = f(&src[src_offset]);
				}
				increment(&mut src_pos, src_shape, Ordering::FirstMajor);
				increment(&mut dst_pos, dst_shape, Ordering::FirstMajor);
			}
		});
	true
}

/// The parallel version of `inplace_transform`.
pub fn par_inplace_transform<T, F>(
	data: &mut [T],
	shape: &[isize],
	strides: &[isize],
	f: F,
	workers: usize,
) -> bool
where
	T: Send,
	F: Fn(&T) -> T + Sync,
{
	let size = shape_size(shape);
	if size <= 0 || !region_fits(data.len(), shape, strides) {
		return false;
	}
	if workers <= 1 || !is_non_overlapping(shape, strides) {
		return inplace_transform(data, shape, strides, f);
	}
	let shape_vector = match ShapeVector::from_slice(shape) {
		Ok(shape) => shape,
		Err(_) => return false,
	};
	let data = DisjointSlice::new(data);
	chunk_ranges(size as usize, workers)
		.into_par_iter()
		.for_each(|range| {
			let mut pos = coordinate_of(range.start as isize, &shape_vector, Ordering::FirstMajor);
			for _ in range {
				let offset = flat_offset(strides, &pos) as usize;
				unsafe {
					let value = data.get(offset);
					*value = f(value);
				}
				increment(&mut pos, shape, Ordering::FirstMajor);
			}
		});
	true
}

#[test]
fn test_chunk_ranges() {
	assert_eq!(chunk_ranges(10, 3), vec![0..3, 3..6, 6..10]);
	assert_eq!(chunk_ranges(2, 8), vec![0..1, 1..2]);
	assert!(chunk_ranges(0, 4).is_empty());
}

#[test]
fn test_par_transform_matches_transform() {
	let src = (0..1000).collect::<Vec<i64>>();
	let shape = [5, 4, 10];
	// Every other element of a 5x4x20 buffer, written into a last-major destination.
	let src_strides = [80, 20, 2];
	let dst_strides = [1, 5, 20];
	let mut expected = vec![0.0; 200];
	assert!(transform(
		&src,
		&shape,
		&src_strides,
		&mut expected,
		&shape,
		&dst_strides,
		|x| *x as f64
	));
	let mut dst = vec![0.0; 200];
	assert!(par_transform(
		&src,
		&shape,
		&src_strides,
		&mut dst,
		&shape,
		&dst_strides,
		|x| *x as f64,
		4
	));
	assert_eq!(dst, expected);
}

#[test]
fn test_par_inplace_transform() {
	let mut data = (0..64).collect::<Vec<i32>>();
	assert!(par_inplace_transform(&mut data, &[8, 8], &[8, 1], |x| x * 2, 3));
	assert_eq!(data, (0..64).map(|x| x * 2).collect::<Vec<i32>>());
	assert!(!par_inplace_transform(&mut data, &[8, 9], &[9, 1], |x| x * 2, 3));
}
