use crate::increment;
use tessera_shape::{flat_offset, required_len, size_and_unstrided, Ordering, ShapeVector};

/// Calls `f` with the buffer offset of every element of the region, in first-major order. Returns false if the region is empty or there are fewer strides than dimensions.
pub fn walk_offsets<F>(shape: &[isize], strides: &[isize], mut f: F) -> bool
where
	F: FnMut(usize),
{
	if strides.len() < shape.len() {
		return false;
	}
	let (size, unstrided) = size_and_unstrided(shape, &strides[..shape.len()]);
	if size <= 0 {
		return false;
	}
	if unstrided {
		for offset in 0..size as usize {
			f(offset);
		}
		return true;
	}
	match shape.len() {
		1 => {
			let s0 = strides[0];
			for i in 0..shape[0] {
				f((i * s0) as usize);
			}
		}
		2 => {
			let (s0, s1) = (strides[0], strides[1]);
			for i in 0..shape[0] {
				for j in 0..shape[1] {
					f((i * s0 + j * s1) as usize);
				}
			}
		}
		3 => {
			let (s0, s1, s2) = (strides[0], strides[1], strides[2]);
			for i in 0..shape[0] {
				for j in 0..shape[1] {
					for k in 0..shape[2] {
						f((i * s0 + j * s1 + k * s2) as usize);
					}
				}
			}
		}
		n => {
			let mut pos = match ShapeVector::zeros(n) {
				Ok(pos) => pos,
				Err(_) => return false,
			};
			loop {
				f(flat_offset(strides, &pos) as usize);
				if !increment(&mut pos, shape, Ordering::FirstMajor) {
					break;
				}
			}
		}
	}
	true
}

/// Calls `f` with matching pairs of offsets from two regions holding the same number of elements. Elements are paired by their position in first-major traversal order, so the shapes themselves may differ. Returns false if the element counts differ or are zero.
pub fn walk_offset_pairs<F>(
	a_shape: &[isize],
	a_strides: &[isize],
	b_shape: &[isize],
	b_strides: &[isize],
	mut f: F,
) -> bool
where
	F: FnMut(usize, usize),
{
	if a_strides.len() < a_shape.len() || b_strides.len() < b_shape.len() {
		return false;
	}
	let (a_size, a_unstrided) = size_and_unstrided(a_shape, &a_strides[..a_shape.len()]);
	let (b_size, b_unstrided) = size_and_unstrided(b_shape, &b_strides[..b_shape.len()]);
	if a_size != b_size || a_size <= 0 {
		return false;
	}
	if a_unstrided && b_unstrided {
		for offset in 0..a_size as usize {
			f(offset, offset);
		}
		return true;
	}
	if a_shape == b_shape {
		match a_shape.len() {
			1 => {
				let (a0, b0) = (a_strides[0], b_strides[0]);
				for i in 0..a_shape[0] {
					f((i * a0) as usize, (i * b0) as usize);
				}
				return true;
			}
			2 => {
				let (a0, a1) = (a_strides[0], a_strides[1]);
				let (b0, b1) = (b_strides[0], b_strides[1]);
				for i in 0..a_shape[0] {
					for j in 0..a_shape[1] {
						f((i * a0 + j * a1) as usize, (i * b0 + j * b1) as usize);
					}
				}
				return true;
			}
			3 => {
				let (a0, a1, a2) = (a_strides[0], a_strides[1], a_strides[2]);
				let (b0, b1, b2) = (b_strides[0], b_strides[1], b_strides[2]);
				for i in 0..a_shape[0] {
					for j in 0..a_shape[1] {
						for k in 0..a_shape[2] {
							f(
								(i * a0 + j * a1 + k * a2) as usize,
								(i * b0 + j * b1 + k * b2) as usize,
							);
						}
					}
				}
				return true;
			}
			_ => {}
		}
	}
	let (mut a_pos, mut b_pos) = match (
		ShapeVector::zeros(a_shape.len()),
		ShapeVector::zeros(b_shape.len()),
	) {
		(Ok(a_pos), Ok(b_pos)) => (a_pos, b_pos),
		_ => return false,
	};
	for offset in 0..a_size as usize {
		let a_offset = if a_unstrided {
			offset
		} else {
			flat_offset(a_strides, &a_pos) as usize
		};
		let b_offset = if b_unstrided {
			offset
		} else {
			flat_offset(b_strides, &b_pos) as usize
		};
		f(a_offset, b_offset);
		if !a_unstrided {
			increment(&mut a_pos, a_shape, Ordering::FirstMajor);
		}
		if !b_unstrided {
			increment(&mut b_pos, b_shape, Ordering::FirstMajor);
		}
	}
	true
}

/// Returns true if a buffer of `len` elements covers every offset of the region.
pub fn region_fits(len: usize, shape: &[isize], strides: &[isize]) -> bool {
	strides.len() >= shape.len()
		&& required_len(shape, &strides[..shape.len()])
			.map(|required| required <= len)
			.unwrap_or(false)
}

/// Applies `f` to every element of the source region and writes the results to the destination region. The regions must hold the same number of elements. Returns false without touching `dst` if they do not, if they are empty, or if either region does not fit its buffer.
pub fn transform<T, U, F>(
	src: &[T],
	src_shape: &[isize],
	src_strides: &[isize],
	dst: &mut [U],
	dst_shape: &[isize],
	dst_strides: &[isize],
	mut f: F,
) -> bool
where
	F: FnMut(&T) -> U,
{
	if !region_fits(src.len(), src_shape, src_strides)
		|| !region_fits(dst.len(), dst_shape, dst_strides)
	{
		return false;
	}
	walk_offset_pairs(
		src_shape,
		src_strides,
		dst_shape,
		dst_strides,
		|src_offset, dst_offset| {
			dst[dst_offset] = f(&src[src_offset]);
		},
	)
}

/// Replaces every element of the region with `f` applied to it.
pub fn inplace_transform<T, F>(data: &mut [T], shape: &[isize], strides: &[isize], mut f: F) -> bool
where
	F: FnMut(&T) -> T,
{
	for_each_mut(data, shape, strides, |value| {
		let new_value = f(value);
		*value = new_value;
	})
}

pub fn for_each<T, F>(data: &[T], shape: &[isize], strides: &[isize], mut f: F) -> bool
where
	F: FnMut(&T),
{
	if !region_fits(data.len(), shape, strides) {
		return false;
	}
	walk_offsets(shape, strides, |offset| f(&data[offset]))
}

pub fn for_each_mut<T, F>(data: &mut [T], shape: &[isize], strides: &[isize], mut f: F) -> bool
where
	F: FnMut(&mut T),
{
	if !region_fits(data.len(), shape, strides) {
		return false;
	}
	walk_offsets(shape, strides, |offset| f(&mut data[offset]))
}

#[test]
fn test_transform_unstrided() {
	let src = [1, 2, 3, 4, 5, 6];
	let mut dst = [0.0; 6];
	assert!(transform(
		&src,
		&[2, 3],
		&[3, 1],
		&mut dst,
		&[6],
		&[1],
		|x| *x as f64 * 0.5
	));
	assert_eq!(dst, [0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
}

#[test]
fn test_transform_strided() {
	// A 2x2 window starting at (1, 1) of a 3x4 row-major buffer.
	let src = (0..12).collect::<Vec<i32>>();
	let mut dst = vec![0; 4];
	assert!(transform(
		&src[5..],
		&[2, 2],
		&[4, 1],
		&mut dst,
		&[2, 2],
		&[2, 1],
		|x| *x
	));
	assert_eq!(dst, vec![5, 6, 9, 10]);
	// The same window written transposed into a column-major destination.
	let mut dst = vec![0; 4];
	assert!(transform(
		&src[5..],
		&[2, 2],
		&[4, 1],
		&mut dst,
		&[2, 2],
		&[1, 2],
		|x| *x
	));
	assert_eq!(dst, vec![5, 9, 6, 10]);
}

#[test]
fn test_transform_generic_dimensions() {
	let src = (0..24).collect::<Vec<i64>>();
	let mut dst = vec![0; 24];
	// Last-major strides force the generic coordinate path in four dimensions.
	assert!(transform(
		&src,
		&[2, 3, 2, 2],
		&[12, 4, 2, 1],
		&mut dst,
		&[2, 3, 2, 2],
		&[1, 2, 6, 12],
		|x| *x
	));
	assert_eq!(dst[1], 12);
	assert_eq!(dst[2], 4);
	assert_eq!(dst[12], 1);
	// Differently shaped regions of equal size pair up in traversal order.
	let mut dst = vec![0; 24];
	assert!(transform(
		&src,
		&[4, 6],
		&[6, 1],
		&mut dst,
		&[2, 3, 4],
		&[1, 2, 6],
		|x| *x
	));
	assert_eq!(dst[1], 12);
	assert_eq!(dst[2], 4);
	assert_eq!(dst[6], 1);
}

#[test]
fn test_transform_failures() {
	let src = [1, 2, 3, 4];
	let mut dst = [0; 6];
	assert!(!transform(&src, &[4], &[1], &mut dst, &[6], &[1], |x| *x));
	assert!(!transform(&src, &[2, 3], &[3, 1], &mut dst, &[6], &[1], |x| *x));
	assert!(!transform(&src, &[0], &[1], &mut dst, &[0], &[1], |x| *x));
	assert!(!transform(&src, &[2, 2], &[2], &mut dst, &[4], &[1], |x| *x));
	assert!(!walk_offsets(&[2, 2], &[1], |_| {}));
	assert!(!walk_offset_pairs(&[4], &[1], &[2, 2], &[], |_, _| {}));
	assert_eq!(dst, [0; 6]);
}

#[test]
fn test_inplace_transform() {
	let mut data = (0..12).collect::<Vec<i32>>();
	// Every other column of a 3x4 buffer.
	assert!(inplace_transform(&mut data, &[3, 2], &[4, 2], |x| -x));
	assert_eq!(data, vec![0, 1, -2, 3, -4, 5, -6, 7, -8, 9, -10, 11]);
	let mut sum = 0;
	assert!(for_each(&data, &[12], &[1], |x| sum += x));
	assert_eq!(sum, 66 - 2 * 30);
}
