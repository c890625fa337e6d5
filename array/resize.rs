use crate::{convert::convert_slices, DataType, Element, Handle, Layout, SliceMut, SliceRef};
use num_complex::Complex64;
use std::ops::{Add, Mul, Sub};
use tessera_iter::Coordinates;
use tessera_shape::{default_strides, flat_offset, shape_size, Ordering, ShapeVector};

/// How `resize` computes samples that fall between source elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
	/// Take the source element the sample falls in.
	Nearest,
	Linear,
	/// A cubic spline through the four surrounding elements.
	Cubic,
}

impl Default for Interpolation {
	fn default() -> Interpolation {
		Interpolation::Nearest
	}
}

/// The types resampling is done in. Numeric arrays are resampled as `f64` and complex arrays as `Complex64`.
trait Sample:
	Element + Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self>
{
}

impl Sample for f64 {}

impl Sample for Complex64 {}

/// Resamples all of `src` into all of `dst`, one axis at a time. Both must have data and the same number of dimensions. Complex arrays can only be resized into complex arrays.
pub(crate) fn resize_handle(src: &Handle, dst: &mut Handle, interpolation: Interpolation) -> bool {
	let src_type = src.data_type();
	let dst_type = dst.data_type();
	if src_type.is_complex() {
		dst_type.is_complex() && resize_as::<Complex64>(src, dst, interpolation)
	} else if src_type.is_numeric() && (dst_type.is_numeric() || dst_type.is_complex()) {
		resize_as::<f64>(src, dst, interpolation)
	} else {
		false
	}
}

fn resize_as<T: Sample>(src: &Handle, dst: &mut Handle, interpolation: Interpolation) -> bool {
	let src_shape = src.shape();
	let dst_shape = dst.shape();
	if src_shape.len() != dst_shape.len() || src.size() <= 0 || dst.size() <= 0 {
		return false;
	}
	let samples = match read_samples::<T>(src, &src_shape) {
		Some(samples) => samples,
		None => return false,
	};
	let resampled = resample(samples, src_shape, &dst_shape, interpolation);
	write_samples(&resampled, dst, &dst_shape)
}

fn read_samples<T: Sample>(src: &Handle, shape: &ShapeVector) -> Option<Vec<T>> {
	let target = src.target()?;
	let mut samples = vec![T::default(); shape_size(shape) as usize];
	let strides = default_strides(shape, Ordering::FirstMajor);
	let src_type = target.storage.data_type();
	let src_layout = Layout::new(shape, target.storage.strides());
	let converted = target.storage.read_slice(&mut |src_slice| match src_slice.skip(target.offset) {
		Some(src_slice) => convert_slices(
			src_slice,
			src_type,
			&src_layout,
			SliceMut::new(samples.as_mut_slice()),
			T::DATA_TYPE,
			&Layout::new(shape, &strides),
		),
		None => false,
	});
	if converted {
		Some(samples)
	} else {
		None
	}
}

fn write_samples<T: Sample>(samples: &[T], dst: &mut Handle, shape: &ShapeVector) -> bool {
	let target = match dst.target_mut() {
		Some(target) => target,
		None => return false,
	};
	let strides = default_strides(shape, Ordering::FirstMajor);
	let dst_type: DataType = target.storage.data_type();
	let dst_strides = *target.storage.strides();
	let offset = target.offset;
	target.storage.write_slice(&mut |dst_slice| match dst_slice.skip(offset) {
		Some(dst_slice) => convert_slices(
			SliceRef::new(samples),
			T::DATA_TYPE,
			&Layout::new(shape, &strides),
			dst_slice,
			dst_type,
			&Layout::new(shape, &dst_strides),
		),
		None => false,
	})
}

/// Resamples contiguous first-major `samples` of `shape` to `new_shape`, one axis at a time.
fn resample<T: Sample>(
	mut samples: Vec<T>,
	mut shape: ShapeVector,
	new_shape: &ShapeVector,
	interpolation: Interpolation,
) -> Vec<T> {
	for axis in 0..shape.len() {
		if shape[axis] == new_shape[axis] {
			continue;
		}
		let mut next_shape = shape;
		next_shape[axis] = new_shape[axis];
		let strides = default_strides(&shape, Ordering::FirstMajor);
		let next_strides = default_strides(&next_shape, Ordering::FirstMajor);
		let mut next = vec![T::default(); shape_size(&next_shape) as usize];
		let mut line = Vec::with_capacity(shape[axis] as usize);
		let mut resampled = vec![T::default(); next_shape[axis] as usize];
		for pos in Coordinates::skipping_axis(&shape, axis, Ordering::FirstMajor) {
			let src_offset = flat_offset(&strides, &pos) as usize;
			let dst_offset = flat_offset(&next_strides, &pos) as usize;
			line.clear();
			line.extend(
				(0..shape[axis] as usize).map(|i| samples[src_offset + i * strides[axis] as usize]),
			);
			resample_line(&line, &mut resampled, interpolation);
			for (i, value) in resampled.iter().enumerate() {
				next[dst_offset + i * next_strides[axis] as usize] = *value;
			}
		}
		samples = next;
		shape = next_shape;
	}
	samples
}

/// Resamples `src` to fill `dst`. A single output takes the first sample.
fn resample_line<T: Sample>(src: &[T], dst: &mut [T], interpolation: Interpolation) {
	let (n, m) = (src.len(), dst.len());
	if n == 0 || m == 0 {
		return;
	}
	if n == m {
		dst.copy_from_slice(src);
		return;
	}
	if m == 1 || n == 1 {
		for value in dst.iter_mut() {
			*value = src[0];
		}
		return;
	}
	let step = (n - 1) as f64 / (m - 1) as f64;
	match interpolation {
		Interpolation::Nearest => {
			let mut x = 0.5;
			for value in dst.iter_mut() {
				*value = src[(x as usize).min(n - 1)];
				x += step;
			}
		}
		Interpolation::Linear => {
			for (j, value) in dst.iter_mut().enumerate().take(m - 1).skip(1) {
				let x = j as f64 * step;
				let i = (x as usize).min(n - 2);
				let t = x - i as f64;
				*value = src[i] * (1.0 - t) + src[i + 1] * t;
			}
			dst[0] = src[0];
			dst[m - 1] = src[n - 1];
		}
		Interpolation::Cubic => {
			for (j, value) in dst.iter_mut().enumerate().take(m - 1).skip(1) {
				let x = j as f64 * step;
				let i = (x as usize).min(n - 2);
				let t = x - i as f64;
				let y0 = src[i.saturating_sub(1)];
				let y1 = src[i];
				let y2 = src[i + 1];
				let y3 = src[(i + 2).min(n - 1)];
				let a0 = y3 - y2 - y0 + y1;
				let a1 = y0 - y1 - a0;
				let a2 = y2 - y0;
				*value = a0 * (t * t * t) + a1 * (t * t) + a2 * t + y1;
			}
			dst[0] = src[0];
			dst[m - 1] = src[n - 1];
		}
	}
}

#[test]
fn test_resample_line() {
	let src = [0.0, 10.0, 20.0, 30.0];
	let mut dst = [0.0; 7];
	resample_line(&src, &mut dst, Interpolation::Linear);
	assert_eq!(dst, [0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0]);
	resample_line(&src, &mut dst, Interpolation::Nearest);
	assert_eq!(dst, [0.0, 10.0, 10.0, 20.0, 20.0, 30.0, 30.0]);
	// The outer neighbours are clamped, which bends the first and last segments.
	resample_line(&src, &mut dst, Interpolation::Cubic);
	assert_eq!(dst, [0.0, 3.75, 10.0, 15.0, 20.0, 26.25, 30.0]);
	let mut dst = [0.0; 2];
	resample_line(&src, &mut dst, Interpolation::Cubic);
	assert_eq!(dst, [0.0, 30.0]);
	let mut dst = [0.0; 1];
	resample_line(&src, &mut dst, Interpolation::Linear);
	assert_eq!(dst, [0.0]);
}

#[test]
fn test_resample_separable() {
	// A 2x2 image doubled along both axes with linear interpolation.
	let samples = vec![0.0, 1.0, 2.0, 3.0];
	let resampled = resample(
		samples,
		tessera_shape::shape![2, 2],
		&tessera_shape::shape![3, 3],
		Interpolation::Linear,
	);
	assert_eq!(resampled, vec![0.0, 0.5, 1.0, 1.0, 1.5, 2.0, 2.0, 2.5, 3.0]);
}
