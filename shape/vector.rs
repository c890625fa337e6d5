use crate::strides::shape_size;
use itertools::Itertools;
use std::{
	convert::TryFrom,
	fmt,
	hash::{Hash, Hasher},
	ops::{Add, Deref, DerefMut, Sub},
};
use thiserror::Error;

#[cfg(not(feature = "max_dims_8"))]
pub const MAX_DIMS: usize = 4;
#[cfg(feature = "max_dims_8")]
pub const MAX_DIMS: usize = 8;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
	#[error("a shape vector holds at most {max} dimensions but {len} were requested")]
	CapacityExceeded { len: usize, max: usize },
}

/// Anything that can be viewed as a list of per-dimension integers. This is implemented for the fixed form `[isize; N]`, whose length is known at compile time, and for the dynamic [`ShapeVector`](struct.ShapeVector.html).
pub trait Dimension: Clone {
	fn slice(&self) -> &[isize];

	fn slice_mut(&mut self) -> &mut [isize];

	fn ndim(&self) -> usize {
		self.slice().len()
	}

	fn size(&self) -> isize {
		shape_size(self.slice())
	}

	fn to_shape_vector(&self) -> Result<ShapeVector, ShapeError> {
		ShapeVector::from_slice(self.slice())
	}
}

impl<const N: usize> Dimension for [isize; N] {
	fn slice(&self) -> &[isize] {
		self
	}

	fn slice_mut(&mut self) -> &mut [isize] {
		self
	}
}

/// A run-time length vector of at most `MAX_DIMS` signed integers stored inline.
#[derive(Clone, Copy)]
pub struct ShapeVector {
	data: [isize; MAX_DIMS],
	len: usize,
}

impl Dimension for ShapeVector {
	fn slice(&self) -> &[isize] {
		self.as_slice()
	}

	fn slice_mut(&mut self) -> &mut [isize] {
		self.as_mut_slice()
	}
}

impl ShapeVector {
	pub const fn new() -> ShapeVector {
		ShapeVector {
			data: [0; MAX_DIMS],
			len: 0,
		}
	}

	pub fn filled(len: usize, value: isize) -> Result<ShapeVector, ShapeError> {
		check_capacity(len)?;
		let mut vector = ShapeVector::new();
		vector.len = len;
		vector.fill(value);
		Ok(vector)
	}

	pub fn zeros(len: usize) -> Result<ShapeVector, ShapeError> {
		ShapeVector::filled(len, 0)
	}

	/// A vector of the same length as `self` with every element set to zero.
	pub fn zeroed(&self) -> ShapeVector {
		let mut vector = *self;
		vector.fill(0);
		vector
	}

	pub fn from_slice(values: &[isize]) -> Result<ShapeVector, ShapeError> {
		check_capacity(values.len())?;
		let mut vector = ShapeVector::new();
		vector.data[..values.len()].copy_from_slice(values);
		vector.len = values.len();
		Ok(vector)
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn as_slice(&self) -> &[isize] {
		&self.data[..self.len]
	}

	pub fn as_mut_slice(&mut self) -> &mut [isize] {
		&mut self.data[..self.len]
	}

	pub fn try_push(&mut self, value: isize) -> Result<(), ShapeError> {
		check_capacity(self.len + 1)?;
		self.data[self.len] = value;
		self.len += 1;
		Ok(())
	}

	/// Panics if the vector is already at capacity.
	pub fn push(&mut self, value: isize) {
		if let Err(error) = self.try_push(value) {
			panic!("{}", error);
		}
	}

	pub fn pop(&mut self) -> Option<isize> {
		if self.len == 0 {
			return None;
		}
		self.len -= 1;
		Some(self.data[self.len])
	}

	pub fn clear(&mut self) {
		self.len = 0;
	}

	/// Grows or shrinks the vector to `len` elements, setting new elements to `value`.
	pub fn resize(&mut self, len: usize, value: isize) -> Result<(), ShapeError> {
		check_capacity(len)?;
		for i in self.len..len {
			self.data[i] = value;
		}
		self.len = len;
		Ok(())
	}

	pub fn fill(&mut self, value: isize) {
		for v in self.as_mut_slice() {
			*v = value;
		}
	}

	pub fn reverse(&mut self) {
		self.as_mut_slice().reverse();
	}

	pub fn reversed(mut self) -> ShapeVector {
		self.reverse();
		self
	}

	/// The product of the elements, which is the flat element count when the vector is a shape.
	pub fn product(&self) -> isize {
		shape_size(self.as_slice())
	}

	pub fn to_vec(&self) -> Vec<isize> {
		self.as_slice().to_vec()
	}

	/// Converts to the fixed form, returning `None` if the lengths differ.
	pub fn to_fixed<const N: usize>(&self) -> Option<[isize; N]> {
		if self.len != N {
			return None;
		}
		let mut fixed = [0; N];
		fixed.copy_from_slice(self.as_slice());
		Some(fixed)
	}
}

fn check_capacity(len: usize) -> Result<(), ShapeError> {
	if len > MAX_DIMS {
		Err(ShapeError::CapacityExceeded { len, max: MAX_DIMS })
	} else {
		Ok(())
	}
}

/// Creates a [`ShapeVector`](struct.ShapeVector.html) from a list of integers, panicking if there are more than `MAX_DIMS` of them.
#[macro_export]
macro_rules! shape {
	() => {
		$crate::ShapeVector::new()
	};
	($($x:expr),+ $(,)?) => {
		$crate::ShapeVector::from([$($x as isize),+])
	};
}

impl Default for ShapeVector {
	fn default() -> ShapeVector {
		ShapeVector::new()
	}
}

impl Deref for ShapeVector {
	type Target = [isize];
	fn deref(&self) -> &[isize] {
		self.as_slice()
	}
}

impl DerefMut for ShapeVector {
	fn deref_mut(&mut self) -> &mut [isize] {
		self.as_mut_slice()
	}
}

impl PartialEq for ShapeVector {
	fn eq(&self, other: &ShapeVector) -> bool {
		self.as_slice() == other.as_slice()
	}
}

impl Eq for ShapeVector {}

impl<const N: usize> PartialEq<[isize; N]> for ShapeVector {
	fn eq(&self, other: &[isize; N]) -> bool {
		self.as_slice() == &other[..]
	}
}

impl Hash for ShapeVector {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.as_slice().hash(state);
	}
}

impl fmt::Debug for ShapeVector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.as_slice()).finish()
	}
}

impl fmt::Display for ShapeVector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}]", self.as_slice().iter().join(", "))
	}
}

impl<const N: usize> From<[isize; N]> for ShapeVector {
	fn from(value: [isize; N]) -> ShapeVector {
		match ShapeVector::from_slice(&value) {
			Ok(vector) => vector,
			Err(error) => panic!("{}", error),
		}
	}
}

impl TryFrom<&[isize]> for ShapeVector {
	type Error = ShapeError;
	fn try_from(value: &[isize]) -> Result<ShapeVector, ShapeError> {
		ShapeVector::from_slice(value)
	}
}

impl TryFrom<Vec<isize>> for ShapeVector {
	type Error = ShapeError;
	fn try_from(value: Vec<isize>) -> Result<ShapeVector, ShapeError> {
		ShapeVector::from_slice(&value)
	}
}

impl From<ShapeVector> for Vec<isize> {
	fn from(value: ShapeVector) -> Vec<isize> {
		value.to_vec()
	}
}

impl Add for ShapeVector {
	type Output = ShapeVector;
	fn add(mut self, rhs: ShapeVector) -> ShapeVector {
		for (a, b) in self.iter_mut().zip(rhs.iter()) {
			*a += *b;
		}
		self
	}
}

impl Sub for ShapeVector {
	type Output = ShapeVector;
	fn sub(mut self, rhs: ShapeVector) -> ShapeVector {
		for (a, b) in self.iter_mut().zip(rhs.iter()) {
			*a -= *b;
		}
		self
	}
}

#[test]
fn test_capacity() {
	let mut vector = ShapeVector::new();
	for i in 0..MAX_DIMS {
		vector.push(i as isize);
	}
	assert_eq!(vector.len(), MAX_DIMS);
	assert_eq!(
		vector.try_push(7),
		Err(ShapeError::CapacityExceeded {
			len: MAX_DIMS + 1,
			max: MAX_DIMS,
		})
	);
	assert_eq!(vector.len(), MAX_DIMS);
	assert!(ShapeVector::from_slice(&[1; MAX_DIMS + 1]).is_err());
	assert!(ShapeVector::try_from(vec![1; MAX_DIMS + 1]).is_err());
}

#[test]
#[should_panic]
fn test_push_past_capacity_panics() {
	let mut vector = ShapeVector::filled(MAX_DIMS, 1).unwrap();
	vector.push(1);
}

#[test]
fn test_arithmetic() {
	let a = shape![1, 2, 3];
	let b = shape![10, 20, 30];
	assert_eq!(a + b, [11, 22, 33]);
	assert_eq!(b - a, [9, 18, 27]);
	assert_eq!(a.reversed(), [3, 2, 1]);
	assert_eq!(a.product(), 6);
	assert_eq!(shape![].product(), 0);
	let mut c = a;
	c.fill(4);
	assert_eq!(c, [4, 4, 4]);
	assert_eq!(a.zeroed(), [0, 0, 0]);
}

#[test]
fn test_fixed_and_dynamic_forms() {
	let fixed: [isize; 3] = [4, 5, 6];
	let dynamic = fixed.to_shape_vector().unwrap();
	assert_eq!(dynamic.to_fixed::<3>(), Some(fixed));
	assert_eq!(dynamic.to_fixed::<2>(), None);
	assert_eq!(Vec::from(dynamic), vec![4, 5, 6]);
	assert_eq!(fixed.size(), dynamic.size());
	let mut resized = dynamic;
	resized.resize(4, 9).unwrap();
	assert_eq!(resized, [4, 5, 6, 9]);
	assert_eq!(resized.pop(), Some(9));
	assert_eq!(resized, dynamic);
	assert_eq!(dynamic.to_string(), "[4, 5, 6]");
}
