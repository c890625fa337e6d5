/*!
This module implements [`VariantArray`](struct.VariantArray.html), an array restricted to a list of element types fixed at compile time. The list is a tuple of up to 13 element types. Assigning an array of another type converts it to the closest allowed type, and [`apply`](struct.VariantArray.html#method.apply) hands the elements to a visitor with their concrete type, so the visitor's per-element loop is monomorphized.
*/

use crate::{Array, ArrayView, DataType, Element};
use std::{marker::PhantomData, ops::Deref};

/// Code run on the elements of an array once their type is known. Implement it for every type in the list a `VariantArray` is restricted to, with the same `Output`.
pub trait Visitor<T: Element> {
	type Output;
	fn visit(&mut self, view: ArrayView<'_, T>) -> Self::Output;
}

/// A tuple of element types.
pub trait TypeList {
	fn data_types() -> Vec<DataType>;
}

/// Dispatches an array to the `Visitor` implementation for its element type.
pub trait Apply<V>: TypeList {
	type Output;
	fn apply(array: &Array, visitor: &mut V) -> Option<Self::Output>;
}

macro_rules! type_list {
	($($t:ident),+) => {
		impl<$($t: Element),+> TypeList for ($($t,)+) {
			fn data_types() -> Vec<DataType> {
				vec![$($t::DATA_TYPE),+]
			}
		}

		impl<V, O, $($t: Element),+> Apply<V> for ($($t,)+)
		where
			$(V: Visitor<$t, Output = O>,)+
		{
			type Output = O;
			fn apply(array: &Array, visitor: &mut V) -> Option<O> {
				let data_type = array.data_type();
				$(
					if data_type == $t::DATA_TYPE {
						let view = array.view::<$t>()?;
						return Some(<V as Visitor<$t>>::visit(visitor, view));
					}
				)+
				None
			}
		}
	};
}

type_list!(A);
type_list!(A, B);
type_list!(A, B, C);
type_list!(A, B, C, D);
type_list!(A, B, C, D, E);
type_list!(A, B, C, D, E, F);
type_list!(A, B, C, D, E, F, G);
type_list!(A, B, C, D, E, F, G, H);
type_list!(A, B, C, D, E, F, G, H, I);
type_list!(A, B, C, D, E, F, G, H, I, J);
type_list!(A, B, C, D, E, F, G, H, I, J, K);
type_list!(A, B, C, D, E, F, G, H, I, J, K, L);
type_list!(A, B, C, D, E, F, G, H, I, J, K, L, M);

/// An array whose element type is always one of the types in `L`, or the null array.
pub struct VariantArray<L> {
	array: Array,
	types: PhantomData<L>,
}

impl<L> Clone for VariantArray<L> {
	fn clone(&self) -> VariantArray<L> {
		VariantArray {
			array: self.array.clone(),
			types: PhantomData,
		}
	}
}

impl<L> std::fmt::Debug for VariantArray<L> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("VariantArray").field(&self.array).finish()
	}
}

impl<L: TypeList> Default for VariantArray<L> {
	fn default() -> VariantArray<L> {
		VariantArray::new()
	}
}

impl<L> Deref for VariantArray<L> {
	type Target = Array;
	fn deref(&self) -> &Array {
		&self.array
	}
}

impl<L: TypeList> VariantArray<L> {
	pub fn new() -> VariantArray<L> {
		VariantArray {
			array: Array::null(),
			types: PhantomData,
		}
	}

	pub fn from_array(array: &Array) -> VariantArray<L> {
		let mut variant = VariantArray::new();
		variant.set(array);
		variant
	}

	pub fn is_valid_type(data_type: DataType) -> bool {
		L::data_types().contains(&data_type)
	}

	/// The allowed type arrays of `data_type` are converted to. Among the types `data_type` converts to, this is the smallest one at least as large as `data_type`, or failing that the largest one.
	pub fn closest_type(data_type: DataType, data_size: usize) -> Option<DataType> {
		let mut candidates = L::data_types()
			.into_iter()
			.filter(|candidate| crate::can_convert(data_type, *candidate))
			.collect::<Vec<_>>();
		candidates.sort_by_key(|candidate| candidate.size_of().unwrap_or(0));
		candidates
			.iter()
			.copied()
			.find(|candidate| candidate.size_of().unwrap_or(0) >= data_size)
			.or_else(|| candidates.last().copied())
	}

	/// Shares `array` if its type is allowed and converts it to the closest allowed type otherwise. If no allowed type can hold its elements, this becomes the null array and false is returned.
	pub fn set(&mut self, array: &Array) -> bool {
		if array.is_null() || Self::is_valid_type(array.data_type()) {
			self.array = array.clone();
			return true;
		}
		let converted = Self::closest_type(array.data_type(), array.data_size())
			.map(|data_type| array.convert(data_type))
			.unwrap_or_default();
		self.array = converted;
		!self.array.is_null()
	}

	pub fn clear(&mut self) {
		self.array.clear();
	}

	pub fn array(&self) -> &Array {
		&self.array
	}

	pub fn into_array(self) -> Array {
		self.array
	}

	/// Calls the visitor with the elements. Returns `None` for the null array.
	pub fn apply<V>(&self, visitor: &mut V) -> Option<<L as Apply<V>>::Output>
	where
		L: Apply<V>,
	{
		L::apply(&self.array, visitor)
	}
}

#[cfg(test)]
struct Sum;

#[cfg(test)]
impl<T: crate::Numeric> Visitor<T> for Sum {
	type Output = f64;
	fn visit(&mut self, view: ArrayView<'_, T>) -> f64 {
		view.iter().map(|value| value.to_f64()).sum()
	}
}

#[test]
fn test_closest_type() {
	type Numbers = VariantArray<(u8, i32, f64)>;
	assert!(Numbers::is_valid_type(DataType::Int32));
	assert!(!Numbers::is_valid_type(DataType::Int16));
	assert_eq!(Numbers::closest_type(DataType::Int16, 2), Some(DataType::Int32));
	assert_eq!(Numbers::closest_type(DataType::Int64, 8), Some(DataType::Float64));
	assert_eq!(Numbers::closest_type(DataType::Bool, 1), Some(DataType::UInt8));
	assert_eq!(
		Numbers::closest_type(DataType::String, std::mem::size_of::<String>()),
		Some(DataType::Float64)
	);
	assert_eq!(Numbers::closest_type(DataType::Complex64, 16), None);
}

#[test]
fn test_variant_array() {
	let mut numbers = VariantArray::<(u8, i32, f64)>::new();
	assert!(numbers.is_null());
	let source = Array::from_vec(vec![-1i16, 2, 3], &[3]);
	assert!(numbers.set(&source));
	assert_eq!(numbers.data_type(), DataType::Int32);
	assert_eq!(numbers.to_vec::<i32>(), Some(vec![-1, 2, 3]));
	assert_eq!(numbers.apply(&mut Sum), Some(4.0));
	let allowed = Array::from_vec(vec![0.5f64, 0.25], &[2]);
	assert!(numbers.set(&allowed));
	assert!(numbers.shared_handle().ptr_eq(allowed.shared_handle()));
	assert_eq!(numbers.apply(&mut Sum), Some(0.75));
	let complex = Array::new(DataType::Complex32, &[2]);
	assert!(!numbers.set(&complex));
	assert!(numbers.is_null());
	assert_eq!(numbers.apply(&mut Sum), None);
	let many = VariantArray::<(bool, i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, crate::LongDouble, u8)>::from_array(
		&Array::from_vec(vec![1u64, 2], &[2]),
	);
	assert_eq!(many.data_type(), DataType::UInt64);
	assert_eq!(many.apply(&mut Sum), Some(3.0));
}

#[test]
fn test_closest_type_ties() {
	type Halves = VariantArray<(u16, i32)>;
	assert_eq!(Halves::closest_type(DataType::Int16, 2), Some(DataType::UInt16));
	assert_eq!(Halves::closest_type(DataType::UInt32, 4), Some(DataType::Int32));
	assert_eq!(Halves::closest_type(DataType::Float64, 8), Some(DataType::Int32));
	let mut halves = Halves::new();
	assert!(halves.set(&Array::from_vec(vec![-1i16, 7], &[2])));
	assert_eq!(halves.data_type(), DataType::UInt16);
	assert_eq!(halves.to_vec::<u16>(), Some(vec![u16::MAX, 7]));
}
