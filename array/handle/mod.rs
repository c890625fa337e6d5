/*!
This module defines the storage backends behind an [`Array`](../struct.Array.html). A [`Handle`](enum.Handle.html) is one of four variants: the null handle, a dense buffer of one element type, a view onto part of a dense buffer, or a collection of named arrays that forwards to its current member.
*/

use crate::{convert::convert_slices, convert::can_convert, DataType, Layout, Value};
use tessera_shape::{
	default_strides, flat_offset, is_unstrided, offset_checked, shape_size, Ordering, Region,
	ShapeVector,
};

mod dense;
mod multi;
mod shared;
mod view;

pub use self::dense::{DenseHandle, DenseStorage, Deleter};
pub use self::multi::MultiArrayHandle;
pub use self::shared::SharedHandle;
pub use self::view::ViewHandle;

/// The storage kind of a handle. The registry is keyed by kind and element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandleKind {
	Null,
	Dense,
	View,
	MultiArray,
}

impl HandleKind {
	/// The code written to binary streams.
	pub fn code(self) -> u32 {
		match self {
			HandleKind::Null => 0,
			HandleKind::Dense => 1,
			HandleKind::View => 2,
			HandleKind::MultiArray => 3,
		}
	}

	pub fn from_code(code: u32) -> Option<HandleKind> {
		match code {
			0 => Some(HandleKind::Null),
			1 => Some(HandleKind::Dense),
			2 => Some(HandleKind::View),
			3 => Some(HandleKind::MultiArray),
			_ => None,
		}
	}
}

pub enum Handle {
	/// Every operation on the null handle fails or returns an empty value.
	Null,
	Dense(Box<dyn DenseStorage>),
	View(ViewHandle),
	Multi(MultiArrayHandle),
}

/// Cloning a dense handle copies its buffer. Cloning a view shares the buffer it looks at.
impl Clone for Handle {
	fn clone(&self) -> Handle {
		match self {
			Handle::Null => Handle::Null,
			Handle::Dense(storage) => Handle::Dense(storage.copy_region(0, storage.shape())),
			Handle::View(view) => Handle::View(view.clone()),
			Handle::Multi(multi) => Handle::Multi(multi.clone()),
		}
	}
}

/// The dense storage an operation ends up touching, with the region of it the handle covers.
pub(crate) struct Target<'a> {
	pub storage: &'a dyn DenseStorage,
	pub offset: usize,
	pub shape: ShapeVector,
}

pub(crate) struct TargetMut<'a> {
	pub storage: &'a mut dyn DenseStorage,
	pub offset: usize,
	pub shape: ShapeVector,
}

impl<'a> Target<'a> {
	pub fn offset_of(&self, start: &[isize]) -> usize {
		self.offset + flat_offset(self.storage.strides(), start) as usize
	}
}

impl<'a> TargetMut<'a> {
	pub fn offset_of(&self, start: &[isize]) -> usize {
		self.offset + flat_offset(self.storage.strides(), start) as usize
	}
}

impl Handle {
	pub fn kind(&self) -> HandleKind {
		match self {
			Handle::Null => HandleKind::Null,
			Handle::Dense(_) => HandleKind::Dense,
			Handle::View(_) => HandleKind::View,
			Handle::Multi(_) => HandleKind::MultiArray,
		}
	}

	pub fn data_type(&self) -> DataType {
		match self {
			Handle::Null => DataType::Null,
			Handle::Dense(storage) => storage.data_type(),
			Handle::View(view) => view.backing().data_type(),
			Handle::Multi(multi) => multi.data_type(),
		}
	}

	pub fn data_name(&self) -> &'static str {
		match self {
			Handle::Null => DataType::Null.name(),
			Handle::Dense(storage) => storage.data_name(),
			Handle::View(view) => view.backing().data_name(),
			Handle::Multi(multi) => multi
				.current_array()
				.map(|array| array.data_name())
				.unwrap_or_else(|| DataType::Null.name()),
		}
	}

	/// The size in bytes of one element. The null handle reports 1.
	pub fn data_size(&self) -> usize {
		match self {
			Handle::Null => 1,
			Handle::Dense(storage) => storage.data_size(),
			Handle::View(view) => view.backing().data_size(),
			Handle::Multi(multi) => multi
				.current_array()
				.map(|array| array.data_size())
				.unwrap_or(1),
		}
	}

	pub fn shape(&self) -> ShapeVector {
		match self {
			Handle::Null => ShapeVector::new(),
			Handle::Dense(storage) => *storage.shape(),
			Handle::View(view) => *view.shape(),
			Handle::Multi(multi) => *multi.shape(),
		}
	}

	pub fn strides(&self) -> ShapeVector {
		match self {
			Handle::Null => ShapeVector::new(),
			Handle::Dense(storage) => *storage.strides(),
			Handle::View(view) => *view.strides(),
			Handle::Multi(multi) => *multi.strides(),
		}
	}

	pub fn size(&self) -> isize {
		shape_size(&self.shape())
	}

	pub fn is_unstrided(&self) -> bool {
		is_unstrided(&self.shape(), &self.strides())
	}

	pub(crate) fn target(&self) -> Option<Target<'_>> {
		match self {
			Handle::Null => None,
			Handle::Dense(storage) if storage.has_data() => Some(Target {
				storage: &**storage,
				offset: 0,
				shape: *storage.shape(),
			}),
			Handle::Dense(_) => None,
			Handle::View(view) => Some(Target {
				storage: view.backing(),
				offset: view.offset(),
				shape: *view.shape(),
			}),
			Handle::Multi(multi) => multi.current_array()?.handle.get().target(),
		}
	}

	pub(crate) fn target_mut(&mut self) -> Option<TargetMut<'_>> {
		match self {
			Handle::Null => None,
			Handle::Dense(storage) if storage.has_data() => {
				let shape = *storage.shape();
				Some(TargetMut {
					storage: &mut **storage,
					offset: 0,
					shape,
				})
			}
			Handle::Dense(_) => None,
			Handle::View(view) => {
				let offset = view.offset();
				let shape = *view.shape();
				Some(TargetMut {
					storage: view.backing_mut(),
					offset,
					shape,
				})
			}
			Handle::Multi(multi) => multi
				.current_array_mut()?
				.handle
				.get_mut()?
				.target_mut(),
		}
	}

	/// True if the elements live in a dense buffer no other handle shares, so they can be borrowed directly.
	pub(crate) fn is_exclusive(&self) -> bool {
		match self {
			Handle::Dense(storage) => storage.has_data() && !storage.is_shared(),
			Handle::Multi(multi) => multi
				.current_array()
				.map(|array| array.handle.get().is_exclusive())
				.unwrap_or(false),
			Handle::Null | Handle::View(_) => false,
		}
	}

	/// The dense storage this handle reads from, if it has any data.
	pub fn storage(&self) -> Option<&dyn DenseStorage> {
		self.target().map(|target| target.storage)
	}

	/// A pointer to the first element, or null if the handle has no data.
	pub fn data_ptr(&self) -> *const u8 {
		match self.target() {
			Some(target) => target.storage.element_ptr(target.offset),
			None => std::ptr::null(),
		}
	}

	/// A dense handle owning a contiguous copy of this handle's elements. A dense handle without data copies to an empty handle of the same type.
	pub fn copy(&self) -> Handle {
		if let Some(target) = self.target() {
			return Handle::Dense(target.storage.copy_region(target.offset, &target.shape));
		}
		match self {
			Handle::Dense(storage) => Handle::Dense(storage.allocate(&ShapeVector::new())),
			_ => Handle::Null,
		}
	}

	/// Replaces the data with `shape` default elements. Views cannot be reallocated.
	pub fn realloc(&mut self, shape: &ShapeVector) -> bool {
		match self {
			Handle::Dense(storage) => {
				storage.realloc(shape);
				true
			}
			Handle::Multi(multi) => {
				let reallocated = multi
					.current_array_mut()
					.and_then(|array| array.handle.get_mut())
					.map(|handle| handle.realloc(shape))
					.unwrap_or(false);
				multi.remirror();
				reallocated
			}
			Handle::Null | Handle::View(_) => false,
		}
	}

	/// Reinterprets the elements with a new shape of the same size. Only unstrided dense data can be reshaped.
	pub fn reshape(&mut self, shape: &ShapeVector) -> bool {
		match self {
			Handle::Dense(storage) => {
				if !storage.has_data()
					|| shape_size(shape) != shape_size(storage.shape())
					|| !is_unstrided(storage.shape(), storage.strides())
				{
					return false;
				}
				storage.set_layout(*shape, default_strides(shape, Ordering::FirstMajor));
				true
			}
			Handle::Multi(multi) => {
				let reshaped = multi
					.current_array_mut()
					.and_then(|array| array.handle.get_mut())
					.map(|handle| handle.reshape(shape))
					.unwrap_or(false);
				multi.remirror();
				reshaped
			}
			Handle::Null | Handle::View(_) => false,
		}
	}

	pub fn can_export(&self, data_type: DataType) -> bool {
		can_convert(self.data_type(), data_type)
	}

	pub fn can_import(&self, data_type: DataType) -> bool {
		can_convert(data_type, self.data_type())
	}

	/// Converts `src_region` of this handle into `dst_region` of `dst`. The regions must fit their handles and hold the same number of elements. On failure `dst` is left unmodified.
	pub fn export_data(&self, src_region: &Region, dst: &mut Handle, dst_region: &Region) -> bool {
		let src = match self.target() {
			Some(src) => src,
			None => return false,
		};
		if !src_region.fits_in(&src.shape) || src_region.size() <= 0 {
			return false;
		}
		let src_offset = src.offset_of(&src_region.start);
		// Reading a buffer another handle can write, or writing one, goes through a private copy of the source so only one buffer lock is contended.
		let dst_shared = dst
			.target()
			.map(|dst| dst.storage.is_shared())
			.unwrap_or(false);
		if src.storage.is_shared() || dst_shared {
			let copy = Handle::Dense(src.storage.copy_region(src_offset, &src_region.shape));
			return copy.export_source(&Region::full(&src_region.shape), dst, dst_region);
		}
		self.export_source(src_region, dst, dst_region)
	}

	fn export_source(&self, src_region: &Region, dst: &mut Handle, dst_region: &Region) -> bool {
		let src = match self.target() {
			Some(src) => src,
			None => return false,
		};
		let src_offset = src.offset_of(&src_region.start);
		let dst = match dst.target_mut() {
			Some(dst) => dst,
			None => return false,
		};
		if !dst_region.fits_in(&dst.shape) {
			return false;
		}
		let dst_offset = dst.offset_of(&dst_region.start);
		let dst_type = dst.storage.data_type();
		let dst_strides = *dst.storage.strides();
		let src_type = src.storage.data_type();
		let src_layout = Layout::new(&src_region.shape, src.storage.strides());
		let dst_layout = Layout::new(&dst_region.shape, &dst_strides);
		src.storage.read_slice(&mut |src_slice| {
			let src_slice = match src_slice.skip(src_offset) {
				Some(slice) => slice,
				None => return false,
			};
			dst.storage.write_slice(&mut |dst_slice| match dst_slice.skip(dst_offset) {
				Some(dst_slice) => convert_slices(
					src_slice,
					src_type,
					&src_layout,
					dst_slice,
					dst_type,
					&dst_layout,
				),
				None => false,
			})
		})
	}

	/// Converts `src_region` of `src` into `dst_region` of this handle.
	pub fn import_data(&mut self, dst_region: &Region, src: &Handle, src_region: &Region) -> bool {
		src.export_data(src_region, self, dst_region)
	}

	/// Sets every element of `region` to `value`, converted to the element type.
	pub fn fill(&mut self, region: &Region, value: &Value) -> bool {
		let target = match self.target_mut() {
			Some(target) => target,
			None => return false,
		};
		if !region.fits_in(&target.shape) {
			return false;
		}
		let offset = target.offset_of(&region.start);
		target.storage.fill(offset, &region.shape, value)
	}

	/// The element at `pos`, or `Value::Null` if `pos` is out of bounds.
	pub fn value(&self, pos: &[isize]) -> Value {
		let target = match self.target() {
			Some(target) => target,
			None => return Value::Null,
		};
		match offset_checked(&target.shape, target.storage.strides(), pos) {
			Some(offset) => target.storage.value(target.offset + offset as usize),
			None => Value::Null,
		}
	}

	pub fn set_value(&mut self, pos: &[isize], value: &Value) -> bool {
		let target = match self.target_mut() {
			Some(target) => target,
			None => return false,
		};
		match offset_checked(&target.shape, target.storage.strides(), pos) {
			Some(offset) => target.storage.set_value(target.offset + offset as usize, value),
			None => false,
		}
	}
}
