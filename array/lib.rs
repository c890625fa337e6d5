/*!
This crate implements tessera, an N-dimensional array whose element type is chosen at runtime. An [`Array`](struct.Array.html) is a clone-on-write pointer to a [`Handle`](enum.Handle.html), which is either null, a dense buffer of one element type, a view onto part of a dense buffer, or a collection of named arrays.

Arrays are converted between element types with [`Array::convert`](struct.Array.html#method.convert). Built-in type pairs go through a table of typed conversion functions, and other pairs fall back to value hooks registered with [`register_converter`](fn.register_converter.html). New element types are added at runtime with [`register_element`](fn.register_element.html).

Arrays can be resampled with nearest, linear or cubic interpolation, and streamed to and from binary and text formats.
*/

mod array;
mod config;
mod convert;
mod element;
mod erased;
mod handle;
mod multi_array;
mod registry;
mod resize;
mod stream;
mod value;
mod variant;

pub use self::array::{Array, ArrayView, ArrayViewMut};
pub use self::config::{config, set_config, Config};
pub use self::convert::{
	can_convert, convert_element, convert_slices, register_converter, ConvertFn, ValueConverter,
};
pub use self::element::*;
pub use self::erased::{Layout, SliceMut, SliceRef};
pub use self::handle::*;
pub use self::multi_array::MultiArray;
pub use self::registry::{
	create_foreign_handle, create_handle, get_handle, register_element, register_type,
	registered_types,
};
pub use self::resize::Interpolation;
pub use self::stream::{FileFormat, StreamError};
pub use self::value::Value;
pub use self::variant::{Apply, TypeList, VariantArray, Visitor};
pub use num_complex::{Complex32, Complex64};
pub use tessera_shape::{shape, Ordering, Region, ShapeVector, MAX_DIMS};
