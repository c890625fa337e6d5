/*!
This crate provides the small integer vectors used as shapes, strides and coordinates by the tessera array engine, along with the index arithmetic built on them: default strides in first-major or last-major order, flat offsets, and the inverse conversion from a flat offset back to a coordinate.

A [`ShapeVector`](struct.ShapeVector.html) never allocates. Its capacity is [`MAX_DIMS`](constant.MAX_DIMS.html), which is 4 by default and 8 with the `max_dims_8` feature.
*/

mod region;
mod strides;
mod vector;

pub use self::region::Region;
pub use self::strides::*;
pub use self::vector::*;
