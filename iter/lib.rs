/*!
This crate implements the iteration engine of tessera: incrementing coordinates with carry in first-major or last-major order, iterators over whole shapes, sub-rectangles and all-but-one axis, and the `transform` family of functions that apply a function to every element of a strided region.

Every walker first checks whether its regions are unstrided, in which case it scans linearly. Otherwise 1, 2 and 3 dimensional regions with matching shapes get dedicated loops, and everything else falls back to incrementing a coordinate vector.
*/

mod coordinates;
mod disjoint;
mod increment;
mod parallel;
mod transform;

pub use self::coordinates::*;
pub use self::disjoint::DisjointSlice;
pub use self::increment::*;
pub use self::parallel::*;
pub use self::transform::*;
