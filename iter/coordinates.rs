use crate::increment_in_range;
use tessera_shape::{Ordering, ShapeVector};

/// An iterator over every coordinate of a sub-rectangle, in first-major or last-major order.
#[derive(Clone, Debug)]
pub struct Coordinates {
	pos: ShapeVector,
	start: ShapeVector,
	end: ShapeVector,
	ordering: Ordering,
	done: bool,
}

impl Coordinates {
	/// Every coordinate of `shape`.
	pub fn new(shape: &ShapeVector, ordering: Ordering) -> Coordinates {
		Coordinates::in_range(&shape.zeroed(), shape, ordering)
	}

	/// Every coordinate in `[start, end)`.
	pub fn in_range(start: &ShapeVector, end: &ShapeVector, ordering: Ordering) -> Coordinates {
		let done = start.is_empty()
			|| start.len() != end.len()
			|| start.iter().zip(end.iter()).any(|(start, end)| start >= end);
		Coordinates {
			pos: *start,
			start: *start,
			end: *end,
			ordering,
			done,
		}
	}

	/// Every coordinate of `shape` whose component along `axis` is zero, which visits each line along `axis` once.
	pub fn skipping_axis(shape: &ShapeVector, axis: usize, ordering: Ordering) -> Coordinates {
		let mut end = *shape;
		if axis < end.len() && end[axis] > 1 {
			end[axis] = 1;
		}
		Coordinates::in_range(&shape.zeroed(), &end, ordering)
	}

	pub fn ordering(&self) -> Ordering {
		self.ordering
	}
}

impl Iterator for Coordinates {
	type Item = ShapeVector;
	fn next(&mut self) -> Option<ShapeVector> {
		if self.done {
			return None;
		}
		let current = self.pos;
		self.done = !increment_in_range(&mut self.pos, &self.start, &self.end, self.ordering);
		Some(current)
	}
}

pub fn coordinates(shape: &ShapeVector, ordering: Ordering) -> Coordinates {
	Coordinates::new(shape, ordering)
}

#[test]
fn test_coordinates_order() {
	use tessera_shape::{default_strides, flat_offset, shape};
	let shape = shape![2, 3];
	// Values 0..6 laid out in row-major order, visited in each ordering.
	let strides = default_strides(&shape, Ordering::FirstMajor);
	let visit = |ordering| {
		coordinates(&shape, ordering)
			.map(|pos| flat_offset(&strides, &pos))
			.collect::<Vec<_>>()
	};
	assert_eq!(visit(Ordering::FirstMajor), vec![0, 1, 2, 3, 4, 5]);
	assert_eq!(visit(Ordering::LastMajor), vec![0, 3, 1, 4, 2, 5]);
}

#[test]
fn test_coordinates_in_range() {
	use tessera_shape::shape;
	let visited = Coordinates::in_range(&shape![1, 1], &shape![3, 2], Ordering::LastMajor)
		.map(|pos| pos.to_vec())
		.collect::<Vec<_>>();
	insta::assert_debug_snapshot!(visited, @r###"
 [
     [
         1,
         1,
     ],
     [
         2,
         1,
     ],
 ]
 "###);
	assert_eq!(
		Coordinates::in_range(&shape![2, 0], &shape![2, 3], Ordering::FirstMajor).count(),
		0
	);
	assert_eq!(coordinates(&shape![], Ordering::FirstMajor).count(), 0);
}

#[test]
fn test_skipping_axis() {
	use tessera_shape::shape;
	let shape = shape![2, 3, 4];
	let lines = Coordinates::skipping_axis(&shape, 1, Ordering::FirstMajor).collect::<Vec<_>>();
	assert_eq!(lines.len(), 8);
	assert!(lines.iter().all(|pos| pos[1] == 0));
	assert_eq!(lines[1], [0, 0, 1]);
	assert_eq!(lines[4], [1, 0, 0]);
}
