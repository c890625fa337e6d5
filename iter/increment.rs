use tessera_shape::Ordering;

/// Advances `pos` to the next coordinate of `shape`, carrying from the innermost axis of `ordering` outward. Returns false once the iteration space is exhausted, which is detected on the outermost axis alone.
#[inline]
pub fn increment(pos: &mut [isize], shape: &[isize], ordering: Ordering) -> bool {
	let n = pos.len();
	if n == 0 {
		return false;
	}
	match ordering {
		Ordering::FirstMajor => {
			let mut i = n - 1;
			loop {
				pos[i] += 1;
				if pos[i] < shape[i] {
					return true;
				}
				if i == 0 {
					return false;
				}
				pos[i] = 0;
				i -= 1;
			}
		}
		Ordering::LastMajor => {
			let mut i = 0;
			loop {
				pos[i] += 1;
				if pos[i] < shape[i] {
					return true;
				}
				if i == n - 1 {
					return false;
				}
				pos[i] = 0;
				i += 1;
			}
		}
	}
}

/// Like `increment`, but walks the sub-rectangle `[start, end)`. Axes that carry are reset to their start instead of zero.
#[inline]
pub fn increment_in_range(
	pos: &mut [isize],
	start: &[isize],
	end: &[isize],
	ordering: Ordering,
) -> bool {
	let n = pos.len();
	if n == 0 {
		return false;
	}
	match ordering {
		Ordering::FirstMajor => {
			let mut i = n - 1;
			loop {
				pos[i] += 1;
				if pos[i] < end[i] {
					return true;
				}
				if i == 0 {
					return false;
				}
				pos[i] = start[i];
				i -= 1;
			}
		}
		Ordering::LastMajor => {
			let mut i = 0;
			loop {
				pos[i] += 1;
				if pos[i] < end[i] {
					return true;
				}
				if i == n - 1 {
					return false;
				}
				pos[i] = start[i];
				i += 1;
			}
		}
	}
}

#[test]
fn test_increment() {
	let shape = [2, 2];
	let mut pos = [0, 0];
	let mut visited = vec![pos];
	while increment(&mut pos, &shape, Ordering::FirstMajor) {
		visited.push(pos);
	}
	assert_eq!(visited, vec![[0, 0], [0, 1], [1, 0], [1, 1]]);
	// The terminal state is the outermost axis reaching its bound.
	assert_eq!(pos, [2, 0]);
	let mut pos = [0, 0];
	let mut visited = vec![pos];
	while increment(&mut pos, &shape, Ordering::LastMajor) {
		visited.push(pos);
	}
	assert_eq!(visited, vec![[0, 0], [1, 0], [0, 1], [1, 1]]);
	assert_eq!(pos, [0, 2]);
}

#[test]
fn test_increment_in_range() {
	let start = [1, 2];
	let end = [3, 4];
	let mut pos = start;
	let mut visited = vec![pos];
	while increment_in_range(&mut pos, &start, &end, Ordering::FirstMajor) {
		visited.push(pos);
	}
	assert_eq!(visited, vec![[1, 2], [1, 3], [2, 2], [2, 3]]);
}
