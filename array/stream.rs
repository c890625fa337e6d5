/*!
This module reads and writes arrays as binary or text streams.

A binary stream starts with a header of big-endian fields: the handle kind code (u32), the element type id (u32), the floating point precision (u8), the dimension count (u32) and one extent per dimension (i64). The elements follow in first-major order. Views are written as dense arrays. A multi-array writes the name of its current array and the number of arrays in place of elements, followed by each name and array.

The text format is a table with one row per line. Elements are separated by whitespace, commas or semicolons, and blank lines and lines starting with `#`, `/`, `*` or `C` are skipped.
*/

use crate::{
	config, registry, Array, DataType, Element, Handle, HandleKind, MultiArrayHandle, Precision,
	Rgba,
};
use anyhow::{Context, Result};
use num_complex::Complex64;
use std::{
	io::{self, BufRead, Read, Write},
	path::Path,
};
use tessera_iter::Coordinates;
use tessera_shape::{shape_size, Ordering, ShapeVector, MAX_DIMS};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
	#[error(transparent)]
	Io(#[from] io::Error),
	#[error("unknown handle kind {0}")]
	UnknownHandleKind(u32),
	#[error("unknown element type id {0}")]
	UnknownDataType(u32),
	#[error("unknown precision {0}")]
	UnknownPrecision(u8),
	#[error("invalid dimension count {0}")]
	InvalidDimensionCount(u32),
	#[error("invalid extent {0}")]
	InvalidExtent(i64),
	#[error("multi-arrays are nested more than {0} deep")]
	NestingTooDeep(usize),
	#[error("line {line}: {message}")]
	MalformedText { line: usize, message: String },
	#[error("element type {0} is not registered")]
	UnregisteredType(DataType),
}

/// Multi-arrays nested deeper than this in a binary stream are rejected.
const MAX_NESTING: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
	Text,
	Binary,
	/// Text for files ending in `.txt`, `.csv` or `.dat`, binary otherwise.
	Auto,
}

impl FileFormat {
	fn resolve(self, path: &Path) -> FileFormat {
		match self {
			FileFormat::Auto => {
				let extension = path
					.extension()
					.and_then(|extension| extension.to_str())
					.map(|extension| extension.to_ascii_lowercase());
				match extension.as_deref() {
					Some("txt") | Some("csv") | Some("dat") => FileFormat::Text,
					_ => FileFormat::Binary,
				}
			}
			format => format,
		}
	}
}

fn write_u32(writer: &mut dyn Write, value: u32) -> io::Result<()> {
	writer.write_all(&value.to_be_bytes())
}

fn read_u32(reader: &mut dyn Read) -> io::Result<u32> {
	let mut bytes = [0u8; 4];
	reader.read_exact(&mut bytes)?;
	Ok(u32::from_be_bytes(bytes))
}

fn write_name(writer: &mut dyn Write, name: &str) -> io::Result<()> {
	write_u32(writer, name.len() as u32)?;
	writer.write_all(name.as_bytes())
}

fn read_name(reader: &mut dyn Read) -> io::Result<String> {
	let len = read_u32(reader)? as usize;
	let mut bytes = Vec::new();
	(&mut *reader).take(len as u64).read_to_end(&mut bytes)?;
	if bytes.len() != len {
		return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated name"));
	}
	String::from_utf8(bytes).map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

fn write_header(
	writer: &mut dyn Write,
	kind: HandleKind,
	data_type: DataType,
	shape: &[isize],
) -> io::Result<()> {
	write_u32(writer, kind.code())?;
	write_u32(writer, data_type.id())?;
	writer.write_all(&[data_type.precision().code()])?;
	write_u32(writer, shape.len() as u32)?;
	for extent in shape {
		writer.write_all(&(*extent as i64).to_be_bytes())?;
	}
	Ok(())
}

struct Header {
	kind: HandleKind,
	type_id: u32,
	precision: Precision,
	shape: ShapeVector,
}

fn read_header(reader: &mut dyn Read) -> Result<Header, StreamError> {
	let code = read_u32(reader)?;
	let kind = HandleKind::from_code(code).ok_or_else(|| {
		log::warn!("unknown handle kind {} in stream", code);
		StreamError::UnknownHandleKind(code)
	})?;
	let type_id = read_u32(reader)?;
	let mut precision = [0u8; 1];
	reader.read_exact(&mut precision)?;
	let precision =
		Precision::from_code(precision[0]).ok_or(StreamError::UnknownPrecision(precision[0]))?;
	let ndims = read_u32(reader)?;
	if ndims as usize > MAX_DIMS {
		return Err(StreamError::InvalidDimensionCount(ndims));
	}
	let mut shape = ShapeVector::new();
	let mut size = 1i64;
	for _ in 0..ndims {
		let mut extent = [0u8; 8];
		reader.read_exact(&mut extent)?;
		let extent = i64::from_be_bytes(extent);
		if extent < 0 || extent > isize::MAX as i64 {
			return Err(StreamError::InvalidExtent(extent));
		}
		size = size
			.checked_mul(extent)
			.ok_or(StreamError::InvalidExtent(extent))?;
		shape.push(extent as isize);
	}
	let element_size = DataType::from_id(type_id)
		.and_then(|data_type| data_type.size_of())
		.unwrap_or(1) as i64;
	match size.checked_mul(element_size) {
		Some(bytes) if bytes <= isize::MAX as i64 => {}
		_ => return Err(StreamError::InvalidExtent(size)),
	}
	Ok(Header {
		kind,
		type_id,
		precision,
		shape,
	})
}

impl Array {
	/// Writes the array to a binary stream.
	pub fn write_binary(&self, writer: &mut dyn Write) -> Result<(), StreamError> {
		match self.handle.get() {
			Handle::Null => write_header(writer, HandleKind::Null, DataType::Null, &[])?,
			Handle::Multi(multi) => {
				write_header(writer, HandleKind::MultiArray, DataType::Null, &[])?;
				write_name(writer, multi.current_name().unwrap_or(""))?;
				write_u32(writer, multi.arrays().len() as u32)?;
				for (name, array) in multi.arrays() {
					write_name(writer, name)?;
					array.write_binary(writer)?;
				}
			}
			handle => {
				write_header(writer, HandleKind::Dense, handle.data_type(), &handle.shape())?;
				if let Some(target) = handle.target() {
					target
						.storage
						.write_binary(target.offset, &target.shape, writer)?;
				}
			}
		}
		Ok(())
	}

	/// Reads an array written by [`write_binary`](#method.write_binary). The result is always dense or a multi-array.
	pub fn read_binary(reader: &mut dyn Read) -> Result<Array, StreamError> {
		Array::read_binary_nested(reader, 0)
	}

	fn read_binary_nested(reader: &mut dyn Read, depth: usize) -> Result<Array, StreamError> {
		let header = read_header(reader)?;
		match header.kind {
			HandleKind::Null => Ok(Array::null()),
			HandleKind::MultiArray => {
				if depth >= MAX_NESTING {
					return Err(StreamError::NestingTooDeep(MAX_NESTING));
				}
				let current = read_name(reader)?;
				let count = read_u32(reader)?;
				let mut multi = MultiArrayHandle::new();
				for _ in 0..count {
					let name = read_name(reader)?;
					let array = Array::read_binary_nested(reader, depth + 1)?;
					multi.add_array(&name, array);
				}
				multi.set_current_array(&current);
				Ok(Array::from_handle(Handle::Multi(multi)))
			}
			HandleKind::Dense | HandleKind::View => {
				let data_type = DataType::from_id(header.type_id).ok_or_else(|| {
					log::warn!("unknown element type id {} in stream", header.type_id);
					StreamError::UnknownDataType(header.type_id)
				})?;
				let prototype = registry::get_handle(HandleKind::Dense, data_type);
				let storage = match prototype.get() {
					Handle::Dense(storage) if storage.data_type() == data_type => storage,
					_ => return Err(StreamError::UnregisteredType(data_type)),
				};
				if shape_size(&header.shape) == 0 {
					return Ok(Array::new(data_type, &header.shape));
				}
				let storage = storage.read_new(&header.shape, reader, header.precision)?;
				Ok(Array::from_handle(Handle::Dense(storage)))
			}
		}
	}

	/// Writes every element in first-major order, each followed by `separator`. [`read_text`](#method.read_text) splits on whitespace, commas, semicolons and the configured separator. Text written with any other separator reads back with [`read_text_with_separator`](#method.read_text_with_separator).
	pub fn write_text(&self, writer: &mut dyn Write, separator: &str) -> Result<(), StreamError> {
		if let Some(target) = self.handle.get().target() {
			target
				.storage
				.write_text(target.offset, &target.shape, writer, separator)?;
		}
		Ok(())
	}

	/// Writes the array as a table with one line per row along the last axis. Elements are followed by the configured text separator.
	pub fn write_text_table(&self, writer: &mut dyn Write) -> Result<(), StreamError> {
		let separator = config::text_separator();
		let target = match self.handle.get().target() {
			Some(target) => target,
			None => return Ok(()),
		};
		let last = match target.shape.len().checked_sub(1) {
			Some(last) => last,
			None => return Ok(()),
		};
		let mut row_shape = target.shape;
		for extent in row_shape.iter_mut().take(last) {
			*extent = 1;
		}
		for pos in Coordinates::skipping_axis(&target.shape, last, Ordering::FirstMajor) {
			target
				.storage
				.write_text(target.offset_of(&pos), &row_shape, writer, &separator)?;
			writer.write_all(b"\n")?;
		}
		Ok(())
	}

	/// Parses a text table. Each row is one line, and the element type is detected from the first element: `(r,g,b,a)` gives an `Rgba` array, `(re,im)` gives a `Complex64` array and anything else a `Float64` array. A single row gives a one dimensional array.
	pub fn read_text(reader: &mut dyn BufRead) -> Result<Array, StreamError> {
		Array::read_text_with_separator(reader, &config::text_separator())
	}

	/// Parses a text table like [`read_text`](#method.read_text), also splitting elements on `separator`.
	pub fn read_text_with_separator(
		reader: &mut dyn BufRead,
		separator: &str,
	) -> Result<Array, StreamError> {
		let mut rows = Vec::new();
		for (index, line) in reader.lines().enumerate() {
			let line = line?;
			let line = line.trim();
			if line.is_empty() || line.starts_with(&['#', '/', '*', 'C'][..]) {
				continue;
			}
			rows.push((index + 1, tokenize(line, separator)));
		}
		let first = match rows.first().and_then(|(_, tokens)| tokens.first()) {
			Some(first) => first.as_str(),
			None => return Ok(Array::null()),
		};
		if first.starts_with('(') {
			match first.split(',').count() {
				4 => parse_table::<Rgba>(&rows),
				2 => parse_table::<Complex64>(&rows),
				_ => Err(StreamError::MalformedText {
					line: rows[0].0,
					message: format!("cannot detect the element type of {}", first),
				}),
			}
		} else {
			parse_table::<f64>(&rows)
		}
	}

	/// Writes the array to the file at `path`.
	pub fn save(&self, path: &Path, format: FileFormat) -> Result<()> {
		let file = std::fs::File::create(path)
			.with_context(|| format!("failed to create {}", path.display()))?;
		let mut writer = std::io::BufWriter::new(file);
		let written = match format.resolve(path) {
			FileFormat::Text => self.write_text_table(&mut writer),
			_ => self.write_binary(&mut writer),
		};
		written.with_context(|| format!("failed to write {}", path.display()))?;
		writer.flush()?;
		Ok(())
	}

	/// Reads an array from the file at `path`.
	pub fn load(path: &Path, format: FileFormat) -> Result<Array> {
		let file = std::fs::File::open(path)
			.with_context(|| format!("failed to open {}", path.display()))?;
		let mut reader = std::io::BufReader::new(file);
		let array = match format.resolve(path) {
			FileFormat::Text => Array::read_text(&mut reader),
			_ => Array::read_binary(&mut reader),
		}
		.with_context(|| format!("failed to read {}", path.display()))?;
		Ok(array)
	}
}

/// Splits a line on whitespace, commas, semicolons and `separator` outside parentheses.
fn tokenize(line: &str, separator: &str) -> Vec<String> {
	let separator = separator.trim();
	let mut tokens = Vec::new();
	let mut token = String::new();
	let mut depth = 0usize;
	let mut skip = 0usize;
	for (index, c) in line.char_indices() {
		if skip > 0 {
			skip -= 1;
			continue;
		}
		match c {
			'(' => depth += 1,
			')' => depth = depth.saturating_sub(1),
			_ => {}
		}
		let at_separator =
			depth == 0 && !separator.is_empty() && line[index..].starts_with(separator);
		if at_separator {
			skip = separator.chars().count() - 1;
		}
		if depth == 0 && (at_separator || c.is_whitespace() || c == ',' || c == ';') {
			if !token.is_empty() {
				tokens.push(std::mem::take(&mut token));
			}
		} else {
			token.push(c);
		}
	}
	if !token.is_empty() {
		tokens.push(token);
	}
	tokens
}

fn parse_table<T: Element>(rows: &[(usize, Vec<String>)]) -> Result<Array, StreamError> {
	let columns = rows[0].1.len();
	let mut values = Vec::with_capacity(rows.len() * columns);
	for (line, tokens) in rows {
		if tokens.len() != columns {
			return Err(StreamError::MalformedText {
				line: *line,
				message: format!("expected {} columns but found {}", columns, tokens.len()),
			});
		}
		for token in tokens {
			let value = T::parse_text(token).ok_or_else(|| StreamError::MalformedText {
				line: *line,
				message: format!("cannot parse {} as {}", token, T::DATA_TYPE),
			})?;
			values.push(value);
		}
	}
	let shape = if rows.len() == 1 {
		vec![columns as isize]
	} else {
		vec![rows.len() as isize, columns as isize]
	};
	Ok(Array::from_vec(values, &shape))
}

#[test]
fn test_binary_header() {
	let array = Array::from_vec(vec![1u8, 2], &[2]);
	let mut bytes = Vec::new();
	array.write_binary(&mut bytes).unwrap();
	insta::assert_debug_snapshot!(bytes, @r###"
 [
     0,
     0,
     0,
     1,
     0,
     0,
     0,
     3,
     0,
     0,
     0,
     0,
     1,
     0,
     0,
     0,
     0,
     0,
     0,
     0,
     2,
     1,
     2,
 ]
 "###);
}

#[test]
fn test_binary_round_trip() {
	let array = Array::from_vec(vec![0.1f64, -1.0 / 3.0, 1e300, f64::MIN_POSITIVE], &[2, 2]);
	let mut bytes = Vec::new();
	array.write_binary(&mut bytes).unwrap();
	let read = Array::read_binary(&mut bytes.as_slice()).unwrap();
	assert_eq!(read.data_type(), DataType::Float64);
	assert_eq!(read.shape(), [2, 2]);
	let bits = |array: &Array| {
		array
			.to_vec::<f64>()
			.unwrap()
			.into_iter()
			.map(f64::to_bits)
			.collect::<Vec<_>>()
	};
	assert_eq!(bits(&read), bits(&array));
	// Views are written as dense arrays.
	let view = Array::from_vec((0..12).collect::<Vec<i16>>(), &[3, 4]).mid(&[1, 1], Some(&[2, 2][..]));
	let mut bytes = Vec::new();
	view.write_binary(&mut bytes).unwrap();
	let read = Array::read_binary(&mut bytes.as_slice()).unwrap();
	assert_eq!(read.kind(), HandleKind::Dense);
	assert_eq!(read.to_vec::<i16>(), Some(vec![5, 6, 9, 10]));
	let strings = Array::from_vec(vec!["a b".to_owned(), String::new()], &[2]);
	let mut bytes = Vec::new();
	strings.write_binary(&mut bytes).unwrap();
	let read = Array::read_binary(&mut bytes.as_slice()).unwrap();
	assert_eq!(read.to_vec::<String>(), strings.to_vec::<String>());
	let mut bytes = Vec::new();
	Array::null().write_binary(&mut bytes).unwrap();
	assert!(Array::read_binary(&mut bytes.as_slice()).unwrap().is_null());
}

#[test]
fn test_binary_errors() {
	let mut bytes = Vec::new();
	Array::from_vec(vec![1i32], &[1]).write_binary(&mut bytes).unwrap();
	let mut unknown_kind = bytes.clone();
	unknown_kind[3] = 9;
	assert!(matches!(
		Array::read_binary(&mut unknown_kind.as_slice()),
		Err(StreamError::UnknownHandleKind(9))
	));
	let mut unknown_type = bytes.clone();
	unknown_type[7] = 200;
	assert!(matches!(
		Array::read_binary(&mut unknown_type.as_slice()),
		Err(StreamError::UnknownDataType(200))
	));
	let mut too_many_dims = bytes.clone();
	too_many_dims[12] = 9;
	assert!(matches!(
		Array::read_binary(&mut too_many_dims.as_slice()),
		Err(StreamError::InvalidDimensionCount(9))
	));
	let truncated = &bytes[..bytes.len() - 1];
	assert!(matches!(
		Array::read_binary(&mut &truncated[..]),
		Err(StreamError::Io(_))
	));
}

#[test]
fn test_oversized_headers() {
	let header = |extents: &[i64]| {
		let mut bytes = vec![0, 0, 0, 1, 0, 0, 0, 3, 0];
		bytes.extend_from_slice(&(extents.len() as u32).to_be_bytes());
		for extent in extents {
			bytes.extend_from_slice(&extent.to_be_bytes());
		}
		bytes
	};
	let overflowing = header(&[1 << 20; 4]);
	assert!(matches!(
		Array::read_binary(&mut overflowing.as_slice()),
		Err(StreamError::InvalidExtent(_))
	));
	let too_many_bytes = header(&[1 << 62, 4]);
	assert!(matches!(
		Array::read_binary(&mut too_many_bytes.as_slice()),
		Err(StreamError::InvalidExtent(_))
	));
	let truncated = header(&[1 << 20, 1 << 20]);
	assert!(matches!(
		Array::read_binary(&mut truncated.as_slice()),
		Err(StreamError::Io(_))
	));
	let empty = header(&[0, 5]);
	let read = Array::read_binary(&mut empty.as_slice()).unwrap();
	assert!(read.is_empty());
	assert_eq!(read.data_type(), DataType::UInt8);
}

#[test]
fn test_nested_multi_arrays() {
	let nested = |depth: usize| {
		let mut bytes = Vec::new();
		for _ in 0..depth {
			bytes.extend_from_slice(&[0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
			bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
		}
		bytes.extend_from_slice(&[0; 13]);
		bytes
	};
	let read = Array::read_binary(&mut nested(3).as_slice()).unwrap();
	assert_eq!(read.kind(), HandleKind::MultiArray);
	assert!(matches!(
		Array::read_binary(&mut nested(100_000).as_slice()),
		Err(StreamError::NestingTooDeep(_))
	));
	let mut name = vec![0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0];
	name.extend_from_slice(&u32::MAX.to_be_bytes());
	assert!(matches!(
		Array::read_binary(&mut name.as_slice()),
		Err(StreamError::Io(_))
	));
}

#[test]
fn test_text_round_trip() {
	let array = Array::from_vec(vec![0.1f64, 2.5, -3.0, 1e-7, 4.0, 1.0 / 3.0], &[2, 3]);
	let mut text = Vec::new();
	array.write_text_table(&mut text).unwrap();
	let read = Array::read_text(&mut text.as_slice()).unwrap();
	assert_eq!(read.shape(), [2, 3]);
	assert_eq!(read.to_vec::<f64>(), array.to_vec::<f64>());
	let mut text = Vec::new();
	Array::from_vec(vec![1u8, 2, 3], &[3]).write_text(&mut text, ";").unwrap();
	assert_eq!(String::from_utf8(text).unwrap(), "1;2;3;");
	let mut text = Vec::new();
	Array::from_vec(vec![1.5f64, 2.0, -3.0], &[3]).write_text(&mut text, "|").unwrap();
	let read = Array::read_text_with_separator(&mut text.as_slice(), "|").unwrap();
	assert_eq!(read.to_vec::<f64>(), Some(vec![1.5, 2.0, -3.0]));
	assert!(Array::read_text(&mut text.as_slice()).is_err());
}

#[test]
fn test_read_text() {
	let text = "# comment\n\n1, 2; 3\n4 5 6\n";
	let array = Array::read_text(&mut text.as_bytes()).unwrap();
	assert_eq!(array.data_type(), DataType::Float64);
	assert_eq!(array.shape(), [2, 3]);
	assert_eq!(array.to_vec::<f64>(), Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
	let array = Array::read_text(&mut "(1,2) (3, -4)".as_bytes()).unwrap();
	assert_eq!(array.data_type(), DataType::Complex64);
	assert_eq!(array.shape(), [2]);
	assert_eq!(
		array.to_vec::<Complex64>(),
		Some(vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, -4.0)])
	);
	let array = Array::read_text(&mut "(1,2,3,4)\n(5,6,7,8)".as_bytes()).unwrap();
	assert_eq!(array.data_type(), DataType::Rgba);
	assert_eq!(array.shape(), [2, 1]);
	assert!(matches!(
		Array::read_text(&mut "1 2\n3".as_bytes()),
		Err(StreamError::MalformedText { line: 2, .. })
	));
	assert!(matches!(
		Array::read_text(&mut "1 x".as_bytes()),
		Err(StreamError::MalformedText { line: 1, .. })
	));
	assert!(Array::read_text(&mut "# nothing".as_bytes()).unwrap().is_null());
}

#[test]
fn test_save_and_load() {
	let dir = std::env::temp_dir();
	let array = Array::from_vec(vec![1.5f32, 2.5, 3.5, 4.5], &[2, 2]);
	let binary = dir.join(format!("tessera_save_{}.bin", std::process::id()));
	array.save(&binary, FileFormat::Auto).unwrap();
	let read = Array::load(&binary, FileFormat::Auto).unwrap();
	assert_eq!(read.data_type(), DataType::Float32);
	assert_eq!(read.to_vec::<f32>(), array.to_vec::<f32>());
	let text = dir.join(format!("tessera_save_{}.txt", std::process::id()));
	array.save(&text, FileFormat::Auto).unwrap();
	let read = Array::load(&text, FileFormat::Auto).unwrap();
	assert_eq!(read.data_type(), DataType::Float64);
	assert_eq!(read.to_vec::<f32>(), array.to_vec::<f32>());
	std::fs::remove_file(binary).unwrap();
	std::fs::remove_file(text).unwrap();
	assert!(Array::load(&dir.join("tessera_missing.bin"), FileFormat::Binary).is_err());
}
