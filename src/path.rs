/* src/path.rs */

//!
//! Typed dotted paths into the materialized state.

use std::fmt;
use std::str::FromStr;

/// Errors produced while parsing a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
	/// A segment between two dots (or at either end) was empty.
	#[error("path `{path}` contains an empty segment")]
	EmptySegment { path: String },
	/// A pre-split segment contained the separator.
	#[error("path segment `{segment}` contains `.`")]
	DottedSegment { segment: String },
}

/// A validated path: an ordered list of non-empty segments.
///
/// The empty path is the root of the state. The textual form joins
/// segments with `.`, so `"a.b.c"` addresses key `c` inside `b` inside `a`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
	segments: Vec<String>,
}

impl Path {
	/// The root path.
	pub const fn root() -> Self {
		Self {
			segments: Vec::new(),
		}
	}

	/// Parses a dotted path. The empty string is the root.
	pub fn parse(input: &str) -> Result<Self, PathError> {
		if input.is_empty() {
			return Ok(Self::root());
		}
		let mut segments = Vec::new();
		for segment in input.split('.') {
			if segment.is_empty() {
				return Err(PathError::EmptySegment {
					path: input.to_string(),
				});
			}
			segments.push(segment.to_string());
		}
		Ok(Self { segments })
	}

	/// Builds a path from pre-split segments. Segments must be non-empty
	/// and free of `.`, so the textual form parses back to the same path.
	pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
		if segments.iter().any(String::is_empty) {
			return Err(PathError::EmptySegment {
				path: segments.join("."),
			});
		}
		if let Some(segment) = segments.iter().find(|segment| segment.contains('.')) {
			return Err(PathError::DottedSegment {
				segment: segment.clone(),
			});
		}
		Ok(Self { segments })
	}

	/// Single-segment path for a top-level key.
	pub(crate) fn key(key: &str) -> Self {
		Self {
			segments: vec![key.to_string()],
		}
	}

	/// The first `len` segments of this path.
	pub(crate) fn prefix(&self, len: usize) -> Self {
		Self {
			segments: self.segments.iter().take(len).cloned().collect(),
		}
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// The top-level key this path lives under, `None` for the root.
	pub fn top_key(&self) -> Option<&str> {
		self.segments.first().map(String::as_str)
	}

	/// Returns a new path with `segment` appended.
	pub fn child(&self, segment: impl Into<String>) -> Self {
		let mut segments = self.segments.clone();
		segments.push(segment.into());
		Self { segments }
	}

	/// Splits into the parent segments and the final segment.
	pub fn split_last(&self) -> Option<(&[String], &str)> {
		self.segments
			.split_last()
			.map(|(last, parent)| (parent, last.as_str()))
	}

	/// Segment-wise prefix test: `a.b` is a prefix of `a.b.c` but not of `a.bc`.
	/// The root is a prefix of every path.
	pub fn is_prefix_of(&self, other: &Path) -> bool {
		other.segments.starts_with(&self.segments)
	}

	/// True when either path is a prefix of the other.
	pub fn overlaps(&self, other: &Path) -> bool {
		self.is_prefix_of(other) || other.is_prefix_of(self)
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.segments.join("."))
	}
}

impl FromStr for Path {
	type Err = PathError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<&str> for Path {
	type Error = PathError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl TryFrom<String> for Path {
	type Error = PathError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

/// Anything that can name a path in the public API.
pub trait IntoPath {
	fn into_path(self) -> Result<Path, PathError>;
}

impl IntoPath for Path {
	fn into_path(self) -> Result<Path, PathError> {
		Ok(self)
	}
}

impl IntoPath for &Path {
	fn into_path(self) -> Result<Path, PathError> {
		Ok(self.clone())
	}
}

impl IntoPath for &str {
	fn into_path(self) -> Result<Path, PathError> {
		Path::parse(self)
	}
}

impl IntoPath for String {
	fn into_path(self) -> Result<Path, PathError> {
		Path::parse(&self)
	}
}

impl IntoPath for &String {
	fn into_path(self) -> Result<Path, PathError> {
		Path::parse(self)
	}
}
