//! A generic, schema-less tree of objects, arrays and scalars.
//!
//! The API model is kept in this form while overrides are applied, because
//! overrides may address locations which do not exist yet, or which the typed
//! [`ApiModel`](crate::ApiModel) would not be able to represent before defaults
//! are filled in.
use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value};
use snafu::{Snafu, ensure};

mod path;

pub use path::*;

/// Errors which can be encountered when a [`Path`] conflicts with the existing
/// structure of a [`Document`].
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum PathApplyError {
    #[snafu(display("cannot replace the document root, the path must contain at least one segment"))]
    EmptyPath,

    #[snafu(display("cannot set {path:?}: {parent:?} is {found}, expected an object"))]
    NotAnObject {
        path: String,
        parent: String,
        found: &'static str,
    },

    #[snafu(display("cannot set {path:?}: {parent:?} is {found}, expected an array"))]
    NotAnArray {
        path: String,
        parent: String,
        found: &'static str,
    },

    #[snafu(display(
        "cannot set {path:?}: index {index} is out of range for {parent:?} with {len} element(s), \
        only existing elements can be replaced and the next element ({len}) can be appended"
    ))]
    IndexOutOfRange {
        path: String,
        parent: String,
        index: usize,
        len: usize,
    },
}

/// The mutable document an API model is loaded into.
///
/// The root of a document is always an object. Nested values use the
/// [`serde_json::Value`] variants: objects, arrays and scalars.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Default for Document {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }
}

impl Document {
    /// Returns the value stored at `path`, if any.
    pub fn get(&self, path: &Path) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(&self.0, |cursor, segment| match (segment, cursor) {
                (Segment::Field(name), Value::Object(map)) => map.get(name),
                (Segment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            })
    }

    /// Stores `value` at `path`, overwriting whatever was stored there before.
    ///
    /// Missing objects along the way are created. Arrays are created when
    /// absent and can be extended by exactly one element: an index equal to
    /// the current length appends a new element, a larger index is rejected.
    /// A `null` in the middle of the path is treated like an absent value.
    ///
    /// The document is left untouched if an error is returned.
    pub fn set(&mut self, path: &Path, value: Value) -> Result<(), PathApplyError> {
        self.check(path)?;

        let mut cursor = &mut self.0;
        for (position, segment) in path.segments().iter().enumerate() {
            cursor = match segment {
                Segment::Field(name) => {
                    if cursor.is_null() {
                        *cursor = Value::Object(Map::new());
                    }
                    let found = kind(cursor);
                    let Value::Object(map) = cursor else {
                        return NotAnObjectSnafu {
                            path: path.to_string(),
                            parent: path.prefix(position).to_string(),
                            found,
                        }
                        .fail();
                    };
                    map.entry(name.as_str()).or_insert(Value::Null)
                }
                Segment::Index(index) => {
                    if cursor.is_null() {
                        *cursor = Value::Array(Vec::new());
                    }
                    let found = kind(cursor);
                    let Value::Array(items) = cursor else {
                        return NotAnArraySnafu {
                            path: path.to_string(),
                            parent: path.prefix(position).to_string(),
                            found,
                        }
                        .fail();
                    };
                    if *index == items.len() {
                        items.push(Value::Null);
                    }
                    let len = items.len();
                    match items.get_mut(*index) {
                        Some(item) => item,
                        None => {
                            return IndexOutOfRangeSnafu {
                                path: path.to_string(),
                                parent: path.prefix(position).to_string(),
                                index: *index,
                                len,
                            }
                            .fail();
                        }
                    }
                }
            };
        }

        *cursor = value;
        Ok(())
    }

    /// Walks `path` without modifying the document and returns the first
    /// conflict [`Document::set`] would run into.
    fn check(&self, path: &Path) -> Result<(), PathApplyError> {
        ensure!(!path.segments().is_empty(), EmptyPathSnafu);

        // `None` once the walk has left the existing structure, everything
        // below that point is going to be created.
        let mut cursor = Some(&self.0);

        for (position, segment) in path.segments().iter().enumerate() {
            let existing = cursor.filter(|value| !value.is_null());
            cursor = match (segment, existing) {
                (Segment::Field(_), None) => None,
                (Segment::Field(name), Some(Value::Object(map))) => map.get(name),
                (Segment::Field(_), Some(other)) => {
                    return NotAnObjectSnafu {
                        path: path.to_string(),
                        parent: path.prefix(position).to_string(),
                        found: kind(other),
                    }
                    .fail();
                }
                (Segment::Index(index), existing) => {
                    let items = match existing {
                        None => &[][..],
                        Some(Value::Array(items)) => items.as_slice(),
                        Some(other) => {
                            return NotAnArraySnafu {
                                path: path.to_string(),
                                parent: path.prefix(position).to_string(),
                                found: kind(other),
                            }
                            .fail();
                        }
                    };
                    match index.cmp(&items.len()) {
                        Ordering::Less => items.get(*index),
                        Ordering::Equal => None,
                        Ordering::Greater => {
                            return IndexOutOfRangeSnafu {
                                path: path.to_string(),
                                parent: path.prefix(position).to_string(),
                                index: *index,
                                len: items.len(),
                            }
                            .fail();
                        }
                    }
                }
            };
        }

        Ok(())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Describes the kind of a value for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
