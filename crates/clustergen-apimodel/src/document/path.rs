use std::{fmt::Display, num::ParseIntError, str::FromStr};

use snafu::{ResultExt, Snafu, ensure};

type Result<T, E = ParsePathError> = std::result::Result<T, E>;

/// Error variants which can be encountered when parsing a [`Path`] from
/// unparsed input.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParsePathError {
    #[snafu(display("path cannot be empty"))]
    EmptyPath,

    #[snafu(display("path {path:?} contains an empty field name at byte {position}"))]
    EmptySegment { path: String, position: usize },

    #[snafu(display("path {path:?} contains unexpected character {character:?} at byte {position}"))]
    UnexpectedCharacter {
        path: String,
        character: char,
        position: usize,
    },

    #[snafu(display("path {path:?} ends with an unfinished escape sequence"))]
    DanglingEscape { path: String },

    #[snafu(display("path {path:?} contains an unclosed index bracket at byte {position}"))]
    UnclosedBracket { path: String, position: usize },

    #[snafu(display("index {index:?} in path {path:?} must be a non-negative integer"))]
    InvalidIndex { path: String, index: String },

    #[snafu(display("index {index:?} in path {path:?} is out of the supported range"))]
    ParseIndex {
        source: ParseIntError,
        path: String,
        index: String,
    },
}

/// A single step of a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Selects the value stored under a key of an object.
    Field(String),

    /// Selects the element at a zero-based position of an array.
    Index(usize),
}

/// The location of a value inside a [`Document`](super::Document).
///
/// Paths are written as dot separated field names, where every field name can
/// be followed by one or more zero-based indices, e.g.
/// `agentPoolProfiles[0].customNodeLabels`. Field names containing dots or
/// brackets escape them with a backslash: `labels.app\.example\.com/name`.
///
/// ```
/// # use std::str::FromStr;
/// use clustergen_apimodel::document::{Path, Segment};
///
/// let path = Path::from_str("linuxProfile.ssh.publicKeys[0].keyData").unwrap();
///
/// assert_eq!(path.segments()[3], Segment::Index(0));
/// assert_eq!(path.to_string(), "linuxProfile.ssh.publicKeys[0].keyData");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl FromStr for Path {
    type Err = ParsePathError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty(), EmptyPathSnafu);

        let mut segments = Vec::new();
        let mut name = String::new();
        // Set after a closing bracket, where only '.', '[' or the end of input
        // may follow.
        let mut after_index = false;
        let mut chars = input.char_indices();

        while let Some((position, character)) = chars.next() {
            if after_index {
                match character {
                    '.' => after_index = false,
                    '[' => segments.push(Segment::Index(parse_index(input, position, &mut chars)?)),
                    character => {
                        return UnexpectedCharacterSnafu {
                            path: input,
                            character,
                            position,
                        }
                        .fail();
                    }
                }
                continue;
            }

            match character {
                '\\' => match chars.next() {
                    Some((_, escaped @ ('.' | '[' | ']' | '\\'))) => name.push(escaped),
                    Some((position, character)) => {
                        return UnexpectedCharacterSnafu {
                            path: input,
                            character,
                            position,
                        }
                        .fail();
                    }
                    None => return DanglingEscapeSnafu { path: input }.fail(),
                },
                '.' => {
                    ensure!(
                        !name.is_empty(),
                        EmptySegmentSnafu {
                            path: input,
                            position
                        }
                    );
                    segments.push(Segment::Field(std::mem::take(&mut name)));
                }
                '[' => {
                    ensure!(
                        !name.is_empty(),
                        EmptySegmentSnafu {
                            path: input,
                            position
                        }
                    );
                    segments.push(Segment::Field(std::mem::take(&mut name)));
                    segments.push(Segment::Index(parse_index(input, position, &mut chars)?));
                    after_index = true;
                }
                character if is_reserved(character) => {
                    return UnexpectedCharacterSnafu {
                        path: input,
                        character,
                        position,
                    }
                    .fail();
                }
                character => name.push(character),
            }
        }

        if !after_index {
            ensure!(
                !name.is_empty(),
                EmptySegmentSnafu {
                    path: input,
                    position: input.len()
                }
            );
            segments.push(Segment::Field(name));
        }

        Ok(Self(segments))
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    for character in name.chars() {
                        if matches!(character, '.' | '[' | ']' | '\\') {
                            f.write_str("\\")?;
                        }
                        write!(f, "{character}")?;
                    }
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Path {
    pub fn new(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self(segments.into_iter().collect())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Returns a new path with `field` placed in front of all segments of
    /// `self`.
    pub fn prepend_field(&self, field: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.push(Segment::Field(field.into()));
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    /// Returns the path made up of the first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }
}

fn is_reserved(character: char) -> bool {
    character.is_whitespace() || matches!(character, ']' | '=' | ',' | '"' | '\'')
}

/// Consumes the characters following an opening bracket at `open_position`
/// up to and including the closing bracket.
fn parse_index(
    path: &str,
    open_position: usize,
    chars: &mut std::str::CharIndices<'_>,
) -> Result<usize> {
    let mut index = String::new();
    loop {
        match chars.next() {
            Some((_, ']')) => break,
            Some((_, character)) => index.push(character),
            None => {
                return UnclosedBracketSnafu {
                    path,
                    position: open_position,
                }
                .fail();
            }
        }
    }

    ensure!(
        !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()),
        InvalidIndexSnafu { path, index }
    );

    index
        .parse::<usize>()
        .context(ParseIndexSnafu { path, index: &index })
}
