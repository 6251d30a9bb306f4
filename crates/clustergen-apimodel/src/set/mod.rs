//! Parser for `--set` override expressions.
//!
//! An override expression contains one or more comma separated assignments of
//! the form `<PATH>=<VALUE>`:
//!
//! ```text
//! masterProfile.count=3,linuxProfile.adminUsername=azureuser
//! ```
//!
//! The first `=` of an assignment separates the path from the value, every
//! following `=` belongs to the value. Values which need to contain a `,`
//! are wrapped in single or double quotes. Quotes are only recognized as the
//! first character of a value, there is no way to escape the surrounding
//! quote character inside a quoted value.
//!
//! ```
//! use clustergen_apimodel::set::{parse_expression, Quote};
//!
//! let assignments = parse_expression(r#"servicePrincipalProfile.secret="a=b,c==""#).unwrap();
//!
//! assert_eq!(assignments.len(), 1);
//! assert_eq!(assignments[0].path, "servicePrincipalProfile.secret");
//! assert_eq!(assignments[0].value, "a=b,c==");
//! assert_eq!(assignments[0].quote, Some(Quote::Double));
//! ```
use std::fmt::Display;

use snafu::{Snafu, ensure};

type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Errors which can be encountered when an override expression violates the
/// assignment grammar.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseError {
    #[snafu(display("malformed override: the expression is empty"))]
    EmptyExpression,

    #[snafu(display("malformed override: empty assignment at byte {position}"))]
    EmptyAssignment { position: usize },

    #[snafu(display("malformed override {assignment:?}: expected <PATH>=<VALUE>"))]
    MissingEquals { assignment: String },

    #[snafu(display("malformed override {assignment:?}: the path before '=' is empty"))]
    EmptyPath { assignment: String },

    #[snafu(display("malformed override {assignment:?}: missing closing {quote} quote"))]
    UnterminatedQuote { assignment: String, quote: Quote },

    #[snafu(display(
        "malformed override {assignment:?}: unexpected character {character:?} after closing {quote} quote, \
        quotes inside a quoted value are not supported"
    ))]
    TrailingCharacters {
        assignment: String,
        quote: Quote,
        character: char,
    },
}

/// The quote character a value was wrapped in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Quote {
    Single,
    Double,
}

impl Quote {
    fn from_char(character: char) -> Option<Self> {
        match character {
            '\'' => Some(Self::Single),
            '"' => Some(Self::Double),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }
}

/// A single `<PATH>=<VALUE>` assignment of an override expression.
///
/// The path is kept unparsed, see [`Path`](crate::document::Path) for the
/// path syntax. The value has its surrounding quotes removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub path: String,
    pub value: String,
    pub quote: Option<Quote>,
}

impl Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.quote {
            Some(quote) => {
                let quote = quote.as_char();
                write!(f, "{}={quote}{}{quote}", self.path, self.value)
            }
            None => write!(f, "{}={}", self.path, self.value),
        }
    }
}

/// Splits an override expression into its assignments, in the order they
/// appear in `input`.
pub fn parse_expression(input: &str) -> Result<Vec<Assignment>> {
    ensure!(!input.is_empty(), EmptyExpressionSnafu);

    let mut assignments = Vec::new();
    let mut start = 0;

    loop {
        let (assignment, next) = parse_assignment(input, start)?;
        assignments.push(assignment);

        match next {
            Some(next) => start = next,
            None => return Ok(assignments),
        }
    }
}

/// Parses the assignment starting at byte `start` of `input`.
///
/// Returns the assignment and, if a delimiting comma follows, the byte offset
/// of the next assignment.
fn parse_assignment(input: &str, start: usize) -> Result<(Assignment, Option<usize>)> {
    let rest = &input[start..];
    // The offending substring reported in errors, up to the next comma
    let until_comma = || rest.split(',').next().unwrap_or_default().to_owned();

    let Some(delimiter) = rest.find(['=', ',']) else {
        ensure!(!rest.is_empty(), EmptyAssignmentSnafu { position: start });
        return MissingEqualsSnafu { assignment: rest }.fail();
    };

    if rest[delimiter..].starts_with(',') {
        ensure!(delimiter > 0, EmptyAssignmentSnafu { position: start });
        return MissingEqualsSnafu {
            assignment: until_comma(),
        }
        .fail();
    }

    let path = &rest[..delimiter];
    ensure!(
        !path.is_empty(),
        EmptyPathSnafu {
            assignment: until_comma()
        }
    );

    let value_start = delimiter + 1;
    let value_rest = &rest[value_start..];

    let Some(quote) = value_rest.chars().next().and_then(Quote::from_char) else {
        // Unquoted values end at the next comma
        let (value, next) = match value_rest.find(',') {
            Some(comma) => (
                &value_rest[..comma],
                Some(start + value_start + comma + 1),
            ),
            None => (value_rest, None),
        };

        let assignment = Assignment {
            path: path.to_owned(),
            value: value.to_owned(),
            quote: None,
        };
        return Ok((assignment, next));
    };

    let quoted = &value_rest[1..];
    let Some(closing) = quoted.find(quote.as_char()) else {
        return UnterminatedQuoteSnafu {
            assignment: rest,
            quote,
        }
        .fail();
    };

    let value = &quoted[..closing];
    let after = &quoted[closing + 1..];
    let next = match after.chars().next() {
        None => None,
        // The offset of `after` within `input`, skipping the comma
        Some(',') => Some(input.len() - after.len() + 1),
        Some(character) => {
            let end = value_start + 1 + closing + 1 + after.find(',').unwrap_or(after.len());
            return TrailingCharactersSnafu {
                assignment: &rest[..end],
                quote,
                character,
            }
            .fail();
        }
    };

    let assignment = Assignment {
        path: path.to_owned(),
        value: value.to_owned(),
        quote: Some(quote),
    };
    Ok((assignment, next))
}
