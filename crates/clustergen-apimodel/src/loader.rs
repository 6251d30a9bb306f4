//! Reads API model files into a [`Document`].
//!
//! Files ending in `.yaml` or `.yml` are parsed as YAML, everything else as
//! JSON.
use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use serde_json::Value;
use snafu::{ResultExt, Snafu};
use tracing::instrument;

use crate::document::{Document, kind};

type Result<T, E = LoadError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum LoadError {
    #[snafu(display("API model file {path} does not exist", path = path.display()))]
    NotFound { path: PathBuf },

    #[snafu(display("failed to read API model file {path}", path = path.display()))]
    ReadFile { source: io::Error, path: PathBuf },

    #[snafu(display("failed to parse API model file {path} as JSON", path = path.display()))]
    MalformedJson {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse API model file {path} as YAML", path = path.display()))]
    MalformedYaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display(
        "API model file {path} must contain an object at the top level, found {found}",
        path = path.display()
    ))]
    RootNotAnObject { path: PathBuf, found: &'static str },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension)
                if extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml") =>
            {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Loads the API model file at `path`.
///
/// A missing file is reported as [`LoadError::NotFound`] and a file which
/// cannot be read as [`LoadError::ReadFile`], both kept distinct from malformed
/// content.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound {
            path: path.to_owned(),
        },
        _ => LoadError::ReadFile {
            source,
            path: path.to_owned(),
        },
    })?;
    let mut content = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut content)
        .context(ReadFileSnafu { path })?;

    let format = Format::from_path(path);
    let value: Value = match format {
        Format::Json => serde_json::from_slice(&content).context(MalformedJsonSnafu { path })?,
        Format::Yaml => serde_yaml::from_slice(&content).context(MalformedYamlSnafu { path })?,
    };

    tracing::debug!(?format, "loaded API model");

    match value {
        Value::Object(map) => Ok(Document::from(map)),
        other => RootNotAnObjectSnafu {
            path,
            found: kind(&other),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write API model");
        path
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "kubernetes.json",
            r#"{"apiVersion": "vlabs", "properties": {"masterProfile": {"count": 1}}}"#,
        );

        let document = load_document(&path).unwrap();
        assert_eq!(
            document.as_value(),
            &json!({"apiVersion": "vlabs", "properties": {"masterProfile": {"count": 1}}})
        );
    }

    #[rstest]
    #[case("kubernetes.yaml")]
    #[case("kubernetes.YML")]
    fn loads_yaml(#[case] name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            name,
            indoc! {"
                apiVersion: vlabs
                properties:
                  masterProfile:
                    count: 3
            "},
        );

        let document = load_document(&path).unwrap();
        assert_eq!(
            document.as_value(),
            &json!({"apiVersion": "vlabs", "properties": {"masterProfile": {"count": 3}}})
        );
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::ReadFile { .. }), "got {err:?}");
    }

    #[test]
    fn invalid_utf8_is_malformed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubernetes.json");
        fs::write(&path, b"{\"apiVersion\": \"\xff\"}").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, LoadError::MalformedJson { .. }), "got {err:?}");
    }

    #[test]
    fn malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "kubernetes.json", r#"{"apiVersion": "vlabs""#);

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, LoadError::MalformedJson { .. }));
    }

    #[test]
    fn malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "kubernetes.yaml", "apiVersion: [vlabs");

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, LoadError::MalformedYaml { .. }));
    }

    #[rstest]
    #[case("[]", "an array")]
    #[case("\"vlabs\"", "a string")]
    #[case("null", "null")]
    fn root_must_be_an_object(#[case] content: &str, #[case] expected: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "kubernetes.json", content);

        let err = load_document(&path).unwrap_err();
        let LoadError::RootNotAnObject { found, .. } = err else {
            panic!("expected the root to be rejected, got {err:?}");
        };
        assert_eq!(found, expected);
    }
}
