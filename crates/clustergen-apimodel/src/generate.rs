//! The contract between the pipeline and an artifact generator.
use std::path::{Path, PathBuf};

use snafu::Snafu;

use crate::pipeline::ValidatedModel;

/// Generated artifacts are placed below this directory unless an explicit
/// output directory is requested.
pub const DEFAULT_OUTPUT_ROOT: &str = "_output";

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum CaPathsError {
    #[snafu(display("a CA private key path was given without a CA certificate path"))]
    MissingCertificate,

    #[snafu(display("a CA certificate path was given without a CA private key path"))]
    MissingPrivateKey,
}

/// A user supplied certificate authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaPaths {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

impl CaPaths {
    /// Pairs up the optional certificate and private key paths. Either both or
    /// neither must be given.
    pub fn from_parts(
        certificate: Option<PathBuf>,
        private_key: Option<PathBuf>,
    ) -> Result<Option<Self>, CaPathsError> {
        match (certificate, private_key) {
            (Some(certificate), Some(private_key)) => Ok(Some(Self {
                certificate,
                private_key,
            })),
            (None, None) => Ok(None),
            (Some(_), None) => MissingPrivateKeySnafu.fail(),
            (None, Some(_)) => MissingCertificateSnafu.fail(),
        }
    }
}

/// Everything an [`ArtifactGenerator`] needs to render a cluster.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub model: ValidatedModel,
    pub output_directory: PathBuf,
    pub ca: Option<CaPaths>,
    pub pretty_print: bool,

    /// Only the parameters file is written.
    pub parameters_only: bool,
}

impl GenerateRequest {
    /// Creates a request writing pretty printed artifacts into
    /// [`default_output_directory`], without a user supplied CA.
    pub fn new(model: ValidatedModel) -> Self {
        let output_directory = default_output_directory(&model);
        Self {
            model,
            output_directory,
            ca: None,
            pretty_print: true,
            parameters_only: false,
        }
    }

    pub fn with_output_directory(mut self, output_directory: impl Into<PathBuf>) -> Self {
        self.output_directory = output_directory.into();
        self
    }

    pub fn with_ca(mut self, ca: Option<CaPaths>) -> Self {
        self.ca = ca;
        self
    }

    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    pub fn with_parameters_only(mut self, parameters_only: bool) -> Self {
        self.parameters_only = parameters_only;
        self
    }
}

/// `_output/<DNS_PREFIX>`
pub fn default_output_directory(model: &ValidatedModel) -> PathBuf {
    Path::new(DEFAULT_OUTPUT_ROOT).join(&model.properties.master_profile.dns_prefix)
}

/// Renders deployment artifacts from a [`GenerateRequest`].
pub trait ArtifactGenerator {
    type Error: std::error::Error + 'static;

    /// Generates all artifacts and returns the paths of the written files.
    fn generate(&self, request: &GenerateRequest) -> Result<Vec<PathBuf>, Self::Error>;
}
