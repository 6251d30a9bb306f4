use std::path::PathBuf;

use clap::{Args, Parser};
use clustergen_apimodel::{
    generate::{CaPaths, CaPathsError},
    model::UnknownFieldPolicy,
};
use snafu::{ResultExt, Snafu, ensure};

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display(
        "--api-model was not supplied, nor was one specified as a positional argument"
    ))]
    MissingApiModel,

    #[snafu(display(
        "too many arguments were provided to 'generate', expected a single API model path but got {count}"
    ))]
    TooManyArguments { count: usize },

    #[snafu(display("specified API model does not exist ({path})", path = path.display()))]
    ApiModelNotFound { path: PathBuf },

    #[snafu(display("invalid CA arguments"))]
    InvalidCa { source: CaPathsError },
}

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(version, about)]
pub enum Command {
    /// Generate deployment artifacts from an API model.
    ///
    /// The API model is loaded, the --set overrides are applied in the order
    /// they were given, and the result is validated before any artifact is
    /// written.
    Generate(GenerateArguments),
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct GenerateArguments {
    /// Path to the API model, alternatively use --api-model
    #[arg(value_name = "API_MODEL", conflicts_with = "api_model")]
    pub args: Vec<PathBuf>,

    /// Path to the API model (JSON or YAML) describing the cluster
    #[arg(long, short = 'm', value_name = "FILE")]
    pub api_model: Option<PathBuf>,

    /// Output directory, defaults to _output/<DNS_PREFIX>
    #[arg(long, short = 'o', value_name = "DIR", env = "CLUSTERGEN_OUTPUT_DIRECTORY")]
    pub output_directory: Option<PathBuf>,

    /// Path to the CA certificate to use for the cluster
    #[arg(long, value_name = "FILE", env = "CLUSTERGEN_CA_CERTIFICATE_PATH")]
    pub ca_certificate_path: Option<PathBuf>,

    /// Path to the private key of the CA certificate
    #[arg(long, value_name = "FILE", env = "CLUSTERGEN_CA_PRIVATE_KEY_PATH")]
    pub ca_private_key_path: Option<PathBuf>,

    /// Override API model values, e.g. --set masterProfile.count=3,linuxProfile.adminUsername=admin
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub set: Vec<String>,

    /// Write compact instead of pretty printed JSON
    #[arg(long, env = "CLUSTERGEN_NO_PRETTY_PRINT")]
    pub no_pretty_print: bool,

    /// Only write the parameters file
    #[arg(long, env = "CLUSTERGEN_PARAMETERS_ONLY")]
    pub parameters_only: bool,

    /// Fail on API model fields which are not part of the schema instead of
    /// ignoring them
    #[arg(long, env = "CLUSTERGEN_REJECT_UNKNOWN_FIELDS")]
    pub reject_unknown_fields: bool,

    /// Path to a YAML file replacing the built-in GPU and SGX VM size tables
    #[arg(long, value_name = "FILE", env = "CLUSTERGEN_SKU_CATALOG")]
    pub sku_catalog: Option<PathBuf>,
}

impl GenerateArguments {
    /// Resolves the API model path from either --api-model or the single
    /// positional argument. The file has to exist.
    pub fn api_model_path(&self) -> Result<PathBuf, Error> {
        let path = match (&self.api_model, self.args.as_slice()) {
            (Some(path), _) | (None, [path]) => path.clone(),
            (None, []) => return MissingApiModelSnafu.fail(),
            (None, args) => return TooManyArgumentsSnafu { count: args.len() }.fail(),
        };

        ensure!(path.is_file(), ApiModelNotFoundSnafu { path });
        Ok(path)
    }

    pub fn ca_paths(&self) -> Result<Option<CaPaths>, Error> {
        CaPaths::from_parts(
            self.ca_certificate_path.clone(),
            self.ca_private_key_path.clone(),
        )
        .context(InvalidCaSnafu)
    }

    pub fn unknown_field_policy(&self) -> UnknownFieldPolicy {
        if self.reject_unknown_fields {
            UnknownFieldPolicy::Reject
        } else {
            UnknownFieldPolicy::Ignore
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;

    const SIMPLE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../clustergen-apimodel/testdata/simple/kubernetes.json"
    );

    fn parse(args: &[&str]) -> GenerateArguments {
        let Command::Generate(arguments) =
            Command::try_parse_from([&["clustergen", "generate"][..], args].concat()).unwrap();
        arguments
    }

    #[test]
    fn verify_cli() {
        Command::command().debug_assert();
    }

    #[rstest]
    #[case("--api-model")]
    #[case("--output-directory")]
    #[case("--ca-certificate-path")]
    #[case("--ca-private-key-path")]
    #[case("--set")]
    #[case("--no-pretty-print")]
    #[case("--parameters-only")]
    #[case("--reject-unknown-fields")]
    #[case("--sku-catalog")]
    fn has_flag(#[case] flag: &str) {
        let command = Command::command();
        let generate = command
            .find_subcommand("generate")
            .expect("generate subcommand exists");

        assert!(
            generate
                .get_arguments()
                .any(|arg| arg.get_long().is_some_and(|long| format!("--{long}") == flag)),
            "missing flag {flag}"
        );
    }

    #[test]
    fn single_positional_argument() {
        let arguments = parse(&[SIMPLE]);
        assert_eq!(arguments.api_model_path(), Ok(PathBuf::from(SIMPLE)));
    }

    #[test]
    fn api_model_flag() {
        let arguments = parse(&["-m", SIMPLE]);
        assert_eq!(arguments.api_model_path(), Ok(PathBuf::from(SIMPLE)));
    }

    #[test]
    fn no_arguments() {
        let arguments = parse(&[]);
        assert_eq!(arguments.api_model_path(), Err(Error::MissingApiModel));
    }

    #[test]
    fn too_many_arguments() {
        let arguments = parse(&[SIMPLE, "arg1"]);
        assert_eq!(
            arguments.api_model_path(),
            Err(Error::TooManyArguments { count: 2 })
        );
    }

    #[test]
    fn positional_argument_conflicts_with_flag() {
        let result = Command::try_parse_from(["clustergen", "generate", "-m", SIMPLE, SIMPLE]);
        assert!(result.is_err());
    }

    #[test]
    fn api_model_is_only_taken_from_the_command_line() {
        let command = Command::command();
        let api_model = command
            .find_subcommand("generate")
            .and_then(|generate| generate.get_arguments().find(|arg| arg.get_id() == "api_model"))
            .expect("--api-model exists");

        assert_eq!(api_model.get_env(), None);
    }

    #[test]
    fn missing_api_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubernetes.json");
        let arguments = parse(&[path.to_str().unwrap()]);

        assert_eq!(
            arguments.api_model_path(),
            Err(Error::ApiModelNotFound { path })
        );
    }

    #[test]
    fn repeated_set_flags_keep_their_order() {
        let arguments = parse(&[
            SIMPLE,
            "--set",
            "masterProfile.count=3,linuxProfile.adminUsername=testuser",
            "--set",
            "agentPoolProfiles[0].count=1",
        ]);

        assert_eq!(
            arguments.set,
            [
                "masterProfile.count=3,linuxProfile.adminUsername=testuser",
                "agentPoolProfiles[0].count=1"
            ]
        );
    }

    #[test]
    fn ca_paths_must_be_paired() {
        let arguments = parse(&[SIMPLE, "--ca-certificate-path", "ca.crt"]);
        assert_eq!(
            arguments.ca_paths(),
            Err(Error::InvalidCa {
                source: CaPathsError::MissingPrivateKey
            })
        );
    }

    #[test]
    fn switches() {
        let arguments = parse(&[SIMPLE, "--no-pretty-print", "--parameters-only", "--reject-unknown-fields"]);

        assert!(arguments.no_pretty_print);
        assert!(arguments.parameters_only);
        assert_eq!(arguments.unknown_field_policy(), UnknownFieldPolicy::Reject);
    }
}
