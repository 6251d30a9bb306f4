use clap::Parser;
use clustergen_apimodel::{
    generate::{ArtifactGenerator, GenerateRequest},
    pipeline::{self, LoadOptions, Pipeline},
    sku::{self, SkuCatalog},
};
use snafu::{ResultExt, Snafu};

use crate::{
    cli::{Command, GenerateArguments},
    writer::FileGenerator,
};

mod cli;
mod logging;
mod writer;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("invalid arguments"))]
    InvalidArguments { source: cli::Error },

    #[snafu(display("failed to load SKU catalog"))]
    LoadSkuCatalog { source: sku::Error },

    #[snafu(display("failed to prepare the API model"))]
    PrepareApiModel { source: pipeline::Error },

    #[snafu(display("failed to generate artifacts"))]
    GenerateArtifacts { source: writer::Error },
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let Command::Generate(arguments) = Command::parse();
    logging::initialize_logging(logging::LOG_ENV_VAR);

    generate(&arguments)
}

fn generate(arguments: &GenerateArguments) -> Result<(), Error> {
    let api_model = arguments.api_model_path().context(InvalidArgumentsSnafu)?;
    let ca = arguments.ca_paths().context(InvalidArgumentsSnafu)?;

    let sku_catalog = match &arguments.sku_catalog {
        Some(path) => SkuCatalog::from_file(path).context(LoadSkuCatalogSnafu)?,
        None => SkuCatalog::default(),
    };

    let pipeline = Pipeline::new(LoadOptions {
        unknown_fields: arguments.unknown_field_policy(),
        sku_catalog,
    });
    let model = pipeline
        .run(&api_model, &arguments.set)
        .context(PrepareApiModelSnafu)?;

    let mut request = GenerateRequest::new(model)
        .with_ca(ca)
        .with_pretty_print(!arguments.no_pretty_print)
        .with_parameters_only(arguments.parameters_only);
    if let Some(output_directory) = &arguments.output_directory {
        request = request.with_output_directory(output_directory);
    }

    let written = FileGenerator::new(pipeline.catalog().clone())
        .generate(&request)
        .context(GenerateArtifactsSnafu)?;

    for path in written {
        tracing::info!(path = %path.display(), "wrote artifact");
    }

    Ok(())
}
