use std::{
    fs,
    io::{self, Write as _},
    path::PathBuf,
};

use clap::Parser;
use sdap_manifests::{
    cli::{Command, DEFAULT_VALUES_SEARCH_PATHS, ValuesArguments},
    composer::{self, Bundle},
    config::loader,
    crd::git_based_config::GitBasedConfig,
    logging, yaml,
};
use snafu::{ResultExt, Snafu};

const APP_NAME: &str = "sdap-compose";
const LOG_ENV: &str = "SDAP_COMPOSE_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitLogging { source: logging::Error },

    #[snafu(display("failed to load values"))]
    LoadValues { source: loader::Error },

    #[snafu(display("failed to compose the manifest bundle"))]
    Compose { source: composer::Error },

    #[snafu(display("failed to write the bundle to {path:?}"))]
    WriteBundleFile { source: io::Error, path: PathBuf },

    #[snafu(display("failed to write to stdout"))]
    WriteStdout { source: io::Error },

    #[snafu(display("failed to print the GitBasedConfig CRD"))]
    PrintCrd { source: yaml::Error },
}

#[derive(Debug, Parser)]
#[command(name = APP_NAME, author, version, about)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let opts = Opts::parse();
    logging::initialize_logging(LOG_ENV, APP_NAME).context(InitLoggingSnafu)?;

    match opts.command {
        Command::Render { values, output } => {
            let bundle = compose(&values)?;
            let rendered = bundle.to_yaml().context(ComposeSnafu)?;

            match output {
                Some(path) => {
                    fs::write(&path, rendered).context(WriteBundleFileSnafu { path: &path })?;
                    tracing::info!(path = %path.display(), "wrote manifest bundle");
                }
                None => io::stdout()
                    .lock()
                    .write_all(rendered.as_bytes())
                    .context(WriteStdoutSnafu)?,
            }
        }
        Command::Validate(values) => {
            let bundle = compose(&values)?;
            let mut stdout = io::stdout().lock();
            for manifest in &bundle {
                writeln!(stdout, "{}", manifest.identity()).context(WriteStdoutSnafu)?;
            }
        }
        Command::Crd => {
            GitBasedConfig::write_yaml_schema(io::stdout().lock()).context(PrintCrdSnafu)?;
        }
    }

    Ok(())
}

fn compose(values: &ValuesArguments) -> Result<Bundle, Error> {
    let values = values
        .load(DEFAULT_VALUES_SEARCH_PATHS)
        .context(LoadValuesSnafu)?;
    composer::compose(&values).context(ComposeSnafu)
}
