//! Command line arguments shared by the tools working with SDAP values.
use std::path::{Path, PathBuf};

use clap::{Args, Parser};

use crate::config::{Values, layer::Override, loader};

/// Where values are looked up when no values file is passed explicitly.
pub const DEFAULT_VALUES_SEARCH_PATHS: &[&str] = &["values.yaml", "/etc/sdap/values.yaml"];

#[derive(Debug, PartialEq, Parser)]
pub enum Command {
    /// Render the manifest bundle as multi-document YAML.
    Render {
        #[command(flatten)]
        values: ValuesArguments,

        /// Write the bundle to FILE instead of stdout
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Validate the values and list the resources which would be rendered.
    Validate(ValuesArguments),

    /// Print the GitBasedConfig CustomResourceDefinition.
    Crd,
}

#[derive(Clone, Debug, PartialEq, Args)]
pub struct ValuesArguments {
    /// Values file, may be given multiple times. Later files take precedence.
    #[arg(long = "values", short = 'f', value_name = "FILE")]
    pub values_files: Vec<PathBuf>,

    /// Set a single option, e.g. `--set ingestion.enabled=false`. Applied after all values files.
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub overrides: Vec<Override>,
}

impl ValuesArguments {
    /// Loads the layered values, falling back to the first path that exists from
    /// `default_search_paths` if no values file is given.
    pub fn load(&self, default_search_paths: &[impl AsRef<Path>]) -> Result<Values, loader::Error> {
        loader::load(&self.values_files, default_search_paths, &self.overrides)
    }
}
