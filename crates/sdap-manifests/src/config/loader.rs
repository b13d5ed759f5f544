//! Loading of values files from disk.
use std::{
    fs,
    path::{Path, PathBuf},
};

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::config::{
    self, Values,
    layer::{self, Override},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "failed to locate a required file in any of the following locations: {search_path:?}"
    ))]
    RequiredFileMissing { search_path: Vec<PathBuf> },

    #[snafu(display("failed to read values file {path:?}"))]
    ReadValuesFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse values file {path:?}"))]
    ParseValuesFile {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to layer values"))]
    Layer { source: layer::Error },

    #[snafu(display("invalid values"))]
    Deserialize { source: config::DeserializeError },
}

/// Reads, layers and deserializes values.
///
/// `files` are layered in order. If no file is given the first existing file of
/// `default_search_paths` is used instead.
pub fn load(
    files: &[PathBuf],
    default_search_paths: &[impl AsRef<Path>],
    overrides: &[Override],
) -> Result<Values> {
    let paths = if files.is_empty() {
        vec![resolve_path(None, default_search_paths)?.to_path_buf()]
    } else {
        files.to_vec()
    };

    let documents = paths
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<_>>>()?;

    let layered = layer::layer(documents, overrides).context(LayerSnafu)?;
    config::from_yaml_value(layered).context(DeserializeSnafu)
}

/// Reads a single YAML document.
pub fn read_document(path: &Path) -> Result<serde_yaml::Value> {
    debug!(path = %path.display(), "reading values file");
    let contents = fs::read_to_string(path).context(ReadValuesFileSnafu { path })?;
    serde_yaml::from_str(&contents).context(ParseValuesFileSnafu { path })
}

/// Check if the path can be found anywhere
///
/// 1. User provides path `user_provided_path` to file. Return [`Error`] if not existing.
/// 2. User does not provide path to file -> search in `default_paths` and
///    take the first existing file.
/// 3. Return [`Error`] if nothing was found.
fn resolve_path<'a>(
    user_provided_path: Option<&'a Path>,
    default_paths: &'a [impl AsRef<Path> + 'a],
) -> Result<&'a Path> {
    // Use override if specified by the user, otherwise search through defaults given
    let search_paths = if let Some(path) = user_provided_path {
        vec![path]
    } else {
        default_paths.iter().map(AsRef::as_ref).collect()
    };
    for path in &search_paths {
        if path.exists() {
            return Ok(path);
        }
    }
    RequiredFileMissingSnafu {
        search_path: search_paths
            .into_iter()
            .map(PathBuf::from)
            .collect::<Vec<_>>(),
    }
    .fail()
}
