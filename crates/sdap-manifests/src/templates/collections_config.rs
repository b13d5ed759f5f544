use snafu::{OptionExt, ResultExt};

use crate::{
    builder::meta::ObjectMetaBuilder,
    config::Values,
    crd::git_based_config::{GitBasedConfig, GitBasedConfigSpec},
    derived::{CONFIG_OPERATOR_NAME, DerivedValues},
    templates::{Result, ResolveCollectionsSourceSnafu, UnmanagedCollectionsSourceSnafu, labels},
};

/// The `GitBasedConfig` telling the config operator which ConfigMap to fill with
/// `collections.yml`.
pub fn build(values: &Values, derived: &DerivedValues) -> Result<GitBasedConfig> {
    let source = values
        .collections_source()
        .context(ResolveCollectionsSourceSnafu)?;
    let spec = GitBasedConfigSpec::from_source(&source, &derived.collections_config_map)
        .context(UnmanagedCollectionsSourceSnafu)?;

    let mut config = GitBasedConfig::new(&derived.collections_config_map, spec);
    config.metadata = ObjectMetaBuilder::new()
        .name(&derived.collections_config_map)
        .namespace_opt(derived.namespace.clone())
        .with_recommended_labels(labels(derived, CONFIG_OPERATOR_NAME))
        .build();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::templates::Error;

    #[test]
    fn git_source() {
        let mut values = Values::default();
        values.ingestion.collections.git.url =
            Some(Url::parse("https://github.com/apache/sdap-ingester-config").unwrap());
        values.ingestion.collections.git.token = Some("token".to_owned());

        let config = build(&values, &DerivedValues::new(&values)).unwrap();

        assert_eq!(config.metadata.name.as_deref(), Some("collections-config"));
        assert_eq!(config.spec.config_map, "collections-config");
        assert_eq!(config.spec.git_branch.as_deref(), Some("master"));
        assert_eq!(config.spec.git_token.as_deref(), Some("token"));
        assert_eq!(config.spec.local_dir, None);
    }

    #[test]
    fn missing_source() {
        let values = Values::default();
        assert!(matches!(
            build(&values, &DerivedValues::new(&values)),
            Err(Error::ResolveCollectionsSource { .. })
        ));
    }

    #[test]
    fn existing_config_map() {
        let mut values = Values::default();
        values.ingestion.collections.config_map = Some("my-collections".to_owned());

        assert_eq!(
            build(&values, &DerivedValues::new(&values)),
            Err(Error::UnmanagedCollectionsSource)
        );
    }
}
