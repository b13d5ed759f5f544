use std::path::Path;

use snafu::{ResultExt, Snafu};
use strum::{EnumDiscriminants, IntoStaticStr};
use tracing::warn;

use crate::{
    config::{Collections, CollectionsSource, Values},
    derived::DerivedValues,
    templates::fragments::RESERVED_ENV_NAMES,
    validation::{
        self, is_env_var_name, is_path_segment, is_rfc_1035_label, is_rfc_1123_label,
        is_rfc_1123_subdomain,
    },
};

const RELEASE_NAME: &str = "release.name";
const WEBAPP_PATH_PREFIX: &str = "webapp.pathPrefix";

const COLLECTIONS_CONFIG_MAP: &str = "ingestion.collections.configMap";
const COLLECTIONS_GIT_URL: &str = "ingestion.collections.git.url";
const COLLECTIONS_LOCAL_DIR: &str = "ingestion.collections.localDir";
const S3_BUCKET: &str = "ingestion.granules.s3.bucket";
const S3_SERVICE_ACCOUNT_NAME: &str = "ingestion.granules.s3.serviceAccountName";
const S3_AWS_CREDS_ENVS: &str = "ingestion.granules.s3.awsCredsEnvs";

/// A configuration error. Every variant names the offending option(s) by their dotted path.
#[derive(Debug, PartialEq, Eq, Snafu, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("the options {first:?} and {second:?} are mutually exclusive, set only one of them"))]
    MutuallyExclusive {
        first: &'static str,
        second: &'static str,
    },

    #[snafu(display("exactly one of the options {first:?} and {second:?} must be set"))]
    RequiredOneOf {
        first: &'static str,
        second: &'static str,
    },

    #[snafu(display(
        "{S3_BUCKET:?} is set to {bucket:?} but no credentials are configured, set either {S3_SERVICE_ACCOUNT_NAME:?} or {S3_AWS_CREDS_ENVS:?}"
    ))]
    MissingObjectStoreCredentials { bucket: String },

    #[snafu(display("the option {option:?} contains the invalid name {name:?}"))]
    InvalidName {
        source: validation::Errors,
        option: &'static str,
        name: String,
    },

    #[snafu(display("the option {option:?} contains the invalid environment variable name {name:?}"))]
    InvalidEnvVarName {
        source: validation::Errors,
        option: &'static str,
        name: String,
    },

    #[snafu(display("the option {option:?} results in the invalid object name {name:?}"))]
    InvalidDerivedName {
        source: validation::Errors,
        option: &'static str,
        name: String,
    },

    #[snafu(display(
        "the option {option:?} contains {name:?}, which is already set by the ingestion pods"
    ))]
    ReservedEnvVarName { option: &'static str, name: String },

    #[snafu(display("the option {option:?} must be a single URL path segment, got {value:?}"))]
    InvalidPathSegment {
        source: validation::Errors,
        option: &'static str,
        value: String,
    },

    #[snafu(display("the option {option:?} must be an absolute UTF-8 path, got {path:?}"))]
    InvalidPath { option: &'static str, path: String },

    #[snafu(display("the option {option:?} must not be empty"))]
    EmptyOption { option: &'static str },
}

pub(super) fn validate(values: &Values) -> Result<(), Error> {
    validate_names(values)?;

    for (option, value) in [
        (WEBAPP_PATH_PREFIX, &values.webapp.path_prefix),
        ("storageClass", &values.storage_class),
        ("ingestion.history.storage", &values.ingestion.history.storage),
    ] {
        if value.is_empty() {
            return EmptyOptionSnafu { option }.fail();
        }
    }

    is_path_segment(&values.webapp.path_prefix).context(InvalidPathSegmentSnafu {
        option: WEBAPP_PATH_PREFIX,
        value: values.webapp.path_prefix.clone(),
    })?;

    if !values.ingestion.enabled {
        // Nothing below is consumed by any template without ingestion
        return Ok(());
    }

    let granules = &values.ingestion.granules;
    validate_absolute_path("ingestion.granules.path", &granules.path)?;
    validate_absolute_path("ingestion.granules.mountPath", &granules.mount_path)?;

    let s3 = &granules.s3;
    if let Some(bucket) = &s3.bucket {
        if bucket.is_empty() {
            return EmptyOptionSnafu { option: S3_BUCKET }.fail();
        }
        if s3.service_account_name.is_none() && s3.aws_creds_envs.is_empty() {
            return MissingObjectStoreCredentialsSnafu {
                bucket: bucket.clone(),
            }
            .fail();
        }
    }

    if s3.service_account_name.is_some() && !s3.aws_creds_envs.is_empty() {
        warn!(
            ignored_keys = ?s3.aws_creds_envs.keys().collect::<Vec<_>>(),
            "{S3_SERVICE_ACCOUNT_NAME:?} is set, the explicit credentials in {S3_AWS_CREDS_ENVS:?} are ignored"
        );
    }

    for name in s3.aws_creds_envs.keys() {
        is_env_var_name(name).context(InvalidEnvVarNameSnafu {
            option: S3_AWS_CREDS_ENVS,
            name: name.clone(),
        })?;
        if RESERVED_ENV_NAMES.contains(&name.as_str()) {
            return ReservedEnvVarNameSnafu {
                option: S3_AWS_CREDS_ENVS,
                name: name.clone(),
            }
            .fail();
        }
    }

    collections_source(&values.ingestion.collections)?;

    Ok(())
}

fn validate_names(values: &Values) -> Result<(), Error> {
    is_rfc_1123_label(&values.release.name).context(InvalidNameSnafu {
        option: RELEASE_NAME,
        name: values.release.name.clone(),
    })?;

    let derived = DerivedValues::new(values);
    for service_name in [
        &derived.root_webpage_name,
        &derived.webapp_service_name,
        &derived.on_earth_proxy_service_name,
    ] {
        is_rfc_1035_label(service_name).context(InvalidDerivedNameSnafu {
            option: RELEASE_NAME,
            name: service_name.clone(),
        })?;
    }
    is_rfc_1123_subdomain(&derived.ingress_name).context(InvalidDerivedNameSnafu {
        option: RELEASE_NAME,
        name: derived.ingress_name.clone(),
    })?;

    if let Some(namespace) = &values.release.namespace {
        is_rfc_1123_label(namespace).context(InvalidNameSnafu {
            option: "release.namespace",
            name: namespace.clone(),
        })?;
    }

    if values.insitu_api.enabled {
        is_rfc_1123_label(&values.insitu_api.service_name).context(InvalidNameSnafu {
            option: "insituAPI.serviceName",
            name: values.insitu_api.service_name.clone(),
        })?;
    }

    let ingestion = &values.ingestion;
    if let Some(config_map) = &ingestion.collections.config_map {
        is_rfc_1123_subdomain(config_map).context(InvalidNameSnafu {
            option: COLLECTIONS_CONFIG_MAP,
            name: config_map.clone(),
        })?;
    }

    if let Some(service_account_name) = &ingestion.granules.s3.service_account_name {
        is_rfc_1123_subdomain(service_account_name).context(InvalidNameSnafu {
            option: S3_SERVICE_ACCOUNT_NAME,
            name: service_account_name.clone(),
        })?;
    }

    Ok(())
}

fn validate_absolute_path(option: &'static str, path: &Path) -> Result<(), Error> {
    if path.is_absolute() && path.to_str().is_some() {
        Ok(())
    } else {
        InvalidPathSnafu {
            option,
            path: path.display().to_string(),
        }
        .fail()
    }
}

/// Resolves the one and only collections configuration source.
///
/// A pre-existing ConfigMap never silently wins over a git repository or a local directory, the
/// combination is rejected.
pub(super) fn collections_source(collections: &Collections) -> Result<CollectionsSource<'_>, Error> {
    let git_url = collections.git.url.as_ref();
    let local_dir = collections.local_dir.as_deref();

    if let Some(name) = &collections.config_map {
        if git_url.is_some() {
            return MutuallyExclusiveSnafu {
                first: COLLECTIONS_CONFIG_MAP,
                second: COLLECTIONS_GIT_URL,
            }
            .fail();
        }
        if local_dir.is_some() {
            return MutuallyExclusiveSnafu {
                first: COLLECTIONS_CONFIG_MAP,
                second: COLLECTIONS_LOCAL_DIR,
            }
            .fail();
        }
        return Ok(CollectionsSource::ConfigMap { name });
    }

    match (git_url, local_dir) {
        (Some(_), Some(_)) => MutuallyExclusiveSnafu {
            first: COLLECTIONS_GIT_URL,
            second: COLLECTIONS_LOCAL_DIR,
        }
        .fail(),
        (None, None) => RequiredOneOfSnafu {
            first: COLLECTIONS_GIT_URL,
            second: COLLECTIONS_LOCAL_DIR,
        }
        .fail(),
        (Some(url), None) => Ok(CollectionsSource::Git {
            url,
            branch: &collections.git.branch,
            token: collections.git.token.as_deref(),
        }),
        (None, Some(path)) => {
            validate_absolute_path(COLLECTIONS_LOCAL_DIR, path)?;
            Ok(CollectionsSource::LocalDir {
                path: path.to_str().unwrap_or_default(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, path::PathBuf};

    use rstest::rstest;

    use super::*;

    fn git_values() -> Values {
        let mut values = Values::default();
        values.ingestion.collections.git.url =
            Some("https://github.com/apache/sdap-ingester-config".parse().unwrap());
        values
    }

    #[test]
    fn defaults_need_a_collections_source() {
        assert_eq!(
            Values::default().validate(),
            Err(Error::RequiredOneOf {
                first: COLLECTIONS_GIT_URL,
                second: COLLECTIONS_LOCAL_DIR,
            })
        );
    }

    #[test]
    fn defaults_without_ingestion_are_valid() {
        let mut values = Values::default();
        values.ingestion.enabled = false;
        assert_eq!(values.validate(), Ok(()));
    }

    #[test]
    fn git_source() {
        let mut values = git_values();
        values.ingestion.collections.git.token = Some("ghp_token".to_owned());
        assert_eq!(values.validate(), Ok(()));

        let CollectionsSource::Git { url, branch, token } = values.collections_source().unwrap()
        else {
            panic!("expected a git source");
        };
        assert_eq!(url.as_str(), "https://github.com/apache/sdap-ingester-config");
        assert_eq!(branch, "master");
        assert_eq!(token, Some("ghp_token"));
    }

    #[test]
    fn config_map_and_git_are_exclusive() {
        let mut values = git_values();
        values.ingestion.collections.config_map = Some("my-collections".to_owned());

        let error = values.validate().unwrap_err();
        assert_eq!(
            error,
            Error::MutuallyExclusive {
                first: COLLECTIONS_CONFIG_MAP,
                second: COLLECTIONS_GIT_URL,
            }
        );
        assert_eq!(
            error.to_string(),
            "the options \"ingestion.collections.configMap\" and \"ingestion.collections.git.url\" are mutually exclusive, set only one of them"
        );
    }

    #[test]
    fn config_map_and_local_dir_are_exclusive() {
        let mut values = Values::default();
        values.ingestion.collections.config_map = Some("my-collections".to_owned());
        values.ingestion.collections.local_dir = Some(PathBuf::from("/etc/collections"));

        assert_eq!(
            ErrorDiscriminants::from(values.validate().unwrap_err()),
            ErrorDiscriminants::MutuallyExclusive
        );
    }

    #[test]
    fn git_and_local_dir_are_exclusive() {
        let mut values = git_values();
        values.ingestion.collections.local_dir = Some(PathBuf::from("/etc/collections"));

        assert_eq!(
            values.validate(),
            Err(Error::MutuallyExclusive {
                first: COLLECTIONS_GIT_URL,
                second: COLLECTIONS_LOCAL_DIR,
            })
        );
    }

    #[test]
    fn config_map_alone_is_valid() {
        let mut values = Values::default();
        values.ingestion.collections.config_map = Some("my-collections".to_owned());

        assert_eq!(values.validate(), Ok(()));
        assert_eq!(
            values.collections_source(),
            Ok(CollectionsSource::ConfigMap {
                name: "my-collections"
            })
        );
    }

    #[test]
    fn relative_local_dir_is_rejected() {
        let mut values = Values::default();
        values.ingestion.collections.local_dir = Some(PathBuf::from("collections"));

        assert_eq!(
            values.validate(),
            Err(Error::InvalidPath {
                option: COLLECTIONS_LOCAL_DIR,
                path: "collections".to_owned(),
            })
        );
    }

    #[test]
    fn bucket_without_credentials_is_rejected() {
        let mut values = git_values();
        values.ingestion.granules.s3.bucket = Some("my-bucket".to_owned());

        let error = values.validate().unwrap_err();
        assert_eq!(
            error,
            Error::MissingObjectStoreCredentials {
                bucket: "my-bucket".to_owned()
            }
        );
        assert!(error.to_string().contains(S3_SERVICE_ACCOUNT_NAME));
    }

    #[rstest]
    #[case(Some("sa-1"), BTreeMap::new())]
    #[case(None, BTreeMap::from([("AWS_ACCESS_KEY_ID".to_owned(), "key".to_owned())]))]
    #[case(Some("sa-1"), BTreeMap::from([("AWS_ACCESS_KEY_ID".to_owned(), "key".to_owned())]))]
    fn bucket_with_credentials(
        #[case] service_account_name: Option<&str>,
        #[case] aws_creds_envs: BTreeMap<String, String>,
    ) {
        let mut values = git_values();
        let s3 = &mut values.ingestion.granules.s3;
        s3.bucket = Some("my-bucket".to_owned());
        s3.service_account_name = service_account_name.map(ToOwned::to_owned);
        s3.aws_creds_envs = aws_creds_envs;

        assert_eq!(values.validate(), Ok(()));
    }

    #[test]
    fn invalid_credential_key_is_rejected() {
        let mut values = git_values();
        values
            .ingestion
            .granules
            .s3
            .aws_creds_envs
            .insert("AWS-SECRET".to_owned(), "secret".to_owned());

        assert_eq!(
            ErrorDiscriminants::from(values.validate().unwrap_err()),
            ErrorDiscriminants::InvalidEnvVarName
        );
    }

    #[rstest]
    #[case::release_name(|values: &mut Values| values.release.name = "Nexus".to_owned(), "release.name")]
    #[case::namespace(|values: &mut Values| values.release.namespace = Some("sdap_ns".to_owned()), "release.namespace")]
    #[case::config_map(|values: &mut Values| values.ingestion.collections.config_map = Some("My.Collections".to_owned()), COLLECTIONS_CONFIG_MAP)]
    #[case::service_account(|values: &mut Values| values.ingestion.granules.s3.service_account_name = Some("sa_1".to_owned()), S3_SERVICE_ACCOUNT_NAME)]
    #[case::insitu_service(|values: &mut Values| values.insitu_api.service_name = "insitu.api".to_owned(), "insituAPI.serviceName")]
    fn invalid_names_are_rejected(#[case] mutate: fn(&mut Values), #[case] expected_option: &str) {
        let mut values = git_values();
        mutate(&mut values);

        let Err(Error::InvalidName { option, .. }) = values.validate() else {
            panic!("expected an invalid name error");
        };
        assert_eq!(option, expected_option);
    }

    #[rstest]
    #[case::reserved_bucket("S3_BUCKET")]
    #[case::reserved_history("HISTORY_URL")]
    #[case::reserved_rabbitmq("RABBITMQ_HOST")]
    #[case::reserved_cassandra("CASSANDRA_PASSWORD")]
    #[case::reserved_zookeeper("ZK_HOST_AND_PORT")]
    fn credential_keys_must_not_shadow_pod_env(#[case] key: &str) {
        let mut values = git_values();
        let s3 = &mut values.ingestion.granules.s3;
        s3.bucket = Some("my-bucket".to_owned());
        s3.aws_creds_envs.insert(key.to_owned(), "other".to_owned());

        let error = values.validate().unwrap_err();
        assert_eq!(
            error,
            Error::ReservedEnvVarName {
                option: S3_AWS_CREDS_ENVS,
                name: key.to_owned(),
            }
        );
        assert!(error.to_string().contains("ingestion.granules.s3.awsCredsEnvs"));
    }

    #[test]
    fn reserved_credential_key_is_rejected_with_service_account() {
        let mut values = git_values();
        let s3 = &mut values.ingestion.granules.s3;
        s3.bucket = Some("my-bucket".to_owned());
        s3.service_account_name = Some("sa-1".to_owned());
        s3.aws_creds_envs
            .insert("RABBITMQ_HOST".to_owned(), "x".to_owned());

        assert_eq!(
            ErrorDiscriminants::from(values.validate().unwrap_err()),
            ErrorDiscriminants::ReservedEnvVarName
        );
    }

    #[rstest]
    #[case::too_long_for_services(&"a".repeat(60), "a".repeat(60) + "-root-webpage")]
    #[case::leading_digit("1nexus", "1nexus-root-webpage".to_owned())]
    fn release_name_must_yield_valid_service_names(
        #[case] release: &str,
        #[case] expected_name: String,
    ) {
        let mut values = git_values();
        values.release.name = release.to_owned();

        let Err(Error::InvalidDerivedName { option, name, .. }) = values.validate() else {
            panic!("expected an invalid derived name error");
        };
        assert_eq!(option, RELEASE_NAME);
        assert_eq!(name, expected_name);
    }

    #[test]
    fn longest_release_name_is_valid() {
        let mut values = git_values();
        // "-onearth-proxy" is the longest suffix
        values.release.name = "a".repeat(63 - "-onearth-proxy".len());

        assert_eq!(values.validate(), Ok(()));
    }

    #[rstest]
    #[case("api/v1")]
    #[case("nexus.*")]
    #[case("(nexus)")]
    fn path_prefix_must_be_a_single_segment(#[case] prefix: &str) {
        let mut values = git_values();
        values.webapp.path_prefix = prefix.to_owned();

        let Err(Error::InvalidPathSegment { option, value, .. }) = values.validate() else {
            panic!("expected an invalid path segment error");
        };
        assert_eq!(option, WEBAPP_PATH_PREFIX);
        assert_eq!(value, prefix);
    }

    #[rstest]
    #[case::granules_path(|values: &mut Values| values.ingestion.granules.path = PathBuf::from("data"), "ingestion.granules.path")]
    #[case::granules_mount_path(|values: &mut Values| values.ingestion.granules.mount_path = PathBuf::from("granules"), "ingestion.granules.mountPath")]
    fn relative_granule_paths_are_rejected(
        #[case] mutate: fn(&mut Values),
        #[case] expected_option: &str,
    ) {
        let mut values = git_values();
        mutate(&mut values);

        let Err(Error::InvalidPath { option, .. }) = values.validate() else {
            panic!("expected an invalid path error");
        };
        assert_eq!(option, expected_option);
    }

    #[test]
    fn empty_path_prefix_is_rejected() {
        let mut values = git_values();
        values.webapp.path_prefix = String::new();

        assert_eq!(
            values.validate(),
            Err(Error::EmptyOption {
                option: "webapp.pathPrefix"
            })
        );
    }
}
