//! Layering of values: several values documents are deep merged, then `--set` style overrides are
//! applied on top.
//!
//! Mappings are merged key by key, every other value (including sequences) is replaced by the value
//! of the later layer.
use std::str::FromStr;

use serde_yaml::{Mapping, Value};
use snafu::{OptionExt, ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("override {raw:?} is not of the form path.to.option=value"))]
    MalformedOverride { raw: String },

    #[snafu(display("override {raw:?} contains an empty path segment"))]
    EmptyPathSegment { raw: String },

    #[snafu(display("failed to parse the value of override {raw:?}"))]
    ParseOverrideValue {
        source: serde_yaml::Error,
        raw: String,
    },

    #[snafu(display(
        "cannot set {path:?}: the option {parent:?} is already set to a non-mapping value"
    ))]
    NotAMapping { path: String, parent: String },

    #[snafu(display("the values document must be a mapping at the top level"))]
    NotAMappingDocument,
}

/// A single `path.to.option=value` override.
#[derive(Clone, Debug, PartialEq)]
pub struct Override {
    path: Vec<String>,
    value: Value,
}

impl Override {
    /// Parses an override. The value is parsed as a YAML scalar, so `true` becomes a boolean and
    /// `"true"` stays a string.
    pub fn parse(raw: &str) -> Result<Self> {
        let (path, value) = raw
            .split_once('=')
            .context(MalformedOverrideSnafu { raw })?;

        let path = path
            .split('.')
            .map(|segment| {
                if segment.is_empty() {
                    EmptyPathSegmentSnafu { raw }.fail()
                } else {
                    Ok(segment.to_owned())
                }
            })
            .collect::<Result<Vec<_>>>()?;

        // An empty value is an empty string, not a YAML null
        let value = if value.is_empty() {
            Value::String(String::new())
        } else {
            serde_yaml::from_str(value).context(ParseOverrideValueSnafu { raw })?
        };

        Ok(Self { path, value })
    }

    /// Sets the value, creating intermediate mappings where needed.
    pub fn apply(&self, root: &mut Value) -> Result<()> {
        let mut current = root;
        for (depth, segment) in self.path.iter().enumerate() {
            if current.is_null() {
                *current = Value::Mapping(Mapping::new());
            }

            let mapping = current.as_mapping_mut().context(NotAMappingSnafu {
                path: self.path.join("."),
                parent: self.path[..depth].join("."),
            })?;

            current = mapping
                .entry(Value::String(segment.clone()))
                .or_insert(Value::Null);
        }

        *current = self.value.clone();
        Ok(())
    }
}

impl FromStr for Override {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

/// Merges `overlay` into `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Builds the final values tree out of the given documents (in order) and overrides.
pub fn layer(
    documents: impl IntoIterator<Item = Value>,
    overrides: &[Override],
) -> Result<Value> {
    let mut root = Value::Mapping(Mapping::new());

    for document in documents {
        match document {
            // An empty file
            Value::Null => {}
            document @ Value::Mapping(_) => deep_merge(&mut root, document),
            _ => return NotAMappingDocumentSnafu.fail(),
        }
    }

    for value_override in overrides {
        value_override.apply(&mut root)?;
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    fn yaml(input: &str) -> Value {
        serde_yaml::from_str(input).unwrap()
    }

    #[test]
    fn later_documents_win() {
        let base = yaml(indoc! {"
            ingestion:
              enabled: true
              granules:
                path: /var/lib/sdap/granules
                s3:
                  awsCredsEnvs:
                    AWS_ACCESS_KEY_ID: a
            rootWebpage:
              enabled: true
        "});
        let overlay = yaml(indoc! {"
            ingestion:
              granules:
                s3:
                  awsCredsEnvs:
                    AWS_SECRET_ACCESS_KEY: b
            rootWebpage:
              enabled: false
        "});

        let merged = layer([base, overlay], &[]).unwrap();

        assert_eq!(
            merged,
            yaml(indoc! {"
                ingestion:
                  enabled: true
                  granules:
                    path: /var/lib/sdap/granules
                    s3:
                      awsCredsEnvs:
                        AWS_ACCESS_KEY_ID: a
                        AWS_SECRET_ACCESS_KEY: b
                rootWebpage:
                  enabled: false
            "})
        );
    }

    #[test]
    fn sequences_are_replaced() {
        let mut base = yaml("list: [1, 2, 3]");
        deep_merge(&mut base, yaml("list: [4]"));
        assert_eq!(base, yaml("list: [4]"));
    }

    #[rstest]
    #[case("ingestion.enabled=false", "ingestion: {enabled: false}")]
    #[case("ingestion.granuleIngester.replicas=3", "ingestion: {granuleIngester: {replicas: 3}}")]
    #[case("onEarthProxyIP=", "onEarthProxyIP: ''")]
    #[case("rabbitmq.password=\"1234\"", "rabbitmq: {password: '1234'}")]
    #[case("ingestion.collections.git.url=https://github.com/apache/sdap-ingester-config", "ingestion: {collections: {git: {url: 'https://github.com/apache/sdap-ingester-config'}}}")]
    fn overrides(#[case] raw: &str, #[case] expected: &str) {
        let value_override = Override::parse(raw).unwrap();
        let layered = layer([], &[value_override]).unwrap();
        assert_eq!(layered, yaml(expected));
    }

    #[test]
    fn overrides_win_over_documents() {
        let layered = layer(
            [yaml("ingestion: {enabled: true, history: {solrEnabled: true}}")],
            &[Override::parse("ingestion.history.solrEnabled=false").unwrap()],
        )
        .unwrap();

        assert_eq!(
            layered,
            yaml("ingestion: {enabled: true, history: {solrEnabled: false}}")
        );
    }

    #[rstest]
    #[case("ingestion.enabled")]
    #[case("ingestion..enabled=true")]
    #[case("=true")]
    fn malformed_overrides(#[case] raw: &str) {
        assert!(Override::parse(raw).is_err());
    }

    #[test]
    fn cannot_set_through_scalar() {
        let error = layer(
            [yaml("storageClass: hostpath")],
            &[Override::parse("storageClass.name=standard").unwrap()],
        )
        .unwrap_err();

        assert_eq!(
            error.to_string(),
            "cannot set \"storageClass.name\": the option \"storageClass\" is already set to a non-mapping value"
        );
    }

    #[test]
    fn null_and_non_mapping_documents() {
        assert_eq!(
            layer([Value::Null], &[]).unwrap(),
            Value::Mapping(Mapping::new())
        );
        assert!(matches!(
            layer([yaml("[1, 2]")], &[]),
            Err(Error::NotAMappingDocument)
        ));
    }
}
