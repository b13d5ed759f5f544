//! Serialization of manifests as explicit YAML documents.
use std::io::Write;

use serde::ser;
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },

    #[snafu(display("serialized YAML is not valid UTF-8"))]
    NonUtf8Output { source: std::string::FromUtf8Error },
}

/// Serializes the given data structure as an explicit YAML document (starting with `---`) and
/// writes it to a [`Write`].
///
/// Enums are serialized as a YAML map containing one entry in which the key identifies the variant
/// name.
pub fn serialize_to_explicit_document<T, W>(mut writer: W, value: &T) -> Result<()>
where
    T: ser::Serialize,
    W: Write,
{
    writer
        .write_all(b"---\n")
        .context(WriteDocumentSeparatorSnafu)?;
    let mut serializer = serde_yaml::Serializer::new(writer);
    serde_yaml::with::singleton_map_recursive::serialize(value, &mut serializer)
        .context(SerializeYamlSnafu)?;
    Ok(())
}

/// Writes every value as its own explicit document, in order.
pub fn serialize_to_explicit_documents<'a, T, W>(
    mut writer: W,
    values: impl IntoIterator<Item = &'a T>,
) -> Result<()>
where
    T: ser::Serialize + 'a,
    W: Write,
{
    for value in values {
        serialize_to_explicit_document(&mut writer, value)?;
    }
    Ok(())
}

/// Like [`serialize_to_explicit_documents`], but returns the documents as a [`String`].
pub fn to_explicit_documents_string<'a, T>(values: impl IntoIterator<Item = &'a T>) -> Result<String>
where
    T: ser::Serialize + 'a,
{
    let mut buf = Vec::new();
    serialize_to_explicit_documents(&mut buf, values)?;
    String::from_utf8(buf).context(NonUtf8OutputSnafu)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    enum Source {
        ConfigMap(String),
    }

    #[derive(Serialize)]
    struct Spec {
        source: Source,
    }

    #[test]
    fn enums_are_singleton_maps() {
        let mut buf = Vec::new();
        serialize_to_explicit_document(
            &mut buf,
            &Spec {
                source: Source::ConfigMap("collections-config".to_owned()),
            },
        )
        .unwrap();

        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            indoc! {"
                ---
                source:
                  configMap: collections-config
            "}
        );
    }

    #[test]
    fn multiple_documents() {
        assert_eq!(
            to_explicit_documents_string(&["a", "b"]).unwrap(),
            "---\na\n---\nb\n"
        );
    }
}
