use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::kvp::ObjectLabels;

/// A builder to build [`ObjectMeta`] objects.
///
/// It is strongly recommended to always call [`Self::with_recommended_labels()`]!
#[derive(Clone, Debug, Default)]
pub struct ObjectMetaBuilder {
    name: Option<String>,
    namespace: Option<String>,
    labels: Option<BTreeMap<String, String>>,
    annotations: Option<BTreeMap<String, String>>,
}

impl ObjectMetaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn namespace_opt(&mut self, namespace: impl Into<Option<String>>) -> &mut Self {
        self.namespace = namespace.into();
        self
    }

    /// This adds multiple annotations to the existing annotations.
    /// Any existing annotation with a key that is contained in `annotations` will be overwritten
    pub fn with_annotations(&mut self, annotations: BTreeMap<String, String>) -> &mut Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .extend(annotations);
        self
    }

    /// This adds a single label to the existing labels.
    /// It'll override a label with the same key.
    pub fn with_label(
        &mut self,
        label_key: impl Into<String>,
        label_value: impl Into<String>,
    ) -> &mut Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .insert(label_key.into(), label_value.into());
        self
    }

    /// This sets the common recommended labels (in the `app.kubernetes.io` namespace).
    pub fn with_recommended_labels(&mut self, object_labels: ObjectLabels<'_>) -> &mut Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .extend(object_labels.recommended());
        self
    }

    pub fn build(&self) -> ObjectMeta {
        ObjectMeta {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            ..ObjectMeta::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objectmeta_builder() {
        let meta = ObjectMetaBuilder::new()
            .name("collection-manager")
            .namespace_opt(Some("sdap".to_owned()))
            .with_recommended_labels(ObjectLabels {
                instance: "nexus",
                component: "collection-manager",
            })
            .with_label("foo", "bar")
            .with_annotations(BTreeMap::from([("foo".to_owned(), "bar".to_owned())]))
            .build();

        assert_eq!(meta.name.as_deref(), Some("collection-manager"));
        assert_eq!(meta.namespace.as_deref(), Some("sdap"));
        let labels = meta.labels.unwrap();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels.get("foo"), Some(&"bar".to_string()));
        assert_eq!(meta.annotations.unwrap().len(), 1);
    }

    #[test]
    fn namespace_is_optional() {
        let meta = ObjectMetaBuilder::new()
            .name("history-volumes-claim")
            .namespace_opt(None)
            .build();

        assert!(meta.namespace.is_none());
        assert!(meta.labels.is_none());
    }
}
