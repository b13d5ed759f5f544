use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{
        PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
    },
    apimachinery::pkg::api::resource::Quantity,
};

use crate::{
    builder::meta::ObjectMetaBuilder,
    config::Values,
    derived::{COLLECTION_MANAGER_NAME, DerivedValues},
    templates::labels,
};

/// The claim backing the filesystem ingestion history of the collection manager.
pub fn build(values: &Values, derived: &DerivedValues) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMetaBuilder::new()
            .name(&derived.history_claim_name)
            .namespace_opt(derived.namespace.clone())
            .with_recommended_labels(labels(derived, COLLECTION_MANAGER_NAME))
            .build(),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_owned()]),
            storage_class_name: Some(values.storage_class.clone()),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_owned(),
                    Quantity(values.ingestion.history.storage.clone()),
                )])),
                ..VolumeResourceRequirements::default()
            }),
            ..PersistentVolumeClaimSpec::default()
        }),
        ..PersistentVolumeClaim::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim() {
        let mut values = Values::default();
        values.storage_class = "standard".to_owned();
        values.ingestion.history.storage = "5Gi".to_owned();

        let claim = build(&values, &DerivedValues::new(&values));
        let spec = claim.spec.unwrap();

        assert_eq!(claim.metadata.name.as_deref(), Some("history-volumes-claim"));
        assert_eq!(spec.storage_class_name.as_deref(), Some("standard"));
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_owned()]));
        assert_eq!(
            spec.resources.unwrap().requests.unwrap()["storage"],
            Quantity("5Gi".to_owned())
        );
    }
}
