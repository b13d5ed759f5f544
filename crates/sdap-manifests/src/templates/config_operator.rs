//! The config operator reconciles `GitBasedConfig` objects into ConfigMaps.
use k8s_openapi::api::apps::v1::Deployment;
use snafu::ResultExt;

use crate::{
    builder::pod::{PodBuilder, container::ContainerBuilder},
    config::Values,
    derived::{CONFIG_OPERATOR_NAME, DerivedValues},
    templates::{BuildContainerSnafu, BuildPodTemplateSnafu, Result, deployment, labels},
};

pub fn build(values: &Values, derived: &DerivedValues) -> Result<Deployment> {
    let container = ContainerBuilder::new(CONFIG_OPERATOR_NAME)
        .context(BuildContainerSnafu {
            container_name: CONFIG_OPERATOR_NAME,
        })?
        .image(&values.ingestion.config_operator.image)
        .image_pull_policy("Always")
        .build();

    let template = PodBuilder::new()
        .metadata_builder(|m| m.with_recommended_labels(labels(derived, CONFIG_OPERATOR_NAME)))
        .add_container(container)
        .build_template()
        .context(BuildPodTemplateSnafu {
            name: CONFIG_OPERATOR_NAME,
        })?;

    Ok(deployment(
        CONFIG_OPERATOR_NAME,
        CONFIG_OPERATOR_NAME,
        derived,
        1,
        template,
    ))
}
