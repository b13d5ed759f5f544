//! The collection manager watches the collections configuration and publishes ingestion jobs for
//! new granules to RabbitMQ.
use k8s_openapi::api::apps::v1::Deployment;
use snafu::ResultExt;

use crate::{
    builder::pod::{PodBuilder, container::ContainerBuilder},
    config::Values,
    derived::{COLLECTION_MANAGER_NAME, DerivedValues},
    templates::{
        BuildContainerSnafu, BuildPodTemplateSnafu, Result, deployment, fragments, labels,
    },
};

pub fn build(values: &Values, derived: &DerivedValues) -> Result<Deployment> {
    let config = &values.ingestion.collection_manager;
    let rabbitmq = &values.rabbitmq;

    let mut container_builder = ContainerBuilder::new(COLLECTION_MANAGER_NAME).context(
        BuildContainerSnafu {
            container_name: COLLECTION_MANAGER_NAME,
        },
    )?;
    container_builder
        .image(&config.image)
        .image_pull_policy("Always")
        .add_env_var(fragments::RABBITMQ_USERNAME_ENV, &rabbitmq.username)
        .add_env_var(fragments::RABBITMQ_PASSWORD_ENV, &rabbitmq.password)
        .add_env_var(fragments::RABBITMQ_HOST_ENV, &rabbitmq.host)
        .with_cpu_and_memory(&config.cpu, &config.memory);

    let mut pod_builder = PodBuilder::new();
    pod_builder
        .metadata_builder(|m| m.with_recommended_labels(labels(derived, COLLECTION_MANAGER_NAME)))
        .restart_policy("Always");

    for fragment in [
        fragments::collections_config(derived),
        fragments::history(values.history_backend(), derived),
        fragments::granule_storage(values.granule_storage(), derived),
        fragments::credentials(values.credential_source()),
    ] {
        fragment.apply_to(
            &mut pod_builder,
            &mut container_builder,
            COLLECTION_MANAGER_NAME,
            COLLECTION_MANAGER_NAME,
        )?;
    }

    let template = pod_builder
        .add_container(container_builder.build())
        .build_template()
        .context(BuildPodTemplateSnafu {
            name: COLLECTION_MANAGER_NAME,
        })?;

    Ok(deployment(
        COLLECTION_MANAGER_NAME,
        COLLECTION_MANAGER_NAME,
        derived,
        1,
        template,
    ))
}
