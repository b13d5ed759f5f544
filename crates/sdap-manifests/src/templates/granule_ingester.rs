//! The granule ingester consumes ingestion jobs from RabbitMQ, tiles granules and writes the tiles
//! to Cassandra and Solr.
use k8s_openapi::api::apps::v1::Deployment;
use snafu::ResultExt;

use crate::{
    builder::pod::{PodBuilder, container::ContainerBuilder},
    config::Values,
    derived::{DerivedValues, GRANULE_INGESTER_NAME},
    templates::{
        BuildContainerSnafu, BuildPodTemplateSnafu, Result, deployment, fragments, labels,
    },
};

pub fn build(values: &Values, derived: &DerivedValues) -> Result<Deployment> {
    let config = &values.ingestion.granule_ingester;
    let rabbitmq = &values.rabbitmq;
    let cassandra = &values.cassandra;

    let mut container_builder = ContainerBuilder::new(GRANULE_INGESTER_NAME).context(
        BuildContainerSnafu {
            container_name: GRANULE_INGESTER_NAME,
        },
    )?;
    container_builder
        .image(&config.image)
        .image_pull_policy("Always")
        .add_env_var(fragments::RABBITMQ_USERNAME_ENV, &rabbitmq.username)
        .add_env_var(fragments::RABBITMQ_PASSWORD_ENV, &rabbitmq.password)
        .add_env_var(fragments::RABBITMQ_HOST_ENV, &rabbitmq.host)
        .add_env_var(fragments::CASSANDRA_CONTACT_POINTS_ENV, &cassandra.host)
        .add_env_var(fragments::CASSANDRA_USERNAME_ENV, &cassandra.username)
        .add_env_var(fragments::CASSANDRA_PASSWORD_ENV, &cassandra.password)
        .add_env_var(
            fragments::SOLR_HOST_AND_PORT_ENV,
            format!("http://{}", derived.solr_host_and_port),
        )
        .add_env_var(fragments::ZK_HOST_AND_PORT_ENV, &derived.zookeeper_host_and_port)
        .with_cpu_and_memory(&config.cpu, &config.memory);

    let mut pod_builder = PodBuilder::new();
    pod_builder
        .metadata_builder(|m| m.with_recommended_labels(labels(derived, GRANULE_INGESTER_NAME)))
        .restart_policy("Always");

    for fragment in [
        fragments::granule_storage(values.granule_storage(), derived),
        fragments::credentials(values.credential_source()),
    ] {
        fragment.apply_to(
            &mut pod_builder,
            &mut container_builder,
            GRANULE_INGESTER_NAME,
            GRANULE_INGESTER_NAME,
        )?;
    }

    let template = pod_builder
        .add_container(container_builder.build())
        .build_template()
        .context(BuildPodTemplateSnafu {
            name: GRANULE_INGESTER_NAME,
        })?;

    Ok(deployment(
        GRANULE_INGESTER_NAME,
        GRANULE_INGESTER_NAME,
        derived,
        i32::from(config.replicas),
        template,
    ))
}
