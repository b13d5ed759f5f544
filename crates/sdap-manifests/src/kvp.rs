//! Well-known label keys and the recommended label set attached to every emitted object.
//!
//! See <https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/>.

use std::collections::BTreeMap;

use const_format::concatcp;

/// The well-known Kubernetes app key prefix.
const K8S_APP_KEY_PREFIX: &str = "app.kubernetes.io/";

/// The well-known Kubernetes app name key `app.kubernetes.io/name`.
pub const K8S_APP_NAME_KEY: &str = concatcp!(K8S_APP_KEY_PREFIX, "name");

/// The well-known Kubernetes app instance key `app.kubernetes.io/instance`. It
/// carries the release name, e.g. `nexus`.
pub const K8S_APP_INSTANCE_KEY: &str = concatcp!(K8S_APP_KEY_PREFIX, "instance");

/// The well-known Kubernetes app component key `app.kubernetes.io/component`,
/// e.g. `collection-manager`.
pub const K8S_APP_COMPONENT_KEY: &str = concatcp!(K8S_APP_KEY_PREFIX, "component");

/// The well-known Kubernetes app part-of key `app.kubernetes.io/part-of`.
pub const K8S_APP_PART_OF_KEY: &str = concatcp!(K8S_APP_KEY_PREFIX, "part-of");

/// The well-known Kubernetes app managed-by key `app.kubernetes.io/managed-by`.
pub const K8S_APP_MANAGED_BY_KEY: &str = concatcp!(K8S_APP_KEY_PREFIX, "managed-by");

/// The well-known label of `EndpointSlice`s which names the `Service` they belong to.
pub const K8S_SERVICE_NAME_KEY: &str = "kubernetes.io/service-name";

pub const APP_NAME: &str = "sdap";
pub const MANAGED_BY: &str = "sdap-compose";

/// The information needed to build the recommended labels of a single object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectLabels<'a> {
    /// The release name, shared by every object of a composition.
    pub instance: &'a str,

    /// The component within the architecture, e.g. `granule-ingester`.
    pub component: &'a str,
}

impl ObjectLabels<'_> {
    /// Returns the full set of recommended labels.
    pub fn recommended(&self) -> BTreeMap<String, String> {
        let mut labels = self.selector();
        labels.insert(K8S_APP_NAME_KEY.to_owned(), APP_NAME.to_owned());
        labels.insert(K8S_APP_PART_OF_KEY.to_owned(), APP_NAME.to_owned());
        labels.insert(K8S_APP_MANAGED_BY_KEY.to_owned(), MANAGED_BY.to_owned());
        labels
    }

    /// Returns the subset of labels used to select the pods of a component.
    ///
    /// These never change between releases, otherwise Deployments could not be updated in place.
    pub fn selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (K8S_APP_INSTANCE_KEY.to_owned(), self.instance.to_owned()),
            (K8S_APP_COMPONENT_KEY.to_owned(), self.component.to_owned()),
        ])
    }
}
