//! In-memory implementation of the persistence ports.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use pipeline::{
    Pipeline, PipelineRef, PipelineRepository, ResourceConfig, ResourceConfigId,
    ResourceConfigRepository, ResourceId, ResourceName, ResourceRepository, ResourceType,
    ResourceVersion, Source, SourceKey, StoreError, Timestamp, TrackedResource, Version,
};

use crate::catalog::Catalog;

/// Thread-safe in-memory store of pipelines, resources and version history.
///
/// Resources with identical `(type, source)` share one configuration identity,
/// and therefore one version history. Version history is append-only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    pipelines: HashMap<PipelineRef, Pipeline>,
    resources: BTreeMap<ResourceId, TrackedResource>,
    configs: HashMap<ResourceConfigId, ResourceConfig>,
    config_keys: HashMap<(ResourceType, String), ResourceConfigId>,
    versions: HashMap<ResourceConfigId, Vec<ResourceVersion>>,
    next_resource_id: u64,
    next_config_id: u64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store holding everything declared in `catalog`.
    ///
    /// Duplicate pipelines or resource names are rejected.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self, StoreError> {
        let store = Self::new();
        for definition in &catalog.pipelines {
            let reference = PipelineRef::new(definition.team.clone(), definition.name.clone());
            store.add_pipeline(reference.clone(), definition.paused)?;

            for resource in &definition.resources {
                let id = store.add_resource(
                    &reference,
                    resource.name.clone(),
                    resource.resource_type.clone(),
                    resource.source.clone(),
                    resource.webhook_token.clone(),
                )?;
                if resource.versions.is_empty() {
                    continue;
                }
                let config_id = store.establish_config(id)?;
                for version in &resource.versions {
                    store.record_version(config_id, version.clone())?;
                }
            }
        }

        let state = store.read()?;
        tracing::debug!(
            pipelines = state.pipelines.len(),
            resources = state.resources.len(),
            configs = state.configs.len(),
            "loaded catalog"
        );
        drop(state);
        Ok(store)
    }

    /// Adds a pipeline.
    pub fn add_pipeline(&self, reference: PipelineRef, paused: bool) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.pipelines.contains_key(&reference) {
            return Err(StoreError::Inconsistent {
                message: format!("pipeline '{reference}' already exists"),
            });
        }
        state
            .pipelines
            .insert(reference.clone(), Pipeline { reference, paused });
        Ok(())
    }

    /// Adds a resource to an existing pipeline and returns its identity.
    ///
    /// The resource starts without a configuration identity.
    pub fn add_resource(
        &self,
        pipeline: &PipelineRef,
        name: ResourceName,
        resource_type: ResourceType,
        source: Source,
        webhook_token: Option<String>,
    ) -> Result<ResourceId, StoreError> {
        let mut state = self.write()?;
        if !state.pipelines.contains_key(pipeline) {
            return Err(StoreError::Inconsistent {
                message: format!("pipeline '{pipeline}' does not exist"),
            });
        }
        if state
            .resources
            .values()
            .any(|r| r.pipeline == *pipeline && r.name == name)
        {
            return Err(StoreError::Inconsistent {
                message: format!("resource '{name}' already exists in pipeline '{pipeline}'"),
            });
        }

        state.next_resource_id += 1;
        let id = ResourceId::new(state.next_resource_id);
        state.resources.insert(
            id,
            TrackedResource {
                id,
                name,
                pipeline: pipeline.clone(),
                resource_type,
                source,
                webhook_token,
                resource_config_id: None,
            },
        );
        Ok(id)
    }

    /// Gives a resource its configuration identity, creating the identity if no
    /// other resource with the same `(type, source)` has one yet.
    pub fn establish_config(&self, resource: ResourceId) -> Result<ResourceConfigId, StoreError> {
        let mut state = self.write()?;
        let (resource_type, source) = match state.resources.get(&resource) {
            Some(r) => (r.resource_type.clone(), r.source.clone()),
            None => {
                return Err(StoreError::Inconsistent {
                    message: format!("resource {resource} does not exist"),
                })
            }
        };

        let key = (resource_type.clone(), canonical_source(&source)?);
        let existing = state.config_keys.get(&key).copied();
        let config_id = match existing {
            Some(id) => id,
            None => {
                state.next_config_id += 1;
                let id = ResourceConfigId::new(state.next_config_id);
                state.config_keys.insert(key, id);
                state.configs.insert(id, ResourceConfig { id, resource_type });
                id
            }
        };

        if let Some(r) = state.resources.get_mut(&resource) {
            r.resource_config_id = Some(config_id);
        }
        Ok(config_id)
    }

    /// Appends a version to a configuration identity's history.
    ///
    /// Re-observing a version already in the history moves it to the end, so
    /// it becomes the latest again; the history never holds duplicates.
    pub fn record_version(
        &self,
        config: ResourceConfigId,
        version: Version,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.configs.contains_key(&config) {
            return Err(StoreError::Inconsistent {
                message: format!("resource config {config} does not exist"),
            });
        }

        let history = state.versions.entry(config).or_default();
        history.retain(|v| v.version != version);
        history.push(ResourceVersion {
            resource_config_id: config,
            version,
            observed_at: Timestamp::now(),
        });
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Backend {
            message: "lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Backend {
            message: "lock poisoned".into(),
        })
    }
}

/// Serialises a source deterministically; `serde_json` maps are key-ordered.
fn canonical_source(source: &Source) -> Result<String, StoreError> {
    serde_json::to_string(source).map_err(|err| StoreError::Inconsistent {
        message: format!("source is not serialisable: {err}"),
    })
}

#[async_trait]
impl PipelineRepository for MemoryStore {
    async fn find_pipeline(&self, pipeline: &PipelineRef) -> Result<Option<Pipeline>, StoreError> {
        Ok(self.read()?.pipelines.get(pipeline).cloned())
    }
}

#[async_trait]
impl ResourceRepository for MemoryStore {
    async fn find_resource_by_name(
        &self,
        pipeline: &PipelineRef,
        name: &ResourceName,
    ) -> Result<Option<TrackedResource>, StoreError> {
        Ok(self
            .read()?
            .resources
            .values()
            .find(|r| r.pipeline == *pipeline && r.name == *name)
            .cloned())
    }

    async fn find_resources_by_source_field(
        &self,
        key: &SourceKey,
        value: &str,
    ) -> Result<Vec<TrackedResource>, StoreError> {
        Ok(self
            .read()?
            .resources
            .values()
            .filter(|r| r.source.field_matches(key.as_str(), value))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResourceConfigRepository for MemoryStore {
    async fn find_resource_config_by_id(
        &self,
        id: ResourceConfigId,
    ) -> Result<Option<ResourceConfig>, StoreError> {
        Ok(self.read()?.configs.get(&id).cloned())
    }

    async fn latest_version(
        &self,
        id: ResourceConfigId,
    ) -> Result<Option<ResourceVersion>, StoreError> {
        Ok(self
            .read()?
            .versions
            .get(&id)
            .and_then(|history| history.last())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use pipeline::{PipelineName, TeamName};

    fn ci() -> PipelineRef {
        PipelineRef::new(TeamName::new("main").unwrap(), PipelineName::new("ci").unwrap())
    }

    fn git(uri: &str) -> (ResourceType, Source) {
        (
            ResourceType::new("git").unwrap(),
            Source::from_value(json!({ "uri": uri, "org": "acme" })).unwrap(),
        )
    }

    fn add(store: &MemoryStore, name: &str, uri: &str) -> ResourceId {
        let (ty, source) = git(uri);
        store
            .add_resource(&ci(), ResourceName::new(name).unwrap(), ty, source, Some("tok".into()))
            .unwrap()
    }

    fn v(reference: &str) -> Version {
        [("ref", reference)].into_iter().collect()
    }

    #[tokio::test]
    async fn resources_are_found_by_name_within_their_pipeline() {
        let store = MemoryStore::new();
        store.add_pipeline(ci(), false).unwrap();
        let id = add(&store, "repo-a", "https://example.com/a.git");

        let found = store
            .find_resource_by_name(&ci(), &ResourceName::new("repo-a").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.resource_config_id, None);

        let other = PipelineRef::new(TeamName::new("other").unwrap(), PipelineName::new("ci").unwrap());
        assert!(store.find_pipeline(&other).await.unwrap().is_none());
        assert!(store
            .find_resource_by_name(&other, &ResourceName::new("repo-a").unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicates_and_orphans_are_rejected() {
        let store = MemoryStore::new();
        store.add_pipeline(ci(), false).unwrap();
        assert!(store.add_pipeline(ci(), true).is_err());

        add(&store, "repo-a", "https://example.com/a.git");
        let (ty, source) = git("https://example.com/a.git");
        assert!(store
            .add_resource(&ci(), ResourceName::new("repo-a").unwrap(), ty, source, None)
            .is_err());

        let missing = PipelineRef::new(TeamName::new("main").unwrap(), PipelineName::new("nope").unwrap());
        let (ty, source) = git("https://example.com/b.git");
        assert!(store
            .add_resource(&missing, ResourceName::new("repo-b").unwrap(), ty, source, None)
            .is_err());
    }

    #[tokio::test]
    async fn identical_definitions_share_a_config_identity() {
        let store = MemoryStore::new();
        store.add_pipeline(ci(), false).unwrap();
        let a = add(&store, "repo-a", "https://example.com/a.git");
        let a_copy = add(&store, "repo-a-copy", "https://example.com/a.git");
        let b = add(&store, "repo-b", "https://example.com/b.git");

        let config_a = store.establish_config(a).unwrap();
        assert_eq!(store.establish_config(a_copy).unwrap(), config_a);
        assert_ne!(store.establish_config(b).unwrap(), config_a);

        store.record_version(config_a, v("one")).unwrap();
        store.record_version(config_a, v("two")).unwrap();

        let latest = store.latest_version(config_a).await.unwrap().unwrap();
        assert_eq!(latest.version, v("two"));
        assert_eq!(latest.resource_config_id, config_a);
    }

    #[tokio::test]
    async fn re_observed_versions_become_latest_without_duplicating() {
        let store = MemoryStore::new();
        store.add_pipeline(ci(), false).unwrap();
        let a = add(&store, "repo-a", "https://example.com/a.git");
        let config = store.establish_config(a).unwrap();

        for reference in ["one", "two", "one"] {
            store.record_version(config, v(reference)).unwrap();
        }

        let latest = store.latest_version(config).await.unwrap().unwrap();
        assert_eq!(latest.version, v("one"));
        assert_eq!(store.read().unwrap().versions[&config].len(), 2);
    }

    #[tokio::test]
    async fn configs_without_versions_have_no_latest() {
        let store = MemoryStore::new();
        store.add_pipeline(ci(), false).unwrap();
        let a = add(&store, "repo-a", "https://example.com/a.git");
        let config = store.establish_config(a).unwrap();

        assert!(store.find_resource_config_by_id(config).await.unwrap().is_some());
        assert!(store.latest_version(config).await.unwrap().is_none());
        assert!(store
            .record_version(ResourceConfigId::new(999), v("x"))
            .is_err());
    }

    #[tokio::test]
    async fn source_field_lookup_spans_pipelines_and_uses_raw_values() {
        let store = MemoryStore::new();
        store.add_pipeline(ci(), false).unwrap();
        let other = PipelineRef::new(TeamName::new("ops").unwrap(), PipelineName::new("deploy").unwrap());
        store.add_pipeline(other.clone(), false).unwrap();

        add(&store, "repo-a", "https://example.com/a.git");
        let (ty, _) = git("");
        store
            .add_resource(
                &other,
                ResourceName::new("repo-x").unwrap(),
                ty.clone(),
                Source::from_value(json!({ "org": "acme" })).unwrap(),
                None,
            )
            .unwrap();
        store
            .add_resource(
                &other,
                ResourceName::new("repo-y").unwrap(),
                ty,
                Source::from_value(json!({ "org": "((org))" })).unwrap(),
                None,
            )
            .unwrap();

        let matched = store
            .find_resources_by_source_field(&SourceKey::new("org").unwrap(), "acme")
            .await
            .unwrap();
        let names: Vec<&str> = matched.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["repo-a", "repo-x"]);
    }

    #[tokio::test]
    async fn catalog_seeds_resources_and_history() {
        let catalog: Catalog = serde_json::from_value(json!({
            "pipelines": [{
                "team": "main",
                "name": "ci",
                "resources": [
                    {
                        "name": "repo-a",
                        "type": "git",
                        "source": { "uri": "https://example.com/a.git" },
                        "webhook_token": "((repo-a-webhook))",
                        "versions": [{ "ref": "one" }, { "ref": "two" }]
                    },
                    { "name": "fresh", "type": "git", "source": { "uri": "https://example.com/f.git" } }
                ]
            }]
        }))
        .unwrap();

        let store = MemoryStore::from_catalog(&catalog).unwrap();

        let repo_a = store
            .find_resource_by_name(&ci(), &ResourceName::new("repo-a").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repo_a.webhook_token.as_deref(), Some("((repo-a-webhook))"));
        let config = repo_a.resource_config_id.unwrap();
        let latest = store.latest_version(config).await.unwrap().unwrap();
        assert_eq!(latest.version, v("two"));

        let fresh = store
            .find_resource_by_name(&ci(), &ResourceName::new("fresh").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.resource_config_id, None);
        assert_eq!(fresh.webhook_token, None);
    }

    #[test]
    fn catalog_with_duplicate_pipelines_is_rejected() {
        let catalog: Catalog = serde_json::from_value(json!({
            "pipelines": [
                { "team": "main", "name": "ci" },
                { "team": "main", "name": "ci" }
            ]
        }))
        .unwrap();
        assert!(matches!(
            MemoryStore::from_catalog(&catalog),
            Err(StoreError::Inconsistent { .. })
        ));
    }
}
