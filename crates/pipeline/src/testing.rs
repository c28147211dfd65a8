//! Hand-written fakes for the port traits, shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::credentials::VariableScope;
use crate::errors::{CredentialError, ScanError, StoreError};
use crate::ports::{
    CredentialResolver, PipelineRepository, ResourceConfigRepository, ResourceRepository, Scanner,
};
use crate::{
    Pipeline, PipelineName, PipelineRef, ResourceConfig, ResourceConfigId, ResourceId,
    ResourceName, ResourceType, ResourceVersion, ScanRequest, Source, SourceKey, TeamName,
    Timestamp, TrackedResource, Version,
};

pub fn pipeline_ref(team: &str, name: &str) -> PipelineRef {
    PipelineRef::new(TeamName::new(team).unwrap(), PipelineName::new(name).unwrap())
}

pub fn resource(id: u64, name: &str, token: Option<&str>) -> TrackedResource {
    TrackedResource {
        id: ResourceId::new(id),
        name: ResourceName::new(name).unwrap(),
        pipeline: pipeline_ref("main", "ci"),
        resource_type: ResourceType::new("git").unwrap(),
        source: Source::from_value(json!({ "uri": format!("https://example.com/{name}.git") }))
            .unwrap(),
        webhook_token: token.map(str::to_string),
        resource_config_id: None,
    }
}

pub fn version(reference: &str) -> Version {
    [("ref", reference)].into_iter().collect()
}

// ---------------------------------------------------------------------------

/// Resolves `((name))` templates from a fixed map; plain strings pass through.
pub struct FakeCredentials {
    values: HashMap<String, String>,
    failing: HashSet<String>,
    fail_all: bool,
    calls: AtomicUsize,
}

impl FakeCredentials {
    pub fn with(values: &[(&str, &str)]) -> Self {
        Self {
            values: values
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            failing: HashSet::new(),
            fail_all: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::with(&[])
        }
    }

    /// Makes evaluation of this exact template fail with a backend error.
    pub fn fail_template(mut self, template: &str) -> Self {
        self.failing.insert(template.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialResolver for FakeCredentials {
    async fn evaluate(
        &self,
        _scope: &VariableScope,
        template: &str,
    ) -> Result<String, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || self.failing.contains(template) {
            return Err(CredentialError::Backend {
                message: "credential manager unreachable".to_string(),
            });
        }
        match template
            .strip_prefix("((")
            .and_then(|rest| rest.strip_suffix("))"))
        {
            Some(name) => self.values.get(name).cloned().ok_or_else(|| {
                CredentialError::UndefinedVariable {
                    name: name.to_string(),
                }
            }),
            None => Ok(template.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------

/// In-memory persistence with per-lookup failure injection.
#[derive(Default)]
pub struct FakeStore {
    pipelines: Vec<PipelineRef>,
    resources: Vec<TrackedResource>,
    configs: HashMap<ResourceConfigId, ResourceConfig>,
    latest: HashMap<ResourceConfigId, ResourceVersion>,
    fail_resource_lookups: bool,
    fail_config_lookup: HashSet<ResourceConfigId>,
    fail_version_lookup: HashSet<ResourceConfigId>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(mut self, pipeline: PipelineRef) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    pub fn with_resource(mut self, resource: TrackedResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_config(mut self, id: u64) -> Self {
        let id = ResourceConfigId::new(id);
        self.configs.insert(
            id,
            ResourceConfig {
                id,
                resource_type: ResourceType::new("git").unwrap(),
            },
        );
        self
    }

    /// Records `version` as the latest for config `id`, stamped with
    /// `stamped_as` as its owning identity.
    pub fn with_latest(mut self, id: u64, stamped_as: u64, version: Version) -> Self {
        self.latest.insert(
            ResourceConfigId::new(id),
            ResourceVersion {
                resource_config_id: ResourceConfigId::new(stamped_as),
                version,
                observed_at: Timestamp::now(),
            },
        );
        self
    }

    pub fn failing_resource_lookups(mut self) -> Self {
        self.fail_resource_lookups = true;
        self
    }

    pub fn failing_config_lookup(mut self, id: u64) -> Self {
        self.fail_config_lookup.insert(ResourceConfigId::new(id));
        self
    }

    pub fn failing_version_lookup(mut self, id: u64) -> Self {
        self.fail_version_lookup.insert(ResourceConfigId::new(id));
        self
    }

    fn outage() -> StoreError {
        StoreError::Backend {
            message: "database is down".to_string(),
        }
    }
}

#[async_trait]
impl PipelineRepository for FakeStore {
    async fn find_pipeline(&self, pipeline: &PipelineRef) -> Result<Option<Pipeline>, StoreError> {
        if self.fail_resource_lookups {
            return Err(Self::outage());
        }
        Ok(self
            .pipelines
            .iter()
            .find(|p| *p == pipeline)
            .map(|p| Pipeline {
                reference: p.clone(),
                paused: false,
            }))
    }
}

#[async_trait]
impl ResourceRepository for FakeStore {
    async fn find_resource_by_name(
        &self,
        pipeline: &PipelineRef,
        name: &ResourceName,
    ) -> Result<Option<TrackedResource>, StoreError> {
        if self.fail_resource_lookups {
            return Err(Self::outage());
        }
        Ok(self
            .resources
            .iter()
            .find(|r| r.pipeline == *pipeline && r.name == *name)
            .cloned())
    }

    async fn find_resources_by_source_field(
        &self,
        key: &SourceKey,
        value: &str,
    ) -> Result<Vec<TrackedResource>, StoreError> {
        if self.fail_resource_lookups {
            return Err(Self::outage());
        }
        Ok(self
            .resources
            .iter()
            .filter(|r| r.source.field_matches(key.as_str(), value))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResourceConfigRepository for FakeStore {
    async fn find_resource_config_by_id(
        &self,
        id: ResourceConfigId,
    ) -> Result<Option<ResourceConfig>, StoreError> {
        if self.fail_config_lookup.contains(&id) {
            return Err(Self::outage());
        }
        Ok(self.configs.get(&id).cloned())
    }

    async fn latest_version(
        &self,
        id: ResourceConfigId,
    ) -> Result<Option<ResourceVersion>, StoreError> {
        if self.fail_version_lookup.contains(&id) {
            return Err(Self::outage());
        }
        Ok(self.latest.get(&id).cloned())
    }
}

// ---------------------------------------------------------------------------

/// Scanner that records every request it receives.
#[derive(Default)]
pub struct FakeScanner {
    requests: Mutex<Vec<ScanRequest>>,
    reject: HashSet<ResourceId>,
    panic_on: HashSet<ResourceId>,
}

impl FakeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, id: u64) -> Self {
        self.reject.insert(ResourceId::new(id));
        self
    }

    pub fn panicking_on(mut self, id: u64) -> Self {
        self.panic_on.insert(ResourceId::new(id));
        self
    }

    pub fn requests(&self) -> Vec<ScanRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scanner for FakeScanner {
    async fn trigger_scan(&self, request: ScanRequest) -> Result<(), ScanError> {
        if self.panic_on.contains(&request.resource_id) {
            panic!("scanner blew up for resource {}", request.resource_id);
        }
        if self.reject.contains(&request.resource_id) {
            return Err(ScanError::Rejected {
                status: 422,
                message: "unknown resource".to_string(),
            });
        }
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}
