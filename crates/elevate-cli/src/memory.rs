//! In-memory directory and IAM store behind `[backend] mock = true`.
//!
//! Every identity resolves to the configured groups. Every resource starts
//! out with a single `roles/owner` binding for `owner@<trusted_domain>`, so a
//! grant always has an existing document to append to. Writes are checked
//! against the stored etag like the real backend does.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use elevate_core::{
    BackendError, Binding, GetPolicyOptions, GroupId, GroupSet, IamPolicy, Identity,
    MembershipResolver, PolicyReader, PolicyWriter, ResolverError, ResourceRef, RoleId,
};
use tracing::debug;

/// Directory that puts everyone in the same groups.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryDirectory {
    groups: GroupSet,
}

impl MemoryDirectory {
    /// Resolve every identity to `groups`.
    pub(crate) fn new<'a>(groups: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            groups: groups.into_iter().map(GroupId::from).collect(),
        }
    }
}

#[async_trait]
impl MembershipResolver for MemoryDirectory {
    async fn list_groups(
        &self,
        identity: &Identity,
        domain: &str,
    ) -> Result<Option<GroupSet>, ResolverError> {
        debug!(%identity, domain, groups = self.groups.len(), "in-memory group lookup");
        Ok(Some(self.groups.clone()))
    }
}

/// IAM store keyed by resource.
#[derive(Debug)]
pub(crate) struct MemoryIam {
    owner: String,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    documents: HashMap<ResourceRef, IamPolicy>,
    writes: u64,
}

impl MemoryIam {
    /// Seed new resources with `owner` as `roles/owner`.
    pub(crate) fn new(owner: &Identity) -> Self {
        Self {
            owner: owner.principal(),
            state: Mutex::new(State::default()),
        }
    }

    /// The stored document of `resource`, if it was ever touched.
    pub(crate) fn document(&self, resource: &ResourceRef) -> Option<IamPolicy> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.documents.get(resource).cloned())
    }

    fn seed(&self) -> IamPolicy {
        IamPolicy {
            version: 1,
            etag: "etag-0".to_owned(),
            bindings: vec![Binding {
                role: RoleId::new("roles/owner"),
                members: vec![self.owner.clone()],
                condition: None,
            }],
        }
    }
}

fn poisoned() -> BackendError {
    BackendError::Unavailable("in-memory iam store lock poisoned".to_owned())
}

#[async_trait]
impl PolicyReader for MemoryIam {
    async fn get_policy(
        &self,
        resource: &ResourceRef,
        _options: &GetPolicyOptions,
    ) -> Result<Option<IamPolicy>, BackendError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        let doc = state
            .documents
            .entry(resource.clone())
            .or_insert_with(|| self.seed());
        Ok(Some(doc.clone()))
    }
}

#[async_trait]
impl PolicyWriter for MemoryIam {
    async fn set_policy(
        &self,
        resource: &ResourceRef,
        mut policy: IamPolicy,
    ) -> Result<IamPolicy, BackendError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if let Some(current) = state.documents.get(resource)
            && current.etag != policy.etag
        {
            return Err(BackendError::Conflict(format!(
                "etag {} does not match {}",
                policy.etag, current.etag
            )));
        }
        state.writes = state.writes.saturating_add(1);
        policy.etag = format!("etag-{}", state.writes);
        state.documents.insert(resource.clone(), policy.clone());
        Ok(policy)
    }
}
