//! Mock implementations of the backend capability traits.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use elevate_core::{
    BackendError, Binding, Clock, GetPolicyOptions, GroupId, GroupSet, IamPolicy, Identity,
    MembershipResolver, PolicyReader, PolicyWriter, ResolverError, ResourceRef,
};

/// In-memory directory.
///
/// Identities that were never added resolve to `Ok(None)`.
#[derive(Debug, Default)]
pub struct MockDirectory {
    memberships: HashMap<Identity, GroupSet>,
    failure: Option<ResolverError>,
    lookups: Mutex<Vec<(Identity, String)>>,
}

impl MockDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `identity` as a member of `groups`.
    #[must_use]
    pub fn with_member<'a>(
        mut self,
        identity: &str,
        groups: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.memberships.insert(
            Identity::new(identity),
            groups.into_iter().map(GroupId::from).collect(),
        );
        self
    }

    /// Make every lookup fail with `error`.
    #[must_use]
    pub fn failing(mut self, error: ResolverError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of lookups made so far.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().map_or(0, |guard| guard.len())
    }

    /// The `(identity, domain)` pairs looked up, in order.
    #[must_use]
    pub fn lookups(&self) -> Vec<(Identity, String)> {
        self.lookups
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MembershipResolver for MockDirectory {
    async fn list_groups(
        &self,
        identity: &Identity,
        domain: &str,
    ) -> Result<Option<GroupSet>, ResolverError> {
        if let Ok(mut guard) = self.lookups.lock() {
            guard.push((identity.clone(), domain.to_string()));
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.memberships.get(identity).cloned())
    }
}

/// A scripted write failure.
#[derive(Debug, Clone)]
struct WriteFault {
    error: BackendError,
    /// Binding another writer lands before this write is rejected.
    interleaved: Option<Binding>,
}

/// In-memory IAM backend holding one policy document.
///
/// Fetches return the scripted results first, then the stored document.
/// Successful writes replace the stored document and bump its etag, like the
/// real backend.
#[derive(Debug, Default)]
pub struct MockIam {
    document: Mutex<Option<IamPolicy>>,
    fetch_script: Mutex<VecDeque<Result<Option<IamPolicy>, BackendError>>>,
    write_script: Mutex<VecDeque<WriteFault>>,
    written: Mutex<Vec<IamPolicy>>,
    fetched: Mutex<Vec<(ResourceRef, GetPolicyOptions)>>,
    fetches: AtomicUsize,
    writes: AtomicUsize,
}

impl MockIam {
    /// A backend whose resource has no policy document.
    #[must_use]
    pub fn without_policy() -> Self {
        Self::default()
    }

    /// A backend holding `policy`.
    #[must_use]
    pub fn with_policy(policy: IamPolicy) -> Self {
        Self {
            document: Mutex::new(Some(policy)),
            ..Self::default()
        }
    }

    /// Make the next unscripted fetch return `error`.
    #[must_use]
    pub fn fail_fetch(self, error: BackendError) -> Self {
        if let Ok(mut guard) = self.fetch_script.lock() {
            guard.push_back(Err(error));
        }
        self
    }

    /// Make the next unscripted write return `error`.
    #[must_use]
    pub fn fail_write(self, error: BackendError) -> Self {
        if let Ok(mut guard) = self.write_script.lock() {
            guard.push_back(WriteFault {
                error,
                interleaved: None,
            });
        }
        self
    }

    /// Make the next write lose a race: `binding` is appended to the stored
    /// document by "another writer", then the write fails with a conflict.
    #[must_use]
    pub fn lose_write_race(self, binding: Binding) -> Self {
        if let Ok(mut guard) = self.write_script.lock() {
            guard.push_back(WriteFault {
                error: BackendError::Conflict("etag mismatch".to_string()),
                interleaved: Some(binding),
            });
        }
        self
    }

    /// Number of `get_policy` calls.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of `set_policy` calls, including failed ones.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Documents accepted by successful writes, in order.
    #[must_use]
    pub fn written(&self) -> Vec<IamPolicy> {
        self.written
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Resources and options passed to `get_policy`, in order.
    #[must_use]
    pub fn fetched(&self) -> Vec<(ResourceRef, GetPolicyOptions)> {
        self.fetched
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// The currently stored document.
    #[must_use]
    pub fn current(&self) -> Option<IamPolicy> {
        self.document.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl PolicyReader for MockIam {
    async fn get_policy(
        &self,
        resource: &ResourceRef,
        options: &GetPolicyOptions,
    ) -> Result<Option<IamPolicy>, BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.fetched.lock() {
            guard.push((resource.clone(), *options));
        }
        if let Some(scripted) = self.fetch_script.lock().ok().and_then(|mut g| g.pop_front()) {
            return scripted;
        }
        Ok(self.current())
    }
}

#[async_trait]
impl PolicyWriter for MockIam {
    async fn set_policy(
        &self,
        _resource: &ResourceRef,
        mut policy: IamPolicy,
    ) -> Result<IamPolicy, BackendError> {
        let attempt = self.writes.fetch_add(1, Ordering::SeqCst);
        let mut document = self
            .document
            .lock()
            .map_err(|_| BackendError::Unavailable("mock lock poisoned".to_string()))?;

        if let Some(fault) = self.write_script.lock().ok().and_then(|mut g| g.pop_front()) {
            if let (Some(binding), Some(doc)) = (fault.interleaved, document.as_mut()) {
                doc.bindings.push(binding);
                doc.etag = format!("external-{attempt}");
            }
            return Err(fault.error);
        }

        policy.etag = format!("etag-{attempt}");
        *document = Some(policy.clone());
        if let Ok(mut guard) = self.written.lock() {
            guard.push(policy.clone());
        }
        Ok(policy)
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// 2024-04-28T00:00:00Z.
    #[must_use]
    pub fn test_time() -> Self {
        Self(Utc.with_ymd_and_hms(2024, 4, 28, 0, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
