//! Keyed query cache for the `auth` and `jobs` results.
//!
//! Each key walks `Idle -> Loading -> {Loaded | Errored}`. Invalidation marks a
//! key stale; the next read starts a fresh fetch. Every fetch carries a ticket
//! and only the most recently issued ticket may settle its key, so a slow
//! older response can never overwrite a newer one.

use crate::error::ApiError;
use crate::models::{AuthStatus, JobApplication, JobDraft, JobList, JobPatch, JobQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Auth,
    Jobs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// Identifies one fetch of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub key: QueryKey,
    pub seq: u64,
}

#[derive(Debug, Clone)]
pub struct Query<T> {
    status: QueryStatus,
    data: Option<T>,
    error: Option<ApiError>,
    stale: bool,
    issued: u64,
}

impl<T> Default for Query<T> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            stale: false,
            issued: 0,
        }
    }
}

impl<T> Query<T> {
    pub fn status(&self) -> QueryStatus {
        self.status
    }

    /// Last successfully fetched value. Kept across refetches and failures.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// True until the first fetch has settled.
    pub fn is_initial_load(&self) -> bool {
        self.data.is_none() && matches!(self.status, QueryStatus::Idle | QueryStatus::Loading)
    }

    fn needs_fetch(&self) -> bool {
        self.status == QueryStatus::Idle || self.stale
    }

    fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.stale = false;
        self.status = QueryStatus::Loading;
        self.issued
    }

    fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Returns false when `seq` has been superseded and the result was dropped.
    fn settle(&mut self, seq: u64, result: Result<T, ApiError>) -> bool {
        if seq != self.issued {
            return false;
        }
        match result {
            Ok(value) => {
                self.data = Some(value);
                self.error = None;
                self.status = QueryStatus::Loaded;
            }
            Err(err) => {
                self.error = Some(err);
                self.status = QueryStatus::Errored;
            }
        }
        true
    }
}

/// Result of one fetch, tagged with its key's payload type.
#[derive(Debug, Clone)]
pub enum Fetched {
    Auth(Result<AuthStatus, ApiError>),
    Jobs(Result<JobList, ApiError>),
}

/// A state-changing request routed through the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Login,
    Logout,
    Create(JobDraft),
    Update { id: i64, patch: JobPatch },
    Delete(i64),
    SyncGmail,
}

impl Mutation {
    /// Keys whose cached value is out of date once this mutation succeeds.
    pub fn invalidates(&self) -> &'static [QueryKey] {
        match self {
            Mutation::Login => &[],
            Mutation::Logout => &[QueryKey::Auth],
            Mutation::Create(_)
            | Mutation::Update { .. }
            | Mutation::Delete(_)
            | Mutation::SyncGmail => &[QueryKey::Jobs],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Login => "login",
            Mutation::Logout => "logout",
            Mutation::Create(_) => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete(_) => "delete",
            Mutation::SyncGmail => "sync",
        }
    }
}

/// Successful mutation payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutated {
    LoginUrl(String),
    LoggedOut,
    Saved(JobApplication),
    Deleted(i64),
    Synced(String),
}

#[derive(Debug)]
pub struct Store {
    auth: Query<AuthStatus>,
    jobs: Query<JobList>,
    jobs_query: JobQuery,
}

impl Store {
    pub fn new(jobs_query: JobQuery) -> Self {
        Self {
            auth: Query::default(),
            jobs: Query::default(),
            jobs_query,
        }
    }

    pub fn auth(&self) -> &Query<AuthStatus> {
        &self.auth
    }

    pub fn jobs(&self) -> &Query<JobList> {
        &self.jobs
    }

    /// Current job snapshot; empty before the first successful load.
    pub fn job_items(&self) -> &[JobApplication] {
        self.jobs.data().map(|l| l.items.as_slice()).unwrap_or(&[])
    }

    pub fn jobs_query(&self) -> &JobQuery {
        &self.jobs_query
    }

    pub fn status(&self, key: QueryKey) -> QueryStatus {
        match key {
            QueryKey::Auth => self.auth.status(),
            QueryKey::Jobs => self.jobs.status(),
        }
    }

    pub fn invalidate(&mut self, key: QueryKey) {
        tracing::debug!(?key, "invalidating query");
        match key {
            QueryKey::Auth => self.auth.invalidate(),
            QueryKey::Jobs => self.jobs.invalidate(),
        }
    }

    /// Start a fetch for every key that is idle or stale.
    ///
    /// Called on each read; a key already loading and not stale is left alone.
    pub fn due_fetches(&mut self) -> Vec<Ticket> {
        let mut tickets = Vec::new();
        if self.auth.needs_fetch() {
            tickets.push(Ticket {
                key: QueryKey::Auth,
                seq: self.auth.begin(),
            });
        }
        if self.jobs.needs_fetch() {
            tickets.push(Ticket {
                key: QueryKey::Jobs,
                seq: self.jobs.begin(),
            });
        }
        tickets
    }

    /// Apply a fetch result. Returns false if a newer fetch superseded it.
    pub fn settle_fetch(&mut self, ticket: Ticket, fetched: Fetched) -> bool {
        let applied = match (ticket.key, fetched) {
            (QueryKey::Auth, Fetched::Auth(result)) => self.auth.settle(ticket.seq, result),
            (QueryKey::Jobs, Fetched::Jobs(result)) => self.jobs.settle(ticket.seq, result),
            (key, _) => {
                tracing::warn!(?key, "fetch result does not match its key");
                false
            }
        };
        if applied {
            tracing::debug!(key = ?ticket.key, status = ?self.status(ticket.key), "query settled");
        } else {
            tracing::debug!(key = ?ticket.key, seq = ticket.seq, "dropping superseded fetch result");
        }
        applied
    }

    /// Record a mutation outcome. Success invalidates the affected keys;
    /// failure leaves every cached value exactly as it was.
    pub fn settle_mutation(&mut self, mutation: &Mutation, result: &Result<Mutated, ApiError>) {
        match result {
            Ok(_) => {
                tracing::info!(mutation = mutation.name(), "mutation succeeded");
                for key in mutation.invalidates() {
                    self.invalidate(*key);
                }
            }
            Err(err) => {
                tracing::warn!(mutation = mutation.name(), error = %err, "mutation failed");
            }
        }
    }
}
