use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::Backend;
use crate::error::ApiError;
use crate::store::{Fetched, Mutated, Mutation, QueryKey, Ticket};
use crate::models::JobQuery;

/// Work for the backend, produced by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Fetch { ticket: Ticket, query: JobQuery },
    Mutate(Mutation),
}

/// Delivered back to the UI thread.
#[derive(Debug, Clone)]
pub enum Completion {
    Fetched { ticket: Ticket, fetched: Fetched },
    Mutated {
        mutation: Mutation,
        result: Result<Mutated, ApiError>,
    },
    /// The browser came back from the Gmail consent screen.
    AuthCallback { email: Option<String> },
}

/// Run one request to completion on the calling thread.
pub fn execute(backend: &dyn Backend, request: Request) -> Completion {
    match request {
        Request::Fetch { ticket, query } => {
            let fetched = match ticket.key {
                QueryKey::Auth => Fetched::Auth(backend.auth_status()),
                QueryKey::Jobs => Fetched::Jobs(backend.list_jobs(&query)),
            };
            Completion::Fetched { ticket, fetched }
        }
        Request::Mutate(mutation) => {
            let result = match &mutation {
                Mutation::Login => backend.login_url().map(Mutated::LoginUrl),
                Mutation::Logout => backend.logout().map(|_| Mutated::LoggedOut),
                Mutation::Create(draft) => backend.create_job(draft).map(Mutated::Saved),
                Mutation::Update { id, patch } => backend.update_job(*id, patch).map(Mutated::Saved),
                Mutation::Delete(id) => backend.delete_job(*id).map(|_| Mutated::Deleted(*id)),
                Mutation::SyncGmail => backend.sync_gmail().map(|r| Mutated::Synced(r.message)),
            };
            Completion::Mutated { mutation, result }
        }
    }
}

/// Runs backend calls on tokio's blocking pool so the UI loop never waits on
/// the network. Completions arrive on the receiver in whatever order the
/// backend answers; the store's tickets sort out stale fetches.
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    runtime: Runtime,
    tx: UnboundedSender<Completion>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> anyhow::Result<(Self, UnboundedReceiver<Completion>)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("jobtrack-io")
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok((Self { backend, runtime, tx }, rx))
    }

    /// Handle for other producers (the callback listener) on the same channel.
    pub fn sender(&self) -> UnboundedSender<Completion> {
        self.tx.clone()
    }

    pub fn submit(&self, request: Request) {
        tracing::debug!(?request, "dispatching");
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        self.runtime.spawn_blocking(move || {
            let completion = execute(backend.as_ref(), request);
            // The receiver is gone only when the UI is shutting down.
            let _ = tx.send(completion);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{job, MemoryBackend};
    use crate::models::{JobPatch, JobStatus};

    fn backend() -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::with_jobs(vec![
            job(1, "Google", "SRE", JobStatus::Applied),
            job(2, "Amazon", "SDE", JobStatus::Screening),
        ]))
    }

    #[test]
    fn test_execute_fetch_routes_by_key() {
        let backend = backend();
        let ticket = Ticket {
            key: QueryKey::Jobs,
            seq: 3,
        };
        let completion = execute(
            backend.as_ref(),
            Request::Fetch {
                ticket,
                query: JobQuery::default(),
            },
        );
        match completion {
            Completion::Fetched {
                ticket: t,
                fetched: Fetched::Jobs(Ok(list)),
            } => {
                assert_eq!(t, ticket);
                assert_eq!(list.items.len(), 2);
            }
            other => panic!("unexpected completion {:?}", other),
        }
    }

    #[test]
    fn test_execute_mutation_surfaces_errors_unchanged() {
        let backend = backend();
        let completion = execute(backend.as_ref(), Request::Mutate(Mutation::Delete(99)));
        match completion {
            Completion::Mutated { mutation, result } => {
                assert_eq!(mutation, Mutation::Delete(99));
                assert_eq!(
                    result,
                    Err(ApiError::Http {
                        status: 404,
                        detail: Some("Job application not found".to_string()),
                    })
                );
            }
            other => panic!("unexpected completion {:?}", other),
        }
        assert_eq!(backend.calls(), vec!["delete_job".to_string()]);
    }

    #[test]
    fn test_dispatcher_delivers_off_thread() {
        let backend = backend();
        let (dispatcher, mut rx) = Dispatcher::new(backend.clone()).unwrap();

        dispatcher.submit(Request::Mutate(Mutation::Update {
            id: 2,
            patch: JobPatch::status(JobStatus::Offer),
        }));

        match rx.blocking_recv().unwrap() {
            Completion::Mutated {
                result: Ok(Mutated::Saved(saved)),
                ..
            } => assert_eq!(saved.status, JobStatus::Offer),
            other => panic!("unexpected completion {:?}", other),
        }
        assert_eq!(backend.jobs()[1].status, JobStatus::Offer);
    }

    #[test]
    fn test_sender_shares_channel() {
        let (dispatcher, mut rx) = Dispatcher::new(backend()).unwrap();
        dispatcher
            .sender()
            .send(Completion::AuthCallback {
                email: Some("me@example.com".to_string()),
            })
            .unwrap();
        assert!(matches!(
            rx.blocking_recv().unwrap(),
            Completion::AuthCallback { email: Some(_) }
        ));
    }
}
