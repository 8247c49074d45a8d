//! Root controller: owns the store and the view state, turns user intents
//! into backend requests and completions back into state.
//!
//! Nothing here touches the terminal or the network. The TUI loop feeds key
//! presses in, drains `take_requests`/`take_effects`, and hands completions
//! back through `handle_completion`.

use chrono::NaiveDate;
use std::time::{Duration, Instant};

use crate::dispatch::{Completion, Request};
use crate::error::{ApiError, FormError};
use crate::form::{JobForm, Submission};
use crate::models::{JobApplication, JobPatch, JobQuery, JobStatus};
use crate::stats::Stats;
use crate::store::{Fetched, Mutated, Mutation, QueryKey, Store};
use crate::table::TableView;

pub const FLASH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Info,
    Error,
}

/// Transient status line. A newer message replaces the old one and restarts
/// the timer.
#[derive(Debug, Clone)]
pub struct Flash {
    pub message: String,
    pub kind: FlashKind,
    shown_at: Instant,
}

impl Flash {
    pub fn new(message: impl Into<String>, kind: FlashKind, shown_at: Instant) -> Self {
        Self {
            message: message.into(),
            kind,
            shown_at,
        }
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < FLASH_TIMEOUT
    }
}

/// Delete waiting for the user to say yes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDelete {
    pub id: i64,
    pub company: String,
    pub position: String,
}

impl ConfirmDelete {
    pub fn description(&self) -> String {
        format!(
            "Delete the application for {} at {}? This cannot be undone.",
            self.position, self.company
        )
    }
}

/// Side effects the controller asks the shell to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenUrl(String),
}

pub struct App {
    store: Store,
    table: TableView,
    form: Option<JobForm>,
    form_error: Option<String>,
    form_submission: Option<Mutation>,
    confirm: Option<ConfirmDelete>,
    flash: Option<Flash>,
    outbox: Vec<Request>,
    effects: Vec<Effect>,
    sync_pending: bool,
    login_pending: bool,
    should_quit: bool,
}

impl App {
    pub fn new(jobs_query: JobQuery) -> Self {
        Self {
            store: Store::new(jobs_query),
            table: TableView::default(),
            form: None,
            form_error: None,
            form_submission: None,
            confirm: None,
            flash: None,
            outbox: Vec::new(),
            effects: Vec::new(),
            sync_pending: false,
            login_pending: false,
            should_quit: false,
        }
    }

    // --- Read side ---

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn table(&self) -> &TableView {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut TableView {
        &mut self.table
    }

    pub fn jobs(&self) -> &[JobApplication] {
        self.store.job_items()
    }

    /// Server-side count; can exceed the fetched page.
    pub fn total_jobs(&self) -> usize {
        let fetched = self.store.job_items().len();
        self.store
            .jobs()
            .data()
            .map(|list| usize::try_from(list.total).unwrap_or(0).max(fetched))
            .unwrap_or(fetched)
    }

    pub fn visible_jobs(&self) -> Vec<&JobApplication> {
        self.table.rows(self.store.job_items())
    }

    pub fn selected_job(&self) -> Option<&JobApplication> {
        self.table.selected_row(self.store.job_items())
    }

    pub fn stats(&self) -> Stats {
        Stats::from_jobs(self.store.job_items())
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.auth().data().is_some_and(|a| a.authenticated)
    }

    pub fn auth_email(&self) -> Option<&str> {
        self.store.auth().data().and_then(|a| a.email.as_deref())
    }

    pub fn form(&self) -> Option<&JobForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut JobForm> {
        self.form.as_mut()
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn is_form_pending(&self) -> bool {
        self.form_submission.is_some()
    }

    pub fn confirm(&self) -> Option<&ConfirmDelete> {
        self.confirm.as_ref()
    }

    pub fn flash(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }

    pub fn is_sync_pending(&self) -> bool {
        self.sync_pending
    }

    pub fn is_login_pending(&self) -> bool {
        self.login_pending
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // --- Outbox ---

    /// Everything the backend should do next: due fetches first, then
    /// queued mutations.
    pub fn take_requests(&mut self) -> Vec<Request> {
        let query = self.store.jobs_query().clone();
        let mut requests: Vec<Request> = self
            .store
            .due_fetches()
            .into_iter()
            .map(|ticket| Request::Fetch {
                ticket,
                query: query.clone(),
            })
            .collect();
        requests.append(&mut self.outbox);
        requests
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    fn mutate(&mut self, mutation: Mutation) {
        tracing::debug!(mutation = mutation.name(), "queueing mutation");
        self.outbox.push(Request::Mutate(mutation));
    }

    // --- Transient message ---

    pub fn notify(&mut self, message: impl Into<String>, kind: FlashKind) {
        self.notify_at(message, kind, Instant::now());
    }

    pub fn notify_at(&mut self, message: impl Into<String>, kind: FlashKind, now: Instant) {
        self.flash = Some(Flash::new(message, kind, now));
    }

    /// Drop the status message once it has been up for `FLASH_TIMEOUT`.
    pub fn tick(&mut self, now: Instant) {
        if self.flash.as_ref().is_some_and(|f| !f.is_visible_at(now)) {
            self.flash = None;
        }
        let rows = self.visible_jobs().len();
        self.table.clamp_selection(rows);
    }

    // --- Intents ---

    /// Force both keys to refetch.
    pub fn refresh(&mut self) {
        self.store.invalidate(QueryKey::Auth);
        self.store.invalidate(QueryKey::Jobs);
    }

    pub fn select_next(&mut self) {
        let rows = self.visible_jobs().len();
        self.table.next(rows);
    }

    pub fn select_prev(&mut self) {
        self.table.prev();
    }

    pub fn open_create(&mut self, today: NaiveDate) {
        self.replace_form(Some(JobForm::new_entry(today)));
    }

    pub fn open_edit_selected(&mut self) {
        if let Some(job) = self.selected_job() {
            let form = JobForm::edit(job);
            self.replace_form(Some(form));
        }
    }

    /// Closing also stops tracking an in-flight save; its completion then
    /// only reaches the status line.
    pub fn close_form(&mut self) {
        self.replace_form(None);
    }

    fn replace_form(&mut self, form: Option<JobForm>) {
        if let Some(abandoned) = self.form_submission.take() {
            tracing::debug!(mutation = abandoned.name(), "form closed while saving");
        }
        self.form = form;
        self.form_error = None;
    }

    /// Validate locally; only a valid form reaches the backend.
    ///
    /// `Ok(true)` means a save was queued. `Ok(false)` means there is no open
    /// form or its save is still in flight.
    pub fn submit_form(&mut self) -> Result<bool, FormError> {
        let Some(form) = &self.form else {
            return Ok(false);
        };
        if self.form_submission.is_some() {
            return Ok(false);
        }
        let submission = match form.submit() {
            Ok(submission) => submission,
            Err(err) => {
                self.form_error = Some(err.to_string());
                return Err(err);
            }
        };
        let mutation = match submission {
            Submission::Create(draft) => Mutation::Create(draft),
            Submission::Update { id, patch } => Mutation::Update { id, patch },
        };
        self.form_error = None;
        self.form_submission = Some(mutation.clone());
        self.mutate(mutation);
        Ok(true)
    }

    /// Inline status edit: goes straight to the backend.
    pub fn set_selected_status(&mut self, status: JobStatus) {
        let Some(job) = self.selected_job() else { return };
        if job.status == status {
            return;
        }
        let id = job.id;
        self.mutate(Mutation::Update {
            id,
            patch: JobPatch::status(status),
        });
    }

    pub fn request_delete_selected(&mut self) {
        if let Some(job) = self.selected_job() {
            self.confirm = Some(ConfirmDelete {
                id: job.id,
                company: job.company.clone(),
                position: job.position.clone(),
            });
        }
    }

    pub fn confirm_delete(&mut self) {
        if let Some(confirm) = self.confirm.take() {
            self.mutate(Mutation::Delete(confirm.id));
        }
    }

    pub fn cancel_delete(&mut self) {
        self.confirm = None;
    }

    pub fn open_selected_url(&mut self) {
        let url = self.selected_job().and_then(|j| j.job_url.clone());
        match url {
            Some(url) => self.effects.push(Effect::OpenUrl(url)),
            None => self.notify("This application has no job URL", FlashKind::Info),
        }
    }

    pub fn sync_gmail(&mut self) {
        if self.sync_pending {
            return;
        }
        if !self.is_authenticated() {
            self.notify("Connect Gmail first (press l)", FlashKind::Info);
            return;
        }
        self.sync_pending = true;
        self.mutate(Mutation::SyncGmail);
    }

    pub fn login(&mut self) {
        if self.login_pending {
            return;
        }
        self.login_pending = true;
        self.mutate(Mutation::Login);
    }

    pub fn logout(&mut self) {
        self.mutate(Mutation::Logout);
    }

    /// The browser landed back from the Gmail consent screen.
    pub fn handle_auth_landing(&mut self, email: Option<String>) {
        self.store.invalidate(QueryKey::Auth);
        let message = match email {
            Some(email) => format!("Connected Gmail as {}", email),
            None => "Gmail connected".to_string(),
        };
        self.notify(message, FlashKind::Info);
    }

    // --- Completions ---

    pub fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Fetched { ticket, fetched } => {
                if let Fetched::Jobs(Err(err)) | Fetched::Auth(Err(err)) = &fetched {
                    tracing::warn!(key = ?ticket.key, error = %err, "query failed");
                }
                self.store.settle_fetch(ticket, fetched);
                let rows = self.visible_jobs().len();
                self.table.clamp_selection(rows);
            }
            Completion::Mutated { mutation, result } => {
                self.store.settle_mutation(&mutation, &result);
                self.after_mutation(mutation, result);
            }
            Completion::AuthCallback { email } => self.handle_auth_landing(email),
        }
    }

    fn after_mutation(&mut self, mutation: Mutation, result: Result<Mutated, ApiError>) {
        let from_form = self.form_submission.as_ref() == Some(&mutation);
        if from_form {
            self.form_submission = None;
        }

        match (&mutation, result) {
            (Mutation::Login, Ok(Mutated::LoginUrl(url))) => {
                self.login_pending = false;
                self.effects.push(Effect::OpenUrl(url));
                self.notify("Finish the Gmail sign-in in your browser", FlashKind::Info);
            }
            (Mutation::Login, Err(err)) => {
                self.login_pending = false;
                self.notify(err.user_message(), FlashKind::Error);
            }
            (Mutation::SyncGmail, Ok(Mutated::Synced(message))) => {
                self.sync_pending = false;
                self.notify(message, FlashKind::Info);
            }
            (Mutation::SyncGmail, Err(err)) => {
                self.sync_pending = false;
                let message = match err {
                    ApiError::Http {
                        detail: Some(detail),
                        ..
                    } => detail,
                    _ => "Sync failed".to_string(),
                };
                self.notify(message, FlashKind::Error);
            }
            (Mutation::Create(_) | Mutation::Update { .. }, Ok(_)) => {
                if from_form {
                    self.close_form();
                }
            }
            (Mutation::Delete(_), Ok(_)) => {
                self.notify("Application deleted", FlashKind::Info);
            }
            (Mutation::Logout, Ok(_)) => {
                self.notify("Disconnected Gmail", FlashKind::Info);
            }
            (_, Err(err)) => {
                if from_form {
                    self.form_error = Some(err.user_message());
                }
                self.notify(err.user_message(), FlashKind::Error);
            }
            (mutation, Ok(other)) => {
                tracing::warn!(mutation = mutation.name(), ?other, "unexpected mutation payload");
            }
        }
    }
}
