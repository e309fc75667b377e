use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::Error;
use crate::{ActorRef, Rto};

use super::export;
use super::registrant::{NewRegistrant, Registrant, RegistrantPatch, Status};
use super::stats::{tally, RegistrantStats};
use super::store::RegistrantStore;
use super::table::{SortSpec, TableState};

/// Whether the table region can be rendered.
///
/// `Loading`/`Failed` only describe the very first fetch; once a
/// snapshot has landed, background refreshes keep the stale rows
/// visible and swap the new snapshot in atomically.
#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Ready,
    Failed { message: String },
}

/// One admin's view of the registrant collection: the authoritative
/// snapshot, the table state derived over it, and the mutation actions.
///
/// The store is injected; the session never reaches for ambient state.
pub struct AdminSession {
    store: Arc<dyn RegistrantStore>,
    pub table: TableState,
    stats: RegistrantStats,
    load: LoadState,
    mutating: Option<i64>,
    batch_running: bool,
}

impl AdminSession {
    pub fn new(store: Arc<dyn RegistrantStore>) -> Self {
        AdminSession {
            store,
            table: TableState::new(),
            stats: RegistrantStats::default(),
            load: LoadState::Loading,
            mutating: None,
            batch_running: false,
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn stats(&self) -> RegistrantStats {
        self.stats
    }

    pub fn mutating(&self) -> Option<i64> {
        self.mutating
    }

    /// Re-fetches the whole snapshot. The single invalidation point:
    /// every successful mutation funnels through here, and no mutated
    /// row is ever patched in place client-side.
    pub async fn refresh(&mut self) -> anyhow::Result<()> {
        match self.store.list().await {
            Ok(snapshot) => {
                self.stats = tally(&snapshot);
                self.table.replace_snapshot(snapshot);
                self.load = LoadState::Ready;
                Ok(())
            }
            Err(e) => {
                if self.load == LoadState::Ready {
                    // Background refresh failed; keep the stale table.
                    log::error!("Snapshot refresh failed: {}", e);
                } else {
                    self.load = LoadState::Failed {
                        message: e.to_string(),
                    };
                }
                Err(e)
            }
        }
    }

    async fn mutate_row(&mut self, id: i64, patch: RegistrantPatch) -> anyhow::Result<()> {
        self.mutating = Some(id);
        let result = self.store.update(id, patch).await;
        self.mutating = None;

        match result {
            Ok(()) => self.refresh().await,
            Err(e) => {
                log::error!("Failed to update registrant {}: {}", id, e);
                Err(e)
            }
        }
    }

    /// Writes the new status unconditionally; the no-op guard for
    /// "already in this status" lives in the UI, not here.
    pub async fn update_status(&mut self, id: i64, status: Status) -> anyhow::Result<()> {
        log::info!("Setting registrant {} status to {}", id, status);
        self.mutate_row(id, RegistrantPatch::status(status)).await
    }

    /// Flips check-in from the last-known snapshot value. This is
    /// read-modify-write against client state, not a server-side
    /// atomic toggle; two admin sessions can race.
    pub async fn toggle_check_in(&mut self, id: i64) -> anyhow::Result<()> {
        let current = self
            .table
            .find(id)
            .ok_or(Error::RegistrantNotFound(id))?
            .is_checked_in;
        log::info!("Setting registrant {} check-in to {}", id, !current);
        self.mutate_row(id, RegistrantPatch::checked_in(!current))
            .await
    }

    pub async fn update_remarks(
        &mut self,
        id: i64,
        remarks: Option<String>,
    ) -> anyhow::Result<()> {
        self.mutate_row(id, RegistrantPatch::remarks(remarks)).await
    }

    /// Permanent, no undo. `confirmed` must be true or the store is
    /// never called.
    pub async fn delete(&mut self, id: i64, confirmed: bool) -> anyhow::Result<()> {
        if !confirmed {
            Err(Error::UnconfirmedDelete)?;
        }

        log::info!("Deleting registrant {}", id);
        self.mutating = Some(id);
        let result = self.store.delete(id).await;
        self.mutating = None;

        match result {
            Ok(()) => self.refresh().await,
            Err(e) => {
                log::error!("Failed to delete registrant {}: {}", id, e);
                Err(e)
            }
        }
    }

    /// Applies the same check-in state to every selected row, one
    /// sequential update per id. No atomicity across the batch; the
    /// first failure stops the loop and skips the refresh.
    pub async fn batch_check_in(&mut self, target: bool) -> anyhow::Result<()> {
        let ids = self.table.selected_ids();
        if ids.is_empty() {
            Err(Error::EmptySelection)?;
        }

        log::info!(
            "Batch {} {} registrants",
            if target { "check-in for" } else { "check-out for" },
            ids.len()
        );

        self.batch_running = true;
        let mut result = Ok(());
        for id in ids {
            if let Err(e) = self.store.update(id, RegistrantPatch::checked_in(target)).await {
                log::error!("Batch check-in stopped at registrant {}: {}", id, e);
                result = Err(e);
                break;
            }
        }
        self.batch_running = false;

        result?;
        // The refresh replaces the snapshot, which also clears the
        // selection for the completed batch.
        self.refresh().await
    }

    /// Public registration and the admin add dialog. Runs the
    /// best-effort duplicate-email check before any write; the race
    /// between two simultaneous submissions is accepted.
    pub async fn add_registrant(&mut self, entry: NewRegistrant) -> anyhow::Result<Registrant> {
        let entry = entry.normalized();
        entry.validate()?;

        if let Some(email) = &entry.email {
            if self.store.find_by_email(email).await?.is_some() {
                Err(Error::DuplicateEmail(email.clone()))?;
            }
        }

        let created = self.store.insert(&entry).await?;
        log::info!(
            "Registered {} ({})",
            created.full_name(),
            created.email.as_deref().unwrap_or("no email")
        );
        self.refresh().await?;
        Ok(created)
    }

    /// CSV text and filename for the full snapshot, or for the current
    /// selection only. Both paths share one serialization function.
    pub fn export_csv(&self, selection_only: bool) -> (String, String) {
        let content = if selection_only {
            let ids = self.table.selected_ids();
            let rows: Vec<Registrant> = self
                .table
                .snapshot()
                .iter()
                .filter(|r| ids.contains(&r.id))
                .cloned()
                .collect();
            export::to_csv(&rows)
        } else {
            export::to_csv(self.table.snapshot())
        };
        (export::export_filename(Utc::now().date_naive()), content)
    }

    pub fn apply_view(&mut self, command: ViewCommand) -> Result<(), Error> {
        match command {
            ViewCommand::SetSearchColumn { column } => self.table.set_search_column(&column)?,
            ViewCommand::SetSearch { value } => self.table.set_search(&value),
            ViewCommand::SetStatusFilter { status } => self.table.set_status_filter(status),
            ViewCommand::SetCheckInFilter { checked_in } => {
                self.table.set_check_in_filter(checked_in)
            }
            ViewCommand::ToggleSort { column } => self.table.toggle_sort(&column)?,
            ViewCommand::SetPage { index } => self.table.set_page(index),
            ViewCommand::SetPageSize { size } => self.table.set_page_size(size)?,
            ViewCommand::ToggleColumn { column } => self.table.toggle_column(&column)?,
            ViewCommand::ToggleSelect { id } => self.table.toggle_select(id),
            ViewCommand::SelectAll => self.table.select_all(),
            ViewCommand::ClearSelection => self.table.clear_selection(),
        }
        Ok(())
    }

    pub fn view_page(&self) -> ViewPage {
        ViewPage {
            rows: self.table.visible_rows().into_iter().cloned().collect(),
            page_index: self.table.page_index(),
            page_count: self.table.page_count(),
            page_size: self.table.page_size(),
            filtered_count: self.table.filtered_rows().len(),
            selected_count: self.table.selected_count(),
            stats: self.stats,
            visible_columns: self.table.visible_columns(),
            sort: self.table.sort(),
            mutating: self.mutating,
            batch_running: self.batch_running,
            load: self.load.clone(),
        }
    }
}

/// A declarative change to the table view state.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ViewCommand {
    SetSearchColumn { column: String },
    SetSearch { value: String },
    SetStatusFilter { status: Option<Status> },
    SetCheckInFilter { checked_in: Option<bool> },
    ToggleSort { column: String },
    SetPage { index: usize },
    SetPageSize { size: usize },
    ToggleColumn { column: String },
    ToggleSelect { id: i64 },
    SelectAll,
    ClearSelection,
}

/// Everything the admin table needs to render one page.
#[derive(Debug, Serialize)]
pub struct ViewPage {
    pub rows: Vec<Registrant>,
    pub page_index: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub filtered_count: usize,
    pub selected_count: usize,
    pub stats: RegistrantStats,
    pub visible_columns: Vec<&'static str>,
    pub sort: Option<SortSpec>,
    pub mutating: Option<i64>,
    pub batch_running: bool,
    pub load: LoadState,
}

pub enum SessionRequest {
    Refresh(Rto<()>),
    Submit(NewRegistrant, Rto<Registrant>),
    UpdateStatus(i64, Status, Rto<()>),
    ToggleCheckIn(i64, Rto<()>),
    UpdateRemarks(i64, Option<String>, Rto<()>),
    Delete(i64, bool, Rto<()>),
    BatchCheckIn(bool, Rto<()>),
    View(ViewCommand, Rto<ViewPage>),
    GetView(Rto<ViewPage>),
    GetStats(Rto<RegistrantStats>),
    GetSnapshot(Rto<Vec<Registrant>>),
    Export(bool, Rto<(String, String)>),
}

pub type SessionActor = ActorRef<SessionRequest>;

/// Serializes every session-state transition onto one task; store calls
/// are awaited in order and nothing mutates the snapshot concurrently.
pub async fn run_session_actor(
    mut session: AdminSession,
    mut rx: UnboundedReceiver<SessionRequest>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            SessionRequest::Refresh(rto) => rto.reply(session.refresh().await),
            SessionRequest::Submit(entry, rto) => rto.reply(session.add_registrant(entry).await),
            SessionRequest::UpdateStatus(id, status, rto) => {
                rto.reply(session.update_status(id, status).await)
            }
            SessionRequest::ToggleCheckIn(id, rto) => rto.reply(session.toggle_check_in(id).await),
            SessionRequest::UpdateRemarks(id, remarks, rto) => {
                rto.reply(session.update_remarks(id, remarks).await)
            }
            SessionRequest::Delete(id, confirmed, rto) => {
                rto.reply(session.delete(id, confirmed).await)
            }
            SessionRequest::BatchCheckIn(target, rto) => {
                rto.reply(session.batch_check_in(target).await)
            }
            SessionRequest::View(command, rto) => rto.reply(
                session
                    .apply_view(command)
                    .map(|_| session.view_page())
                    .map_err(Into::into),
            ),
            SessionRequest::GetView(rto) => rto.reply(Ok(session.view_page())),
            SessionRequest::GetStats(rto) => rto.reply(Ok(session.stats())),
            SessionRequest::GetSnapshot(rto) => rto.reply(Ok(session.table.snapshot().to_vec())),
            SessionRequest::Export(selection_only, rto) => {
                rto.reply(Ok(session.export_csv(selection_only)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::core::registrant::Region;
    use crate::core::store::memory::MemoryStore;

    fn entry(first: &str, email: Option<&str>) -> NewRegistrant {
        NewRegistrant {
            first_name: first.to_string(),
            middle_name: None,
            last_name: "Cruz".to_string(),
            suffix: None,
            email: email.map(str::to_string),
            contact_number: "09171234567".to_string(),
            facebook_profile: None,
            region: Region::CentralVisayas,
            university: "USC".to_string(),
            course: "BS Biology".to_string(),
            year_level: None,
            year_awarded: None,
            scholarship_type: None,
            is_dost_scholar: false,
            is_start_member: false,
            remarks: None,
        }
    }

    async fn session_with(entries: Vec<NewRegistrant>) -> (Arc<MemoryStore>, AdminSession) {
        let store = Arc::new(MemoryStore::new());
        store.seed(entries);
        let mut session = AdminSession::new(store.clone());
        session.refresh().await.unwrap();
        (store, session)
    }

    #[tokio::test]
    async fn status_update_writes_once_and_refreshes_once() {
        let (store, mut session) = session_with(vec![entry("Ana", None)]).await;
        let id = session.table.snapshot()[0].id;
        assert_eq!(session.table.snapshot()[0].status, Status::Pending);

        session.update_status(id, Status::Accepted).await.unwrap();

        assert_eq!(store.write_count(), 1);
        // Initial load plus the post-mutation refresh.
        assert_eq!(store.list_count(), 2);
        assert_eq!(session.table.find(id).unwrap().status, Status::Accepted);
        assert_eq!(session.mutating(), None);
    }

    #[tokio::test]
    async fn check_in_toggles_round_trip() {
        let (_, mut session) = session_with(vec![entry("Ana", None)]).await;
        let id = session.table.snapshot()[0].id;
        assert!(!session.table.find(id).unwrap().is_checked_in);

        session.toggle_check_in(id).await.unwrap();
        assert!(session.table.find(id).unwrap().is_checked_in);

        session.toggle_check_in(id).await.unwrap();
        assert!(!session.table.find(id).unwrap().is_checked_in);
    }

    #[tokio::test]
    async fn toggling_an_unknown_row_never_touches_the_store() {
        let (store, mut session) = session_with(vec![entry("Ana", None)]).await;
        assert!(session.toggle_check_in(999).await.is_err());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn empty_batch_aborts_before_any_write() {
        let (store, mut session) = session_with(vec![entry("Ana", None)]).await;
        let err = session.batch_check_in(true).await.unwrap_err();
        assert!(err.downcast_ref::<Error>().is_some());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn batch_check_in_updates_every_selected_row() {
        let (store, mut session) =
            session_with(vec![entry("Ana", None), entry("Bea", None), entry("Carla", None)])
                .await;
        session.table.select_all();

        session.batch_check_in(true).await.unwrap();

        assert_eq!(store.write_count(), 3);
        assert!(session.table.snapshot().iter().all(|r| r.is_checked_in));
        // The post-batch refresh cleared the selection.
        assert_eq!(session.table.selected_count(), 0);
    }

    #[tokio::test]
    async fn delete_without_confirmation_never_calls_the_store() {
        let (store, mut session) = session_with(vec![entry("Ana", None)]).await;
        let id = session.table.snapshot()[0].id;

        assert!(session.delete(id, false).await.is_err());
        assert_eq!(store.write_count(), 0);
        assert!(session.table.find(id).is_some());

        session.delete(id, true).await.unwrap();
        assert!(session.table.find(id).is_none());
    }

    #[tokio::test]
    async fn failed_mutation_leaves_snapshot_untouched_and_clears_marker() {
        let (store, mut session) = session_with(vec![entry("Ana", None)]).await;
        let id = session.table.snapshot()[0].id;
        let lists_before = store.list_count();

        store.fail_writes.store(true, Ordering::SeqCst);
        assert!(session.update_status(id, Status::Accepted).await.is_err());

        // No refresh fired, the row kept its previous status, and the
        // loading marker cleared so the control is usable again.
        assert_eq!(store.list_count(), lists_before);
        assert_eq!(session.table.find(id).unwrap().status, Status::Pending);
        assert_eq!(session.mutating(), None);
    }

    #[tokio::test]
    async fn duplicate_email_short_circuits_before_insert() {
        let (store, mut session) =
            session_with(vec![entry("Ana", Some("ana@example.com"))]).await;
        let writes_before = store.write_count();

        let err = session
            .add_registrant(entry("Another", Some("ana@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DuplicateEmail(_))
        ));
        assert_eq!(store.write_count(), writes_before);
    }

    #[tokio::test]
    async fn submission_inserts_pending_and_refreshes() {
        let (_, mut session) = session_with(vec![]).await;
        let created = session
            .add_registrant(entry("Ana", Some("ana@example.com")))
            .await
            .unwrap();

        assert_eq!(created.status, Status::Pending);
        assert!(!created.is_checked_in);
        assert_eq!(session.table.snapshot().len(), 1);
        assert_eq!(session.stats().pending, 1);
    }

    #[tokio::test]
    async fn whitespace_remarks_normalize_to_null() {
        let (store, mut session) = session_with(vec![entry("Ana", None)]).await;
        let id = session.table.snapshot()[0].id;

        session
            .update_remarks(id, Some("  needs follow-up  ".to_string()))
            .await
            .unwrap();
        assert_eq!(
            store.row(id).unwrap().remarks,
            Some("needs follow-up".to_string())
        );

        session.update_remarks(id, Some("   ".to_string())).await.unwrap();
        assert_eq!(store.row(id).unwrap().remarks, None);
    }

    #[tokio::test]
    async fn initial_load_failure_blocks_until_a_retry_succeeds() {
        let store = Arc::new(MemoryStore::new());
        store.seed(vec![entry("Ana", None)]);
        store.fail_lists.store(true, Ordering::SeqCst);

        let mut session = AdminSession::new(store.clone());
        assert!(session.refresh().await.is_err());
        assert!(matches!(session.load_state(), LoadState::Failed { .. }));

        store.fail_lists.store(false, Ordering::SeqCst);
        session.refresh().await.unwrap();
        assert_eq!(session.load_state(), &LoadState::Ready);
        assert_eq!(session.table.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn background_refresh_failure_keeps_the_stale_table() {
        let (store, mut session) = session_with(vec![entry("Ana", None)]).await;
        store.fail_lists.store(true, Ordering::SeqCst);

        assert!(session.refresh().await.is_err());
        assert_eq!(session.load_state(), &LoadState::Ready);
        assert_eq!(session.table.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn stats_track_the_full_snapshot_not_the_filter() {
        let (_, mut session) = session_with(vec![entry("Ana", None), entry("Bea", None)]).await;
        session.apply_view(ViewCommand::SetSearch {
            value: "bea".to_string(),
        })
        .unwrap();

        let page = session.view_page();
        assert_eq!(page.filtered_count, 1);
        assert_eq!(page.stats.total, 2);
    }

    #[tokio::test]
    async fn selection_export_serializes_only_selected_rows() {
        let (_, mut session) = session_with(vec![entry("Ana", None), entry("Bea", None)]).await;
        let id = session.table.snapshot()[0].id;
        session.table.toggle_select(id);

        let (filename, content) = session.export_csv(true);
        assert!(filename.starts_with("registrants_") && filename.ends_with(".csv"));
        assert_eq!(content.lines().count(), 2);

        let (_, full) = session.export_csv(false);
        assert_eq!(full.lines().count(), 3);
    }
}
