use async_trait::async_trait;

use super::registrant::{NewRegistrant, Registrant, RegistrantPatch};

/// The registrant collection contract. The table engine and the admin
/// session receive an implementation explicitly, never through ambient
/// state, so tests can substitute [`MemoryStore`].
#[async_trait]
pub trait RegistrantStore: Send + Sync {
    /// Full snapshot, newest first.
    async fn list(&self) -> anyhow::Result<Vec<Registrant>>;

    /// Inserts a new registrant and returns it with server-assigned
    /// `id` and `created_at`. Status starts pending, not checked in.
    async fn insert(&self, entry: &NewRegistrant) -> anyhow::Result<Registrant>;

    /// Applies a partial update to one row. Fails with
    /// [`Error::RegistrantNotFound`](crate::error::Error) when no row
    /// matches, so callers can tell a missing row from a store failure.
    async fn update(&self, id: i64, patch: RegistrantPatch) -> anyhow::Result<()>;

    /// Permanently removes one row. No soft-delete, no undo.
    async fn delete(&self, id: i64) -> anyhow::Result<()>;

    /// Lookup for the pre-insert duplicate-email check. `Ok(None)` means
    /// no matching row, distinct from a fetch failure.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Registrant>>;
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::core::registrant::Status;
    use crate::error::Error;

    /// In-memory stand-in for the SQLite store, with call counters so
    /// tests can assert how many gateway calls an action performed.
    pub struct MemoryStore {
        rows: Mutex<Vec<Registrant>>,
        next_id: AtomicI64,
        pub lists: AtomicUsize,
        pub writes: AtomicUsize,
        pub fail_writes: AtomicBool,
        pub fail_lists: AtomicBool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            MemoryStore {
                rows: Mutex::new(vec![]),
                next_id: AtomicI64::new(1),
                lists: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
                fail_writes: AtomicBool::new(false),
                fail_lists: AtomicBool::new(false),
            }
        }

        pub fn seed(&self, entries: Vec<NewRegistrant>) {
            let mut rows = self.rows.lock().unwrap();
            for entry in entries {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                rows.push(materialize(id, &entry));
            }
        }

        pub fn list_count(&self) -> usize {
            self.lists.load(Ordering::SeqCst)
        }

        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn row(&self, id: i64) -> Option<Registrant> {
            self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned()
        }

        fn check_write(&self) -> anyhow::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                anyhow::bail!("simulated store failure");
            }
            Ok(())
        }
    }

    fn materialize(id: i64, entry: &NewRegistrant) -> Registrant {
        Registrant {
            id,
            first_name: entry.first_name.clone(),
            middle_name: entry.middle_name.clone(),
            last_name: entry.last_name.clone(),
            suffix: entry.suffix.clone(),
            email: entry.email.clone(),
            contact_number: entry.contact_number.clone(),
            facebook_profile: entry.facebook_profile.clone(),
            region: entry.region,
            university: entry.university.clone(),
            course: entry.course.clone(),
            year_level: entry.year_level.clone(),
            year_awarded: entry.year_awarded.clone(),
            scholarship_type: entry.scholarship_type.clone(),
            is_dost_scholar: entry.is_dost_scholar,
            is_start_member: entry.is_start_member,
            status: Status::Pending,
            is_checked_in: false,
            remarks: entry.remarks.clone(),
            // Spread creation times so the newest-first default order is
            // observable in tests.
            created_at: Utc::now() + Duration::seconds(id),
        }
    }

    #[async_trait]
    impl RegistrantStore for MemoryStore {
        async fn list(&self) -> anyhow::Result<Vec<Registrant>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            if self.fail_lists.load(Ordering::SeqCst) {
                anyhow::bail!("simulated fetch failure");
            }
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn insert(&self, entry: &NewRegistrant) -> anyhow::Result<Registrant> {
            self.check_write()?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let row = materialize(id, entry);
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn update(&self, id: i64, patch: RegistrantPatch) -> anyhow::Result<()> {
            self.check_write()?;
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(Error::RegistrantNotFound(id))?;
            if let Some(status) = patch.status {
                row.status = status;
            }
            if let Some(checked_in) = patch.is_checked_in {
                row.is_checked_in = checked_in;
            }
            if let Some(remarks) = patch.remarks {
                row.remarks = remarks;
            }
            Ok(())
        }

        async fn delete(&self, id: i64) -> anyhow::Result<()> {
            self.check_write()?;
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| r.id != id);
            if rows.len() == before {
                Err(Error::RegistrantNotFound(id))?;
            }
            Ok(())
        }

        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Registrant>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.email.as_deref() == Some(email))
                .cloned())
        }
    }
}
