use std::path::PathBuf;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{migrate::MigrateDatabase, sqlite::Sqlite, SqlitePool};

use crate::error::Error;

use super::registrant::{NewRegistrant, Registrant, RegistrantPatch};
use super::store::RegistrantStore;

/// SQLite-backed registrant collection.
///
/// Email uniqueness is deliberately not a schema constraint; the
/// application performs a read-then-write check before insert, and the
/// race between two simultaneous submissions is accepted.
pub struct RegistrantDb {
    db: SqlitePool,
}

impl RegistrantDb {
    pub async fn init(file: &PathBuf) -> anyhow::Result<Self> {
        let url = format!(
            "sqlite://{}",
            file.to_str().ok_or_else(|| anyhow!("invalid database path"))?
        );
        Sqlite::create_database(&url).await?;

        let db = SqlitePool::connect(&url).await?;
        sqlx::query(
            "create table if not exists registrants(
                        id integer primary key autoincrement,
                        first_name text not null,
                        middle_name text,
                        last_name text not null,
                        suffix text,
                        email text,
                        contact_number text not null,
                        facebook_profile text,
                        region text not null,
                        university text not null,
                        course text not null,
                        year_level text,
                        year_awarded text,
                        scholarship_type text,
                        is_dost_scholar boolean not null default false,
                        is_start_member boolean not null default false,
                        status text not null default 'pending',
                        is_checked_in boolean not null default false,
                        remarks text,
                        created_at text not null
                    );",
        )
        .execute(&db)
        .await?;

        Ok(RegistrantDb { db })
    }

    async fn get_registrant(&self, id: i64) -> anyhow::Result<Registrant> {
        sqlx::query_as("select * from registrants where id = ? limit 1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::RegistrantNotFound(id).into())
    }
}

#[async_trait]
impl RegistrantStore for RegistrantDb {
    async fn list(&self) -> anyhow::Result<Vec<Registrant>> {
        Ok(
            sqlx::query_as("select * from registrants order by created_at desc, id desc")
                .fetch_all(&self.db)
                .await?,
        )
    }

    async fn insert(&self, entry: &NewRegistrant) -> anyhow::Result<Registrant> {
        let result = sqlx::query(
            "insert into registrants(
                        first_name, middle_name, last_name, suffix,
                        email, contact_number, facebook_profile,
                        region, university, course,
                        year_level, year_awarded, scholarship_type,
                        is_dost_scholar, is_start_member,
                        status, is_checked_in, remarks, created_at
                    ) values(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', false, ?, ?)",
        )
        .bind(&entry.first_name)
        .bind(&entry.middle_name)
        .bind(&entry.last_name)
        .bind(&entry.suffix)
        .bind(&entry.email)
        .bind(&entry.contact_number)
        .bind(&entry.facebook_profile)
        .bind(entry.region)
        .bind(&entry.university)
        .bind(&entry.course)
        .bind(&entry.year_level)
        .bind(&entry.year_awarded)
        .bind(&entry.scholarship_type)
        .bind(entry.is_dost_scholar)
        .bind(entry.is_start_member)
        .bind(&entry.remarks)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        self.get_registrant(result.last_insert_rowid()).await
    }

    async fn update(&self, id: i64, patch: RegistrantPatch) -> anyhow::Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;
        let mut touched = false;

        if let Some(status) = patch.status {
            touched |= sqlx::query("update registrants set status = ? where id = ?")
                .bind(status)
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                > 0;
        }
        if let Some(checked_in) = patch.is_checked_in {
            touched |= sqlx::query("update registrants set is_checked_in = ? where id = ?")
                .bind(checked_in)
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                > 0;
        }
        if let Some(remarks) = patch.remarks {
            touched |= sqlx::query("update registrants set remarks = ? where id = ?")
                .bind(remarks)
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                > 0;
        }

        tx.commit().await?;
        if !touched {
            Err(Error::RegistrantNotFound(id))?;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<()> {
        let result = sqlx::query("delete from registrants where id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            Err(Error::RegistrantNotFound(id))?;
        }
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Registrant>> {
        Ok(
            sqlx::query_as("select * from registrants where email = ? limit 1")
                .bind(email)
                .fetch_optional(&self.db)
                .await?,
        )
    }
}
