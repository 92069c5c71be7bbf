//! Profiles, mirrored from the account system.

use anyhow::{anyhow, Context as _};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use super::{push_id_list, Store, ID_CHUNK};
use crate::db::util::{excluded, is_err_unique_violation};
use crate::error::{EngineError, Result};
use crate::models::{Profile, UserId};

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    username: String,
    role: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
}

impl ProfileRow {
    fn decode(self) -> Result<Profile> {
        Ok(Profile {
            id: self.id,
            username: self.username,
            role: self
                .role
                .parse()
                .map_err(|e| EngineError::Internal(anyhow!("corrupt role column: {e}")))?,
            full_name: self.full_name,
            avatar_url: self.avatar_url,
        })
    }
}

fn decode_all(rows: Vec<ProfileRow>) -> Result<Vec<Profile>> {
    rows.into_iter().map(ProfileRow::decode).collect()
}

impl Store {
    /// Inserts or replaces a profile. A username taken by another profile is
    /// a conflict.
    #[tracing::instrument(skip_all, fields(id = %profile.id, username = %profile.username))]
    pub(crate) async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let updates = ["username", "role", "full_name", "avatar_url"]
            .map(excluded)
            .join(", ");
        let sql = format!(
            r#"
            INSERT INTO profile (id, username, role, full_name, avatar_url)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET {updates}
            "#
        );

        let result = sqlx::query(&sql)
            .bind(profile.id)
            .bind(&profile.username)
            .bind(profile.role.as_str())
            .bind(&profile.full_name)
            .bind(&profile.avatar_url)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_err_unique_violation(&e) => Err(EngineError::Conflict(format!(
                "username {:?} is taken",
                profile.username
            ))),
            Err(e) => Err(anyhow::Error::new(e).context("failed to upsert profile").into()),
        }
    }

    pub(crate) async fn profile(&self, id: UserId) -> Result<Option<Profile>> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT id, username, role, full_name, avatar_url FROM profile WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch profile")?;

        row.map(ProfileRow::decode).transpose()
    }

    pub(crate) async fn profiles_by_ids(&self, ids: &[UserId]) -> Result<Vec<Profile>> {
        let mut rows = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "SELECT id, username, role, full_name, avatar_url FROM profile WHERE id IN ",
            );
            push_id_list(&mut query, chunk);

            rows.extend(
                query
                    .build_query_as::<ProfileRow>()
                    .fetch_all(&self.pool)
                    .await
                    .context("failed to fetch profiles")?,
            );
        }

        decode_all(rows)
    }

    /// Profiles whose username is exactly one of `names`.
    pub(crate) async fn profiles_by_usernames(&self, names: &[&str]) -> Result<Vec<Profile>> {
        let mut rows = Vec::new();
        for chunk in names.chunks(ID_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "SELECT id, username, role, full_name, avatar_url FROM profile WHERE username IN (",
            );
            let mut list = query.separated(", ");
            for name in chunk {
                list.push_bind(*name);
            }
            list.push_unseparated(")");

            rows.extend(
                query
                    .build_query_as::<ProfileRow>()
                    .fetch_all(&self.pool)
                    .await
                    .context("failed to resolve usernames")?,
            );
        }

        decode_all(rows)
    }
}
