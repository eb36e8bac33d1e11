//! SQLite adapter for the channel registry.
//!
//! Keeps the single `channels (server_id PRIMARY KEY, channel_id)` table so an
//! existing `database.db` keeps working.

use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use gcb_core::{
    domain::{ChannelId, GuildId},
    errors::Error,
    registry::ChannelRegistry,
    Result,
};

/// SQLite-backed channel registry.
#[derive(Clone)]
pub struct SqliteChannelRegistry {
    pool: SqlitePool,
}

impl SqliteChannelRegistry {
    /// Open (creating if missing) the database file and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(map_err)?;
        tracing::info!(path = %path.display(), "channel registry opened");
        Self::from_pool(pool).await
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:").map_err(map_err)?;
        // One connection: every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(map_err)?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    /// Create the `channels` table if it does not exist.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channels (
                server_id  INTEGER PRIMARY KEY,
                channel_id INTEGER
            )"#,
        )
        .execute(pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ChannelRegistry for SqliteChannelRegistry {
    async fn set_binding(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO channels (server_id, channel_id) VALUES (?, ?)")
            .bind(to_sql(guild_id.0)?)
            .bind(to_sql(channel_id.0)?)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn clear_binding(&self, guild_id: GuildId) -> Result<()> {
        sqlx::query("DELETE FROM channels WHERE server_id = ?")
            .bind(to_sql(guild_id.0)?)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn get_binding(&self, guild_id: GuildId) -> Result<Option<ChannelId>> {
        let row: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT channel_id FROM channels WHERE server_id = ?")
                .bind(to_sql(guild_id.0)?)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;

        match row.and_then(|(id,)| id) {
            Some(id) => Ok(Some(ChannelId(from_sql(id)?))),
            None => Ok(None),
        }
    }
}

// Discord snowflakes fit in 63 bits; SQLite integers are signed.
fn to_sql(id: u64) -> Result<i64> {
    i64::try_from(id)
        .map_err(|_| Error::Storage(format!("id {id} does not fit in an SQLite integer")))
}

fn from_sql(id: i64) -> Result<u64> {
    u64::try_from(id).map_err(|_| Error::Storage(format!("negative id {id} in channels table")))
}

fn map_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(1_234_567_890_123_456_789);

    #[tokio::test]
    async fn set_then_get() {
        let reg = SqliteChannelRegistry::in_memory().await.unwrap();
        reg.set_binding(GUILD, ChannelId(42)).await.unwrap();
        assert_eq!(reg.get_binding(GUILD).await.unwrap(), Some(ChannelId(42)));
    }

    #[tokio::test]
    async fn second_set_overwrites_first() {
        let reg = SqliteChannelRegistry::in_memory().await.unwrap();
        reg.set_binding(GUILD, ChannelId(1)).await.unwrap();
        reg.set_binding(GUILD, ChannelId(2)).await.unwrap();

        assert_eq!(reg.get_binding(GUILD).await.unwrap(), Some(ChannelId(2)));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM channels")
            .fetch_one(&reg.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn clear_unbound_guild_is_a_no_op() {
        let reg = SqliteChannelRegistry::in_memory().await.unwrap();
        reg.clear_binding(GuildId(99)).await.unwrap();
        assert_eq!(reg.get_binding(GuildId(99)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_removes_only_that_guild() {
        let reg = SqliteChannelRegistry::in_memory().await.unwrap();
        reg.set_binding(GuildId(1), ChannelId(10)).await.unwrap();
        reg.set_binding(GuildId(2), ChannelId(20)).await.unwrap();

        reg.clear_binding(GuildId(1)).await.unwrap();

        assert_eq!(reg.get_binding(GuildId(1)).await.unwrap(), None);
        assert_eq!(reg.get_binding(GuildId(2)).await.unwrap(), Some(ChannelId(20)));
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let reg = SqliteChannelRegistry::in_memory().await.unwrap();
        reg.set_binding(GUILD, ChannelId(5)).await.unwrap();

        SqliteChannelRegistry::init(&reg.pool).await.unwrap();

        assert_eq!(reg.get_binding(GUILD).await.unwrap(), Some(ChannelId(5)));
    }

    #[tokio::test]
    async fn opens_database_file() {
        let path = std::env::temp_dir().join(format!("gcb-store-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let reg = SqliteChannelRegistry::open(&path).await.unwrap();
        reg.set_binding(GUILD, ChannelId(7)).await.unwrap();
        reg.close().await;

        let reopened = SqliteChannelRegistry::open(&path).await.unwrap();
        assert_eq!(reopened.get_binding(GUILD).await.unwrap(), Some(ChannelId(7)));
        reopened.close().await;

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_ids_beyond_sqlite_range() {
        assert!(to_sql(u64::MAX).is_err());
        assert!(from_sql(-1).is_err());
    }
}
