use crate::config::DatabaseConfig;
use crate::db::{ChannelStore, DatabaseError, WatchStore};
use std::sync::Arc;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
use diesel::RunQueryDsl;

#[cfg(feature = "postgres")]
use crate::db::postgres::{PostgresChannelStore, PostgresWatchStore};
#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;
#[cfg(feature = "postgres")]
use diesel::r2d2::{self, ConnectionManager};

#[cfg(feature = "postgres")]
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::{SqliteChannelStore, SqliteWatchStore};
#[cfg(feature = "sqlite")]
use diesel::Connection;
#[cfg(feature = "sqlite")]
use diesel::sqlite::SqliteConnection;

#[derive(Clone)]
pub struct DatabaseManager {
    #[cfg(feature = "postgres")]
    postgres_pool: Option<Pool>,
    #[cfg(feature = "sqlite")]
    sqlite_path: Option<String>,
    watch_store: Arc<dyn WatchStore>,
    channel_store: Arc<dyn ChannelStore>,
    db_type: DbType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
}

impl From<crate::config::DbType> for DbType {
    fn from(value: crate::config::DbType) -> Self {
        match value {
            crate::config::DbType::Postgres => DbType::Postgres,
            crate::config::DbType::Sqlite => DbType::Sqlite,
        }
    }
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let db_type = DbType::from(config.db_type());

        match db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let connection_string = config.connection_string();
                let max_connections = config.max_connections();
                let min_connections = config.min_connections();

                let manager = ConnectionManager::<PgConnection>::new(connection_string);

                let builder = r2d2::Pool::builder()
                    .max_size(max_connections.unwrap_or(10))
                    .min_idle(Some(min_connections.unwrap_or(1)));

                let pool = builder
                    .build(manager)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;

                let watch_store = Arc::new(PostgresWatchStore::new(pool.clone()));
                let channel_store = Arc::new(PostgresChannelStore::new(pool.clone()));

                Ok(Self {
                    postgres_pool: Some(pool),
                    #[cfg(feature = "sqlite")]
                    sqlite_path: None,
                    watch_store,
                    channel_store,
                    db_type,
                })
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = config
                    .sqlite_path()
                    .ok_or_else(|| DatabaseError::Connection("no sqlite path".to_string()))?;
                let path_arc = Arc::new(path.clone());

                let watch_store = Arc::new(SqliteWatchStore::new(path_arc.clone()));
                let channel_store = Arc::new(SqliteChannelStore::new(path_arc));

                Ok(Self {
                    #[cfg(feature = "postgres")]
                    postgres_pool: None,
                    sqlite_path: Some(path),
                    watch_store,
                    channel_store,
                    db_type,
                })
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Connection(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Connection(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        match self.db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let pool = match self.postgres_pool.as_ref() {
                    Some(pool) => pool,
                    None => {
                        return Err(DatabaseError::Migration(
                            "postgres pool not initialized".to_string(),
                        ));
                    }
                };
                Self::migrate_postgres(pool).await
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = match self.sqlite_path.as_ref() {
                    Some(path) => path,
                    None => {
                        return Err(DatabaseError::Migration(
                            "sqlite path not initialized".to_string(),
                        ));
                    }
                };
                Self::migrate_sqlite(path).await
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Migration(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Migration(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    #[cfg(feature = "postgres")]
    async fn migrate_postgres(pool: &Pool) -> Result<(), DatabaseError> {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS watches (
                    id BIGSERIAL PRIMARY KEY,
                    user_id TEXT NOT NULL UNIQUE,
                    username TEXT NOT NULL,
                    game TEXT NOT NULL DEFAULT '',
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS channels (
                    id BIGSERIAL PRIMARY KEY,
                    channel_id TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    guild_id TEXT NOT NULL,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_watches_user_id ON watches(user_id)",
                "CREATE INDEX IF NOT EXISTS idx_channels_channel_id ON channels(channel_id)",
                "CREATE INDEX IF NOT EXISTS idx_channels_guild_id ON channels(guild_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    #[cfg(feature = "sqlite")]
    async fn migrate_sqlite(path: &str) -> Result<(), DatabaseError> {
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = SqliteConnection::establish(&path)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS watches (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL UNIQUE,
                    username TEXT NOT NULL,
                    game TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS channels (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    channel_id TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    guild_id TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_watches_user_id ON watches(user_id)",
                "CREATE INDEX IF NOT EXISTS idx_channels_channel_id ON channels(channel_id)",
                "CREATE INDEX IF NOT EXISTS idx_channels_guild_id ON channels(guild_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    pub fn watch_store(&self) -> Arc<dyn WatchStore> {
        self.watch_store.clone()
    }

    pub fn channel_store(&self) -> Arc<dyn ChannelStore> {
        self.channel_store.clone()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::DatabaseManager;
    use crate::config::DatabaseConfig;

    async fn open_manager(db_path: &str) -> DatabaseManager {
        let config = DatabaseConfig {
            url: None,
            filename: Some(db_path.to_string()),
            max_connections: Some(1),
            min_connections: Some(1),
        };

        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");
        manager
    }

    #[tokio::test]
    async fn watch_then_unwatch_leaves_no_record() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = open_manager(&file.path().to_string_lossy()).await;
        let watches = manager.watch_store();

        watches.watch("100", "alice").await.expect("watch");
        assert!(
            watches
                .find_by_user_id("100")
                .await
                .expect("find")
                .is_some()
        );

        watches.unwatch("100").await.expect("unwatch");
        assert!(
            watches
                .find_by_user_id("100")
                .await
                .expect("find after unwatch")
                .is_none()
        );
    }

    #[tokio::test]
    async fn watch_is_idempotent_and_preserves_game() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = open_manager(&file.path().to_string_lossy()).await;
        let watches = manager.watch_store();

        watches.watch("100", "alice").await.expect("watch");
        watches.set_game("100", "Chess").await.expect("set_game");
        watches.watch("100", "alice").await.expect("watch again");

        let all = watches.list_watches().await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].game, "Chess");
        assert_eq!(all[0].username, "alice");
    }

    #[tokio::test]
    async fn set_game_on_unwatched_user_is_noop() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = open_manager(&file.path().to_string_lossy()).await;
        let watches = manager.watch_store();

        watches.set_game("999", "Chess").await.expect("set_game");
        assert!(
            watches
                .find_by_user_id("999")
                .await
                .expect("find")
                .is_none()
        );
    }

    #[tokio::test]
    async fn new_watch_starts_with_empty_game() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = open_manager(&file.path().to_string_lossy()).await;
        let watches = manager.watch_store();

        watches.watch("100", "alice").await.expect("watch");
        let watch = watches
            .find_by_user_id("100")
            .await
            .expect("find")
            .expect("record exists");
        assert_eq!(watch.game, "");
    }

    #[tokio::test]
    async fn upsert_overwrites_without_duplicating() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = open_manager(&file.path().to_string_lossy()).await;
        let channels = manager.channel_store();

        channels
            .upsert_channel("c1", "Chess", "g1")
            .await
            .expect("insert");
        channels
            .upsert_channel("c1", "Checkers", "g2")
            .await
            .expect("update");

        let channel = channels
            .find_by_channel_id("c1")
            .await
            .expect("find")
            .expect("channel exists");
        assert_eq!(channel.name, "Checkers");
        assert_eq!(channel.guild_id, "g2");

        assert_eq!(channels.list_by_guild("g2").await.expect("list").len(), 1);
        assert!(channels.list_by_guild("g1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn create_then_delete_leaves_no_record() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = open_manager(&file.path().to_string_lossy()).await;
        let channels = manager.channel_store();

        channels
            .upsert_channel("c1", "Chess", "g1")
            .await
            .expect("insert");
        channels.delete_channel("c1").await.expect("delete");

        assert!(
            channels
                .find_by_channel_id("c1")
                .await
                .expect("find")
                .is_none()
        );

        // deleting again is a no-op, not an error
        channels.delete_channel("c1").await.expect("delete again");
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let db_path = file.path().to_string_lossy().to_string();

        {
            let manager = open_manager(&db_path).await;
            manager
                .watch_store()
                .watch("100", "alice")
                .await
                .expect("watch");
            manager
                .watch_store()
                .set_game("100", "Chess")
                .await
                .expect("set_game");
            manager
                .channel_store()
                .upsert_channel("c1", "Chess", "g1")
                .await
                .expect("upsert");
        }

        let reopened = open_manager(&db_path).await;
        let watch = reopened
            .watch_store()
            .find_by_user_id("100")
            .await
            .expect("find")
            .expect("watch persisted");
        assert_eq!(watch.game, "Chess");

        let channel = reopened
            .channel_store()
            .find_by_channel_id("c1")
            .await
            .expect("find")
            .expect("channel persisted");
        assert_eq!(channel.name, "Chess");
    }

    #[tokio::test]
    async fn list_watches_returns_insertion_order() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = open_manager(&file.path().to_string_lossy()).await;
        let watches = manager.watch_store();

        watches.watch("100", "alice").await.expect("watch alice");
        watches.watch("200", "bob").await.expect("watch bob");

        let all = watches.list_watches().await.expect("list");
        let names: Vec<&str> = all.iter().map(|w| w.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }
}
