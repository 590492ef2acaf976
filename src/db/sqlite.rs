use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::schema_sqlite::{channels, watches};

use super::{
    DatabaseError,
    models::{Channel, Watch},
};

// Helper function to convert DateTime to ISO string for SQLite
fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// Helper function to parse ISO string to DateTime
fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

// SQLite uses i32 for INTEGER (primary keys), but we want to keep i64 in our API
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = watches)]
struct DbWatch {
    id: i32,
    user_id: String,
    username: String,
    game: String,
    created_at: String,
    updated_at: String,
}

impl DbWatch {
    fn to_watch(&self) -> Result<Watch, DatabaseError> {
        Ok(Watch {
            id: self.id as i64,
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            game: self.game.clone(),
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = watches)]
struct NewWatch<'a> {
    user_id: &'a str,
    username: &'a str,
    game: &'a str,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = channels)]
struct DbChannel {
    id: i32,
    channel_id: String,
    name: String,
    guild_id: String,
    created_at: String,
    updated_at: String,
}

impl DbChannel {
    fn to_channel(&self) -> Result<Channel, DatabaseError> {
        Ok(Channel {
            id: self.id as i64,
            channel_id: self.channel_id.clone(),
            name: self.name.clone(),
            guild_id: self.guild_id.clone(),
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = channels)]
struct NewChannel<'a> {
    channel_id: &'a str,
    name: &'a str,
    guild_id: &'a str,
    created_at: String,
    updated_at: String,
}

fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    SqliteConnection::establish(path).map_err(|e| DatabaseError::Connection(e.to_string()))
}

fn load_watches_for_user(
    conn: &mut SqliteConnection,
    uid: &str,
) -> Result<Vec<DbWatch>, DatabaseError> {
    watches::table
        .filter(watches::user_id.eq(uid))
        .limit(2)
        .select(DbWatch::as_select())
        .load::<DbWatch>(conn)
        .map_err(|e| DatabaseError::Query(e.to_string()))
}

fn load_channels_for_id(
    conn: &mut SqliteConnection,
    cid: &str,
) -> Result<Vec<DbChannel>, DatabaseError> {
    channels::table
        .filter(channels::channel_id.eq(cid))
        .limit(2)
        .select(DbChannel::as_select())
        .load::<DbChannel>(conn)
        .map_err(|e| DatabaseError::Query(e.to_string()))
}

pub struct SqliteWatchStore {
    db_path: Arc<String>,
}

impl SqliteWatchStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::WatchStore for SqliteWatchStore {
    async fn watch(&self, user_id: &str, username: &str) -> Result<(), DatabaseError> {
        let uid = user_id.to_string();
        let name = username.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let existing: i64 = watches::table
                .filter(watches::user_id.eq(&uid))
                .count()
                .get_result(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            if existing > 0 {
                return Ok(());
            }

            let now = datetime_to_string(&Utc::now());
            let new_watch = NewWatch {
                user_id: &uid,
                username: &name,
                game: "",
                created_at: now.clone(),
                updated_at: now,
            };

            diesel::insert_into(watches::table)
                .values(&new_watch)
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn unwatch(&self, user_id: &str) -> Result<(), DatabaseError> {
        let uid = user_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            diesel::delete(watches::table.filter(watches::user_id.eq(&uid)))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn set_game(&self, user_id: &str, game: &str) -> Result<(), DatabaseError> {
        let uid = user_id.to_string();
        let game = game.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let rows = load_watches_for_user(&mut conn, &uid)?;
            match rows.len() {
                0 => Ok(()),
                1 => diesel::update(watches::table.filter(watches::user_id.eq(&uid)))
                    .set((
                        watches::game.eq(&game),
                        watches::updated_at.eq(datetime_to_string(&Utc::now())),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string())),
                _ => Err(DatabaseError::Integrity {
                    entity: "watch",
                    key: uid,
                }),
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Watch>, DatabaseError> {
        let uid = user_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let rows = load_watches_for_user(&mut conn, &uid)?;
            match rows.as_slice() {
                [] => Ok(None),
                [row] => row.to_watch().map(Some),
                _ => Err(DatabaseError::Integrity {
                    entity: "watch",
                    key: uid,
                }),
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn list_watches(&self) -> Result<Vec<Watch>, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::watches::dsl::*;
            let results = watches
                .order(id.asc())
                .select(DbWatch::as_select())
                .load::<DbWatch>(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            results.into_iter().map(|w| w.to_watch()).collect()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteChannelStore {
    db_path: Arc<String>,
}

impl SqliteChannelStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::ChannelStore for SqliteChannelStore {
    async fn upsert_channel(
        &self,
        channel_id: &str,
        name: &str,
        guild_id: &str,
    ) -> Result<(), DatabaseError> {
        let cid = channel_id.to_string();
        let channel_name = name.to_string();
        let gid = guild_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let rows = load_channels_for_id(&mut conn, &cid)?;
            let now = datetime_to_string(&Utc::now());
            match rows.len() {
                0 => {
                    let new_channel = NewChannel {
                        channel_id: &cid,
                        name: &channel_name,
                        guild_id: &gid,
                        created_at: now.clone(),
                        updated_at: now,
                    };
                    diesel::insert_into(channels::table)
                        .values(&new_channel)
                        .execute(&mut conn)
                        .map(|_| ())
                        .map_err(|e| DatabaseError::Query(e.to_string()))
                }
                1 => diesel::update(channels::table.filter(channels::channel_id.eq(&cid)))
                    .set((
                        channels::name.eq(&channel_name),
                        channels::guild_id.eq(&gid),
                        channels::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string())),
                _ => Err(DatabaseError::Integrity {
                    entity: "channel",
                    key: cid,
                }),
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), DatabaseError> {
        let cid = channel_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            diesel::delete(channels::table.filter(channels::channel_id.eq(&cid)))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<Channel>, DatabaseError> {
        let gid = guild_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema_sqlite::channels::dsl::*;
            let results = channels
                .filter(guild_id.eq(&gid))
                .order(id.asc())
                .select(DbChannel::as_select())
                .load::<DbChannel>(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            results.into_iter().map(|c| c.to_channel()).collect()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Channel>, DatabaseError> {
        let cid = channel_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let rows = load_channels_for_id(&mut conn, &cid)?;
            match rows.as_slice() {
                [] => Ok(None),
                [row] => row.to_channel().map(Some),
                _ => Err(DatabaseError::Integrity {
                    entity: "channel",
                    key: cid,
                }),
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}
