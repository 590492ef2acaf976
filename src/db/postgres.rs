use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::schema::{channels, watches};

use super::{
    DatabaseError,
    models::{Channel, Watch},
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = watches)]
struct DbWatch {
    id: i64,
    user_id: String,
    username: String,
    game: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbWatch> for Watch {
    fn from(value: DbWatch) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            username: value.username,
            game: value.game,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = watches)]
struct NewWatch<'a> {
    user_id: &'a str,
    username: &'a str,
    game: &'a str,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = channels)]
struct DbChannel {
    id: i64,
    channel_id: String,
    name: String,
    guild_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbChannel> for Channel {
    fn from(value: DbChannel) -> Self {
        Self {
            id: value.id,
            channel_id: value.channel_id,
            name: value.name,
            guild_id: value.guild_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = channels)]
struct NewChannel<'a> {
    channel_id: &'a str,
    name: &'a str,
    guild_id: &'a str,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

async fn with_connection<T, F>(pool: Pool, operation: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        operation(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

fn load_watches_for_user(conn: &mut PgConnection, uid: &str) -> Result<Vec<DbWatch>, DatabaseError> {
    watches::table
        .filter(watches::user_id.eq(uid))
        .limit(2)
        .select(DbWatch::as_select())
        .load::<DbWatch>(conn)
        .map_err(|e| DatabaseError::Query(e.to_string()))
}

fn load_channels_for_id(
    conn: &mut PgConnection,
    cid: &str,
) -> Result<Vec<DbChannel>, DatabaseError> {
    channels::table
        .filter(channels::channel_id.eq(cid))
        .limit(2)
        .select(DbChannel::as_select())
        .load::<DbChannel>(conn)
        .map_err(|e| DatabaseError::Query(e.to_string()))
}

pub struct PostgresWatchStore {
    pool: Pool,
}

impl PostgresWatchStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::WatchStore for PostgresWatchStore {
    async fn watch(&self, user_id: &str, username: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let uid = user_id.to_string();
        let name = username.to_string();
        with_connection(pool, move |conn| {
            let existing: i64 = watches::table
                .filter(watches::user_id.eq(&uid))
                .count()
                .get_result(conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            if existing > 0 {
                return Ok(());
            }

            let now = Utc::now();
            let new_watch = NewWatch {
                user_id: &uid,
                username: &name,
                game: "",
                created_at: &now,
                updated_at: &now,
            };

            diesel::insert_into(watches::table)
                .values(&new_watch)
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn unwatch(&self, user_id: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let uid = user_id.to_string();
        with_connection(pool, move |conn| {
            diesel::delete(watches::table.filter(watches::user_id.eq(&uid)))
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn set_game(&self, user_id: &str, game: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let uid = user_id.to_string();
        let game = game.to_string();
        with_connection(pool, move |conn| {
            let rows = load_watches_for_user(conn, &uid)?;
            match rows.len() {
                0 => Ok(()),
                1 => diesel::update(watches::table.filter(watches::user_id.eq(&uid)))
                    .set((watches::game.eq(&game), watches::updated_at.eq(Utc::now())))
                    .execute(conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string())),
                _ => Err(DatabaseError::Integrity {
                    entity: "watch",
                    key: uid,
                }),
            }
        })
        .await
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Watch>, DatabaseError> {
        let pool = self.pool.clone();
        let uid = user_id.to_string();
        with_connection(pool, move |conn| {
            let mut rows = load_watches_for_user(conn, &uid)?;
            match rows.len() {
                0 => Ok(None),
                1 => Ok(Some(rows.remove(0).into())),
                _ => Err(DatabaseError::Integrity {
                    entity: "watch",
                    key: uid,
                }),
            }
        })
        .await
    }

    async fn list_watches(&self) -> Result<Vec<Watch>, DatabaseError> {
        let pool = self.pool.clone();
        with_connection(pool, move |conn| {
            use crate::db::schema::watches::dsl::*;
            watches
                .order(id.asc())
                .select(DbWatch::as_select())
                .load::<DbWatch>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }
}

pub struct PostgresChannelStore {
    pool: Pool,
}

impl PostgresChannelStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::ChannelStore for PostgresChannelStore {
    async fn upsert_channel(
        &self,
        channel_id: &str,
        name: &str,
        guild_id: &str,
    ) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let cid = channel_id.to_string();
        let channel_name = name.to_string();
        let gid = guild_id.to_string();
        with_connection(pool, move |conn| {
            let rows = load_channels_for_id(conn, &cid)?;
            let now = Utc::now();
            match rows.len() {
                0 => {
                    let new_channel = NewChannel {
                        channel_id: &cid,
                        name: &channel_name,
                        guild_id: &gid,
                        created_at: &now,
                        updated_at: &now,
                    };
                    diesel::insert_into(channels::table)
                        .values(&new_channel)
                        .execute(conn)
                        .map(|_| ())
                        .map_err(|e| DatabaseError::Query(e.to_string()))
                }
                1 => diesel::update(channels::table.filter(channels::channel_id.eq(&cid)))
                    .set((
                        channels::name.eq(&channel_name),
                        channels::guild_id.eq(&gid),
                        channels::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string())),
                _ => Err(DatabaseError::Integrity {
                    entity: "channel",
                    key: cid,
                }),
            }
        })
        .await
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        let cid = channel_id.to_string();
        with_connection(pool, move |conn| {
            diesel::delete(channels::table.filter(channels::channel_id.eq(&cid)))
                .execute(conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<Channel>, DatabaseError> {
        let pool = self.pool.clone();
        let gid = guild_id.to_string();
        with_connection(pool, move |conn| {
            use crate::db::schema::channels::dsl::*;
            channels
                .filter(guild_id.eq(&gid))
                .order(id.asc())
                .select(DbChannel::as_select())
                .load::<DbChannel>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
    }

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Channel>, DatabaseError> {
        let pool = self.pool.clone();
        let cid = channel_id.to_string();
        with_connection(pool, move |conn| {
            let mut rows = load_channels_for_id(conn, &cid)?;
            match rows.len() {
                0 => Ok(None),
                1 => Ok(Some(rows.remove(0).into())),
                _ => Err(DatabaseError::Integrity {
                    entity: "channel",
                    key: cid,
                }),
            }
        })
        .await
    }
}
