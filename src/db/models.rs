use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user who has opted into automatic voice routing. The existence of
/// the record is what "being watched" means; there is no separate flag.
/// `game` holds the last activity name seen for the user, empty when
/// they are not playing anything we know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watch {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub game: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A voice channel known to the directory. Channels are matched to
/// games by exact equality on `name`; only voice channels are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub channel_id: String,
    pub name: String,
    pub guild_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
