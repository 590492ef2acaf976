// SQLite schema definitions
// This file mirrors schema.rs but uses SQLite-compatible types

diesel::table! {
    watches (id) {
        id -> Integer,
        user_id -> Text,
        username -> Text,
        game -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    channels (id) {
        id -> Integer,
        channel_id -> Text,
        name -> Text,
        guild_id -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(watches, channels);
