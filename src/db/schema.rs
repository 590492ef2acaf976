diesel::table! {
    watches (id) {
        id -> BigInt,
        user_id -> Text,
        username -> Text,
        game -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    channels (id) {
        id -> BigInt,
        channel_id -> Text,
        name -> Text,
        guild_id -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(watches, channels);
