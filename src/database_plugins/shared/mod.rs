// ABOUTME: Shared database logic for PostgreSQL and SQLite implementations
// ABOUTME: Transaction scoping and the statements both backends have in common
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// RAII transaction guard used for every insert
pub mod transactions;

/// Column list and index statements common to both schemas
pub mod schema {
    use crate::constants::schema::MESSAGES_TABLE;

    /// Columns written by `store_message`, in bind order
    pub const INSERT_COLUMNS: &str =
        "room_id, sender, message_type, content, content_length, timestamp";

    /// Columns read back by `recent_messages`
    pub const SELECT_COLUMNS: &str =
        "id, room_id, sender, message_type, content, content_length, timestamp, created_at";

    /// Non-unique lookup indexes as `(name, column)`
    pub const INDEXES: [(&str, &str); 3] = [
        ("idx_matrix_messages_room_id", "room_id"),
        ("idx_matrix_messages_sender", "sender"),
        ("idx_matrix_messages_timestamp", "timestamp"),
    ];

    /// `CREATE INDEX IF NOT EXISTS` statements for [`INDEXES`]
    #[must_use]
    pub fn index_statements() -> Vec<String> {
        INDEXES
            .iter()
            .map(|(name, column)| {
                format!("CREATE INDEX IF NOT EXISTS {name} ON {MESSAGES_TABLE}({column})")
            })
            .collect()
    }
}
