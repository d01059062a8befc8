use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE events (
                id            TEXT PRIMARY KEY,
                owner_id      TEXT NOT NULL REFERENCES users(id),
                code          TEXT NOT NULL UNIQUE,
                name          TEXT NOT NULL,
                event_date    TEXT NOT NULL,
                budget_max    INTEGER NOT NULL DEFAULT 0,
                allow_single  INTEGER NOT NULL DEFAULT 0,
                reveal_mode   TEXT NOT NULL DEFAULT 'on_date' CHECK (reveal_mode IN ('on_date', 'on_lock')),
                status        TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'locked')),
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_events_owner ON events(owner_id);

            CREATE TABLE participants (
                id          TEXT PRIMARY KEY,
                event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id),
                alias       TEXT NOT NULL DEFAULT '',
                wishlist    TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(event_id, user_id)
            );

            CREATE INDEX idx_participants_user ON participants(user_id);

            CREATE TABLE assignments (
                event_id     TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                giver_id     TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
                receiver_id  TEXT REFERENCES participants(id) ON DELETE CASCADE,
                sealed_at    TEXT,
                PRIMARY KEY (event_id, giver_id),
                UNIQUE (event_id, receiver_id),
                CHECK (receiver_id IS NULL OR receiver_id <> giver_id)
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
