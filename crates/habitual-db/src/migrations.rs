use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 3;

pub fn run(conn: &Connection) -> Result<()> {
    migrate(conn, LATEST_VERSION)?;
    info!("Database migrations complete");
    Ok(())
}

/// Apply every migration up to and including `target`.
fn migrate(conn: &Connection, target: i64) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version = current_version(conn)?;

    if version < 1 && target >= 1 {
        info!("Running migration v1 (users, habits)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                TEXT PRIMARY KEY,
                username          TEXT NOT NULL UNIQUE,
                telegram_chat_id  INTEGER UNIQUE,
                created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            );

            CREATE TABLE habits (
                id                TEXT PRIMARY KEY,
                user_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                place             TEXT NOT NULL,
                time_of_day       TEXT NOT NULL,
                action            TEXT NOT NULL,
                is_pleasant       INTEGER NOT NULL DEFAULT 0,
                related_habit_id  TEXT REFERENCES habits(id) ON DELETE SET NULL,
                periodicity_days  INTEGER NOT NULL DEFAULT 1
                                  CHECK (periodicity_days BETWEEN 1 AND 7),
                reward            TEXT NOT NULL DEFAULT '',
                duration_seconds  INTEGER NOT NULL
                                  CHECK (duration_seconds BETWEEN 0 AND 120),
                is_public         INTEGER NOT NULL DEFAULT 0,
                created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
                updated_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            );

            CREATE INDEX idx_habits_user ON habits(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 && target >= 2 {
        info!("Running migration v2 (reminder delivery marker)");
        conn.execute_batch(
            "
            ALTER TABLE habits ADD COLUMN last_served_at TEXT;

            CREATE INDEX idx_habits_time_of_day ON habits(time_of_day);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    // The slot filter matches time_of_day as text and the marker write compares
    // last_served_at as text, so both columns must hold one canonical spelling.
    if version < 3 && target >= 3 {
        info!("Running migration v3 (canonical time_of_day and last_served_at)");
        conn.execute_batch(
            "
            UPDATE habits SET time_of_day = '0' || time_of_day
             WHERE time_of_day GLOB '[0-9]:[0-5][0-9]';

            UPDATE habits SET last_served_at = strftime('%Y-%m-%dT%H:%M:%SZ', last_served_at)
             WHERE last_served_at IS NOT NULL
               AND strftime('%Y-%m-%dT%H:%M:%SZ', last_served_at) IS NOT NULL;

            CREATE TRIGGER habits_canonical_insert BEFORE INSERT ON habits
            WHEN NEW.time_of_day NOT GLOB '[0-2][0-9]:[0-5][0-9]'
              OR (NEW.last_served_at IS NOT NULL AND NEW.last_served_at NOT GLOB
                  '[0-9][0-9][0-9][0-9]-[0-1][0-9]-[0-3][0-9]T[0-2][0-9]:[0-5][0-9]:[0-5][0-9]Z')
            BEGIN
                SELECT RAISE(ABORT, 'habits: time_of_day must be HH:MM and last_served_at UTC with Z');
            END;

            CREATE TRIGGER habits_canonical_update BEFORE UPDATE OF time_of_day, last_served_at ON habits
            WHEN NEW.time_of_day NOT GLOB '[0-2][0-9]:[0-5][0-9]'
              OR (NEW.last_served_at IS NOT NULL AND NEW.last_served_at NOT GLOB
                  '[0-9][0-9][0-9][0-9]-[0-1][0-9]-[0-3][0-9]T[0-2][0-9]:[0-5][0-9]:[0-5][0-9]Z')
            BEGIN
                SELECT RAISE(ABORT, 'habits: time_of_day must be HH:MM and last_served_at UTC with Z');
            END;

            INSERT INTO schema_version (version) VALUES (3);
            ",
        )?;
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<i64> {
    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;
    Ok(version)
}
