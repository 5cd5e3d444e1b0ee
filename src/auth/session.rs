use rand::Rng;
use rusqlite::params;

use crate::blog::domain::UserId;
use crate::error::AppResult;
use crate::state::DbPool;

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: UserId, hours: u64) -> AppResult<String> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id.0, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Cookie carrying a fresh session token.
pub fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name,
        token,
        max_age_hours * 3600
    )
}

pub fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn session_lifecycle() {
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES ('leo', 'x', '2024-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();
        let user_id = UserId(conn.last_insert_rowid());
        drop(conn);

        let token = create_session(&pool, user_id, 1).unwrap();
        let count = |pool: &DbPool| -> i64 {
            pool.get()
                .unwrap()
                .query_row("SELECT COUNT(*) FROM sessions WHERE token = ?1", params![token], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(count(&pool), 1);

        delete_session(&pool, &token).unwrap();
        assert_eq!(count(&pool), 0);
    }

    #[test]
    fn cookies_carry_name_and_lifetime() {
        assert_eq!(
            session_cookie("yatube_session", "tok", 2),
            "yatube_session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=7200"
        );
        assert!(clear_session_cookie("yatube_session").contains("Max-Age=0"));
    }
}
