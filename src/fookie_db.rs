use actix::Actor;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

pub mod entities;
pub mod queries;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS cookies (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        name            VARCHAR(64) NOT NULL UNIQUE,
        img             VARCHAR(512) NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sessions (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        token           VARCHAR(8) NOT NULL UNIQUE,
        user            VARCHAR(64) NOT NULL,
        cookie_id       INTEGER NOT NULL REFERENCES cookies(id) ON DELETE CASCADE,
        created_at      DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ratings (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        value           INTEGER NOT NULL CHECK (value BETWEEN 0 AND 5),
        user            VARCHAR(64) NOT NULL,
        cookie_id       INTEGER NOT NULL REFERENCES cookies(id) ON DELETE CASCADE,
        session_id      INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        created_at      DATETIME NOT NULL,
        UNIQUE (user, session_id)
    );
";

/// Sole owner of the SQLite connection. Requests reach it as messages and are
/// served one at a time.
pub struct CookieDb {
    pub connection: Connection
}

pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

impl CookieDb {
    pub fn open(path: &str) -> rusqlite::Result<CookieDb> {
        CookieDb::migrate(Connection::open(path)?)
    }

    pub fn open_in_memory() -> rusqlite::Result<CookieDb> {
        CookieDb::migrate(Connection::open_in_memory()?)
    }

    fn migrate(connection: Connection) -> rusqlite::Result<CookieDb> {
        connection.execute_batch(SCHEMA)?;
        Ok(CookieDb { connection })
    }

    fn list_cookies(&self) -> rusqlite::Result<Vec<entities::Cookie>> {
        let mut stmt = self.connection.prepare("SELECT id, name, img FROM cookies ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(entities::Cookie { id: row.get(0)?, name: row.get(1)?, img: row.get(2)? })
        })?;
        rows.collect()
    }

    fn find_cookie(
        &self,
        query: &queries::FindCookie,
    ) -> rusqlite::Result<Option<entities::Cookie>> {
        self.connection.query_row(
            "SELECT id, name, img FROM cookies WHERE name=? LIMIT 1",
            params![query.name],
            |row| Ok(entities::Cookie { id: row.get(0)?, name: row.get(1)?, img: row.get(2)? })
        ).optional()
    }

    fn create_cookie(&self, query: &queries::CreateCookie) -> rusqlite::Result<i64> {
        let mut stmt = self.connection.prepare("INSERT INTO cookies (name, img) VALUES (?, ?)")?;
        stmt.insert(params![query.name, query.img])
    }

    fn delete_cookie(&self, query: &queries::DeleteCookie) -> rusqlite::Result<usize> {
        self.connection.execute("DELETE FROM cookies WHERE name=?", params![query.name])
    }

    fn create_session(&self, query: &queries::CreateSession) -> rusqlite::Result<i64> {
        let mut stmt = self.connection.prepare(
            "INSERT INTO sessions (token, user, cookie_id, created_at) VALUES (?, ?, ?, ?)",
        )?;
        stmt.insert(params![query.token, query.user, query.cookie_id, query.created_at])
    }

    fn lookup_session(
        &self,
        query: &queries::LookupSession,
    ) -> rusqlite::Result<Option<entities::Session>> {
        self.connection.query_row(
            "SELECT id, token, user, cookie_id, created_at FROM sessions WHERE token=? LIMIT 1",
            params![query.token],
            |row| Ok(entities::Session {
                id: row.get(0)?,
                token: row.get(1)?,
                user: row.get(2)?,
                cookie_id: row.get(3)?,
                created_at: row.get(4)?,
            })
        ).optional()
    }

    fn count_sessions(&self) -> rusqlite::Result<i64> {
        self.connection.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
    }

    fn find_rating(
        &self,
        query: &queries::FindRating,
    ) -> rusqlite::Result<Option<entities::Rating>> {
        self.connection.query_row(
            "SELECT id, value, user, cookie_id, session_id, created_at
             FROM ratings WHERE user=? AND session_id=? LIMIT 1",
            params![query.user, query.session_id],
            |row| Ok(entities::Rating {
                id: row.get(0)?,
                value: row.get(1)?,
                user: row.get(2)?,
                cookie_id: row.get(3)?,
                session_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        ).optional()
    }

    fn create_rating(&self, query: &queries::CreateRating) -> rusqlite::Result<i64> {
        let mut stmt = self.connection.prepare(
            "INSERT INTO ratings (value, user, cookie_id, session_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )?;
        stmt.insert(params![
            query.value,
            query.user,
            query.cookie_id,
            query.session_id,
            query.created_at
        ])
    }

    fn cookie_stats(
        &self,
        query: &queries::CookieStats,
    ) -> rusqlite::Result<Option<entities::Stats>> {
        self.connection.query_row(
            "SELECT c.id, c.name, c.img, COUNT(r.id), AVG(r.value)
             FROM cookies c LEFT JOIN ratings r ON r.cookie_id = c.id
             WHERE c.id=? GROUP BY c.id",
            params![query.cookie_id],
            parse_stats
        ).optional()
    }

    fn session_stats(
        &self,
        query: &queries::SessionStats,
    ) -> rusqlite::Result<Option<entities::Stats>> {
        self.connection.query_row(
            "SELECT c.id, c.name, c.img, COUNT(r.id), AVG(r.value)
             FROM sessions s
             JOIN cookies c ON c.id = s.cookie_id
             LEFT JOIN ratings r ON r.session_id = s.id
             WHERE s.token=? GROUP BY s.id",
            params![query.token],
            parse_stats
        ).optional()
    }
}

fn parse_stats(row: &rusqlite::Row) -> rusqlite::Result<entities::Stats> {
    Ok(entities::Stats {
        cookie: entities::Cookie { id: row.get(0)?, name: row.get(1)?, img: row.get(2)? },
        count: row.get(3)?,
        average: row.get(4)?,
    })
}

impl actix::Message for queries::ListCookies {
    type Result = rusqlite::Result<Vec<entities::Cookie>>;
}

impl actix::Message for queries::FindCookie {
    type Result = rusqlite::Result<Option<entities::Cookie>>;
}

impl actix::Message for queries::CreateCookie {
    type Result = rusqlite::Result<i64>;
}

impl actix::Message for queries::DeleteCookie {
    type Result = rusqlite::Result<usize>;
}

impl actix::Message for queries::CreateSession {
    type Result = rusqlite::Result<i64>;
}

impl actix::Message for queries::LookupSession {
    type Result = rusqlite::Result<Option<entities::Session>>;
}

impl actix::Message for queries::CountSessions {
    type Result = rusqlite::Result<i64>;
}

impl actix::Message for queries::FindRating {
    type Result = rusqlite::Result<Option<entities::Rating>>;
}

impl actix::Message for queries::CreateRating {
    type Result = rusqlite::Result<i64>;
}

impl actix::Message for queries::CookieStats {
    type Result = rusqlite::Result<Option<entities::Stats>>;
}

impl actix::Message for queries::SessionStats {
    type Result = rusqlite::Result<Option<entities::Stats>>;
}

impl Actor for CookieDb {
    type Context = actix::prelude::Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Connected to the database!")
    }
}

impl actix::Handler<queries::ListCookies> for CookieDb {
    type Result = rusqlite::Result<Vec<entities::Cookie>>;

    fn handle(
        &mut self,
        _msg: queries::ListCookies,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.list_cookies()
    }
}

impl actix::Handler<queries::FindCookie> for CookieDb {
    type Result = rusqlite::Result<Option<entities::Cookie>>;

    fn handle(
        &mut self,
        msg: queries::FindCookie,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.find_cookie(&msg)
    }
}

impl actix::Handler<queries::CreateCookie> for CookieDb {
    type Result = rusqlite::Result<i64>;

    fn handle(
        &mut self,
        msg: queries::CreateCookie,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        tracing::debug!("Creating cookie {:?}", msg.name);
        self.create_cookie(&msg)
    }
}

impl actix::Handler<queries::DeleteCookie> for CookieDb {
    type Result = rusqlite::Result<usize>;

    fn handle(
        &mut self,
        msg: queries::DeleteCookie,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        tracing::debug!("Deleting cookie {:?}", msg.name);
        self.delete_cookie(&msg)
    }
}

impl actix::Handler<queries::CreateSession> for CookieDb {
    type Result = rusqlite::Result<i64>;

    fn handle(
        &mut self,
        msg: queries::CreateSession,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.create_session(&msg)
    }
}

impl actix::Handler<queries::LookupSession> for CookieDb {
    type Result = rusqlite::Result<Option<entities::Session>>;

    fn handle(
        &mut self,
        msg: queries::LookupSession,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.lookup_session(&msg)
    }
}

impl actix::Handler<queries::CountSessions> for CookieDb {
    type Result = rusqlite::Result<i64>;

    fn handle(
        &mut self,
        _msg: queries::CountSessions,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.count_sessions()
    }
}

impl actix::Handler<queries::FindRating> for CookieDb {
    type Result = rusqlite::Result<Option<entities::Rating>>;

    fn handle(
        &mut self,
        msg: queries::FindRating,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.find_rating(&msg)
    }
}

impl actix::Handler<queries::CreateRating> for CookieDb {
    type Result = rusqlite::Result<i64>;

    fn handle(
        &mut self,
        msg: queries::CreateRating,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.create_rating(&msg)
    }
}

impl actix::Handler<queries::CookieStats> for CookieDb {
    type Result = rusqlite::Result<Option<entities::Stats>>;

    fn handle(
        &mut self,
        msg: queries::CookieStats,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.cookie_stats(&msg)
    }
}

impl actix::Handler<queries::SessionStats> for CookieDb {
    type Result = rusqlite::Result<Option<entities::Stats>>;

    fn handle(
        &mut self,
        msg: queries::SessionStats,
        _ctx: &mut actix::prelude::Context<Self>,
    ) -> Self::Result {
        self.session_stats(&msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn seeded() -> (CookieDb, i64) {
        let db = CookieDb::open_in_memory().unwrap();
        let id = db
            .create_cookie(&queries::CreateCookie {
                name: "speculaas".to_string(),
                img: "http://img/s.jpg".to_string(),
            })
            .unwrap();
        (db, id)
    }

    fn session(db: &CookieDb, token: &str, cookie_id: i64) -> i64 {
        db.create_session(&queries::CreateSession {
            token: token.to_string(),
            user: "frank".to_string(),
            cookie_id,
            created_at: Utc::now(),
        }).unwrap()
    }

    fn rate(
        db: &CookieDb,
        user: &str,
        value: i64,
        cookie_id: i64,
        session_id: i64,
    ) -> rusqlite::Result<i64> {
        db.create_rating(&queries::CreateRating {
            value,
            user: user.to_string(),
            cookie_id,
            session_id,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn cookie_names_are_unique() {
        let (db, _) = seeded();
        let duplicate =
            queries::CreateCookie { name: "speculaas".to_string(), img: "x".to_string() };
        let err = db.create_cookie(&duplicate).unwrap_err();

        assert!(is_constraint_violation(&err));
        assert_eq!(db.list_cookies().unwrap().len(), 1);
    }

    #[test]
    fn session_tokens_are_unique() {
        let (db, id) = seeded();
        session(&db, "deadbeef", id);
        let err = db.create_session(&queries::CreateSession {
            token: "deadbeef".to_string(),
            user: "anna".to_string(),
            cookie_id: id,
            created_at: Utc::now(),
        }).unwrap_err();

        assert!(is_constraint_violation(&err));
        assert_eq!(db.count_sessions().unwrap(), 1);
    }

    #[test]
    fn sessions_round_trip_their_timestamp() {
        let (db, id) = seeded();
        let created_at = Utc::now() - chrono::Duration::hours(2);
        db.create_session(&queries::CreateSession {
            token: "0badf00d".to_string(),
            user: "anna".to_string(),
            cookie_id: id,
            created_at,
        })
        .unwrap();

        let lookup = |token: &str| {
            db.lookup_session(&queries::LookupSession { token: token.to_string() }).unwrap()
        };
        let found = lookup("0badf00d").unwrap();
        assert_eq!(found.cookie_id, id);
        assert_eq!(found.user, "anna");
        assert_eq!(found.created_at, created_at);
        assert!(lookup("ffffffff").is_none());
    }

    #[test]
    fn ratings_out_of_range_or_repeated_are_rejected() {
        let (db, id) = seeded();
        let session_id = session(&db, "deadbeef", id);

        assert!(is_constraint_violation(&rate(&db, "frank", 6, id, session_id).unwrap_err()));
        assert!(is_constraint_violation(&rate(&db, "frank", -1, id, session_id).unwrap_err()));
        rate(&db, "frank", 4, id, session_id).unwrap();
        assert!(is_constraint_violation(&rate(&db, "frank", 2, id, session_id).unwrap_err()));
        rate(&db, "anna", 2, id, session_id).unwrap();

        let found = db
            .find_rating(&queries::FindRating { user: "frank".to_string(), session_id })
            .unwrap()
            .unwrap();
        assert_eq!(found.value, 4);
        assert_eq!(found.session_id, session_id);
    }

    #[test]
    fn stats_aggregate_per_cookie_and_per_session() {
        let (db, id) = seeded();
        let first = session(&db, "11111111", id);
        let second = session(&db, "22222222", id);
        rate(&db, "frank", 5, id, first).unwrap();
        rate(&db, "anna", 2, id, first).unwrap();
        rate(&db, "frank", 2, id, second).unwrap();

        let stats = db.cookie_stats(&queries::CookieStats { cookie_id: id }).unwrap().unwrap();
        assert_eq!(stats.cookie.name, "speculaas");
        assert_eq!(stats.count, 3);
        assert_eq!(stats.average, Some(3.0));

        let session_stats = |token: &str| {
            db.session_stats(&queries::SessionStats { token: token.to_string() }).unwrap()
        };
        let stats = session_stats("11111111").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.average, Some(3.5));

        assert!(db.cookie_stats(&queries::CookieStats { cookie_id: id + 1 }).unwrap().is_none());
        assert!(session_stats("33333333").is_none());
    }

    #[test]
    fn unrated_cookie_has_no_average() {
        let (db, id) = seeded();
        let stats = db.cookie_stats(&queries::CookieStats { cookie_id: id }).unwrap().unwrap();

        assert_eq!(stats.count, 0);
        assert_eq!(stats.average, None);
    }

    #[test]
    fn deleting_a_cookie_cascades() {
        let (db, id) = seeded();
        let session_id = session(&db, "deadbeef", id);
        rate(&db, "frank", 3, id, session_id).unwrap();

        let delete = queries::DeleteCookie { name: "speculaas".to_string() };
        assert_eq!(db.delete_cookie(&delete).unwrap(), 1);
        assert_eq!(db.delete_cookie(&delete).unwrap(), 0);
        assert_eq!(db.count_sessions().unwrap(), 0);
        let rating = queries::FindRating { user: "frank".to_string(), session_id };
        assert!(db.find_rating(&rating).unwrap().is_none());
    }
}
