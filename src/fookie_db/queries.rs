use chrono;

pub struct ListCookies;

pub struct FindCookie {
    pub name: String,
}

pub struct CreateCookie {
    pub name: String,
    pub img: String,
}

pub struct DeleteCookie {
    pub name: String,
}

pub struct CreateSession {
    pub token: String,
    pub user: String,
    pub cookie_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct LookupSession {
    pub token: String,
}

pub struct CountSessions;

pub struct FindRating {
    pub user: String,
    pub session_id: i64,
}

pub struct CreateRating {
    pub value: i64,
    pub user: String,
    pub cookie_id: i64,
    pub session_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct CookieStats {
    pub cookie_id: i64,
}

pub struct SessionStats {
    pub token: String,
}
