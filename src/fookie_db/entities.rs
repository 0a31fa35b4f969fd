use chrono;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cookie {
    pub id: i64,
    pub name: String,
    pub img: String,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: i64,
    pub token: String,
    pub user: String,
    pub cookie_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug)]
pub struct Rating {
    pub id: i64,
    pub value: i64,
    pub user: String,
    pub cookie_id: i64,
    pub session_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stats {
    pub cookie: Cookie,
    pub count: i64,
    pub average: Option<f64>,
}
