use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::ApiError;
use crate::fookie_db::entities::Session;

pub const MIN_RATING: i64 = 0;
pub const MAX_RATING: i64 = 5;

/// A session is live until `sessiontimeout` seconds have passed since it was created.
pub fn validate_session(session: &Session, config: &Config, now: DateTime<Utc>) -> bool {
    now - session.created_at <= config.session_timeout()
}

pub fn parse_rating(raw: Option<&str>) -> Result<i64, ApiError> {
    let rating: i64 = raw
        .ok_or(ApiError::BadRequest("Missing rating"))?
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Rating must be an integer"))?;

    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ApiError::BadRequest("Rating must be between 0 and 5"));
    }

    Ok(rating)
}
