use std::sync::Arc;

use crate::config::Config;
use crate::error::ApiError;
use crate::fookie_db::CookieDb;
use crate::fookie_http::ImageValidator;
use crate::reports::ReportProvider;
use crate::token::TokenSource;

pub struct GlobalState {
    pub cookie_db_addr: actix::prelude::Addr<CookieDb>,
    pub config: Arc<Config>,
    pub image_validator: Arc<dyn ImageValidator>,
    pub report_provider: Option<Arc<dyn ReportProvider>>,
    pub token_source: Arc<dyn TokenSource>,
}

impl GlobalState {
    pub async fn query<M, T>(&self, msg: M) -> Result<T, ApiError>
    where
        M: actix::Message<Result = rusqlite::Result<T>> + Send + 'static,
        T: Send + 'static,
        CookieDb: actix::Handler<M>,
        <CookieDb as actix::Actor>::Context: actix::dev::ToEnvelope<CookieDb, M>,
    {
        Ok(self.cookie_db_addr.send(msg).await??)
    }
}
