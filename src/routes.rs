use actix_web::http::header::LOCATION;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::authentication::{Admin, User};
use crate::error::ApiError;
use crate::fookie::GlobalState;
use crate::fookie_db::{is_constraint_violation, queries};
use crate::reports::ReportError;
use crate::{token, validation};

const TOKEN_ATTEMPTS: usize = 3;

#[derive(Deserialize)]
pub struct CookieForm {
    name: Option<String>,
    img: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteForm {
    name: Option<String>,
}

#[derive(Deserialize)]
pub struct RatingForm {
    rating: Option<String>,
}

#[derive(Serialize)]
pub struct EndpointDoc {
    path: &'static str,
    method: &'static str,
    auth: &'static str,
    description: &'static str,
}

const ENDPOINTS: &[EndpointDoc] = &[
    EndpointDoc {
        path: "/cookies/",
        method: "GET",
        auth: "none",
        description: "List all cookies",
    },
    EndpointDoc {
        path: "/cookies/list/",
        method: "GET",
        auth: "none",
        description: "List all cookies",
    },
    EndpointDoc {
        path: "/cookies/suggest/",
        method: "GET",
        auth: "user",
        description: "Suggest a random cookie and open a rating session",
    },
    EndpointDoc {
        path: "/cookies/add/",
        method: "PUT",
        auth: "admin",
        description: "Add a cookie from form fields name and img",
    },
    EndpointDoc {
        path: "/cookies/",
        method: "DELETE",
        auth: "admin",
        description: "Delete the cookie named by form field name",
    },
    EndpointDoc {
        path: "/cookies/rate/<token>/",
        method: "PUT",
        auth: "user",
        description: "Rate the session's cookie 0-5 with form field rating",
    },
    EndpointDoc {
        path: "/cookies/<id>/stats/",
        method: "GET",
        auth: "user",
        description: "Rating count and average for a cookie",
    },
    EndpointDoc {
        path: "/session/<token>/stats/",
        method: "GET",
        auth: "user",
        description: "Rating count and average within a session",
    },
    EndpointDoc {
        path: "/docs/",
        method: "GET",
        auth: "none",
        description: "This endpoint list",
    },
    EndpointDoc {
        path: "/admin/traffic/<key>/",
        method: "GET",
        auth: "admin key in path",
        description: "Redirect to a freshly generated traffic report",
    },
];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .service(
            web::resource("/cookies/")
                .route(web::get().to(list_cookies))
                .route(web::delete().to(delete_cookie)),
        )
        .route("/cookies/list/", web::get().to(list_cookies))
        .route("/cookies/suggest/", web::get().to(suggest_cookie))
        .route("/cookies/add/", web::put().to(add_cookie))
        .route("/cookies/rate/{token}/", web::put().to(rate_cookie))
        .route("/cookies/{id}/stats/", web::get().to(cookie_stats))
        .route("/session/{token}/stats/", web::get().to(session_stats))
        .route("/docs/", web::get().to(docs))
        .route("/admin/traffic/{key}/", web::get().to(traffic_report));
}

async fn index() -> impl Responder {
    HttpResponse::Ok().body("welcome")
}

async fn docs() -> impl Responder {
    HttpResponse::Ok().json(ENDPOINTS)
}

async fn list_cookies(data: web::Data<GlobalState>) -> Result<HttpResponse, ApiError> {
    let cookies = data.query(queries::ListCookies).await?;
    Ok(HttpResponse::Ok().json(cookies))
}

async fn suggest_cookie(
    User(user): User,
    data: web::Data<GlobalState>,
) -> Result<HttpResponse, ApiError> {
    let cookies = data.query(queries::ListCookies).await?;
    let cookie = cookies
        .choose(&mut rand::thread_rng())
        .ok_or(ApiError::NotFound("No cookies to suggest"))?;

    let mut attempt = 1;
    let token = loop {
        let token = data.token_source.next_token();
        let created = data
            .query(queries::CreateSession {
                token: token.clone(),
                user: user.clone(),
                cookie_id: cookie.id,
                created_at: Utc::now(),
            })
            .await;

        match created {
            Ok(_) => break token,
            Err(ApiError::Store(e)) if is_constraint_violation(&e) && attempt < TOKEN_ATTEMPTS => {
                tracing::warn!("Session token collision on attempt {}", attempt);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    };

    tracing::debug!("Suggested {:?} to {:?} with session {}", cookie.name, user, token);
    Ok(HttpResponse::Ok()
        .insert_header(("img", cookie.img.clone()))
        .insert_header(("session_token", token))
        .body(cookie.name.clone()))
}

async fn add_cookie(
    _admin: Admin,
    data: web::Data<GlobalState>,
    form: web::Form<CookieForm>,
) -> Result<HttpResponse, ApiError> {
    let CookieForm { name, img } = form.into_inner();
    let (name, img) = match (name, img) {
        (Some(name), Some(img)) if !name.trim().is_empty() && !img.trim().is_empty() => {
            (name, img)
        }
        _ => return Err(ApiError::BadRequest("Both name and img are required")),
    };

    if data.query(queries::FindCookie { name: name.clone() }).await?.is_some() {
        return Err(ApiError::BadRequest("Cookie already exists"));
    }

    if !data.image_validator.validate(&img).await {
        tracing::warn!("Rejected cookie {:?}: {} is not a reachable image", name, img);
        return Err(ApiError::BadRequest("img must link to an image"));
    }

    match data.query(queries::CreateCookie { name: name.clone(), img }).await {
        Ok(id) => {
            tracing::info!("Added cookie {:?} with id {}", name, id);
            Ok(HttpResponse::Ok().body("OK"))
        }
        Err(ApiError::Store(e)) if is_constraint_violation(&e) => {
            Err(ApiError::BadRequest("Cookie already exists"))
        }
        Err(e) => Err(e),
    }
}

async fn delete_cookie(
    _admin: Admin,
    data: web::Data<GlobalState>,
    form: web::Form<DeleteForm>,
) -> Result<HttpResponse, ApiError> {
    let name = form
        .into_inner()
        .name
        .ok_or(ApiError::BadRequest("name is required"))?;

    match data.query(queries::DeleteCookie { name: name.clone() }).await? {
        0 => Err(ApiError::NotFound("No such cookie")),
        _ => {
            tracing::info!("Deleted cookie {:?}", name);
            Ok(HttpResponse::Ok().body("OK"))
        }
    }
}

async fn rate_cookie(
    User(user): User,
    data: web::Data<GlobalState>,
    path: web::Path<String>,
    form: web::Form<RatingForm>,
) -> Result<HttpResponse, ApiError> {
    let rating = validation::parse_rating(form.rating.as_deref())?;

    let token = path.into_inner();
    if !token::is_well_formed(&token) {
        return Err(ApiError::NotFound("No such session"));
    }
    let session = data
        .query(queries::LookupSession { token })
        .await?
        .ok_or(ApiError::NotFound("No such session"))?;

    if !validation::validate_session(&session, &data.config, Utc::now()) {
        return Err(ApiError::Forbidden("Session expired"));
    }

    let previous = data
        .query(queries::FindRating { user: user.clone(), session_id: session.id })
        .await?;
    if previous.is_some() {
        return Err(ApiError::Forbidden("Session already rated"));
    }

    let created = data
        .query(queries::CreateRating {
            value: rating,
            user,
            cookie_id: session.cookie_id,
            session_id: session.id,
            created_at: Utc::now(),
        })
        .await;

    match created {
        Ok(_) => Ok(HttpResponse::Ok().body("OK")),
        Err(ApiError::Store(e)) if is_constraint_violation(&e) => {
            Err(ApiError::Forbidden("Session already rated"))
        }
        Err(e) => Err(e),
    }
}

async fn cookie_stats(
    _user: User,
    data: web::Data<GlobalState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let stats = data
        .query(queries::CookieStats { cookie_id: path.into_inner() })
        .await?
        .ok_or(ApiError::NotFound("No such cookie"))?;
    Ok(HttpResponse::Ok().json(stats))
}

async fn session_stats(
    _user: User,
    data: web::Data<GlobalState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let token = path.into_inner();
    if !token::is_well_formed(&token) {
        return Err(ApiError::NotFound("No such session"));
    }
    let stats = data
        .query(queries::SessionStats { token })
        .await?
        .ok_or(ApiError::NotFound("No such session"))?;
    Ok(HttpResponse::Ok().json(stats))
}

async fn traffic_report(
    data: web::Data<GlobalState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if !data.config.is_admin_key(&path) {
        tracing::warn!("Rejected traffic report request with an unknown admin key");
        return Err(ApiError::Forbidden("Invalid admin key"));
    }

    let provider = data
        .report_provider
        .clone()
        .ok_or(ApiError::Unavailable("Traffic reports are not configured"))?;
    let location = web::block(move || provider.traffic_report())
        .await
        .map_err(|_| ReportError::Cancelled)??;

    Ok(HttpResponse::Found().insert_header((LOCATION, location)).finish())
}
