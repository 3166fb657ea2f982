//! HTTP API Layer
//!
//! This crate provides the REST API of the civic CRM using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for each domain
//! - **Middleware**: Authentication and audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Delivery**: Sending mail through the configured transport
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(pool, config, Arc::new(LoggingTransport));
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod delivery;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
    middleware as axum_middleware,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use domain_identity::SessionPolicy;
use domain_mail::MailTransport;
use infra_db::repositories::{
    DraftRepository, EmailRepository, HouseholdRepository, IdentityRepository, NewsletterRepository,
    PersonRepository, TagRepository,
};

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{auth as account, drafts, emails, health, households, newsletters, persons, tags};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
    pub mailer: Arc<dyn MailTransport>,
    pub sessions: SessionPolicy,
    pub identity: IdentityRepository,
    pub persons: PersonRepository,
    pub households: HouseholdRepository,
    pub tags: TagRepository,
    pub emails: EmailRepository,
    pub drafts: DraftRepository,
    pub newsletters: NewsletterRepository,
}

impl AppState {
    pub fn new(pool: PgPool, config: ApiConfig, mailer: Arc<dyn MailTransport>) -> Self {
        Self {
            sessions: SessionPolicy::new(config.session_ttl_secs),
            identity: IdentityRepository::new(pool.clone()),
            persons: PersonRepository::new(pool.clone()),
            households: HouseholdRepository::new(pool.clone()),
            tags: TagRepository::new(pool.clone()),
            emails: EmailRepository::new(pool.clone()),
            drafts: DraftRepository::new(pool.clone()),
            newsletters: NewsletterRepository::new(pool.clone()),
            pool,
            config,
            mailer,
        }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let public_api_routes = Router::new()
        .route("/auth/signup", post(account::sign_up))
        .route("/auth/signin", post(account::sign_in));

    // Account routes
    let auth_routes = Router::new()
        .route("/signout", post(account::sign_out))
        .route("/me", get(account::me))
        .route("/profile", put(account::update_profile))
        .route("/sessions", get(account::list_sessions))
        .route("/sessions/:id", delete(account::revoke_session))
        .route("/members", post(account::invite_member));

    // Person routes
    let person_routes = Router::new()
        .route("/", get(persons::list_persons).post(persons::create_person))
        .route(
            "/:id",
            get(persons::get_person)
                .put(persons::update_person)
                .delete(persons::delete_person),
        )
        .route("/:id/tags", get(persons::list_person_tags))
        .route(
            "/:id/tags/:tag_id",
            post(persons::tag_person).delete(persons::untag_person),
        );

    // Household routes
    let household_routes = Router::new()
        .route("/", get(households::list_households).post(households::create_household))
        .route(
            "/:id",
            get(households::get_household)
                .put(households::update_household)
                .delete(households::delete_household),
        )
        .route("/:id/members", get(households::list_members))
        .route(
            "/:id/members/:person_id",
            post(households::add_member).delete(households::remove_member),
        )
        .route("/:id/tags", get(households::list_household_tags))
        .route(
            "/:id/tags/:tag_id",
            post(households::tag_household).delete(households::untag_household),
        );

    // Tag routes
    let tag_routes = Router::new()
        .route("/", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/:id",
            get(tags::get_tag).put(tags::update_tag).delete(tags::delete_tag),
        )
        .route("/:id/persons", get(tags::list_tagged_persons));

    // Mailbox routes
    let email_routes = Router::new()
        .route("/", get(emails::list_emails))
        .route("/send", post(emails::send_email))
        .route("/receive", post(emails::receive_email))
        .route("/trash", post(emails::trash_many).delete(emails::empty_trash))
        .route("/:id", get(emails::get_email).delete(emails::purge_email))
        .route("/:id/flags", put(emails::set_flags))
        .route("/:id/folder", put(emails::move_email))
        .route("/:id/trash", post(emails::trash_email))
        .route("/:id/restore", post(emails::restore_email));

    // Draft routes
    let draft_routes = Router::new()
        .route("/", get(drafts::list_drafts).post(drafts::create_draft))
        .route(
            "/:id",
            get(drafts::get_draft)
                .put(drafts::update_draft)
                .delete(drafts::delete_draft),
        )
        .route("/:id/send", post(drafts::send_draft));

    // Newsletter routes
    let newsletter_routes = Router::new()
        .route("/", get(newsletters::list_newsletters).post(newsletters::create_newsletter))
        .route(
            "/:id",
            get(newsletters::get_newsletter)
                .put(newsletters::update_newsletter)
                .delete(newsletters::delete_newsletter),
        )
        .route(
            "/:id/schedule",
            post(newsletters::schedule_newsletter).delete(newsletters::unschedule_newsletter),
        )
        .route("/:id/send", post(newsletters::send_newsletter));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/persons", person_routes)
        .nest("/households", household_routes)
        .nest("/tags", tag_routes)
        .nest("/emails", email_routes)
        .nest("/drafts", draft_routes)
        .nest("/newsletters", newsletter_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware))
        .merge(public_api_routes);

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
