//! Request and response bodies, plus extractors that reject with
//! [`ApiError`](crate::error::ApiError) JSON

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

pub mod auth;
pub mod listing;
pub mod mail;

pub use listing::ListQuery;

/// `axum::Json` whose rejection renders as an API error
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` whose rejection renders as an API error
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
