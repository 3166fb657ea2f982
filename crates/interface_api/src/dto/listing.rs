//! Grid query parameters
//!
//! `?page=2&per_page=25&sort=last_name&order=desc&q=smith&city=Springfield`
//! becomes [`ListOptions`]; keys other than the paging, sorting and search
//! ones are column filters.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};

use core_kernel::ListOptions;

use crate::error::ApiError;

/// Extracts [`ListOptions`] from the query string
#[derive(Debug, Clone)]
pub struct ListQuery(pub ListOptions);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ListQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state).await?;
        Ok(ListQuery(ListOptions::from_query_pairs(pairs)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use core_kernel::SortOrder;

    async fn extract(uri: &str) -> Result<ListOptions, ApiError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ListQuery::from_request_parts(&mut parts, &()).await.map(|q| q.0)
    }

    #[tokio::test]
    async fn test_query_string_becomes_options() {
        let options = extract("/persons?page=2&per_page=25&sort=last_name&order=desc&q=smith&city=Springfield")
            .await
            .unwrap();
        assert_eq!(options.page, 2);
        assert_eq!(options.per_page, 25);
        assert_eq!(options.sort_by.as_deref(), Some("last_name"));
        assert_eq!(options.sort_order, SortOrder::Desc);
        assert_eq!(options.search.as_deref(), Some("smith"));
        assert_eq!(options.filters.get("city").map(String::as_str), Some("Springfield"));
    }

    #[tokio::test]
    async fn test_invalid_paging_is_rejected() {
        assert!(matches!(extract("/persons?page=abc").await, Err(ApiError::Validation(_))));
        assert!(extract("/persons").await.is_ok());
    }
}
