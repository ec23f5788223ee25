//! Extractors that reject with `ApiError` plus shared query parameters.

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use bookstore_core::{PageRequest, SortDirection};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// JSON body; malformed or mistyped bodies become a 400.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `page`, `size`, `sort` and `direction` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl PageParams {
    pub fn request(&self, default_size: u32) -> PageRequest {
        PageRequest::new(self.page, self.size, default_size)
    }

    pub fn direction(&self) -> Result<SortDirection, ApiError> {
        match self.direction.as_deref() {
            None => Ok(SortDirection::default()),
            Some(raw) => SortDirection::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown sort direction `{raw}`"))),
        }
    }

    /// Parses `sort` with `parse`, falling back to the type's default.
    pub fn sort<T: Default>(&self, parse: impl Fn(&str) -> Option<T>) -> Result<T, ApiError> {
        match self.sort.as_deref() {
            None => Ok(T::default()),
            Some(raw) => {
                parse(raw).ok_or_else(|| ApiError::bad_request(format!("unknown sort field `{raw}`")))
            }
        }
    }
}

/// Parses an upper-case enum value such as a status or tier name.
pub fn parse_enum<T>(raw: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.trim().to_ascii_uppercase().parse().map_err(ApiError::bad_request)
}

#[cfg(test)]
mod tests {
    use super::{parse_enum, PageParams};
    use bookstore_core::repo::book_repo::BookSort;
    use bookstore_core::{MembershipType, SortDirection};

    #[test]
    fn page_params_fall_back_to_defaults() {
        let params = PageParams::default();
        assert_eq!(params.request(20).size, 20);
        assert_eq!(params.direction().unwrap(), SortDirection::Desc);
        assert_eq!(params.sort(BookSort::parse).unwrap(), BookSort::CreatedAt);
    }

    #[test]
    fn unknown_sort_values_are_rejected() {
        let params = PageParams {
            sort: Some("color".to_string()),
            direction: Some("sideways".to_string()),
            ..PageParams::default()
        };
        assert!(params.sort(BookSort::parse).is_err());
        assert!(params.direction().is_err());
    }

    #[test]
    fn enum_values_are_case_insensitive() {
        assert_eq!(
            parse_enum::<MembershipType>("premium").unwrap(),
            MembershipType::Premium
        );
        assert!(parse_enum::<MembershipType>("gold").is_err());
    }
}
