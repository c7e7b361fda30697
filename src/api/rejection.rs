use std::convert::Infallible;

use serde_json::{json, Value};
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::with_status,
    Reply,
};

use crate::error::ApiError;

/// Status code and JSON body for an error raised by an operation.
pub fn error_response(error: &ApiError) -> (StatusCode, Value) {
    match error {
        ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
        ApiError::AlreadyExists(_)
        | ApiError::NotFound(_)
        | ApiError::EmptyCart
        | ApiError::SelfFollow
        | ApiError::InvalidRequest(_) => {
            (StatusCode::BAD_REQUEST, json!({ "errors": error.to_string() }))
        }
        ApiError::Missing(_) => (StatusCode::NOT_FOUND, json!({ "detail": error.to_string() })),
        ApiError::Forbidden => (StatusCode::FORBIDDEN, json!({ "detail": error.to_string() })),
        ApiError::Unauthorized(_) => {
            (StatusCode::UNAUTHORIZED, json!({ "detail": error.to_string() }))
        }
        ApiError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "detail": error.to_string() }),
        ),
        ApiError::Query(_) | ApiError::Cache(_) => {
            log::error!("{error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": "Internal server error" }),
            )
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(error) = err.find::<ApiError>() {
        error_response(error)
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "detail": "Not found" }))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "detail": "Method not allowed" }),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "detail": "Request body is too large" }),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            json!({ "detail": "Content-Length is required" }),
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            json!({ "detail": "Expected a JSON body" }),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "detail": "Internal server error" }),
        )
    };

    Ok(with_status(warp::reply::json(&body), status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QueryError, ValidationError};

    #[test]
    fn validation_errors_keep_their_field_map() {
        let (status, body) =
            error_response(&ValidationError::single("cooking_time", "too short").into());

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "cooking_time": ["too short"] }));
    }

    #[test]
    fn toggle_errors_are_bad_requests() {
        let (status, body) = error_response(&ApiError::SelfFollow);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "errors": "You can't subscribe to yourself" }));
        assert_eq!(
            error_response(&ApiError::EmptyCart).0,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let error = ApiError::Query(QueryError::new(String::from("relation \"x\" does not exist")));

        let (status, body) = error_response(&error);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }

    #[test]
    fn access_errors_map_to_their_status() {
        assert_eq!(error_response(&ApiError::Forbidden).0, StatusCode::FORBIDDEN);
        assert_eq!(
            error_response(&ApiError::Unauthorized("no")).0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            error_response(&ApiError::Missing("no recipe")).0,
            StatusCode::NOT_FOUND
        );
    }
}
