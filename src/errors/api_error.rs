use chrono::Utc;
use http::{header::HeaderValue, StatusCode};
use serde::{ser::Serializer, Serialize};
use serde_json::{Map, Value};
use std::{
    error::Error as StdError,
    fmt::{self, Display},
};
use warp::{reject::Reject, reply::json, reply::Response, Rejection, Reply};

/// API error type prefix of problems.
const ERROR_TYPE_PREFIX: &str = "https://errors.interledger.org/http-api";

/// Problem details as defined in [RFC7807](https://tools.ietf.org/html/rfc7807).
/// ApiError implements Reply so that it can be returned directly from filters.
#[derive(Clone, Debug, Serialize)]
pub struct ApiError {
    #[serde(serialize_with = "serialize_type")]
    pub r#type: &'static ProblemType,
    pub title: &'static str,
    #[serde(serialize_with = "serialize_status_code")]
    pub status: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(flatten)]
    pub extension_members: Map<String, Value>,
}

#[derive(Clone, Copy, Debug)]
pub enum ProblemType {
    /// Serialized as `about:blank`.
    Default,
    /// Serialized as `https://errors.interledger.org/http-api/<path>`.
    InterledgerHttpApi(&'static str),
}

#[derive(Clone, Copy, Debug)]
pub struct ApiErrorType {
    pub r#type: &'static ProblemType,
    pub title: &'static str,
    pub status: StatusCode,
}

pub const DEFAULT_INTERNAL_SERVER_ERROR_TYPE: ApiErrorType = ApiErrorType {
    r#type: &ProblemType::Default,
    title: "Internal Server Error",
    status: StatusCode::INTERNAL_SERVER_ERROR,
};

pub const DEFAULT_UNAUTHORIZED_TYPE: ApiErrorType = ApiErrorType {
    r#type: &ProblemType::Default,
    title: "Unauthorized",
    status: StatusCode::UNAUTHORIZED,
};

pub const DEFAULT_METHOD_NOT_ALLOWED_TYPE: ApiErrorType = ApiErrorType {
    r#type: &ProblemType::Default,
    title: "Method Not Allowed",
    status: StatusCode::METHOD_NOT_ALLOWED,
};

/// A request body that does not decode as an ILP Prepare.
pub const INVALID_ILP_PACKET_TYPE: ApiErrorType = ApiErrorType {
    r#type: &ProblemType::InterledgerHttpApi("ilp-over-http/invalid-packet"),
    title: "Invalid Packet",
    status: StatusCode::INTERNAL_SERVER_ERROR,
};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_status_code<S>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_u16(status.as_u16())
}

fn serialize_type<S>(r#type: &ProblemType, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match r#type {
        ProblemType::Default => s.serialize_str("about:blank"),
        ProblemType::InterledgerHttpApi(custom_type) => {
            s.serialize_str(&format!("{}/{}", ERROR_TYPE_PREFIX, custom_type))
        }
    }
}

impl ApiError {
    pub fn from_api_error_type(problem_type: &ApiErrorType) -> Self {
        let mut extension_members = Map::new();
        extension_members.insert("datetime".to_owned(), Value::from(Utc::now().to_rfc3339()));
        ApiError {
            r#type: problem_type.r#type,
            title: problem_type.title,
            status: problem_type.status,
            detail: None,
            extension_members,
        }
    }

    pub fn internal_server_error() -> Self {
        ApiError::from_api_error_type(&DEFAULT_INTERNAL_SERVER_ERROR_TYPE)
    }

    pub fn unauthorized() -> Self {
        ApiError::from_api_error_type(&DEFAULT_UNAUTHORIZED_TYPE)
    }

    pub fn invalid_ilp_packet() -> Self {
        ApiError::from_api_error_type(&INVALID_ILP_PACKET_TYPE)
    }

    pub fn detail<T>(mut self, detail: T) -> Self
    where
        T: Into<String>,
    {
        self.detail = Some(detail.into());
        self
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.title)?;
        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        let mut res = json(&self).into_response();
        *res.status_mut() = self.status;
        res.headers_mut().insert(
            "Content-Type",
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

impl StdError for ApiError {}

impl Reject for ApiError {}

/// Turns `ApiError` rejections into RFC7807 responses.
pub async fn default_rejection_handler(err: Rejection) -> Result<Response, Rejection> {
    if let Some(api_error) = err.find::<ApiError>() {
        Ok(api_error.clone().into_response())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        Ok(ApiError::from_api_error_type(&DEFAULT_METHOD_NOT_ALLOWED_TYPE).into_response())
    } else {
        Err(err)
    }
}
