//! JSON bodies of the subscription REST API.
//!
//! | Method   | Path            | Request              | Response              |
//! |----------|-----------------|----------------------|-----------------------|
//! | `POST`   | `/tg-chat/{id}` | —                    | —                     |
//! | `DELETE` | `/tg-chat/{id}` | —                    | —                     |
//! | `GET`    | `/links`        | —                    | [`ListLinksResponse`] |
//! | `POST`   | `/links`        | [`AddLinkRequest`]   | [`LinkResponse`]      |
//! | `DELETE` | `/links`        | [`RemoveLinkRequest`]| [`LinkResponse`]      |
//!
//! Every `/links` call carries the chat id in the [`CHAT_ID_HEADER`] header.
//! Failures return an [`ApiErrorResponse`].

use serde::{Deserialize, Serialize};

use crate::{error::Error, link::LinkId};

/// Header carrying the caller's chat id on `/links` requests.
pub const CHAT_ID_HEADER: &str = "Tg-Chat-Id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLinkRequest {
  pub link:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags:    Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filters: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLinkRequest {
  pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResponse {
  pub id:      LinkId,
  pub url:     String,
  #[serde(default)]
  pub tags:    Vec<String>,
  #[serde(default)]
  pub filters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLinksResponse {
  pub links: Vec<LinkResponse>,
  pub size:  usize,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
  pub description:       String,
  pub code:              String,
  pub exception_name:    String,
  pub exception_message: String,
  #[serde(default)]
  pub stacktrace:        Vec<String>,
}

impl ApiErrorResponse {
  /// Build the body for `err`, using its default status code.
  pub fn from_error(err: &Error) -> Self { Self::with_status(err, err.status_code()) }

  /// Build the body for `err` reported under an endpoint-specific `status`.
  pub fn with_status(err: &Error, status: u16) -> Self {
    let description = match status {
      400 => "Некорректные параметры запроса",
      404 => "Ресурс не найден",
      _ => "Внутренняя ошибка сервера",
    };
    Self {
      description:       description.to_owned(),
      code:              status.to_string(),
      exception_name:    err.exception_name().to_owned(),
      exception_message: err.to_string(),
      stacktrace:        Vec::new(),
    }
  }
}
