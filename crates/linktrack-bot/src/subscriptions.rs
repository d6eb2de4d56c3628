//! Client side of the scrapper's subscription API.

use async_trait::async_trait;
use linktrack_core::{
  ChatId,
  api::{
    AddLinkRequest, ApiErrorResponse, CHAT_ID_HEADER, LinkResponse, ListLinksResponse,
    RemoveLinkRequest,
  },
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{Error, Result};

#[async_trait]
pub trait SubscriptionClient: Send + Sync {
  async fn register_chat(&self, id: ChatId) -> Result<()>;

  async fn delete_chat(&self, id: ChatId) -> Result<()>;

  async fn list_links(&self, id: ChatId) -> Result<ListLinksResponse>;

  async fn add_link(&self, id: ChatId, request: &AddLinkRequest) -> Result<LinkResponse>;

  async fn remove_link(&self, id: ChatId, link: &str) -> Result<LinkResponse>;
}

/// [`SubscriptionClient`] over HTTP.
pub struct ScrapperClient {
  client: Client,
  base:   String,
}

impl ScrapperClient {
  /// `base` is the scrapper's root URL, e.g. `http://127.0.0.1:8080`.
  pub fn new(client: Client, base: impl Into<String>) -> Self {
    Self { client, base: base.into().trim_end_matches('/').to_owned() }
  }

  fn url(&self, path: &str) -> String { format!("{}{path}", self.base) }

  fn links(&self, request: RequestBuilder, id: ChatId) -> RequestBuilder {
    request.header(CHAT_ID_HEADER, id.to_string())
  }

  /// Send `request` and decode a success body, or rebuild the typed error
  /// from the API error body.
  async fn exchange<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    id: ChatId,
    link: &str,
  ) -> Result<T> {
    let response = self.check(request, id, link).await?;
    Ok(response.json().await?)
  }

  async fn check(&self, request: RequestBuilder, id: ChatId, link: &str) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let code = status.as_u16();
    let text = response.text().await.unwrap_or_default();
    let error = match serde_json::from_str::<ApiErrorResponse>(&text) {
      Ok(body) => linktrack_core::Error::from_api(code, &body, id, link),
      Err(_) => linktrack_core::Error::Unexpected { status: code, message: text },
    };
    Err(Error::Subscription(error))
  }
}

#[async_trait]
impl SubscriptionClient for ScrapperClient {
  async fn register_chat(&self, id: ChatId) -> Result<()> {
    let request = self.client.post(self.url(&format!("/tg-chat/{id}")));
    self.check(request, id, "").await?;
    Ok(())
  }

  async fn delete_chat(&self, id: ChatId) -> Result<()> {
    let request = self.client.delete(self.url(&format!("/tg-chat/{id}")));
    self.check(request, id, "").await?;
    Ok(())
  }

  async fn list_links(&self, id: ChatId) -> Result<ListLinksResponse> {
    let request = self.links(self.client.get(self.url("/links")), id);
    self.exchange(request, id, "").await
  }

  async fn add_link(&self, id: ChatId, request: &AddLinkRequest) -> Result<LinkResponse> {
    let http = self.links(self.client.post(self.url("/links")), id).json(request);
    self.exchange(http, id, &request.link).await
  }

  async fn remove_link(&self, id: ChatId, link: &str) -> Result<LinkResponse> {
    let body = RemoveLinkRequest { link: link.to_owned() };
    let request = self.links(self.client.delete(self.url("/links")), id).json(&body);
    self.exchange(request, id, link).await
  }
}

#[cfg(test)]
mod tests {
  use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    routing::post,
  };
  use linktrack_core::LinkId;
  use tokio::net::TcpListener;

  use super::*;

  async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
  }

  async fn add(headers: HeaderMap, Json(body): Json<AddLinkRequest>) -> axum::response::Response {
    use axum::response::IntoResponse;

    assert_eq!(headers[CHAT_ID_HEADER], "42");
    if body.link.contains("example.com") {
      let error = linktrack_core::Error::UnsupportedLink(body.link);
      return (StatusCode::BAD_REQUEST, Json(ApiErrorResponse::from_error(&error)))
        .into_response();
    }
    Json(LinkResponse {
      id:      LinkId(1),
      url:     body.link,
      tags:    body.tags.unwrap_or_default(),
      filters: body.filters.unwrap_or_default(),
    })
    .into_response()
  }

  async fn client() -> ScrapperClient {
    let router = Router::new()
      .route("/links", post(add))
      .route("/tg-chat/{id}", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    ScrapperClient::new(Client::new(), serve(router).await)
  }

  #[tokio::test]
  async fn add_link_sends_header_and_body() {
    let client = client().await;
    let request = AddLinkRequest {
      link:    "https://github.com/o/r".into(),
      tags:    Some(vec!["work".into()]),
      filters: None,
    };
    let response = client.add_link(ChatId(42), &request).await.unwrap();
    assert_eq!(response.id, LinkId(1));
    assert_eq!(response.tags, vec!["work"]);
  }

  #[tokio::test]
  async fn api_errors_come_back_typed() {
    let client = client().await;
    let request = AddLinkRequest { link: "https://example.com/x".into(), tags: None, filters: None };
    let err = client.add_link(ChatId(42), &request).await.unwrap_err();
    assert!(
      matches!(err, Error::Subscription(linktrack_core::Error::UnsupportedLink(ref l)) if l == "https://example.com/x"),
      "{err:?}"
    );
  }

  #[tokio::test]
  async fn empty_error_body_is_unexpected() {
    let client = client().await;
    let err = client.register_chat(ChatId(1)).await.unwrap_err();
    assert!(
      matches!(err, Error::Subscription(linktrack_core::Error::Unexpected { status: 500, .. })),
      "{err:?}"
    );
  }
}
