use async_trait::async_trait;
use linktrack_core::LinkUpdate;
use reqwest::Client;

use super::Transport;
use crate::error::TransportError;

/// POSTs each update to the bot's `/updates` endpoint.
pub struct HttpTransport {
  client:   Client,
  endpoint: String,
}

impl HttpTransport {
  pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
    Self { client, endpoint: endpoint.into() }
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, update: &LinkUpdate) -> Result<(), TransportError> {
    let response = self.client.post(&self.endpoint).json(update).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(TransportError::TransportFailed(status.as_u16()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
  use linktrack_core::{ChatId, LinkId};
  use tokio::net::TcpListener;

  use super::*;

  async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}/updates")
  }

  fn update() -> LinkUpdate {
    LinkUpdate {
      id:          LinkId(1),
      url:         "https://github.com/o/r".into(),
      description: "new issue".into(),
      subscribers: vec![ChatId(42)],
    }
  }

  #[tokio::test]
  async fn posts_the_update_as_json() {
    let received: Arc<Mutex<Vec<LinkUpdate>>> = Arc::default();
    let router = Router::new()
      .route(
        "/updates",
        post(
          |State(seen): State<Arc<Mutex<Vec<LinkUpdate>>>>, Json(u): Json<LinkUpdate>| async move {
            seen.lock().unwrap().push(u);
            StatusCode::OK
          },
        ),
      )
      .with_state(received.clone());
    let transport = HttpTransport::new(Client::new(), serve(router).await);

    transport.send(&update()).await.unwrap();
    assert_eq!(*received.lock().unwrap(), vec![update()]);
  }

  #[tokio::test]
  async fn non_success_status_fails() {
    let router = Router::new().route("/updates", post(|| async { StatusCode::BAD_REQUEST }));
    let transport = HttpTransport::new(Client::new(), serve(router).await);

    let err = transport.send(&update()).await.unwrap_err();
    assert!(matches!(err, TransportError::TransportFailed(400)), "{err:?}");
  }
}
