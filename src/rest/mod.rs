use crate::{
    message::{MessageId, ParseIdError},
    poll::Poller,
    store,
};
use actix_web::{
    dev::{Server, ServerHandle},
    http::StatusCode,
    middleware::Logger,
    web, App, HttpResponse, HttpServer, ResponseError,
};
use log::{error, warn};
use serde::Deserialize;
use serde_json::json;
use std::net::TcpListener;
use tap::TapFallible;

pub type RestResult<T> = Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] ParseIdError),

    #[error("Store error: {0}")]
    Store(#[from] store::Error),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCursor(_) => StatusCode::BAD_REQUEST,
            Error::Store(store::Error::CapacityExceeded { .. }) => {
                StatusCode::INSUFFICIENT_STORAGE
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMessage {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct FindMessages {
    pub after: Option<String>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/messages")
            .route(web::get().to(find_messages))
            .route(web::post().to(create_message)),
    );
}

async fn create_message(
    poller: web::Data<Poller>,
    input: web::Json<CreateMessage>,
) -> RestResult<HttpResponse> {
    let message = poller
        .store()
        .create_message(input.into_inner().body)
        .await
        .tap_err(|e| error!("Failed to create message: {e}"))?;

    Ok(HttpResponse::Ok().json(message))
}

async fn find_messages(
    poller: web::Data<Poller>,
    query: web::Query<FindMessages>,
) -> RestResult<HttpResponse> {
    let cursor = parse_cursor(query.after.as_deref())?;

    let messages = poller
        .poll(Some(&cursor))
        .await
        .tap_err(|e| error!("Failed to find messages: {e}"))?
        .into_messages();

    Ok(HttpResponse::Ok().json(messages))
}

/// A missing or empty cursor means "from the beginning".
fn parse_cursor(after: Option<&str>) -> RestResult<MessageId> {
    match after.map(str::trim) {
        None | Some("") => Ok(MessageId::nil()),
        Some(value) => Ok(value
            .parse::<MessageId>()
            .tap_err(|e| warn!("Rejecting cursor: {e}"))?),
    }
}

pub struct RestServer {
    server: Server,
}

impl RestServer {
    pub fn new(poller: Poller, listener: TcpListener) -> std::io::Result<Self> {
        let poller = web::Data::new(poller);
        let server = HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .app_data(poller.clone())
                .configure(routes)
        })
        .listen(listener)?
        .run();

        Ok(RestServer { server })
    }

    pub fn handle(&self) -> ServerHandle {
        self.server.handle()
    }

    pub async fn run(self) -> std::io::Result<()> {
        self.server.await
    }
}
