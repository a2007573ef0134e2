use std::sync::Arc;

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::{ApiError, ErrorKind, PlainTextError};
use crate::query::{Answer, QueryError};
use crate::state::AppState;

pub const INVALID_FORM_MESSAGE: &str = "Invalid form submission.";
pub const INVALID_JSON_MESSAGE: &str = "Request body must be a JSON object with a \"question\" field.";

/// The `msg` field of `/get`, sent either url-encoded or as `multipart/form-data`.
#[derive(Debug, Default, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub msg: String,
}

#[async_trait]
impl<S> FromRequest<S> for ChatForm
where
    S: Send + Sync,
{
    type Rejection = PlainTextError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| reject(INVALID_FORM_MESSAGE, e))?;
            let mut form = ChatForm::default();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| reject(INVALID_FORM_MESSAGE, e))?
            {
                if field.name() == Some("msg") {
                    form.msg = field
                        .text()
                        .await
                        .map_err(|e| reject(INVALID_FORM_MESSAGE, e))?;
                }
            }
            return Ok(form);
        }

        let Form(form) = Form::<ChatForm>::from_request(req, state)
            .await
            .map_err(|e| reject(INVALID_FORM_MESSAGE, e))?;
        Ok(form)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

/// Form endpoint used by the chat page: `msg` in, answer text out.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    form: ChatForm,
) -> Result<impl IntoResponse, PlainTextError> {
    let answer = answer_question(&state, form.msg).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        answer.text,
    ))
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| reject(INVALID_JSON_MESSAGE, e))?;
    let answer = answer_question(&state, payload.question).await?;
    Ok(Json(json!({
        "answer": answer.text,
        "sources": answer.sources,
        "fallback": answer.fallback
    })))
}

/// Runs the query pipeline on its own task so a panic there becomes a 500.
async fn answer_question(state: &AppState, question: String) -> Result<Answer, ApiError> {
    let query = state.query.clone();
    let result = tokio::spawn(async move { query.ask(&question).await })
        .await
        .map_err(ApiError::internal)?;

    match result {
        Ok(answer) => Ok(answer),
        Err(err @ QueryError::InvalidInput) => Err(ApiError::BadRequest(err.to_string())),
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
        .unwrap_or(false)
}

/// Extractor failures keep their detail in the log only.
fn reject<E: std::fmt::Display>(message: &str, err: E) -> ApiError {
    tracing::info!(kind = %ErrorKind::InvalidInput, "Rejected request body: {}", err);
    ApiError::BadRequest(message.to_string())
}
