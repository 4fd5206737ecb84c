use std::collections::BTreeMap;

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request},
    http::{header, StatusCode},
    routing::any,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

/// An uploaded multipart file part as the server saw it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoFile {
    pub name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: String,
}

/// Everything the server received, sent back as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Media type without parameters, so multipart boundaries do not leak in.
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
    pub form: BTreeMap<String, String>,
    pub files: Vec<EchoFile>,
}

type Rejection = (StatusCode, String);

pub fn app() -> Router {
    Router::new()
        .route("/status/{code}", any(status))
        .fallback(echo)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Reply with the requested status, a marker header and a short body.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, [(&'static str, String); 1], String), Rejection> {
    let status = StatusCode::from_u16(code).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok((status, [("x-echo-status", code.to_string())], format!("status {code}")))
}

async fn echo(request: Request) -> Result<Json<Echo>, Rejection> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let Query(query) = Query::<BTreeMap<String, String>>::try_from_uri(request.uri())
        .map_err(|e| (e.status(), e.body_text()))?;
    // The request is not Sync; its headers must not stay borrowed across an await.
    let (raw_content_type, user_agent) = {
        let headers = request.headers();
        let text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (text(header::CONTENT_TYPE), text(header::USER_AGENT))
    };
    let content_type = raw_content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string());

    let mut form = BTreeMap::new();
    let mut files = Vec::new();
    match content_type.as_deref() {
        Some("multipart/form-data") => {
            let mut multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| (e.status(), e.body_text()))?;
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| (e.status(), e.body_text()))?
            {
                let name = field.name().unwrap_or_default().to_string();
                match field.file_name().map(str::to_string) {
                    Some(file_name) => {
                        let part_type = field.content_type().map(str::to_string);
                        let bytes = field.bytes().await.map_err(|e| (e.status(), e.body_text()))?;
                        files.push(EchoFile {
                            name,
                            file_name,
                            content_type: part_type,
                            content: String::from_utf8_lossy(&bytes).into_owned(),
                        });
                    }
                    None => {
                        let text = field.text().await.map_err(|e| (e.status(), e.body_text()))?;
                        form.insert(name, text);
                    }
                }
            }
        }
        Some("application/x-www-form-urlencoded") => {
            let Form(fields) = Form::<BTreeMap<String, String>>::from_request(request, &())
                .await
                .map_err(|e| (e.status(), e.body_text()))?;
            form = fields;
        }
        _ => {}
    }

    debug!(%method, %path, fields = form.len(), files = files.len(), "echoing request");
    Ok(Json(Echo {
        method,
        path,
        query,
        content_type,
        user_agent,
        form,
        files,
    }))
}
