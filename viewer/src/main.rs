#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
//! Local web server for the case viewer.
//!
//! Serves a static directory and two endpoints:
//!
//! - `POST /api/regenerate` rebuilds both case shells from JSON parameters.
//! - `POST /api/upload` stores an STL body and replies with its topology.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use anyhow::bail;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use clap::Parser;
use log::error;
use log::info;
use nucdeck_mesh::Mesh;
use nucdeck_mesh::adjacency::MeshReport;
use nucdeck_mesh::case::CaseParams;
use nucdeck_mesh::case::HandheldCase;
use nucdeck_mesh::io::parse_stl;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Args {
    #[arg(long, short = 'p', default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "viewer/static", help = "directory served at /")]
    static_dir: PathBuf,
    #[arg(long, default_value = "output", help = "where regenerated shells go")]
    output_dir: PathBuf,
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,
}

#[derive(Debug)]
struct AppState {
    output_dir: PathBuf,
    upload_dir: PathBuf,
}

/// Error reply, rendered as `{"status": "error", "message": ...}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("{}: {}", self.status, self.message);
        let body = json!({ "status": "error", "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct RegenerateReply {
    status: &'static str,
    message: String,
    parameters: Value,
}

async fn regenerate(
    State(state): State<Arc<AppState>>,
    Json(parameters): Json<Value>,
) -> Result<Json<RegenerateReply>, ApiError> {
    let params: CaseParams = serde_json::from_value(parameters.clone())
        .map_err(|e| ApiError::bad_request(format!("invalid case parameters: {e}")))?;
    info!(
        "regenerating {}×{}×{} mm case",
        params.case_width, params.case_height, params.case_depth
    );
    let dir = state.output_dir.clone();
    let export = tokio::task::spawn_blocking(move || HandheldCase::new(params).export(&dir))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(RegenerateReply {
        status: "success",
        message: format!(
            "Regenerated {} and {}",
            export.front.check.path.display(),
            export.back.check.path.display()
        ),
        parameters,
    }))
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadReply {
    status: &'static str,
    message: String,
    mesh: MeshReport,
}

/// File name to store an upload under, stripped of any directories.
fn upload_name(requested: Option<&str>) -> String {
    let name = requested
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.is_empty() {
        "upload.stl".to_string()
    } else if Path::new(&name)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("stl"))
    {
        name
    } else {
        format!("{name}.stl")
    }
}

async fn upload(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadReply>, ApiError> {
    let triangles = parse_stl(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let mesh = Mesh::from_triangles(&triangles);
    let report = MeshReport::new(&mesh);

    let path = state.upload_dir.join(upload_name(query.name.as_deref()));
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    info!("stored {} ({} faces)", path.display(), report.faces);

    Ok(Json(UploadReply {
        status: "success",
        message: format!("Stored {}", path.display()),
        mesh: report,
    }))
}

fn app(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/regenerate", post(regenerate))
        .route("/api/upload", post(upload))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("starting up");

    let args = Args::parse();
    let state = Arc::new(AppState {
        output_dir: args.output_dir,
        upload_dir: args.upload_dir,
    });
    let app = app(state, &args.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            bail!(
                "port {} is already in use, try --port {}",
                args.port,
                args.port.wrapping_add(1)
            );
        }
        Err(e) => return Err(e.into()),
    };
    println!("NucDeck viewer on http://localhost:{}", args.port);
    println!("Serving files from {}", args.static_dir.display());
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ascii STL of a closed unit cube.
    fn cube_stl() -> String {
        let faces = [
            [[0, 0, 0], [0, 1, 0], [1, 1, 0]],
            [[0, 0, 0], [1, 1, 0], [1, 0, 0]],
            [[0, 0, 1], [1, 0, 1], [1, 1, 1]],
            [[0, 0, 1], [1, 1, 1], [0, 1, 1]],
            [[0, 0, 0], [1, 0, 0], [1, 0, 1]],
            [[0, 0, 0], [1, 0, 1], [0, 0, 1]],
            [[0, 1, 0], [0, 1, 1], [1, 1, 1]],
            [[0, 1, 0], [1, 1, 1], [1, 1, 0]],
            [[0, 0, 0], [0, 0, 1], [0, 1, 1]],
            [[0, 0, 0], [0, 1, 1], [0, 1, 0]],
            [[1, 0, 0], [1, 1, 0], [1, 1, 1]],
            [[1, 0, 0], [1, 1, 1], [1, 0, 1]],
        ];
        let mut out = String::from("solid cube\n");
        for face in faces {
            out.push_str("facet normal 0 0 0\nouter loop\n");
            for [x, y, z] in face {
                out.push_str(&format!("vertex {x} {y} {z}\n"));
            }
            out.push_str("endloop\nendfacet\n");
        }
        out.push_str("endsolid cube\n");
        out
    }

    fn state(dir: &Path) -> Arc<AppState> {
        Arc::new(AppState {
            output_dir: dir.join("output"),
            upload_dir: dir.join("uploads"),
        })
    }

    #[test]
    fn upload_names() {
        assert_eq!(upload_name(None), "upload.stl");
        assert_eq!(upload_name(Some("")), "upload.stl");
        assert_eq!(upload_name(Some("../../etc/passwd")), "passwd.stl");
        assert_eq!(upload_name(Some("Front.STL")), "Front.STL");
    }

    #[tokio::test]
    async fn upload_stores_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let query = UploadQuery {
            name: Some("cube.stl".into()),
        };
        let Json(reply) = upload(State(state), Query(query), Bytes::from(cube_stl()))
            .await
            .unwrap();
        assert_eq!(reply.status, "success");
        assert_eq!(reply.mesh.vertices, 8);
        assert_eq!(reply.mesh.faces, 12);
        assert!(reply.mesh.watertight);
        assert!(dir.path().join("uploads/cube.stl").exists());
    }

    #[tokio::test]
    async fn upload_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let query = UploadQuery { name: None };
        let err = upload(
            State(state(dir.path())),
            Query(query),
            Bytes::from_static(b"not a mesh"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "unrecognised data (10 bytes)");
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn regenerate_rejects_bad_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let err = regenerate(
            State(state(dir.path())),
            Json(json!({ "case_width": "wide" })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("invalid case parameters"));
    }
}
