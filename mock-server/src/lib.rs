use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateInfo {
    pub has_update: bool,
    pub current_version: String,
    pub latest_version: String,
    pub download_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LicenseStatus {
    pub machine_id: String,
    pub activated: bool,
    pub license_code: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckUpdateParams {
    pub current_version: Option<String>,
}

#[derive(Deserialize)]
pub struct LicenseStatusParams {
    pub machine_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RedeemRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub machine_id: String,
}

/// In-memory release and license records.
#[derive(Debug, Clone)]
pub struct Backend {
    pub latest_version: String,
    pub download_url: String,
    codes: HashSet<String>,
    // code -> machine it was redeemed on
    redeemed: HashMap<String, String>,
}

impl Backend {
    pub fn new(latest_version: &str, codes: &[&str]) -> Self {
        Self {
            latest_version: latest_version.to_string(),
            download_url: format!("https://downloads.example.com/releases/{latest_version}"),
            codes: codes.iter().map(|c| c.to_string()).collect(),
            redeemed: HashMap::new(),
        }
    }

    fn status(&self, machine_id: &str) -> LicenseStatus {
        let license_code = self
            .redeemed
            .iter()
            .find(|(_, machine)| machine.as_str() == machine_id)
            .map(|(code, _)| code.clone());
        LicenseStatus {
            machine_id: machine_id.to_string(),
            activated: license_code.is_some(),
            license_code,
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::new("1.1.0", &["DEMO-0001", "DEMO-0002"])
    }
}

pub type Db = Arc<RwLock<Backend>>;

pub fn app() -> Router {
    app_with(Backend::default())
}

pub fn app_with(backend: Backend) -> Router {
    let db: Db = Arc::new(RwLock::new(backend));
    let api = Router::new()
        .route("/app/check-update", get(check_update))
        .route("/license/status", get(license_status))
        .route("/license/redeem", post(redeem_license))
        .with_state(db);
    Router::new().nest(API_PREFIX, api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn check_update(
    State(db): State<Db>,
    Query(params): Query<CheckUpdateParams>,
) -> Response {
    let Some(current_version) = required(params.current_version) else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "current_version is required");
    };
    let backend = db.read().await;
    let info = UpdateInfo {
        has_update: is_newer(&backend.latest_version, &current_version),
        current_version,
        latest_version: backend.latest_version.clone(),
        download_url: backend.download_url.clone(),
    };
    Json(info).into_response()
}

async fn license_status(
    State(db): State<Db>,
    Query(params): Query<LicenseStatusParams>,
) -> Response {
    let Some(machine_id) = required(params.machine_id) else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "machine_id is required");
    };
    Json(db.read().await.status(&machine_id)).into_response()
}

async fn redeem_license(State(db): State<Db>, Json(input): Json<RedeemRequest>) -> Response {
    let code = input.code.trim().to_string();
    let machine_id = input.machine_id.trim().to_string();
    if code.is_empty() || machine_id.is_empty() {
        return detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            "code and machine_id are required",
        );
    }

    let mut backend = db.write().await;
    if !backend.codes.contains(&code) {
        return detail(StatusCode::BAD_REQUEST, "Invalid license code");
    }
    let owner = backend.redeemed.get(&code).cloned();
    match owner {
        Some(owner) if owner != machine_id => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "message": "License code already used on another machine" })),
            )
                .into_response();
        }
        Some(_) => {}
        None => {
            info!(%code, %machine_id, "license redeemed");
            backend.redeemed.insert(code, machine_id.clone());
        }
    }
    Json(backend.status(&machine_id)).into_response()
}

/// Numeric dotted-version comparison; a leading `v` is ignored.
fn is_newer(latest: &str, current: &str) -> bool {
    parse_version(latest) > parse_version(current)
}

fn parse_version(version: &str) -> Vec<u64> {
    let mut parts: Vec<u64> = version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .map(|part| {
            part.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        })
        .collect();
    while parts.last() == Some(&0) {
        parts.pop();
    }
    parts
}
