use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// Bearer token the server treats as revoked.
pub const REVOKED_TOKEN: &str = "revoked";
/// The only OTP `start_visit` accepts.
pub const VALID_OTP: &str = "1234";
/// Password the token endpoint always rejects.
pub const REJECTED_PASSWORD: &str = "wrong-password";
/// Member number eligibility lookups report as unknown.
pub const UNKNOWN_MEMBER: &str = "UNKNOWN";

const CLAIM_KEYS: &[&str] = &[
    "payer_code",
    "payer_name",
    "patient_name",
    "member_number",
    "scheme_name",
    "visit_number",
    "visit_start",
    "visit_end",
    "icd10_codes",
];
const INVOICE_KEYS: &[&str] = &["claim", "invoice_number", "invoice_date", "lines"];
const START_VISIT_KEYS: &[&str] = &[
    "beneficiary_id",
    "factors",
    "benefit_type",
    "benefit_code",
    "policy_number",
    "policy_effective_date",
    "otp",
    "beneficiary_contact",
];
const VALIDATE_TOKEN_KEYS: &[&str] = &["first_name", "last_name", "member_number", "auth_token"];
const RESERVATION_KEYS: &[&str] = &["authorization", "invoice_number", "amount"];

#[derive(Debug, Default)]
pub struct Store {
    pub claims: HashMap<String, Value>,
    pub invoices: HashMap<String, Value>,
    pub attachments: Vec<Value>,
    pub remittances: HashMap<u64, Value>,
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, Json<Value>);
type Created = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with_store(Db::default())
}

pub fn app_with_store(db: Db) -> Router {
    Router::new()
        .route("/oauth2/token/", post(issue_token))
        .route("/v1/claims/", post(create_claim))
        .route(
            "/v1/claim_attachments/upload_attachment/",
            post(upload_claim_attachment),
        )
        .route("/v1/invoices", post(create_invoice))
        .route(
            "/v1/invoice_attachments/upload_attachment/",
            post(upload_invoice_attachment),
        )
        .route("/v1/beneficiaries/member_eligibility", get(member_eligibility))
        .route(
            "/v1/beneficiaries/beneficiary_contacts/{id}/send_otp/",
            post(send_otp),
        )
        .route("/v1/authorizations/start_visit/", post(start_visit))
        .route(
            "/v1/authorizations/validate_authorization_token/",
            post(validate_authorization_token),
        )
        .route(
            "/v1/balances/reservations/reserve_from_authorization/",
            post(reserve_balance),
        )
        .route("/v1/remittances", get(list_remittances))
        .route("/v1/remittances/claim_remittance", get(claim_remittance))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn failure(status: StatusCode, detail: &str) -> Failure {
    (status, Json(json!({ "detail": detail })))
}

fn field_error(field: &str, message: &str) -> Failure {
    (StatusCode::BAD_REQUEST, Json(json!({ field: [message] })))
}

fn authorize(headers: &HeaderMap) -> Result<String, Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty());
    match token {
        Some(REVOKED_TOKEN) => Err(failure(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were revoked.",
        )),
        Some(token) => Ok(token.to_string()),
        None => Err(failure(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided.",
        )),
    }
}

fn require_keys(body: &Value, keys: &[&str]) -> Result<(), Failure> {
    let errors: Map<String, Value> = keys
        .iter()
        .filter(|key| body.get(**key).map_or(true, Value::is_null))
        .map(|key| (key.to_string(), json!(["This field is required."])))
        .collect();
    if errors.is_empty() {
        return Ok(());
    }
    Err((StatusCode::BAD_REQUEST, Json(Value::Object(errors))))
}

/// Add `id` plus any extra fields to a JSON object and return its id.
fn assign_id(body: &mut Value, extra: &[(&str, Value)]) -> String {
    let id = Uuid::new_v4().to_string();
    if let Some(object) = body.as_object_mut() {
        object.insert("id".to_string(), json!(id));
        for (key, value) in extra {
            object.insert(key.to_string(), value.clone());
        }
    }
    id
}

#[derive(Deserialize)]
struct TokenForm {
    #[serde(default)]
    grant_type: String,
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn issue_token(Form(form): Form<TokenForm>) -> Result<Json<Value>, Failure> {
    if form.grant_type != "password" {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        ));
    }
    if form.client_id.is_empty()
        || form.username.is_empty()
        || form.password.is_empty()
        || form.password == REJECTED_PASSWORD
    {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_grant" })),
        ));
    }
    info!(client_id = %form.client_id, "token issued");
    Ok(Json(json!({
        "access_token": format!("mock-{}", Uuid::new_v4().simple()),
        "expires_in": 3600,
        "token_type": "Bearer",
    })))
}

async fn create_claim(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Result<Created, Failure> {
    authorize(&headers)?;
    require_keys(&body, CLAIM_KEYS)?;
    let id = assign_id(&mut body, &[("status", json!("DRAFT"))]);
    info!(%id, "claim created");
    db.write().await.claims.insert(id, body.clone());
    Ok((StatusCode::CREATED, Json(body)))
}

async fn create_invoice(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Result<Created, Failure> {
    authorize(&headers)?;
    require_keys(&body, INVOICE_KEYS)?;
    let claim = body["claim"].as_str().unwrap_or_default().to_string();

    let mut store = db.write().await;
    if !store.claims.contains_key(&claim) {
        return Err(field_error(
            "claim",
            &format!("Invalid pk \"{claim}\" - object does not exist."),
        ));
    }
    let invoice_type = body
        .get("invoice_type")
        .cloned()
        .unwrap_or_else(|| json!("INVOICE"));
    let id = assign_id(&mut body, &[("invoice_type", invoice_type)]);
    info!(%id, %claim, "invoice created");
    store.invoices.insert(id, body.clone());
    Ok((StatusCode::CREATED, Json(body)))
}

#[derive(Default)]
struct Upload {
    fields: HashMap<String, String>,
    file_name: Option<String>,
    size: Option<usize>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, Failure> {
    let mut upload = Upload::default();
    let bad = |e: axum::extract::multipart::MultipartError| {
        failure(StatusCode::BAD_REQUEST, &e.to_string())
    };
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "attachment" {
            upload.file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(bad)?;
            upload.size = Some(bytes.len());
        } else {
            let text = field.text().await.map_err(bad)?;
            upload.fields.insert(name, text);
        }
    }
    if upload.size.is_none() {
        return Err(field_error("attachment", "No file was submitted."));
    }
    Ok(upload)
}

fn attachment_record(upload: Upload, owner: &str) -> Value {
    let mut record = json!({
        "id": Uuid::new_v4().to_string(),
        "file_name": upload.file_name,
        "size": upload.size,
    });
    if let Some(object) = record.as_object_mut() {
        for (key, value) in upload.fields {
            object.insert(key, json!(value));
        }
        object.insert("owner".to_string(), json!(owner));
    }
    record
}

async fn upload_claim_attachment(
    State(db): State<Db>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Created, Failure> {
    authorize(&headers)?;
    let upload = read_upload(multipart).await?;
    let claim = upload.fields.get("claim").cloned().unwrap_or_default();
    if !upload.fields.contains_key("attachment_type") {
        return Err(field_error("attachment_type", "This field is required."));
    }

    let mut store = db.write().await;
    if !store.claims.contains_key(&claim) {
        return Err(field_error(
            "claim",
            &format!("Invalid pk \"{claim}\" - object does not exist."),
        ));
    }
    let record = attachment_record(upload, &claim);
    store.attachments.push(record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn upload_invoice_attachment(
    State(db): State<Db>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Created, Failure> {
    authorize(&headers)?;
    let upload = read_upload(multipart).await?;
    let invoice = upload.fields.get("invoice").cloned().unwrap_or_default();

    let mut store = db.write().await;
    if !store.invoices.contains_key(&invoice) {
        return Err(field_error(
            "invoice",
            &format!("Invalid pk \"{invoice}\" - object does not exist."),
        ));
    }
    let record = attachment_record(upload, &invoice);
    store.attachments.push(record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Deserialize)]
struct EligibilityQuery {
    member_number: String,
    payer_slade_code: u64,
}

async fn member_eligibility(
    headers: HeaderMap,
    Query(query): Query<EligibilityQuery>,
) -> Result<Json<Value>, Failure> {
    authorize(&headers)?;
    if query.member_number == UNKNOWN_MEMBER {
        return Err(failure(StatusCode::NOT_FOUND, "Member not found."));
    }
    Ok(Json(json!({
        "member_number": query.member_number,
        "payer_slade_code": query.payer_slade_code,
        "beneficiary_id": 1001,
        "benefits": [{"benefit_type": "OUTPATIENT", "benefit_code": "OP-1"}],
        "contacts": [{"id": 31, "contact_type": "PHONE", "verified": true}],
    })))
}

async fn send_otp(headers: HeaderMap, Path(contact_id): Path<u64>) -> Result<Json<Value>, Failure> {
    authorize(&headers)?;
    Ok(Json(json!({ "detail": "OTP sent", "contact": contact_id })))
}

async fn start_visit(headers: HeaderMap, Json(body): Json<Value>) -> Result<Created, Failure> {
    authorize(&headers)?;
    require_keys(&body, START_VISIT_KEYS)?;
    if body["otp"] != VALID_OTP {
        return Err(field_error("otp", "Invalid OTP."));
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "edi_auth_guid": Uuid::new_v4().to_string(),
            "auth_token": format!("AUTH-{}", Uuid::new_v4().simple()),
            "beneficiary_id": body["beneficiary_id"],
        })),
    ))
}

async fn validate_authorization_token(
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Failure> {
    authorize(&headers)?;
    require_keys(&body, VALIDATE_TOKEN_KEYS)?;
    Ok(Json(json!({
        "valid": true,
        "member_number": body["member_number"],
    })))
}

async fn reserve_balance(headers: HeaderMap, Json(mut body): Json<Value>) -> Result<Created, Failure> {
    authorize(&headers)?;
    require_keys(&body, RESERVATION_KEYS)?;
    assign_id(&mut body, &[("status", json!("RESERVED"))]);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn list_remittances(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    authorize(&headers)?;
    let store = db.read().await;
    let results: Vec<Value> = store.remittances.values().cloned().collect();
    Ok(Json(json!({ "count": results.len(), "results": results })))
}

#[derive(Deserialize)]
struct RemittanceQuery {
    claim_id: u64,
}

async fn claim_remittance(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<RemittanceQuery>,
) -> Result<Json<Value>, Failure> {
    authorize(&headers)?;
    db.read()
        .await
        .remittances
        .get(&query.claim_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Not found."))
}
