use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use colored::Colorize;
use std::sync::Arc;
use tokio::sync::Mutex;

use offchat_chat::ChatExchange;
use offchat_llm_api::InferenceError;
use offchat_logging::safe_truncate;
use offchat_store::{validate_registration, ChatStore, StoreError};
use offchat_types::{ChatRecord, ConversationSummary, DisplayMessage};

use crate::web::{
    protocol::{
        ChatRequest, ChatResponse, LoginRequest, RegisterRequest, StatusResponse, MSG_DB_UNAVAILABLE,
        MSG_LOGIN_AGAIN, MSG_LOGIN_FAILED, MSG_REGISTERED, MSG_USER_EXISTS,
    },
    session_manager::{SessionRegistry, SessionToken},
};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "offchat_session";

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub exchange: ChatExchange,
    /// `None` when the data directory could not be opened
    pub store: Option<Arc<dyn ChatStore>>,
    /// One generation at a time against the single model
    pub generation_lock: Arc<Mutex<()>>,
    pub verbose: bool,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        exchange: ChatExchange,
        store: Option<Arc<dyn ChatStore>>,
        verbose: bool,
    ) -> Self {
        Self {
            sessions,
            exchange,
            store,
            generation_lock: Arc::new(Mutex::new(())),
            verbose,
        }
    }

    /// Token and username of the request's session, if logged in
    async fn current_user(&self, headers: &HeaderMap) -> Option<(SessionToken, String)> {
        let token = session_token(headers)?;
        let username = self.sessions.resolve(&token).await?;
        Some((token, username))
    }
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Account routes
        .route("/login", get(serve_login).post(login))
        .route("/register", post(register))
        .route("/logout", get(logout))
        // Chat page and API
        .route("/", get(serve_index))
        .route("/get_response", post(get_response))
        .route("/api/history", get(history_list))
        .route("/api/load_chat/:conv_id", get(load_chat))
        .route("/new_chat", post(new_chat))
        .route("/clear_all", post(clear_all))
        .with_state(state)
}

/// Read the session token from the Cookie header(s)
fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionToken::parse_str(value.trim()).ok())
}

fn session_cookie(token: &SessionToken) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token)
}

fn expired_session_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// GET /login - Serve login page
async fn serve_login() -> Html<&'static str> {
    Html(include_str!("../../web/login.html"))
}

/// GET / - Serve chat page, or send anonymous visitors to /login
async fn serve_index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.current_user(&headers).await {
        Some((_, username)) => {
            let page = include_str!("../../web/index.html").replace("{{username}}", &escape_html(&username));
            Html(page).into_response()
        }
        None => Redirect::to("/login").into_response(),
    }
}

/// POST /login - Check credentials and start a session
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let username = payload.username.trim();

    let valid = match &state.store {
        Some(store) if !username.is_empty() => store.login_user(username, &payload.password).await?,
        _ => false,
    };
    if !valid {
        return Ok(Json(StatusResponse::fail(MSG_LOGIN_FAILED)).into_response());
    }

    let token = state.sessions.login(username).await;
    if state.verbose {
        println!(
            "{} {} ({} active)",
            "[web] login:".bright_black(),
            username,
            state.sessions.active_users().await
        );
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, session_cookie(&token))]),
        Json(StatusResponse::success()),
    )
        .into_response())
}

/// POST /register - Validate the form and create an account
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    if let Err(e) = validate_registration(&payload.username, &payload.password, &payload.confirm_password) {
        return Ok(Json(StatusResponse::fail(e.to_string())));
    }

    let Some(store) = &state.store else {
        return Ok(Json(StatusResponse::fail(MSG_DB_UNAVAILABLE)));
    };

    match store.register_user(payload.username.trim(), &payload.password).await {
        Ok(()) => Ok(Json(StatusResponse::success_with(MSG_REGISTERED))),
        Err(StoreError::UserExists(_)) => Ok(Json(StatusResponse::fail(MSG_USER_EXISTS))),
        Err(e) => Err(e.into()),
    }
}

/// GET /logout - End the session and return to the login page
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        state.sessions.logout(&token).await;
    }
    (
        AppendHeaders([(header::SET_COOKIE, expired_session_cookie())]),
        Redirect::to("/login"),
    )
}

/// POST /get_response - Run one exchange in the user's conversation
async fn get_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let login_again = || {
        Json(ChatResponse {
            response: MSG_LOGIN_AGAIN.to_string(),
        })
    };

    let Some((_, username)) = state.current_user(&headers).await else {
        return Ok(login_again());
    };
    let Some(session) = state.sessions.session(&username).await else {
        return Ok(login_again());
    };

    let message = payload.msg.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is empty".into()));
    }
    if state.verbose {
        println!("{} {}: {}", "[web]".bright_black(), username, safe_truncate(message, 60));
    }

    let mut session = session.lock().await;
    let response = {
        let _generation = state.generation_lock.lock().await;
        state.exchange.respond(&mut session.history, message).await?
    };

    if let Some(store) = &state.store {
        let record = ChatRecord {
            timestamp: Utc::now(),
            user_message: message.to_string(),
            assistant_response: response.clone(),
            conversation_id: session.conversation_id.clone(),
            owner: username.clone(),
        };
        if let Err(e) = store.save_message(record).await {
            eprintln!("{} Failed to save message: {}", "⚠️".yellow(), e);
        }
    }

    Ok(Json(ChatResponse { response }))
}

/// GET /api/history - The user's saved conversations, newest first
async fn history_list(State(state): State<AppState>, headers: HeaderMap) -> Json<Vec<ConversationSummary>> {
    let (Some((_, username)), Some(store)) = (state.current_user(&headers).await, &state.store) else {
        return Json(Vec::new());
    };

    match store.conversation_list(&username).await {
        Ok(list) => Json(list),
        Err(e) => {
            eprintln!("{} Failed to list conversations: {}", "⚠️".yellow(), e);
            Json(Vec::new())
        }
    }
}

/// GET /api/load_chat/:conv_id - Reopen a saved conversation
async fn load_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conv_id): Path<String>,
) -> Result<Json<Vec<DisplayMessage>>, AppError> {
    let Some((_, username)) = state.current_user(&headers).await else {
        return Ok(Json(Vec::new()));
    };
    let Some(session) = state.sessions.session(&username).await else {
        return Ok(Json(Vec::new()));
    };

    let records = match &state.store {
        Some(store) => store.messages(&conv_id, &username).await?,
        None => Vec::new(),
    };

    session.lock().await.resume(&conv_id, &records);

    let messages = records
        .into_iter()
        .flat_map(|r| {
            [
                DisplayMessage::user(r.user_message),
                DisplayMessage::bot(r.assistant_response),
            ]
        })
        .collect();
    Ok(Json(messages))
}

/// POST /new_chat - Start a fresh conversation
async fn new_chat(State(state): State<AppState>, headers: HeaderMap) -> Json<StatusResponse> {
    if let Some((_, username)) = state.current_user(&headers).await {
        if let Some(session) = state.sessions.session(&username).await {
            session.lock().await.start_new_conversation();
        }
    }
    Json(StatusResponse::success())
}

/// POST /clear_all - Delete the user's saved conversations, then start fresh
async fn clear_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, AppError> {
    if let (Some((_, username)), Some(store)) = (state.current_user(&headers).await, &state.store) {
        store.delete_all_conversations(&username).await?;
    }
    Ok(new_chat(State(state), headers).await)
}

/// Error type for route handlers
#[derive(Debug)]
pub enum AppError {
    Store(StoreError),
    Inference(InferenceError),
    BadRequest(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::Inference(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Store(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Inference(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
