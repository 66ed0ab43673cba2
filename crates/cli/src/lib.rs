use anyhow::{Context as AnyhowContext, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use clap::{Args, Parser, Subcommand};
use rethink_pipeline::{
    Analyzer, HttpTutorClient, Notice, PipelineConfig, Prepared, TextSource, TutorApi,
};
use rethink_protocol::{
    AnalyzeRequest, ChatRequest, ErrorCode, HealthResponse, Subject, HEALTH_STATUS_OK,
};
use rethink_tutor::{build_provider, TutorService};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod http_api;
mod server_security;

use config::{ServeConfig, ServeOverrides};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "rethink")]
#[command(about = "Socratic writing tutor: error detection and guided hints", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tutor API over HTTP (/health, /analyze, /chat)
    Serve(ServeArgs),

    /// Run one analysis cycle over a file (or stdin) against a running server
    Check(CheckArgs),

    /// Send one chat message for an existing session
    Chat(ChatArgs),

    /// Print JSON schemas of the wire types
    Schema,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address (default 127.0.0.1:$PORT, PORT defaults to 3000)
    #[arg(long)]
    bind: Option<String>,

    /// Allow binding to non-loopback addresses
    #[arg(long)]
    public: bool,

    /// Completion backend: openai|inference|stub (env: RETHINK_LLM_PROVIDER)
    #[arg(long)]
    provider: Option<String>,

    /// Model id (env: RETHINK_LLM_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Backend base URL (env: RETHINK_LLM_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Provider call timeout in milliseconds (env: RETHINK_LLM_TIMEOUT_MS)
    #[arg(long)]
    llm_timeout_ms: Option<u64>,

    /// Idle session lifetime in seconds (env: RETHINK_SESSION_TTL_SECS)
    #[arg(long)]
    session_ttl_secs: Option<u64>,

    /// Maximum live sessions (env: RETHINK_SESSION_CAPACITY)
    #[arg(long)]
    session_capacity: Option<usize>,
}

#[derive(Args)]
struct CheckArgs {
    /// File to analyze; reads stdin when omitted
    file: Option<PathBuf>,

    /// Server URL (env: RETHINK_SERVER_URL)
    #[arg(long)]
    server: Option<String>,

    /// Subject; detected from the content unit when omitted
    #[arg(long)]
    subject: Option<Subject>,

    /// Continue an existing session
    #[arg(long)]
    session: Option<String>,
}

#[derive(Args)]
struct ChatArgs {
    /// Session id returned by a previous analysis
    #[arg(long)]
    session: String,

    /// Server URL (env: RETHINK_SERVER_URL)
    #[arg(long)]
    server: Option<String>,

    /// Message to the tutor
    message: String,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Serve(args) => serve(args).await?,
        Commands::Check(args) => run_check(args).await?,
        Commands::Chat(args) => run_chat(args).await?,
        Commands::Schema => run_schema()?,
    }

    Ok(())
}

/// HTTP router over `service`: `/health`, `/analyze`, `/chat`, behind the origin policy.
pub fn app(service: Arc<TutorService>) -> Router {
    let state = Arc::new(HttpState { service });
    Router::new()
        .route("/health", get(http_health))
        .route("/analyze", post(http_analyze))
        .route("/chat", post(http_chat))
        .layer(middleware::from_fn(origin_guard))
        .with_state(state)
}

async fn serve(args: ServeArgs) -> Result<()> {
    let public = args.public;
    let config = ServeConfig::resolve(ServeOverrides {
        bind: args.bind,
        provider: args.provider,
        model: args.model,
        base_url: args.base_url,
        llm_timeout_ms: args.llm_timeout_ms,
        session_ttl_secs: args.session_ttl_secs,
        session_capacity: args.session_capacity,
    })?;
    let addrs = server_security::resolve_guarded_bind_addrs(&config.bind, public).await?;

    let provider = build_provider(&config.provider)
        .with_context(|| format!("Failed to configure {} provider", config.provider.kind))?;
    let service = Arc::new(TutorService::new(provider, config.tutor.clone()));

    tokio::spawn({
        let service = service.clone();
        let interval = config.purge_interval();
        async move {
            loop {
                tokio::time::sleep(interval).await;
                service.purge_expired();
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");
    log::info!(
        "rethink listening on {local_addr} (provider={}, model={})",
        config.provider.kind,
        config.provider.model
    );

    print_stdout(&format!("Serving tutor API: {base_url}"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    if public {
        let addrs = addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        print_stdout(&format!(
            "Public bind enabled (--public). Resolved addresses: {addrs}"
        ))?;
    }

    axum::serve(listener, app(service)).await?;
    Ok(())
}

struct HttpState {
    service: Arc<TutorService>,
}

async fn http_health() -> Result<Response, StatusCode> {
    let body = HealthResponse {
        status: HEALTH_STATUS_OK.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    };
    http_api::build_response(StatusCode::OK, &body)
}

async fn http_analyze(
    State(state): State<Arc<HttpState>>,
    body: axum::body::Bytes,
) -> Result<Response, StatusCode> {
    let request: AnalyzeRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return http_api::error_response(
                ErrorCode::InvalidRequest,
                format!("Invalid JSON request: {err}"),
            )
        }
    };
    match state.service.analyze(request).await {
        Ok(response) => http_api::build_response(StatusCode::OK, &response),
        Err(err) => http_api::envelope_response(&err.envelope()),
    }
}

async fn http_chat(
    State(state): State<Arc<HttpState>>,
    body: axum::body::Bytes,
) -> Result<Response, StatusCode> {
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return http_api::error_response(
                ErrorCode::InvalidRequest,
                format!("Invalid JSON request: {err}"),
            )
        }
    };
    match state.service.chat(request).await {
        Ok(response) => http_api::build_response(StatusCode::OK, &response),
        Err(err) => http_api::envelope_response(&err.envelope()),
    }
}

async fn origin_guard(request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !server_security::origin_allowed(origin.as_deref()) {
        log::warn!("rejected request from origin {origin:?}");
        return http_api::error_response(ErrorCode::OriginRejected, "Origin not allowed")
            .into_response();
    }

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    if let Some(value) = origin.and_then(|o| HeaderValue::from_str(&o).ok()) {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("content-type"),
        );
        headers.insert(header::VARY, HeaderValue::from_static("origin"));
    }
    response
}

async fn run_check(args: CheckArgs) -> Result<()> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let mut client = HttpTutorClient::new(config::server_url(args.server))?;
    if let Some(session) = args.session {
        client = client.with_session(session);
    }
    let client = Arc::new(client);

    let (analyzer, mut notices) =
        Analyzer::new(TextSource::new(text), client.clone(), PipelineConfig::default())?;
    let mut analyzer = match args.subject {
        Some(subject) => analyzer.with_subject(subject),
        None => analyzer,
    };

    let prepared = analyzer.analyze_now().await;
    while let Ok(notice) = notices.try_recv() {
        if let Notice::Failed { message } = notice {
            anyhow::bail!("analysis failed: {message}");
        }
    }

    let output = match &prepared {
        Prepared::Dispatch(call) => serde_json::json!({
            "sessionId": client.session_id(),
            "subject": call.subject,
            "newContent": call.new_content,
            "hasError": analyzer.last_result().is_some_and(|r| r.has_error),
            "location": analyzer.last_result().and_then(|r| r.location.clone()),
            "hasActiveError": analyzer.active_error().is_some(),
        }),
        Prepared::Skipped(verdict) => serde_json::json!({
            "skipped": format!("{verdict:?}"),
        }),
        Prepared::Disabled | Prepared::SourceFailed => serde_json::json!({
            "skipped": format!("{prepared:?}"),
        }),
    };
    print_stdout(&serde_json::to_string_pretty(&output)?)
}

async fn run_chat(args: ChatArgs) -> Result<()> {
    let client = HttpTutorClient::new(config::server_url(args.server))?.with_session(args.session);
    let response = client.chat(&args.message).await?;
    print_stdout(&serde_json::to_string_pretty(&response)?)
}

fn run_schema() -> Result<()> {
    let schemas: serde_json::Map<String, serde_json::Value> = rethink_protocol::wire_schemas()
        .into_iter()
        .map(|(name, schema)| -> Result<(String, serde_json::Value)> {
            Ok((name.to_string(), serde_json::to_value(schema)?))
        })
        .collect::<Result<_>>()?;
    print_stdout(&serde_json::to_string_pretty(&schemas)?)
}
