use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use base64::{prelude::BASE64_STANDARD, Engine};
use tracing::{debug, error, info};
use tower_http::{cors::CorsLayer, services::ServeDir};

use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{
    log_requests, metrics, state::*, ApiError, ClientIdentity, ServerConfig,
};
use crate::audio::GenerationRequest;
use crate::composer::{
    render_generation_prompt, ComposeContext, Composer, InputTrait, MusicSpecification,
};
use crate::refiner::{PromptRefiner, RefineOutcome};
use crate::usage::UsageStatus;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub categories: usize,
    pub charms: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug, Default)]
struct Constellation {
    #[serde(default)]
    pub traits: Vec<InputTrait>,
}

#[derive(Deserialize, Debug, Default)]
struct ComposeBody {
    #[serde(default)]
    pub constellation: Constellation,
    #[serde(default)]
    pub context: ComposeContext,
    /// Only honoured by `/v1/compose`; generation always refines when it can.
    pub refine: Option<bool>,
}

#[derive(Serialize)]
struct ComposeResponse {
    spec: MusicSpecification,
    draft_prompt: String,
    prompt: String,
    refined: bool,
    refinement: RefineOutcome,
}

#[derive(Serialize)]
struct GenerateResponse {
    generation_id: String,
    created_at: String,
    audio_base64: String,
    mime: String,
    spec: MusicSpecification,
    draft_prompt: String,
    prompt: String,
    refinement: RefineOutcome,
    remaining: Option<u32>,
    used: u32,
}

#[derive(Serialize)]
struct CharmView<'a> {
    charm_name: &'a str,
    keywords: &'a [String],
}

#[derive(Serialize)]
struct CategoryView<'a> {
    category_name: &'a str,
    root_note: &'static str,
    solfege: &'static str,
    charms: Vec<CharmView<'a>>,
}

#[derive(Serialize)]
struct DebugReport {
    llm_provider: Option<String>,
    llm_model: Option<String>,
    refinement_enabled: bool,
    audio_generator: String,
    audio_configured: bool,
    output_format: &'static str,
    default_duration_seconds: u32,
    max_duration_seconds: u32,
    usage_enabled: bool,
    usage_max_uses: u32,
    usage_reset_window_hours: Option<u64>,
}

struct Composition {
    spec: MusicSpecification,
    draft_prompt: String,
    prompt: String,
    refinement: RefineOutcome,
}

/// Edge validation: stages clamped into range, duration capped.
fn edge_inputs(body: &ComposeBody, config: &ServerConfig) -> (Vec<InputTrait>, ComposeContext) {
    let traits = body
        .constellation
        .traits
        .iter()
        .cloned()
        .map(InputTrait::clamped)
        .collect();
    let context = ComposeContext {
        duration_seconds: body
            .context
            .duration_seconds
            .filter(|d| *d > 0)
            .map(|d| d.min(config.max_duration_seconds)),
    };
    (traits, context)
}

async fn compose_and_refine(
    config: &ServerConfig,
    composer: &Composer,
    refiner: &PromptRefiner,
    body: &ComposeBody,
    refine: bool,
) -> Result<Composition, ApiError> {
    let (traits, context) = edge_inputs(body, config);
    let spec = composer.compose(&traits, context)?;
    metrics::record_composition(spec.mode.as_str());

    let draft_prompt = composer.render(&spec);
    let (prompt, refinement) = if refine {
        let refinement = refiner.refine(&spec, &draft_prompt).await;
        (refinement.prompt, refinement.outcome)
    } else {
        (draft_prompt.clone(), RefineOutcome::Disabled)
    };

    Ok(Composition {
        spec,
        draft_prompt,
        prompt,
        refinement,
    })
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let knowledge_base = state.composer.knowledge_base();
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        categories: knowledge_base.category_count(),
        charms: knowledge_base.charm_count(),
    };
    Json(stats)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn debugz(State(state): State<ServerState>) -> impl IntoResponse {
    let policy = state.usage.policy();
    Json(DebugReport {
        llm_provider: state.refiner.provider_name().map(str::to_string),
        llm_model: state.refiner.model().map(str::to_string),
        refinement_enabled: state.refiner.is_enabled(),
        audio_generator: state.audio.name().to_string(),
        audio_configured: state.audio.is_configured(),
        output_format: state.config.output_format.as_str(),
        default_duration_seconds: state.composer.default_duration_seconds(),
        max_duration_seconds: state.config.max_duration_seconds,
        usage_enabled: policy.enabled,
        usage_max_uses: policy.max_uses,
        usage_reset_window_hours: policy.reset_window.map(|w| w.as_secs() / 3600),
    })
}

async fn get_charms(State(composer): State<Composer>) -> impl IntoResponse {
    let categories: Vec<CategoryView> = composer
        .knowledge_base()
        .categories()
        .iter()
        .map(|category| CategoryView {
            category_name: &category.category_name,
            root_note: category.root_note.as_str(),
            solfege: category.root_note.solfege(),
            charms: category
                .charms
                .iter()
                .map(|charm| CharmView {
                    charm_name: &charm.charm_name,
                    keywords: &charm.keywords,
                })
                .collect(),
        })
        .collect();
    Json(categories).into_response()
}

async fn get_usage(
    State(usage): State<GuardedUsageLimiter>,
    client: ClientIdentity,
) -> Json<UsageStatus> {
    Json(usage.status(client.as_str()))
}

async fn post_compose(
    State(state): State<ServerState>,
    body: Result<Json<ComposeBody>, JsonRejection>,
) -> Result<Json<ComposeResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let refine = body.refine.unwrap_or(true);

    let composition =
        compose_and_refine(&state.config, &state.composer, &state.refiner, &body, refine).await?;

    Ok(Json(ComposeResponse {
        refined: composition.refinement == RefineOutcome::Refined,
        refinement: composition.refinement,
        spec: composition.spec,
        draft_prompt: composition.draft_prompt,
        prompt: composition.prompt,
    }))
}

async fn post_generate(
    State(state): State<ServerState>,
    client: ClientIdentity,
    body: Result<Json<ComposeBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    // Quota is checked before any work; the slot is released if anything fails.
    let ticket = match state.usage.reserve(client.as_str()) {
        Ok(ticket) => ticket,
        Err(status) => {
            info!("Usage limit reached for {} ({} used)", client.as_str(), status.used);
            metrics::record_usage_denial("/v1/generate");
            return Err(ApiError::UsageExhausted(status));
        }
    };

    let composition =
        compose_and_refine(&state.config, &state.composer, &state.refiner, &body, true).await?;

    let request = GenerationRequest {
        prompt: render_generation_prompt(&composition.prompt, &composition.spec),
        duration_seconds: composition.spec.duration_seconds,
        output_format: state.config.output_format,
    };

    debug!(
        "Generating {}s of audio for {} with {}",
        request.duration_seconds,
        client.as_str(),
        state.audio.name()
    );
    let start = Instant::now();
    let audio = match state.audio.generate(&request).await {
        Ok(audio) => {
            metrics::record_generation("success", start.elapsed());
            audio
        }
        Err(err) => {
            metrics::record_generation(err.kind(), start.elapsed());
            error!("Audio generation for {} failed: {}", client.as_str(), err);
            return Err(err.into());
        }
    };

    let usage = ticket.commit();
    info!(
        "Generated {} bytes of {} for {} ({} used)",
        audio.bytes.len(),
        audio.mime,
        client.as_str(),
        usage.used
    );

    Ok(Json(GenerateResponse {
        generation_id: uuid::Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        audio_base64: BASE64_STANDARD.encode(&audio.bytes),
        mime: audio.mime,
        spec: composition.spec,
        draft_prompt: composition.draft_prompt,
        prompt: request.prompt,
        refinement: composition.refinement,
        remaining: usage.remaining,
        used: usage.used,
    }))
}

pub fn make_app(
    config: ServerConfig,
    composer: Composer,
    refiner: PromptRefiner,
    audio: GuardedAudioGenerator,
    usage: GuardedUsageLimiter,
) -> Router {
    let state = ServerState::new(config.clone(), composer, refiner, audio, usage);

    let api_routes: Router = Router::new()
        .route("/charms", get(get_charms))
        .route("/usage", get(get_usage))
        .route("/compose", post(post_compose))
        .route("/generate", post(post_generate))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)).with_state(state.clone()),
    };

    home_router
        .route("/healthz", get(healthz))
        .merge(
            Router::new()
                .route("/debugz", get(debugz))
                .with_state(state.clone()),
        )
        .nest("/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(state, log_requests))
}

fn spawn_usage_cleanup(usage: GuardedUsageLimiter, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = usage.cleanup_stale_entries();
            if removed > 0 {
                debug!("Evicted {} expired usage entries", removed);
            }
            metrics::set_usage_tracked_identities(usage.tracked_identities());
        }
    });
}

async fn run_metrics_server(port: u16) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics::metrics_handler));
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", port))?;
    Ok(axum::serve(listener, app).await?)
}

pub async fn run_server(
    config: ServerConfig,
    composer: Composer,
    refiner: PromptRefiner,
    audio: GuardedAudioGenerator,
    usage: GuardedUsageLimiter,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;

    if usage.policy().enabled {
        spawn_usage_cleanup(usage.clone(), config.usage_cleanup_interval);
    }

    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(metrics_port).await {
            error!("Metrics server stopped: {:#}", e);
        }
    });

    let app = make_app(config, composer, refiner, audio, usage);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    Ok(axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?)
}
