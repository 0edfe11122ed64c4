mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::companies::{
    routes as companies_routes, CompanyRepository, CompanyService, DefaultCompany,
    PgCompanyRepository,
};
use crate::features::presets::{
    routes as presets_routes, PgPresetRepository, PresetRepository, PresetService,
};
use crate::features::report_builder::{
    routes as report_builder_routes, ReportPdfService, ReportSessionService, SessionLimits,
};
use crate::modules::assets::AssetLoader;
use crate::modules::pdf::{PdfConfig, PdfFonts};
use axum::{middleware::from_fn, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const SESSION_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Log system info
    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Repositories
    let company_repository: Arc<dyn CompanyRepository> =
        Arc::new(PgCompanyRepository::new(pool.clone()));
    let preset_repository: Arc<dyn PresetRepository> =
        Arc::new(PgPresetRepository::new(pool.clone()));

    // Initialize Company Service
    let company_service = Arc::new(CompanyService::new(
        company_repository,
        Arc::clone(&preset_repository),
        DefaultCompany {
            legal_name: config.report.default_company_name.clone(),
            tax_id: config.report.default_company_tax_id.clone(),
            logo_url: config.report.default_company_logo_url.clone(),
        },
    ));
    tracing::info!(
        "Company service initialized (default CNPJ: {})",
        config.report.default_company_tax_id
    );

    // Initialize Preset Service (contract and report templates)
    let preset_service = Arc::new(PresetService::new(
        preset_repository,
        Arc::clone(&company_service),
    ));
    tracing::info!("Preset service initialized");

    // Initialize PDF generation
    let asset_loader = Arc::new(
        AssetLoader::new(
            config.report.assets_dir.clone(),
            config.report.asset_fetch_timeout,
        )
        .map_err(|e| anyhow::anyhow!("Failed to initialize asset loader: {}", e))?,
    );
    tracing::info!(
        "Asset loader initialized (dir: {})",
        asset_loader.assets_dir().display()
    );

    let fonts = match &config.report.font_path {
        Some(path) => {
            let regular = read_font(path).await?;
            let bold = match &config.report.bold_font_path {
                Some(bold_path) => Some(read_font(bold_path).await?),
                None => None,
            };
            tracing::info!(
                "PDF font loaded from {} (bold: {})",
                path.display(),
                if bold.is_some() { "custom" } else { "builtin Helvetica Bold" }
            );
            Some(PdfFonts { regular, bold })
        }
        None => {
            if config.report.bold_font_path.is_some() {
                tracing::warn!("PDF_BOLD_FONT_PATH is ignored without PDF_FONT_PATH");
            }
            tracing::info!("No PDF font configured, using builtin Helvetica");
            None
        }
    };

    let report_pdf_service = Arc::new(ReportPdfService::new(
        Arc::clone(&company_service),
        asset_loader,
        PdfConfig::with_margin(config.report.margin_mm),
        fonts,
    ));
    tracing::info!("Report PDF service initialized");

    // Initialize Report Session Service and its idle sweeper
    let report_session_service = Arc::new(ReportSessionService::new(
        Arc::clone(&preset_service),
        report_pdf_service,
        SessionLimits {
            max_photos: config.report.max_photos,
            max_photo_size: config.report.max_photo_size,
            idle_timeout: config.report.session_idle_timeout,
        },
    ));
    report_session_service.spawn_idle_sweeper(SESSION_SWEEP_INTERVAL);
    tracing::info!(
        "Report session service initialized (max {} photos of {} bytes, idle timeout {:?})",
        config.report.max_photos,
        config.report.max_photo_size,
        config.report.session_idle_timeout
    );

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let api_routes = Router::new()
        .merge(companies_routes::routes(company_service))
        .merge(presets_routes::contract_routes(Arc::clone(&preset_service)))
        .merge(presets_routes::report_routes(preset_service))
        .merge(report_builder_routes::routes(
            report_session_service,
            config.app.max_request_body_size,
        ));

    let app = Router::new()
        .merge(swagger)
        .merge(api_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}

async fn read_font(path: &std::path::Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read PDF font {}: {}", path.display(), e))
}
