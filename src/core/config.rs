use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub swagger: SwaggerConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Technical report generation settings
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// CNPJ of the company that issues reports when a session has no explicit company
    pub default_company_tax_id: String,
    /// Legal name used when seeding the default company
    pub default_company_name: String,
    /// Logo reference used when seeding the default company
    pub default_company_logo_url: Option<String>,
    /// Directory that relative asset references (logo, background) resolve against
    pub assets_dir: PathBuf,
    /// Optional TTF font embedded in generated PDFs (builtin Helvetica otherwise)
    pub font_path: Option<PathBuf>,
    /// Optional bold TTF used with `font_path` (builtin Helvetica Bold otherwise)
    pub bold_font_path: Option<PathBuf>,
    /// Page margin in millimeters
    pub margin_mm: f32,
    /// Maximum number of photos per report session
    pub max_photos: usize,
    /// Maximum size of a single photo in bytes
    pub max_photo_size: usize,
    /// Sessions untouched for longer than this are dropped
    pub session_idle_timeout: Duration,
    /// Timeout for fetching remote assets
    pub asset_fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            report: ReportConfig::from_env()?,
        })
    }
}

impl AppConfig {
    // 20 photos of 5MB each plus multipart overhead
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 110 * 1024 * 1024;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "GM-App API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "API documentation for GM-App".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl ReportConfig {
    const DEFAULT_COMPANY_CNPJ: &'static str = "37.097.718/0001-58";
    const DEFAULT_COMPANY_NAME: &'static str = "GM MANUTENÇÕES LTDA";
    const DEFAULT_COMPANY_LOGO_URL: &'static str = "/relatorio-tecnico/logo.png";
    const DEFAULT_MARGIN_MM: f32 = 20.0;
    const DEFAULT_MAX_PHOTOS: usize = 20;
    const DEFAULT_MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024; // 5MB
    const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 4 * 3600; // 4 hours
    const DEFAULT_ASSET_FETCH_TIMEOUT_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let default_company_tax_id = env::var("DEFAULT_COMPANY_CNPJ")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_COMPANY_CNPJ.to_string());

        let default_company_name = env::var("DEFAULT_COMPANY_NAME")
            .unwrap_or_else(|_| Self::DEFAULT_COMPANY_NAME.to_string());

        // An explicitly empty value disables the seeded logo
        let default_company_logo_url = match env::var("DEFAULT_COMPANY_LOGO_URL") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value),
            Err(_) => Some(Self::DEFAULT_COMPANY_LOGO_URL.to_string()),
        };

        let assets_dir =
            PathBuf::from(env::var("ASSETS_DIR").unwrap_or_else(|_| "./public".to_string()));

        let font_path = env::var("PDF_FONT_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let bold_font_path = env::var("PDF_BOLD_FONT_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let margin_mm = env::var("PDF_MARGIN_MM")
            .unwrap_or_else(|_| Self::DEFAULT_MARGIN_MM.to_string())
            .parse::<f32>()
            .map_err(|_| "PDF_MARGIN_MM must be a valid number".to_string())?;

        if !(0.0..=60.0).contains(&margin_mm) {
            return Err("PDF_MARGIN_MM must be between 0 and 60".to_string());
        }

        let max_photos = env::var("MAX_PHOTOS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_PHOTOS.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_PHOTOS must be a valid number".to_string())?;

        let max_photo_size = env::var("MAX_PHOTO_SIZE_BYTES")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_PHOTO_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_PHOTO_SIZE_BYTES must be a valid number".to_string())?;

        let session_idle_timeout_secs = env::var("SESSION_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_SESSION_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "SESSION_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let asset_fetch_timeout_secs = env::var("ASSET_FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ASSET_FETCH_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "ASSET_FETCH_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            default_company_tax_id,
            default_company_name,
            default_company_logo_url,
            assets_dir,
            font_path,
            bold_font_path,
            margin_mm,
            max_photos,
            max_photo_size,
            session_idle_timeout: Duration::from_secs(session_idle_timeout_secs),
            asset_fetch_timeout: Duration::from_secs(asset_fetch_timeout_secs),
        })
    }
}
