use anyhow::{bail, Context, Result};

/// Longest presigned URL lifetime S3 accepts (seven days).
pub const MAX_SIGNED_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    /// Custom endpoint for MinIO / LocalStack; `None` uses AWS.
    pub s3_endpoint: Option<String>,
    pub s3_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub anthropic_api_key: String,
    pub auth: AuthConfig,
    /// Always within `1..=MAX_SIGNED_URL_TTL_SECS`.
    pub signed_url_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

/// Identity provider settings and the cookies that carry its tokens.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwks_url: String,
    pub issuer: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Hosted login page that `/api/auth/login` redirects to.
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub access_cookie: String,
    pub id_cookie: String,
    pub cookie_secure: bool,
    pub post_login_redirect: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| optional(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: optional("S3_ENDPOINT"),
            s3_region: or_default("S3_REGION", "us-east-1"),
            aws_access_key_id: optional("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional("AWS_SECRET_ACCESS_KEY"),
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            auth: AuthConfig {
                jwks_url: require("AUTH_JWKS_URL")?,
                issuer: require("AUTH_ISSUER")?,
                client_id: require("AUTH_CLIENT_ID")?,
                client_secret: optional("AUTH_CLIENT_SECRET"),
                authorize_url: require("AUTH_AUTHORIZE_URL")?,
                token_url: require("AUTH_TOKEN_URL")?,
                redirect_uri: require("AUTH_REDIRECT_URI")?,
                access_cookie: or_default("ACCESS_TOKEN_COOKIE", "access_token"),
                id_cookie: or_default("ID_TOKEN_COOKIE", "id_token"),
                cookie_secure: or_default("COOKIE_SECURE", "true")
                    .parse::<bool>()
                    .context("COOKIE_SECURE must be 'true' or 'false'")?,
                post_login_redirect: or_default("POST_LOGIN_REDIRECT", "/"),
            },
            signed_url_ttl_secs: signed_url_ttl(&or_default("SIGNED_URL_TTL_SECS", "900"))?,
            max_upload_bytes: or_default("MAX_UPLOAD_BYTES", "10485760")
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            port: or_default("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }
}

fn signed_url_ttl(raw: &str) -> Result<u64> {
    let secs = raw
        .parse::<u64>()
        .context("SIGNED_URL_TTL_SECS must be a number of seconds")?;
    if !(1..=MAX_SIGNED_URL_TTL_SECS).contains(&secs) {
        bail!("SIGNED_URL_TTL_SECS must be between 1 and {MAX_SIGNED_URL_TTL_SECS}, got {secs}");
    }
    Ok(secs)
}
