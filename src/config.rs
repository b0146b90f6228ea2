use std::env;

pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub jwt_secret: String,
    pub static_dir: Option<String>,
    pub s3: Option<S3Config>,
}

pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://wedding.db?mode=rwc".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-in-production".to_string()),
            static_dir: env::var("STATIC_DIR").ok(),
            s3: S3Config::from_env(),
        }
    }
}

impl S3Config {
    // Uploads go to S3-compatible storage when S3_BUCKET is set, local disk otherwise.
    fn from_env() -> Option<Self> {
        let bucket = env::var("S3_BUCKET").ok()?;
        Some(Self {
            bucket,
            region: env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string()),
            endpoint: env::var("S3_ENDPOINT").ok(),
            access_key_id: env::var("S3_ACCESS_KEY_ID")
                .expect("S3_ACCESS_KEY_ID is required when S3_BUCKET is set"),
            secret_access_key: env::var("S3_SECRET_ACCESS_KEY")
                .expect("S3_SECRET_ACCESS_KEY is required when S3_BUCKET is set"),
            public_url: env::var("S3_PUBLIC_URL")
                .expect("S3_PUBLIC_URL is required when S3_BUCKET is set"),
        })
    }
}
