use chrono::{DateTime, Utc};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,

    // Identity provider
    pub identity_base_url: String,

    // Payments provider
    pub payments_base_url: String,
    pub payments_api_key: String,
    pub payments_webhook_secret: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    pub currency: String,

    // Object storage
    pub storage_base_url: String,
    pub storage_bucket: String,
    pub storage_api_key: String,

    // Membership plan pricing
    pub membership_monthly_price_cents: i64,
    pub membership_annual_price_cents: i64,

    // Welfare fund operational thresholds
    pub fund_launch_date: DateTime<Utc>,
    pub fund_minimum_registrations: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a number"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:association.db?mode=rwc".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-key-change-in-production".to_string()),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            identity_base_url: env::var("IDENTITY_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9099".to_string()),
            payments_base_url: env::var("PAYMENTS_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9100".to_string()),
            payments_api_key: env::var("PAYMENTS_API_KEY").unwrap_or_default(),
            payments_webhook_secret: env::var("PAYMENTS_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "development-webhook-secret".to_string()),
            checkout_success_url: env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| "http://localhost/payment/success".to_string()),
            checkout_cancel_url: env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "http://localhost/payment/cancel".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            storage_base_url: env::var("STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9101".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "association-uploads".to_string()),
            storage_api_key: env::var("STORAGE_API_KEY").unwrap_or_default(),
            membership_monthly_price_cents: env::var("MEMBERSHIP_MONTHLY_PRICE_CENTS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("MEMBERSHIP_MONTHLY_PRICE_CENTS must be a number"),
            membership_annual_price_cents: env::var("MEMBERSHIP_ANNUAL_PRICE_CENTS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .expect("MEMBERSHIP_ANNUAL_PRICE_CENTS must be a number"),
            fund_launch_date: env::var("FUND_LAUNCH_DATE")
                .unwrap_or_else(|_| "2024-01-01T00:00:00Z".to_string())
                .parse()
                .expect("FUND_LAUNCH_DATE must be an RFC 3339 timestamp"),
            fund_minimum_registrations: env::var("FUND_MINIMUM_REGISTRATIONS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .expect("FUND_MINIMUM_REGISTRATIONS must be a number"),
        })
    }
}
