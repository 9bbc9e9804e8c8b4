use core::fmt::Display;
use core::str::FromStr;
use std::env::var;

use log::{info, warn};

use crate::misskey::MisskeyCredentials;

const ENV_PATH: &str = ".env";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_NSFW_THRESHOLD: f64 = 0.5;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug)]
pub struct Env {
    pub addr: (String, u16),
    pub credentials: Option<MisskeyCredentials>,
    pub nsfw_endpoint: Option<String>,
    pub nsfw_threshold: f64,
    pub max_upload_bytes: usize,
}

/// Loads `.env` into the process environment, if there is one.
pub fn read_env_file() -> bool {
    dotenv::from_filename(ENV_PATH).is_ok()
}

pub fn unwrap_or_default<T, E, D, I>(res: Result<T, E>, default: I, var: D) -> T
where
    D: Display,
    I: Into<T> + Display,
{
    res.unwrap_or_else(|_err| {
        info!("{var} not specified. Falling back to default: {default}.");
        default.into()
    })
}

fn parse_or_default<T>(var: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    unwrap_or_default(
        get_var(var).map(|value| {
            value.parse::<T>().unwrap_or_else(|_err| {
                warn!("`{var}` is not valid. Falling back to default: {default}.");
                default
            })
        }),
        default,
        var,
    )
}

pub fn load_env() -> Env {
    let credentials = match (get_var("MISSKEY_API_URL"), get_var("MISSKEY_API_KEY")) {
        (Ok(url), Ok(key)) => Some(MisskeyCredentials::new(&url, key)),
        _ => {
            warn!("MISSKEY_API_URL or MISSKEY_API_KEY is missing. Drive routes are disabled.");
            None
        }
    };

    Env {
        addr: (
            unwrap_or_default(get_var("HOST"), DEFAULT_HOST, "HOST"),
            parse_or_default("PORT", DEFAULT_PORT),
        ),
        credentials,
        nsfw_endpoint: get_var("NSFW_API_URL").ok(),
        nsfw_threshold: checked_threshold(parse_or_default(
            "NSFW_THRESHOLD",
            DEFAULT_NSFW_THRESHOLD,
        )),
        max_upload_bytes: parse_or_default("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
    }
}

/// Scores are probabilities, so only `0..=1` is meaningful.
fn checked_threshold(threshold: f64) -> f64 {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        threshold
    } else {
        warn!(
            "`NSFW_THRESHOLD` must be between 0 and 1. Falling back to default: {DEFAULT_NSFW_THRESHOLD}."
        );
        DEFAULT_NSFW_THRESHOLD
    }
}

/// Empty values count as unset.
fn get_var(env_var: &str) -> Result<String, String> {
    var(env_var)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| format!("Missing variable `{env_var}` in environment or `{ENV_PATH}`"))
}
