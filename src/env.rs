// Copyright © 2026 Pathway

//! Typed access to the worker's environment variables.

use std::env;
use std::error;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("couldn't parse the value of {0:?} environment variable as UTF-8 string")]
    NotUtf8(String),

    #[error("couldn't parse the value of {0:?} environment variable: {1}")]
    ParsingFailed(String, #[source] Box<dyn error::Error + Send + Sync>),

    #[error("environment variable {0:?} is not set")]
    NotSet(String),
}

pub fn parse_env_var<T: FromStr>(name: &str) -> Result<Option<T>, Error>
where
    T::Err: error::Error + Send + Sync + 'static,
{
    let Some(value) = env::var_os(name) else {
        return Ok(None);
    };
    let value = value
        .into_string()
        .map_err(|_| Error::NotUtf8(name.to_string()))?;
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|err| Error::ParsingFailed(name.to_string(), Box::new(err)))
}

pub fn parse_env_var_or<T: FromStr>(name: &str, default: T) -> Result<T, Error>
where
    T::Err: error::Error + Send + Sync + 'static,
{
    Ok(parse_env_var(name)?.unwrap_or(default))
}

pub fn parse_env_var_required<T: FromStr>(name: &str) -> Result<T, Error>
where
    T::Err: error::Error + Send + Sync + 'static,
{
    parse_env_var(name)?.ok_or_else(|| Error::NotSet(name.to_string()))
}
