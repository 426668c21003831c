use std::{env, path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;

use crate::{page::FetchSettings, realtime::CommandSolver};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value [{value}]: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, Error>;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub listen_address: String,
    /// How many requests each scraping stage keeps in flight
    pub parallel_requests: usize,
    pub timezone: Tz,
    pub fetch: FetchSettings,
    /// External program which reads a captcha image on stdin and prints the answer
    pub captcha_command: Option<CommandSolver>,
    pub allow_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable lookup, `from_env` uses the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        // unset and blank are the same thing
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_path = var("DATABASE_PATH")
            .map(PathBuf::from)
            .ok_or(Error::Missing("DATABASE_PATH"))?;

        let mut fetch = FetchSettings::default();
        if let Some(secs) = parse_var::<u64>("HTTP_TIMEOUT_SECS", var("HTTP_TIMEOUT_SECS"))? {
            fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = var("USER_AGENT") {
            fetch.user_agent = user_agent;
        }

        let parallel_requests = parse_var::<usize>("PARALLEL_REQUESTS", var("PARALLEL_REQUESTS"))?
            .unwrap_or(8);
        if parallel_requests == 0 {
            return Err(Error::Invalid {
                name: "PARALLEL_REQUESTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let timezone = match var("TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|e| Error::Invalid {
                name: "TIMEZONE",
                value: name.clone(),
                reason: e.to_string(),
            })?,
            None => chrono_tz::Europe::Sofia,
        };

        Ok(Config {
            database_path,
            listen_address: var("LISTEN_ADDRESS").unwrap_or("127.0.0.1:8080".to_string()),
            parallel_requests,
            timezone,
            fetch,
            captcha_command: var("CAPTCHA_COMMAND").and_then(|c| CommandSolver::parse(&c)),
            allow_origin: var("ALLOW_ORIGIN"),
        })
    }
}

fn parse_var<T>(name: &'static str, value: Option<String>) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| Error::Invalid {
                name,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ConfigResult<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("DATABASE_PATH", "/tmp/skgt.db")]).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/skgt.db"));
        assert_eq!(config.listen_address, "127.0.0.1:8080");
        assert_eq!(config.parallel_requests, 8);
        assert_eq!(config.timezone, chrono_tz::Europe::Sofia);
        assert_eq!(config.fetch.timeout, Duration::from_secs(30));
        assert!(config.captcha_command.is_none());
        assert!(config.allow_origin.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("DATABASE_PATH", "skgt.db"),
            ("LISTEN_ADDRESS", "0.0.0.0:80"),
            ("PARALLEL_REQUESTS", " 3 "),
            ("TIMEZONE", "UTC"),
            ("HTTP_TIMEOUT_SECS", "5"),
            ("USER_AGENT", "test"),
            ("CAPTCHA_COMMAND", "solve --fast"),
            ("ALLOW_ORIGIN", "*"),
        ])
        .unwrap();

        assert_eq!(config.listen_address, "0.0.0.0:80");
        assert_eq!(config.parallel_requests, 3);
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(config.fetch.timeout, Duration::from_secs(5));
        assert_eq!(config.fetch.user_agent, "test");
        assert_eq!(
            config.captcha_command,
            Some(CommandSolver::new("solve", vec!["--fast".to_string()]))
        );
        assert_eq!(config.allow_origin.as_deref(), Some("*"));
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(config(&[]), Err(Error::Missing("DATABASE_PATH"))));
        assert!(matches!(
            config(&[("DATABASE_PATH", " ")]),
            Err(Error::Missing("DATABASE_PATH"))
        ));

        for (name, value) in [
            ("PARALLEL_REQUESTS", "many"),
            ("PARALLEL_REQUESTS", "0"),
            ("TIMEZONE", "Europe/Nowhere"),
            ("HTTP_TIMEOUT_SECS", "-1"),
        ] {
            let result = config(&[("DATABASE_PATH", "skgt.db"), (name, value)]);
            assert!(
                matches!(&result, Err(Error::Invalid { name: n, .. }) if *n == name),
                "{}={}: {:?}",
                name,
                value,
                result.map(|_| ())
            );
        }
    }
}
