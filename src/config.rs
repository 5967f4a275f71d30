// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Runtime configuration: `DARKROOM_*` environment variables, overridden by command-line flags.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::gallery::GalleryService;
use crate::http::{AppState, DEFAULT_MAX_UPLOAD_BYTES};
use crate::model::PublicOrigin;
use crate::store::WriteDurability;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_DATA_DIR: &str = "data";
const UPLOADS_SUBDIR: &str = "uploads";

const ENV_BIND: &str = "DARKROOM_BIND";
const ENV_DATA_DIR: &str = "DARKROOM_DATA_DIR";
const ENV_UPLOADS_DIR: &str = "DARKROOM_UPLOADS_DIR";
const ENV_FRONTEND_DIR: &str = "DARKROOM_FRONTEND_DIR";
const ENV_DURABLE_WRITES: &str = "DARKROOM_DURABLE_WRITES";
const ENV_MAX_UPLOAD_BYTES: &str = "DARKROOM_MAX_UPLOAD_BYTES";
const ENV_PUBLIC_ORIGIN: &str = "DARKROOM_PUBLIC_ORIGIN";
const ENV_LOG_JSON: &str = "DARKROOM_LOG_JSON";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}")]
    InvalidBind { value: String },
    #[error("invalid public origin {value:?} (expected e.g. https://photos.example.com)")]
    InvalidOrigin { value: String },
}

/// Flags accepted on the command line. Unset flags fall back to the environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub bind: Option<String>,
    pub data_dir: Option<String>,
    pub uploads_dir: Option<String>,
    pub frontend_dir: Option<String>,
    pub public_origin: Option<String>,
    pub durable_writes: bool,
}

pub fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--bind" => &mut options.bind,
            "--data-dir" => &mut options.data_dir,
            "--uploads-dir" => &mut options.uploads_dir,
            "--frontend-dir" => &mut options.frontend_dir,
            "--public-origin" => &mut options.public_origin,
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
                continue;
            }
            _ => return Err(()),
        };
        if slot.is_some() {
            return Err(());
        }
        *slot = Some(args.next().ok_or(())?);
    }

    Ok(options)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    /// Gallery ledger and booking records.
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub frontend_dir: Option<PathBuf>,
    pub durability: WriteDurability,
    pub max_upload_bytes: usize,
    pub public_origin: Option<PublicOrigin>,
    pub log_json: bool,
}

impl Config {
    pub fn from_env(cli: CliOptions) -> Result<Self, ConfigError> {
        Self::resolve(cli, |name| std::env::var(name).ok())
    }

    /// Merges `cli` over the variables returned by `env`.
    pub fn resolve(
        cli: CliOptions,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let bind_raw = cli
            .bind
            .or_else(|| non_empty(ENV_BIND))
            .unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let bind = bind_raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBind { value: bind_raw })?;

        let data_dir = PathBuf::from(
            cli.data_dir
                .or_else(|| non_empty(ENV_DATA_DIR))
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_owned()),
        );
        let uploads_dir = cli
            .uploads_dir
            .or_else(|| non_empty(ENV_UPLOADS_DIR))
            .map_or_else(|| data_dir.join(UPLOADS_SUBDIR), PathBuf::from);
        let frontend_dir = cli
            .frontend_dir
            .or_else(|| non_empty(ENV_FRONTEND_DIR))
            .map(PathBuf::from);

        let public_origin = match cli.public_origin.or_else(|| non_empty(ENV_PUBLIC_ORIGIN)) {
            Some(raw) => Some(
                PublicOrigin::parse(&raw).ok_or(ConfigError::InvalidOrigin { value: raw })?,
            ),
            None => None,
        };

        let durable = cli.durable_writes || env_bool(&env, ENV_DURABLE_WRITES, false);
        let durability = if durable {
            WriteDurability::Durable
        } else {
            WriteDurability::BestEffort
        };

        let max_upload_bytes = non_empty(ENV_MAX_UPLOAD_BYTES)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            bind,
            data_dir,
            uploads_dir,
            frontend_dir,
            durability,
            max_upload_bytes,
            public_origin,
            log_json: env_bool(&env, ENV_LOG_JSON, false),
        })
    }

    pub fn service(&self) -> GalleryService {
        GalleryService::open(&self.data_dir, self.uploads_dir.clone(), self.durability)
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(self.service())
            .with_public_origin(self.public_origin.clone())
            .with_max_upload_bytes(self.max_upload_bytes)
            .with_frontend_dir(self.frontend_dir.clone())
    }
}

fn env_bool(env: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    env(name)
        .and_then(|v| match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use rstest::rstest;

    use super::{parse_options, CliOptions, Config, ConfigError};
    use crate::http::DEFAULT_MAX_UPLOAD_BYTES;
    use crate::model::PublicOrigin;
    use crate::store::WriteDurability;

    fn args(raw: &[&str]) -> impl Iterator<Item = String> {
        raw.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>().into_iter()
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn parses_empty_args() {
        assert_eq!(parse_options(std::iter::empty()).unwrap(), CliOptions::default());
    }

    #[test]
    fn parses_all_flags() {
        let options = parse_options(args(&[
            "--bind",
            "127.0.0.1:8080",
            "--data-dir",
            "/srv/studio",
            "--uploads-dir",
            "/srv/photos",
            "--frontend-dir",
            "web",
            "--public-origin",
            "https://photos.example.com",
            "--durable-writes",
        ]))
        .unwrap();

        assert_eq!(options.bind.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(options.data_dir.as_deref(), Some("/srv/studio"));
        assert_eq!(options.uploads_dir.as_deref(), Some("/srv/photos"));
        assert_eq!(options.frontend_dir.as_deref(), Some("web"));
        assert_eq!(options.public_origin.as_deref(), Some("https://photos.example.com"));
        assert!(options.durable_writes);
    }

    #[rstest]
    #[case(&["--bind"])]
    #[case(&["--bind", "a", "--bind", "b"])]
    #[case(&["--durable-writes", "--durable-writes"])]
    #[case(&["--verbose"])]
    #[case(&["data"])]
    fn rejects_bad_args(#[case] raw: &[&str]) {
        assert!(parse_options(args(raw)).is_err());
    }

    #[test]
    fn defaults_without_env_or_flags() {
        let config = Config::resolve(CliOptions::default(), env_of(&[])).unwrap();

        assert_eq!(config.bind, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.uploads_dir, PathBuf::from("data").join("uploads"));
        assert_eq!(config.frontend_dir, None);
        assert_eq!(config.durability, WriteDurability::BestEffort);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.public_origin, None);
        assert!(!config.log_json);
    }

    #[test]
    fn env_is_read_and_flags_win() {
        let env = env_of(&[
            ("DARKROOM_BIND", "127.0.0.1:7000"),
            ("DARKROOM_DATA_DIR", "/var/lib/darkroom"),
            ("DARKROOM_DURABLE_WRITES", "yes"),
            ("DARKROOM_MAX_UPLOAD_BYTES", "1024"),
            ("DARKROOM_PUBLIC_ORIGIN", "https://env.example"),
            ("DARKROOM_LOG_JSON", "1"),
        ]);
        let cli = CliOptions {
            bind: Some("127.0.0.1:9000".to_owned()),
            public_origin: Some("https://flag.example:8443/".to_owned()),
            ..CliOptions::default()
        };

        let config = Config::resolve(cli, env).unwrap();

        assert_eq!(config.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/darkroom"));
        assert_eq!(config.uploads_dir, PathBuf::from("/var/lib/darkroom/uploads"));
        assert_eq!(config.durability, WriteDurability::Durable);
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(
            config.public_origin,
            Some(PublicOrigin::new("https", "flag.example:8443"))
        );
        assert!(config.log_json);
    }

    #[rstest]
    #[case(CliOptions { bind: Some("nowhere".to_owned()), ..CliOptions::default() })]
    #[case(CliOptions { public_origin: Some("not a url".to_owned()), ..CliOptions::default() })]
    fn invalid_values_are_reported(#[case] cli: CliOptions) {
        let err = Config::resolve(cli, env_of(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidBind { .. } | ConfigError::InvalidOrigin { .. }
        ));
    }
}
