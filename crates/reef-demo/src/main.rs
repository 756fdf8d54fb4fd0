//! Reef demo.
//!
//! Usage: `reef-demo [--config <path>] [--headless <frames>]`

mod app;
mod bindings;
mod headless;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use reef_engine::device::GpuInit;
use reef_engine::logging::{init_logging, LoggingConfig};
use reef_engine::window::{Runtime, RuntimeConfig};
use reef_scene::{SceneConfig, DEFAULT_CONFIG_PATH};

#[derive(Debug, PartialEq)]
struct Args {
    config: PathBuf,
    headless: Option<u32>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut out = Args {
        config: PathBuf::from(DEFAULT_CONFIG_PATH),
        headless: None,
    };

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let path = it.next().context("--config needs a path")?;
                out.config = PathBuf::from(path);
            }
            "--headless" => {
                let frames = it.next().context("--headless needs a frame count")?;
                let frames = frames
                    .parse()
                    .with_context(|| format!("invalid frame count {frames:?}"))?;
                out.headless = Some(frames);
            }
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(out)
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args = parse_args(std::env::args().skip(1))?;
    let config = SceneConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    if let Some(frames) = args.headless {
        return headless::run(config, frames);
    }

    let app = app::ReefApp::new(config)?;
    Runtime::run(
        RuntimeConfig {
            title: "Reef".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        app,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_windowed_with_default_config() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(parsed.headless, None);
    }

    #[test]
    fn headless_and_config_flags() {
        let parsed = args(&["--headless", "3", "--config", "my.json"]).unwrap();
        assert_eq!(parsed.headless, Some(3));
        assert_eq!(parsed.config, PathBuf::from("my.json"));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(args(&["--headless"]).is_err());
        assert!(args(&["--headless", "many"]).is_err());
        assert!(args(&["--fullscreen"]).is_err());
    }
}
