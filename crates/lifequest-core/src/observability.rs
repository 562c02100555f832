//! Observability - tracing の初期化
//!
//! `RUST_LOG` が設定されていればそちらを優先し、なければ設定ファイルの
//! `[logging] level` を使います。

use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

#[derive(Debug, Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct TracingInitError(String);

/// グローバルな fmt subscriber を入れる。既に入っていれば失敗
pub fn init_tracing(level: Option<&str>) -> Result<(), TracingInitError> {
    let default_level = level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| TracingInitError(err.to_string()))
}
