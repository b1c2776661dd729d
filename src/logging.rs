use crate::config::LogConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 初始化全局日志, `RUST_LOG` 优先于配置中的级别.
///
/// 重复调用时保留已安装的订阅者.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    if installed.is_err() {
        tracing::debug!("日志订阅者已存在, 跳过初始化");
    }
    Ok(())
}
