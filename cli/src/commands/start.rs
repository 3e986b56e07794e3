//! Default command - assemble the runtime from resolved settings.

use std::sync::Arc;

use anyhow::Result;
use px_core::adapters::SystemProxyDiscovery;
use px_core::{ProxySource, Resolution, Runtime};

pub fn run(resolution: Resolution) -> Result<()> {
    let ini = resolution.ini_path.clone();
    let runtime = Runtime::new(resolution, Arc::new(SystemProxyDiscovery::new()));
    let state = runtime.state();
    tracing::debug!(
        workers = state.workers(),
        threads = state.threads(),
        foreground = state.foreground(),
        "Runtime assembled"
    );

    if let Some(ini) = ini {
        println!("Config: {}", ini.display());
    }
    for addr in state.listen() {
        let addr = if addr.is_empty() { "*" } else { addr.as_str() };
        println!("Serving at {}:{}", addr, state.port());
    }

    match runtime.upstream() {
        ProxySource::ExplicitServers(servers) | ProxySource::AutoDetect { servers, .. }
            if servers.is_empty() =>
        {
            println!("Upstream: direct")
        }
        ProxySource::ExplicitServers(servers) | ProxySource::AutoDetect { servers, .. } => {
            let servers: Vec<String> = servers.iter().map(|s| s.to_string()).collect();
            println!("Upstream: {}", servers.join(", "));
        }
        ProxySource::Pac { location, encoding } => {
            println!("Upstream: PAC {} ({})", location, encoding);
        }
    }
    if runtime.transport().authenticates() {
        println!(
            "Auth: {} as {}",
            runtime.transport().auth(),
            runtime.transport().username()
        );
    }
    Ok(())
}
