use anyhow::Context as _;
use pulse_server::AppState;

use crate::context::Context;

pub fn run(ctx: Context, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(ctx.config.server.port);
    let db = ctx.open_db()?;
    let db_path = ctx.db_path.display().to_string();
    let state = AppState::from_config(db, ctx.config)?;

    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();
        println!("pulse API → http://localhost:{actual_port}  (db {db_path})");

        tokio::select! {
            res = pulse_server::serve_on(state, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
