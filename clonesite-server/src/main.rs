use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = clonesite_server::load_config();
    let ax = clonesite_server::build(&cfg).await?;

    let host = cfg
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = cfg
        .get_string("http.port")
        .unwrap_or_else(|| "3000".to_string());

    let addr = format!("{host}:{port}");
    ax.listen(addr).await?;

    Ok(())
}
