use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_env("RESCOMPILE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("rescompile=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = rescompile::run() {
        tracing::error!(error = format!("{err:#}"), "Unexpected");
        std::process::exit(1);
    }
}
