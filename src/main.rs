#[tokio::main]
async fn main() {
    if let Err(e) = signaling_core::frameworks::server::run_with_config().await {
        tracing::error!(error = %e, "server exited with an error");
        std::process::exit(1);
    }
}
