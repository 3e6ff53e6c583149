#[tokio::main]
async fn main() -> anyhow::Result<()> {
    horizon::run_cli().await
}
