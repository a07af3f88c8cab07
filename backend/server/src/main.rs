#[tokio::main]
async fn main() -> anyhow::Result<()> {
    extension::start_server().await
}
