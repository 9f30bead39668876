#[tokio::main]
async fn main() -> anyhow::Result<()> {
    raffle_reconciler::server::run().await
}
