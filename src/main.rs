#[tokio::main]
async fn main() -> anyhow::Result<()> {
    safeplate_ledger::server::run().await
}
