use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    rethink_cli::main_entry().await
}
