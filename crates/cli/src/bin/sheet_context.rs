use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sheet_context_cli::main_entry().await
}
