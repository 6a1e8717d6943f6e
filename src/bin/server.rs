use tracing::Level;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let server = swipe_backend::create(Some(level)).await?;

    if let Err(e) = server.launch().await {
        tracing::error!("Error launching server: {}", e);
        return Err(e.into());
    }

    Ok(())
}
