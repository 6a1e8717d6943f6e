use mongodb::Cursor;
use rocket::futures::StreamExt;
use serde::de::DeserializeOwned;

pub mod filter;
pub mod listing;
pub mod swipe;
pub mod user;

/// Drains a cursor, skipping documents that fail to decode.
pub(crate) async fn read_all<T>(mut cursor: Cursor<T>) -> Vec<T>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut items = Vec::new();
    while let Some(next) = cursor.next().await {
        match next {
            Ok(item) => items.push(item),
            Err(e) => {
                // show must go on?
                tracing::warn!("Unable to deserialize document: {}", e)
            }
        }
    }
    items
}
