//! Paginated enumeration of the draw catalog

use crate::notify::LogSink;
use crate::session::ArenaSession;
use crate::types::DrawItem;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct RawDraw {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    /// Participation marker; present once this account has joined the draw
    #[serde(rename = "roleInfo", default)]
    role_info: Option<Value>,
}

/// Fetch the complete draw catalog, page by page
///
/// Requests page 1, 2, ... with a fixed page size until a page comes back
/// empty; no total count is assumed. A failed page stops the enumeration and
/// returns whatever was gathered so far, so the caller can proceed to
/// reporting - listing failures never raise.
pub(crate) async fn fetch_all(
    session: &ArenaSession,
    page_size: u32,
    sink: &dyn LogSink,
) -> Vec<DrawItem> {
    let mut items = Vec::new();
    let mut page = 1u32;
    loop {
        let mut params = session.auth_params();
        params["page"] = json!(page);
        params["pageSize"] = json!(page_size);
        params["status"] = json!("progress");

        let result = match session.gateway().call_checked("/draw/list", &params).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(page, error = %e, "draw listing failed, stopping enumeration");
                sink.log(&format!(
                    "{}, draw listing failed on page {page}: {e}",
                    session.account
                ));
                break;
            }
        };

        let raw: Vec<RawDraw> = match result.get("list") {
            Some(list) => serde_json::from_value(list.clone()).unwrap_or_default(),
            None => Vec::new(),
        };
        if raw.is_empty() {
            break;
        }
        items.extend(raw.into_iter().map(|draw| DrawItem {
            joined: draw.role_info.is_some(),
            id: draw.id,
            title: draw.title,
        }));
        page += 1;
    }
    items
}
