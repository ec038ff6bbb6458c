//! RPC method handler for the pagemark JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches one command to the page session, the
//! scheduler, the preferences engine or the history store via the `App`.

use chrono::Utc;
use serde_json::{json, Value};

use crate::app::App;
use crate::managers::highlight_store::PersistenceAdapter;
use crate::managers::page_session::{PageSession, ReadyState};
use crate::services::preferences_engine::{PreferencesEngineTrait, PreferencesSource};

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "PING" => Ok(json!({"pong": true})),

        // ─── Page lifecycle ───
        "LOAD_PAGE" => {
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            let html = params.get("html").and_then(|v| v.as_str()).ok_or("missing html")?;
            let title = params.get("title").and_then(|v| v.as_str());
            let ready_state = parse_ready_state(params)?.unwrap_or(ReadyState::Complete);
            let mut page = app.session.lock().await;
            let restored = page.load_page(url, title, html, ready_state).await;
            Ok(json!({
                "ok": true,
                "url": page.url(),
                "title": page.title(),
                "restored": restored,
            }))
        }
        "DOCUMENT_READY" => {
            let ready_state = parse_ready_state(params)?.ok_or("missing readyState")?;
            let mut page = app.session.lock().await;
            let total = page.document_ready(ready_state).await;
            Ok(json!({"ok": true, "total": total}))
        }
        "GET_PAGE_HTML" => {
            let page = app.session.lock().await;
            Ok(json!({"ok": true, "html": page.page_html()}))
        }

        // ─── Highlighting ───
        "HIGHLIGHT" => {
            let text = params.get("text").and_then(|v| v.as_str()).ok_or("missing text")?;
            let clear_existing = match params.get("clearExisting").and_then(|v| v.as_bool()) {
                Some(clear) => clear,
                None => !app.preferences.get_prefs().multi_color_mode,
            };
            let outcome = app
                .scheduler
                .request(text, clear_existing)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "count": outcome.count, "groups": outcome.groups}))
        }
        "CLEAR" => {
            let mut page = app.session.lock().await;
            let outcome = page.clear();
            Ok(json!({"ok": true, "removed": outcome.removed}))
        }
        "CLEAR_GROUP" => {
            let group_id = params.get("groupId").and_then(|v| v.as_str()).ok_or("missing groupId")?;
            if group_id.is_empty() {
                return Err("missing groupId".to_string());
            }
            let mut page = app.session.lock().await;
            let outcome = page.clear_group(group_id);
            Ok(json!({"ok": true, "found": outcome.found, "removed": outcome.removed}))
        }
        "GET_ACTIVE_GROUPS" => {
            let page = app.session.lock().await;
            let groups: Vec<Value> = page
                .active_groups()
                .iter()
                .map(|g| json!([g.term, {"color": g.color, "count": g.count}]))
                .collect();
            Ok(json!({"ok": true, "groups": groups}))
        }

        // ─── Navigation ───
        "NAV_NEXT" => {
            let mut page = app.session.lock().await;
            let ok = page.nav_next();
            Ok(nav_result(&page, ok))
        }
        "NAV_PREV" => {
            let mut page = app.session.lock().await;
            let ok = page.nav_previous();
            Ok(nav_result(&page, ok))
        }
        "NAV_FIRST" => {
            let mut page = app.session.lock().await;
            let ok = page.nav_first();
            Ok(nav_result(&page, ok))
        }
        "NAV_LAST" => {
            let mut page = app.session.lock().await;
            let ok = page.nav_last();
            Ok(nav_result(&page, ok))
        }
        "GET_NAV_INFO" => {
            let page = app.session.lock().await;
            let info = page.nav_info();
            Ok(json!({
                "ok": true,
                "currentIndex": info.current_index,
                "total": info.total,
                "hasHighlights": info.has_highlights,
                "label": info.label,
            }))
        }

        // ─── Content ───
        "GET_PAGE_CONTENT" => {
            let page = app.session.lock().await;
            let article = page.extract_content();
            Ok(json!({
                "success": true,
                "wordCount": article.word_count,
                "readTimeMinutes": article.estimated_read_time_minutes,
                "pageTitle": article.title,
                "pageContent": article.text,
                "pageHTML": article.html,
                "url": article.url,
                "usedFallback": article.used_fallback,
            }))
        }
        "EXPORT_MARKDOWN" => {
            let page = app.session.lock().await;
            let markdown = page.export_markdown(Utc::now());
            Ok(json!({"ok": true, "markdown": markdown}))
        }

        // ─── Preferences ───
        "GET_PREFS" => {
            let engine = app.preferences.read().map_err(|e| e.to_string())?;
            serde_json::to_value(engine.get_preferences()).map_err(|e| e.to_string())
        }
        "SET_PREF" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut engine = app.preferences.write().map_err(|e| e.to_string())?;
            engine.set_value(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── History ───
        "GET_HISTORY" => {
            let entries = PersistenceAdapter::new(app.store.clone()).history();
            Ok(json!({"ok": true, "items": entries}))
        }
        "DELETE_HISTORY" => {
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            let removed = PersistenceAdapter::new(app.store.clone()).forget(url);
            Ok(json!({"ok": true, "removed": removed}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}

fn parse_ready_state(params: &Value) -> Result<Option<ReadyState>, String> {
    match params.get("readyState") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|_| format!("invalid readyState: {}", v)),
    }
}

fn nav_result(page: &PageSession, ok: bool) -> Value {
    let info = page.nav_info();
    json!({
        "ok": ok,
        "index": info.current_index,
        "total": info.total,
        "label": info.label,
    })
}
