//! Message router between the UI and the workspace service.
//!
//! Requests are JSON objects tagged by `action`. Every request produces
//! exactly one [`Response`], including malformed and unknown ones.

use crate::error::WorkspaceError;
use crate::platform::Platform;
use crate::service::WorkspaceService;
use crate::store::KeyValueStore;
use crate::workspace::{StoreRoot, WindowId, WorkspaceId, WorkspaceRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Every action the UI can request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    GetState,
    SaveWindow {
        window_id: WindowId,
    },
    OpenWorkspace {
        workspace_id: WorkspaceId,
    },
    FocusWindow {
        window_id: WindowId,
    },
    UnsaveWorkspace {
        workspace_id: WorkspaceId,
    },
    RenameWorkspace {
        workspace_id: WorkspaceId,
        new_title: String,
    },
    UpdateOrder {
        new_order: Vec<WorkspaceId>,
    },
    ExportWorkspaces,
    ImportWorkspaces {
        /// Validated by the import itself, so a missing field is bad data
        #[serde(default)]
        data: Value,
    },
}

impl Request {
    /// Wire names of every action.
    pub const ACTIONS: [&'static str; 9] = [
        "getState",
        "saveWindow",
        "openWorkspace",
        "focusWindow",
        "unsaveWorkspace",
        "renameWorkspace",
        "updateOrder",
        "exportWorkspaces",
        "importWorkspaces",
    ];

    pub fn action(&self) -> &'static str {
        match self {
            Request::GetState => "getState",
            Request::SaveWindow { .. } => "saveWindow",
            Request::OpenWorkspace { .. } => "openWorkspace",
            Request::FocusWindow { .. } => "focusWindow",
            Request::UnsaveWorkspace { .. } => "unsaveWorkspace",
            Request::RenameWorkspace { .. } => "renameWorkspace",
            Request::UpdateOrder { .. } => "updateOrder",
            Request::ExportWorkspaces => "exportWorkspaces",
            Request::ImportWorkspaces { .. } => "importWorkspaces",
        }
    }
}

/// Reply to a request: `success`, action-specific payload fields at the top
/// level, and `error` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// A success response carrying the fields of `payload`.
    pub fn ok(payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        Self {
            success: true,
            payload,
            error: None,
        }
    }

    pub fn empty() -> Self {
        Self::ok(Value::Null)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: Map::new(),
            error: Some(message.into()),
        }
    }

    pub fn unknown_action() -> Self {
        Self::error("Unknown action")
    }

    /// Payload field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({"success": false, "error": format!("Response encoding failed: {e}")})
        })
    }
}

impl From<Result<Value, WorkspaceError>> for Response {
    fn from(result: Result<Value, WorkspaceError>) -> Self {
        match result {
            Ok(payload) => Response::ok(payload),
            Err(e) => Response::error(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct SaveReply {
    workspace: WorkspaceRecord,
}

#[derive(Serialize)]
struct ExportReply {
    data: StoreRoot,
}

fn to_payload<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        log::error!("Failed to encode response payload: {}", e);
        Value::Null
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Routes requests to a [`WorkspaceService`].
pub struct Router<P, S> {
    service: Arc<WorkspaceService<P, S>>,
}

impl<P, S> Clone for Router<P, S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<P: Platform, S: KeyValueStore> Router<P, S> {
    pub fn new(service: Arc<WorkspaceService<P, S>>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<WorkspaceService<P, S>> {
        &self.service
    }

    /// Decode a raw message and dispatch it.
    pub async fn handle_value(&self, message: Value) -> Response {
        let known = message
            .get("action")
            .and_then(Value::as_str)
            .is_some_and(|action| Request::ACTIONS.contains(&action));
        if !known {
            log::debug!("Unknown action in message: {}", message);
            return Response::unknown_action();
        }

        match serde_json::from_value::<Request>(message) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Response::error(format!("Invalid request: {e}")),
        }
    }

    /// Run one request against the service.
    pub async fn dispatch(&self, request: Request) -> Response {
        let action = request.action();
        log::debug!("Dispatching {}", action);

        let service = &self.service;
        let result = match request {
            Request::GetState => service.get_state().await.map(to_payload),
            Request::SaveWindow { window_id } => service
                .save_window(window_id)
                .await
                .map(|workspace| to_payload(SaveReply { workspace })),
            Request::OpenWorkspace { workspace_id } => {
                service.open_workspace(workspace_id).await.map(to_payload)
            }
            Request::FocusWindow { window_id } => {
                service.focus_window(window_id).await.map(|()| Value::Null)
            }
            Request::UnsaveWorkspace { workspace_id } => service
                .unsave_workspace(workspace_id)
                .await
                .map(|()| Value::Null),
            Request::RenameWorkspace {
                workspace_id,
                new_title,
            } => service
                .rename_workspace(workspace_id, &new_title)
                .await
                .map(|()| Value::Null),
            Request::UpdateOrder { new_order } => {
                service.update_order(&new_order).await.map(|()| Value::Null)
            }
            Request::ExportWorkspaces => Ok(to_payload(ExportReply {
                data: service.export().await,
            })),
            Request::ImportWorkspaces { data } => service.import(&data).await.map(|()| Value::Null),
        };

        if let Err(e) = &result {
            log::warn!("{} failed: {}", action, e);
        }
        Response::from(result)
    }
}

// ---------------------------------------------------------------------------
// Message channel
// ---------------------------------------------------------------------------

/// One message with its reply slot.
#[derive(Debug)]
pub struct Envelope {
    pub request: Value,
    pub reply: oneshot::Sender<Response>,
}

/// Client side of the message channel.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<Envelope>,
}

impl RouterHandle {
    /// Send a message and wait for its response.
    pub async fn request(&self, request: Value) -> Response {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Envelope { request, reply }).await.is_err() {
            return Response::error("Message channel closed");
        }
        rx.await
            .unwrap_or_else(|_| Response::error("Message handler dropped the request"))
    }
}

/// Serve messages until every [`RouterHandle`] is dropped.
///
/// Each message is handled on its own task so a slow request (opening a
/// window) does not hold up the others.
pub fn spawn_message_loop<P: Platform, S: KeyValueStore>(
    router: Router<P, S>,
    capacity: usize,
) -> (RouterHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(capacity.max(1));

    let task = tokio::spawn(async move {
        while let Some(Envelope { request, reply }) = rx.recv().await {
            let router = router.clone();
            tokio::spawn(async move {
                let response = router.handle_value(request).await;
                if reply.send(response).is_err() {
                    log::debug!("Requester went away before the response was ready");
                }
            });
        }
        log::debug!("Message loop stopped");
    });

    (RouterHandle { tx }, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_decoding() {
        let request: Request = serde_json::from_value(json!({
            "action": "renameWorkspace",
            "workspaceId": 3,
            "newTitle": "Research"
        }))
        .unwrap();
        assert_eq!(
            request,
            Request::RenameWorkspace {
                workspace_id: 3,
                new_title: "Research".to_string()
            }
        );

        let request: Request = serde_json::from_value(json!({"action": "getState"})).unwrap();
        assert_eq!(request, Request::GetState);

        let request: Request =
            serde_json::from_value(json!({"action": "updateOrder", "newOrder": [2, 1]})).unwrap();
        assert_eq!(request.action(), "updateOrder");

        let request: Request =
            serde_json::from_value(json!({"action": "importWorkspaces"})).unwrap();
        assert_eq!(request, Request::ImportWorkspaces { data: Value::Null });
    }

    #[test]
    fn test_actions_table_matches_variants() {
        for action in Request::ACTIONS {
            let message = match action {
                "saveWindow" | "focusWindow" => json!({"action": action, "windowId": 1}),
                "openWorkspace" | "unsaveWorkspace" => json!({"action": action, "workspaceId": 1}),
                "renameWorkspace" => json!({"action": action, "workspaceId": 1, "newTitle": "t"}),
                "updateOrder" => json!({"action": action, "newOrder": []}),
                "importWorkspaces" => json!({"action": action, "data": {}}),
                _ => json!({"action": action}),
            };
            let request: Request = serde_json::from_value(message).unwrap();
            assert_eq!(request.action(), action);
        }
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(Response::empty().to_value(), json!({"success": true}));
        assert_eq!(
            Response::ok(json!({"windowId": 4, "message": "m"})).to_value(),
            json!({"success": true, "windowId": 4, "message": "m"})
        );
        assert_eq!(
            Response::error("Workspace not found.").to_value(),
            json!({"success": false, "error": "Workspace not found."})
        );
    }

    #[test]
    fn test_from_workspace_error() {
        let response = Response::from(Err::<Value, _>(WorkspaceError::NoTabs));
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Window has no tabs."));
    }
}
