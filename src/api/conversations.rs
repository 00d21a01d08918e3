use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::auth::Identity;
use crate::db::ConversationRepository;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateConversationResponse {
    pub conversation_id: String,
    pub created: bool,
}

/// POST /api/conversations (requires auth)
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateConversationResponse>), AppError> {
    let Json(req) = payload?;

    let (conversation, created) = match req.kind.as_str() {
        "p2p" => {
            if req.user_id.is_empty() {
                return Err(AppError::Validation(
                    "user_id is required for p2p conversations".to_string(),
                ));
            }
            ConversationRepository::create_or_get_p2p(&state.db, &identity.user_id, &req.user_id)
                .await?
        }
        "group" => {
            if req.member_ids.is_empty() {
                return Err(AppError::Validation(
                    "member_ids is required for group conversations".to_string(),
                ));
            }
            let conversation =
                ConversationRepository::create_group(&state.db, &identity.user_id, &req.member_ids)
                    .await?;
            (conversation, true)
        }
        _ => {
            return Err(AppError::Validation("Invalid conversation type".to_string()));
        }
    };

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };

    Ok((
        status,
        Json(CreateConversationResponse {
            conversation_id: conversation.id,
            created,
        }),
    ))
}
