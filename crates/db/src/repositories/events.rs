//! Analytics usage events.
//!
//! Events are written inside the same transaction as the ledger mutation
//! they describe, so a rolled-back operation leaves no phantom event.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set};
use uuid::Uuid;

use crate::entities::usage_events;

/// Records an analytics event for a tenant.
pub(crate) async fn record<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    event_type: &str,
    payload: serde_json::Value,
) -> Result<(), DbErr> {
    usage_events::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        event_type: Set(event_type.to_string()),
        payload: Set(payload),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(())
}
