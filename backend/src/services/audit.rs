//! Audit writer for the monitored pricing fields

use shared::models::AuditAction;

use crate::error::AppResult;
use crate::models::{AuditEntry, NewAuditEntry, PriceSnapshot};
use crate::repositories::AuditRepository;

/// Table name recorded for inventory pricing audits
pub const INVENTORY_ENTITY: &str = "inventario";

/// Who/what an audit entry is about
#[derive(Debug, Clone, Copy)]
pub struct AuditSubject {
    pub entity: &'static str,
    pub entity_id: i64,
    pub action: AuditAction,
    pub user_id: Option<i64>,
}

impl AuditSubject {
    pub fn inventory(inventory_id: i64, action: AuditAction, user_id: Option<i64>) -> Self {
        Self {
            entity: INVENTORY_ENTITY,
            entity_id: inventory_id,
            action,
            user_id,
        }
    }
}

/// The entry to write, or `None` when cost, margin and price are all unchanged
pub fn price_change_entry(
    subject: AuditSubject,
    before: &PriceSnapshot,
    after: &PriceSnapshot,
) -> Option<NewAuditEntry> {
    if before == after {
        return None;
    }

    Some(NewAuditEntry {
        entity: subject.entity,
        entity_id: subject.entity_id,
        action: subject.action,
        previous: Some(*before),
        current: Some(*after),
        user_id: subject.user_id,
    })
}

/// Append an audit entry iff a monitored field changed
pub async fn record_price_change<R>(
    repo: &mut R,
    subject: AuditSubject,
    before: &PriceSnapshot,
    after: &PriceSnapshot,
) -> AppResult<Option<AuditEntry>>
where
    R: AuditRepository + ?Sized,
{
    match price_change_entry(subject, before, after) {
        Some(entry) => Ok(Some(repo.append_audit(&entry).await?)),
        None => Ok(None),
    }
}

/// Append the removal of a monitored record
pub async fn record_removal<R>(
    repo: &mut R,
    subject: AuditSubject,
    last_known: &PriceSnapshot,
) -> AppResult<AuditEntry>
where
    R: AuditRepository + ?Sized,
{
    let entry = NewAuditEntry {
        entity: subject.entity,
        entity_id: subject.entity_id,
        action: subject.action,
        previous: Some(*last_known),
        current: None,
        user_id: subject.user_id,
    };
    repo.append_audit(&entry).await
}
