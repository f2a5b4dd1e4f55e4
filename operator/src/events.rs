use kube::runtime::events::{Event, EventType};

#[must_use]
pub fn from_create(src_name: &str, child_type: &str, child_name: &str) -> Event {
    Event {
        type_: EventType::Normal,
        reason: "Created".to_string(),
        note: Some(format!("Creating `{child_name}` {child_type} for `{src_name}` Paper")),
        action: format!("Creating {child_type}"),
        secondary: None,
    }
}

#[must_use]
pub fn from_update(src_name: &str, child_type: &str, child_name: &str) -> Event {
    Event {
        type_: EventType::Normal,
        reason: "Updated".to_string(),
        note: Some(format!("Updating `{child_name}` {child_type} for `{src_name}` Paper")),
        action: format!("Updating {child_type}"),
        secondary: None,
    }
}

#[must_use]
pub fn from_delete(src_name: &str, child_type: &str, child_name: &str, why: &str) -> Event {
    Event {
        type_: EventType::Normal,
        reason: "Deleted".to_string(),
        note: Some(format!("Deleting `{child_name}` {child_type} for `{src_name}` Paper: {why}")),
        action: format!("Deleting {child_type}"),
        secondary: None,
    }
}

#[must_use]
pub fn from_failure(src_name: &str, step: &str, error: &str) -> Event {
    Event {
        type_: EventType::Warning,
        reason: "ReconcileFailed".to_string(),
        note: Some(format!("Step {step} failed for `{src_name}` Paper: {error}")),
        action: "Reconciling".to_string(),
        secondary: None,
    }
}
