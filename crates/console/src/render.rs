//! Plain-text rendering of list snapshots and records.
//!
//! Renderers are pure: they take a snapshot and return the text to print,
//! so the terminal front end stays a thin loop around the controllers.

use std::fmt::Write;

use carehub_client::list::{ListSnapshot, ListStatus};
use carehub_core::filters::FilterValues;
use carehub_core::resources::{
    Appointment, Blog, Doctor, InfirmaryVisit, InventoryItem, Member, Resource,
};
use carehub_core::types::Timestamp;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Placeholder for a missing or null cell.
const EMPTY_CELL: &str = "-";

/// Columns shown for each resource, after the record id.
fn columns(resource: Resource) -> &'static [&'static str] {
    match resource {
        Resource::Doctors => &["name", "speciality", "city", "status"],
        Resource::Members => &["name", "phone", "membershipType"],
        Resource::Appointments => &["memberName", "doctorId", "status", "scheduledAt"],
        Resource::Blogs => &["title", "category", "status"],
        Resource::Inventory => &["itemName", "category", "quantity", "stockStatus"],
        Resource::Infirmary => &["studentName", "className", "complaint", "visitDate"],
        Resource::Reports => &["title", "reportType", "doctorId"],
    }
}

/// Typed records know their own cells, id first, in [`columns`] order.
trait Cells: DeserializeOwned {
    fn cells(self) -> Vec<Option<String>>;
}

fn minutes(at: Option<Timestamp>) -> Option<String> {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
}

impl Cells for Doctor {
    fn cells(self) -> Vec<Option<String>> {
        vec![Some(self.id), Some(self.name), self.speciality, self.city, self.status]
    }
}

impl Cells for Member {
    fn cells(self) -> Vec<Option<String>> {
        vec![Some(self.id), Some(self.name), self.phone, self.membership_type]
    }
}

impl Cells for Appointment {
    fn cells(self) -> Vec<Option<String>> {
        vec![
            Some(self.id),
            self.member_name,
            self.doctor_id,
            self.status,
            minutes(self.scheduled_at),
        ]
    }
}

impl Cells for Blog {
    fn cells(self) -> Vec<Option<String>> {
        vec![Some(self.id), Some(self.title), self.category, self.status]
    }
}

impl Cells for InventoryItem {
    fn cells(self) -> Vec<Option<String>> {
        vec![
            Some(self.id),
            Some(self.item_name),
            self.category,
            self.quantity.map(|q| q.to_string()),
            self.stock_status,
        ]
    }
}

impl Cells for InfirmaryVisit {
    fn cells(self) -> Vec<Option<String>> {
        vec![
            Some(self.id),
            Some(self.student_name),
            self.class_name,
            self.complaint,
            self.visit_date.map(|d| d.format("%Y-%m-%d").to_string()),
        ]
    }
}

fn typed<T: Cells>(item: &Value) -> Option<Vec<String>> {
    let record: T = serde_json::from_value(item.clone()).ok()?;
    Some(
        record
            .cells()
            .into_iter()
            .map(|c| {
                c.filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| EMPTY_CELL.to_string())
            })
            .collect(),
    )
}

fn cell(item: &Value, key: &str) -> String {
    match item.get(key) {
        None | Some(Value::Null) => EMPTY_CELL.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => EMPTY_CELL.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One table row: the record id followed by the resource's columns.
///
/// Records that do not decode into their typed model are shown from the
/// raw JSON instead.
pub fn row(resource: Resource, item: &Value) -> String {
    let cells = match resource {
        Resource::Doctors => typed::<Doctor>(item),
        Resource::Members => typed::<Member>(item),
        Resource::Appointments => typed::<Appointment>(item),
        Resource::Blogs => typed::<Blog>(item),
        Resource::Inventory => typed::<InventoryItem>(item),
        Resource::Infirmary => typed::<InfirmaryVisit>(item),
        Resource::Reports => None,
    };
    cells
        .unwrap_or_else(|| {
            std::iter::once(cell(item, "_id"))
                .chain(columns(resource).iter().map(|key| cell(item, key)))
                .collect()
        })
        .join("  ")
}

fn filter_summary(values: &FilterValues) -> Option<String> {
    let active: Vec<String> = values
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| format!("{k}={}", v.trim()))
        .collect();
    (!active.is_empty()).then(|| active.join(", "))
}

fn toggle(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Render a list screen: heading, rows or status, navigation and filters.
pub fn list(resource: Resource, snap: &ListSnapshot<Value>) -> String {
    let mut out = String::new();

    let heading = match snap.pagination {
        Some(p) => format!(
            "{} (page {} of {}, {} total)",
            resource.label(),
            p.page,
            p.pages.max(1),
            p.total
        ),
        None => format!("{} (page {})", resource.label(), snap.page),
    };
    let _ = writeln!(out, "{heading}");

    match snap.status {
        ListStatus::Idle => {
            let _ = writeln!(out, "Not loaded yet.");
        }
        ListStatus::Loading => {
            let _ = writeln!(out, "Loading...");
        }
        ListStatus::Error => {
            let message = snap.error.as_deref().unwrap_or("Something went wrong");
            let _ = writeln!(out, "Error: {message} (type `r` to retry)");
        }
        ListStatus::Loaded if snap.items.is_empty() => {
            let _ = writeln!(out, "No {} found.", resource.label().to_lowercase());
        }
        ListStatus::Loaded => {}
    }

    for item in &snap.items {
        let _ = writeln!(out, "  {}", row(resource, item));
    }

    let _ = writeln!(
        out,
        "[prev: {}] [next: {}]",
        toggle(snap.can_go_prev()),
        toggle(snap.can_go_next())
    );

    if let Some(applied) = filter_summary(&snap.applied) {
        let _ = writeln!(out, "Filters: {applied}");
    }
    if snap.filters_dirty() {
        let draft = filter_summary(&snap.draft).unwrap_or_else(|| "(none)".to_string());
        let _ = writeln!(out, "Draft filters (not applied): {draft}");
    }
    out
}

/// Pretty JSON for a single record.
pub fn record(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
