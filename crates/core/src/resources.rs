//! Catalogue of list screens and the wire models behind them.
//!
//! Each [`Resource`] knows its API path, its default page size, and the
//! fixed set of filters the screen exposes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::filters::{FilterField, FilterKind, FilterSchema};
use crate::query::DEFAULT_PAGE_LIMIT;
use crate::types::{RecordId, Timestamp};

// ---------------------------------------------------------------------------
// Filter option sets
// ---------------------------------------------------------------------------

pub const DOCTOR_STATUSES: &[&str] = &["active", "inactive", "pending"];
pub const MEMBERSHIP_TYPES: &[&str] = &["individual", "family", "corporate", "school"];
pub const APPOINTMENT_STATUSES: &[&str] = &["scheduled", "completed", "cancelled", "no-show"];
pub const BLOG_STATUSES: &[&str] = &["draft", "published", "archived"];
pub const BLOG_CATEGORIES: &[&str] = &["wellness", "nutrition", "pediatrics", "news"];
pub const INVENTORY_CATEGORIES: &[&str] = &["medicine", "consumable", "equipment"];
pub const STOCK_STATUSES: &[&str] = &["in-stock", "low-stock", "out-of-stock", "expired"];
pub const REPORT_TYPES: &[&str] = &["lab", "radiology", "prescription", "discharge"];

/// Indian postal codes are six digits.
pub const PINCODE_LENGTH: usize = 6;

/// Mobile numbers are ten digits.
pub const PHONE_LENGTH: usize = 10;

// ---------------------------------------------------------------------------
// Filter schemas
// ---------------------------------------------------------------------------

pub static DOCTOR_FILTERS: FilterSchema = FilterSchema {
    fields: &[
        FilterField { key: "name", label: "Name", kind: FilterKind::Text },
        FilterField { key: "speciality", label: "Speciality", kind: FilterKind::Text },
        FilterField { key: "city", label: "City", kind: FilterKind::Text },
        FilterField {
            key: "pincode",
            label: "Pincode",
            kind: FilterKind::Digits { max_len: PINCODE_LENGTH },
        },
        FilterField { key: "status", label: "Status", kind: FilterKind::Choice(DOCTOR_STATUSES) },
    ],
};

pub static MEMBER_FILTERS: FilterSchema = FilterSchema {
    fields: &[
        FilterField { key: "name", label: "Name", kind: FilterKind::Text },
        FilterField {
            key: "phone",
            label: "Phone",
            kind: FilterKind::Digits { max_len: PHONE_LENGTH },
        },
        FilterField {
            key: "membershipType",
            label: "Membership",
            kind: FilterKind::Choice(MEMBERSHIP_TYPES),
        },
    ],
};

pub static APPOINTMENT_FILTERS: FilterSchema = FilterSchema {
    fields: &[
        FilterField { key: "doctorId", label: "Doctor ID", kind: FilterKind::Text },
        FilterField {
            key: "status",
            label: "Status",
            kind: FilterKind::Choice(APPOINTMENT_STATUSES),
        },
        FilterField { key: "date", label: "Date", kind: FilterKind::Date },
    ],
};

pub static BLOG_FILTERS: FilterSchema = FilterSchema {
    fields: &[
        FilterField { key: "title", label: "Title", kind: FilterKind::Text },
        FilterField { key: "category", label: "Category", kind: FilterKind::Choice(BLOG_CATEGORIES) },
        FilterField { key: "status", label: "Status", kind: FilterKind::Choice(BLOG_STATUSES) },
    ],
};

pub static INVENTORY_FILTERS: FilterSchema = FilterSchema {
    fields: &[
        FilterField { key: "itemName", label: "Item", kind: FilterKind::Text },
        FilterField {
            key: "category",
            label: "Category",
            kind: FilterKind::Choice(INVENTORY_CATEGORIES),
        },
        FilterField {
            key: "stockStatus",
            label: "Stock",
            kind: FilterKind::Choice(STOCK_STATUSES),
        },
    ],
};

pub static INFIRMARY_FILTERS: FilterSchema = FilterSchema {
    fields: &[
        FilterField { key: "studentName", label: "Student", kind: FilterKind::Text },
        FilterField { key: "className", label: "Class", kind: FilterKind::Text },
        FilterField { key: "visitDate", label: "Visit date", kind: FilterKind::Date },
    ],
};

pub static REPORT_FILTERS: FilterSchema = FilterSchema {
    fields: &[
        FilterField { key: "doctorId", label: "Doctor ID", kind: FilterKind::Text },
        FilterField { key: "reportType", label: "Type", kind: FilterKind::Choice(REPORT_TYPES) },
        FilterField { key: "fromDate", label: "From", kind: FilterKind::Date },
        FilterField { key: "toDate", label: "To", kind: FilterKind::Date },
    ],
};

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A list screen backed by a paginated API endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Doctors,
    Members,
    Appointments,
    Blogs,
    Inventory,
    Infirmary,
    Reports,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Doctors,
        Resource::Members,
        Resource::Appointments,
        Resource::Blogs,
        Resource::Inventory,
        Resource::Infirmary,
        Resource::Reports,
    ];

    /// API path relative to the base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Doctors => "doctors",
            Self::Members => "members",
            Self::Appointments => "appointments",
            Self::Blogs => "blogs",
            Self::Inventory => "school-health/inventory",
            Self::Infirmary => "school-health/infirmary",
            Self::Reports => "reports",
        }
    }

    /// Kebab-case name used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Doctors => "doctors",
            Self::Members => "members",
            Self::Appointments => "appointments",
            Self::Blogs => "blogs",
            Self::Inventory => "inventory",
            Self::Infirmary => "infirmary",
            Self::Reports => "reports",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Doctors => "Doctors",
            Self::Members => "Members",
            Self::Appointments => "Appointments",
            Self::Blogs => "Blogs",
            Self::Inventory => "Inventory",
            Self::Infirmary => "Infirmary",
            Self::Reports => "Reports",
        }
    }

    /// Page size the screen requests. The doctors directory is a 3x3 grid.
    pub fn default_limit(self) -> u32 {
        match self {
            Self::Doctors => 9,
            _ => DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn filters(self) -> &'static FilterSchema {
        match self {
            Self::Doctors => &DOCTOR_FILTERS,
            Self::Members => &MEMBER_FILTERS,
            Self::Appointments => &APPOINTMENT_FILTERS,
            Self::Blogs => &BLOG_FILTERS,
            Self::Inventory => &INVENTORY_FILTERS,
            Self::Infirmary => &INFIRMARY_FILTERS,
            Self::Reports => &REPORT_FILTERS,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown resource '{s}'. Must be one of: {}",
                    Resource::ALL.map(Resource::as_str).join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub speciality: Option<String>,
    #[serde(default)]
    pub hospital_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub membership_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(default)]
    pub doctor_id: Option<RecordId>,
    #[serde(default)]
    pub member_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub item_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub stock_status: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfirmaryVisit {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub student_name: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub complaint: Option<String>,
    #[serde(default)]
    pub visit_date: Option<Timestamp>,
}
