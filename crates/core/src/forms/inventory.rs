//! School-health inventory item form.

use super::{FieldKind, FieldSpec, FormSchema, ItemShape, ListPolicy, ListSpec};
use crate::resources::INVENTORY_CATEGORIES;

pub const STOCK_UNITS: &[&str] = &["tablets", "strips", "bottles", "boxes", "pieces"];

pub const BATCHES: &str = "batches";
pub const INVOICES: &str = "invoices";

pub static INVENTORY_ITEM: FormSchema = FormSchema {
    name: "inventory item",
    scalars: &[
        FieldSpec::new("itemName", FieldKind::Text).required(),
        FieldSpec::new("category", FieldKind::Choice(INVENTORY_CATEGORIES)),
        FieldSpec::new("unit", FieldKind::Choice(STOCK_UNITS)),
        FieldSpec::new("reorderLevel", FieldKind::Digits { max_len: 6 }),
        FieldSpec::new("supplier", FieldKind::Text),
    ],
    objects: &[],
    lists: &[
        ListSpec {
            name: BATCHES,
            wire_name: "batches",
            shape: ItemShape::Fields(&[
                FieldSpec::new("batchNumber", FieldKind::Text).required(),
                FieldSpec::new("quantity", FieldKind::Digits { max_len: 6 }).required(),
                FieldSpec::new("expiryDate", FieldKind::Date),
            ]),
            policy: ListPolicy::KEEP_ONE,
        },
        ListSpec {
            name: INVOICES,
            wire_name: "invoices",
            shape: ItemShape::Attachment,
            policy: ListPolicy::ALLOW_EMPTY,
        },
    ],
};

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::forms::{FieldPath, FieldValue, FormController};

    #[test]
    fn batch_quantity_keeps_digits_only() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut form = FormController::new_record(&INVENTORY_ITEM, today);
        let path = FieldPath::ListItem { list: BATCHES, index: 0, field: "quantity" };

        form.set_field(path, "1,200 pcs").unwrap();
        assert_eq!(form.value(path).unwrap(), FieldValue::Text("1200".into()));
    }

    #[test]
    fn batch_expiry_is_sent_as_timestamp() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut form = FormController::new_record(&INVENTORY_ITEM, today);
        form.set_field(
            FieldPath::ListItem { list: BATCHES, index: 0, field: "batchNumber" },
            "PCM-0424",
        )
        .unwrap();
        form.set_field(
            FieldPath::ListItem { list: BATCHES, index: 0, field: "expiryDate" },
            NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
        )
        .unwrap();

        let wire = form.to_wire();
        assert_eq!(wire["batches"][0]["batchNumber"], "PCM-0424");
        assert_eq!(wire["batches"][0]["expiryDate"], "2026-04-30T00:00:00.000Z");
    }
}
