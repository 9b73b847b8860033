//! School infirmary visit form.

use super::{FieldKind, FieldSpec, FormSchema, ItemShape, ListPolicy, ListSpec};

pub const TREATMENTS: &str = "treatments";
pub const ATTACHMENTS: &str = "attachments";

pub static INFIRMARY_VISIT: FormSchema = FormSchema {
    name: "infirmary visit",
    scalars: &[
        FieldSpec::new("studentName", FieldKind::Text).required(),
        FieldSpec::new("className", FieldKind::Text).required(),
        FieldSpec::new("rollNumber", FieldKind::Digits { max_len: 6 }),
        FieldSpec::new("visitDate", FieldKind::Date),
        FieldSpec::new("complaint", FieldKind::Text).required(),
        FieldSpec::new("parentNotified", FieldKind::Flag),
        FieldSpec::new("sentHome", FieldKind::Flag),
    ],
    objects: &[],
    lists: &[
        ListSpec {
            name: TREATMENTS,
            wire_name: "treatmentGiven",
            shape: ItemShape::Fields(&[
                FieldSpec::new("medicine", FieldKind::Text).wire("medicineName").required(),
                FieldSpec::new("dosage", FieldKind::Text),
                FieldSpec::new("remarks", FieldKind::Text),
            ]),
            policy: ListPolicy::KEEP_ONE,
        },
        ListSpec {
            name: ATTACHMENTS,
            wire_name: "documents",
            shape: ItemShape::Attachment,
            policy: ListPolicy::ALLOW_EMPTY,
        },
    ],
};

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::forms::{FieldPath, FormController};

    #[test]
    fn attachments_start_empty_treatments_start_with_one_row() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let form = FormController::new_record(&INFIRMARY_VISIT, today);
        assert_eq!(form.rows(TREATMENTS).unwrap().len(), 1);
        assert!(form.rows(ATTACHMENTS).unwrap().is_empty());
    }

    #[test]
    fn required_fields_reported_by_path() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let mut form = FormController::new_record(&INFIRMARY_VISIT, today);
        form.set_field(FieldPath::Scalar("studentName"), "Anaya").unwrap();
        form.set_field(
            FieldPath::ListItem { list: TREATMENTS, index: 0, field: "dosage" },
            "5 ml",
        )
        .unwrap();

        let err = form.validate_required().unwrap_err().to_string();
        assert!(err.contains("className"));
        assert!(err.contains("complaint"));
        assert!(err.contains("treatments[0].medicine"));
        assert!(!err.contains("studentName"));
    }
}
