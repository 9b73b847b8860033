//! Member medical-history form.

use super::{FieldKind, FieldSpec, FormSchema, ItemShape, ListPolicy, ListSpec, ObjectSpec};

pub const BLOOD_GROUPS: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
pub const CONDITION_STATUSES: &[&str] = &["Active", "Controlled", "Resolved"];
pub const MEDICATION_FREQUENCIES: &[&str] =
    &["Once daily", "Twice daily", "Thrice daily", "As needed"];
pub const ALLERGY_SEVERITIES: &[&str] = &["Mild", "Moderate", "Severe"];

pub const CHRONIC_CONDITIONS: &str = "chronicConditions";
pub const TREATING_DOCTORS: &str = "treatingDoctors";
pub const MEDICATIONS: &str = "medications";
pub const SURGERIES: &str = "surgeries";
pub const ALLERGIES: &str = "allergies";
pub const REPORTS: &str = "reports";
pub const PRIMARY_CARE_PHYSICIAN: &str = "primaryCarePhysician";

pub static MEDICAL_HISTORY: FormSchema = FormSchema {
    name: "medical history",
    scalars: &[
        FieldSpec::new("bloodGroup", FieldKind::Choice(BLOOD_GROUPS)),
        FieldSpec::new("heightCm", FieldKind::Digits { max_len: 3 }).wire("height"),
        FieldSpec::new("weightKg", FieldKind::Digits { max_len: 3 }).wire("weight"),
        FieldSpec::new("smoker", FieldKind::Flag).wire("isSmoker"),
        FieldSpec::new("lastCheckupDate", FieldKind::Date).wire("lastCheckup"),
        FieldSpec::new("notes", FieldKind::Text).wire("additionalNotes"),
    ],
    objects: &[ObjectSpec {
        name: PRIMARY_CARE_PHYSICIAN,
        wire_name: "primaryPhysician",
        fields: &[
            FieldSpec::new("name", FieldKind::Text).required(),
            FieldSpec::new("phone", FieldKind::Digits { max_len: 10 }),
            FieldSpec::new("hospitalName", FieldKind::Text),
        ],
    }],
    lists: &[
        ListSpec {
            name: CHRONIC_CONDITIONS,
            wire_name: "conditions",
            shape: ItemShape::Fields(&[
                FieldSpec::new("condition", FieldKind::Text).required(),
                FieldSpec::new("diagnosisDate", FieldKind::Date),
                FieldSpec::new("status", FieldKind::Choice(CONDITION_STATUSES)),
            ]),
            policy: ListPolicy::KEEP_ONE,
        },
        ListSpec {
            name: TREATING_DOCTORS,
            wire_name: "treatingDoctors",
            shape: ItemShape::Fields(&[
                FieldSpec::new("name", FieldKind::Text).required(),
                FieldSpec::new("hospitalName", FieldKind::Text),
                FieldSpec::new("speciality", FieldKind::Text),
            ]),
            policy: ListPolicy::KEEP_ONE,
        },
        ListSpec {
            name: MEDICATIONS,
            wire_name: "currentMedications",
            shape: ItemShape::Fields(&[
                FieldSpec::new("name", FieldKind::Text).wire("medicineName").required(),
                FieldSpec::new("dosage", FieldKind::Text),
                FieldSpec::new("frequency", FieldKind::Choice(MEDICATION_FREQUENCIES)),
                FieldSpec::new("startDate", FieldKind::Date),
            ]),
            policy: ListPolicy::KEEP_ONE,
        },
        ListSpec {
            name: SURGERIES,
            wire_name: "pastSurgeries",
            shape: ItemShape::Fields(&[
                FieldSpec::new("procedure", FieldKind::Text).required(),
                FieldSpec::new("surgeryDate", FieldKind::Date),
                FieldSpec::new("hospitalName", FieldKind::Text),
            ]),
            policy: ListPolicy::OPTIONAL_ROW,
        },
        ListSpec {
            name: ALLERGIES,
            wire_name: "allergies",
            shape: ItemShape::Fields(&[
                FieldSpec::new("allergen", FieldKind::Text).required(),
                FieldSpec::new("severity", FieldKind::Choice(ALLERGY_SEVERITIES)),
                FieldSpec::new("reaction", FieldKind::Text),
            ]),
            policy: ListPolicy::OPTIONAL_ROW,
        },
        ListSpec {
            name: REPORTS,
            wire_name: "medicalReports",
            shape: ItemShape::Attachment,
            policy: ListPolicy::OPTIONAL_ROW,
        },
    ],
};

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::forms::{FieldPath, FieldValue, FormController};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn new_record_seeds_one_row_per_list() {
        let form = FormController::new_record(&MEDICAL_HISTORY, today());
        for list in MEDICAL_HISTORY.lists {
            assert_eq!(form.rows(list.name).unwrap().len(), 1, "{}", list.name);
        }
    }

    #[test]
    fn condition_template_defaults() {
        let form = FormController::new_record(&MEDICAL_HISTORY, today());
        let field = |name| {
            form.value(FieldPath::ListItem {
                list: CHRONIC_CONDITIONS,
                index: 0,
                field: name,
            })
            .unwrap()
        };
        assert_eq!(field("condition"), FieldValue::Text(String::new()));
        assert_eq!(field("diagnosisDate"), FieldValue::Date(today()));
        assert_eq!(field("status"), FieldValue::Text("Active".into()));
    }

    #[test]
    fn fresh_form_submits_only_scalars_and_physician() {
        let form = FormController::new_record(&MEDICAL_HISTORY, today());
        let wire = form.to_wire();

        assert_eq!(wire["bloodGroup"], "A+");
        assert_eq!(wire["isSmoker"], false);
        assert_eq!(wire["lastCheckup"], "2024-06-15T00:00:00.000Z");
        assert_eq!(wire["primaryPhysician"]["name"], "");
        assert_eq!(wire["conditions"], serde_json::json!([]));
        assert_eq!(wire["medicalReports"], serde_json::json!([]));
    }
}
