/// Arrow schemas for exported review data.
pub mod report {
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

    /// Schema for the revision report: one row per review still awaiting action.
    pub fn review_report_schema() -> Schema {
        Schema::new(vec![
            Field::new("review_id", DataType::Int64, false),
            Field::new("ordinance_name", DataType::Utf8, false),
            Field::new("department", DataType::Utf8, true),
            Field::new("law_name", DataType::Utf8, false),
            Field::new("change_type", DataType::Utf8, false),
            Field::new("urgency", DataType::Utf8, false),
            Field::new("affected_count", DataType::UInt32, false),
            Field::new("reason", DataType::Utf8, true),
            Field::new(
                "created_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
        ])
    }

    /// Schema for the per-amendment analysis outcome log.
    pub fn analysis_outcome_schema() -> Schema {
        Schema::new(vec![
            Field::new("amendment_id", DataType::Int64, false),
            Field::new("succeeded", DataType::Boolean, false),
            Field::new("affected_ordinance_count", DataType::UInt32, true),
            Field::new("reviews_created", DataType::UInt32, true),
            Field::new("reviews_updated", DataType::UInt32, true),
            Field::new("error", DataType::Utf8, true),
        ])
    }
}
