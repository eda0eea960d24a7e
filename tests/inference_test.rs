use chrono::NaiveDate;
use sheetviz::field::{FieldType, FieldValue, RawValue};
use sheetviz::inference::{BOOLEAN_WORDS, infer_type};
use sheetviz::normalize::normalize;

fn text(s: &str) -> RawValue {
    RawValue::from(s)
}

#[test]
fn boolean_words_win_over_everything() {
    for word in BOOLEAN_WORDS {
        assert_eq!(infer_type(&text(word)), FieldType::Boolean, "{}", word);
    }
    assert_eq!(infer_type(&RawValue::Bool(false)), FieldType::Boolean);
    assert_eq!(infer_type(&text("Yes")), FieldType::Boolean);
    assert_eq!(infer_type(&text("FALSE")), FieldType::Boolean);
    // Lower-case single letters are not in the list.
    assert_eq!(infer_type(&text("y")), FieldType::Text);
    assert_eq!(infer_type(&text("n")), FieldType::Text);
}

#[test]
fn numbers_are_detected_before_dates() {
    assert_eq!(infer_type(&text("42")), FieldType::Number);
    assert_eq!(infer_type(&text("2024")), FieldType::Number);
    assert_eq!(infer_type(&text("-3.5")), FieldType::Number);
    assert_eq!(infer_type(&RawValue::Number(7.0)), FieldType::Number);
    assert_eq!(infer_type(&text("42abc")), FieldType::Text);
}

#[test]
fn dates_emails_and_text() {
    assert_eq!(infer_type(&text("2024-01-15")), FieldType::Date);
    assert_eq!(infer_type(&text("1/15/2024")), FieldType::Date);
    // Parseable, but not shaped like a numeric date.
    assert_eq!(infer_type(&text("March 5, 2024")), FieldType::Text);
    assert_eq!(infer_type(&text("john@example.com")), FieldType::Email);
    assert_eq!(infer_type(&text("john@localhost")), FieldType::Text);
    assert_eq!(infer_type(&text("hello")), FieldType::Text);
}

#[test]
fn empty_samples_are_text() {
    assert_eq!(infer_type(&RawValue::Empty), FieldType::Text);
    assert_eq!(infer_type(&text("")), FieldType::Text);
    assert_eq!(infer_type(&text("   ")), FieldType::Text);
}

#[test]
fn inference_is_deterministic() {
    let samples = ["42", "true", "2024-01-15", "a@b.co", "plain", ""];
    for sample in samples {
        assert_eq!(infer_type(&text(sample)), infer_type(&text(sample)));
    }
}

#[test]
fn normalization_is_total() {
    let inputs = [
        RawValue::Empty,
        text(""),
        text("garbage"),
        text("12abc"),
        RawValue::Number(f64::NAN),
        RawValue::Bool(true),
    ];

    for raw in &inputs {
        for field_type in FieldType::ALL {
            let value = normalize(raw, field_type);
            assert_eq!(value.field_type(), field_type);
        }
    }
}

#[test]
fn normalization_examples() {
    assert_eq!(normalize(&text("12abc"), FieldType::Number), FieldValue::Number(0.0));
    assert_eq!(normalize(&text(" 1e3 "), FieldType::Number), FieldValue::Number(1000.0));
    assert_eq!(
        normalize(&RawValue::Number(f64::INFINITY), FieldType::Number),
        FieldValue::Number(0.0)
    );

    assert_eq!(normalize(&text("Yes"), FieldType::Boolean), FieldValue::Boolean(true));
    assert_eq!(normalize(&text("1"), FieldType::Boolean), FieldValue::Boolean(true));
    assert_eq!(normalize(&text("no"), FieldType::Boolean), FieldValue::Boolean(false));
    assert_eq!(normalize(&RawValue::Number(1.0), FieldType::Boolean), FieldValue::Boolean(true));

    assert_eq!(
        normalize(&text("2024-01-15"), FieldType::Date),
        FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15))
    );
    assert_eq!(normalize(&text("soon"), FieldType::Date), FieldValue::Date(None));
    assert_eq!(
        normalize(&RawValue::Number(45306.0), FieldType::Date),
        FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15))
    );

    assert_eq!(
        normalize(&RawValue::Number(30.0), FieldType::Text),
        FieldValue::Text("30".to_string())
    );
    assert_eq!(normalize(&RawValue::Empty, FieldType::Email), FieldValue::Email(String::new()));
}
