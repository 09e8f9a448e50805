use pretty_assertions::assert_eq;
use repost_core::{ContentLimits, ContentValidator, Denylist, ValidationResult};

fn validator() -> ContentValidator {
    ContentValidator::default()
}

#[test]
fn title_of_51_chars_has_only_the_length_error() {
    let title = "a".repeat(51);
    let result = validator().validate_title(&title);
    assert_eq!(
        result,
        ValidationResult {
            valid: false,
            errors: vec!["title must not exceed 50 characters".to_string()],
            warnings: vec![],
        }
    );
}

#[test]
fn title_length_counts_characters_not_bytes() {
    let title = "字".repeat(50);
    assert!(validator().validate_title(&title).valid);
}

#[test]
fn empty_title_errors_and_warns() {
    let result = validator().validate_title("");
    assert!(!result.valid);
    assert_eq!(result.errors, vec!["title must not be empty"]);
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn short_title_is_a_warning_only() {
    let result = validator().validate_title("abc");
    assert!(result.valid);
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn denylisted_terms_are_named_once_per_field() {
    let result = validator().validate_title("关于赌博和诈骗的赌博故事");
    assert!(!result.valid);
    assert_eq!(
        result.errors,
        vec!["title contains disallowed terms: 赌博, 诈骗"]
    );
}

#[test]
fn denylist_match_is_case_sensitive() {
    let validator = ContentValidator::new(ContentLimits::default(), Denylist::new(["Spam"]));
    assert!(validator.validate_content("this body mentions spam a lot").valid);
    assert!(!validator.validate_content("this body mentions Spam a lot").valid);
}

#[test]
fn content_bounds() {
    let v = validator();
    assert!(!v.validate_content("   ").valid);
    assert!(!v.validate_content(&"x".repeat(2001)).valid);
    let short = v.validate_content("short body");
    assert!(short.valid);
    assert_eq!(short.warnings.len(), 1);
    assert!(v.validate_content(&"x".repeat(2000)).warnings.is_empty());
}

#[test]
fn tag_rules_report_indices() {
    let v = validator();
    let empty: [&str; 0] = [];
    assert_eq!(v.validate_tags(&empty).errors, vec!["at least 1 tag(s) required"]);

    let too_many: Vec<String> = (0..11).map(|i| format!("t{i}")).collect();
    assert_eq!(
        v.validate_tags(&too_many).errors,
        vec!["no more than 10 tags allowed"]
    );

    let long = "x".repeat(21);
    let result = v.validate_tags(&["ok", " ", long.as_str(), "毒品"]);
    assert_eq!(
        result.errors,
        vec![
            "tag 2 must not be empty".to_string(),
            "tag 3 must not exceed 20 characters".to_string(),
            "tag 4 contains disallowed terms: 毒品".to_string(),
        ]
    );
}

#[test]
fn validate_all_concatenates_in_field_order() {
    let v = validator();
    let result = v.validate_all("", "短", &["暴力"]);
    assert_eq!(
        result.errors,
        vec![
            "title must not be empty".to_string(),
            "tag 1 contains disallowed terms: 暴力".to_string(),
        ]
    );
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings[0].starts_with("title"));
    assert!(result.warnings[1].starts_with("content"));
}

#[test]
fn validate_all_is_repeatable() {
    let v = validator();
    let first = v.validate_all("标题", "内容里有枪支", &["a", ""]);
    let _ = v.validate_title("something else entirely");
    let second = v.validate_all("标题", "内容里有枪支", &["a", ""]);
    assert_eq!(first, second);
}

#[test]
fn clean_content_masks_without_changing_validity() {
    let v = validator();
    let text = "不要传销，远离传销和毒品";
    assert_eq!(v.clean_content(text), "不要***，远离***和***");
    assert!(!v.validate_content(text).valid);
}

#[test]
fn limits_are_configurable() {
    let limits = ContentLimits {
        title_max: 10,
        ..ContentLimits::default()
    };
    let v = ContentValidator::new(limits, Denylist::empty());
    assert!(!v.validate_title("eleven char").valid);
}
