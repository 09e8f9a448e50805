use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use repost_core::{
    format_for_publish, ContentLimits, ContentValidator, Denylist, PublishPayload, RewriteCandidate, RewrittenContent,
    ScrapedContent, ScrapedRecord, FALLBACK_TAGS,
};

fn record(post_id: &str) -> ScrapedRecord {
    ScrapedRecord {
        title: "这是原始标题".to_string(),
        content: "这是原始文案内容。\n\n\n\n第二段。".to_string(),
        images: vec!["https://img.example.com/1.jpg".to_string()],
        post_id: post_id.to_string(),
        scraped_at: None,
    }
}

#[test]
fn complete_record_becomes_scraped_content() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let content = ScrapedContent::from_record("p1", record("p1"), now).unwrap();
    assert_eq!(content.title(), "这是原始标题");
    assert_eq!(content.body(), "这是原始文案内容。\n\n第二段。");
    assert_eq!(content.images().len(), 1);
    assert_eq!(content.fetched_at(), now);
}

#[test]
fn structural_gaps_are_all_reported() {
    let bad = ScrapedRecord {
        title: "  ".to_string(),
        content: String::new(),
        images: vec![" ".to_string()],
        post_id: String::new(),
        scraped_at: None,
    };
    let err = ScrapedContent::from_record("p1", bad, Utc::now()).unwrap_err();
    assert_eq!(
        err.problems,
        vec!["missing title", "missing body", "no images", "missing post id"]
    );
}

#[test]
fn mismatched_post_id_is_incomplete() {
    let err = ScrapedContent::from_record("p1", record("p2"), Utc::now()).unwrap_err();
    assert_eq!(err.problems, vec!["post id p2 does not match requested p1"]);
}

#[test]
fn record_deserializes_from_wire_names() {
    let json = r#"{"title":"t","content":"c","images":["u"],"postId":"p","scrapedAt":"2024-05-01T12:00:00Z"}"#;
    let record: ScrapedRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.post_id, "p");
    assert!(record.scraped_at.is_some());
}

#[test]
fn valid_candidate_is_admitted_with_normalized_tags() {
    let candidate = RewriteCandidate {
        title: " 周末去哪儿玩 ".to_string(),
        content: "整理了五个适合周末放松的好去处，附交通和门票信息。".to_string(),
        tags: vec!["#旅行".to_string(), "周末".to_string(), "旅行".to_string()],
    };
    let content =
        RewrittenContent::validated(candidate, "原题", "原文", &ContentValidator::default())
            .unwrap();
    assert_eq!(content.title(), "周末去哪儿玩");
    assert_eq!(content.tags(), ["旅行".to_string(), "周末".to_string()]);
    assert_eq!(content.original_title(), "原题");
}

#[test]
fn invalid_candidate_is_never_constructed() {
    let candidate = RewriteCandidate {
        title: "x".repeat(60),
        content: "正文".to_string(),
        tags: vec![],
    };
    let result =
        RewrittenContent::validated(candidate, "t", "b", &ContentValidator::default()).unwrap_err();
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 2);
}

#[test]
fn fallback_applies_substitution_table_and_fixed_tags() {
    let validator = ContentValidator::default();
    let content = RewrittenContent::fallback("这是原始标题", "分享一个好物", &validator);
    assert_eq!(content.title(), "这里是初始题目");
    assert_eq!(content.body(), "推荐一个宝藏");
    assert_eq!(content.tags(), FALLBACK_TAGS);
    assert_eq!(content.original_body(), "分享一个好物");
}

#[test]
fn fallback_drops_tags_the_configured_rules_reject() {
    let validator = ContentValidator::new(ContentLimits::default(), Denylist::new(["生活"]));
    let content = RewrittenContent::fallback("原始标题", "原始内容", &validator);
    assert_eq!(content.tags(), ["分享", "推荐"]);
    let result = validator.validate_all(content.title(), content.body(), content.tags());
    assert!(result.valid, "{:?}", result.errors);

    let tight = ContentValidator::new(
        ContentLimits {
            tags_max: 1,
            ..ContentLimits::default()
        },
        Denylist::new(["生活", "无标题"]),
    );
    let content = RewrittenContent::fallback("", "", &tight);
    assert_eq!(content.tags(), ["分享"]);
    assert!(tight
        .validate_all(content.title(), content.body(), content.tags())
        .valid);
}

#[test]
fn fallback_always_passes_validation() {
    let validator = ContentValidator::default();
    let long_body = "这是".repeat(1500);
    let cases: Vec<(String, String)> = vec![
        (String::new(), String::new()),
        ("   ".to_string(), "\n\n".to_string()),
        ("标题".repeat(40), long_body),
        ("赌博也是一种标题".to_string(), "正文含有毒品和诈骗".to_string()),
        ("a".to_string(), "b".to_string()),
    ];
    for (title, body) in cases {
        let content = RewrittenContent::fallback(&title, &body, &validator);
        let result = validator.validate_all(content.title(), content.body(), content.tags());
        assert!(result.valid, "fallback for {title:?} failed: {:?}", result.errors);
    }
}

#[test]
fn publish_format_is_body_blank_line_and_hash_tags() {
    let content = RewrittenContent::fallback("标题", "正文第一行\n第二行", &ContentValidator::default());
    assert_eq!(
        format_for_publish(&content),
        "正文第一行\n第二行\n\n#生活 #分享 #推荐"
    );
}

#[test]
fn payload_text_prefixes_title() {
    let original = ScrapedContent::from_record("p1", record("p1"), Utc::now()).unwrap();
    let rewritten = RewrittenContent::fallback(original.title(), original.body(), &ContentValidator::default());

    let payload = PublishPayload::from_rewritten(&original, &rewritten, "https://xhslink.com/p1");
    assert_eq!(
        payload.text,
        format!("{}\n\n{}", rewritten.title(), format_for_publish(&rewritten))
    );
    assert_eq!(payload.images, original.images());

    let plain = PublishPayload::from_original(&original, "https://xhslink.com/p1");
    assert_eq!(plain.text, format!("{}\n\n{}", original.title(), original.body()));
    assert!(plain.tags.is_empty());
}
