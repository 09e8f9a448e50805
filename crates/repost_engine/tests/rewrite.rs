use std::sync::Arc;
use std::time::Duration;

use engine_logging::{Level, MemoryLog, PipelineLog};
use pretty_assertions::assert_eq;
use repost_core::{
    ContentLimits, ContentValidator, Denylist, ErrorKind, RewriteCandidate, FALLBACK_TAGS,
};
use repost_engine::{
    ChatCompletionClient, DisabledRewriteBackend, FixtureRewriteBackend, GenerativeClient,
    GenerativeError, GenerativeRewriteBackend, RewriteBackend, RewriteServiceBackend,
    RewriteSource, Rewriter,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TITLE: &str = "这是原始标题";
const BODY: &str = "这是原始内容，分享一个好物。";

fn rewriter(backend: impl RewriteBackend + 'static, log: Arc<MemoryLog>) -> Rewriter {
    Rewriter::new(
        Arc::new(backend),
        ContentValidator::default(),
        Duration::from_millis(200),
        log as Arc<dyn PipelineLog>,
    )
}

fn candidate(title: &str, content: &str, tags: &[&str]) -> RewriteCandidate {
    RewriteCandidate {
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Replies with a fixed string, standing in for a model.
struct CannedModel(String);

#[async_trait::async_trait]
impl GenerativeClient for CannedModel {
    async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, GenerativeError> {
        Ok(self.0.clone())
    }
}

fn generative(reply: &str) -> GenerativeRewriteBackend {
    GenerativeRewriteBackend::new(Arc::new(CannedModel(reply.to_string())), "test-model")
}

#[tokio::test]
async fn valid_remote_rewrite_is_used() {
    let log = Arc::new(MemoryLog::new());
    let backend = FixtureRewriteBackend::returning(candidate(
        "周末好去处推荐",
        "最近发现的小众公园，适合一家人出游，拍照也很出片。",
        &["#周末", "出游", "周末"],
    ));

    let outcome = rewriter(backend, log.clone()).rewrite(TITLE, BODY).await;

    assert_eq!(outcome.source, RewriteSource::Remote);
    assert!(outcome.diagnostic.is_none());
    assert_eq!(outcome.content.title(), "周末好去处推荐");
    assert_eq!(outcome.content.tags(), ["周末", "出游"]);
    assert_eq!(outcome.content.original_title(), TITLE);
    assert!(log.at_least(Level::Warn).is_empty());
}

#[tokio::test]
async fn fenced_model_output_is_accepted() {
    let reply = "当然！\n```json\n{\"title\":\"周末去哪玩\",\"content\":\"一个适合全家出游的好地方，推荐给大家。\",\"tags\":[\"周末\",\"亲子\",\"出游\"]}\n```";
    let outcome = rewriter(generative(reply), Arc::new(MemoryLog::new()))
        .rewrite(TITLE, BODY)
        .await;
    assert_eq!(outcome.source, RewriteSource::Remote);
    assert_eq!(outcome.content.tags().len(), 3);
}

#[tokio::test]
async fn unparseable_output_falls_back_with_tracking_id() {
    let log = Arc::new(MemoryLog::new());
    let outcome = rewriter(generative("抱歉，我做不到。"), log.clone())
        .rewrite(TITLE, BODY)
        .await;

    assert_eq!(outcome.source, RewriteSource::Fallback);
    assert_eq!(outcome.content.title(), "这里是初始题目");
    assert_eq!(outcome.content.body(), "这里是初始素材，推荐一个宝藏。");
    assert_eq!(outcome.content.tags(), FALLBACK_TAGS);

    let diagnostic = outcome.diagnostic.expect("diagnostic recorded");
    assert_eq!(diagnostic.kind, ErrorKind::RewriteParseFailed);

    let warnings = log.at_least(Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].get("tracking_id"),
        Some(diagnostic.tracking_id.as_str())
    );
}

#[tokio::test]
async fn invalid_remote_rewrite_falls_back() {
    let long_title = "很".repeat(60);
    let backend = FixtureRewriteBackend::returning(candidate(&long_title, "正文内容足够长了吧，应该没问题的。", &["a"]));
    let outcome = rewriter(backend, Arc::new(MemoryLog::new()))
        .rewrite(TITLE, BODY)
        .await;

    assert_eq!(outcome.source, RewriteSource::Fallback);
    let diagnostic = outcome.diagnostic.unwrap();
    assert_eq!(diagnostic.kind, ErrorKind::RewriteValidationFailed);
    assert!(diagnostic.message.contains("title must not exceed 50 characters"));
}

#[tokio::test]
async fn denylisted_remote_rewrite_falls_back() {
    let backend = FixtureRewriteBackend::returning(candidate(
        "一个关于赌博的标题",
        "这段内容完全正常，字数也足够多。",
        &["生活"],
    ));
    let outcome = rewriter(backend, Arc::new(MemoryLog::new()))
        .rewrite(TITLE, BODY)
        .await;
    assert_eq!(outcome.source, RewriteSource::Fallback);
}

#[tokio::test]
async fn slow_backend_times_out_into_fallback() {
    let backend = FixtureRewriteBackend::echo().with_delay(Duration::from_secs(2));
    let outcome = rewriter(backend, Arc::new(MemoryLog::new()))
        .rewrite(TITLE, BODY)
        .await;
    assert_eq!(outcome.source, RewriteSource::Fallback);
    assert_eq!(outcome.diagnostic.unwrap().kind, ErrorKind::RewriteUnavailable);
}

#[tokio::test]
async fn disabled_backend_always_falls_back() {
    let outcome = rewriter(DisabledRewriteBackend, Arc::new(MemoryLog::new()))
        .rewrite("", "")
        .await;
    assert_eq!(outcome.source, RewriteSource::Fallback);
    let validator = ContentValidator::default();
    let content = &outcome.content;
    assert!(validator
        .validate_all(content.title(), content.body(), content.tags())
        .valid);
}

#[tokio::test]
async fn chat_client_posts_prompt_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({ "model": "glm-4-flash" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"title\":\"新标题呀\",\"content\":\"改写后的正文，读起来更自然一些。\",\"tags\":[\"生活\"]}" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(
        "secret",
        format!("{}/", server.uri()),
        0.7,
        Duration::from_secs(2),
    )
    .unwrap();
    let backend = GenerativeRewriteBackend::new(Arc::new(client), "glm-4-flash");
    let outcome = rewriter(backend, Arc::new(MemoryLog::new()))
        .rewrite(TITLE, BODY)
        .await;

    assert_eq!(outcome.source, RewriteSource::Remote);
    assert_eq!(outcome.content.title(), "新标题呀");
}

#[tokio::test]
async fn chat_client_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let client =
        ChatCompletionClient::new("wrong", server.uri(), 0.7, Duration::from_secs(2)).unwrap();
    let err = client.complete("m", "p").await.unwrap_err();
    assert_eq!(
        err,
        GenerativeError::Api {
            status: 401,
            body: "bad key".to_string()
        }
    );
}

#[tokio::test]
async fn chat_client_requires_a_key() {
    assert!(matches!(
        ChatCompletionClient::new(" ", "http://localhost", 0.7, Duration::from_secs(1)),
        Err(GenerativeError::Config(_))
    ));
}

#[tokio::test]
async fn rewrite_service_envelope_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rewrite-content"))
        .and(body_partial_json(json!({ "title": TITLE, "content": BODY })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "title": "服务改写的标题",
                "content": "服务改写后的正文，内容依旧保持原意。",
                "tags": ["好物", "推荐"]
            }
        })))
        .mount(&server)
        .await;

    let backend = RewriteServiceBackend::new(
        &format!("{}/rewrite-content", server.uri()),
        Duration::from_secs(2),
    )
    .unwrap();
    let outcome = rewriter(backend, Arc::new(MemoryLog::new()))
        .rewrite(TITLE, BODY)
        .await;
    assert_eq!(outcome.source, RewriteSource::Remote);
    assert_eq!(outcome.content.tags(), ["好物", "推荐"]);
}

#[tokio::test]
async fn rewrite_service_failure_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": false, "error": "quota" })),
        )
        .mount(&server)
        .await;

    let backend = RewriteServiceBackend::new(&server.uri(), Duration::from_secs(2)).unwrap();
    let outcome = rewriter(backend, Arc::new(MemoryLog::new()))
        .rewrite(TITLE, BODY)
        .await;
    assert_eq!(outcome.source, RewriteSource::Fallback);
    let diagnostic = outcome.diagnostic.unwrap();
    assert_eq!(diagnostic.kind, ErrorKind::RewriteUnavailable);
    assert!(diagnostic.message.contains("quota"));
}

#[tokio::test]
async fn fallback_respects_a_custom_denylist() {
    let validator = ContentValidator::new(ContentLimits::default(), Denylist::new(["生活"]));
    let rewriter = Rewriter::new(
        Arc::new(DisabledRewriteBackend),
        validator.clone(),
        Duration::from_millis(200),
        Arc::new(MemoryLog::new()) as Arc<dyn PipelineLog>,
    );

    let outcome = rewriter.rewrite("我的生活日常", "记录生活里的小事。").await;
    assert_eq!(outcome.source, RewriteSource::Fallback);
    let content = &outcome.content;
    assert!(!content.tags().iter().any(|tag| tag == "生活"));
    assert!(!content.title().contains("生活"));
    let result = validator.validate_all(content.title(), content.body(), content.tags());
    assert!(result.valid, "{:?}", result.errors);
}
