//! Library API integration tests
use std::time::Duration;

use offprint_core::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const META_PATH: &str = "/api/columns/demo/posts";

fn get_fixture(name: &str, server: &MockServer) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{}", name))
        .unwrap()
        .replace("{server}", &server.uri())
}

fn article_url(server: &MockServer) -> String {
    format!("{}{}?limit=1&offset=0", server.uri(), META_PATH)
}

fn config_for(server: &MockServer, dir: &TempDir) -> OffprintConfig {
    OffprintConfig::builder()
        .api_base(server.uri())
        .asset_dir(dir.path().join("img"))
        .fetch(FetchConfig { timeout: 5, ..Default::default() })
        .build()
}

async fn mount_json(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, name: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/pic/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(name.as_bytes().to_vec()))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_payloads(server: &MockServer) {
    mount_json(server, META_PATH, get_fixture("meta.json", server)).await;
    mount_json(server, "/api/posts/s1", get_fixture("content.json", server)).await;

    Mock::given(method("GET"))
        .and(path("/api/posts/s1/comments"))
        .and(query_param("limit", "10"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(get_fixture("comments.json", server), "application/json"))
        .mount(server)
        .await;
}

async fn mount_images(server: &MockServer, expected: u64) {
    for name in ["a.jpg", "da8e974dc_xs.jpg", "v2-real_b.jpg", "b.png", "bob1_xs.jpg", "carol1_xs.jpg"] {
        mount_image(server, name, expected).await;
    }
}

#[tokio::test]
async fn test_assemble_over_http() {
    let server = MockServer::start().await;
    mount_payloads(&server).await;
    mount_images(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let assembler = Assembler::new(config_for(&server, &dir)).unwrap();
    let doc = assembler.assemble(&article_url(&server)).await.expect("should assemble");

    assert_eq!(doc.title, "Example");
    assert_eq!(doc.title_image, "./img/a.jpg");
    assert_eq!(doc.author_name, "Alice");
    assert_eq!(doc.author_avatar, "./img/da8e974dc_xs.jpg");
    assert_eq!(
        doc.published_time,
        timestamp::to_local(&json!("2017-03-01T12:34:56+08:00")).unwrap()
    );
    assert_eq!(doc.topics, vec!["Rust", "Networking"]);
    assert_eq!(
        doc.content,
        concat!(
            r#"<h2>Inner</h2><p>Intro paragraph.</p><img src="./img/v2-real_b.jpg">"#,
            r#"<h3>Details</h3><p>More <a href="https://example.com">text</a>.</p><img src="./img/b.png">"#,
        )
    );
    assert_eq!(doc.comments_count, 12);
    assert_eq!(doc.comments_link, format!("{}/api/posts/s1/comments", server.uri()));

    assert_eq!(doc.comments.len(), 2);
    assert_eq!(doc.comments[0].author_name, "Bob");
    assert_eq!(doc.comments[0].author_avatar, "./img/bob1_xs.jpg");
    assert_eq!(doc.comments[0].likes_count, 5);
    assert_eq!(doc.comments[0].reply_to, None);
    assert_eq!(doc.comments[1].reply_to.as_deref(), Some("Bob"));
    assert_eq!(doc.comments[1].content, r#"<p>Agreed, see <img src="./img/b.png"></p>"#);

    for name in ["a.jpg", "da8e974dc_xs.jpg", "v2-real_b.jpg", "b.png", "bob1_xs.jpg", "carol1_xs.jpg"] {
        let stored = std::fs::read(dir.path().join("img").join(name)).unwrap();
        assert_eq!(stored, name.as_bytes());
    }
}

#[tokio::test]
async fn test_repeat_assembly_downloads_images_once() {
    let server = MockServer::start().await;
    mount_payloads(&server).await;
    mount_images(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let first = Assembler::new(config_for(&server, &dir)).unwrap().assemble(&article_url(&server)).await.unwrap();
    let second = Assembler::new(config_for(&server, &dir)).unwrap().assemble(&article_url(&server)).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_render_formats() {
    let server = MockServer::start().await;
    mount_payloads(&server).await;
    mount_images(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let assembler = Assembler::new(config_for(&server, &dir)).unwrap();
    let url = article_url(&server);

    let html = String::from_utf8(assembler.render(&url, &HtmlRenderer::new()).await.unwrap()).unwrap();
    assert_eq!(html.matches("<h1>").count(), 1);
    assert!(html.contains("<h1>Example</h1>"));
    assert!(html.contains(r#"src="./img/a.jpg""#));
    assert!(!html.contains(&format!("{}/pic/", server.uri())));

    let json = assembler.render(&url, &JsonRenderer::new()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(value["title"], "Example");
    assert_eq!(value["comments"].as_array().unwrap().len(), 2);

    #[cfg(feature = "markdown")]
    {
        let md = String::from_utf8(assembler.render(&url, &MarkdownRenderer::new()).await.unwrap()).unwrap();
        assert!(md.starts_with("+++\ntitle = \"Example\""));
        assert!(md.contains("## Inner"));
        assert!(md.contains("![](./img/a.jpg)"));
    }
}

#[tokio::test]
async fn test_content_failure_names_step() {
    let server = MockServer::start().await;
    mount_json(&server, META_PATH, get_fixture("meta.json", &server)).await;

    let dir = TempDir::new().unwrap();
    let err = Assembler::new(config_for(&server, &dir))
        .unwrap()
        .assemble(&article_url(&server))
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(AssemblyStep::Content));
    match err {
        OffprintError::Assembly { source, .. } => {
            assert!(matches!(*source, OffprintError::Status { status: 404, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_strict_policy_aborts_on_missing_body_image() {
    let server = MockServer::start().await;
    mount_payloads(&server).await;
    for name in ["a.jpg", "da8e974dc_xs.jpg", "v2-real_b.jpg"] {
        mount_image(&server, name, 1).await;
    }

    let dir = TempDir::new().unwrap();
    let config = OffprintConfig { asset_policy: AssetPolicy::Strict, ..config_for(&server, &dir) };
    let err = Assembler::new(config).unwrap().assemble(&article_url(&server)).await.unwrap_err();

    assert_eq!(err.step(), Some(AssemblyStep::Normalize));
    assert!(err.to_string().contains("b.png"));
}

#[tokio::test]
async fn test_degrade_policy_keeps_going() {
    let server = MockServer::start().await;
    mount_payloads(&server).await;

    let dir = TempDir::new().unwrap();
    let doc = Assembler::new(config_for(&server, &dir))
        .unwrap()
        .assemble(&article_url(&server))
        .await
        .unwrap();

    assert_eq!(doc.title_image, "");
    assert_eq!(doc.author_avatar, "");
    assert!(doc.content.contains(r#"<img src="">"#));
    assert!(!doc.content.contains(&server.uri()));
}

#[tokio::test]
async fn test_metadata_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(META_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = OffprintConfig { fetch: FetchConfig { timeout: 1, ..Default::default() }, ..config_for(&server, &dir) };
    let err = Assembler::new(config).unwrap().assemble(&article_url(&server)).await.unwrap_err();

    assert_eq!(err.step(), Some(AssemblyStep::Metadata));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_fetch_and_render_invalid_url() {
    let dir = TempDir::new().unwrap();
    let config = OffprintConfig::builder().asset_dir(dir.path()).build();
    let result = fetch_and_render("not-a-url", &config, &HtmlRenderer::new()).await;

    match result {
        Err(OffprintError::Assembly { step, source }) => {
            assert_eq!(step, AssemblyStep::Metadata);
            assert!(matches!(*source, OffprintError::InvalidUrl(_)));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_normalizer_on_fixture() {
    let html = std::fs::read_to_string("../../tests/fixtures/body.html").unwrap();

    let resolved = resolve_lazy_images(&html);
    assert!(!resolved.contains("<noscript"));
    assert!(resolved.contains(r#"<img src="https://pic.example.com/v2-0000_r.jpg">"#));

    let sources = remote_image_sources(&resolved);
    assert_eq!(sources.len(), 400);

    let demoted = demote_headings(&resolved).unwrap();
    assert!(!demoted.contains("<h1"));
    assert!(demoted.contains("<h2>Benchmark body</h2>"));
    assert!(demoted.contains("<h3>Section 199</h3>"));
}
