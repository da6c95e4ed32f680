// tests/channel_parse.rs
use channel_relay::ingest::channel::{parse_page, ChannelReader};
use channel_relay::ingest::SourceReader;
use channel_relay::Source;

const PAGE: &str = include_str!("fixtures/channel_page.html");

#[test]
fn malformed_post_is_skipped_and_rest_kept_in_page_order() {
    let src = Source::new("relaytest");
    let msgs = parse_page(PAGE, &src);

    // 4 containers, the third has no time element
    assert_eq!(msgs.len(), 3);
    let ts: Vec<i64> = msgs.iter().map(|m| m.timestamp).collect();
    assert_eq!(ts, vec![1_709_294_400, 1_709_296_200, 1_709_290_800]);
    assert!(msgs.iter().all(|m| m.text != "Lost its timestamp"));
}

#[test]
fn first_post_has_every_field() {
    let src = Source::new("relaytest");
    let first = parse_page(PAGE, &src).remove(0);

    assert_eq!(
        first.text,
        "First line\nSecond line with [click](https://example.com) inside"
    );
    assert!(first.text.contains("[click](https://example.com)"));
    assert_eq!(first.photo.as_deref(), Some("https://cdn.example/photo101.jpg"));
    assert_eq!(first.author.as_deref(), Some("Relay Test"));
    assert_eq!(
        first.profile_picture.as_deref(),
        Some("https://cdn.example/avatar.jpg")
    );
    assert_eq!(first.source_id, "relaytest");
    assert_eq!(first.color, src.color);
}

#[test]
fn optional_fields_absent_and_offsets_normalized() {
    let src = Source::with_color("relaytest", 0x2A_AB_EE);
    let second = parse_page(PAGE, &src).remove(1);

    assert_eq!(second.text, "No photo here & no author");
    assert_eq!(second.photo, None);
    assert_eq!(second.author, None);
    assert_eq!(second.profile_picture, None);
    // 14:30+02:00
    assert_eq!(second.timestamp, 1_709_296_200);
    assert_eq!(second.color, 0x2A_AB_EE);
}

#[test]
fn nested_markup_and_breaks() {
    let msgs = parse_page(PAGE, &Source::new("relaytest"));
    assert_eq!(msgs[2].text, "Bold start\nthen [@other](https://t.me/other)");
}

#[test]
fn page_without_posts_is_empty_not_error() {
    let msgs = parse_page("<html><body><p>nothing</p></body></html>", &Source::new("x"));
    assert!(msgs.is_empty());
}

#[test]
fn bad_datetime_is_skipped() {
    let html = r#"
<div class="tgme_widget_message_wrap">
  <div class="tgme_widget_message_text">ok</div>
  <a class="tgme_widget_message_date"><time datetime="yesterday"></time></a>
</div>
<div class="tgme_widget_message_wrap">
  <div class="tgme_widget_message_text">fine</div>
  <a class="tgme_widget_message_date"><time datetime="1970-01-01T00:00:10+00:00"></time></a>
</div>"#;
    let msgs = parse_page(html, &Source::new("x"));
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].timestamp, 10);
}

#[test]
fn parsing_is_deterministic() {
    let src = Source::new("relaytest");
    assert_eq!(parse_page(PAGE, &src), parse_page(PAGE, &src));
}

#[tokio::test]
async fn fixture_reader_fetches_parsed_page() {
    let reader = ChannelReader::from_fixture_str(Source::new("relaytest"), PAGE);
    let items = reader.fetch().await.expect("fixture parse ok");
    assert_eq!(items.len(), 3);
    assert_eq!(reader.source().id, "relaytest");
    assert!(reader.url().is_none());
}
