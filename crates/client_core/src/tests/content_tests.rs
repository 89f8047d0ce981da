use super::*;

#[test]
fn parse_splits_text_and_gif() {
    let body = parse("look at this [GIF:https://media.example/cat.gif]");
    assert_eq!(body.text, "look at this");
    assert_eq!(body.gif_url, Some("https://media.example/cat.gif"));
}

#[test]
fn parse_leaves_plain_and_unterminated_text_alone() {
    let plain = parse("just words");
    assert_eq!(plain.text, "just words");
    assert_eq!(plain.gif_url, None);

    let broken = parse("oops [GIF:https://media.example/cat.gif");
    assert_eq!(broken.gif_url, None);
    assert_eq!(broken.text, "oops [GIF:https://media.example/cat.gif");
}

#[test]
fn embed_gif_round_trips_through_parse() {
    let content = embed_gif("  hey ", "https://media.example/wave.gif");
    assert_eq!(content, "hey [GIF:https://media.example/wave.gif]");
    assert_eq!(embed_gif("", "https://g/x.gif"), "[GIF:https://g/x.gif]");

    let body = parse(&content);
    assert_eq!(body.text, "hey");
    assert_eq!(body.gif_url, Some("https://media.example/wave.gif"));
}

#[test]
fn first_link_skips_gif_and_trailing_punctuation() {
    let link = first_link("[GIF:https://media.example/a.gif] read https://docs.example.com/page.");
    assert_eq!(
        link.map(|url| url.to_string()),
        Some("https://docs.example.com/page".to_string())
    );
    assert!(first_link("no links here").is_none());
    assert!(first_link("ftp://files.example").is_none());
}

#[test]
fn reaction_counts_tally_per_emoji() {
    let reactions: Reactions = [
        ("alice".to_string(), "👍".to_string()),
        ("bob".to_string(), "👍".to_string()),
        ("carol".to_string(), "🎉".to_string()),
    ]
    .into_iter()
    .collect();

    let counts = reaction_counts(&reactions);
    assert_eq!(counts.get("👍"), Some(&2));
    assert_eq!(counts.get("🎉"), Some(&1));
    assert_eq!(counts.len(), 2);
}

#[test]
fn snippet_takes_first_line_and_truncates() {
    assert_eq!(snippet("short\nsecond line", 20), "short");
    assert_eq!(snippet("abcdefghij", 4), "abcd…");
    assert_eq!(snippet("[GIF:https://g/x.gif]", 10), "");
}
