use super::*;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_lenient_match_with_empty_timestamp() {
    let a = Signature::new("You liked a post", "", "https://facebook.com/alice");
    let b = Signature::new("You liked a post", "3 hours ago", "https://facebook.com/alice");
    assert!(a.matches(&b));
    assert!(b.matches(&a));
}

#[test]
fn test_lenient_match_with_empty_profile() {
    let a = Signature::new("You liked a post", "10:42 AM", "");
    let b = Signature::new("You liked a post", "10:42 AM", "https://facebook.com/bob");
    assert!(a.matches(&b));
}

#[test]
fn test_text_must_match_exactly() {
    let a = Signature::new("You liked a post", "", "");
    let b = Signature::new("You liked a photo", "", "");
    assert!(!a.matches(&b));
}

#[test]
fn test_conflicting_timestamps_do_not_match() {
    let a = Signature::new("You liked a post", "10:42 AM", "");
    let b = Signature::new("You liked a post", "11:00 AM", "");
    assert!(!a.matches(&b));
}

#[test]
fn test_conflicting_profiles_do_not_match() {
    let a = Signature::new("x", "", "https://facebook.com/a");
    let b = Signature::new("x", "", "https://facebook.com/b");
    assert!(!a.matches(&b));
}

#[test]
fn test_normalize_text_collapses_whitespace() {
    assert_eq!(normalize_text("  You \n  liked\t a   post "), "You liked a post");
    assert_eq!(normalize_text("   "), "");
}

#[test]
fn test_extract_timestamp_scans_backward() {
    let candidates = strings(&["Public", "10:42 AM", "Yesterday", "2 hours ago", "Friends"]);
    assert_eq!(extract_timestamp(&candidates), "2 hours ago");
}

#[test]
fn test_extract_timestamp_relative_duration() {
    let candidates = strings(&["Only me", "3 weeks"]);
    assert_eq!(extract_timestamp(&candidates), "3 weeks");
}

#[test]
fn test_extract_timestamp_none() {
    assert_eq!(extract_timestamp(&strings(&["Only me", "Friends"])), "");
    assert_eq!(extract_timestamp(&[]), "");
}

#[test]
fn test_extract_profile_href_first_match() {
    let links = strings(&[
        "/me/allactivity",
        "https://www.facebook.com/alice",
        "https://www.facebook.com/bob",
    ]);
    assert_eq!(extract_profile_href(&links), "https://www.facebook.com/alice");
}

#[test]
fn test_from_snapshot_prefers_description() {
    let snapshot = ContainerSnapshot {
        description: Some("  You  reacted to\na post ".to_string()),
        button_text: Some("ignored".to_string()),
        time_candidates: strings(&["5 minutes ago"]),
        links: strings(&["https://www.facebook.com/carol"]),
        ..Default::default()
    };
    let sig = Signature::from_snapshot(&snapshot);
    assert_eq!(sig.text_content, "You reacted to a post");
    assert_eq!(sig.timestamp, "5 minutes ago");
    assert_eq!(sig.profile_href, "https://www.facebook.com/carol");
}

#[test]
fn test_from_snapshot_falls_back_to_button_text() {
    let snapshot = ContainerSnapshot {
        button_text: Some(format!("  {}", "y".repeat(300))),
        ..Default::default()
    };
    let sig = Signature::from_snapshot(&snapshot);
    assert_eq!(sig.text_content.len(), 200);
}

#[test]
fn test_button_text_fallback_collapses_whitespace() {
    let snapshot = ContainerSnapshot {
        button_text: Some("  Alex   liked\n\n  a post  ".to_string()),
        ..Default::default()
    };
    let sig = Signature::from_snapshot(&snapshot);
    assert_eq!(sig.text_content, "Alex liked a post");
}

#[test]
fn test_from_empty_snapshot_is_empty() {
    let sig = Signature::from_snapshot(&ContainerSnapshot::default());
    assert!(sig.is_empty());
    assert_eq!(sig.timestamp, "");
    assert_eq!(sig.profile_href, "");
}

#[test]
fn test_signature_serializes_camel_case() {
    let sig = Signature::new("a", "b", "c");
    let json = serde_json::to_value(&sig).unwrap();
    assert_eq!(json["textContent"], "a");
    assert_eq!(json["profileHref"], "c");
}
