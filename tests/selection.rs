// tests/selection.rs
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ai_alpha_agent::analyze::{heuristic_score, rank_and_truncate, select, KeywordSet, ScoredItem, Scorer};
use ai_alpha_agent::config::FilterConfig;
use ai_alpha_agent::ingest::types::{ContentItem, SourceKind};

const WORDS: &[&str] = &["alpha", "beta", "gamma", "delta", "filler", "noise"];

fn keywords() -> KeywordSet {
    KeywordSet::new(["alpha", "beta", "gamma", "delta"])
}

fn filter(threshold: f32, max: usize) -> FilterConfig {
    FilterConfig {
        max_age_days: 30,
        min_engagement: 0,
        min_content_length: 0,
        relevance_threshold: threshold,
        max_items_per_source: max,
        require_created_at: false,
    }
}

fn random_item(rng: &mut StdRng, i: usize) -> ContentItem {
    let now = Utc::now();
    let title_word = WORDS[rng.random_range(0..WORDS.len())];
    let body: Vec<&str> = (0..rng.random_range(0..6))
        .map(|_| WORDS[rng.random_range(0..WORDS.len())])
        .collect();
    ContentItem {
        source: SourceKind::Forum,
        origin: "test".into(),
        title: format!("post {title_word}"),
        body: body.join(" "),
        url: format!("https://t.test/{i}"),
        created_at: if rng.random_bool(0.8) {
            Some(now - Duration::hours(rng.random_range(0..48)))
        } else {
            None
        },
        engagement: rng.random_range(0..5),
        extra: Default::default(),
    }
}

async fn scored(item: ContentItem) -> ScoredItem {
    Scorer::heuristic_only(keywords()).score(item).await
}

#[tokio::test]
async fn selection_respects_quota_threshold_and_order() {
    let mut rng = StdRng::seed_from_u64(7);
    let scorer = Scorer::heuristic_only(keywords());
    for round in 0..50 {
        let n = rng.random_range(0..30);
        let items: Vec<_> = (0..n).map(|i| random_item(&mut rng, i)).collect();
        let threshold = [0.0, 0.2, 0.5, 0.9][round % 4];
        let max = rng.random_range(1..6);

        let sel = select(items, &filter(threshold, max), &scorer, Utc::now()).await;

        assert!(sel.selected.len() <= max);
        assert_eq!(sel.scored, n - sel.ineligible);
        assert!(sel.selected.iter().all(|s| s.relevance_score() >= threshold));
        for pair in sel.selected.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.relevance_score() >= b.relevance_score());
            if a.relevance_score() == b.relevance_score() {
                assert!(a.item().engagement >= b.item().engagement);
            }
        }
    }
}

#[test]
fn heuristic_is_bounded_and_idempotent() {
    let mut rng = StdRng::seed_from_u64(11);
    let kw = keywords();
    for i in 0..200 {
        let it = random_item(&mut rng, i);
        let a = heuristic_score(&kw, &it);
        let b = heuristic_score(&kw, &it);
        assert!((0.0..=1.0).contains(&a.score));
        assert_eq!(a, b);
    }
}

#[test]
fn heuristic_applies_per_hit_cap_and_title_bonus() {
    let kw = keywords();
    let mut it = ContentItem {
        source: SourceKind::Forum,
        origin: "test".into(),
        title: "nothing here".into(),
        body: "alpha beta gamma delta".into(),
        url: "https://t.test/cap".into(),
        created_at: None,
        engagement: 0,
        extra: Default::default(),
    };
    // four hits capped at 0.6
    assert!((heuristic_score(&kw, &it).score - 0.6).abs() < 1e-6);
    it.title = "Alpha release".into();
    assert!((heuristic_score(&kw, &it).score - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn ties_break_by_engagement_then_date_then_url() {
    let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let mk = |url: &str, engagement: u64, created_at| ContentItem {
        source: SourceKind::Forum,
        origin: "test".into(),
        title: "alpha".into(),
        body: String::new(),
        url: url.into(),
        created_at,
        engagement,
        extra: Default::default(),
    };
    let items = vec![
        scored(mk("https://t.test/d", 5, None)).await,
        scored(mk("https://t.test/c", 5, Some(t0 + Duration::days(1)))).await,
        scored(mk("https://t.test/b", 5, Some(t0))).await,
        scored(mk("https://t.test/a", 5, Some(t0))).await,
        scored(mk("https://t.test/e", 9, None)).await,
    ];
    let ranked = rank_and_truncate(items, 10);
    let urls: Vec<&str> = ranked.iter().map(|s| s.item().url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://t.test/e",
            "https://t.test/a",
            "https://t.test/b",
            "https://t.test/c",
            "https://t.test/d",
        ]
    );
}

#[tokio::test]
async fn below_threshold_and_ineligible_are_counted() {
    let now = Utc::now();
    let base = ContentItem {
        source: SourceKind::Forum,
        origin: "test".into(),
        title: "alpha beta".into(),
        body: "gamma".into(),
        url: "https://t.test/keep".into(),
        created_at: Some(now),
        engagement: 1,
        extra: Default::default(),
    };
    let off_topic = ContentItem {
        title: "cooking".into(),
        body: "soup".into(),
        url: "https://t.test/low".into(),
        ..base.clone()
    };
    let stale = ContentItem {
        url: "https://t.test/old".into(),
        created_at: Some(now - Duration::days(90)),
        ..base.clone()
    };

    let scorer = Scorer::heuristic_only(keywords());
    let sel = select(vec![base, off_topic, stale], &filter(0.3, 3), &scorer, now).await;
    assert_eq!(sel.ineligible, 1);
    assert_eq!(sel.below_threshold, 1);
    assert_eq!(sel.selected.len(), 1);
    assert_eq!(sel.selected[0].item().url, "https://t.test/keep");
}
