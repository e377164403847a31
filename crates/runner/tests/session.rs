//! End-to-end blotter sessions over the simulated trade flow

use blotter_feed::GeneratorConfig;
use blotter_runner::{BlotterConfig, BlotterSession, PageSnapshot, ScriptStep};
use std::time::Duration;

fn config(initial_trades: usize, trades_per_tick: usize, close_probability: f64) -> BlotterConfig {
    BlotterConfig {
        generator: GeneratorConfig {
            initial_trades,
            trades_per_tick,
            close_probability,
            seed: Some(42),
            ..Default::default()
        },
        tick_interval_ms: 20,
        page_size: 5,
        ..Default::default()
    }
}

async fn settle(session: &BlotterSession, condition: impl Fn(&PageSnapshot) -> bool) -> PageSnapshot {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let snapshot = session.snapshot();
            if condition(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("view did not settle")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_pages_through_static_book() {
    let _ = env_logger::try_init();

    let mut session = BlotterSession::start(config(20, 0, 0.0)).unwrap();
    let first = settle(&session, |s| s.rows.len() == 5 && s.response.total_size == 20).await;
    assert_eq!(first.response.page, 1);
    assert_eq!(first.response.pages, 4);

    session
        .apply_step(&ScriptStep {
            page: Some(2),
            sort: Some("Identifier".into()),
            ..Default::default()
        })
        .unwrap();

    // Page two under id order starts after the five lowest ids
    let mut ids: Vec<u64> = session.cache().trades().iter().map(|t| t.id).collect();
    ids.sort_unstable();
    let expected: Vec<u64> = ids[5..10].to_vec();

    let second = settle(&session, |s| {
        s.response.page == 2 && s.rows.iter().map(|r| r.id).collect::<Vec<_>>() == expected
    })
    .await;
    assert_eq!(second.response.total_size, 20);

    let summary = session.shutdown().await;
    assert_eq!(summary.trades_in_cache, 20);
    assert_eq!(summary.projections_acquired, 20);
    assert_eq!(summary.projections_live, 0);
    assert_eq!(summary.projections_released, summary.projections_acquired);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_search_narrows_rows() {
    let _ = env_logger::try_init();

    let mut session = BlotterSession::start(config(40, 0, 0.0)).unwrap();
    settle(&session, |s| s.response.total_size == 40).await;

    session
        .apply_step(&ScriptStep {
            search_text: Some("usdjpy".into()),
            ..Default::default()
        })
        .unwrap();

    let expected = session
        .cache()
        .trades()
        .iter()
        .filter(|t| t.currency_pair == "USDJPY")
        .count();
    let snapshot = settle(&session, |s| s.response.total_size == expected).await;
    assert!(snapshot.rows.iter().all(|r| r.currency_pair == "USDJPY"));
    assert_eq!(snapshot.rows.len(), expected.min(5));

    let summary = session.shutdown().await;
    assert_eq!(summary.projections_live, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scripted_run_ends_without_leaks() {
    let _ = env_logger::try_init();

    let mut config = config(30, 2, 0.05);
    config.run_for_ms = Some(800);
    config.script = vec![
        ScriptStep {
            at_ms: 300,
            sort: Some("Recent Trades".into()),
            ..Default::default()
        },
        ScriptStep {
            at_ms: 100,
            page: Some(3),
            search_text: Some("a".into()),
            ..Default::default()
        },
    ];

    let session = BlotterSession::start(config).unwrap();
    let summary = tokio::time::timeout(Duration::from_secs(10), session.run())
        .await
        .expect("session did not stop")
        .unwrap();

    assert!(summary.batches_applied > 0);
    assert!(summary.projections_acquired >= 30);
    assert_eq!(summary.projections_live, 0);
    assert_eq!(summary.projections_released, summary.projections_acquired);
}
