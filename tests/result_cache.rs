use parlay_terminal::analysis_fetch::{AnalysisResult, AnalyzeRequest, BetType, StatType};
use parlay_terminal::result_cache::{AnalysisCache, cache_key};

fn request(player: &str, line: f64) -> AnalyzeRequest {
    AnalyzeRequest {
        player: player.to_string(),
        stat_type: StatType::PointsAssists,
        line,
        bet_type: BetType::Over,
    }
}

fn result(probability: f64) -> AnalysisResult {
    AnalysisResult {
        player: "LeBron James".to_string(),
        stat_type: "points_assists".to_string(),
        line: 32.5,
        bet_type: "over".to_string(),
        season_avg: 33.4,
        season_std: Some(7.2),
        recent_avg: 35.0,
        adjusted_avg: None,
        probability,
        edge: 0.03,
        recommendation: "LEAN".to_string(),
        confidence_80: None,
        usage: None,
    }
}

#[test]
fn key_normalizes_player_and_line() {
    let a = cache_key(&request("  LeBron James ", 32.5));
    let b = cache_key(&request("lebron james", 32.50));
    assert_eq!(a, b);
    assert_eq!(a, "lebron james|points_assists|32.5|over");

    let mut under = request("lebron james", 32.5);
    under.bet_type = BetType::Under;
    assert_ne!(cache_key(&under), a);
}

#[test]
fn nearby_lines_do_not_share_an_entry() {
    let low = request("LeBron James", 25.55);
    let high = request("LeBron James", 25.58);
    assert_ne!(cache_key(&low), cache_key(&high));

    let mut cache = AnalysisCache::new();
    cache.insert(&low, result(0.55), 1_000);
    assert!(cache.get(&high, 60, 1_010).is_none());
    cache.insert(&high, result(0.48), 1_000);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&low, 60, 1_010).map(|r| r.probability), Some(0.55));
    assert_eq!(cache.get(&high, 60, 1_010).map(|r| r.probability), Some(0.48));
}

#[test]
fn lookup_respects_ttl() {
    let mut cache = AnalysisCache::new();
    let req = request("LeBron James", 32.5);
    cache.insert(&req, result(0.55), 1_000);

    assert_eq!(cache.get(&req, 60, 1_030).map(|r| r.probability), Some(0.55));
    assert_eq!(cache.get(&req, 60, 1_060).map(|r| r.probability), Some(0.55));
    assert!(cache.get(&req, 60, 1_061).is_none());
    assert!(cache.get(&request("LeBron James", 33.5), 60, 1_030).is_none());
}

#[test]
fn newer_insert_replaces_entry() {
    let mut cache = AnalysisCache::new();
    let req = request("LeBron James", 32.5);
    cache.insert(&req, result(0.55), 1_000);
    cache.insert(&req, result(0.61), 2_000);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&req, 10, 2_005).map(|r| r.probability), Some(0.61));
}

#[test]
fn prune_drops_expired_entries() {
    let mut cache = AnalysisCache::new();
    cache.insert(&request("A", 10.5), result(0.5), 100);
    cache.insert(&request("B", 10.5), result(0.5), 500);
    cache.prune(200, 600);
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&request("B", 10.5), 200, 600).is_some());

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn oldest_entries_are_evicted_past_capacity() {
    let mut cache = AnalysisCache::new();
    for i in 0..300u64 {
        cache.insert(&request(&format!("P{i}"), 10.5), result(0.5), i);
    }
    assert_eq!(cache.len(), 256);
    assert!(cache.get(&request("P0", 10.5), u64::MAX, 300).is_none());
    assert!(cache.get(&request("P299", 10.5), u64::MAX, 300).is_some());
}
