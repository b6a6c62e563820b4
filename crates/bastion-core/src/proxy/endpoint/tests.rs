use super::load_balancer::{LoadBalancer, WeightedRandom, WeightedRoundRobin};
use super::*;
use std::collections::HashMap;

fn group(kind: LoadBalancerKind, weights: &[u32]) -> EndpointGroup {
    let endpoints = weights
        .iter()
        .enumerate()
        .map(|(i, &weight)| {
            Arc::new(Endpoint {
                name: format!("endpoint-{}", i + 1),
                group: "default-group".to_string(),
                target: Url::parse(&format!("http://localhost:8080/endpoint-{}", i + 1))
                    .expect("valid url"),
                weight,
                connector: ConnectorKind::HttpProxy,
                mock: None,
            })
        })
        .collect();
    EndpointGroup::new("default-group", kind, endpoints)
}

fn names(group: &EndpointGroup, n: usize) -> Vec<String> {
    (0..n).filter_map(|_| group.next()).map(|e| e.name.clone()).collect()
}

#[test]
fn test_round_robin_cycles_all_members() {
    let group = group(LoadBalancerKind::RoundRobin, &[1, 1, 1]);
    assert_eq!(
        names(&group, 6),
        vec!["endpoint-1", "endpoint-2", "endpoint-3", "endpoint-1", "endpoint-2", "endpoint-3"]
    );
}

#[test]
fn test_smooth_weighted_round_robin_schedule() {
    let balancer = WeightedRoundRobin::new(&[5, 1, 1]);
    let picks: Vec<usize> = (0..7).map(|_| balancer.next_index()).collect();
    assert_eq!(picks, vec![0, 0, 1, 0, 2, 0, 0]);
}

#[test]
fn test_weighted_round_robin_reduces_large_weights() {
    let balancer = WeightedRoundRobin::new(&[1000, 1000]);
    let picks: Vec<usize> = (0..4).map(|_| balancer.next_index()).collect();
    assert_eq!(picks, vec![0, 1, 0, 1]);
}

#[test]
fn test_weighted_random_respects_weights() {
    let balancer = WeightedRandom::new(&[9, 1]);
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for _ in 0..2000 {
        *counts.entry(balancer.next_index()).or_default() += 1;
    }
    assert!(counts.get(&0).copied().unwrap_or(0) > counts.get(&1).copied().unwrap_or(0));
    assert!(counts.keys().all(|&i| i < 2));
}

#[test]
fn test_random_stays_in_bounds() {
    let group = group(LoadBalancerKind::Random, &[1, 1, 1]);
    for _ in 0..100 {
        assert!(group.next().is_some());
    }
}

#[test]
fn test_next_excluding_skips_tried_members() {
    let group = group(LoadBalancerKind::Random, &[1, 1, 1]);
    let tried = vec!["endpoint-1".to_string(), "endpoint-3".to_string()];
    for _ in 0..20 {
        assert_eq!(group.next_excluding(&tried).map(|e| e.name.clone()).as_deref(), Some("endpoint-2"));
    }
}

#[test]
fn test_next_excluding_falls_back_when_exhausted() {
    let group = group(LoadBalancerKind::RoundRobin, &[1]);
    let tried = vec!["endpoint-1".to_string()];
    assert_eq!(group.next_excluding(&tried).map(|e| e.name.clone()).as_deref(), Some("endpoint-1"));
}

#[test]
fn test_group_from_config() {
    let config: EndpointGroupConfig = serde_json::from_value(serde_json::json!({
        "name": "g",
        "load_balancer": "weighted_round_robin",
        "endpoints": [{ "name": "a", "target": "http://localhost:1/a?e=1", "weight": 2 }]
    }))
    .expect("group config parses");

    let group = EndpointGroup::from_config(&config).expect("group builds");
    assert_eq!(group.load_balancer(), LoadBalancerKind::WeightedRoundRobin);
    let endpoint = group.find("a").expect("endpoint exists");
    assert_eq!(endpoint.group, "g");
    assert_eq!(endpoint.target.query(), Some("e=1"));
}
