//! Load-balancing strategies over the members of an endpoint group.
//!
//! Every balancer returns an index into the group's endpoint list. They are
//! lock-free: cursors are atomics and weighted schedules are precomputed.

use bastion_types::LoadBalancerKind;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Upper bound of a precomputed weighted schedule.
const MAX_SCHEDULE_LEN: u64 = 4096;

pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Index of the next member. Callers guarantee the group is not empty.
    fn next_index(&self) -> usize;
}

pub fn build(kind: LoadBalancerKind, weights: &[u32]) -> Box<dyn LoadBalancer> {
    let len = weights.len().max(1);
    match kind {
        LoadBalancerKind::RoundRobin => Box::new(RoundRobin::new(len)),
        LoadBalancerKind::Random => Box::new(RandomBalancer { len }),
        LoadBalancerKind::WeightedRoundRobin => Box::new(WeightedRoundRobin::new(weights)),
        LoadBalancerKind::WeightedRandom => Box::new(WeightedRandom::new(weights)),
    }
}

#[derive(Debug)]
pub struct RoundRobin {
    cursor: AtomicUsize,
    len: usize,
}

impl RoundRobin {
    pub fn new(len: usize) -> Self {
        Self { cursor: AtomicUsize::new(0), len: len.max(1) }
    }
}

impl LoadBalancer for RoundRobin {
    fn next_index(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.len
    }
}

#[derive(Debug)]
pub struct RandomBalancer {
    len: usize,
}

impl LoadBalancer for RandomBalancer {
    fn next_index(&self) -> usize {
        rand::thread_rng().gen_range(0..self.len)
    }
}

/// Smooth weighted round-robin: weights 5/1/1 yield `a a b a c a a`, never
/// long bursts on the heaviest member.
#[derive(Debug)]
pub struct WeightedRoundRobin {
    schedule: Vec<usize>,
    cursor: AtomicUsize,
}

impl WeightedRoundRobin {
    pub fn new(weights: &[u32]) -> Self {
        let weights = normalize(weights);
        let total: i64 = weights.iter().map(|&w| i64::from(w)).sum();
        let mut current = vec![0_i64; weights.len()];
        let mut schedule = Vec::with_capacity(total as usize);

        for _ in 0..total {
            let mut best = 0;
            for (i, &w) in weights.iter().enumerate() {
                current[i] += i64::from(w);
                if current[i] > current[best] {
                    best = i;
                }
            }
            current[best] -= total;
            schedule.push(best);
        }

        if schedule.is_empty() {
            schedule.push(0);
        }
        Self { schedule, cursor: AtomicUsize::new(0) }
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn next_index(&self) -> usize {
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % self.schedule.len();
        self.schedule[slot]
    }
}

#[derive(Debug)]
pub struct WeightedRandom {
    cumulative: Vec<u64>,
    total: u64,
}

impl WeightedRandom {
    pub fn new(weights: &[u32]) -> Self {
        let mut total = 0_u64;
        let mut cumulative = Vec::with_capacity(weights.len());
        for &w in weights {
            total += u64::from(w.max(1));
            cumulative.push(total);
        }
        if cumulative.is_empty() {
            cumulative.push(1);
            total = 1;
        }
        Self { cumulative, total }
    }
}

impl LoadBalancer for WeightedRandom {
    fn next_index(&self) -> usize {
        let roll = rand::thread_rng().gen_range(0..self.total);
        self.cumulative.partition_point(|&bound| bound <= roll)
    }
}

/// Reduce weights by their gcd and scale them down so the schedule stays small.
fn normalize(weights: &[u32]) -> Vec<u32> {
    let weights: Vec<u32> = weights.iter().map(|&w| w.max(1)).collect();
    let divisor = weights.iter().copied().fold(0, gcd).max(1);
    let mut reduced: Vec<u32> = weights.iter().map(|&w| w / divisor).collect();

    let total: u64 = reduced.iter().map(|&w| u64::from(w)).sum();
    if total > MAX_SCHEDULE_LEN {
        reduced = reduced
            .iter()
            .map(|&w| ((u64::from(w) * MAX_SCHEDULE_LEN) / total).max(1) as u32)
            .collect();
    }
    reduced
}

const fn gcd(a: u32, b: u32) -> u32 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
