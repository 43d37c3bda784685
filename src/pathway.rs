// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite - Pathway Queue & Processing Model

use std::collections::VecDeque;

use crate::config::PathwayParams;
use crate::types::Transaction;

/// Slack for credit comparisons so that integral capacities complete
/// exactly `capacity` transactions on a saturated tick.
const CREDIT_TOLERANCE: f64 = 1e-9;

/// A FIFO transaction queue with a token-bucket style processing model.
///
/// Each tick the pathway earns one unit of processing power and spends
/// `1 / capacity_tps` per completed transaction. Unspent fractional credit
/// carries over while work is queued, and is discarded when the queue runs
/// dry.
#[derive(Debug, Clone)]
pub struct Pathway {
    name: String,
    params: PathwayParams,
    processing_time_per_transaction: f64,
    queue: VecDeque<Transaction>,
    processing_power: f64,
}

impl Pathway {
    pub fn new(name: impl Into<String>, params: PathwayParams) -> Self {
        let processing_time_per_transaction = processing_time(params.capacity_tps);
        Self {
            name: name.into(),
            params,
            processing_time_per_transaction,
            queue: VecDeque::new(),
            processing_power: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &PathwayParams {
        &self.params
    }

    pub fn capacity_tps(&self) -> f64 {
        self.params.capacity_tps
    }

    /// Reconfigure throughput. Used only by degradation events.
    pub fn set_capacity_tps(&mut self, capacity_tps: f64) {
        self.params.capacity_tps = capacity_tps;
        self.processing_time_per_transaction = processing_time(capacity_tps);
    }

    /// Ticks of processing power one transaction costs; infinite when capacity ≤ 0.
    pub fn processing_time_per_transaction(&self) -> f64 {
        self.processing_time_per_transaction
    }

    pub fn processing_power(&self) -> f64 {
        self.processing_power
    }

    pub fn enqueue(&mut self, transaction: Transaction) {
        self.queue.push_back(transaction);
    }

    pub fn enqueue_all(&mut self, transactions: impl IntoIterator<Item = Transaction>) {
        self.queue.extend(transactions);
    }

    /// Remove up to `count` transactions from the head, in arrival order.
    pub fn dequeue_up_to(&mut self, count: usize) -> Vec<Transaction> {
        let n = count.min(self.queue.len());
        self.queue.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Run one tick of processing and return the transactions completed.
    pub fn advance_one_tick(&mut self) -> Vec<Transaction> {
        if self.queue.is_empty() {
            // Idle capacity cannot be stockpiled.
            self.processing_power = 0.0;
            return Vec::new();
        }

        let cost = self.processing_time_per_transaction;
        if !(cost.is_finite() && cost > 0.0) {
            tracing::warn!(
                pathway = %self.name,
                capacity_tps = self.params.capacity_tps,
                "invalid processing time, no transactions processed"
            );
            return Vec::new();
        }

        self.processing_power += 1.0;
        tracing::trace!(pathway = %self.name, power = self.processing_power, "power +1");

        let mut completed = Vec::new();
        while self.processing_power + CREDIT_TOLERANCE >= cost {
            let Some(tx) = self.queue.pop_front() else {
                break;
            };
            self.processing_power = (self.processing_power - cost).max(0.0);
            completed.push(tx);
        }

        if !completed.is_empty() {
            tracing::debug!(
                pathway = %self.name,
                completed = completed.len(),
                remaining_power = self.processing_power,
                "processed transactions"
            );
        }
        completed
    }
}

fn processing_time(capacity_tps: f64) -> f64 {
    if capacity_tps > 0.0 {
        1.0 / capacity_tps
    } else {
        f64::INFINITY
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
