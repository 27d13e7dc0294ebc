// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric names and recording helpers for the gateway.
//!
//! Built on the `metrics` facade. The binary installs the Prometheus
//! recorder; until it does, every helper here is a no-op, so library code
//! and tests can call them unconditionally.

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Register metric descriptions. Call once at startup after the recorder is
/// installed.
pub fn register_metrics() {
    describe_counter!(
        "botfleet_updates_admitted_total",
        "Webhook updates that passed admission and were enqueued"
    );
    describe_counter!(
        "botfleet_updates_rejected_total",
        "Webhook updates rejected at admission, by reason"
    );
    describe_counter!(
        "botfleet_updates_duplicate_total",
        "Webhook updates acknowledged as duplicates without enqueueing"
    );
    describe_counter!(
        "botfleet_jobs_enqueued_total",
        "Jobs written to the incoming queue"
    );
    describe_counter!(
        "botfleet_jobs_completed_total",
        "Jobs processed to completion"
    );
    describe_counter!(
        "botfleet_jobs_retried_total",
        "Job attempts that failed and were rescheduled"
    );
    describe_counter!(
        "botfleet_jobs_failed_total",
        "Jobs that exhausted their attempt budget"
    );
    describe_gauge!(
        "botfleet_queue_pending",
        "Jobs currently waiting in the incoming queue"
    );
}

pub fn record_update_admitted() {
    counter!("botfleet_updates_admitted_total").increment(1);
}

pub fn record_update_rejected(reason: &'static str) {
    counter!("botfleet_updates_rejected_total", "reason" => reason).increment(1);
}

pub fn record_update_duplicate() {
    counter!("botfleet_updates_duplicate_total").increment(1);
}

pub fn record_job_enqueued() {
    counter!("botfleet_jobs_enqueued_total").increment(1);
}

pub fn record_job_completed() {
    counter!("botfleet_jobs_completed_total").increment(1);
}

pub fn record_jobs_retried(count: u64) {
    if count > 0 {
        counter!("botfleet_jobs_retried_total").increment(count);
    }
}

pub fn record_jobs_failed(count: u64) {
    if count > 0 {
        counter!("botfleet_jobs_failed_total").increment(count);
    }
}

pub fn set_queue_pending(depth: f64) {
    gauge!("botfleet_queue_pending").set(depth);
}
