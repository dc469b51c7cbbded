use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::channel::Channel;
use crate::domain::metrics::ChannelLatencyPoint;

/// One value reported by a single series at a source-reported instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedValue {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// A row of the merged table. At least one side contributed the bucket, though its
/// reported value may itself be null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRow {
    pub timestamp: DateTime<Utc>,
    pub value_a: Option<f64>,
    pub value_b: Option<f64>,
}

#[derive(Clone, Copy)]
enum Side {
    A,
    B,
}

/// Buckets keyed on exact timestamp equality; rows keep first-appearance order.
#[derive(Default)]
struct MergeTable {
    rows: Vec<MergedRow>,
    index: HashMap<DateTime<Utc>, usize>,
}

impl MergeTable {
    fn push(&mut self, side: Side, point: TimedValue) {
        let position = match self.index.get(&point.timestamp) {
            Some(position) => *position,
            None => {
                self.rows.push(MergedRow {
                    timestamp: point.timestamp,
                    value_a: None,
                    value_b: None,
                });
                self.index.insert(point.timestamp, self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        let row = &mut self.rows[position];
        // A repeated timestamp within one series overwrites the earlier value.
        match side {
            Side::A => row.value_a = point.value,
            Side::B => row.value_b = point.value,
        }
    }
}

/// Merges two independently timestamped series into one table. Every timestamp present
/// in either input appears exactly once; `series_a` timestamps come first in input order,
/// followed by timestamps only `series_b` reported.
pub fn merge(series_a: &[TimedValue], series_b: &[TimedValue]) -> Vec<MergedRow> {
    let mut table = MergeTable::default();
    for point in series_a {
        table.push(Side::A, *point);
    }
    for point in series_b {
        table.push(Side::B, *point);
    }
    table.rows
}

/// Merges an interleaved per-channel feed, keeping the order in which timestamps first
/// appear in the feed. Points for other channels are ignored.
pub fn merge_channel_points(
    points: &[ChannelLatencyPoint],
    channel_a: Channel,
    channel_b: Channel,
) -> Vec<MergedRow> {
    let mut table = MergeTable::default();
    for point in points {
        let side = if point.channel == channel_a {
            Side::A
        } else if point.channel == channel_b {
            Side::B
        } else {
            continue;
        };
        table.push(
            side,
            TimedValue {
                timestamp: point.timestamp,
                value: point.p95,
            },
        );
    }
    table.rows
}

/// Extracts the p95 series of one channel from an interleaved feed.
pub fn channel_series(points: &[ChannelLatencyPoint], channel: Channel) -> Vec<TimedValue> {
    points
        .iter()
        .filter(|point| point.channel == channel)
        .map(|point| TimedValue {
            timestamp: point.timestamp,
            value: point.p95,
        })
        .collect()
}
