// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Live zone statistics reader.
//!
//! While tracking runs, the service pushes the per-zone population counts
//! and the stored thresholds as server-sent events, one JSON object per
//! `data:` event. A background thread parses them and hands them to the
//! event loop tagged with the tracking generation they belong to.

use super::client::{ServiceClient, Thresholds};
use super::feed::FeedHandle;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// One statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LiveStats {
    /// People currently inside each zone, keyed by label
    #[serde(default)]
    pub counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// Splits a `text/event-stream` body into event payloads.
pub struct SseReader<R> {
    inner: R,
    line: String,
}

impl<R: BufRead> SseReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
        }
    }

    /// Read the next event's data, `None` once the stream ends. Multiple
    /// `data:` lines are joined with a newline; an event cut off by the
    /// end of the stream is dropped.
    pub fn next_event(&mut self) -> io::Result<Option<String>> {
        let mut data: Option<String> = None;
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                match data.take() {
                    Some(event) => return Ok(Some(event)),
                    None => continue,
                }
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                match data.as_mut() {
                    Some(event) => {
                        event.push('\n');
                        event.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                }
            }
        }
    }
}

/// Decode one event payload.
pub fn parse_stats(data: &str) -> Result<LiveStats, serde_json::Error> {
    serde_json::from_str(data)
}

/// Message from a stats thread to the event loop.
pub enum StatsEvent {
    Update { generation: u64, stats: LiveStats },
    Ended { generation: u64, error: Option<String> },
}

/// Start reading the statistics stream on a background thread.
///
/// `wake` is called after every message so the event loop repaints.
pub fn spawn_stats<F>(client: ServiceClient, generation: u64, sender: Sender<StatsEvent>, wake: F) -> FeedHandle
where
    F: Fn() + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();

    std::thread::spawn(move || {
        let result = (|| -> Result<(), String> {
            let response = client.open_stats().map_err(|e| e.to_string())?;
            log::info!("Stats stream {} open", generation);
            let mut reader = SseReader::new(BufReader::new(response));

            while !flag.load(Ordering::Relaxed) {
                let Some(data) = reader.next_event().map_err(|e| e.to_string())? else {
                    break;
                };
                match parse_stats(&data) {
                    Ok(stats) => {
                        if sender.send(StatsEvent::Update { generation, stats }).is_err() {
                            break;
                        }
                        wake();
                    }
                    Err(e) => log::debug!("Skipping malformed stats event: {}", e),
                }
            }
            Ok(())
        })();

        if !flag.load(Ordering::Relaxed) {
            let _ = sender.send(StatsEvent::Ended {
                generation,
                error: result.err(),
            });
            wake();
        }
        log::info!("Stats stream {} closed", generation);
    });

    FeedHandle::new(stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(body: &str) -> SseReader<Cursor<Vec<u8>>> {
        SseReader::new(Cursor::new(body.as_bytes().to_vec()))
    }

    #[test]
    fn test_events_split_on_blank_lines() {
        let mut events = reader("data: {\"a\":1}\n\ndata: {\"b\":2}\r\n\r\n");
        assert_eq!(events.next_event().unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(events.next_event().unwrap().as_deref(), Some("{\"b\":2}"));
        assert!(events.next_event().unwrap().is_none());
    }

    #[test]
    fn test_comments_and_other_fields_are_skipped() {
        let mut events = reader(": keep-alive\n\nevent: stats\nid: 7\ndata:{\"a\":1}\n\n");
        assert_eq!(events.next_event().unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(events.next_event().unwrap().is_none());
    }

    #[test]
    fn test_multi_line_data_is_joined() {
        let mut events = reader("data: {\"counts\":\ndata: {}}\n\n");
        assert_eq!(events.next_event().unwrap().as_deref(), Some("{\"counts\":\n{}}"));
    }

    #[test]
    fn test_unterminated_event_is_dropped() {
        let mut events = reader("data: {\"a\":1}\n\ndata: {\"partial\"");
        assert!(events.next_event().unwrap().is_some());
        assert!(events.next_event().unwrap().is_none());
    }

    #[test]
    fn test_parse_service_payload() {
        let stats = parse_stats(r#"{"counts": {"Gate": 4, "Hall": 0}, "thresholds": {"Gate": 3}}"#).unwrap();
        assert_eq!(stats.counts.get("Gate"), Some(&4));
        assert_eq!(stats.counts.get("Hall"), Some(&0));
        assert_eq!(stats.thresholds.get("Gate"), Some(&3));

        let empty = parse_stats(r#"{"counts": {}}"#).unwrap();
        assert_eq!(empty, LiveStats::default());
        assert!(parse_stats("not json").is_err());
    }
}
