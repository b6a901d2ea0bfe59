//! JSON-lines host for the matching engine.
//!
//! Reads one decoded request per stdin line, wrapped in an envelope naming
//! the submitting trader: `{"trader": 1, "message": "createOrder", ...}`.
//! Traders are registered on first sight with a stdout sink; every outbound
//! event is written as one JSON line tagged with its recipient:
//! `{"to": 1, "message": "executionReport", ...}`.
//!
//! Logging goes to stderr via `env_logger` (`RUST_LOG=debug` for dispatch
//! traces).

use std::io::{self, BufRead, Write};

use log::warn;
use serde_json::Value;
use tickmatch::{Event, EventSink, Matcher, TraderId};

fn stdout_sink(recipient: u64) -> Box<dyn EventSink> {
    Box::new(move |event: &Event| -> io::Result<()> {
        let mut value =
            serde_json::to_value(event).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if let Some(record) = value.as_object_mut() {
            record.insert("to".to_string(), Value::from(recipient));
        }
        let stdout = io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &value)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        out.write_all(b"\n")
    })
}

fn main() {
    env_logger::init();
    let mut matcher = Matcher::new();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stdin closed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let decoded: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                warn!("skipping unparseable line: {}", e);
                continue;
            }
        };
        let Some(trader) = decoded.get("trader").and_then(Value::as_u64) else {
            warn!("skipping line without a trader field");
            continue;
        };
        let trader = TraderId(trader);
        if !matcher.has_trader(trader) {
            matcher.add_trader(trader, stdout_sink(trader.0));
        }
        if let Err(e) = matcher.handle_message(trader, &decoded) {
            warn!("trader {}: {}", trader.0, e);
        }
    }
}
