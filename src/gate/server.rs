//! Line-protocol gate loop.

use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};

use super::protocol::{GateRequest, GateResponse};
use crate::error::Result;
use crate::ratelimit::Limiters;

/// Counters reported when the gate stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub requests: u64,
    pub allowed: u64,
    pub throttled: u64,
    pub malformed: u64,
}

/// Answers rate limit requests read line by line.
pub struct GateServer {
    limiters: Limiters,
    /// How often idle identifiers are swept, if at all
    sweep_interval: Option<Duration>,
}

impl GateServer {
    pub fn new(limiters: Limiters) -> Self {
        Self {
            limiters,
            sweep_interval: None,
        }
    }

    /// Periodically drop identifiers with no attempts left in their window.
    pub fn with_sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Serve until the input reaches end of file.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<GateStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.serve_with_shutdown(reader, writer, std::future::pending())
            .await
    }

    /// Serve until end of file or until `signal` resolves.
    pub async fn serve_with_shutdown<R, W, F>(
        &self,
        reader: R,
        mut writer: W,
        signal: F,
    ) -> Result<GateStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        let mut lines = reader.lines();
        let mut stats = GateStats::default();
        let mut sweeper = self.sweep_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        tokio::pin!(signal);

        info!(
            sweep_interval_secs = self.sweep_interval.map(|d| d.as_secs()),
            "Gate started"
        );

        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("Shutdown requested, stopping gate");
                    break;
                }
                _ = next_tick(&mut sweeper) => {
                    self.limiters.sweep_idle();
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    let response = self.respond(&line, &mut stats);
                    let mut encoded = serde_json::to_vec(&response)?;
                    encoded.push(b'\n');
                    writer.write_all(&encoded).await?;
                    writer.flush().await?;
                }
            }
        }

        info!(
            requests = stats.requests,
            allowed = stats.allowed,
            throttled = stats.throttled,
            malformed = stats.malformed,
            "Gate stopped"
        );
        Ok(stats)
    }

    fn respond(&self, line: &str, stats: &mut GateStats) -> GateResponse {
        stats.requests += 1;

        let request = match GateRequest::parse(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed gate request");
                stats.malformed += 1;
                return GateResponse::Error {
                    error: e.to_string(),
                };
            }
        };

        let response = request.handle(&self.limiters);
        if let GateResponse::Decision { allowed, .. } = &response {
            if *allowed {
                stats.allowed += 1;
            } else {
                stats.throttled += 1;
            }
        }
        response
    }
}

/// Resolves on the next sweep tick, or never when sweeping is off.
async fn next_tick(sweeper: &mut Option<Interval>) {
    match sweeper {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
