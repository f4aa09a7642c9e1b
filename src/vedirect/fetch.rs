//! History fetch orchestration: one request/response/decode cycle per day.
//!
//! Strictly half-duplex. For each day offset the fetcher sends one GET,
//! then only reads until the response frames and decodes, the per-attempt
//! wait budget runs out, or the retry budget for the day is spent. A read
//! timeout is "no data yet" and retries the read, never the request.

use chrono::{Local, NaiveDate};
use log::{debug, warn};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::vedirect::error::VeDirectError;
use crate::vedirect::hex::{HexCommand, HexResponseFramer};
use crate::vedirect::history::HistoryDayRecord;
use crate::vedirect::Transport;

/// Caller-supplied bounds for the fetch loop.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Number of days to fetch, day 0 being today.
    pub days: usize,
    /// Pause between empty reads.
    pub poll_interval: Duration,
    /// Maximum wait for one response before the attempt is abandoned.
    pub max_wait: Duration,
    /// Attempts per day before giving up with `PermanentFetchFailure`.
    pub max_attempts: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            days: 10,
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(10),
            max_attempts: 3,
        }
    }
}

/// One fetched day: the requested offset, its estimated calendar date
/// (today minus the offset) and the decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDay {
    pub day: usize,
    pub date: NaiveDate,
    pub record: HistoryDayRecord,
}

/// Drives the per-day request/response/decode cycle over a transport.
pub struct HistoryFetcher<T: Transport> {
    transport: T,
    opts: FetchOptions,
}

impl<T: Transport> HistoryFetcher<T> {
    pub fn new(transport: T, opts: FetchOptions) -> Self {
        Self { transport, opts }
    }

    /// Fetch every configured day. Days that exhaust their retry budget are
    /// logged and skipped; transport failures abort the run.
    pub async fn fetch_all(&mut self) -> Result<Vec<FetchedDay>, VeDirectError> {
        let today = Local::now().date_naive();
        let mut out = Vec::with_capacity(self.opts.days);
        for day in 0..self.opts.days {
            match self.fetch_day(day, today).await {
                Ok(fetched) => out.push(fetched),
                Err(VeDirectError::Transport(e)) => return Err(VeDirectError::Transport(e)),
                Err(e) => warn!("Skipping history day {}: {}", day, e),
            }
        }
        Ok(out)
    }

    /// Fetch a single day offset. Each attempt sends the GET once and reads
    /// until framed-and-complete or the wait budget expires; partial framer
    /// state never survives into the next attempt.
    pub async fn fetch_day(
        &mut self,
        day: usize,
        today: NaiveDate,
    ) -> Result<FetchedDay, VeDirectError> {
        let command = HexCommand::history_day(day as u16);
        let line = command.encode();
        let token = command.echoed_token();

        for attempt in 1..=self.opts.max_attempts {
            debug!(
                "History day {} attempt {}/{}: sending {:?}",
                day,
                attempt,
                self.opts.max_attempts,
                line.trim_end()
            );
            self.transport.send(line.as_bytes())?;

            match self.await_response(&token).await? {
                Some(payload) => match HistoryDayRecord::decode_hex(&payload) {
                    Ok(record) => {
                        let date = today - chrono::Days::new(day as u64);
                        return Ok(FetchedDay { day, date, record });
                    }
                    Err(e) => {
                        warn!("History day {} attempt {}: bad payload: {}", day, attempt, e);
                    }
                },
                None => {
                    debug!("History day {} attempt {}: timed out", day, attempt);
                }
            }
        }

        Err(VeDirectError::PermanentFetchFailure {
            day,
            attempts: self.opts.max_attempts,
        })
    }

    /// Read until one response frames against `token`, validating its
    /// checksum. `Ok(None)` when the wait budget expires or the framed line
    /// fails validation; the caller charges either against the day's
    /// attempts.
    async fn await_response(&mut self, token: &str) -> Result<Option<String>, VeDirectError> {
        let mut framer = HexResponseFramer::for_history_record(token);
        let deadline = Instant::now() + self.opts.max_wait;
        let mut buf = [0u8; 256];

        while Instant::now() < deadline {
            let n = self.transport.read_chunk(&mut buf)?;
            if n == 0 {
                // No data yet; keep waiting, do not re-send.
                sleep(self.opts.poll_interval).await;
                continue;
            }
            if let Some(payload) = framer.push(&buf[..n]) {
                if let Err(e) = framer.verify_checksum() {
                    warn!("Discarding hex response: {}", e);
                    return Ok(None);
                }
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Release the transport once fetching is done.
    pub fn into_transport(self) -> T {
        self.transport
    }
}
