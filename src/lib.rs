//! # mpptmon - VE.Direct telemetry and history logger
//!
//! mpptmon talks to a Victron MPPT solar charge controller over its
//! VE.Direct serial port. The protocol multiplexes two sub-protocols on one
//! wire: a continuously transmitted text telemetry stream and a
//! request/response hex command channel used to read device registers, most
//! usefully the per-day history records.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mpptmon::config::Config;
//! use mpptmon::vedirect::{FetchOptions, HistoryFetcher, SerialTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let transport = SerialTransport::open(&config.serial.port, config.serial.baud_rate)?;
//!     let mut fetcher = HistoryFetcher::new(transport, config.fetch_options());
//!     for day in fetcher.fetch_all().await? {
//!         println!("{} -> {:.2} kWh", day.date, day.record.yield_total_kwh);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`vedirect`] - protocol engine: text frame decoder, hex codec and
//!   framer, history record decoder, fetch orchestration, serial transport
//! - [`config`] - TOML configuration with validation
//! - [`report`] - console table and CSV output for fetched history
//! - [`logutil`] - single-line escaping of raw wire bytes for logs

pub mod config;
pub mod logutil;
pub mod report;
pub mod vedirect;
