//! # TQ42 channels
//!
//! Client library for [TQ42](https://terraquantum.io) channels. A channel is a long-lived duplex
//! gRPC stream between a remote optimization algorithm and a function you provide. The algorithm
//! *asks* for evaluations of parameter vectors, your function computes the results, and the
//! library *tells* them back. Everything stateful about this exchange is handled here:
//! sequencing, deduplication of redelivered asks, acknowledgements, timeouts, and reconnects on
//! transient transport failures.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use tq42::channel::Channel;
//! use tq42::client::Client;
//! use tq42::protocol::{Ask, Tell};
//!
//! # async fn run() -> tq42::errors::Result<()> {
//! let client = Client::from_env()?;
//! let channel = Channel::create(&client).await?;
//!
//! let end = channel
//!     .connect(
//!         |ask: Ask| async move {
//!             let results = ask.parameters.iter().map(|p| p.values.iter().sum::<f64>()).collect();
//!             Ok::<_, std::convert::Infallible>(Tell::for_ask(ask, results))
//!         },
//!         || log::info!("channel session finished"),
//!         None,
//!         Some(Duration::from_secs(300)),
//!     )
//!     .await?;
//!
//! log::info!("session ended: {end:?}");
//! # Ok(())
//! # }
//! ```
//!
//! # Features
#![doc = document_features::document_features!()]
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod channel;
pub mod client;
pub mod config;
pub mod consts;
pub mod errors;
pub mod prelude;
pub mod proto;
pub mod protocol;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
