//! Rate-aware authenticated request client—per-endpoint quota guards, timeout/cancel
//! races, typed failure classification, and server quota telemetry in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod error;
pub mod http;
pub mod obs;
pub mod quota;
pub mod session;
pub mod telemetry;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
