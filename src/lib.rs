//! Emergency-vehicle signal preemption.
//!
//! Two loops share a handful of record stores:
//!
//! - [`monitoring`] recomputes driver-to-signal-post distances whenever the
//!   position store changes and appends an alert for every driver within
//!   1.5 km of a post.
//! - [`control_system`] cycles two signals for green times derived from
//!   sampled vehicle counts ([`flow_analyzer`]), or holds Signal 1 green for
//!   a fixed window while the emergency registry holds a High or Medium
//!   declaration.
//!
//! [`dispatch`] is the write side used by the external front-ends.

pub mod config;
pub mod control_system;
pub mod dispatch;
pub mod errors;
pub mod flow_analyzer;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod shutdown;
pub mod storage;

pub use config::Config;
pub use errors::{ConfigError, DispatchError, RecordError, SampleError, StoreError};
