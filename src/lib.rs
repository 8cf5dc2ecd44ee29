//! Decode Training Center XML (TCX) activity files.
//!
//! ```no_run
//! let text = std::fs::read_to_string("run.tcx").unwrap();
//! for activity in tcxrs::parse(&text).unwrap() {
//!     println!("{} ({}): {} -> {}", activity.name(), activity.sport(), activity.start(), activity.stop());
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod models;
pub mod xml;

pub use error::{DecodeContext, DecodeError, Result, TcxRsError};
pub use import::{parse, parse_with, Namespaces};
pub use models::{Activity, Lap, Point};
