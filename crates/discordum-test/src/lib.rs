//! Shared test utilities for the Dynamic Discord UM+ crates.
//!
//! Mock hosts, senders, launchers and fetchers, plus builders for the
//! runtime archive formats. Use as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! discordum-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use discordum_runtime::Supervisor;
//! use discordum_test::{MockLauncher, ChildScript, test_config};
//!
//! let launcher = MockLauncher::new().with_script(ChildScript::Cooperative);
//! let mut supervisor = Supervisor::new(Box::new(launcher.clone()), "/tmp/data", Platform::Linux);
//! supervisor.start(&test_config()).unwrap();
//! supervisor.stop();
//! assert_eq!(launcher.children()[0].stdin(), b"STOP\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod archives;
pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
