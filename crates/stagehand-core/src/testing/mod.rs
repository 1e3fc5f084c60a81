//! In-memory transports for tests.
//!
//! Both fakes record every call and answer from scripted responses, so a test
//! can drive the whole pipeline without a network or a controller.

mod controller;
mod executor;

pub use controller::{ApiCall, FakeController};
pub use executor::{FakeExecutor, FakeFailure, RemoteCall};
