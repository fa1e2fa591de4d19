//! Request middleware shared by the server and the handler test harness.

pub mod trace;

pub use trace::Trace;
