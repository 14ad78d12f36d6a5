pub mod history;

pub use history::{MockHistoryProvider, YieldHistoryProvider};
