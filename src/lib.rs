pub mod chart;
pub mod dates;
pub mod fund;
pub mod index;
pub mod provider;
pub mod reconcile;
pub mod run;

pub use fund::{load_funds, Fund};
pub use provider::{kh::KhProvider, HistoryProvider, RatePoint};
pub use reconcile::{reconcile, DayRecord, FundReport};
pub use run::{run, FundSummary, RunOptions};
