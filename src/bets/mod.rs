pub mod history;
pub mod slip;
pub mod status;
pub mod submit;

pub use history::{bet_stats, filter_bets, BetFilter, BetStats};
pub use slip::{BetSlip, BetSlipItem, BetType};
pub use status::bet_status;
pub use submit::place_slip;
