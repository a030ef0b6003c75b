pub mod purchase;
pub mod wager;

pub use purchase::{BuyWagerRequest, Purchase};
pub use wager::{CreateWagerRequest, NewWager, Wager};
