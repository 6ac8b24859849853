pub mod buy_prices;
pub mod assets;
