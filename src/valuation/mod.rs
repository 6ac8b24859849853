pub mod batch;
pub mod tree;
pub mod valuator;

pub use batch::{value_characters, BatchSummary, CharacterOutcome};
pub use tree::{AssetTreeError, CharacterAssets};
pub use valuator::{AssetRow, AssetValuator, Valuation, ValuationError, PRICE_FAILURE_POLICY};
