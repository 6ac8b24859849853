use rust_decimal::Decimal;
use tracing::{error, info, instrument};

use super::tree::CharacterAssets;
use super::valuator::{AssetValuator, Valuation, ValuationError};
use crate::account::CharacterRecord;
use crate::db::db_manager::DbManager;
use crate::pricing::MarketStatSource;

#[derive(Debug)]
pub struct CharacterOutcome {
    pub char_id: i64,
    pub name: String,
    pub result: Result<Valuation, ValuationError>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<CharacterOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Sum over the characters that were valued successfully, `None` on overflow
    pub fn total_value(&self) -> Option<Decimal> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .try_fold(Decimal::ZERO, |total, valuation| total.checked_add(valuation.grand_total))
    }
}

/// Values and persists every character in turn.
///
/// A failing character is recorded in the summary and its previously stored
/// snapshot is left as it was; the remaining characters are still processed.
/// Stored rows of characters absent from `characters` are deleted afterwards.
#[instrument(skip_all, fields(characters = characters.len()))]
pub async fn value_characters<S: MarketStatSource>(
    valuator: &AssetValuator<'_, S>,
    db: &DbManager,
    characters: &[CharacterRecord],
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for character in characters {
        let result = value_and_store(valuator, db, character).await;
        if let Err(e) = &result {
            error!(char_id = character.char_id, name = %character.name, error = %e, "Character valuation failed");
        }
        summary.outcomes.push(CharacterOutcome {
            char_id: character.char_id,
            name: character.name.clone(),
            result,
        });
    }

    let char_ids: Vec<i64> = characters.iter().map(|character| character.char_id).collect();
    match db.prune_characters_except(&char_ids).await {
        Ok(0) => {}
        Ok(pruned) => info!(pruned, "Removed stored assets of characters no longer on the account"),
        Err(e) => error!(error = %e, "Failed to prune stored assets of departed characters"),
    }

    info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        total = ?summary.total_value(),
        "Asset valuation batch finished"
    );
    summary
}

async fn value_and_store<S: MarketStatSource>(
    valuator: &AssetValuator<'_, S>,
    db: &DbManager,
    character: &CharacterRecord,
) -> Result<Valuation, ValuationError> {
    let assets = CharacterAssets::from_json(&character.assets)?;
    let valuation = valuator.value_assets(character.char_id, &assets).await?;

    db.replace_character_assets(character.char_id, &valuation.rows)
        .await
        .map_err(ValuationError::Storage)?;

    Ok(valuation)
}
