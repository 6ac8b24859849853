//! Plain-text console reports.
//!
//! Renderers write to any `io::Write` so the binaries can print to stdout and
//! tests can capture into a buffer. Anything that needs display names takes the
//! reference resolver; valued rows already carry theirs.

use chrono::{DateTime, TimeDelta, Utc};
use eyre::Result;
use rust_decimal::Decimal;
use std::io::Write;

use super::format::{format_currency, format_remaining, time_since, time_until, to_roman};
use crate::account::{CharacterRecord, IndustryJob, MarketOrder, SkillQueueEntry};
use crate::reference::ReferenceResolver;
use crate::valuation::{BatchSummary, Valuation};

const SKILL_QUEUE_SHOWN: usize = 5;
// A paused skill counts as this much queued time
const PAUSED_QUEUE_LENGTH_HOURS: i64 = 72;

pub fn render_character_header(out: &mut impl Write, character: &CharacterRecord) -> Result<()> {
    writeln!(out, "{}", "-".repeat(30))?;
    writeln!(out, "{} ({})", character.name, character.char_id)?;
    Ok(())
}

pub fn render_valuation(out: &mut impl Write, valuation: &Valuation) -> Result<()> {
    let mut current_location = None;

    for row in &valuation.rows {
        if current_location != Some(row.location_id) {
            writeln!(out, "Location: {}", row.location_name)?;
            current_location = Some(row.location_id);
        }

        let (indent, width) = if row.container_id.is_some() { ("      ", 50) } else { ("   ", 53) };
        writeln!(
            out,
            "{indent}{:<width$} {:>5} {:>18} | {}",
            row.name,
            row.quantity,
            format_currency(row.unit_price),
            format_currency(row.extended_price),
        )?;
    }

    writeln!(out, "{}", "*".repeat(30))?;
    writeln!(out, "{}", format_currency(valuation.grand_total))?;
    writeln!(out, "{}", "*".repeat(30))?;
    Ok(())
}

pub fn render_summary(out: &mut impl Write, summary: &BatchSummary) -> Result<()> {
    writeln!(out, "{}", "=".repeat(30))?;
    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(valuation) => {
                writeln!(out, "{:<30} {}", outcome.name, format_currency(valuation.grand_total))?
            }
            Err(e) => writeln!(out, "{:<30} FAILED: {e}", outcome.name)?,
        }
    }
    let total = summary
        .total_value()
        .map_or_else(|| "too large to sum".to_string(), format_currency);
    writeln!(out, "Total over {} character(s): {total}", summary.succeeded())?;
    if summary.failed() > 0 {
        writeln!(out, "{} character(s) could not be valued", summary.failed())?;
    }
    Ok(())
}

pub fn render_character_sheet(
    out: &mut impl Write,
    character: &CharacterRecord,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(sheet) = &character.sheet else {
        writeln!(out, "Name: {} | no character sheet available", character.name)?;
        return Ok(());
    };

    writeln!(
        out,
        "Name: {} [{}] | Age: {}",
        character.name,
        sheet.corporation,
        time_since(sheet.created_at, now)
    )?;

    let location = sheet.location.as_deref().unwrap_or("Unknown");
    match &sheet.ship {
        Some(ship) => writeln!(out, "Location: {location} Ship: {} ({})", ship.type_name, ship.name)?,
        None => writeln!(out, "Location: {location}")?,
    }

    writeln!(out, "Wallet: {}", format_currency(sheet.balance.trunc()))?;
    writeln!(out, "Skillpoints: {}", sheet.skillpoints)?;
    writeln!(out, "Clone Skillpoints: {}", sheet.clone_skillpoints)?;
    if sheet.clone_upgrade_required() {
        writeln!(out, "WARNING: CLONE UPDATE REQUIRED")?;
    }
    Ok(())
}

/// Prints up to five queued skills. Paused or empty queues print nothing.
pub async fn render_skill_queue(
    out: &mut impl Write,
    queue: &[SkillQueueEntry],
    names: &ReferenceResolver,
    now: DateTime<Utc>,
) -> Result<()> {
    match queue.first() {
        Some(SkillQueueEntry { end_ts: Some(_), .. }) => {}
        _ => return Ok(()),
    }

    if queue.len() > SKILL_QUEUE_SHOWN {
        writeln!(out, "Skill queue ({} skills total): ", queue.len())?;
    } else {
        writeln!(out, "Skill queue: ")?;
    }
    writeln!(out, "{:^34} {:^17} {:^19}", "Skill", "ETA", "Finish")?;

    let mut queue_length = TimeDelta::zero();
    for skill in queue.iter().take(SKILL_QUEUE_SHOWN) {
        let (eta, finish) = match skill.end_ts {
            // Already trained but still present in the exported data
            Some(end) if end < now => continue,
            Some(end) => {
                queue_length = queue_length.max(end - now);
                (time_until(end, now), end.format("%Y-%m-%d %H:%M:%S").to_string())
            }
            None => {
                queue_length = TimeDelta::hours(PAUSED_QUEUE_LENGTH_HOURS);
                ("None".to_string(), "Never".to_string())
            }
        };

        writeln!(
            out,
            "{:>30} {:>3} {:>17} {:>19}",
            names.type_name(skill.type_id).await?,
            to_roman(skill.level).unwrap_or("?"),
            eta,
            finish
        )?;
    }

    if queue_length < TimeDelta::hours(24) {
        writeln!(out, "Free room in skill queue!")?;
    }
    Ok(())
}

/// Undelivered, non-failed jobs only
pub async fn render_industry_jobs(
    out: &mut impl Write,
    jobs: &[IndustryJob],
    names: &ReferenceResolver,
    now: DateTime<Utc>,
) -> Result<()> {
    let active_jobs: Vec<&IndustryJob> = jobs.iter().filter(|job| job.is_active()).collect();
    if active_jobs.is_empty() {
        return Ok(());
    }

    writeln!(out, "Industry Jobs:")?;
    for job in active_jobs {
        writeln!(out, "   {}", names.station_name(job.container_id).await?)?;
        writeln!(
            out,
            "      {} | {} | {}",
            names.activity_name(job.activity_id).await?,
            names.type_name(job.output_type_id).await?,
            time_until(job.end_ts, now)
        )?;
    }
    Ok(())
}

/// Active orders, oldest first, with the total value still on the market
pub async fn render_orders(
    out: &mut impl Write,
    orders: &[MarketOrder],
    names: &ReferenceResolver,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut active_orders: Vec<&MarketOrder> = orders.iter().filter(|order| order.is_active()).collect();
    if active_orders.is_empty() {
        return Ok(());
    }
    active_orders.sort_by_key(|order| order.issued);

    writeln!(out, "Orders ({}):", active_orders.len())?;

    let mut total = Decimal::ZERO;
    for order in active_orders {
        total += order.remaining_value();
        writeln!(
            out,
            "  {:<50}  {:>17} {:>4} units end: {}",
            names.type_name(order.type_id).await?,
            format_currency(order.price),
            order.amount_left,
            format_remaining(order.expires_at() - now)
        )?;
    }

    writeln!(out, "Total: {}", format_currency(total))?;
    Ok(())
}

/// Sheet, skill queue, industry jobs and orders for one character
pub async fn render_status(
    out: &mut impl Write,
    character: &CharacterRecord,
    names: &ReferenceResolver,
    now: DateTime<Utc>,
) -> Result<()> {
    writeln!(out, "{}", "-".repeat(30))?;
    render_character_sheet(out, character, now)?;
    render_skill_queue(out, &character.skill_queue, names, now).await?;
    render_industry_jobs(out, &character.industry_jobs, names, now).await?;
    render_orders(out, &character.orders, names, now).await?;
    Ok(())
}
