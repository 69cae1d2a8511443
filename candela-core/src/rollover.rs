use chrono::{Datelike, Days, NaiveDate, Weekday};

use candela_types::{
    CandelaError, CanonicalSymbol, ContractMonth, ExpiryAnchor, RolloverRule, RolloverTrigger,
};

/// Volume lookup supplied by callers that have one; keyed by contract symbol.
pub type VolumeLookup<'a> = &'a dyn Fn(&CanonicalSymbol) -> Option<u64>;

fn third_friday(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let to_friday = (Weekday::Fri.num_days_from_monday() + 7
        - first.weekday().num_days_from_monday())
        % 7;
    first.checked_add_days(Days::new(u64::from(to_friday) + 14))
}

/// The expiry date of a contract month under the given anchor.
///
/// # Errors
/// Returns `InvalidArg` for anchors that name a day outside the month.
pub fn expiry_date(
    anchor: ExpiryAnchor,
    month: ContractMonth,
    year: i32,
) -> Result<NaiveDate, CandelaError> {
    let m = month.month();
    let date = match anchor {
        ExpiryAnchor::ThirdFriday => third_friday(year, m),
        ExpiryAnchor::WednesdayBeforeThirdFriday => {
            third_friday(year, m).and_then(|d| d.checked_sub_days(Days::new(2)))
        }
        ExpiryAnchor::Day(day) => NaiveDate::from_ymd_opt(year, m, u32::from(day)),
        _ => None,
    };
    date.ok_or_else(|| {
        CandelaError::InvalidArg(format!("no expiry date for {month:?} {year} under {anchor:?}"))
    })
}

fn contract(root: &str, month: ContractMonth, year: i32) -> CanonicalSymbol {
    CanonicalSymbol::Contract {
        root: root.to_string(),
        month,
        year: u8::try_from(year.rem_euclid(100)).unwrap_or(0),
    }
}

/// Contracts of the root's cycle in expiry order, starting from the first
/// contract that has not yet rolled as of `as_of`.
fn upcoming_contracts(
    root: &str,
    rule: &RolloverRule,
    as_of: NaiveDate,
) -> Result<Vec<(CanonicalSymbol, NaiveDate)>, CandelaError> {
    if rule.cycle.is_empty() {
        return Err(CandelaError::InvalidArg(format!(
            "rollover rule for {root} has an empty contract cycle"
        )));
    }
    let mut months: Vec<ContractMonth> = rule.cycle.clone();
    months.sort_by_key(|m| m.month());

    let mut out = Vec::new();
    for year in [as_of.year(), as_of.year() + 1] {
        for &month in &months {
            let expiry = expiry_date(rule.anchor, month, year)?;
            let roll = expiry
                .checked_sub_days(Days::new(u64::from(rule.days_before_expiry)))
                .unwrap_or(expiry);
            if roll > as_of {
                out.push((contract(root, month, year), expiry));
            }
        }
    }
    Ok(out)
}

/// Resolve a continuous root to its front-month contract as of a date.
///
/// The front contract is the first of the cycle whose roll date (expiry minus
/// `days_before_expiry`) is still ahead of `as_of`. Under a volume-threshold
/// rule with volume data available, the resolver additionally rolls forward
/// when the next contract's volume has overtaken the front's by the configured
/// ratio; without volume data it falls back to the days-before-expiry rule.
///
/// # Errors
/// - `InvalidArg` for an empty contract cycle or impossible anchor dates.
pub fn resolve_front_month(
    root: &str,
    rule: &RolloverRule,
    as_of: NaiveDate,
    volume: Option<VolumeLookup<'_>>,
) -> Result<CanonicalSymbol, CandelaError> {
    let upcoming = upcoming_contracts(root, rule, as_of)?;
    let (front, _) = upcoming
        .first()
        .ok_or_else(|| {
            CandelaError::Symbol(format!("no upcoming contract for {root} as of {as_of}"))
        })?
        .clone();

    if let (RolloverTrigger::VolumeThreshold { ratio }, Some(lookup)) = (rule.trigger, volume)
        && let Some((next, _)) = upcoming.get(1)
        && let (Some(front_vol), Some(next_vol)) = (lookup(&front), lookup(next))
    {
        #[allow(clippy::cast_precision_loss)]
        if next_vol as f64 >= ratio * front_vol as f64 {
            return Ok(next.clone());
        }
    }

    Ok(front)
}
