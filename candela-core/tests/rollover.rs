use candela_core::rollover::{expiry_date, resolve_front_month};
use candela_types::{
    CanonicalSymbol, ContractMonth, ExpiryAnchor, RolloverRule, RolloverTrigger,
};
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn third_friday_anchor() {
    // March 2025: the third Friday is the 21st.
    assert_eq!(
        expiry_date(ExpiryAnchor::ThirdFriday, ContractMonth::H, 2025).unwrap(),
        d(2025, 3, 21)
    );
    // June 2025: the 20th.
    assert_eq!(
        expiry_date(ExpiryAnchor::ThirdFriday, ContractMonth::M, 2025).unwrap(),
        d(2025, 6, 20)
    );
}

#[test]
fn wednesday_before_third_friday_anchor() {
    assert_eq!(
        expiry_date(
            ExpiryAnchor::WednesdayBeforeThirdFriday,
            ContractMonth::H,
            2025
        )
        .unwrap(),
        d(2025, 3, 19)
    );
}

#[test]
fn explicit_day_anchor() {
    assert_eq!(
        expiry_date(ExpiryAnchor::Day(25), ContractMonth::Z, 2024).unwrap(),
        d(2024, 12, 25)
    );
    assert!(expiry_date(ExpiryAnchor::Day(32), ContractMonth::Z, 2024).is_err());
}

#[test]
fn resolves_front_month_by_days_before_expiry() {
    let rule = RolloverRule::quarterly_index();
    // Early February 2025: March contract is front.
    let front = resolve_front_month("ES", &rule, d(2025, 2, 3), None).unwrap();
    assert_eq!(front.to_string(), "ESH25");
    // Eight days before the March 21 expiry the root rolls to June.
    let rolled = resolve_front_month("ES", &rule, d(2025, 3, 14), None).unwrap();
    assert_eq!(rolled.to_string(), "ESM25");
}

#[test]
fn year_boundary_rolls_into_next_march() {
    let rule = RolloverRule::quarterly_index();
    let front = resolve_front_month("NQ", &rule, d(2025, 12, 20), None).unwrap();
    assert_eq!(front.to_string(), "NQH26");
}

#[test]
fn volume_threshold_rolls_when_next_contract_dominates() {
    let rule = RolloverRule {
        trigger: RolloverTrigger::VolumeThreshold { ratio: 1.0 },
        ..RolloverRule::quarterly_index()
    };
    let as_of = d(2025, 3, 10);

    let quiet = |sym: &CanonicalSymbol| match sym.to_string().as_str() {
        "ESH25" => Some(900_000),
        "ESM25" => Some(100_000),
        _ => None,
    };
    let front = resolve_front_month("ES", &rule, as_of, Some(&quiet)).unwrap();
    assert_eq!(front.to_string(), "ESH25");

    let crossed = |sym: &CanonicalSymbol| match sym.to_string().as_str() {
        "ESH25" => Some(300_000),
        "ESM25" => Some(400_000),
        _ => None,
    };
    let front = resolve_front_month("ES", &rule, as_of, Some(&crossed)).unwrap();
    assert_eq!(front.to_string(), "ESM25");
}

#[test]
fn volume_rule_falls_back_without_data() {
    let rule = RolloverRule {
        trigger: RolloverTrigger::VolumeThreshold { ratio: 1.0 },
        ..RolloverRule::quarterly_index()
    };
    let front = resolve_front_month("ES", &rule, d(2025, 2, 3), None).unwrap();
    assert_eq!(front.to_string(), "ESH25");
}

#[test]
fn empty_cycle_is_rejected() {
    let rule = RolloverRule {
        cycle: vec![],
        ..RolloverRule::quarterly_index()
    };
    assert!(resolve_front_month("ES", &rule, d(2025, 2, 3), None).is_err());
}
