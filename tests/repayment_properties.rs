use repayment_engine::{
    DebtAccount, DebtLedger, MinimumPaymentPolicy, ScenarioModifier, ScenarioType, Strategy,
    WhatIfRequest, generate_plan,
};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn debt(name: &str, balance: Decimal, apr: Decimal, minimum: Decimal) -> DebtAccount {
    DebtAccount {
        id: name.to_lowercase(),
        name: name.to_string(),
        balance,
        apr,
        minimum_payment: Some(minimum),
    }
}

fn ledger(debts: Vec<DebtAccount>) -> DebtLedger {
    DebtLedger::new(debts, &MinimumPaymentPolicy::default()).expect("valid ledger")
}

fn cc_and_loan() -> DebtLedger {
    ledger(vec![
        debt("CC", dec!(100000), dec!(36), dec!(3000)),
        debt("Loan", dec!(200000), dec!(12), dec!(5000)),
    ])
}

/// Small cheap debt next to a large expensive one: snowball and avalanche disagree.
fn diverging() -> DebtLedger {
    ledger(vec![
        debt("Store", dec!(20000), dec!(8), dec!(1000)),
        debt("Card", dec!(150000), dec!(30), dec!(4500)),
    ])
}

#[test]
fn end_to_end_avalanche_pays_expensive_debt_first() {
    let plan = generate_plan(&cc_and_loan(), Strategy::Avalanche, dec!(10000), 60).unwrap();

    let first = &plan.months[0];
    assert_eq!(first.allocations[0].debt_name, "CC");
    assert_eq!(first.allocations[0].payment, dec!(5000));
    assert_eq!(first.allocations[1].payment, dec!(5000));

    let cc_closed = plan
        .months
        .iter()
        .find(|m| m.allocations.iter().any(|a| a.debt_name == "CC" && a.remaining_balance.is_zero()))
        .map(|m| m.month_index)
        .expect("CC is paid off");
    let debt_free = plan.months_to_debt_free.expect("payoff within 60 months");
    assert!(cc_closed < debt_free);

    let snowball = generate_plan(&cc_and_loan(), Strategy::Snowball, dec!(10000), 60).unwrap();
    assert!(plan.total_interest_paid <= snowball.total_interest_paid);
}

#[rstest]
#[case(Strategy::Avalanche)]
#[case(Strategy::Snowball)]
#[case(Strategy::Optimal)]
fn balance_series_never_increases(#[case] strategy: Strategy) {
    let plan = generate_plan(&diverging(), strategy, dec!(8000), 120).unwrap();
    assert!(plan.payoff_reached);
    for pair in plan.balance_series.windows(2) {
        assert!(pair[1] <= pair[0], "{} rose to {}", pair[0], pair[1]);
    }
    assert_eq!(*plan.balance_series.last().unwrap(), Decimal::ZERO);
}

#[rstest]
#[case(Strategy::Avalanche)]
#[case(Strategy::Snowball)]
#[case(Strategy::Optimal)]
fn monthly_payments_stay_within_budget(#[case] strategy: Strategy) {
    let budget = dec!(8000);
    let plan = generate_plan(&diverging(), strategy, budget, 120).unwrap();
    let last = plan.months.len();
    for (i, month) in plan.months.iter().enumerate() {
        let paid: Decimal = month.allocations.iter().map(|a| a.payment).sum();
        assert!(paid <= budget + dec!(0.02));
        if i + 1 < last {
            assert_eq!(month.total_paid, budget);
        }
    }
}

#[rstest]
#[case(Strategy::Avalanche)]
#[case(Strategy::Snowball)]
fn derived_minimums_shrink_high_apr_debts(#[case] strategy: Strategy) {
    let accounts = [("CC", dec!(100000), dec!(36)), ("Store", dec!(40000), dec!(42))]
        .into_iter()
        .map(|(name, balance, apr)| DebtAccount {
            id: name.to_lowercase(),
            name: name.to_string(),
            balance,
            apr,
            minimum_payment: None,
        })
        .collect();
    let high_apr = DebtLedger::new(accounts, &MinimumPaymentPolicy::default()).unwrap();
    for debt in high_apr.debts() {
        assert!(debt.minimum_payment > debt.monthly_interest());
    }

    let plan = generate_plan(&high_apr, strategy, high_apr.total_minimum_payments(), 24).unwrap();
    for pair in plan.balance_series.windows(2) {
        assert!(pair[1] < pair[0], "{} rose to {}", pair[0], pair[1]);
    }
}

#[test]
fn minimum_only_interest_tracks_previous_balance() {
    let single = ledger(vec![debt("Card", dec!(50000), dec!(24), dec!(1500))]);
    let plan = generate_plan(&single, Strategy::Avalanche, dec!(1500), 24).unwrap();
    let mut previous = dec!(50000);
    for month in &plan.months {
        let entry = &month.allocations[0];
        let expected = (previous * dec!(0.02)).round_dp(2);
        assert!((entry.interest_accrued - expected).abs() <= dec!(0.01));
        previous = entry.remaining_balance;
    }
}

#[test]
fn avalanche_beats_snowball_when_they_diverge() {
    let avalanche = generate_plan(&diverging(), Strategy::Avalanche, dec!(8000), 120).unwrap();
    let snowball = generate_plan(&diverging(), Strategy::Snowball, dec!(8000), 120).unwrap();
    let optimal = generate_plan(&diverging(), Strategy::Optimal, dec!(8000), 120).unwrap();

    assert_eq!(snowball.months[0].allocations[0].debt_name, "Store");
    assert!(snowball.months[0].allocations[0].payment > dec!(1000));
    assert!(avalanche.total_interest_paid < snowball.total_interest_paid);
    assert_eq!(avalanche.total_interest_paid, optimal.total_interest_paid);
    assert_eq!(optimal.strategy_name, "Mathematical Optimal");
}

#[test]
fn generating_twice_gives_identical_plans() {
    let a = generate_plan(&diverging(), Strategy::Snowball, dec!(7000), 120).unwrap();
    let b = generate_plan(&diverging(), Strategy::Snowball, dec!(7000), 120).unwrap();
    assert_eq!(a, b);
}

#[rstest]
#[case(dec!(1))]
#[case(dec!(750))]
#[case(dec!(5000))]
fn extra_payment_scenario_never_costs_more(#[case] extra: Decimal) {
    let policy = MinimumPaymentPolicy::default();
    let modifier = ScenarioModifier::new(&policy, "₹");
    let mut request = WhatIfRequest::new(ScenarioType::ExtraPayment, dec!(10000));
    request.extra_payment = Some(extra);

    let comparison = modifier.compare(&cc_and_loan(), &request).unwrap();
    assert!(comparison.months_saved >= 0);
    assert!(comparison.interest_savings >= Decimal::ZERO);
    assert_eq!(
        comparison.interest_savings,
        comparison.baseline.total_interest - comparison.scenario.total_interest
    );
}
