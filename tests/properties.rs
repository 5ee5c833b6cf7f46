use chrono::{Duration, NaiveDate};
use loan_book_rs::interest::late_fee::check_override;
use loan_book_rs::{InstallmentSchedule, InterestRegime, LateFee, LoanTerms, Money, Rate, RateSnapshot};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn principal_strategy() -> impl Strategy<Value = Money> {
    (1i64..100_000_000i64).prop_map(Money::from_minor)
}

fn term_strategy() -> impl Strategy<Value = u32> {
    1u32..=120u32
}

fn rate_strategy() -> impl Strategy<Value = Rate> {
    (0u32..=500u32).prop_map(Rate::from_bps)
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn terms(principal: Money, term: u32, regime: InterestRegime) -> LoanTerms {
    LoanTerms {
        principal,
        term,
        start_date: start(),
        regime,
    }
}

fn snapshot(simple: Rate, compound: Rate) -> RateSnapshot {
    RateSnapshot {
        simple,
        compound,
        late_fee: Rate::ZERO,
    }
}

proptest! {
    #[test]
    fn simple_schedule_spreads_flat_interest(
        principal in principal_strategy(),
        term in term_strategy(),
        rate in rate_strategy()
    ) {
        let schedule = InstallmentSchedule::generate(
            &terms(principal, term, InterestRegime::Simple),
            &snapshot(rate, Rate::ZERO),
        ).unwrap();

        let p = principal.as_decimal();
        let n = Decimal::from(term);
        let exact_total = p + p * rate.as_decimal() * n;

        prop_assert_eq!(schedule.installments.len(), term as usize);
        prop_assert_eq!(schedule.installment_value, Money::from_decimal(exact_total / n));

        for (index, installment) in schedule.installments.iter().enumerate() {
            prop_assert_eq!(installment.number as usize, index + 1);
            prop_assert_eq!(installment.value, schedule.installment_value);
            prop_assert_eq!(installment.due_date, start() + Duration::days(30 * (index as i64 + 1)));
        }

        // each installment is off by at most half a cent
        let drift = (schedule.total_payment.as_decimal() - exact_total).abs();
        prop_assert!(drift <= Decimal::new(5, 3) * n);
    }

    #[test]
    fn zero_rate_regimes_agree(
        principal in principal_strategy(),
        term in term_strategy()
    ) {
        let zero = snapshot(Rate::ZERO, Rate::ZERO);
        let simple = InstallmentSchedule::generate(&terms(principal, term, InterestRegime::Simple), &zero).unwrap();
        let compound = InstallmentSchedule::generate(&terms(principal, term, InterestRegime::Compound), &zero).unwrap();

        let expected = Money::from_decimal(principal.as_decimal() / Decimal::from(term));
        prop_assert_eq!(simple.installment_value, expected);
        prop_assert_eq!(compound.installment_value, expected);
    }

    #[test]
    fn compound_interest_never_lowers_the_installment(
        principal in principal_strategy(),
        term in term_strategy(),
        rate in rate_strategy()
    ) {
        let charged = InstallmentSchedule::generate(
            &terms(principal, term, InterestRegime::Compound),
            &snapshot(Rate::ZERO, rate),
        ).unwrap();
        let free = InstallmentSchedule::generate(
            &terms(principal, term, InterestRegime::Compound),
            &snapshot(Rate::ZERO, Rate::ZERO),
        ).unwrap();

        prop_assert!(charged.installment_value >= free.installment_value);
        prop_assert_eq!(charged.installments.len(), term as usize);
    }

    #[test]
    fn late_fee_result_is_a_valid_override(
        cents in 1i64..10_000_000i64,
        bps in 0u32..=2_000u32
    ) {
        let current = Money::from_minor(cents);
        let raised = LateFee::new(Rate::from_bps(bps)).apply(current).unwrap();

        prop_assert!(raised >= current);
        prop_assert_eq!(check_override(current, raised).unwrap(), raised);
    }
}
