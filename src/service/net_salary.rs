use rust_decimal::Decimal;

/// `basic + bonus - deductions`, exact at the inputs' precision.
///
/// Inputs are validated to at most `MAX_AMOUNT` each, far below the range of
/// `Decimal`, so the arithmetic cannot overflow.
pub fn net_salary(basic_salary: Decimal, bonus: Decimal, deductions: Decimal) -> Decimal {
    basic_salary + bonus - deductions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::validation::MAX_AMOUNT;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn adds_bonus_and_subtracts_deductions() {
        assert_eq!(net_salary(d("5000"), d("200"), d("100")), d("5100"));
    }

    #[test]
    fn keeps_cents_exact() {
        assert_eq!(net_salary(d("0.10"), d("0.20"), d("0.05")), d("0.25"));
    }

    #[test]
    fn may_go_negative() {
        assert_eq!(net_salary(d("100"), d("0"), d("250.50")), d("-150.50"));
    }

    fn amount() -> impl Strategy<Value = Decimal> {
        (0i64..=99_999_999_999_999).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn inverse_of_deductions(basic in amount(), bonus in amount(), deductions in amount()) {
            let net = net_salary(basic, bonus, deductions);
            prop_assert_eq!(net + deductions, basic + bonus);
        }

        #[test]
        fn never_exceeds_gross(basic in amount(), bonus in amount(), deductions in amount()) {
            prop_assert!(net_salary(basic, bonus, deductions) <= basic + bonus);
            prop_assert!(basic <= MAX_AMOUNT);
        }
    }
}
