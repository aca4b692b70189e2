//! Business validation rules for staged catalog records
//!
//! Rules are evaluated in a fixed order and the first violation wins, so an
//! analyst always sees the most fundamental problem with a row first. A rule
//! only fires when every field it inspects is present; absent optional fields
//! never fail a rule on their own.

use crate::models::ProductRecord;

/// A single named business rule.
pub struct Rule {
    pub name: &'static str,
    pub description: &'static str,
    check: fn(&ProductRecord) -> Option<String>,
}

impl Rule {
    /// Evaluate the rule, returning the violation message if it fires.
    pub fn check(&self, record: &ProductRecord) -> Option<String> {
        (self.check)(record)
    }
}

fn percentage_bound(name: &str, value: Option<f64>) -> Option<String> {
    let value = value?;
    if !(0.0..=100.0).contains(&value) {
        return Some(format!("{name} {value} is outside the 0-100 range"));
    }
    None
}

/// The ordered rule catalog. Order is part of the contract: earlier rules
/// mask later ones for the same row.
pub fn catalog() -> &'static [Rule] {
    &RULES
}

static RULES: [Rule; 9] = [
    Rule {
        name: "product-id-present",
        description: "Every record must carry a non-empty product identifier",
        check: |record| {
            if record.product_id.trim().is_empty() {
                Some("ProductID must not be empty".to_string())
            } else {
                None
            }
        },
    },
    Rule {
        name: "pricing-in-range",
        description: "Pricing is a percentage rate between 0 and 100",
        check: |record| percentage_bound("Pricing", record.pricing),
    },
    Rule {
        name: "min-ltv-in-range",
        description: "MinLTV is a percentage between 0 and 100",
        check: |record| percentage_bound("MinLTV", record.min_ltv),
    },
    Rule {
        name: "max-ltv-in-range",
        description: "MaxLTV is a percentage between 0 and 100",
        check: |record| percentage_bound("MaxLTV", record.max_ltv),
    },
    Rule {
        name: "term-positive",
        description: "Term must be a positive number of months",
        check: |record| {
            let term = record.term_months?;
            if term <= 0 {
                Some(format!("Term {term} must be greater than zero"))
            } else {
                None
            }
        },
    },
    Rule {
        name: "product-fee-non-negative",
        description: "ProductFee cannot be negative",
        check: |record| {
            let fee = record.product_fee?;
            if fee < 0.0 {
                Some(format!("ProductFee {fee} cannot be negative"))
            } else {
                None
            }
        },
    },
    Rule {
        name: "loan-range-ordered",
        description: "MinLoan cannot exceed MaxLoan",
        check: |record| {
            let (min, max) = (record.min_loan?, record.max_loan?);
            if min > max {
                Some(format!("MinLoan {min} exceeds MaxLoan {max}"))
            } else {
                None
            }
        },
    },
    Rule {
        name: "ltv-range-ordered",
        description: "MinLTV cannot exceed MaxLTV",
        check: |record| {
            let (min, max) = (record.min_ltv?, record.max_ltv?);
            if min > max {
                Some(format!("MinLTV {min} exceeds MaxLTV {max}"))
            } else {
                None
            }
        },
    },
    Rule {
        name: "cashback-range-ordered",
        description: "CashbackMin cannot exceed CashbackMax",
        check: |record| {
            let (min, max) = (record.cashback_min?, record.cashback_max?);
            if min > max {
                Some(format!("CashbackMin {min} exceeds CashbackMax {max}"))
            } else {
                None
            }
        },
    },
];

/// First violation in rule order, or `None` for a clean record.
pub fn first_violation(record: &ProductRecord) -> Option<String> {
    catalog().iter().find_map(|rule| rule.check(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ProductRecord {
        ProductRecord {
            product_id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_record_passes() {
        let mut r = record("P-1");
        r.pricing = Some(4.5);
        r.min_loan = Some(10_000.0);
        r.max_loan = Some(500_000.0);
        r.min_ltv = Some(0.0);
        r.max_ltv = Some(85.0);
        r.term_months = Some(24);
        r.product_fee = Some(999.0);
        assert_eq!(first_violation(&r), None);
    }

    #[test]
    fn test_sparse_record_passes() {
        // Rules only fire on fields that are present.
        assert_eq!(first_violation(&record("P-1")), None);
    }

    #[test]
    fn test_pricing_out_of_range_mentions_bounds() {
        let mut r = record("P-1");
        r.pricing = Some(150.0);
        let message = first_violation(&r).unwrap();
        assert!(message.contains("Pricing"));
        assert!(message.contains("0-100"));
    }

    #[test]
    fn test_negative_pricing_rejected() {
        let mut r = record("P-1");
        r.pricing = Some(-0.5);
        assert!(first_violation(&r).is_some());
    }

    #[test]
    fn test_empty_product_id_masks_later_violations() {
        let mut r = record("  ");
        r.pricing = Some(150.0);
        let message = first_violation(&r).unwrap();
        assert!(message.contains("ProductID"));
    }

    #[test]
    fn test_loan_range_inverted() {
        let mut r = record("P-1");
        r.min_loan = Some(500_000.0);
        r.max_loan = Some(10_000.0);
        let message = first_violation(&r).unwrap();
        assert!(message.contains("MinLoan"));
    }

    #[test]
    fn test_loan_range_with_one_bound_missing_passes() {
        let mut r = record("P-1");
        r.min_loan = Some(500_000.0);
        assert_eq!(first_violation(&r), None);
    }

    #[test]
    fn test_zero_term_rejected() {
        let mut r = record("P-1");
        r.term_months = Some(0);
        assert!(first_violation(&r).unwrap().contains("Term"));
    }

    #[test]
    fn test_cashback_inverted() {
        let mut r = record("P-1");
        r.cashback_min = Some(500.0);
        r.cashback_max = Some(100.0);
        assert!(first_violation(&r).unwrap().contains("Cashback"));
    }

    #[test]
    fn test_rule_order_is_stable() {
        let names: Vec<&str> = catalog().iter().map(|rule| rule.name).collect();
        assert_eq!(names[0], "product-id-present");
        assert_eq!(names[1], "pricing-in-range");
        assert_eq!(names.len(), 9);
    }
}
