// Validation utilities module
// Provides custom validation functions for domain-specific rules

use rust_decimal::Decimal;
use validator::ValidationError;

/// Validates that a monetary amount is zero or positive
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        Err(ValidationError::new("amount_must_not_be_negative"))
    } else {
        Ok(())
    }
}

/// Validates a rate card amount: non-negative, below 100000 and at most two decimal places
pub fn validate_rate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative_amount(amount)?;
    if *amount >= Decimal::new(100_000, 0) {
        return Err(ValidationError::new("rate_too_large"));
    }
    if amount.normalize().scale() > 2 {
        return Err(ValidationError::new("rate_has_too_many_decimals"));
    }
    Ok(())
}

/// Validates that a monetary amount is strictly positive
pub fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        Err(ValidationError::new("amount_must_be_positive"))
    } else {
        Ok(())
    }
}

/// Validates that a document URL is not blank
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_non_negative_amount() {
        assert!(validate_non_negative_amount(&dec!(0.00)).is_ok());
        assert!(validate_non_negative_amount(&dec!(-0.00)).is_ok());
        assert!(validate_non_negative_amount(&dec!(12.50)).is_ok());
        assert!(validate_non_negative_amount(&dec!(-0.01)).is_err());
    }

    #[test]
    fn test_rate_amount_fits_the_rate_card() {
        assert!(validate_rate_amount(&dec!(0)).is_ok());
        assert!(validate_rate_amount(&dec!(99999.99)).is_ok());
        assert!(validate_rate_amount(&dec!(5.500)).is_ok());

        let too_large = validate_rate_amount(&dec!(100000)).unwrap_err();
        assert_eq!(too_large.code, "rate_too_large");
        let too_precise = validate_rate_amount(&dec!(1.005)).unwrap_err();
        assert_eq!(too_precise.code, "rate_has_too_many_decimals");
        assert!(validate_rate_amount(&dec!(-0.50)).is_err());
    }

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(&dec!(0.01)).is_ok());
        assert!(validate_positive_amount(&dec!(0)).is_err());
        assert!(validate_positive_amount(&dec!(-5)).is_err());
    }

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("/media/handbook.pdf").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }
}
