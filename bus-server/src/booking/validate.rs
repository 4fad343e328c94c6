//! Form validation for the details and payment stages.
//!
//! Checks run in form order and stop at the first failure, which names
//! the field to highlight.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::domain::{CardBrand, PersonalDetails};

use super::draft::PaymentInfo;
use super::error::{Field, ValidationError};

/// Personal details as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonalForm {
    pub name: String,
    pub mobile: String,
    pub nic: String,
    pub email: String,
    /// Terms and conditions accepted
    #[serde(default)]
    pub agreed: bool,
}

impl PersonalForm {
    /// Validate and normalize, trimming every field.
    pub fn validate(&self) -> Result<PersonalDetails, ValidationError> {
        let name = self.name.trim();
        let mobile = self.mobile.trim();
        let nic = self.nic.trim();
        let email = self.email.trim();

        if name.is_empty() {
            return Err(ValidationError::new(Field::Name, "Please enter your Name."));
        }
        if mobile.is_empty() {
            return Err(ValidationError::new(Field::Mobile, "Please enter your Mobile Number."));
        }
        if !is_valid_mobile(mobile) {
            return Err(ValidationError::new(Field::Mobile, "Please enter a valid Mobile Number."));
        }
        if nic.is_empty() {
            return Err(ValidationError::new(Field::Nic, "Please enter your NIC or Passport Number."));
        }
        if email.is_empty() {
            return Err(ValidationError::new(Field::Email, "Please enter your Email address."));
        }
        if !is_valid_email(email) {
            return Err(ValidationError::new(Field::Email, "Please enter a valid Email address."));
        }
        if !self.agreed {
            return Err(ValidationError::new(
                Field::Consent,
                "You must agree to the Terms & Conditions before proceeding.",
            ));
        }

        Ok(PersonalDetails {
            name: name.to_string(),
            mobile: mobile.to_string(),
            nic: nic.to_string(),
            email: email.to_string(),
        })
    }
}

/// 7 to 20 characters of digits, spaces, dashes, parentheses or plus.
fn is_valid_mobile(s: &str) -> bool {
    let len = s.chars().count();
    (7..=20).contains(&len)
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || "-()+".contains(c))
}

fn is_valid_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

/// Card details as submitted. Only the brand and last four digits
/// survive validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub brand: Option<String>,
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvv: String,
}

impl PaymentForm {
    /// Validate against `today` for expiry.
    ///
    /// A card expiring in the current month is still accepted.
    pub fn validate(&self, today: NaiveDate) -> Result<PaymentInfo, ValidationError> {
        let brand = self
            .brand
            .as_deref()
            .and_then(CardBrand::parse)
            .ok_or_else(|| ValidationError::new(Field::CardBrand, "Please select a card type."))?;

        let digits: String = self.number.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty() {
            return Err(ValidationError::new(Field::CardNumber, "Please enter your card number."));
        }
        if digits.len() != 16 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::new(
                Field::CardNumber,
                "Please enter a valid card number (exactly 16 digits).",
            ));
        }

        let month = self.exp_month.trim();
        if month.is_empty() {
            return Err(ValidationError::new(Field::ExpiryMonth, "Please enter expiration month."));
        }
        let month = parse_digits(month, 1..=2)
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| {
                ValidationError::new(
                    Field::ExpiryMonth,
                    "Expiration month must be numeric between 01 and 12.",
                )
            })?;

        let year = self.exp_year.trim();
        if year.is_empty() {
            return Err(ValidationError::new(Field::ExpiryYear, "Please enter expiration year."));
        }
        let year = parse_digits(year, 2..=2).ok_or_else(|| {
            ValidationError::new(
                Field::ExpiryYear,
                "Expiration year must be two digits (e.g. 25 for 2025).",
            )
        })?;

        let current_year = today.year().rem_euclid(100) as u32;
        if year < current_year {
            return Err(ValidationError::new(
                Field::ExpiryYear,
                "Card expired. Please use a valid expiration year.",
            ));
        }
        if year == current_year && month < today.month() {
            return Err(ValidationError::new(
                Field::ExpiryMonth,
                "Card expired. Please use a valid expiration date.",
            ));
        }

        let cvv = self.cvv.trim();
        if cvv.is_empty() {
            return Err(ValidationError::new(Field::Cvv, "Please enter CVV."));
        }
        if parse_digits(cvv, 3..=4).is_none() {
            return Err(ValidationError::new(Field::Cvv, "CVV must be 3 or 4 digits."));
        }

        Ok(PaymentInfo {
            payment_method: brand,
            card_last4: digits[digits.len() - 4..].to_string(),
        })
    }
}

/// Parse an all-digit string whose length lies in `len`.
fn parse_digits(s: &str, len: std::ops::RangeInclusive<usize>) -> Option<u32> {
    if !len.contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
    }

    fn personal() -> PersonalForm {
        PersonalForm {
            name: "  Nimal Perera ".into(),
            mobile: "+94 (77) 123-4567".into(),
            nic: "199012345678".into(),
            email: "nimal@example.com".into(),
            agreed: true,
        }
    }

    fn card() -> PaymentForm {
        PaymentForm {
            brand: Some("visa".into()),
            number: "4111 1111 1111 1234".into(),
            exp_month: "7".into(),
            exp_year: "25".into(),
            cvv: "123".into(),
        }
    }

    #[test]
    fn personal_details_trimmed() {
        let p = personal().validate().unwrap();
        assert_eq!(p.name, "Nimal Perera");
        assert_eq!(p.mobile, "+94 (77) 123-4567");
    }

    #[test]
    fn personal_field_errors() {
        let cases: Vec<(PersonalForm, Field)> = vec![
            (PersonalForm { name: " ".into(), ..personal() }, Field::Name),
            (PersonalForm { mobile: "".into(), ..personal() }, Field::Mobile),
            (PersonalForm { mobile: "12345".into(), ..personal() }, Field::Mobile),
            (PersonalForm { mobile: "077-CALL-ME".into(), ..personal() }, Field::Mobile),
            (PersonalForm { nic: "".into(), ..personal() }, Field::Nic),
            (PersonalForm { email: "".into(), ..personal() }, Field::Email),
            (PersonalForm { email: "nimal@localhost".into(), ..personal() }, Field::Email),
            (PersonalForm { email: "@example.com".into(), ..personal() }, Field::Email),
            (PersonalForm { agreed: false, ..personal() }, Field::Consent),
        ];
        for (form, field) in cases {
            assert_eq!(form.validate().unwrap_err().field, field, "{form:?}");
        }
    }

    #[test]
    fn payment_keeps_only_brand_and_last4() {
        let info = card().validate(today()).unwrap();
        assert_eq!(info.payment_method, CardBrand::Visa);
        assert_eq!(info.card_last4, "1234");
    }

    #[test]
    fn expiry_in_current_month_accepted() {
        let form = PaymentForm { exp_month: "07".into(), ..card() };
        assert!(form.validate(today()).is_ok());
    }

    #[test]
    fn expiry_one_month_past_rejected() {
        let form = PaymentForm { exp_month: "06".into(), ..card() };
        assert_eq!(form.validate(today()).unwrap_err().field, Field::ExpiryMonth);
    }

    #[test]
    fn expiry_past_year_rejected() {
        let form = PaymentForm { exp_month: "12".into(), exp_year: "24".into(), ..card() };
        assert_eq!(form.validate(today()).unwrap_err().field, Field::ExpiryYear);
    }

    #[test]
    fn future_year_any_month() {
        let form = PaymentForm { exp_month: "1".into(), exp_year: "26".into(), ..card() };
        assert!(form.validate(today()).is_ok());
    }

    #[test]
    fn payment_field_errors() {
        let cases: Vec<(PaymentForm, Field)> = vec![
            (PaymentForm { brand: None, ..card() }, Field::CardBrand),
            (PaymentForm { brand: Some("amex".into()), ..card() }, Field::CardBrand),
            (PaymentForm { number: "".into(), ..card() }, Field::CardNumber),
            (PaymentForm { number: "4111 1111 1111 123".into(), ..card() }, Field::CardNumber),
            (PaymentForm { number: "4111-1111-1111-1234".into(), ..card() }, Field::CardNumber),
            (PaymentForm { exp_month: "".into(), ..card() }, Field::ExpiryMonth),
            (PaymentForm { exp_month: "13".into(), ..card() }, Field::ExpiryMonth),
            (PaymentForm { exp_month: "0".into(), ..card() }, Field::ExpiryMonth),
            (PaymentForm { exp_year: "2026".into(), ..card() }, Field::ExpiryYear),
            (PaymentForm { cvv: "12".into(), ..card() }, Field::Cvv),
            (PaymentForm { cvv: "12345".into(), ..card() }, Field::Cvv),
        ];
        for (form, field) in cases {
            assert_eq!(form.validate(today()).unwrap_err().field, field, "{form:?}");
        }
    }
}
