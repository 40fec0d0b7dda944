//! Text-keyed draft patches, as typed by the presentation layer.

use crate::{
    EngineError, ResultEngine, Rupiah,
    identity::UserRole,
    transactions::{LoanScheme, RepaymentMethod},
};

use super::{ContractDraft, LoanDraft, OnboardingDraft, PledgeDraft, RentalDraft, RepaymentDraft};

pub trait DraftFields {
    /// Field names accepted by [`set_field`](Self::set_field).
    const FIELDS: &'static [&'static str];

    /// Parses `value` into `field`. Parsing is the only check; whether the
    /// value is acceptable is left to the step validators.
    fn set_field(&mut self, field: &str, value: &str) -> ResultEngine<()>;
}

fn unknown(field: &str) -> EngineError {
    EngineError::NotFound(format!("field {field}"))
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(optional)
        .collect()
}

fn flag(field: &'static str, value: &str) -> ResultEngine<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "ya" | "true" | "1" => Ok(true),
        "n" | "no" | "tidak" | "false" | "0" => Ok(false),
        other => Err(EngineError::validation(field, format!("expected yes/no, got {other}"))),
    }
}

impl DraftFields for OnboardingDraft {
    const FIELDS: &'static [&'static str] = &[
        "name", "phone", "role", "location", "commodity", "problems", "features",
    ];

    fn set_field(&mut self, field: &str, value: &str) -> ResultEngine<()> {
        match field {
            "name" => self.name = value.trim().to_string(),
            "phone" => self.phone = value.trim().to_string(),
            "role" => self.role = UserRole::try_from(value)?,
            "location" => self.location = optional(value),
            "commodity" => self.commodity = optional(value),
            "problems" => self.problems = list(value),
            "features" => self.features = list(value),
            _ => return Err(unknown(field)),
        }
        Ok(())
    }
}

impl DraftFields for LoanDraft {
    const FIELDS: &'static [&'static str] = &["amount", "purpose", "scheme"];

    fn set_field(&mut self, field: &str, value: &str) -> ResultEngine<()> {
        match field {
            "amount" => self.amount = value.parse()?,
            "purpose" => self.purpose = optional(value),
            "scheme" => {
                self.scheme = match value.trim().to_ascii_lowercase().as_str() {
                    "syariah" => LoanScheme::Syariah,
                    "konvensional" => LoanScheme::Konvensional,
                    other => {
                        return Err(EngineError::validation(
                            "scheme",
                            format!("unknown scheme: {other}"),
                        ));
                    }
                }
            }
            _ => return Err(unknown(field)),
        }
        Ok(())
    }
}

impl DraftFields for PledgeDraft {
    const FIELDS: &'static [&'static str] = &["amount"];

    fn set_field(&mut self, field: &str, value: &str) -> ResultEngine<()> {
        match field {
            "amount" => self.amount = value.parse()?,
            _ => return Err(unknown(field)),
        }
        Ok(())
    }
}

impl DraftFields for ContractDraft {
    const FIELDS: &'static [&'static str] = &["terms"];

    fn set_field(&mut self, field: &str, value: &str) -> ResultEngine<()> {
        match field {
            "terms" => self.terms_accepted = flag("terms", value)?,
            _ => return Err(unknown(field)),
        }
        Ok(())
    }
}

impl DraftFields for RentalDraft {
    const FIELDS: &'static [&'static str] = &["hours"];

    fn set_field(&mut self, field: &str, value: &str) -> ResultEngine<()> {
        match field {
            "hours" => {
                self.hours = value.trim().parse().map_err(|_| {
                    EngineError::validation("hours", format!("not a number of hours: {value}"))
                })?
            }
            _ => return Err(unknown(field)),
        }
        Ok(())
    }
}

impl DraftFields for RepaymentDraft {
    const FIELDS: &'static [&'static str] = &["method", "amount"];

    fn set_field(&mut self, field: &str, value: &str) -> ResultEngine<()> {
        match field {
            "method" => self.method = Some(RepaymentMethod::try_from(value)?),
            "amount" => {
                self.amount = match optional(value) {
                    Some(raw) => Some(raw.parse::<Rupiah>()?),
                    None => None,
                }
            }
            _ => return Err(unknown(field)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_fields() {
        let mut draft = OnboardingDraft::default();
        draft.set_field("name", "  Budi ").unwrap();
        draft.set_field("role", "buyer").unwrap();
        draft.set_field("problems", "Harga Jatuh, ,Pupuk Mahal").unwrap();
        draft.set_field("location", "").unwrap();
        assert_eq!(draft.name, "Budi");
        assert_eq!(draft.role, UserRole::Buyer);
        assert_eq!(draft.problems, vec!["Harga Jatuh", "Pupuk Mahal"]);
        assert_eq!(draft.location, None);
        assert!(matches!(
            draft.set_field("age", "40"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn amounts_parse_as_rupiah() {
        let mut loan = LoanDraft::default();
        loan.set_field("amount", "Rp 3.000.000").unwrap();
        assert_eq!(loan.amount, Rupiah::new(3_000_000));
        assert!(matches!(
            loan.set_field("amount", "tiga juta"),
            Err(EngineError::InvalidAmount(_))
        ));
        loan.set_field("scheme", "Konvensional").unwrap();
        assert_eq!(loan.scheme, LoanScheme::Konvensional);
    }

    #[test]
    fn flags_and_hours() {
        let mut contract = ContractDraft::default();
        contract.set_field("terms", "tidak").unwrap();
        assert!(!contract.terms_accepted);
        assert!(contract.set_field("terms", "maybe").is_err());

        let mut rental = RentalDraft::default();
        rental.set_field("hours", "8").unwrap();
        assert_eq!(rental.hours, 8);
        assert!(rental.set_field("hours", "-1").is_err());
    }

    #[test]
    fn repayment_amount_can_be_cleared() {
        let mut draft = RepaymentDraft::default();
        draft.set_field("method", "harvest").unwrap();
        draft.set_field("amount", "750000").unwrap();
        assert_eq!(draft.amount, Some(Rupiah::new(750_000)));
        draft.set_field("amount", " ").unwrap();
        assert_eq!(draft.amount, None);
        assert_eq!(draft.method, Some(RepaymentMethod::HarvestInKind));
    }
}
