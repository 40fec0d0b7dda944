use serde::Serialize;

use super::{one_of, required};
use crate::{
    ResultEngine, catalog,
    aggregates::Aggregates,
    identity::{Identity, UserRole},
    transactions::{Payload, Transaction},
    wizard::{Step, Workflow, always_valid},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OnboardingDraft {
    pub name: String,
    pub phone: String,
    pub role: UserRole,
    pub location: Option<String>,
    pub commodity: Option<String>,
    pub problems: Vec<String>,
    pub features: Vec<String>,
}

/// First-run account setup: login, role, farm details and a short survey.
#[derive(Clone, Copy, Debug, Default)]
pub struct Onboarding;

const STEPS: &[Step<Onboarding>] = &[
    Step::new("login", login),
    Step::new("role", always_valid),
    Step::new("details", details),
    Step::new("survey", survey),
];

fn valid_phone(phone: &str) -> bool {
    let digits = phone.trim();
    let digits = digits.strip_prefix('+').unwrap_or(digits);
    (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn login(_: &Onboarding, draft: &OnboardingDraft) -> Result<(), String> {
    required(&draft.name, "name")?;
    required(&draft.phone, "phone")?;
    if !valid_phone(&draft.phone) {
        return Err(format!("invalid phone number: {}", draft.phone));
    }
    Ok(())
}

fn details(_: &Onboarding, draft: &OnboardingDraft) -> Result<(), String> {
    match draft.location.as_deref() {
        Some(location) => one_of(location, catalog::LOCATIONS, "location"),
        None => Err("location is required".to_string()),
    }
}

fn survey(_: &Onboarding, draft: &OnboardingDraft) -> Result<(), String> {
    if let Some(commodity) = draft.commodity.as_deref() {
        one_of(commodity, catalog::COMMODITIES, "commodity")?;
    }
    for problem in &draft.problems {
        one_of(problem, catalog::FARMING_PROBLEMS, "problem")?;
    }
    for feature in &draft.features {
        one_of(feature, catalog::FEATURES, "feature")?;
    }
    Ok(())
}

impl Workflow for Onboarding {
    type Draft = OnboardingDraft;
    type Output = Identity;

    fn name(&self) -> &'static str {
        "onboarding"
    }

    fn steps(&self) -> &'static [Step<Self>] {
        STEPS
    }

    fn payload(&self, draft: &OnboardingDraft) -> ResultEngine<Payload> {
        Ok(Payload::AccountCreation {
            phone: draft.phone.trim().to_string(),
        })
    }

    fn apply(
        &self,
        draft: &OnboardingDraft,
        _: &Transaction,
        _: &mut Aggregates,
    ) -> ResultEngine<Identity> {
        Ok(Identity::new(
            draft.name.trim().to_string(),
            draft.phone.trim().to_string(),
            draft.location.clone().unwrap_or_default(),
            draft.role,
        ))
    }

    fn success_message(&self, _: &OnboardingDraft, identity: &Identity) -> String {
        format!("Selamat datang, {}!", identity.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> OnboardingDraft {
        OnboardingDraft {
            name: "Budi Santoso".to_string(),
            phone: "081234567890".to_string(),
            location: Some("Desa Makmur".to_string()),
            ..OnboardingDraft::default()
        }
    }

    #[test]
    fn phone_rules() {
        assert!(valid_phone("081234567890"));
        assert!(valid_phone("+6281234567"));
        assert!(!valid_phone("0812"));
        assert!(!valid_phone("0812-3456-7890"));
        assert!(!valid_phone("+"));
    }

    #[test]
    fn login_needs_name_and_phone() {
        let mut d = draft();
        d.name = " ".to_string();
        assert_eq!(login(&Onboarding, &d).unwrap_err(), "name is required");
        assert!(login(&Onboarding, &draft()).is_ok());
    }

    #[test]
    fn details_checks_catalog_location() {
        let mut d = draft();
        d.location = Some("Jakarta".to_string());
        assert!(details(&Onboarding, &d).is_err());
        d.location = None;
        assert!(details(&Onboarding, &d).is_err());
        assert!(details(&Onboarding, &draft()).is_ok());
    }

    #[test]
    fn survey_is_optional_but_checked() {
        let mut d = draft();
        assert!(survey(&Onboarding, &d).is_ok());
        d.commodity = Some("Kopi".to_string());
        d.problems = vec!["Modal Tanam".to_string()];
        assert!(survey(&Onboarding, &d).is_ok());
        d.features = vec!["Ternak".to_string()];
        assert!(survey(&Onboarding, &d).is_err());
    }

    #[test]
    fn apply_builds_identity_with_initial_reputation() {
        let mut aggregates = Aggregates::default();
        let tx = Transaction::new(Onboarding.payload(&draft()).unwrap());
        let identity = Onboarding.apply(&draft(), &tx, &mut aggregates).unwrap();
        assert_eq!(identity.role, UserRole::Owner);
        assert_eq!(identity.location, "Desa Makmur");
        assert_eq!(identity.reputation_score, 4.5);
    }
}
