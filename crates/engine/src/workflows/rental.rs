use serde::Serialize;

use super::foreign;
use crate::{
    ResultEngine,
    aggregates::{Aggregates, RentalUnit},
    transactions::{Payload, Transaction},
    wizard::{Step, Workflow, always_valid},
};

pub const MAX_RENTAL_HOURS: u8 = 24;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RentalDraft {
    pub hours: u8,
}

impl Default for RentalDraft {
    fn default() -> Self {
        Self { hours: 1 }
    }
}

/// Booking of a shared machinery unit.
#[derive(Clone, Copy, Debug)]
pub struct RentalBooking {
    pub unit_id: u32,
}

const STEPS: &[Step<RentalBooking>] = &[
    Step::new("schedule", schedule),
    Step::new("confirm", always_valid),
];

fn schedule(_: &RentalBooking, draft: &RentalDraft) -> Result<(), String> {
    if (1..=MAX_RENTAL_HOURS).contains(&draft.hours) {
        Ok(())
    } else {
        Err(format!("hours must be between 1 and {MAX_RENTAL_HOURS}"))
    }
}

impl Workflow for RentalBooking {
    type Draft = RentalDraft;
    type Output = RentalUnit;

    fn name(&self) -> &'static str {
        "rental"
    }

    fn steps(&self) -> &'static [Step<Self>] {
        STEPS
    }

    fn payload(&self, draft: &RentalDraft) -> ResultEngine<Payload> {
        Ok(Payload::RentalBooking {
            unit_id: self.unit_id,
            hours: draft.hours,
        })
    }

    fn apply(
        &self,
        _: &RentalDraft,
        transaction: &Transaction,
        aggregates: &mut Aggregates,
    ) -> ResultEngine<RentalUnit> {
        let Payload::RentalBooking { unit_id, .. } = &transaction.payload else {
            return Err(foreign(self.name(), transaction));
        };
        aggregates.apply_rental_booking(*unit_id)
    }

    fn success_message(&self, _: &RentalDraft, _: &RentalUnit) -> String {
        "Sewa Berhasil! Unit sedang bergerak ke lokasi.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_hours_range() {
        let booking = RentalBooking { unit_id: 1 };
        assert!(schedule(&booking, &RentalDraft::default()).is_ok());
        assert!(schedule(&booking, &RentalDraft { hours: 24 }).is_ok());
        assert!(schedule(&booking, &RentalDraft { hours: 0 }).is_err());
        assert!(schedule(&booking, &RentalDraft { hours: 25 }).is_err());
    }
}
