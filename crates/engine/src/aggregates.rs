//! Long-lived domain records mutated by resolved transactions.
//!
//! [`Aggregates`] is the plain container; every `apply_*` method checks its
//! preconditions before touching any field, so a failed mutation leaves the
//! container exactly as it was. [`StateStore`] is the cloneable handle the
//! workflows share.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    EngineError, ResultEngine, Rupiah, catalog,
    transactions::{LoanScheme, RepaymentMethod},
};

/// Identifies one aggregate for in-flight bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AggregateRef {
    Loan(String),
    Project(u32),
    Contract(String),
    Rental(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// Submitted, waiting for credit verification.
    Pending,
    /// Paying on schedule.
    Current,
    Settled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanAccount {
    pub id: String,
    pub amount: Rupiah,
    pub remaining: Rupiah,
    pub purpose: String,
    pub scheme: LoanScheme,
    pub status: LoanStatus,
    pub next_due: Option<String>,
    pub last_payment: Option<RepaymentMethod>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentProject {
    pub id: u32,
    pub name: String,
    pub farmer: String,
    pub expected_return_pct: u8,
    pub target: Rupiah,
    pub collected: Rupiah,
    pub progress: u8,
}

impl InvestmentProject {
    pub fn new(id: u32, name: &str, farmer: &str, target: Rupiah, collected: Rupiah) -> Self {
        Self {
            id,
            name: name.to_string(),
            farmer: farmer.to_string(),
            expected_return_pct: 0,
            target,
            collected,
            progress: progress_of(collected, target),
        }
    }

    /// What is still missing to reach the target, never negative.
    pub fn remaining(&self) -> Rupiah {
        self.target.floored_sub(self.collected)
    }
}

/// `min(100, round(collected / target * 100))`, rounding half up.
pub fn progress_of(collected: Rupiah, target: Rupiah) -> u8 {
    if target.value() <= 0 {
        return 100;
    }
    let collected = i128::from(collected.value().max(0));
    let target = i128::from(target.value());
    let rounded = (collected * 200 + target) / (target * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Open,
    Negotiating,
    Active,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub buyer: String,
    pub commodity: String,
    pub volume_tons: u32,
    pub price_per_kg: Rupiah,
    pub deadline: String,
    pub status: ContractStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalStatus {
    Available,
    Booked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalUnit {
    pub id: u32,
    pub name: String,
    pub owner: String,
    pub distance: String,
    pub rate: Rupiah,
    pub status: RentalStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Done,
    Pending,
    Future,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmTask {
    pub id: u32,
    pub title: String,
    pub due: String,
    pub status: TaskStatus,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Aggregates {
    pub credit_score: u16,
    loans: BTreeMap<String, LoanAccount>,
    projects: BTreeMap<u32, InvestmentProject>,
    contracts: BTreeMap<String, Contract>,
    rentals: BTreeMap<u32, RentalUnit>,
    tasks: BTreeMap<u32, FarmTask>,
    #[serde(skip)]
    in_flight: HashSet<AggregateRef>,
    #[serde(skip)]
    loan_seq: u32,
}

impl Aggregates {
    /// The fixture every new session starts from.
    pub fn seeded() -> Self {
        let mut aggregates = Self {
            credit_score: catalog::CREDIT_SCORE,
            ..Self::default()
        };

        aggregates.insert_loan(LoanAccount {
            id: "L-2024001".to_string(),
            amount: Rupiah::new(5_000_000),
            remaining: Rupiah::new(2_500_000),
            purpose: "Pupuk".to_string(),
            scheme: LoanScheme::Syariah,
            status: LoanStatus::Current,
            next_due: Some("15 Agustus 2024".to_string()),
            last_payment: None,
        });

        let mut corn = InvestmentProject::new(
            1,
            "Perluasan Lahan Jagung",
            "Pak Yanto",
            Rupiah::new(5_000_000),
            Rupiah::new(3_500_000),
        );
        corn.expected_return_pct = 12;
        aggregates.insert_project(corn);
        let mut melon = InvestmentProject::new(
            2,
            "Hidroponik Melon",
            "Bu Susi",
            Rupiah::new(10_000_000),
            Rupiah::new(3_000_000),
        );
        melon.expected_return_pct = 15;
        aggregates.insert_project(melon);

        for (id, buyer, commodity, volume_tons, price, deadline, status) in [
            (
                "c1",
                "PT Indofood Sukses Makmur",
                "Kentang Granola",
                5,
                12_000,
                "2024-08-15",
                ContractStatus::Active,
            ),
            (
                "c2",
                "CV Sumber Pangan",
                "Padi IR64",
                10,
                6_500,
                "2024-09-01",
                ContractStatus::Open,
            ),
            (
                "req-1",
                "PT Indofood",
                "Kentang Granola",
                10,
                12_000,
                "2024-10-01",
                ContractStatus::Open,
            ),
            (
                "req-2",
                "Superindo",
                "Cabai Rawit",
                2,
                45_000,
                "2024-10-15",
                ContractStatus::Open,
            ),
        ] {
            aggregates.insert_contract(Contract {
                id: id.to_string(),
                buyer: buyer.to_string(),
                commodity: commodity.to_string(),
                volume_tons,
                price_per_kg: Rupiah::new(price),
                deadline: deadline.to_string(),
                status,
            });
        }

        for (id, name, owner, distance, rate, status) in [
            (
                1,
                "Traktor Roda 4",
                "UD Tani Maju",
                "0.8 km",
                150_000,
                RentalStatus::Available,
            ),
            (
                2,
                "Drone Sprayer",
                "Smart Tani",
                "1.2 km",
                250_000,
                RentalStatus::Booked,
            ),
            (
                3,
                "Combine Harvester",
                "KUD Makmur",
                "2.5 km",
                400_000,
                RentalStatus::Available,
            ),
        ] {
            aggregates.insert_rental(RentalUnit {
                id,
                name: name.to_string(),
                owner: owner.to_string(),
                distance: distance.to_string(),
                rate: Rupiah::new(rate),
                status,
            });
        }

        for (id, title, due, status) in [
            (1, "Tanam", "15 Mei", TaskStatus::Done),
            (2, "Pemupukan KCL", "Hari Ini", TaskStatus::Pending),
            (3, "Estimasi Panen", "15 Juli", TaskStatus::Future),
        ] {
            aggregates.tasks.insert(
                id,
                FarmTask {
                    id,
                    title: title.to_string(),
                    due: due.to_string(),
                    status,
                },
            );
        }

        aggregates
    }

    pub fn insert_loan(&mut self, loan: LoanAccount) {
        self.loans.insert(loan.id.clone(), loan);
    }

    pub fn insert_project(&mut self, project: InvestmentProject) {
        self.projects.insert(project.id, project);
    }

    pub fn insert_contract(&mut self, contract: Contract) {
        self.contracts.insert(contract.id.clone(), contract);
    }

    pub fn insert_rental(&mut self, unit: RentalUnit) {
        self.rentals.insert(unit.id, unit);
    }

    pub fn loan(&self, id: &str) -> Option<&LoanAccount> {
        self.loans.get(id)
    }

    pub fn loans(&self) -> impl Iterator<Item = &LoanAccount> {
        self.loans.values()
    }

    pub fn project(&self, id: u32) -> Option<&InvestmentProject> {
        self.projects.get(&id)
    }

    pub fn projects(&self) -> impl Iterator<Item = &InvestmentProject> {
        self.projects.values()
    }

    pub fn contract(&self, id: &str) -> Option<&Contract> {
        self.contracts.get(id)
    }

    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.values()
    }

    pub fn rental(&self, id: u32) -> Option<&RentalUnit> {
        self.rentals.get(&id)
    }

    pub fn rentals(&self) -> impl Iterator<Item = &RentalUnit> {
        self.rentals.values()
    }

    pub fn task(&self, id: u32) -> Option<&FarmTask> {
        self.tasks.get(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &FarmTask> {
        self.tasks.values()
    }

    pub fn is_in_flight(&self, target: &AggregateRef) -> bool {
        self.in_flight.contains(target)
    }

    /// Marks `target` as having a transaction in flight.
    pub fn reserve(&mut self, target: AggregateRef) -> ResultEngine<()> {
        if self.in_flight.contains(&target) {
            return Err(EngineError::Conflict(format!(
                "{target:?} already has a transaction in flight"
            )));
        }
        self.in_flight.insert(target);
        Ok(())
    }

    pub fn release(&mut self, target: &AggregateRef) {
        self.in_flight.remove(target);
    }

    /// Records a new pending loan. Balances are seeded, not amortized.
    pub fn apply_loan_application(
        &mut self,
        amount: Rupiah,
        purpose: &str,
        scheme: LoanScheme,
        opened_at: DateTime<Utc>,
    ) -> ResultEngine<LoanAccount> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "loan amount must be > 0".to_string(),
            ));
        }

        let mut seq = self.loan_seq + 1;
        let mut id = format!("L-{}{seq:03}", opened_at.year());
        while self.loans.contains_key(&id) {
            seq += 1;
            id = format!("L-{}{seq:03}", opened_at.year());
        }
        self.loan_seq = seq;

        let loan = LoanAccount {
            id: id.clone(),
            amount,
            remaining: amount,
            purpose: purpose.to_string(),
            scheme,
            status: LoanStatus::Pending,
            next_due: None,
            last_payment: None,
        };
        self.loans.insert(id, loan.clone());
        Ok(loan)
    }

    pub fn apply_investment_pledge(
        &mut self,
        project_id: u32,
        amount: Rupiah,
    ) -> ResultEngine<InvestmentProject> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "pledge must be > 0".to_string(),
            ));
        }
        let project = self
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| EngineError::NotFound(format!("project {project_id}")))?;
        let collected = project
            .collected
            .checked_add(amount)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;

        project.collected = collected;
        project.progress = progress_of(collected, project.target);
        Ok(project.clone())
    }

    pub fn apply_contract_signature(&mut self, contract_id: &str) -> ResultEngine<Contract> {
        let contract = self
            .contracts
            .get_mut(contract_id)
            .ok_or_else(|| EngineError::NotFound(format!("contract {contract_id}")))?;
        if contract.status != ContractStatus::Open {
            return Err(EngineError::InvalidState(format!(
                "contract {contract_id} is {:?}, expected Open",
                contract.status
            )));
        }
        contract.status = ContractStatus::Active;
        Ok(contract.clone())
    }

    pub fn apply_rental_booking(&mut self, unit_id: u32) -> ResultEngine<RentalUnit> {
        let unit = self
            .rentals
            .get_mut(&unit_id)
            .ok_or_else(|| EngineError::NotFound(format!("rental unit {unit_id}")))?;
        if unit.status == RentalStatus::Booked {
            return Err(EngineError::Conflict(format!(
                "rental unit {unit_id} is already booked"
            )));
        }
        unit.status = RentalStatus::Booked;
        Ok(unit.clone())
    }

    pub fn apply_repayment(
        &mut self,
        loan_id: &str,
        method: RepaymentMethod,
        amount: Rupiah,
    ) -> ResultEngine<LoanAccount> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "repayment must be > 0".to_string(),
            ));
        }
        let loan = self
            .loans
            .get_mut(loan_id)
            .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))?;

        loan.remaining = loan.remaining.floored_sub(amount);
        loan.last_payment = Some(method);
        if loan.remaining.is_zero() {
            loan.status = LoanStatus::Settled;
        }
        Ok(loan.clone())
    }

    pub fn complete_task(&mut self, task_id: u32) -> ResultEngine<FarmTask> {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| EngineError::NotFound(format!("task {task_id}")))?;
        if task.status != TaskStatus::Pending {
            return Err(EngineError::InvalidState(format!(
                "task {task_id} is {:?}, expected Pending",
                task.status
            )));
        }
        task.status = TaskStatus::Done;
        Ok(task.clone())
    }
}

/// Shared handle over the session's [`Aggregates`].
#[derive(Clone, Debug, Default)]
pub struct StateStore {
    inner: Arc<Mutex<Aggregates>>,
}

impl StateStore {
    pub fn new(aggregates: Aggregates) -> Self {
        Self {
            inner: Arc::new(Mutex::new(aggregates)),
        }
    }

    pub async fn snapshot(&self) -> Aggregates {
        self.inner.lock().await.clone()
    }

    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Aggregates) -> R,
    {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    /// Drops the in-flight mark on `target` without awaiting. Used from
    /// drop handlers; if the lock is held the release runs on a spawned task.
    pub fn release_detached(&self, target: AggregateRef) {
        if let Ok(mut guard) = self.inner.try_lock() {
            guard.release(&target);
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move {
                    inner.lock().await.release(&target);
                });
            }
            Err(_) => tracing::warn!("no runtime to release {target:?}, it stays in flight"),
        }
    }

    /// Runs `f` while holding the lock, so callers never observe a
    /// half-applied mutation.
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Aggregates) -> R,
    {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }
}
