//! In-process stand-in for the financing and market backends.
//!
//! Every transaction kind has a latency policy: a fixed delay, or a bounded
//! random one. Business transactions resolve to [`Outcome::Confirmed`];
//! advisor queries and crop scans draw their answer uniformly from the
//! catalog candidates. Failures only happen when `failure_rate` is set.

use std::{sync::Arc, time::Duration};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    EngineError, ResultEngine, TransactionGateway, catalog,
    transactions::{Diagnosis, Outcome, Payload, Transaction, TransactionKind},
};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
    /// Probability in `[0, 1]` that a transaction fails.
    pub failure_rate: f64,
    /// Multiplier applied to every latency.
    pub latency_scale: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            failure_rate: 0.0,
            latency_scale: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Latency {
    Fixed(u64),
    Between(u64, u64),
}

impl Latency {
    pub fn for_kind(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::LoanApplication => Self::Fixed(2_000),
            TransactionKind::InvestmentPledge => Self::Fixed(1_500),
            TransactionKind::ContractSignature => Self::Fixed(2_000),
            TransactionKind::RentalBooking => Self::Fixed(1_500),
            TransactionKind::Repayment => Self::Fixed(2_000),
            TransactionKind::AccountCreation => Self::Fixed(2_000),
            TransactionKind::AdvisorQuery => Self::Between(1_500, 2_500),
            TransactionKind::CropScan => Self::Fixed(2_000),
        }
    }

    fn sample(self, rng: &mut StdRng) -> u64 {
        match self {
            Self::Fixed(ms) => ms,
            Self::Between(lo, hi) if lo < hi => rng.gen_range(lo..=hi),
            Self::Between(lo, _) => lo,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    rng: Arc<Mutex<StdRng>>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl Simulator {
    /// Out-of-range or NaN knobs are normalised here: `failure_rate` is
    /// clamped to `[0, 1]` (NaN disables failures) and a non-finite or
    /// negative `latency_scale` falls back to 1.
    pub fn new(mut config: SimulatorConfig) -> Self {
        config.failure_rate = if config.failure_rate.is_nan() {
            0.0
        } else {
            config.failure_rate.clamp(0.0, 1.0)
        };
        if !config.latency_scale.is_finite() || config.latency_scale < 0.0 {
            config.latency_scale = 1.0;
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(SimulatorConfig {
            seed: Some(seed),
            ..SimulatorConfig::default()
        })
    }

    fn scaled(&self, ms: u64) -> Duration {
        let latency = Duration::from_millis(ms);
        let scale = self.config.latency_scale;
        if scale == 1.0 {
            return latency;
        }
        Duration::try_from_secs_f64(latency.as_secs_f64() * scale).unwrap_or(Duration::MAX)
    }

    fn draw(&self, rng: &mut StdRng, transaction: &Transaction) -> ResultEngine<Outcome> {
        match &transaction.payload {
            Payload::AdvisorQuery { .. } => {
                let text = catalog::ADVISOR_REPLIES
                    .choose(rng)
                    .ok_or_else(|| EngineError::TransactionFailed("no advisor reply".to_string()))?;
                Ok(Outcome::Reply {
                    text: (*text).to_string(),
                })
            }
            Payload::CropScan => {
                let (health, issue, recommendation) = catalog::DIAGNOSES
                    .choose(rng)
                    .ok_or_else(|| EngineError::TransactionFailed("no diagnosis".to_string()))?;
                Ok(Outcome::Diagnosis(Diagnosis {
                    health: *health,
                    issue: (*issue).to_string(),
                    recommendation: (*recommendation).to_string(),
                }))
            }
            Payload::ContractSignature { .. } => Ok(Outcome::Confirmed {
                reference: format!("0x{}", transaction.id.simple()),
            }),
            _ => Ok(Outcome::Confirmed {
                reference: transaction.id.simple().to_string(),
            }),
        }
    }
}

impl TransactionGateway for Simulator {
    async fn execute(&self, transaction: &Transaction) -> ResultEngine<Outcome> {
        let (latency, failed, outcome) = {
            let mut rng = self.rng.lock().await;
            let latency = self.scaled(Latency::for_kind(transaction.kind).sample(&mut rng));
            let failed = rng.gen_bool(self.config.failure_rate);
            let outcome = self.draw(&mut rng, transaction);
            (latency, failed, outcome)
        };

        tracing::debug!(
            "simulating {} {} for {}ms",
            transaction.kind.as_str(),
            transaction.id,
            latency.as_millis()
        );
        tokio::time::sleep(latency).await;

        if failed {
            tracing::warn!("simulated failure for {}", transaction.id);
            return Err(EngineError::TransactionFailed(format!(
                "{} rejected by backend",
                transaction.kind.as_str()
            )));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::Rupiah;

    #[tokio::test(start_paused = true)]
    async fn pledge_waits_fixed_latency_and_confirms() {
        let simulator = Simulator::seeded(7);
        let tx = Transaction::new(Payload::InvestmentPledge {
            project_id: 1,
            amount: Rupiah::new(50_000),
        });

        let started = Instant::now();
        let outcome = simulator.execute(&tx).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(1_500));
        assert_eq!(
            outcome,
            Outcome::Confirmed {
                reference: tx.id.simple().to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn advisor_reply_comes_from_candidates() {
        let simulator = Simulator::seeded(42);
        let tx = Transaction::new(Payload::AdvisorQuery {
            question: "Daun menguning?".to_string(),
        });

        let started = Instant::now();
        let Outcome::Reply { text } = simulator.execute(&tx).await.unwrap() else {
            panic!("expected a reply");
        };
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1_500) && waited <= Duration::from_millis(2_500));
        assert!(catalog::ADVISOR_REPLIES.contains(&text.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_rate_one_always_fails() {
        let simulator = Simulator::new(SimulatorConfig {
            seed: Some(1),
            failure_rate: 1.0,
            latency_scale: 0.0,
        });
        let tx = Transaction::new(Payload::RentalBooking {
            unit_id: 1,
            hours: 1,
        });
        let err = simulator.execute(&tx).await.unwrap_err();
        assert!(matches!(err, EngineError::TransactionFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn nan_failure_rate_never_fails() {
        let simulator = Simulator::new(SimulatorConfig {
            seed: Some(5),
            failure_rate: f64::NAN,
            latency_scale: f64::INFINITY,
        });
        let tx = Transaction::new(Payload::InvestmentPledge {
            project_id: 1,
            amount: Rupiah::new(50_000),
        });

        let started = Instant::now();
        assert!(simulator.execute(&tx).await.is_ok());
        assert_eq!(started.elapsed(), Duration::from_millis(1_500));
    }

    #[test]
    fn bounded_latency_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let ms = Latency::Between(10, 20).sample(&mut rng);
            assert!((10..=20).contains(&ms));
        }
        assert_eq!(Latency::Between(5, 5).sample(&mut rng), 5);
    }
}
