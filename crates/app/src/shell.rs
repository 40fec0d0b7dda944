//! Line-oriented presentation layer over the [`SessionController`].

use engine::{
    Committed, KeyValueStore, Mode, Notification, NotificationKind, SessionController,
    SessionEvent, TransactionGateway,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    commands::{Command, HELP, Listing, ProfileField},
    error::{AppError, Result},
};

pub struct Shell<S, G> {
    session: SessionController<S, G>,
}

fn print_notification(notification: &Notification) {
    let tag = match notification.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Error => "error",
    };
    println!("[{tag}] {}", notification.message);
}

fn describe(output: &Committed) -> String {
    match output {
        Committed::SignedUp(identity) => {
            format!("account {} created for {}", identity.id, identity.name)
        }
        Committed::LoanOpened(loan) => {
            format!("loan {} pending ({})", loan.id, loan.amount)
        }
        Committed::Pledged(project) => format!(
            "{}: {} of {} ({}%)",
            project.name, project.collected, project.target, project.progress
        ),
        Committed::ContractSigned(contract) => {
            format!("contract {} with {} is active", contract.id, contract.buyer)
        }
        Committed::RentalBooked(unit) => format!("{} booked", unit.name),
        Committed::Repaid(loan) => {
            format!("loan {} remaining {}", loan.id, loan.remaining)
        }
    }
}

impl<S, G> Shell<S, G>
where
    S: KeyValueStore,
    G: TransactionGateway + Clone,
{
    pub fn new(session: SessionController<S, G>) -> Self {
        Self { session }
    }

    pub async fn run(mut self) -> Result<()> {
        println!("Agro. Type `help` for commands.");
        let mode = self.session.resume()?;
        println!("mode: {mode:?}");
        if mode == Mode::Onboarding {
            println!("start with `onboard`.");
        }

        let notifier = self.session.notifier().clone();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let showing = notifier.deadline().await.is_some();
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(command) => self.handle(command).await?,
                        Err(err) => println!("! {err}"),
                    }
                }
                dismissed = notifier.wait_dismiss(), if showing => {
                    if dismissed {
                        tracing::debug!("notification dismissed");
                    }
                }
            }
        }
        tracing::info!("bye");
        Ok(())
    }

    async fn handle(&mut self, command: Command) -> Result<()> {
        match self.dispatch(command).await {
            Ok(()) => {}
            Err(AppError::Engine(err)) => println!("! {err}"),
            Err(err) => return Err(err),
        }
        if let Some(notification) = self.session.notifier().active().await {
            print_notification(&notification);
        }
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
            Command::Status => self.print_status().await?,
            Command::Resume => {
                let mode = self.session.resume()?;
                println!("mode: {mode:?}");
            }
            Command::Logout => {
                self.session.logout()?;
                println!("logged out");
            }
            Command::Profile { field, value } => {
                let identity = match field {
                    ProfileField::Name => self.session.update_profile(Some(&value), None).await?,
                    ProfileField::Location => {
                        self.session.update_profile(None, Some(&value)).await?
                    }
                };
                println!("{} @ {}", identity.name, identity.location);
            }
            Command::Start(request) => {
                self.session.start(request).await?;
                self.print_view()?;
            }
            Command::Set { field, value } => {
                self.session.set_field(&field, &value)?;
                self.print_view()?;
            }
            Command::Fields => println!("{}", self.session.fields().join(", ")),
            Command::Next => {
                println!("...");
                let event = self.session.advance().await;
                self.report(event)?;
            }
            Command::Submit => {
                println!("...");
                let event = self.session.commit().await;
                self.report(event)?;
            }
            Command::Back => {
                self.session.back()?;
                self.print_view()?;
            }
            Command::Cancel => {
                self.session.cancel()?;
                println!("cancelled");
            }
            Command::List(listing) => self.print_listing(listing).await?,
            Command::Done(task_id) => {
                let task = self.session.complete_task(task_id).await?;
                println!("{}: {:?}", task.title, task.status);
            }
            Command::Ask(question) => {
                let reply = self.session.ask_advisor(&question).await?;
                println!("Agro-AI: {}", reply.text);
            }
            Command::Scan => {
                let diagnosis = self.session.scan_crop().await?;
                println!(
                    "health {}%: {}. {}",
                    diagnosis.health, diagnosis.issue, diagnosis.recommendation
                );
            }
            Command::Dismiss => self.session.notifier().dismiss().await,
        }
        Ok(())
    }

    fn report(&self, event: engine::ResultEngine<SessionEvent>) -> Result<()> {
        match event {
            Ok(SessionEvent::Moved { .. }) => self.print_view(),
            Ok(SessionEvent::Committed {
                transaction,
                output,
            }) => {
                println!(
                    "{} {} in {}ms: {}",
                    transaction.kind.as_str(),
                    transaction.reference().unwrap_or("-"),
                    transaction.latency_ms.unwrap_or_default(),
                    describe(&output)
                );
                Ok(())
            }
            Err(err) => {
                println!("! {err}");
                self.print_view()
            }
        }
    }

    fn print_view(&self) -> Result<()> {
        let Some(view) = self.session.view()? else {
            return Ok(());
        };
        match (view.step_index, view.step_name) {
            (Some(index), Some(name)) => println!(
                "{} [{}/{}] {name} ({:?})",
                view.workflow,
                index + 1,
                view.step_count,
                view.phase
            ),
            _ => println!("{} ({:?})", view.workflow, view.phase),
        }
        if let Some(draft) = &view.draft {
            println!("{}", serde_json::to_string_pretty(draft)?);
        }
        if let Some(error) = &view.error {
            println!("  ! {error}");
        }
        Ok(())
    }

    async fn print_status(&self) -> Result<()> {
        println!("mode: {:?}", self.session.mode());
        if let Some(identity) = self.session.identity() {
            println!(
                "user: {} ({}) {} {} rep {:.1}",
                identity.name,
                identity.role.as_str(),
                identity.phone,
                identity.location,
                identity.reputation_score
            );
        }
        self.print_view()?;
        if let Some(notification) = self.session.notifier().active().await {
            print_notification(&notification);
        }
        Ok(())
    }

    async fn print_listing(&self, listing: Listing) -> Result<()> {
        let aggregates = self.session.store().snapshot().await;
        match listing {
            Listing::Projects => {
                for p in aggregates.projects() {
                    println!(
                        "{} {} by {}: {} / {} ({}%, return {}%)",
                        p.id, p.name, p.farmer, p.collected, p.target, p.progress,
                        p.expected_return_pct
                    );
                }
            }
            Listing::Loans => {
                println!("credit score {}", aggregates.credit_score);
                for l in aggregates.loans() {
                    println!(
                        "{} {} {:?}: {} of {} ({:?})",
                        l.id, l.purpose, l.scheme, l.remaining, l.amount, l.status
                    );
                }
            }
            Listing::Contracts => {
                for c in aggregates.contracts() {
                    println!(
                        "{} {} {} {}t @ {}/kg until {} ({:?})",
                        c.id, c.buyer, c.commodity, c.volume_tons, c.price_per_kg, c.deadline,
                        c.status
                    );
                }
            }
            Listing::Rentals => {
                for r in aggregates.rentals() {
                    println!(
                        "{} {} ({}, {}) {}/h {:?}",
                        r.id, r.name, r.owner, r.distance, r.rate, r.status
                    );
                }
            }
            Listing::Tasks => {
                for t in aggregates.tasks() {
                    println!("{} {} due {} ({:?})", t.id, t.title, t.due, t.status);
                }
            }
            Listing::Chat => {
                for message in self.session.advisor().history() {
                    println!(
                        "[{}] {:?}: {}",
                        message.time.format("%H:%M"),
                        message.sender,
                        message.text
                    );
                }
            }
        }
        Ok(())
    }
}
