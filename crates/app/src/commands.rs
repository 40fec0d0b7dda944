//! Line commands typed into the shell.

use std::str::FromStr;

use engine::WorkflowRequest;

use crate::error::AppError;

pub const HELP: &str = "\
session   : resume | logout | status | profile <name|location> <value>
workflows : onboard | loan | pledge <project> | contract <id> | rent <unit> | repay [loan]
wizard    : set <field> <value> | next | back | submit | cancel | fields
lists     : projects | loans | contracts | rentals | tasks | chat
actions   : done <task> | ask <question> | scan | dismiss
other     : help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Projects,
    Loans,
    Contracts,
    Rentals,
    Tasks,
    Chat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Status,
    Resume,
    Logout,
    Profile { field: ProfileField, value: String },
    Start(WorkflowRequest),
    Set { field: String, value: String },
    Fields,
    Next,
    Back,
    Submit,
    Cancel,
    List(Listing),
    Done(u32),
    Ask(String),
    Scan,
    Dismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    Location,
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Command(message.into())
}

fn id<T: FromStr>(raw: Option<&str>, what: &str) -> Result<T, AppError> {
    let raw = raw.ok_or_else(|| invalid(format!("missing {what}")))?;
    raw.parse()
        .map_err(|_| invalid(format!("invalid {what}: {raw}")))
}

fn text(raw: Option<&str>, what: &str) -> Result<String, AppError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(invalid(format!("missing {what}"))),
    }
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim())),
            None => (line, None),
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "status" => Self::Status,
            "resume" => Self::Resume,
            "logout" => Self::Logout,
            "profile" => {
                let rest = text(rest, "profile field")?;
                let (field, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| invalid("usage: profile <name|location> <value>"))?;
                let field = match field {
                    "name" => ProfileField::Name,
                    "location" => ProfileField::Location,
                    other => return Err(invalid(format!("unknown profile field: {other}"))),
                };
                Self::Profile {
                    field,
                    value: value.trim().to_string(),
                }
            }
            "onboard" => Self::Start(WorkflowRequest::Onboarding),
            "loan" => Self::Start(WorkflowRequest::Loan),
            "pledge" => Self::Start(WorkflowRequest::Pledge {
                project_id: id(rest, "project id")?,
            }),
            "contract" => Self::Start(WorkflowRequest::Contract {
                contract_id: text(rest, "contract id")?,
            }),
            "rent" => Self::Start(WorkflowRequest::Rental {
                unit_id: id(rest, "unit id")?,
            }),
            "repay" => Self::Start(WorkflowRequest::Repayment {
                loan_id: rest
                    .filter(|r| !r.is_empty())
                    .unwrap_or("L-2024001")
                    .to_string(),
            }),
            "set" => {
                let rest = text(rest, "field")?;
                let (field, value) = match rest.split_once(char::is_whitespace) {
                    Some((field, value)) => (field, value.trim()),
                    None => (rest.as_str(), ""),
                };
                Self::Set {
                    field: field.to_string(),
                    value: value.to_string(),
                }
            }
            "fields" => Self::Fields,
            "next" | "n" => Self::Next,
            "back" | "b" => Self::Back,
            "submit" => Self::Submit,
            "cancel" => Self::Cancel,
            "projects" => Self::List(Listing::Projects),
            "loans" => Self::List(Listing::Loans),
            "contracts" => Self::List(Listing::Contracts),
            "rentals" => Self::List(Listing::Rentals),
            "tasks" => Self::List(Listing::Tasks),
            "chat" => Self::List(Listing::Chat),
            "done" => Self::Done(id(rest, "task id")?),
            "ask" => Self::Ask(text(rest, "question")?),
            "scan" => Self::Scan,
            "dismiss" => Self::Dismiss,
            other => return Err(invalid(format!("unknown command: {other} (try help)"))),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        line.parse().unwrap()
    }

    #[test]
    fn workflow_starts() {
        assert_eq!(parse("onboard"), Command::Start(WorkflowRequest::Onboarding));
        assert_eq!(
            parse("pledge 1"),
            Command::Start(WorkflowRequest::Pledge { project_id: 1 })
        );
        assert_eq!(
            parse("contract req-2"),
            Command::Start(WorkflowRequest::Contract {
                contract_id: "req-2".to_string()
            })
        );
        assert_eq!(
            parse("repay"),
            Command::Start(WorkflowRequest::Repayment {
                loan_id: "L-2024001".to_string()
            })
        );
    }

    #[test]
    fn set_keeps_spaces_in_value() {
        assert_eq!(
            parse("set name  Budi Santoso "),
            Command::Set {
                field: "name".to_string(),
                value: "Budi Santoso".to_string()
            }
        );
        assert_eq!(
            parse("set amount"),
            Command::Set {
                field: "amount".to_string(),
                value: String::new()
            }
        );
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(
            "rent two".parse::<Command>(),
            Err(AppError::Command(msg)) if msg == "invalid unit id: two"
        ));
        assert!("pledge".parse::<Command>().is_err());
        assert!("fly".parse::<Command>().is_err());
        assert!("profile age 40".parse::<Command>().is_err());
    }

    #[test]
    fn profile_and_shortcuts() {
        assert_eq!(
            parse("profile location Desa Makmur"),
            Command::Profile {
                field: ProfileField::Location,
                value: "Desa Makmur".to_string()
            }
        );
        assert_eq!(parse("n"), Command::Next);
        assert_eq!(parse("ask  kapan panen? "), Command::Ask("kapan panen?".to_string()));
        assert_eq!(parse("done 2"), Command::Done(2));
    }
}
