//! Which members get a letter in this run.

use crate::domain::{CommunicationMethod, MembershipStatus};
use std::str::FromStr;
use thiserror::Error;

/// Run mode chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    New,
    Pending,
    Expired,
    Pirate,
    NotPirate,
    All,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Parameter not understood: {0:?}. State one of 'new', 'pending', 'expired', 'pirate', 'notpirate' or 'all'.")]
pub struct UsageError(pub String);

impl FromStr for RunMode {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(RunMode::New),
            "pending" => Ok(RunMode::Pending),
            "expired" => Ok(RunMode::Expired),
            "pirate" => Ok(RunMode::Pirate),
            "notpirate" => Ok(RunMode::NotPirate),
            "all" => Ok(RunMode::All),
            other => Err(UsageError(other.to_string())),
        }
    }
}

impl RunMode {
    pub const ALL: [RunMode; 6] = [
        RunMode::New,
        RunMode::Pending,
        RunMode::Expired,
        RunMode::Pirate,
        RunMode::NotPirate,
        RunMode::All,
    ];

    /// Statuses processed by this mode.
    pub fn statuses(&self) -> &'static [MembershipStatus] {
        use MembershipStatus::*;
        match self {
            RunMode::New => &[New],
            RunMode::Pending => &[Pending],
            RunMode::Expired => &[Expired],
            RunMode::Pirate => &[Pirate, Grace],
            RunMode::NotPirate => &[New, Pending, Expired],
            RunMode::All => &[New, Pending, Pirate, Grace, Expired],
        }
    }

    /// Progress line printed once at startup.
    pub fn describe(&self) -> &'static str {
        match self {
            RunMode::New => "Creating letters for new members",
            RunMode::Pending => "Creating letters for pending members",
            RunMode::Expired => "Creating letters for expired members",
            RunMode::Pirate => "Creating letters for pirate and grace members",
            RunMode::NotPirate => "Creating letters for new, pending and expired members",
            RunMode::All => "Creating letters for all members",
        }
    }

    pub fn selection(&self) -> StatusSelection {
        StatusSelection::from_statuses(self.statuses())
    }
}

/// Immutable set of statuses selected for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSelection {
    flags: [bool; 9],
}

impl StatusSelection {
    pub fn from_statuses(statuses: &[MembershipStatus]) -> Self {
        let mut flags = [false; 9];
        for status in statuses {
            // unknown is never processed, whatever the caller asks for
            if *status != MembershipStatus::Unknown {
                flags[status.index()] = true;
            }
        }
        Self { flags }
    }

    pub fn contains(&self, status: MembershipStatus) -> bool {
        self.flags[status.index()]
    }
}

impl From<RunMode> for StatusSelection {
    fn from(mode: RunMode) -> Self {
        mode.selection()
    }
}

/// Whether a membership with this raw status code gets an invoice.
pub fn needs_invoice(status_id: &str, selection: &StatusSelection) -> bool {
    selection.contains(MembershipStatus::from_code(status_id))
}

/// Whether any of the contact's channel codes is snail mail.
pub fn prefers_snail_mail<S: AsRef<str>>(method_codes: &[S]) -> bool {
    method_codes
        .iter()
        .any(|code| CommunicationMethod::from_code(code.as_ref()) == Some(CommunicationMethod::SnailMail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(status: MembershipStatus) -> String {
        status.index().to_string()
    }

    #[test]
    fn test_needs_invoice_all_modes_all_statuses() {
        for mode in RunMode::ALL {
            let selection = mode.selection();
            for status in MembershipStatus::ALL {
                let expected = mode.statuses().contains(&status);
                assert_eq!(
                    needs_invoice(&code_of(status), &selection),
                    expected,
                    "mode {:?} status {}",
                    mode,
                    status
                );
            }
        }
    }

    #[test]
    fn test_unmapped_status_never_matches() {
        for mode in RunMode::ALL {
            assert!(!needs_invoice("99", &mode.selection()));
            assert!(!needs_invoice("", &mode.selection()));
        }
        let everything = StatusSelection::from_statuses(&MembershipStatus::ALL);
        assert!(!needs_invoice("0", &everything));
        assert!(!needs_invoice("abc", &everything));
    }

    #[test]
    fn test_pirate_selects_grace() {
        let selection = RunMode::Pirate.selection();
        assert!(needs_invoice("2", &selection));
        assert!(needs_invoice("3", &selection));
        assert!(!needs_invoice("1", &selection));
    }

    #[test]
    fn test_prefers_snail_mail() {
        assert!(prefers_snail_mail(&["2", "3"]));
        assert!(!prefers_snail_mail(&["1", "2"]));
        assert!(!prefers_snail_mail::<&str>(&[]));
        assert!(!prefers_snail_mail(&["9", "x"]));
    }

    #[test]
    fn test_run_mode_parse() {
        assert_eq!("notpirate".parse::<RunMode>().unwrap(), RunMode::NotPirate);
        assert_eq!(RunMode::default(), RunMode::New);
        let err = "everyone".parse::<RunMode>().unwrap_err();
        assert_eq!(err, UsageError("everyone".to_string()));
        assert!(err.to_string().contains("'notpirate'"));
    }
}
