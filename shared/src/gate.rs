//! Deferral of privileged actions until the matching OS permission is
//! granted.
//!
//! The gate itself performs no effects. The controller parks an action
//! with it, issues the permission check/prompt when told to, and hands the
//! answer back to resume or abandon the parked action.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::capabilities::PermissionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardedAction {
    StartLocationUpdates,
    SendStatusMessage,
}

impl GuardedAction {
    #[must_use]
    pub const fn required_permission(self) -> PermissionKind {
        match self {
            Self::StartLocationUpdates => PermissionKind::FineLocation,
            Self::SendStatusMessage => PermissionKind::SendSms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Action parked; the caller must query the permission.
    Check(PermissionKind),
    /// An action for the same permission is already parked and its query
    /// is in flight. Nothing to issue.
    Coalesced(PermissionKind),
}

/// Every admission parks the action until the shell answers a fresh
/// check. A grant seen earlier may have been revoked since.
#[derive(Debug, Default)]
pub struct PermissionGate {
    deferred: BTreeMap<PermissionKind, GuardedAction>,
}

impl PermissionGate {
    #[must_use]
    pub fn admit(&mut self, action: GuardedAction) -> Admission {
        let kind = action.required_permission();

        match self.deferred.insert(kind, action) {
            Some(_) => Admission::Coalesced(kind),
            None => Admission::Check(kind),
        }
    }

    /// Releases the parked action after a grant. Each parked action is
    /// released at most once.
    pub fn resume(&mut self, kind: PermissionKind) -> Option<GuardedAction> {
        self.deferred.remove(&kind)
    }

    /// Drops the parked action after a denial.
    pub fn abandon(&mut self, kind: PermissionKind) -> Option<GuardedAction> {
        self.deferred.remove(&kind)
    }

    #[must_use]
    pub fn is_pending(&self, kind: PermissionKind) -> bool {
        self.deferred.contains_key(&kind)
    }
}
