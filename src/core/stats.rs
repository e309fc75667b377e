use serde::Serialize;

use super::registrant::{Registrant, Status};

/// Registration counts over the whole registrant population.
///
/// Always derived from the full snapshot, never from the table's
/// filtered rows, so `accepted + rejected + pending == total`.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Serialize)]
pub struct RegistrantStats {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub pending: usize,
    pub checked_in: usize,
}

/// Single pass over the snapshot counting by status and check-in flag.
pub fn tally(snapshot: &[Registrant]) -> RegistrantStats {
    let mut stats = RegistrantStats {
        total: snapshot.len(),
        ..Default::default()
    };

    for registrant in snapshot {
        match registrant.status {
            Status::Pending => stats.pending += 1,
            Status::Accepted => stats.accepted += 1,
            Status::Rejected => stats.rejected += 1,
        }
        if registrant.is_checked_in {
            stats.checked_in += 1;
        }
    }

    stats
}
