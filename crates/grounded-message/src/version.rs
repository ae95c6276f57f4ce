//! Append-only version history
//!
//! The only code paths that create or extend a [`Message`]. Every append
//! re-derives the version number from the current history length, so
//! numbering is `1..=len` by construction; [`validate_versions`] checks the
//! same invariants on records that arrive from elsewhere.

use crate::error::MessageError;
use crate::lifecycle::{validate_operation, Operation};
use crate::types::{
    partition_claims, Claim, ClaimStatus, Message, MessageId, MessageStatus, MessageVersion,
    VersionId, VersionSource,
};
use chrono::{DateTime, Utc};

/// Content of a version about to be appended
#[derive(Debug, Clone)]
pub struct VersionDraft {
    pub source: VersionSource,
    pub prompt_or_instruction: String,
    pub message_text: String,
    /// Full claim set; split into supported/dropped on append
    pub claims: Vec<Claim>,
}

impl VersionDraft {
    #[must_use]
    pub fn new(
        source: VersionSource,
        prompt_or_instruction: impl Into<String>,
        message_text: impl Into<String>,
        claims: Vec<Claim>,
    ) -> Self {
        Self {
            source,
            prompt_or_instruction: prompt_or_instruction.into(),
            message_text: message_text.into(),
            claims,
        }
    }

    fn into_version(self, id: VersionId, version_number: u32, now: DateTime<Utc>) -> MessageVersion {
        let (claims, dropped_claims) = partition_claims(self.claims);
        MessageVersion {
            id,
            version_number,
            source: self.source,
            created_at: now,
            prompt_or_instruction: self.prompt_or_instruction,
            message_text: self.message_text,
            claims,
            dropped_claims,
        }
    }
}

impl Message {
    /// Create a draft message whose first version comes from generation
    pub(crate) fn create(
        id: MessageId,
        version_id: VersionId,
        draft: VersionDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, MessageError> {
        if draft.source != VersionSource::Generated {
            return Err(MessageError::InvariantViolation(format!(
                "first version must be generated, got {:?}",
                draft.source
            )));
        }
        Ok(Self {
            id,
            status: MessageStatus::Draft,
            created_at: now,
            updated_at: now,
            versions: vec![draft.into_version(version_id, 1, now)],
        })
    }

    /// Append the next version; rejected while finalized
    pub(crate) fn append_version(
        &mut self,
        version_id: VersionId,
        draft: VersionDraft,
        now: DateTime<Utc>,
    ) -> Result<&MessageVersion, MessageError> {
        let operation = match draft.source {
            VersionSource::Refined => Operation::Refine,
            VersionSource::Edited => Operation::Edit,
            VersionSource::Generated => {
                return Err(MessageError::InvariantViolation(
                    "generated versions only start a message".to_string(),
                ))
            }
        };
        validate_operation(self.id, self.status, operation)?;

        let next = u32::try_from(self.versions.len() + 1).map_err(|_| {
            MessageError::InvariantViolation("version number overflow".to_string())
        })?;
        self.versions.push(draft.into_version(version_id, next, now));
        self.updated_at = now;
        tracing::info!(message_id = %self.id, version = next, "Appended version");
        Ok(&self.versions[self.versions.len() - 1])
    }

    /// Flip the status; versions are untouched. Returns whether it changed.
    pub(crate) fn set_status(&mut self, status: MessageStatus, now: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = now;
        true
    }

    /// Re-check the history invariants
    pub fn verify_integrity(&self) -> Result<(), MessageError> {
        validate_versions(&self.versions)
    }
}

/// Validate a version history against the append-only contract
pub fn validate_versions(versions: &[MessageVersion]) -> Result<(), MessageError> {
    if versions.is_empty() {
        return Err(MessageError::InvariantViolation(
            "message has no versions".to_string(),
        ));
    }
    for (index, version) in versions.iter().enumerate() {
        let expected = index + 1;
        if usize::try_from(version.version_number).ok() != Some(expected) {
            return Err(MessageError::InvariantViolation(format!(
                "version {} found at position {expected}",
                version.version_number
            )));
        }
        if version.claims.iter().any(|c| c.status != ClaimStatus::Supported) {
            return Err(MessageError::InvariantViolation(format!(
                "version {expected} lists a dropped claim as supported"
            )));
        }
        if version
            .dropped_claims
            .iter()
            .any(|c| c.status != ClaimStatus::Dropped)
        {
            return Err(MessageError::InvariantViolation(format!(
                "version {expected} lists a supported claim as dropped"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Citation;

    fn generated() -> Message {
        let draft = VersionDraft::new(
            VersionSource::Generated,
            "summarize X",
            "X causes Y",
            vec![
                Claim::supported("X causes Y", vec![Citation::new(1, 3)]),
                Claim::dropped("Z", "No citations provided"),
            ],
        );
        Message::create(MessageId(1), VersionId(1), draft, Utc::now()).unwrap()
    }

    #[test]
    fn create_partitions_claims() {
        let msg = generated();
        let v1 = msg.latest_version();
        assert_eq!(v1.version_number, 1);
        assert_eq!(v1.claims.len(), 1);
        assert_eq!(v1.dropped_claims.len(), 1);
        assert!(msg.verify_integrity().is_ok());
    }

    #[test]
    fn create_requires_generated_source() {
        let draft = VersionDraft::new(VersionSource::Edited, "direct edit", "t", vec![]);
        assert!(Message::create(MessageId(1), VersionId(1), draft, Utc::now()).is_err());
    }

    #[test]
    fn append_numbers_sequentially() {
        let mut msg = generated();
        let draft = VersionDraft::new(VersionSource::Refined, "shorter", "X", vec![]);
        assert_eq!(
            msg.append_version(VersionId(2), draft, Utc::now())
                .unwrap()
                .version_number,
            2
        );
        let draft = VersionDraft::new(VersionSource::Edited, "direct edit", "Y", vec![]);
        assert_eq!(
            msg.append_version(VersionId(3), draft, Utc::now())
                .unwrap()
                .version_number,
            3
        );
        assert!(msg.verify_integrity().is_ok());
    }

    #[test]
    fn append_rejected_when_finalized() {
        let mut msg = generated();
        assert!(msg.set_status(MessageStatus::Finalized, Utc::now()));
        let before = msg.versions().to_vec();

        let draft = VersionDraft::new(VersionSource::Refined, "shorter", "X", vec![]);
        let result = msg.append_version(VersionId(2), draft, Utc::now());
        assert!(matches!(result, Err(MessageError::Finalized(MessageId(1)))));
        assert_eq!(msg.versions(), before.as_slice());
    }

    #[test]
    fn set_status_same_value_is_noop() {
        let mut msg = generated();
        let updated = msg.updated_at();
        assert!(!msg.set_status(MessageStatus::Draft, Utc::now()));
        assert_eq!(msg.updated_at(), updated);
    }

    #[test]
    fn validate_rejects_misfiled_claims() {
        let mut msg = generated();
        msg.versions[0].claims.push(Claim::dropped("bad", "w"));
        assert!(matches!(
            msg.verify_integrity(),
            Err(MessageError::InvariantViolation(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_history() {
        assert!(validate_versions(&[]).is_err());
    }
}
