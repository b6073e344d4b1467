//! Identity checks for incoming re-configurations.

use super::metadata::{uuid_of, version_created_of};
use super::version::Version;
use crate::error::IdentityMismatch;
use crate::settings::Settings;

/// The parts of an index that never change after it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexIdentity {
    pub uuid: String,
    pub version_created: Version,
    pub number_of_shards: Option<u32>,
}

/// Check `incoming` settings against the index identity.
///
/// The version is compared first, then the uuid. An absent or malformed
/// incoming version reads as [`Version::UNKNOWN`] and an absent uuid as
/// `_na_`, so both fail against a real identity.
pub fn validate_identity(
    identity: &IndexIdentity,
    incoming: &Settings,
) -> Result<(), IdentityMismatch> {
    let version = version_created_of(incoming).unwrap_or(Version::UNKNOWN);
    if version != identity.version_created {
        return Err(IdentityMismatch::Version {
            expected: identity.version_created,
            actual: version,
        });
    }
    let uuid = uuid_of(incoming);
    if uuid != identity.uuid {
        return Err(IdentityMismatch::Uuid {
            expected: identity.uuid.clone(),
            actual: uuid.to_string(),
        });
    }
    Ok(())
}
