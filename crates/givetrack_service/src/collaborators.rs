//! Outside collaborators of the action handlers.

use givetrack_store::{Collection, OwnerId, SearchPreferences, SearchResult};
use thiserror::Error;

/// Failure reported by a collaborator. Handlers log it and carry on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

/// Contact details found for a beneficiary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    /// Phone number.
    pub phone: String,
    /// Email address.
    pub email: String,
    /// Social handle.
    pub social: String,
}

/// Best-effort contact lookup for a beneficiary.
pub trait ContactLookup: Send + Sync {
    /// Looks up contact details.
    fn lookup(&self, beneficiary_id: &str) -> Result<ContactDetails, CollaboratorError>;
}

/// Beneficiary directory search.
pub trait Directory: Send + Sync {
    /// Searches with the owner's preferences. When `preferences.focus` is
    /// set, looks up `preferences.beneficiary_id` alone.
    fn search(
        &self,
        owner: &OwnerId,
        preferences: &SearchPreferences,
    ) -> Result<Vec<SearchResult>, CollaboratorError>;
}

/// Receives a signal after every committed change.
pub trait RefreshNotifier: Send + Sync {
    /// Signals that `collection` of `owner` changed.
    fn data_changed(&self, owner: &OwnerId, collection: Collection);
}

/// Contact lookup that finds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContacts;

impl ContactLookup for NoContacts {
    fn lookup(&self, _beneficiary_id: &str) -> Result<ContactDetails, CollaboratorError> {
        Ok(ContactDetails::default())
    }
}

/// Directory with no entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyDirectory;

impl Directory for EmptyDirectory {
    fn search(
        &self,
        _owner: &OwnerId,
        _preferences: &SearchPreferences,
    ) -> Result<Vec<SearchResult>, CollaboratorError> {
        Ok(Vec::new())
    }
}

/// Notifier that drops every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl RefreshNotifier for SilentNotifier {
    fn data_changed(&self, _owner: &OwnerId, _collection: Collection) {}
}
