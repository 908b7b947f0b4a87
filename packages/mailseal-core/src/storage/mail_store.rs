//! Keyed store of received mail.
//!
//! The surrounding service keeps its messages in whatever backend it likes;
//! [`MailStore`] is the seam. [`MemoryMailStore`] is the in-process
//! implementation used by the CLI and the tests.

use parking_lot::RwLock;
use uuid::Uuid;

use crate::crypto::{decrypt_batch, is_structurally_valid, Envelope, KeyPair};
use crate::error::{Error, Result};
use crate::mail::{MailRecord, MailState};

/// Storage for mail records
pub trait MailStore: Send + Sync {
    /// Add a received envelope, returning the new record's id
    fn insert(&self, envelope: Envelope) -> Result<Uuid>;

    /// All records, oldest first
    fn list(&self) -> Result<Vec<MailRecord>>;

    /// Look up one record
    fn get(&self, id: &Uuid) -> Result<Option<MailRecord>>;

    /// Replace a record with the same id
    fn update(&self, record: MailRecord) -> Result<()>;
}

/// In-memory mail store
///
/// Records are kept in insertion order.
#[derive(Default)]
pub struct MemoryMailStore {
    records: RwLock<Vec<MailRecord>>,
}

impl MemoryMailStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl MailStore for MemoryMailStore {
    fn insert(&self, envelope: Envelope) -> Result<Uuid> {
        // Untrusted input: reject structurally broken envelopes at the door
        if !is_structurally_valid(&envelope) {
            return Err(Error::MalformedEnvelope(format!(
                "refusing to store envelope for key {}",
                envelope.key_id()
            )));
        }
        let record = MailRecord::new(envelope);
        let id = record.id();
        self.records.write().push(record);
        tracing::debug!("Stored mail {}", id);
        Ok(id)
    }

    fn list(&self) -> Result<Vec<MailRecord>> {
        Ok(self.records.read().clone())
    }

    fn get(&self, id: &Uuid) -> Result<Option<MailRecord>> {
        Ok(self.records.read().iter().find(|r| &r.id() == id).cloned())
    }

    fn update(&self, record: MailRecord) -> Result<()> {
        let mut records = self.records.write();
        let slot = records
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or_else(|| Error::StorageNotFound(format!("mail {}", record.id())))?;
        *slot = record;
        Ok(())
    }
}

/// Outcome of [`open_all`]
#[derive(Debug, Default)]
pub struct OpenReport {
    /// Records opened in this pass
    pub opened: Vec<Uuid>,
    /// Records that could not be opened, with the reason
    pub failed: Vec<(Uuid, Error)>,
}

/// Decrypt every sealed record in the store
///
/// Records are decrypted as one batch; a failure marks that record
/// `Unreadable` and does not stop the others. Records already opened or
/// marked unreadable are skipped.
///
/// Each record is written back on its own. If the store rejects that write
/// the record keeps its previous state, lands in `failed` with the store
/// error, and the pass continues with the next record.
pub fn open_all(store: &dyn MailStore, recipient: &KeyPair) -> Result<OpenReport> {
    let sealed: Vec<MailRecord> = store
        .list()?
        .into_iter()
        .filter(|r| r.state() == MailState::Sealed)
        .collect();

    let envelopes: Vec<Envelope> = sealed.iter().map(|r| r.envelope().clone()).collect();
    let results = decrypt_batch(recipient, &envelopes);

    let mut report = OpenReport::default();
    for (mut record, result) in sealed.into_iter().zip(results) {
        let id = record.id();
        let outcome = result.and_then(|plaintext| record.apply_payload(&plaintext));
        if outcome.is_err() {
            record.mark_unreadable();
        }

        match (outcome, store.update(record)) {
            (Ok(()), Ok(())) => report.opened.push(id),
            (Ok(()), Err(store_err)) => report.failed.push((id, store_err)),
            (Err(e), stored) => {
                if let Err(store_err) = stored {
                    tracing::warn!("Could not mark mail {} unreadable: {}", id, store_err);
                }
                report.failed.push((id, e));
            }
        }
    }

    tracing::info!(
        "Opened {} messages, {} unreadable",
        report.opened.len(),
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{check_envelope, encrypt};
    use crate::mail::{seal_mail, MailContent};

    fn content(subject: &str) -> MailContent {
        MailContent {
            from: "bob@example.org".into(),
            subject: subject.into(),
            body: String::new(),
        }
    }

    #[test]
    fn test_insert_list_get() {
        let kp = KeyPair::generate();
        let store = MemoryMailStore::new();
        assert!(store.is_empty());

        let first = store.insert(seal_mail(&kp.public_bytes(), &content("1")).unwrap()).unwrap();
        let second = store.insert(seal_mail(&kp.public_bytes(), &content("2")).unwrap()).unwrap();

        let listed: Vec<Uuid> = store.list().unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(listed, vec![first, second]);
        assert_eq!(store.get(&second).unwrap().unwrap().id(), second);
        assert!(store.get(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_insert_rejects_malformed() {
        let kp = KeyPair::generate();
        let envelope = encrypt(&kp.public_bytes(), b"x").unwrap();
        let mut decoded = check_envelope(&envelope).unwrap();
        decoded.ciphertext.clear();

        let store = MemoryMailStore::new();
        assert!(matches!(
            store.insert(decoded.encode()),
            Err(Error::MalformedEnvelope(_))
        ));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_update_missing_record() {
        let kp = KeyPair::generate();
        let record = MailRecord::new(encrypt(&kp.public_bytes(), b"x").unwrap());
        let store = MemoryMailStore::new();

        assert!(matches!(store.update(record), Err(Error::StorageNotFound(_))));
    }

    /// Store whose writes fail for one record
    struct RejectingStore {
        inner: MemoryMailStore,
        reject: RwLock<Option<Uuid>>,
    }

    impl MailStore for RejectingStore {
        fn insert(&self, envelope: Envelope) -> Result<Uuid> {
            self.inner.insert(envelope)
        }

        fn list(&self) -> Result<Vec<MailRecord>> {
            self.inner.list()
        }

        fn get(&self, id: &Uuid) -> Result<Option<MailRecord>> {
            self.inner.get(id)
        }

        fn update(&self, record: MailRecord) -> Result<()> {
            if *self.reject.read() == Some(record.id()) {
                return Err(Error::StorageWriteError("disk full".into()));
            }
            self.inner.update(record)
        }
    }

    #[test]
    fn test_open_all_reports_store_write_failures() {
        let kp = KeyPair::generate();
        let store = RejectingStore {
            inner: MemoryMailStore::new(),
            reject: RwLock::new(None),
        };

        let first = store.insert(seal_mail(&kp.public_bytes(), &content("1")).unwrap()).unwrap();
        let second = store.insert(seal_mail(&kp.public_bytes(), &content("2")).unwrap()).unwrap();
        let third = store.insert(seal_mail(&kp.public_bytes(), &content("3")).unwrap()).unwrap();
        *store.reject.write() = Some(second);

        let report = open_all(&store, &kp).unwrap();
        assert_eq!(report.opened, vec![first, third]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0], (id, Error::StorageWriteError(_)) if id == second));

        // The rejected record is untouched and opens on the next pass
        assert_eq!(store.get(&second).unwrap().unwrap().state(), MailState::Sealed);
        *store.reject.write() = None;
        let again = open_all(&store, &kp).unwrap();
        assert_eq!(again.opened, vec![second]);
    }

    #[test]
    fn test_open_all_isolates_failures() {
        let kp = KeyPair::generate();
        let store = MemoryMailStore::new();

        let good = store.insert(seal_mail(&kp.public_bytes(), &content("good")).unwrap()).unwrap();
        let wrong_key = store
            .insert(seal_mail(&KeyPair::generate().public_bytes(), &content("not ours")).unwrap())
            .unwrap();
        let not_json = store.insert(encrypt(&kp.public_bytes(), b"plain text").unwrap()).unwrap();

        let report = open_all(&store, &kp).unwrap();
        assert_eq!(report.opened, vec![good]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0], (wrong_key, Error::AuthenticationFailure));
        assert!(matches!(report.failed[1], (id, Error::InvalidPayload(_)) if id == not_json));

        let opened = store.get(&good).unwrap().unwrap();
        assert_eq!(opened.state(), MailState::Opened);
        assert_eq!(opened.content().unwrap().subject, "good");
        assert_eq!(store.get(&wrong_key).unwrap().unwrap().state(), MailState::Unreadable);

        // Second pass has nothing left to do
        let again = open_all(&store, &kp).unwrap();
        assert!(again.opened.is_empty() && again.failed.is_empty());
    }
}
