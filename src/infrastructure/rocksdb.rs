use crate::domain::account::{Account, AccountId, Balance, NewAccount};
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{AccountStore, ChangeSet, Ledger, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing account states.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family mapping tax ids to account ids.
pub const CF_TAX_IDS: &str = "tax_ids";
/// Column Family for storing payment records.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping idempotency keys to payment ids.
pub const CF_IDEMPOTENCY: &str = "idempotency";
/// Column Family for counters.
pub const CF_META: &str = "meta";

const ACCOUNT_SEQ: &[u8] = b"account_seq";

/// A persistent ledger implementation using RocksDB.
///
/// Every commit is validated and written as one `WriteBatch` while holding
/// `commit_lock`, so version checks and writes cannot interleave between
/// handles of the same store.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

fn internal(message: String) -> PaymentError {
    PaymentError::InternalError(Box::new(std::io::Error::other(message)))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| internal(format!("Serialization error: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| internal(format!("Deserialization error: {}", e)))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that every required column family exists.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_TAX_IDS, CF_PAYMENTS, CF_IDEMPOTENCY, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("Column family {} not found", name)))
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn payment_id(bytes: &[u8]) -> Result<PaymentId> {
        PaymentId::from_slice(bytes).map_err(|e| internal(format!("Corrupt payment id: {}", e)))
    }

    fn account_id(bytes: &[u8]) -> Result<AccountId> {
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| internal("Corrupt account id".to_string()))?;
        Ok(AccountId::from_be_bytes(bytes))
    }

    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        for account in &changes.accounts {
            let stored: Account = self
                .read(CF_ACCOUNTS, &account.id.to_be_bytes())?
                .ok_or(PaymentError::AccountNotFound(account.id))?;
            if stored.version != account.version {
                return Err(PaymentError::WriteConflict);
            }
        }

        for payment in &changes.payments {
            let stored: Option<Payment> = self.read(CF_PAYMENTS, payment.id.as_bytes())?;
            match stored {
                Some(stored) if stored.version != payment.version => {
                    return Err(PaymentError::WriteConflict);
                }
                None if payment.version != 0 => {
                    return Err(PaymentError::RecordNotFound(payment.id));
                }
                _ => {}
            }
            if let Some(key) = &payment.idempotency_key
                && let Some(owner) = self.db.get_cf(self.cf(CF_IDEMPOTENCY)?, key.as_bytes())?
                && Self::payment_id(&owner)? != payment.id
            {
                return Err(PaymentError::WriteConflict);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn create(&self, account: NewAccount) -> Result<Account> {
        let _guard = self.commit_lock.lock().await;
        let tax_ids = self.cf(CF_TAX_IDS)?;
        if self.db.get_cf(tax_ids, account.tax_id.as_bytes())?.is_some() {
            return Err(PaymentError::DuplicateAccount(account.tax_id));
        }

        let meta = self.cf(CF_META)?;
        let next_id = match self.db.get_cf(meta, ACCOUNT_SEQ)? {
            Some(bytes) => Self::account_id(&bytes)? + 1,
            None => 1,
        };

        let mut created = Account::new(next_id, account.tax_id, account.name);
        created.balance = Balance::new(account.balance);

        let mut batch = WriteBatch::default();
        batch.put_cf(meta, ACCOUNT_SEQ, next_id.to_be_bytes());
        batch.put_cf(tax_ids, created.tax_id.as_bytes(), next_id.to_be_bytes());
        batch.put_cf(self.cf(CF_ACCOUNTS)?, next_id.to_be_bytes(), encode(&created)?);
        self.db.write(&batch)?;

        Ok(created)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        self.read(CF_ACCOUNTS, &id.to_be_bytes())
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Account>> {
        match self.db.get_cf(self.cf(CF_TAX_IDS)?, tax_id.as_bytes())? {
            Some(bytes) => self.read(CF_ACCOUNTS, &bytes),
            None => Ok(None),
        }
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_ACCOUNTS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(decode(&value)?);
        }
        Ok(accounts)
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, id.as_bytes())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>> {
        match self.db.get_cf(self.cf(CF_IDEMPOTENCY)?, key.as_bytes())? {
            Some(bytes) => self.read(CF_PAYMENTS, &bytes),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Ledger for RocksDBStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        self.validate(&changes)?;

        let mut batch = WriteBatch::default();
        for mut account in changes.accounts {
            account.version += 1;
            batch.put_cf(self.cf(CF_ACCOUNTS)?, account.id.to_be_bytes(), encode(&account)?);
        }
        for mut payment in changes.payments {
            payment.version += 1;
            if let Some(key) = &payment.idempotency_key {
                batch.put_cf(self.cf(CF_IDEMPOTENCY)?, key.as_bytes(), payment.id.as_bytes());
            }
            batch.put_cf(self.cf(CF_PAYMENTS)?, payment.id.as_bytes(), encode(&payment)?);
        }
        self.db.write(&batch)?;

        Ok(())
    }
}
