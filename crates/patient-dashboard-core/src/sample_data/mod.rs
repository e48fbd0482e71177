//! Sample data generation.
//!
//! Fills an account with plausible patients drawn from a
//! [`DemographicSource`]. The hosted source is a random-data web API; the
//! HTTP client lives outside this crate. [`BuiltinSource`] serves the same
//! shapes from local lists so the generator also works offline.

mod request;
mod response;

pub use request::*;
pub use response::*;

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::models::{parse_address, PatientDocument, PatientRecord, PatientStatus};
use crate::store::{DocumentStore, StoreError};

/// Records created per run unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Sample data errors.
#[derive(Error, Debug)]
pub enum SampleDataError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Demographic source error: {0}")]
    Source(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SampleDataResult<T> = Result<T, SampleDataError>;

/// Provider of random names and addresses.
pub trait DemographicSource: Send + Sync {
    /// Values for `request`. May return fewer than asked for.
    fn fetch(&self, request: &DemographicRequest) -> SampleDataResult<Vec<String>>;
}

/// Builds and writes a batch of sample patients.
#[derive(Debug, Clone, Copy)]
pub struct SampleDataGenerator {
    batch_size: usize,
}

impl Default for SampleDataGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl SampleDataGenerator {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Build the documents without writing them.
    ///
    /// Statuses cycle through the pipeline in order. Names and addresses
    /// fill documents by position; a short answer from the source leaves
    /// the remaining documents blank, and an address that does not parse
    /// leaves its document without one.
    pub fn build_documents<R: Rng + ?Sized>(
        &self,
        source: &dyn DemographicSource,
        owner_id: &str,
        rng: &mut R,
    ) -> SampleDataResult<Vec<PatientDocument>> {
        let mut docs: Vec<PatientDocument> = (0..self.batch_size)
            .map(|i| {
                let mut doc = PatientDocument::new(owner_id);
                doc.status = PatientStatus::ALL[i % PatientStatus::ALL.len()];
                doc.date_of_birth = Some(random_birth_date(rng));
                doc
            })
            .collect();

        let first_names = source.fetch(&DemographicRequest::FirstNames {
            quantity: self.batch_size,
        })?;
        for (doc, name) in docs.iter_mut().zip(first_names) {
            doc.first_name = name;
        }

        let surnames = source.fetch(&DemographicRequest::Surnames {
            quantity: self.batch_size,
        })?;
        for (doc, name) in docs.iter_mut().zip(surnames) {
            doc.last_name = name;
        }

        let addresses = source.fetch(&DemographicRequest::Addresses {
            number: self.batch_size,
        })?;
        for (doc, raw) in docs.iter_mut().zip(addresses) {
            if let Some(address) = parse_address(&raw) {
                doc.addresses = vec![address];
            }
        }

        Ok(docs)
    }

    /// Build a batch for `owner_id` and write it in one transaction.
    pub fn populate<S>(
        &self,
        store: &S,
        source: &dyn DemographicSource,
        owner_id: &str,
    ) -> SampleDataResult<Vec<PatientRecord>>
    where
        S: DocumentStore + ?Sized,
    {
        let docs = self.build_documents(source, owner_id, &mut rand::thread_rng())?;

        match store.create_records_batch(docs) {
            Ok(records) => {
                tracing::info!(owner_id, count = records.len(), "sample data written");
                Ok(records)
            }
            Err(e) => {
                tracing::error!(owner_id, error = %e, "sample data batch failed");
                Err(e.into())
            }
        }
    }
}

/// A date between the Unix epoch and today, as midnight UTC.
fn random_birth_date<R: Rng + ?Sized>(rng: &mut R) -> chrono::DateTime<Utc> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let span = (Utc::now().date_naive() - epoch).num_days().max(1);
    let date = epoch + Duration::days(rng.gen_range(0..span));
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Linus", "Margaret", "Alan", "Barbara", "Dennis", "Frances", "Ken", "Radia",
    "Edsger", "Hedy", "Donald", "Katherine", "John", "Mary",
];

const SURNAMES: &[&str] = &[
    "Lovelace", "Hopper", "Torvalds", "Hamilton", "Turing", "Liskov", "Ritchie", "Allen",
    "Thompson", "Perlman", "Dijkstra", "Lamarr", "Knuth", "Johnson", "McCarthy", "Jackson",
];

const ADDRESSES: &[&str] = &[
    "1 Main St, Apt 2, 43004, Columbus, Ohio, United States",
    "77 Mass Ave, , 02139, Cambridge, Massachusetts, United States",
    "1600 Amphitheatre Pkwy, Bldg 40, 94043, Mountain View, California, United States",
    "500 Congress Ave, Suite 100, 73301, Austin, Texas, United States",
    "200 Larkin St, , 94102, San Francisco, California, United States",
    "12 Pike St, Unit 5, 98101, Seattle, Washington, United States",
    "9 Canal St, , 70112, New Orleans, Louisiana, United States",
    "44 Elm St, Floor 3, 06510, New Haven, Connecticut, United States",
];

/// Offline source backed by built-in lists.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinSource;

impl DemographicSource for BuiltinSource {
    fn fetch(&self, request: &DemographicRequest) -> SampleDataResult<Vec<String>> {
        let pool = match request {
            DemographicRequest::FirstNames { .. } => FIRST_NAMES,
            DemographicRequest::Surnames { .. } => SURNAMES,
            DemographicRequest::Addresses { .. } => ADDRESSES,
        };

        let mut rng = rand::thread_rng();
        Ok((0..request.count())
            .filter_map(|_| pool.choose(&mut rng))
            .map(|value| value.to_string())
            .collect())
    }
}
