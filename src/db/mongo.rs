use async_trait::async_trait;
use log::{info, warn};
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::error::{
    Error as MongoError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR,
    UNKNOWN_TRANSACTION_COMMIT_RESULT,
};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReplaceOptions, ReturnDocument};
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use rocket::futures::TryStreamExt;

use super::store::{
    Acceptance, AcceptanceCommit, BidQuery, ClosureCommit, ContractQuery, ReviewCommit, Store,
    StoreError, StoreResult,
};
use crate::models::{
    Advertisement, AdvertisementStatus, Bid, BidStatus, Contract, ContractStatus,
    InfluencerRating, Review,
};
use crate::utils::PageRequest;

const MAX_TXN_ATTEMPTS: u32 = 3;
const MAX_COMMIT_ATTEMPTS: u32 = 3;
const DUPLICATE_KEY: i32 = 11000;

const LIVE_BID_STATUSES: [&str; 2] = ["PENDING", "SHORTLISTED"];

impl From<MongoError> for StoreError {
    fn from(err: MongoError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Failure inside a transaction body: either a business precondition the
/// caller must see, or a driver error that may be worth a retry.
enum TxnError {
    Rejected(StoreError),
    Driver(MongoError),
}

impl From<MongoError> for TxnError {
    fn from(err: MongoError) -> Self {
        TxnError::Driver(err)
    }
}

impl From<TxnError> for StoreError {
    fn from(err: TxnError) -> Self {
        match err {
            TxnError::Rejected(e) => e,
            TxnError::Driver(e) => e.into(),
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn is_transient(err: &MongoError) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
}

/// Next step after a failed commit, read from the server's error labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitRetry {
    /// Outcome unknown: send the same commit again.
    Commit,
    /// Transaction aborted: run the body again on a new transaction.
    Transaction,
    Fail,
}

fn commit_retry(has_label: impl Fn(&str) -> bool) -> CommitRetry {
    if has_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) {
        CommitRetry::Commit
    } else if has_label(TRANSIENT_TRANSACTION_ERROR) {
        CommitRetry::Transaction
    } else {
        CommitRetry::Fail
    }
}

fn conflict(message: impl Into<String>) -> TxnError {
    TxnError::Rejected(StoreError::Conflict(message.into()))
}

fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

fn newest_first(page: &PageRequest) -> FindOptions {
    FindOptions::builder()
        .skip(page.skip())
        .limit(page.limit)
        .sort(doc! { "created_at": -1, "_id": -1 })
        .build()
}

fn bid_filter(query: &BidQuery) -> Document {
    let mut filter = doc! {};
    if let Some(id) = query.advertisement_id {
        filter.insert("advertisement_id", id);
    }
    if let Some(id) = query.influencer_id {
        filter.insert("influencer_id", id);
    }
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }
    filter
}

fn contract_filter(query: &ContractQuery) -> Document {
    let mut filter = doc! {};
    if let Some(id) = query.client_id {
        filter.insert("client_id", id);
    }
    if let Some(id) = query.influencer_id {
        filter.insert("influencer_id", id);
    }
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }
    filter
}

async fn abort(session: &mut ClientSession) {
    if let Err(e) = session.abort_transaction().await {
        warn!("failed to abort transaction: {}", e);
    }
}

/// Runs `$body` inside a transaction on a fresh session. A transient failure
/// (write conflicts between concurrent transactions surface this way) reruns
/// the body; a commit with an unknown outcome is only re-sent.
macro_rules! with_transaction {
    ($store:expr, $session:ident => $body:expr) => {{
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut $session = $store.client.start_session(None).await?;
            $session.start_transaction(None).await?;

            let outcome = $body.await;
            match outcome {
                Ok(value) => {
                    let mut commits = 0;
                    let committed = loop {
                        commits += 1;
                        match $session.commit_transaction().await {
                            Ok(()) => break Ok(()),
                            Err(e) => match commit_retry(|label| e.contains_label(label)) {
                                CommitRetry::Commit if commits < MAX_COMMIT_ATTEMPTS => {
                                    warn!("commit outcome unknown, retrying commit: {}", e);
                                    continue;
                                }
                                retry => break Err((retry, e)),
                            },
                        }
                    };
                    match committed {
                        Ok(()) => break Ok(value),
                        Err((CommitRetry::Transaction, _)) if attempt < MAX_TXN_ATTEMPTS => continue,
                        Err((_, e)) => break Err(StoreError::from(e)),
                    }
                }
                Err(TxnError::Driver(e)) if is_transient(&e) && attempt < MAX_TXN_ATTEMPTS => {
                    abort(&mut $session).await;
                    continue;
                }
                Err(e) => {
                    abort(&mut $session).await;
                    break Err(StoreError::from(e));
                }
            }
        }
    }};
}

/// MongoDB-backed store. Multi-document commits need a replica set.
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;

        // Test connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;

        let store = MongoStore {
            db: client.database(database),
            client,
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    fn advertisements(&self) -> Collection<Advertisement> {
        self.db.collection("advertisements")
    }

    fn bids(&self) -> Collection<Bid> {
        self.db.collection("bids")
    }

    fn contracts(&self) -> Collection<Contract> {
        self.db.collection("contracts")
    }

    fn reviews(&self) -> Collection<Review> {
        self.db.collection("reviews")
    }

    fn ratings(&self) -> Collection<InfluencerRating> {
        self.db.collection("influencer_ratings")
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.bids()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "advertisement_id": 1, "influencer_id": 1 })
                    .options(unique.clone())
                    .build(),
                None,
            )
            .await?;
        self.contracts()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "bid_id": 1 })
                    .options(unique.clone())
                    .build(),
                None,
            )
            .await?;
        self.reviews()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "client_id": 1, "influencer_id": 1, "advertisement_id": 1 })
                    .options(unique.clone())
                    .build(),
                None,
            )
            .await?;
        self.ratings()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "influencer_id": 1 })
                    .options(unique)
                    .build(),
                None,
            )
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }

    /// Flips every live bid on the advertisement (except `keep`) to REJECTED.
    async fn reject_live_bids(
        &self,
        advertisement_id: ObjectId,
        keep: Option<ObjectId>,
        at: DateTime,
        session: &mut ClientSession,
    ) -> Result<Vec<Bid>, TxnError> {
        let mut filter = doc! {
            "advertisement_id": advertisement_id,
            "status": { "$in": LIVE_BID_STATUSES.to_vec() },
        };
        if let Some(id) = keep {
            filter.insert("_id", doc! { "$ne": id });
        }

        let mut cursor = self.bids().find_with_session(filter.clone(), None, session).await?;
        let mut rejected = Vec::new();
        while let Some(bid) = cursor.next(session).await {
            let mut bid = bid?;
            bid.status = BidStatus::Rejected;
            bid.updated_at = at;
            rejected.push(bid);
        }

        self.bids()
            .update_many_with_session(
                filter,
                doc! { "$set": { "status": BidStatus::Rejected.as_str(), "updated_at": at } },
                None,
                session,
            )
            .await?;

        Ok(rejected)
    }

    async fn apply_acceptance(
        &self,
        acceptance: &Acceptance,
        session: &mut ClientSession,
    ) -> Result<AcceptanceCommit, TxnError> {
        let at = acceptance.at;

        let advertisement = self
            .advertisements()
            .find_one_and_update_with_session(
                doc! { "_id": acceptance.advertisement_id, "status": AdvertisementStatus::Open.as_str() },
                doc! { "$set": { "status": AdvertisementStatus::Closed.as_str(), "updated_at": at } },
                return_updated(),
                session,
            )
            .await?
            .ok_or_else(|| conflict("advertisement is not open"))?;

        let bid = self
            .bids()
            .find_one_and_update_with_session(
                doc! {
                    "_id": acceptance.bid_id,
                    "advertisement_id": acceptance.advertisement_id,
                    "status": { "$in": LIVE_BID_STATUSES.to_vec() },
                },
                doc! { "$set": { "status": BidStatus::Accepted.as_str(), "updated_at": at } },
                return_updated(),
                session,
            )
            .await?
            .ok_or_else(|| conflict("bid is no longer pending or shortlisted"))?;

        let rejected_bids = self
            .reject_live_bids(acceptance.advertisement_id, Some(acceptance.bid_id), at, session)
            .await?;

        self.contracts()
            .insert_one_with_session(&acceptance.contract, None, session)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    TxnError::Rejected(StoreError::Duplicate("contract"))
                } else {
                    TxnError::Driver(e)
                }
            })?;

        Ok(AcceptanceCommit {
            bid,
            contract: acceptance.contract.clone(),
            advertisement,
            rejected_bids,
        })
    }

    async fn apply_closure(
        &self,
        id: &ObjectId,
        at: DateTime,
        session: &mut ClientSession,
    ) -> Result<ClosureCommit, TxnError> {
        let advertisement = self
            .advertisements()
            .find_one_and_update_with_session(
                doc! { "_id": *id, "status": AdvertisementStatus::Open.as_str() },
                doc! { "$set": { "status": AdvertisementStatus::Closed.as_str(), "updated_at": at } },
                return_updated(),
                session,
            )
            .await?
            .ok_or_else(|| conflict("advertisement is not open"))?;

        let rejected_bids = self.reject_live_bids(*id, None, at, session).await?;

        Ok(ClosureCommit { advertisement, rejected_bids })
    }

    async fn apply_review(
        &self,
        review: &Review,
        session: &mut ClientSession,
    ) -> Result<ReviewCommit, TxnError> {
        self.reviews()
            .insert_one_with_session(review, None, session)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    TxnError::Rejected(StoreError::Duplicate("review"))
                } else {
                    TxnError::Driver(e)
                }
            })?;

        let filter = doc! { "influencer_id": review.influencer_id };
        let rating = self
            .ratings()
            .find_one_with_session(filter.clone(), None, session)
            .await?
            .unwrap_or_else(|| InfluencerRating::empty(review.influencer_id))
            .absorb(review.rating, review.created_at);

        self.ratings()
            .replace_one_with_session(
                filter,
                &rating,
                ReplaceOptions::builder().upsert(true).build(),
                session,
            )
            .await?;

        Ok(ReviewCommit {
            review: review.clone(),
            rating,
        })
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_advertisement(&self, ad: &Advertisement) -> StoreResult<()> {
        self.advertisements().insert_one(ad, None).await?;
        Ok(())
    }

    async fn find_advertisement(&self, id: &ObjectId) -> StoreResult<Option<Advertisement>> {
        Ok(self.advertisements().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn update_advertisement_status(
        &self,
        id: &ObjectId,
        from: AdvertisementStatus,
        to: AdvertisementStatus,
        at: DateTime,
    ) -> StoreResult<Option<Advertisement>> {
        Ok(self
            .advertisements()
            .find_one_and_update(
                doc! { "_id": *id, "status": from.as_str() },
                doc! { "$set": { "status": to.as_str(), "updated_at": at } },
                return_updated(),
            )
            .await?)
    }

    async fn commit_closure(&self, id: &ObjectId, at: DateTime) -> StoreResult<ClosureCommit> {
        with_transaction!(self, session => self.apply_closure(id, at, &mut session))
    }

    async fn insert_bid(&self, bid: &Bid) -> StoreResult<()> {
        match self.bids().insert_one(bid, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate("bid")),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_bid(&self, id: &ObjectId) -> StoreResult<Option<Bid>> {
        Ok(self.bids().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn update_bid_status(
        &self,
        id: &ObjectId,
        from: &[BidStatus],
        to: BidStatus,
        at: DateTime,
    ) -> StoreResult<Option<Bid>> {
        let from: Vec<&str> = from.iter().map(BidStatus::as_str).collect();
        Ok(self
            .bids()
            .find_one_and_update(
                doc! { "_id": *id, "status": { "$in": from } },
                doc! { "$set": { "status": to.as_str(), "updated_at": at } },
                return_updated(),
            )
            .await?)
    }

    async fn list_bids(&self, query: &BidQuery, page: &PageRequest) -> StoreResult<(Vec<Bid>, u64)> {
        let filter = bid_filter(query);
        let bids: Vec<Bid> = self
            .bids()
            .find(filter.clone(), newest_first(page))
            .await?
            .try_collect()
            .await?;
        let total = self.bids().count_documents(filter, None).await?;
        Ok((bids, total))
    }

    async fn commit_acceptance(&self, acceptance: &Acceptance) -> StoreResult<AcceptanceCommit> {
        with_transaction!(self, session => self.apply_acceptance(acceptance, &mut session))
    }

    async fn find_contract(&self, id: &ObjectId) -> StoreResult<Option<Contract>> {
        Ok(self.contracts().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn find_contract_by_bid(&self, bid_id: &ObjectId) -> StoreResult<Option<Contract>> {
        Ok(self.contracts().find_one(doc! { "bid_id": *bid_id }, None).await?)
    }

    async fn update_contract_status(
        &self,
        id: &ObjectId,
        from: ContractStatus,
        to: ContractStatus,
        at: DateTime,
    ) -> StoreResult<Option<Contract>> {
        let mut set = doc! { "status": to.as_str(), "updated_at": at };
        if to == ContractStatus::Completed {
            set.insert("completed_at", at);
        }

        Ok(self
            .contracts()
            .find_one_and_update(
                doc! { "_id": *id, "status": from.as_str() },
                doc! { "$set": set },
                return_updated(),
            )
            .await?)
    }

    async fn list_contracts(&self, query: &ContractQuery, page: &PageRequest) -> StoreResult<(Vec<Contract>, u64)> {
        let filter = contract_filter(query);
        let contracts: Vec<Contract> = self
            .contracts()
            .find(filter.clone(), newest_first(page))
            .await?
            .try_collect()
            .await?;
        let total = self.contracts().count_documents(filter, None).await?;
        Ok((contracts, total))
    }

    async fn has_completed_contract(
        &self,
        client_id: &ObjectId,
        influencer_id: &ObjectId,
        advertisement_id: &ObjectId,
    ) -> StoreResult<bool> {
        let count = self
            .contracts()
            .count_documents(
                doc! {
                    "client_id": *client_id,
                    "influencer_id": *influencer_id,
                    "advertisement_id": *advertisement_id,
                    "status": ContractStatus::Completed.as_str(),
                },
                None,
            )
            .await?;
        Ok(count > 0)
    }

    async fn commit_review(&self, review: &Review) -> StoreResult<ReviewCommit> {
        with_transaction!(self, session => self.apply_review(review, &mut session))
    }

    async fn find_influencer_rating(&self, influencer_id: &ObjectId) -> StoreResult<Option<InfluencerRating>> {
        Ok(self
            .ratings()
            .find_one(doc! { "influencer_id": *influencer_id }, None)
            .await?)
    }

    async fn list_reviews(&self, influencer_id: &ObjectId, page: &PageRequest) -> StoreResult<(Vec<Review>, u64)> {
        let filter = doc! { "influencer_id": *influencer_id };
        let reviews: Vec<Review> = self
            .reviews()
            .find(filter.clone(), newest_first(page))
            .await?
            .try_collect()
            .await?;
        let total = self.reviews().count_documents(filter, None).await?;
        Ok((reviews, total))
    }
}
