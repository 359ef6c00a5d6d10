//! MongoDB-backed frame store.
//!
//! Documents have the shape `{ _id, timestamp: Date, image: <base64> }`
//! in a single collection, sorted on `timestamp` for every read.

use super::record::{FrameRecord, TimeRange};
use super::store::{FrameStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document},
    options::{ClientOptions, FindOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use serde::{Deserialize, Serialize};

/// Database used when neither the config nor the URI names one.
const FALLBACK_DATABASE: &str = "camera";

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FrameDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    timestamp: DateTime<Utc>,
    image: String,
}

impl TryFrom<FrameDocument> for FrameRecord {
    type Error = StoreError;

    fn try_from(document: FrameDocument) -> Result<Self, Self::Error> {
        FrameRecord::from_base64(document.timestamp, &document.image)
            .map_err(|e| StoreError::Corrupt(format!("image payload: {e}")))
    }
}

fn range_filter(range: Option<&TimeRange>) -> Option<Document> {
    range.map(|range| {
        doc! {
            "timestamp": {
                "$gte": mongodb::bson::DateTime::from_chrono(range.start),
                "$lte": mongodb::bson::DateTime::from_chrono(range.end),
            }
        }
    })
}

/// Frame store backed by a MongoDB collection.
pub struct MongoFrameStore {
    client: Client,
    frames: Collection<FrameDocument>,
}

impl MongoFrameStore {
    /// Connects to `uri` and opens the frame collection.
    ///
    /// The database is `database` if given, else the URI's default
    /// database, else `camera`. An ascending `timestamp` index is created
    /// if missing.
    pub async fn connect(
        uri: &str,
        database: Option<&str>,
        collection: &str,
    ) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        let client = Client::with_options(options)?;

        let db = match database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(FALLBACK_DATABASE)),
        };
        let frames = db.collection::<FrameDocument>(collection);

        let store = Self { client, frames };
        store.ping().await?;
        store.ensure_index().await?;

        tracing::info!(
            database = %store.frames.namespace().db,
            collection = %store.frames.name(),
            "Connected to MongoDB frame store"
        );
        Ok(store)
    }

    async fn ensure_index(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "timestamp": 1 })
            .options(IndexOptions::builder().name("timestamp_asc".to_string()).build())
            .build();
        self.frames.create_index(index, None).await?;
        Ok(())
    }
}

#[async_trait]
impl FrameStore for MongoFrameStore {
    async fn insert(&self, record: &FrameRecord) -> Result<(), StoreError> {
        let document = FrameDocument {
            id: None,
            timestamp: record.timestamp(),
            image: record.image_base64(),
        };
        self.frames.insert_one(document, None).await?;
        Ok(())
    }

    async fn count(&self, range: Option<&TimeRange>) -> Result<u64, StoreError> {
        Ok(self.frames.count_documents(range_filter(range), None).await?)
    }

    async fn delete_oldest(&self, n: u64) -> Result<u64, StoreError> {
        if n == 0 {
            return Ok(0);
        }

        let options = FindOptions::builder()
            .sort(doc! { "timestamp": 1 })
            .limit(n as i64)
            .projection(doc! { "_id": 1 })
            .build();
        let ids: Vec<Bson> = self
            .frames
            .clone_with_type::<Document>()
            .find(None, options)
            .await?
            .try_collect::<Vec<Document>>()
            .await?
            .into_iter()
            .filter_map(|d| d.get_object_id("_id").ok().map(Bson::ObjectId))
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        let result = self
            .frames
            .delete_many(doc! { "_id": { "$in": ids } }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn find(
        &self,
        range: Option<&TimeRange>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<FrameRecord>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": 1 })
            .skip(offset)
            .limit(limit as i64)
            .build();
        let documents: Vec<FrameDocument> = self
            .frames
            .find(range_filter(range), options)
            .await?
            .try_collect()
            .await?;

        documents.into_iter().map(FrameRecord::try_from).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }
}
