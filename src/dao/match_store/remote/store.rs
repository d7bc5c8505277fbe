use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    dao::{
        match_store::{MatchStore, RemoteBackend},
        models::{MatchEntity, MatchId, MatchPatch, NewMatchEntity},
        storage::{StorageError, StorageResult},
    },
    state::identity::UserId,
};

use super::{
    config::RemoteConfig,
    error::{RemoteDaoError, RemoteResult},
    models::{RemoteMatchInsert, eq},
};

const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_MINIMAL: &str = "return=minimal";

/// Connection to a PostgREST-compatible database exposing the match table.
#[derive(Clone)]
pub struct RemoteMatchBackend {
    client: Client,
    endpoint: Arc<str>,
    api_key: Arc<str>,
}

impl RemoteMatchBackend {
    /// Build the HTTP client for the configured table.
    pub fn connect(config: RemoteConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RemoteDaoError::ClientBuilder { source })?;

        let endpoint = format!(
            "{}/rest/v1/{}",
            config.base_url.trim_end_matches('/'),
            config.table
        );

        Ok(Self {
            client,
            endpoint: Arc::from(endpoint),
            api_key: Arc::from(config.api_key),
        })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.endpoint.as_ref())
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.api_key.as_ref())
    }

    async fn send(&self, builder: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| RemoteDaoError::RequestSend {
                path: self.endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(RemoteDaoError::RequestStatus {
                path: self.endpoint.to_string(),
                status,
            })
        }
    }

    async fn decode<T>(&self, response: reqwest::Response) -> RemoteResult<T>
    where
        T: DeserializeOwned,
    {
        response
            .json::<T>()
            .await
            .map_err(|source| RemoteDaoError::DecodeResponse {
                path: self.endpoint.to_string(),
                source,
            })
    }
}

impl RemoteBackend for RemoteMatchBackend {
    fn scoped(&self, user: &UserId) -> Arc<dyn MatchStore> {
        Arc::new(RemoteMatchStore {
            backend: self.clone(),
            user: user.clone(),
        })
    }
}

/// Remote match rows belonging to a single user.
#[derive(Clone)]
pub struct RemoteMatchStore {
    backend: RemoteMatchBackend,
    user: UserId,
}

impl RemoteMatchStore {
    fn owner_filter(&self) -> (&'static str, String) {
        ("user_id", eq(self.user.as_str()))
    }

    async fn insert(&self, new: Vec<NewMatchEntity>) -> RemoteResult<Vec<MatchEntity>> {
        let rows = new
            .iter()
            .map(|record| RemoteMatchInsert {
                record,
                user_id: self.user.as_str(),
            })
            .collect::<Vec<_>>();

        let builder = self
            .backend
            .request(Method::POST)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&rows);
        let response = self.backend.send(builder).await?;
        let created: Vec<MatchEntity> = self.backend.decode(response).await?;

        if created.len() != rows.len() {
            return Err(RemoteDaoError::ShortInsert {
                path: self.backend.endpoint.to_string(),
                sent: rows.len(),
                returned: created.len(),
            });
        }

        Ok(created)
    }

    async fn list(&self, active_only: bool) -> RemoteResult<Vec<MatchEntity>> {
        let mut query = vec![
            ("select", "*".to_owned()),
            self.owner_filter(),
            ("order", "created_at.desc".to_owned()),
        ];
        if active_only {
            query.push(("is_active", eq(true)));
        }

        let builder = self.backend.request(Method::GET).query(&query);
        let response = self.backend.send(builder).await?;
        self.backend.decode(response).await
    }

    async fn update(&self, id: MatchId, patch: MatchPatch) -> StorageResult<()> {
        let query = [("id", eq(&id)), self.owner_filter()];
        let builder = self
            .backend
            .request(Method::PATCH)
            .query(&query)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&patch);

        let response = self.backend.send(builder).await?;
        let updated: Vec<MatchEntity> = self.backend.decode(response).await?;
        if updated.is_empty() {
            return Err(StorageError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: MatchId) -> RemoteResult<()> {
        let query = [("id", eq(&id)), self.owner_filter()];
        let builder = self
            .backend
            .request(Method::DELETE)
            .query(&query)
            .header("Prefer", PREFER_MINIMAL);
        self.backend.send(builder).await?;
        Ok(())
    }

    async fn ping(&self) -> RemoteResult<()> {
        let query = [("select", "id".to_owned()), ("limit", "1".to_owned())];
        let builder = self.backend.request(Method::GET).query(&query);
        match self.backend.send(builder).await {
            Ok(_) => Ok(()),
            // An empty or restricted table still proves the database is reachable.
            Err(RemoteDaoError::RequestStatus { status, .. })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl MatchStore for RemoteMatchStore {
    fn insert_match(&self, new: NewMatchEntity) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut created = store.insert(vec![new]).await?;
            created.pop().ok_or_else(|| {
                StorageError::from(RemoteDaoError::ShortInsert {
                    path: store.backend.endpoint.to_string(),
                    sent: 1,
                    returned: 0,
                })
            })
        })
    }

    fn insert_matches(
        &self,
        new: Vec<NewMatchEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            if new.is_empty() {
                return Ok(Vec::new());
            }
            store.insert(new).await.map_err(Into::into)
        })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list(false).await.map_err(Into::into) })
    }

    fn list_active_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list(true).await.map_err(Into::into) })
    }

    fn update_match(&self, id: MatchId, patch: MatchPatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update(id, patch).await })
    }

    fn delete_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
