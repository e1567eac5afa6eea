// src/services/redis_service.rs
use crate::errors::StitchyError;
use crate::project::Project;
use log::info;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use uuid::Uuid;

const PROJECT_INDEX_KEY: &str = "projects";

fn project_key(id: &Uuid) -> String {
    format!("project:{}", id)
}

/// Project records stored as JSON, one key per project plus an id index.
///
/// The connection is opened on first use; [`RedisService::ensure_initialized`]
/// may be called any number of times.
pub struct RedisService {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisService {
    pub fn new(redis_url: &str) -> Result<Self, StitchyError> {
        let client = Client::open(redis_url).map_err(|e| StitchyError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    pub async fn ensure_initialized(&self) -> Result<ConnectionManager, StitchyError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let mut manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| StitchyError::Redis(e.to_string()))?;

                redis::cmd("PING")
                    .query_async::<_, String>(&mut manager)
                    .await
                    .map_err(|e| StitchyError::Redis(e.to_string()))?;

                info!("Connected to Redis");
                Ok::<_, StitchyError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }

    pub async fn store_project(&self, project: &Project) -> Result<(), StitchyError> {
        let mut conn = self.ensure_initialized().await?;

        let value = serde_json::to_string(project)
            .map_err(|e| StitchyError::Serialization(e.to_string()))?;

        conn.set::<_, _, ()>(project_key(&project.id), value)
            .await
            .map_err(|e| StitchyError::Redis(e.to_string()))?;

        conn.sadd::<_, _, ()>(PROJECT_INDEX_KEY, project.id.to_string())
            .await
            .map_err(|e| StitchyError::Redis(e.to_string()))?;

        Ok(())
    }

    pub async fn get_project(&self, id: &Uuid) -> Result<Project, StitchyError> {
        let mut conn = self.ensure_initialized().await?;

        let value: Option<String> = conn
            .get(project_key(id))
            .await
            .map_err(|e| StitchyError::Redis(e.to_string()))?;

        let value = value.ok_or_else(|| StitchyError::NotFound(format!("project {}", id)))?;
        serde_json::from_str(&value).map_err(|e| StitchyError::Serialization(e.to_string()))
    }

    /// All stored projects, newest first.
    pub async fn list_projects(&self) -> Result<Vec<Project>, StitchyError> {
        let mut conn = self.ensure_initialized().await?;

        let ids: Vec<String> = conn
            .smembers(PROJECT_INDEX_KEY)
            .await
            .map_err(|e| StitchyError::Redis(e.to_string()))?;

        let mut projects = Vec::with_capacity(ids.len());
        for id in ids {
            let Ok(id) = Uuid::parse_str(&id) else {
                continue;
            };
            match self.get_project(&id).await {
                Ok(project) => projects.push(project),
                // index entry outlived its record
                Err(StitchyError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    pub async fn delete_project(&self, id: &Uuid) -> Result<(), StitchyError> {
        let mut conn = self.ensure_initialized().await?;

        let removed: u32 = conn
            .del(project_key(id))
            .await
            .map_err(|e| StitchyError::Redis(e.to_string()))?;

        conn.srem::<_, _, ()>(PROJECT_INDEX_KEY, id.to_string())
            .await
            .map_err(|e| StitchyError::Redis(e.to_string()))?;

        if removed == 0 {
            return Err(StitchyError::NotFound(format!("project {}", id)));
        }
        Ok(())
    }

    pub async fn set_row_completed(
        &self,
        id: &Uuid,
        row_id: &str,
        completed: bool,
    ) -> Result<Project, StitchyError> {
        let mut project = self.get_project(id).await?;
        project.set_row_completed(row_id, completed)?;
        self.store_project(&project).await?;
        Ok(project)
    }
}
