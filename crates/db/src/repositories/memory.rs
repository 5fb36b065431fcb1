use std::collections::HashMap;

use tokio::sync::RwLock;

use deskhub_core::domain::request::{Request, RequestId};
use deskhub_core::domain::request_type::{RequestType, RequestTypeId};
use deskhub_core::domain::user::{User, UserId};

use super::{
    RepositoryError, RequestRepository, RequestTypeRepository, UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).cloned())
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.0.clone(), user);
        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|left, right| left.username.cmp(&right.username));
        all.truncate(limit as usize);
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryRequestTypeRepository {
    request_types: RwLock<HashMap<String, RequestType>>,
}

#[async_trait::async_trait]
impl RequestTypeRepository for InMemoryRequestTypeRepository {
    async fn find_by_id(
        &self,
        id: &RequestTypeId,
    ) -> Result<Option<RequestType>, RepositoryError> {
        let request_types = self.request_types.read().await;
        Ok(request_types.get(&id.0).cloned())
    }

    async fn save(&self, request_type: RequestType) -> Result<(), RepositoryError> {
        let mut request_types = self.request_types.write().await;
        request_types.insert(request_type.id.0.clone(), request_type);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RequestType>, RepositoryError> {
        let request_types = self.request_types.read().await;
        let mut all: Vec<RequestType> = request_types.values().cloned().collect();
        all.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, Request>>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn save(&self, request: Request) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut all: Vec<Request> = requests.values().cloned().collect();
        all.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn list_by_creator(&self, created_by: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut mine: Vec<Request> =
            requests.values().filter(|request| request.created_by == *created_by).cloned().collect();
        mine.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(mine)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use deskhub_core::domain::request::{Priority, Request, RequestId, RequestStatus};
    use deskhub_core::domain::request_type::{ApproverStep, RequestType, RequestTypeId};
    use deskhub_core::domain::user::{Department, User, UserId, UserRole, UserStatus};

    use crate::repositories::{
        InMemoryRequestRepository, InMemoryRequestTypeRepository, InMemoryUserRepository,
        RequestRepository, RequestTypeRepository, UserRepository,
    };

    #[tokio::test]
    async fn in_memory_user_repo_round_trip() {
        let repo = InMemoryUserRepository::default();
        let now = Utc::now();
        let user = User {
            id: UserId("u-1".to_string()),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            full_name: "Jordan Doe".to_string(),
            department: Some(Department::Finance),
            role: UserRole::Manager,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };

        repo.save(user.clone()).await.expect("save user");
        let found = repo.find_by_id(&user.id).await.expect("find user");

        assert_eq!(found, Some(user));
    }

    #[tokio::test]
    async fn in_memory_request_type_repo_round_trip() {
        let repo = InMemoryRequestTypeRepository::default();
        let now = Utc::now();
        let request_type = RequestType {
            id: RequestTypeId("rt-1".to_string()),
            name: "IT Equipment".to_string(),
            description: None,
            department: Department::It,
            created_by: UserId("u-admin".to_string()),
            created_at: now,
            updated_at: now,
            fields: Vec::new(),
            approver_config: vec![ApproverStep {
                approver_id: UserId("u-manager".to_string()),
                name: "Manager approval".to_string(),
                description: None,
            }],
        };

        repo.save(request_type.clone()).await.expect("save request type");
        let found = repo.find_by_id(&request_type.id).await.expect("find request type");

        assert_eq!(found, Some(request_type));
    }

    #[tokio::test]
    async fn in_memory_request_repo_filters_by_creator() {
        let repo = InMemoryRequestRepository::default();
        let now = Utc::now();
        for (id, creator) in [("req-1", "u-emp"), ("req-2", "u-other")] {
            repo.save(Request {
                id: RequestId(id.to_string()),
                request_type_id: RequestTypeId("rt-1".to_string()),
                title: "Sample".to_string(),
                description: None,
                status: RequestStatus::Draft,
                priority: Priority::Normal,
                created_by: UserId(creator.to_string()),
                created_at: now,
                updated_at: now,
                due_date: None,
                data: json!({}),
            })
            .await
            .expect("save request");
        }

        let mine = repo.list_by_creator(&UserId("u-emp".to_string())).await.expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id.0, "req-1");
    }
}
