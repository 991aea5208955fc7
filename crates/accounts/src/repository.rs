use async_trait::async_trait;

use tablefront_core::{Email, Repository, RepositoryResult};

use crate::user::User;

/// User persistence port. Emails are unique across accounts.
#[async_trait]
pub trait UserRepository: Repository<User> {
    async fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>>;

    async fn exists_by_email(&self, email: &Email) -> RepositoryResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }
}
