use crate::api::{User, UserDetails, UserDetailsPatch, UserId};
use crate::error::{ShareItError, ShareItResult};

use super::{require_non_blank, ShareItService};

fn validate_email(email: &str) -> ShareItResult<()> {
    require_non_blank("email", email)?;
    if !email.contains('@') {
        return Err(ShareItError::Validation(format!(
            "{email} is not a valid email"
        )));
    }
    Ok(())
}

impl ShareItService {
    pub async fn add_user(&self, details: UserDetails) -> ShareItResult<User> {
        require_non_blank("name", &details.name)?;
        validate_email(&details.email)?;

        let user = self.repository.add_user(details).await?;
        tracing::info!("Added user {}", user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: UserId) -> ShareItResult<User> {
        Ok(self.repository.get_user(user_id).await?)
    }

    pub async fn list_users(&self) -> ShareItResult<Vec<User>> {
        Ok(self.repository.list_users().await?)
    }

    pub async fn update_user(
        &self,
        user_id: UserId,
        patch: UserDetailsPatch,
    ) -> ShareItResult<User> {
        if let Some(name) = &patch.name {
            require_non_blank("name", name)?;
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }

        let user = self.repository.update_user(user_id, patch).await?;
        tracing::info!("Updated user {}", user_id);
        Ok(user)
    }

    pub async fn delete_user(&self, user_id: UserId) -> ShareItResult<()> {
        self.repository.delete_user(user_id).await?;
        tracing::info!("Deleted user {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests_users {
    use crate::repository::RepositoryError;
    use crate::service::test_support::{service, user};

    use super::*;

    #[tokio::test]
    async fn test_user_validation_and_updates() {
        let (service, _clock) = service();

        let blank_name = service
            .add_user(UserDetails {
                name: "  ".to_string(),
                email: "blank@example.com".to_string(),
            })
            .await;
        assert!(matches!(blank_name, Err(ShareItError::Validation(..))));

        let bad_email = service
            .add_user(UserDetails {
                name: "bob".to_string(),
                email: "bob.example.com".to_string(),
            })
            .await;
        assert!(matches!(bad_email, Err(ShareItError::Validation(..))));

        let alice = user(&service, "alice").await;
        let bob = user(&service, "bob").await;
        assert_eq!(service.list_users().await.unwrap(), vec![alice.clone(), bob.clone()]);

        let taken = service
            .update_user(
                bob.id,
                UserDetailsPatch {
                    email: Some(alice.email.clone()),
                    ..UserDetailsPatch::default()
                },
            )
            .await;
        assert!(matches!(
            taken,
            Err(ShareItError::Repository(RepositoryError::DuplicateEmail(..)))
        ));

        let renamed = service
            .update_user(
                bob.id,
                UserDetailsPatch {
                    name: Some("robert".to_string()),
                    ..UserDetailsPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "robert");
        assert_eq!(renamed.email, bob.email);

        service.delete_user(bob.id).await.unwrap();
        let err = service.get_user(bob.id).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
