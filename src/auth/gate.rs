//! Authentication gate
//!
//! Verifies a username/password pair against the stored credential record
//! and produces a [`Principal`]. Every expected failure (unknown user, hash
//! mismatch, deleted account) collapses into the one opaque
//! `WrongCredentials` error so the response never reveals which check
//! failed.

use crate::auth::password::verify_password;
use crate::auth::Principal;
use crate::db::AccountStore;
use crate::error::AppError;

/// Ephemeral credential pair; lives only for the duration of a login
/// request and is never persisted.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Authenticate a credential pair against the account store.
///
/// A storage fault propagates as-is (fatal for the request); everything
/// else is `WrongCredentials`.
pub async fn authenticate<S: AccountStore>(
    store: &S,
    credentials: &Credentials,
) -> Result<Principal, AppError> {
    let account = store
        .find_by_username(&credentials.username)
        .await?
        .ok_or(AppError::WrongCredentials)?;

    if !verify_password(&credentials.password, &account.password_hash)? {
        return Err(AppError::WrongCredentials);
    }

    Ok(account.into())
}

/// Re-resolve a principal by its public UUID with a fresh role lookup.
///
/// The refresh flow calls this instead of trusting anything embedded in the
/// refresh token, so role and ban changes take effect on the next minted
/// access token.
pub async fn resolve_by_uuid<S: AccountStore>(
    store: &S,
    uuid: uuid::Uuid,
) -> Result<Principal, AppError> {
    let account = store
        .find_by_uuid(uuid)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(account.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ROLE_USER;
    use crate::db::AccountRecord;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use uuid::Uuid;

    struct MemStore {
        by_username: HashMap<String, AccountRecord>,
    }

    impl MemStore {
        fn with_alice() -> Self {
            let mut by_username = HashMap::new();
            by_username.insert(
                "alice".to_string(),
                AccountRecord {
                    id: 1,
                    uuid: Uuid::new_v4(),
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    password_hash: bcrypt::hash("correct-pw", 4).unwrap(),
                    roles: vec![ROLE_USER.to_string()],
                },
            );
            Self { by_username }
        }
    }

    impl AccountStore for MemStore {
        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<AccountRecord>, AppError> {
            Ok(self.by_username.get(username).cloned())
        }

        async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<AccountRecord>, AppError> {
            Ok(self
                .by_username
                .values()
                .find(|account| account.uuid == uuid)
                .cloned())
        }
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn correct_credentials_yield_principal() {
        let store = MemStore::with_alice();
        let principal = authenticate(&store, &credentials("alice", "correct-pw"))
            .await
            .unwrap();
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.email, "alice@example.com");
        assert_eq!(principal.roles, vec![ROLE_USER.to_string()]);
    }

    #[tokio::test]
    async fn wrong_password_is_opaque() {
        let store = MemStore::with_alice();
        let err = authenticate(&store, &credentials("alice", "wrong-pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongCredentials));
    }

    #[tokio::test]
    async fn unknown_user_gets_the_same_error() {
        let store = MemStore::with_alice();
        let err = authenticate(&store, &credentials("ghost", "anything"))
            .await
            .unwrap_err();
        // Deliberately indistinguishable from a bad password.
        assert!(matches!(err, AppError::WrongCredentials));
    }

    #[tokio::test]
    async fn resolve_by_uuid_reads_current_roles() {
        use crate::auth::ROLE_ADMIN;

        let mut store = MemStore::with_alice();
        let uuid = store.by_username["alice"].uuid;

        let principal = resolve_by_uuid(&store, uuid).await.unwrap();
        assert_eq!(principal.roles, vec![ROLE_USER.to_string()]);
        assert!(!principal.is_admin());

        // Promote alice after the refresh token would have been issued; the
        // next resolution must see the new role set.
        store
            .by_username
            .get_mut("alice")
            .unwrap()
            .roles
            .push(ROLE_ADMIN.to_string());

        let principal = resolve_by_uuid(&store, uuid).await.unwrap();
        assert!(principal.is_admin());
    }

    #[tokio::test]
    async fn resolve_by_unknown_uuid_is_unauthenticated() {
        let store = MemStore::with_alice();
        let err = resolve_by_uuid(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
