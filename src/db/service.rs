// Account service over PostgreSQL
//
// Credential records, role membership, and the explicit per-field update
// and soft-delete operations the user endpoints need.

use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::auth::ROLE_USER;
use crate::error::AppError;

/// Account row joined with its role names.
#[derive(Clone, Debug)]
pub struct AccountRecord {
    pub id: i64,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

/// The lookups the auth core needs from the store. Implemented by the
/// Postgres service here and by in-memory fakes in tests.
pub trait AccountStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, AppError>;
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<AccountRecord>, AppError>;
}

/// How to address an account, mirroring the three owner-identifying path
/// variables the user routes expose.
#[derive(Debug, Clone, Copy)]
pub enum AccountFinder<'a> {
    ByUsername(&'a str),
    ByUuid(Uuid),
    ByEmail(&'a str),
}

/// Allowed mutable fields, enumerated explicitly. Anything not listed here
/// cannot be changed through the update path.
#[derive(Debug, Default)]
pub struct AccountUpdate {
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

const SELECT_ACCOUNT: &str = "SELECT a.id, a.uuid, a.username, a.email, a.password, \
     COALESCE(ARRAY_AGG(r.name) FILTER (WHERE r.name IS NOT NULL), '{}') AS roles \
     FROM accounts a \
     LEFT JOIN account_roles ar ON ar.account_id = a.id \
     LEFT JOIN roles r ON r.id = ar.role_id \
     WHERE NOT a.is_deleted AND ";

const GROUP_ACCOUNT: &str = " GROUP BY a.id";

#[derive(Clone)]
pub struct AccountService {
    pool: Pool,
}

impl AccountService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Look up a live (non-deleted) account with its roles.
    pub async fn find(
        &self,
        finder: AccountFinder<'_>,
    ) -> Result<Option<AccountRecord>, AppError> {
        let client = self.pool.get().await?;

        let row = match finder {
            AccountFinder::ByUsername(username) => {
                let sql = format!("{SELECT_ACCOUNT}a.username = $1{GROUP_ACCOUNT}");
                client.query_opt(sql.as_str(), &[&username]).await?
            }
            AccountFinder::ByEmail(email) => {
                let sql = format!("{SELECT_ACCOUNT}a.email = $1{GROUP_ACCOUNT}");
                client.query_opt(sql.as_str(), &[&email]).await?
            }
            AccountFinder::ByUuid(uuid) => {
                let sql = format!("{SELECT_ACCOUNT}a.uuid = $1{GROUP_ACCOUNT}");
                client.query_opt(sql.as_str(), &[&uuid]).await?
            }
        };

        Ok(row.map(|row| AccountRecord {
            id: row.get("id"),
            uuid: row.get("uuid"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password"),
            roles: row.get("roles"),
        }))
    }

    /// Create an account with the default role. Uniqueness checks and the
    /// role assignment run inside one transaction.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<AccountRecord, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let username_taken: bool = tx
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)",
                &[&username],
            )
            .await?
            .get(0);
        if username_taken {
            return Err(AppError::DuplicateUsername);
        }

        let email_taken: bool = tx
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)",
                &[&email],
            )
            .await?
            .get(0);
        if email_taken {
            return Err(AppError::DuplicateEmail);
        }

        let uuid = Uuid::new_v4();
        let row = tx
            .query_one(
                "INSERT INTO accounts (uuid, username, email, password) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
                &[&uuid, &username, &email, &password_hash],
            )
            .await?;
        let id: i64 = row.get(0);

        tx.execute(
            "INSERT INTO account_roles (account_id, role_id) \
             SELECT $1, id FROM roles WHERE name = $2",
            &[&id, &ROLE_USER],
        )
        .await?;

        tx.commit().await?;

        Ok(AccountRecord {
            id,
            uuid,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            roles: vec![ROLE_USER.to_string()],
        })
    }

    /// Apply an explicit field-by-field update to an account.
    pub async fn update(
        &self,
        finder: AccountFinder<'_>,
        update: AccountUpdate,
    ) -> Result<AccountRecord, AppError> {
        let existing = self.find(finder).await?.ok_or(AppError::AccountNotFound)?;

        if let Some(email) = &update.email {
            if email != &existing.email {
                let client = self.pool.get().await?;
                let taken: bool = client
                    .query_one(
                        "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)",
                        &[email],
                    )
                    .await?
                    .get(0);
                if taken {
                    return Err(AppError::DuplicateEmail);
                }
            }
        }

        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE accounts SET \
                 email = COALESCE($2, email), \
                 password = COALESCE($3, password), \
                 updated_at = CURRENT_TIMESTAMP \
                 WHERE id = $1",
                &[&existing.id, &update.email, &update.password_hash],
            )
            .await?;

        self.find(AccountFinder::ByUuid(existing.uuid))
            .await?
            .ok_or(AppError::AccountNotFound)
    }

    /// Soft delete: mark the row and retire its unique username/email so
    /// they can be re-registered.
    pub async fn delete(&self, finder: AccountFinder<'_>) -> Result<(), AppError> {
        let existing = self.find(finder).await?.ok_or(AppError::AccountNotFound)?;

        let retired_username = format!("deleted_{}", existing.uuid);
        let retired_email = format!("deleted_{}@deleted.com", existing.uuid);
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE accounts SET \
                 is_deleted = TRUE, username = $2, email = $3, \
                 updated_at = CURRENT_TIMESTAMP \
                 WHERE id = $1",
                &[&existing.id, &retired_username, &retired_email],
            )
            .await?;

        Ok(())
    }
}

impl AccountStore for AccountService {
    async fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, AppError> {
        self.find(AccountFinder::ByUsername(username)).await
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<AccountRecord>, AppError> {
        self.find(AccountFinder::ByUuid(uuid)).await
    }
}
