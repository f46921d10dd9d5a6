use anyhow::Context;
use chrono::NaiveDateTime;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::{
    BookedItem, Booker, Booking, BookingId, BookingStatus, Comment, Item, ItemDetails,
    ItemDetailsPatch, ItemId, ItemRequestId, User, UserDetails, UserDetailsPatch, UserId,
};
use crate::bookings::{BookingParty, BookingSelection, BookingWindow, Page};
use crate::repository::{ItemRequestRecord, RepositoryError, ShareItRepository};

pub struct PostgresShareItRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

pub struct PostgresShareItRepository {
    client: Client,
}

const BOOKING_COLUMNS: &str =
    "b.id, b.start_date, b.end_date, b.status, b.booker_id, i.id, i.name, i.owner_id";

const COMMENT_COLUMNS: &str = "c.id, c.item_id, c.text, u.name, c.created";

type SqlParams = Vec<Box<dyn ToSql + Sync + Send>>;

impl PostgresShareItRepository {
    pub async fn init(config: PostgresShareItRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!("Connecting to postgres at {}", config.hostname);
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS users (
            id              BIGSERIAL PRIMARY KEY,
            name            VARCHAR(255) NOT NULL,
            email           VARCHAR(512) NOT NULL UNIQUE
            )
        ",
            )
            .await
            .context("Failed to setup users table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS item_requests (
            id              BIGSERIAL PRIMARY KEY,
            description     TEXT NOT NULL,
            requestor_id    BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created         TIMESTAMP WITHOUT TIME ZONE NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup item_requests table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS items (
            id              BIGSERIAL PRIMARY KEY,
            owner_id        BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name            VARCHAR(255) NOT NULL,
            description     TEXT NOT NULL,
            available       BOOLEAN NOT NULL,
            request_id      BIGINT REFERENCES item_requests(id) ON DELETE SET NULL
            )
        ",
            )
            .await
            .context("Failed to setup items table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS bookings (
            id              BIGSERIAL PRIMARY KEY,
            start_date      TIMESTAMP WITHOUT TIME ZONE NOT NULL,
            end_date        TIMESTAMP WITHOUT TIME ZONE NOT NULL,
            item_id         BIGINT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            booker_id       BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            status          VARCHAR(16) NOT NULL,
            CHECK (start_date < end_date)
            )
        ",
            )
            .await
            .context("Failed to setup bookings table")?;

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS comments (
            id              BIGSERIAL PRIMARY KEY,
            item_id         BIGINT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            author_id       BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            text            TEXT NOT NULL,
            created         TIMESTAMP WITHOUT TIME ZONE NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup comments table")?;

        Ok(Self { client })
    }
}

/// Name of the constraint that failed, if `err` is a violation of kind `state`
fn violated_constraint(err: &tokio_postgres::Error, state: &SqlState) -> Option<String> {
    err.as_db_error()
        .filter(|db_err| db_err.code() == state)
        .map(|db_err| db_err.constraint().unwrap_or_default().to_string())
}

fn user_from_row(row: &Row) -> Result<User, RepositoryError> {
    Ok(User {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        email: row.try_get(2)?,
    })
}

fn item_from_row(row: &Row) -> Result<Item, RepositoryError> {
    Ok(Item {
        id: row.try_get(0)?,
        owner_id: row.try_get(1)?,
        name: row.try_get(2)?,
        description: row.try_get(3)?,
        available: row.try_get(4)?,
        request_id: row.try_get(5)?,
    })
}

fn booking_from_row(row: &Row) -> Result<Booking, RepositoryError> {
    let status: String = row.try_get(3)?;
    Ok(Booking {
        id: row.try_get(0)?,
        start: row.try_get(1)?,
        end: row.try_get(2)?,
        status: status.parse().map_err(RepositoryError::InvalidData)?,
        booker: Booker {
            id: row.try_get(4)?,
        },
        item: BookedItem {
            id: row.try_get(5)?,
            name: row.try_get(6)?,
            owner_id: row.try_get(7)?,
        },
    })
}

fn comment_from_row(row: &Row) -> Result<Comment, RepositoryError> {
    Ok(Comment {
        id: row.try_get(0)?,
        item_id: row.try_get(1)?,
        text: row.try_get(2)?,
        author_name: row.try_get(3)?,
        created: row.try_get(4)?,
    })
}

fn item_request_from_row(row: &Row) -> Result<ItemRequestRecord, RepositoryError> {
    Ok(ItemRequestRecord {
        id: row.try_get(0)?,
        description: row.try_get(1)?,
        requestor_id: row.try_get(2)?,
        created: row.try_get(3)?,
    })
}

/// Appends LIMIT/OFFSET placeholders for the page, if any
fn page_clause(params: &mut SqlParams, page: Option<Page>) -> String {
    let mut clause = String::new();
    if let Some(page) = page {
        if let Some(limit) = page.limit {
            params.push(Box::new(limit));
            clause.push_str(&format!(" LIMIT ${}", params.len()));
        }
        params.push(Box::new(page.offset));
        clause.push_str(&format!(" OFFSET ${}", params.len()));
    }
    clause
}

fn as_sql_refs(params: &SqlParams) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|param| &**param as &(dyn ToSql + Sync))
        .collect()
}

/// Escapes LIKE wildcards so the text is matched literally
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait::async_trait]
impl ShareItRepository for PostgresShareItRepository {
    async fn add_user(&self, details: UserDetails) -> Result<User, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id, name, email")
            .await?;

        match self
            .client
            .query_one(&stmt, &[&details.name, &details.email])
            .await
        {
            Ok(row) => user_from_row(&row),
            Err(err) if violated_constraint(&err, &SqlState::UNIQUE_VIOLATION).is_some() => {
                Err(RepositoryError::DuplicateEmail(details.email))
            }
            Err(other_err) => Err(other_err.into()),
        }
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, name, email FROM users WHERE id = $1")
            .await?;

        let rows = self.client.query(&stmt, &[&user_id]).await?;
        user_from_row(rows.first().ok_or(RepositoryError::UserNotFound(user_id))?)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, name, email FROM users ORDER BY id")
            .await?;
        let rows = self.client.query(&stmt, &[]).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn update_user(
        &self,
        user_id: UserId,
        patch: UserDetailsPatch,
    ) -> Result<User, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "UPDATE users SET name = COALESCE($1, name), email = COALESCE($2, email) \
                 WHERE id = $3 RETURNING id, name, email",
            )
            .await?;

        match self
            .client
            .query(&stmt, &[&patch.name, &patch.email, &user_id])
            .await
        {
            Ok(rows) => user_from_row(rows.first().ok_or(RepositoryError::UserNotFound(user_id))?),
            Err(err) if violated_constraint(&err, &SqlState::UNIQUE_VIOLATION).is_some() => Err(
                RepositoryError::DuplicateEmail(patch.email.unwrap_or_default()),
            ),
            Err(other_err) => Err(other_err.into()),
        }
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("DELETE FROM users WHERE id = $1")
            .await?;
        if self.client.execute(&stmt, &[&user_id]).await? == 0 {
            return Err(RepositoryError::UserNotFound(user_id));
        }
        Ok(())
    }

    async fn add_item(
        &self,
        owner_id: UserId,
        details: ItemDetails,
    ) -> Result<Item, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO items (owner_id, name, description, available, request_id) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, owner_id, name, description, available, request_id",
            )
            .await?;

        let result = self
            .client
            .query_one(
                &stmt,
                &[
                    &owner_id,
                    &details.name,
                    &details.description,
                    &details.available,
                    &details.request_id,
                ],
            )
            .await;

        match result {
            Ok(row) => item_from_row(&row),
            Err(err) => match violated_constraint(&err, &SqlState::FOREIGN_KEY_VIOLATION) {
                Some(constraint) if constraint == "items_request_id_fkey" => Err(
                    RepositoryError::ItemRequestNotFound(details.request_id.unwrap_or_default()),
                ),
                Some(_) => Err(RepositoryError::UserNotFound(owner_id)),
                None => Err(err.into()),
            },
        }
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Item, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, owner_id, name, description, available, request_id \
                 FROM items WHERE id = $1",
            )
            .await?;

        let rows = self.client.query(&stmt, &[&item_id]).await?;
        item_from_row(rows.first().ok_or(RepositoryError::ItemNotFound(item_id))?)
    }

    async fn update_item(
        &self,
        item_id: ItemId,
        patch: ItemDetailsPatch,
    ) -> Result<Item, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "UPDATE items SET name = COALESCE($1, name), \
                 description = COALESCE($2, description), \
                 available = COALESCE($3, available) \
                 WHERE id = $4 \
                 RETURNING id, owner_id, name, description, available, request_id",
            )
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[&patch.name, &patch.description, &patch.available, &item_id],
            )
            .await?;
        item_from_row(rows.first().ok_or(RepositoryError::ItemNotFound(item_id))?)
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<(), RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("DELETE FROM items WHERE id = $1")
            .await?;
        if self.client.execute(&stmt, &[&item_id]).await? == 0 {
            return Err(RepositoryError::ItemNotFound(item_id));
        }
        Ok(())
    }

    async fn list_items_by_owner(&self, owner_id: UserId) -> Result<Vec<Item>, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, owner_id, name, description, available, request_id \
                 FROM items WHERE owner_id = $1 ORDER BY id",
            )
            .await?;
        let rows = self.client.query(&stmt, &[&owner_id]).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn search_available_items(&self, text: &str) -> Result<Vec<Item>, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, owner_id, name, description, available, request_id \
                 FROM items WHERE available AND (name ILIKE $1 OR description ILIKE $1) \
                 ORDER BY id",
            )
            .await?;
        let rows = self.client.query(&stmt, &[&like_pattern(text)]).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn list_items_for_requests(
        &self,
        request_ids: &[ItemRequestId],
    ) -> Result<Vec<Item>, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, owner_id, name, description, available, request_id \
                 FROM items WHERE request_id = ANY($1) ORDER BY id",
            )
            .await?;
        let rows = self.client.query(&stmt, &[&request_ids]).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn add_booking(
        &self,
        booker_id: UserId,
        item_id: ItemId,
        window: BookingWindow,
    ) -> Result<Booking, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "WITH b AS ( \
                    INSERT INTO bookings (start_date, end_date, item_id, booker_id, status) \
                    VALUES ($1, $2, $3, $4, $5) RETURNING * \
                 ) \
                 SELECT {BOOKING_COLUMNS} FROM b JOIN items i ON i.id = b.item_id"
            ))
            .await?;

        let result = self
            .client
            .query_one(
                &stmt,
                &[
                    &window.start,
                    &window.end,
                    &item_id,
                    &booker_id,
                    &BookingStatus::Waiting.as_str(),
                ],
            )
            .await;

        match result {
            Ok(row) => booking_from_row(&row),
            Err(err) => match violated_constraint(&err, &SqlState::FOREIGN_KEY_VIOLATION) {
                Some(constraint) if constraint == "bookings_item_id_fkey" => {
                    Err(RepositoryError::ItemNotFound(item_id))
                }
                Some(_) => Err(RepositoryError::UserNotFound(booker_id)),
                None => Err(err.into()),
            },
        }
    }

    async fn get_booking(&self, booking_id: BookingId) -> Result<Booking, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings b JOIN items i ON i.id = b.item_id \
                 WHERE b.id = $1"
            ))
            .await?;

        let rows = self.client.query(&stmt, &[&booking_id]).await?;
        booking_from_row(
            rows.first()
                .ok_or(RepositoryError::BookingNotFound(booking_id))?,
        )
    }

    async fn decide_booking(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        // status check and update happen in one statement
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "WITH b AS ( \
                    UPDATE bookings SET status = $1 \
                    WHERE id = $2 AND status = $3 RETURNING * \
                 ) \
                 SELECT {BOOKING_COLUMNS} FROM b JOIN items i ON i.id = b.item_id"
            ))
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[
                    &status.as_str(),
                    &booking_id,
                    &BookingStatus::Waiting.as_str(),
                ],
            )
            .await?;

        match rows.first() {
            Some(row) => booking_from_row(row),
            None => {
                // tells apart a missing booking from an already decided one
                self.get_booking(booking_id).await?;
                Err(RepositoryError::BookingAlreadyDecided(booking_id))
            }
        }
    }

    async fn list_bookings(
        &self,
        party: BookingParty,
        selection: BookingSelection,
        page: Option<Page>,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let mut params: SqlParams = vec![];

        let party_clause = match party {
            BookingParty::Booker(user_id) => {
                params.push(Box::new(user_id));
                "b.booker_id = $1"
            }
            BookingParty::Owner(user_id) => {
                params.push(Box::new(user_id));
                "i.owner_id = $1"
            }
        };

        let selection_clause = match selection {
            BookingSelection::All => String::new(),
            BookingSelection::Status(status) => {
                params.push(Box::new(status.as_str().to_string()));
                format!(" AND b.status = ${}", params.len())
            }
            BookingSelection::Current(now) => {
                params.push(Box::new(now));
                let n = params.len();
                format!(" AND b.start_date <= ${n} AND b.end_date >= ${n}")
            }
            BookingSelection::Past(now) => {
                params.push(Box::new(now));
                format!(" AND b.end_date < ${}", params.len())
            }
            BookingSelection::Future(now) => {
                params.push(Box::new(now));
                format!(" AND b.start_date > ${}", params.len())
            }
        };

        let page_clause = page_clause(&mut params, page);

        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b JOIN items i ON i.id = b.item_id \
             WHERE {party_clause}{selection_clause} \
             ORDER BY b.start_date DESC, b.id DESC{page_clause}"
        );

        let rows = self
            .client
            .query(sql.as_str(), &as_sql_refs(&params))
            .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn list_approved_bookings(
        &self,
        item_ids: &[ItemId],
    ) -> Result<Vec<Booking>, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings b JOIN items i ON i.id = b.item_id \
                 WHERE b.status = $1 AND b.item_id = ANY($2)"
            ))
            .await?;

        let rows = self
            .client
            .query(&stmt, &[&BookingStatus::Approved.as_str(), &item_ids])
            .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn has_finished_booking(
        &self,
        booker_id: UserId,
        item_id: ItemId,
        now: NaiveDateTime,
    ) -> Result<bool, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT EXISTS ( \
                    SELECT 1 FROM bookings \
                    WHERE booker_id = $1 AND item_id = $2 AND status = $3 AND end_date < $4 \
                 )",
            )
            .await?;

        let row = self
            .client
            .query_one(
                &stmt,
                &[
                    &booker_id,
                    &item_id,
                    &BookingStatus::Approved.as_str(),
                    &now,
                ],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn add_comment(
        &self,
        author_id: UserId,
        item_id: ItemId,
        text: String,
        created: NaiveDateTime,
    ) -> Result<Comment, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "WITH c AS ( \
                    INSERT INTO comments (item_id, author_id, text, created) \
                    VALUES ($1, $2, $3, $4) RETURNING * \
                 ) \
                 SELECT {COMMENT_COLUMNS} FROM c JOIN users u ON u.id = c.author_id"
            ))
            .await?;

        let result = self
            .client
            .query_one(&stmt, &[&item_id, &author_id, &text, &created])
            .await;

        match result {
            Ok(row) => comment_from_row(&row),
            Err(err) => match violated_constraint(&err, &SqlState::FOREIGN_KEY_VIOLATION) {
                Some(constraint) if constraint == "comments_item_id_fkey" => {
                    Err(RepositoryError::ItemNotFound(item_id))
                }
                Some(_) => Err(RepositoryError::UserNotFound(author_id)),
                None => Err(err.into()),
            },
        }
    }

    async fn list_comments(&self, item_ids: &[ItemId]) -> Result<Vec<Comment>, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON u.id = c.author_id \
                 WHERE c.item_id = ANY($1) ORDER BY c.created, c.id"
            ))
            .await?;

        let rows = self.client.query(&stmt, &[&item_ids]).await?;
        rows.iter().map(comment_from_row).collect()
    }

    async fn add_item_request(
        &self,
        requestor_id: UserId,
        description: String,
        created: NaiveDateTime,
    ) -> Result<ItemRequestRecord, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO item_requests (description, requestor_id, created) \
                 VALUES ($1, $2, $3) RETURNING id, description, requestor_id, created",
            )
            .await?;

        match self
            .client
            .query_one(&stmt, &[&description, &requestor_id, &created])
            .await
        {
            Ok(row) => item_request_from_row(&row),
            Err(err) if violated_constraint(&err, &SqlState::FOREIGN_KEY_VIOLATION).is_some() => {
                Err(RepositoryError::UserNotFound(requestor_id))
            }
            Err(other_err) => Err(other_err.into()),
        }
    }

    async fn get_item_request(
        &self,
        request_id: ItemRequestId,
    ) -> Result<ItemRequestRecord, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, description, requestor_id, created FROM item_requests WHERE id = $1",
            )
            .await?;

        let rows = self.client.query(&stmt, &[&request_id]).await?;
        item_request_from_row(
            rows.first()
                .ok_or(RepositoryError::ItemRequestNotFound(request_id))?,
        )
    }

    async fn list_item_requests_by_requestor(
        &self,
        requestor_id: UserId,
    ) -> Result<Vec<ItemRequestRecord>, RepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "SELECT id, description, requestor_id, created FROM item_requests \
                 WHERE requestor_id = $1 ORDER BY created DESC, id DESC",
            )
            .await?;

        let rows = self.client.query(&stmt, &[&requestor_id]).await?;
        rows.iter().map(item_request_from_row).collect()
    }

    async fn list_item_requests_of_others(
        &self,
        user_id: UserId,
        page: Option<Page>,
    ) -> Result<Vec<ItemRequestRecord>, RepositoryError> {
        let mut params: SqlParams = vec![Box::new(user_id)];
        let page_clause = page_clause(&mut params, page);
        let sql = format!(
            "SELECT id, description, requestor_id, created FROM item_requests \
             WHERE requestor_id <> $1 ORDER BY created DESC, id DESC{page_clause}"
        );

        let rows = self
            .client
            .query(sql.as_str(), &as_sql_refs(&params))
            .await?;
        rows.iter().map(item_request_from_row).collect()
    }
}

#[cfg(test)]
mod tests_postgres_repository {
    use chrono::{Duration, NaiveDate};
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use super::*;

    async fn start_postgres_container_and_init_repo(
    ) -> (ContainerAsync<GenericImage>, PostgresShareItRepository) {
        let pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = PostgresShareItRepository::init(PostgresShareItRepositoryConfig {
                hostname: "127.0.0.1".to_string(),
                username: "postgres".to_string(),
                password: "postgres".to_string(),
            })
            .await
            {
                return (pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn window(start_hours: i64, end_hours: i64) -> BookingWindow {
        BookingWindow {
            start: now() + Duration::hours(start_hours),
            end: now() + Duration::hours(end_hours),
        }
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers users and items against a real database
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_users_and_items() {
        let (_container, repository) = start_postgres_container_and_init_repo().await;

        let owner = repository
            .add_user(UserDetails {
                name: "owner".to_string(),
                email: "owner@example.com".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(repository.get_user(owner.id).await.unwrap(), owner);

        let duplicate = repository
            .add_user(UserDetails {
                name: "copycat".to_string(),
                email: "owner@example.com".to_string(),
            })
            .await;
        assert!(matches!(duplicate, Err(RepositoryError::DuplicateEmail(..))));

        let renamed = repository
            .update_user(
                owner.id,
                UserDetailsPatch {
                    name: Some("new name".to_string()),
                    ..UserDetailsPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "new name");
        assert_eq!(renamed.email, "owner@example.com");

        let missing_owner = repository
            .add_item(
                owner.id + 100,
                ItemDetails {
                    name: "saw".to_string(),
                    description: "hand saw".to_string(),
                    available: true,
                    request_id: None,
                },
            )
            .await;
        assert!(matches!(missing_owner, Err(RepositoryError::UserNotFound(..))));

        let missing_request = repository
            .add_item(
                owner.id,
                ItemDetails {
                    name: "saw".to_string(),
                    description: "hand saw".to_string(),
                    available: true,
                    request_id: Some(12345),
                },
            )
            .await;
        assert!(matches!(
            missing_request,
            Err(RepositoryError::ItemRequestNotFound(12345))
        ));

        let saw = repository
            .add_item(
                owner.id,
                ItemDetails {
                    name: "Saw".to_string(),
                    description: "100% sharp".to_string(),
                    available: true,
                    request_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(repository.get_item(saw.id).await.unwrap(), saw);
        assert_eq!(
            repository.search_available_items("sAw").await.unwrap(),
            vec![saw.clone()]
        );
        assert_eq!(
            repository.search_available_items("100%").await.unwrap(),
            vec![saw.clone()]
        );
        assert!(repository
            .search_available_items("_")
            .await
            .unwrap()
            .is_empty());

        let hidden = repository
            .update_item(
                saw.id,
                ItemDetailsPatch {
                    available: Some(false),
                    ..ItemDetailsPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(!hidden.available);
        assert_eq!(hidden.name, "Saw");
        assert!(repository
            .search_available_items("saw")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repository.list_items_by_owner(owner.id).await.unwrap(),
            vec![hidden]
        );

        repository.delete_user(owner.id).await.unwrap();
        assert!(matches!(
            repository.get_item(saw.id).await,
            Err(RepositoryError::ItemNotFound(..))
        ));
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Covers bookings, decisions, listings, comments and requests against a real database
    async fn test_bookings_comments_and_requests() {
        let (_container, repository) = start_postgres_container_and_init_repo().await;

        let owner = repository
            .add_user(UserDetails {
                name: "owner".to_string(),
                email: "owner2@example.com".to_string(),
            })
            .await
            .unwrap();
        let booker = repository
            .add_user(UserDetails {
                name: "booker".to_string(),
                email: "booker@example.com".to_string(),
            })
            .await
            .unwrap();
        let request = repository
            .add_item_request(booker.id, "need a boat".to_string(), now())
            .await
            .unwrap();
        let boat = repository
            .add_item(
                owner.id,
                ItemDetails {
                    name: "boat".to_string(),
                    description: "rowing boat".to_string(),
                    available: true,
                    request_id: Some(request.id),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            repository
                .list_items_for_requests(&[request.id])
                .await
                .unwrap(),
            vec![boat.clone()]
        );

        let past = repository
            .add_booking(booker.id, boat.id, window(-48, -24))
            .await
            .unwrap();
        let current = repository
            .add_booking(booker.id, boat.id, window(-1, 1))
            .await
            .unwrap();
        let future = repository
            .add_booking(booker.id, boat.id, window(24, 48))
            .await
            .unwrap();
        assert_eq!(repository.get_booking(future.id).await.unwrap(), future);

        assert!(matches!(
            repository.add_booking(booker.id, boat.id + 100, window(1, 2)).await,
            Err(RepositoryError::ItemNotFound(..))
        ));

        let approved = repository
            .decide_booking(past.id, BookingStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, BookingStatus::Approved);
        assert!(matches!(
            repository
                .decide_booking(past.id, BookingStatus::Rejected)
                .await,
            Err(RepositoryError::BookingAlreadyDecided(..))
        ));
        assert!(matches!(
            repository
                .decide_booking(future.id + 100, BookingStatus::Rejected)
                .await,
            Err(RepositoryError::BookingNotFound(..))
        ));

        let ids = |bookings: Vec<Booking>| bookings.iter().map(|b| b.id).collect::<Vec<_>>();
        assert_eq!(
            ids(repository
                .list_bookings(BookingParty::Owner(owner.id), BookingSelection::All, None)
                .await
                .unwrap()),
            vec![future.id, current.id, past.id]
        );
        assert_eq!(
            ids(repository
                .list_bookings(
                    BookingParty::Booker(booker.id),
                    BookingSelection::Past(now()),
                    None
                )
                .await
                .unwrap()),
            vec![past.id]
        );
        assert_eq!(
            ids(repository
                .list_bookings(
                    BookingParty::Booker(booker.id),
                    BookingSelection::Current(now()),
                    None
                )
                .await
                .unwrap()),
            vec![current.id]
        );
        assert_eq!(
            ids(repository
                .list_bookings(
                    BookingParty::Booker(booker.id),
                    BookingSelection::Future(now()),
                    None
                )
                .await
                .unwrap()),
            vec![future.id]
        );
        assert_eq!(
            ids(repository
                .list_bookings(
                    BookingParty::Owner(owner.id),
                    BookingSelection::Status(BookingStatus::Waiting),
                    Some(Page {
                        offset: 1,
                        limit: Some(5)
                    })
                )
                .await
                .unwrap()),
            vec![current.id]
        );

        assert!(repository
            .has_finished_booking(booker.id, boat.id, now())
            .await
            .unwrap());
        assert_eq!(
            ids(repository.list_approved_bookings(&[boat.id]).await.unwrap()),
            vec![past.id]
        );

        let comment = repository
            .add_comment(booker.id, boat.id, "smooth ride".to_string(), now())
            .await
            .unwrap();
        assert_eq!(comment.author_name, "booker");
        assert_eq!(
            repository.list_comments(&[boat.id]).await.unwrap(),
            vec![comment]
        );

        assert_eq!(
            repository
                .list_item_requests_of_others(owner.id, None)
                .await
                .unwrap(),
            vec![request.clone()]
        );
        assert!(repository
            .list_item_requests_of_others(booker.id, None)
            .await
            .unwrap()
            .is_empty());
    }
}
