use chrono::{DateTime, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{EmailAddress, NotificationKind, NotificationStatus};
use crate::model::{NewNotification, Notification, RelatedEntity};
use crate::repo::{RepoError, RepoResult};

use super::{convert_all, parse_column};

macro_rules! notification_columns {
    () => {
        "id, recipient_email, type, title, message, related_entity_id, related_entity_type, \
         status, created_at, sent_at, read_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_email: String,
    #[sqlx(rename = "type")]
    kind: String,
    title: String,
    message: String,
    related_entity_id: Option<Uuid>,
    related_entity_type: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = RepoError;

    fn try_from(row: NotificationRow) -> RepoResult<Self> {
        let related = match (row.related_entity_id, row.related_entity_type) {
            (Some(id), Some(entity_type)) => Some(RelatedEntity { id, entity_type }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            recipient: parse_column("recipient_email", row.recipient_email.parse())?,
            kind: parse_column("type", row.kind.parse())?,
            title: row.title,
            body: row.message,
            related,
            status: parse_column("status", row.status.parse())?,
            created_at: row.created_at,
            sent_at: row.sent_at,
            read_at: row.read_at,
        })
    }
}

#[tracing::instrument(name = "Insert notification", skip(executor))]
pub(super) async fn insert<'con>(
    executor: impl PgExecutor<'con>,
    new_notification: &NewNotification,
    created_at: DateTime<Utc>,
) -> RepoResult<Notification> {
    let related = new_notification.related.as_ref();
    let row = sqlx::query_as::<_, NotificationRow>(concat!(
        "insert into notifications(id, recipient_email, type, title, message, \
         related_entity_id, related_entity_type, status, created_at) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9) returning ",
        notification_columns!()
    ))
    .bind(Uuid::new_v4())
    .bind(new_notification.recipient.as_ref())
    .bind(new_notification.kind.as_ref())
    .bind(&new_notification.title)
    .bind(&new_notification.body)
    .bind(related.map(|r| r.id))
    .bind(related.map(|r| r.entity_type.as_str()))
    .bind(NotificationStatus::Pending.as_ref())
    .bind(created_at)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

#[tracing::instrument(name = "Set notification delivery status", skip(executor))]
pub(super) async fn set_delivery_status<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
    status: NotificationStatus,
    sent_at: Option<DateTime<Utc>>,
) -> RepoResult<Option<Notification>> {
    // Read notifications stay read
    sqlx::query_as::<_, NotificationRow>(concat!(
        "update notifications \
         set status = case when read_at is null then $2 else status end, sent_at=$3 \
         where id=$1 returning ",
        notification_columns!()
    ))
    .bind(id)
    .bind(status.as_ref())
    .bind(sent_at)
    .fetch_optional(executor)
    .await?
    .map(TryInto::try_into)
    .transpose()
}

#[tracing::instrument(name = "Fetch notification by id", skip(executor))]
pub(super) async fn fetch_by_id<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
) -> RepoResult<Option<Notification>> {
    sqlx::query_as::<_, NotificationRow>(concat!(
        "select ",
        notification_columns!(),
        " from notifications where id=$1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .map(TryInto::try_into)
    .transpose()
}

#[tracing::instrument(name = "Fetch notifications for recipient", skip(executor))]
pub(super) async fn fetch_for_recipient<'con>(
    executor: impl PgExecutor<'con>,
    recipient: &EmailAddress,
    unread_only: bool,
) -> RepoResult<Vec<Notification>> {
    let query = if unread_only {
        concat!(
            "select ",
            notification_columns!(),
            " from notifications where recipient_email=$1 and read_at is null \
             order by created_at desc"
        )
    } else {
        concat!(
            "select ",
            notification_columns!(),
            " from notifications where recipient_email=$1 order by created_at desc"
        )
    };

    let rows = sqlx::query_as::<_, NotificationRow>(query)
        .bind(recipient.as_ref())
        .fetch_all(executor)
        .await?;

    convert_all(rows)
}

#[tracing::instrument(name = "Count unread notifications", skip(executor))]
pub(super) async fn count_unread<'con>(
    executor: impl PgExecutor<'con>,
    recipient: &EmailAddress,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "select count(*) from notifications where recipient_email=$1 and read_at is null",
    )
    .bind(recipient.as_ref())
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Already-read notifications keep their original `read_at`
#[tracing::instrument(name = "Mark notification read", skip(executor))]
pub(super) async fn mark_read<'con>(
    executor: impl PgExecutor<'con>,
    id: Uuid,
    read_at: DateTime<Utc>,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "update notifications set read_at=$2, status=$3 where id=$1 and read_at is null",
    )
    .bind(id)
    .bind(read_at)
    .bind(NotificationStatus::Read.as_ref())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(name = "Mark all notifications read", skip(executor))]
pub(super) async fn mark_all_read<'con>(
    executor: impl PgExecutor<'con>,
    recipient: &EmailAddress,
    read_at: DateTime<Utc>,
) -> RepoResult<u64> {
    let result = sqlx::query(
        "update notifications set read_at=$2, status=$3 \
         where recipient_email=$1 and read_at is null",
    )
    .bind(recipient.as_ref())
    .bind(read_at)
    .bind(NotificationStatus::Read.as_ref())
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

#[tracing::instrument(name = "Check notification exists", skip(executor))]
pub(super) async fn exists<'con>(
    executor: impl PgExecutor<'con>,
    kind: NotificationKind,
    related_id: Uuid,
) -> RepoResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "select exists(select 1 from notifications where type=$1 and related_entity_id=$2)",
    )
    .bind(kind.as_ref())
    .bind(related_id)
    .fetch_one(executor)
    .await?;
    Ok(exists)
}

#[tracing::instrument(name = "Delete notifications created before cutoff", skip(executor))]
pub(super) async fn delete_created_before<'con>(
    executor: impl PgExecutor<'con>,
    cutoff: DateTime<Utc>,
) -> RepoResult<u64> {
    let result = sqlx::query("delete from notifications where created_at < $1")
        .bind(cutoff)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
