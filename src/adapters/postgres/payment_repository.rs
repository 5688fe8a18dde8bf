//! PostgreSQL implementation of PaymentRepository.
//!
//! Status transitions are single conditional `UPDATE ... WHERE status = ...`
//! statements so concurrent schedulers and webhooks never overwrite a
//! terminal state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PaymentId, PaymentRequestId, Timestamp, UserId,
};
use crate::domain::payment::{
    ExternalId, FailedEvent, NewPayment, NewPaymentRequest, Payment, PaymentAnomaly,
    PaymentAuditLog, PaymentRequest, PaymentRequestStatus, PaymentStatus,
};
use crate::ports::PaymentRepository;

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const REQUEST_COLUMNS: &str =
    "id, order_id, user_id, amount, status, retry_count, notes, create_time, update_time";

const PAYMENT_COLUMNS: &str =
    "id, order_id, user_id, external_id, amount, status, create_time, update_time, expired_time";

#[derive(Debug, sqlx::FromRow)]
struct PaymentRequestRow {
    id: i64,
    order_id: i64,
    user_id: i64,
    amount: Decimal,
    status: String,
    retry_count: i32,
    notes: Option<String>,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
}

impl TryFrom<PaymentRequestRow> for PaymentRequest {
    type Error = DomainError;

    fn try_from(row: PaymentRequestRow) -> Result<Self, Self::Error> {
        let status: PaymentRequestStatus = row.status.parse().map_err(invalid_column)?;

        Ok(PaymentRequest {
            id: PaymentRequestId::new(row.id),
            order_id: OrderId::new(row.order_id),
            user_id: UserId::new(row.user_id),
            amount: row.amount,
            status,
            retry_count: u32::try_from(row.retry_count).map_err(|_| {
                invalid_column(format!("negative retry_count {}", row.retry_count))
            })?,
            notes: row.notes.filter(|n| !n.is_empty()),
            create_time: Timestamp::from_datetime(row.create_time),
            update_time: Timestamp::from_datetime(row.update_time),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    order_id: i64,
    user_id: i64,
    external_id: String,
    amount: Decimal,
    status: String,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
    expired_time: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row.status.parse().map_err(invalid_column)?;
        let external_id = ExternalId::parse(&row.external_id).map_err(invalid_column)?;

        Ok(Payment {
            id: PaymentId::new(row.id),
            order_id: OrderId::new(row.order_id),
            user_id: UserId::new(row.user_id),
            external_id,
            amount: row.amount,
            status,
            create_time: Timestamp::from_datetime(row.create_time),
            update_time: Timestamp::from_datetime(row.update_time),
            expired_time: Timestamp::from_datetime(row.expired_time),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditLogRow {
    order_id: i64,
    user_id: Option<i64>,
    payment_id: Option<i64>,
    external_id: Option<String>,
    event: String,
    actor: String,
    create_time: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for PaymentAuditLog {
    type Error = DomainError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let external_id = row
            .external_id
            .as_deref()
            .map(ExternalId::parse)
            .transpose()
            .map_err(invalid_column)?;

        Ok(PaymentAuditLog {
            order_id: OrderId::new(row.order_id),
            user_id: row.user_id.map(UserId::new),
            payment_id: row.payment_id.map(PaymentId::new),
            external_id,
            event: row.event.parse().map_err(invalid_column)?,
            actor: row.actor.parse().map_err(invalid_column)?,
            create_time: Timestamp::from_datetime(row.create_time),
        })
    }
}

fn invalid_column(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored value: {}", err))
}

fn retry_bound(max_retry: u32) -> Result<i32, DomainError> {
    i32::try_from(max_retry).map_err(|_| {
        DomainError::new(
            ErrorCode::ValidationFailed,
            format!("max_retry {} exceeds the retry_count column range", max_retry),
        )
    })
}

fn db_error(action: &str) -> impl FnOnce(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn save_payment_request(
        &self,
        request: NewPaymentRequest,
    ) -> Result<PaymentRequest, DomainError> {
        let row: PaymentRequestRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO payment_requests (order_id, user_id, amount, status, retry_count, create_time, update_time)
            VALUES ($1, $2, $3, 'PENDING', 0, NOW(), NOW())
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request.order_id.as_i64())
        .bind(request.user_id.as_i64())
        .bind(request.amount)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("save payment request"))?;

        row.try_into()
    }

    async fn find_pending_requests(&self, limit: u32) -> Result<Vec<PaymentRequest>, DomainError> {
        let rows: Vec<PaymentRequestRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM payment_requests
            WHERE status = 'PENDING'
            ORDER BY create_time ASC, id ASC
            LIMIT $1
            "#,
            REQUEST_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch pending payment requests"))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_retryable_failed_requests(
        &self,
        max_retry: u32,
        limit: u32,
    ) -> Result<Vec<PaymentRequest>, DomainError> {
        let rows: Vec<PaymentRequestRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM payment_requests
            WHERE status = 'FAILED' AND retry_count <= $1
            ORDER BY create_time ASC, id ASC
            LIMIT $2
            "#,
            REQUEST_COLUMNS
        ))
        .bind(retry_bound(max_retry)?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch failed payment requests"))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_exhausted_requests(
        &self,
        max_retry: u32,
    ) -> Result<Vec<PaymentRequest>, DomainError> {
        let rows: Vec<PaymentRequestRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM payment_requests
            WHERE status = 'FAILED' AND retry_count > $1
            ORDER BY create_time ASC, id ASC
            "#,
            REQUEST_COLUMNS
        ))
        .bind(retry_bound(max_retry)?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch exhausted payment requests"))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_request_success(&self, id: PaymentRequestId) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE payment_requests SET status = 'SUCCESS', update_time = NOW() WHERE id = $1",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(db_error("mark payment request success"))?;

        ensure_request_found(result.rows_affected(), id)
    }

    async fn mark_request_failed(
        &self,
        id: PaymentRequestId,
        notes: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE payment_requests SET status = 'FAILED', notes = $2, update_time = NOW() WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(notes)
        .execute(&self.pool)
        .await
        .map_err(db_error("mark payment request failed"))?;

        ensure_request_found(result.rows_affected(), id)
    }

    async fn requeue_failed_request(&self, id: PaymentRequestId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_requests
            SET status = 'PENDING', retry_count = retry_count + 1, update_time = NOW()
            WHERE id = $1 AND status = 'FAILED'
            "#,
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(db_error("requeue payment request"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_request_retry_failure(
        &self,
        id: PaymentRequestId,
        notes: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_requests
            SET status = 'FAILED', notes = $2, retry_count = retry_count + 1, update_time = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(notes)
        .execute(&self.pool)
        .await
        .map_err(db_error("record payment request retry"))?;

        ensure_request_found(result.rows_affected(), id)
    }

    async fn save_payment(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        let row: PaymentRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO payments (order_id, user_id, external_id, amount, status, create_time, update_time, expired_time)
            VALUES ($1, $2, $3, $4, 'PENDING', NOW(), NOW(), $5)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(payment.order_id.as_i64())
        .bind(payment.user_id.as_i64())
        .bind(payment.external_id.to_string())
        .bind(payment.amount)
        .bind(payment.expired_time.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("save payment"))?;

        row.try_into()
    }

    async fn find_payment_by_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM payments
            WHERE order_id = $1
            ORDER BY create_time DESC, id DESC
            LIMIT 1
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(order_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch payment"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_pending_payments_since(
        &self,
        since: Timestamp,
    ) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM payments
            WHERE status = 'PENDING' AND create_time >= $1
            ORDER BY create_time ASC, id ASC
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(since.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch pending payments"))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_expired_pending_payments(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM payments
            WHERE status = 'PENDING' AND expired_time <= $1
            ORDER BY expired_time ASC, id ASC
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch expired payments"))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_paid(&self, order_id: OrderId) -> Result<bool, DomainError> {
        self.settle_latest(order_id, PaymentStatus::Paid).await
    }

    async fn mark_failed(&self, order_id: OrderId) -> Result<bool, DomainError> {
        self.settle_latest(order_id, PaymentStatus::Failed).await
    }

    async fn mark_expired(&self, payment_id: PaymentId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET status = 'EXPIRED', update_time = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(payment_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(db_error("mark payment expired"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_audit_log(&self, entry: PaymentAuditLog) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_audit_logs (order_id, user_id, payment_id, external_id, event, actor, create_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.order_id.as_i64())
        .bind(entry.user_id.map(|id| id.as_i64()))
        .bind(entry.payment_id.map(|id| id.as_i64()))
        .bind(entry.external_id.map(|id| id.to_string()))
        .bind(entry.event.as_str())
        .bind(entry.actor.as_str())
        .bind(entry.create_time.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("insert audit log"))?;

        Ok(())
    }

    async fn audit_logs_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<PaymentAuditLog>, DomainError> {
        let rows: Vec<AuditLogRow> = sqlx::query_as(
            r#"
            SELECT order_id, user_id, payment_id, external_id, event, actor, create_time
            FROM payment_audit_logs
            WHERE order_id = $1
            ORDER BY create_time ASC, id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch audit logs"))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn save_payment_anomaly(&self, anomaly: PaymentAnomaly) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_anomalies (order_id, external_id, anomaly_type, notes, status, create_time, update_time)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(anomaly.order_id.as_i64())
        .bind(anomaly.external_id.to_string())
        .bind(anomaly.anomaly_type as i32)
        .bind(&anomaly.notes)
        .bind(anomaly.status as i32)
        .bind(anomaly.create_time.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("save payment anomaly"))?;

        Ok(())
    }

    async fn save_failed_event(&self, event: FailedEvent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO failed_events (order_id, external_id, failed_type, status, notes, create_time, update_time)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(event.order_id.as_i64())
        .bind(event.external_id.to_string())
        .bind(event.failed_type as i32)
        .bind(event.status as i32)
        .bind(&event.notes)
        .bind(event.create_time.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("save failed event"))?;

        Ok(())
    }
}

impl PostgresPaymentRepository {
    /// PENDING → `target` on the order's most recent payment.
    async fn settle_latest(
        &self,
        order_id: OrderId,
        target: PaymentStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET status = $2, update_time = NOW()
            WHERE id = (
                SELECT id FROM payments
                WHERE order_id = $1
                ORDER BY create_time DESC, id DESC
                LIMIT 1
            )
            AND status = 'PENDING'
            "#,
        )
        .bind(order_id.as_i64())
        .bind(target.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("update payment status"))?;

        Ok(result.rows_affected() == 1)
    }
}

fn ensure_request_found(rows_affected: u64, id: PaymentRequestId) -> Result<(), DomainError> {
    if rows_affected == 0 {
        return Err(DomainError::new(
            ErrorCode::PaymentRequestNotFound,
            format!("Payment request {} not found", id),
        ));
    }
    Ok(())
}
