//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, UpdateResult,
};

use crate::domain::outbox::OutboxMessage;
use crate::domain::reservation::{
    HotelWindow, Reservation, ReservationDraft, ReservationFilter, ReservationRepository,
    ReservationStatus, StayInterval,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::reservation;
use crate::infrastructure::database::migrator::{
    POSTGRES_OVERLAP_CONSTRAINT, SQLITE_OVERLAP_MARKER,
};
use crate::shared::types::{PaginatedResult, PaginationParams};

use super::db_err;
use super::outbox_repository::domain_to_active as outbox_to_active;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    let status: ReservationStatus = m
        .status
        .parse()
        .map_err(|_| DomainError::Storage(format!("reservation {} has status '{}'", m.id, m.status)))?;

    // SQLite hands decimals back as REAL; restore the money scale.
    let mut total_price = m.total_price;
    total_price.rescale(2);

    Ok(Reservation {
        id: m.id,
        hotel_id: m.hotel_id,
        room_id: m.room_id,
        guest_name: m.guest_name,
        guest_email: m.guest_email,
        guest_phone: m.guest_phone,
        check_in: m.check_in,
        check_out: m.check_out,
        number_of_guests: m.number_of_guests,
        total_price,
        special_requests: m.special_requests,
        status,
        active: m.active,
        version: m.version,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn models_to_domain(models: Vec<reservation::Model>) -> DomainResult<Vec<Reservation>> {
    models.into_iter().map(model_to_domain).collect()
}

/// Whether the database rejected a write through the room overlap guard
pub fn is_overlap_violation(e: &DbErr) -> bool {
    let message = e.to_string();
    message.contains(SQLITE_OVERLAP_MARKER) || message.contains(POSTGRES_OVERLAP_CONSTRAINT)
}

/// Map a write error, turning overlap guard rejections into `Conflict`.
/// The conflicting ids are unknown at this level.
fn write_err(e: DbErr, room_id: i64, check_in: NaiveDate, check_out: NaiveDate) -> DomainError {
    if is_overlap_violation(&e) {
        debug!("Overlap guard rejected write on room {}", room_id);
        DomainError::Conflict {
            room_id,
            check_in,
            check_out,
            conflicting_ids: Vec::new(),
        }
    } else {
        db_err(e)
    }
}

fn blocking_statuses() -> impl Iterator<Item = &'static str> {
    ReservationStatus::BLOCKING.into_iter().map(|s| s.as_str())
}

fn filter_condition(filter: &ReservationFilter) -> Condition {
    let mut condition = Condition::all().add(reservation::Column::Active.eq(true));

    if let Some(hotel_id) = filter.hotel_id {
        condition = condition.add(reservation::Column::HotelId.eq(hotel_id));
    }
    if let Some(room_id) = filter.room_id {
        condition = condition.add(reservation::Column::RoomId.eq(room_id));
    }
    if let Some(email) = &filter.guest_email {
        condition = condition.add(reservation::Column::GuestEmail.eq(email.as_str()));
    }
    if let Some(name) = filter.guest_name_fragment() {
        condition = condition.add(
            Expr::expr(Func::lower(Expr::col(reservation::Column::GuestName)))
                .like(format!("%{}%", name)),
        );
    }
    if let Some(status) = filter.status {
        condition = condition.add(reservation::Column::Status.eq(status.as_str()));
    }
    if let Some(from) = filter.check_in_from {
        condition = condition.add(reservation::Column::CheckIn.gte(from));
    }
    if let Some(to) = filter.check_in_to {
        condition = condition.add(reservation::Column::CheckIn.lte(to));
    }
    if let Some(min) = filter.min_price {
        condition = condition.add(reservation::Column::TotalPrice.gte(min));
    }
    if let Some(max) = filter.max_price {
        condition = condition.add(reservation::Column::TotalPrice.lte(max));
    }
    condition
}

fn window_condition(window: HotelWindow) -> Condition {
    let condition = Condition::all().add(reservation::Column::Status.is_in(blocking_statuses()));
    match window {
        HotelWindow::Upcoming(today) => condition.add(reservation::Column::CheckIn.gte(today)),
        HotelWindow::CheckInsOn(day) => condition.add(reservation::Column::CheckIn.eq(day)),
        HotelWindow::CheckOutsOn(day) => condition.add(reservation::Column::CheckOut.eq(day)),
        HotelWindow::Overdue(today) => condition.add(reservation::Column::CheckOut.lt(today)),
    }
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn insert_booked(
        &self,
        draft: ReservationDraft,
        now: DateTime<Utc>,
        dispatch_after: DateTime<Utc>,
    ) -> DomainResult<(Reservation, OutboxMessage)> {
        let (room_id, check_in, check_out) = (draft.room_id, draft.check_in, draft.check_out);
        debug!("Booking room {} for [{}, {})", room_id, check_in, check_out);

        let txn = self.db.begin().await.map_err(db_err)?;

        let model = reservation::ActiveModel {
            hotel_id: Set(draft.hotel_id),
            room_id: Set(draft.room_id),
            guest_name: Set(draft.guest_name),
            guest_email: Set(draft.guest_email),
            guest_phone: Set(draft.guest_phone),
            check_in: Set(draft.check_in),
            check_out: Set(draft.check_out),
            number_of_guests: Set(draft.number_of_guests),
            total_price: Set(draft.total_price),
            special_requests: Set(draft.special_requests),
            status: Set(ReservationStatus::Pending.as_str().to_string()),
            active: Set(true),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        // Dropping `txn` on any early return rolls the transaction back.
        let inserted = model
            .insert(&txn)
            .await
            .map_err(|e| write_err(e, room_id, check_in, check_out))?;
        let reservation = model_to_domain(inserted)?;

        let message = OutboxMessage::reservation_booked(&reservation, now, dispatch_after)?;
        outbox_to_active(&message)
            .insert(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok((reservation, message))
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .filter(reservation::Column::Active.eq(true))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn find_overlapping(
        &self,
        room_id: i64,
        interval: StayInterval,
        exclude_id: Option<i64>,
    ) -> DomainResult<Vec<Reservation>> {
        let mut query = reservation::Entity::find()
            .filter(reservation::Column::RoomId.eq(room_id))
            .filter(reservation::Column::Active.eq(true))
            .filter(reservation::Column::Status.is_in(blocking_statuses()))
            .filter(reservation::Column::CheckIn.lt(interval.check_out()))
            .filter(reservation::Column::CheckOut.gt(interval.check_in()));

        if let Some(exclude_id) = exclude_id {
            query = query.filter(reservation::Column::Id.ne(exclude_id));
        }

        let models = query
            .order_by_asc(reservation::Column::CheckIn)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn update_versioned(
        &self,
        mut r: Reservation,
        expected_version: i64,
    ) -> DomainResult<Reservation> {
        debug!("Updating reservation {} at version {}", r.id, expected_version);

        let next_version = expected_version + 1;
        let changes = reservation::ActiveModel {
            hotel_id: Set(r.hotel_id),
            room_id: Set(r.room_id),
            guest_name: Set(r.guest_name.clone()),
            guest_email: Set(r.guest_email.clone()),
            guest_phone: Set(r.guest_phone.clone()),
            check_in: Set(r.check_in),
            check_out: Set(r.check_out),
            number_of_guests: Set(r.number_of_guests),
            total_price: Set(r.total_price),
            special_requests: Set(r.special_requests.clone()),
            status: Set(r.status.as_str().to_string()),
            version: Set(next_version),
            updated_at: Set(r.updated_at),
            ..Default::default()
        };

        let result: UpdateResult = reservation::Entity::update_many()
            .set(changes)
            .filter(reservation::Column::Id.eq(r.id))
            .filter(reservation::Column::Version.eq(expected_version))
            .filter(reservation::Column::Active.eq(true))
            .exec(&self.db)
            .await
            .map_err(|e| write_err(e, r.room_id, r.check_in, r.check_out))?;

        if result.rows_affected == 0 {
            return match self.find_by_id(r.id).await? {
                None => Err(DomainError::reservation_not_found(r.id)),
                Some(_) => Err(DomainError::StaleWrite {
                    id: r.id,
                    expected_version,
                }),
            };
        }

        r.version = next_version;
        Ok(r)
    }

    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> DomainResult<bool> {
        debug!("Soft-deleting reservation {}", id);

        let result: UpdateResult = reservation::Entity::update_many()
            .col_expr(reservation::Column::Active, Expr::value(false))
            .col_expr(
                reservation::Column::Version,
                Expr::col(reservation::Column::Version).add(1),
            )
            .col_expr(reservation::Column::UpdatedAt, Expr::value(now))
            .filter(reservation::Column::Id.eq(id))
            .filter(reservation::Column::Active.eq(true))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn find_page(
        &self,
        filter: ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let query = reservation::Entity::find()
            .filter(filter_condition(&filter))
            .order_by_desc(reservation::Column::CreatedAt)
            .order_by_desc(reservation::Column::Id);

        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let models = query
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PaginatedResult::new(
            models_to_domain(models)?,
            total,
            page.page,
            page.limit,
        ))
    }

    async fn find_by_hotel(
        &self,
        hotel_id: i64,
        window: Option<HotelWindow>,
    ) -> DomainResult<Vec<Reservation>> {
        let mut query = reservation::Entity::find()
            .filter(reservation::Column::HotelId.eq(hotel_id))
            .filter(reservation::Column::Active.eq(true));

        if let Some(window) = window {
            query = query.filter(window_condition(window));
        }

        let models = query
            .order_by_asc(reservation::Column::CheckIn)
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::model::tests::{date, sample_draft};
    use crate::domain::reservation::LifecycleAction;
    use crate::domain::OutboxStatus;
    use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;
    use crate::infrastructure::database::{init_database, migrator::Migrator, DatabaseConfig};
    use crate::domain::RepositoryProvider;
    use sea_orm_migration::MigratorTrait;

    async fn provider() -> SeaOrmRepositoryProvider {
        let db = init_database(&DatabaseConfig::sqlite_in_memory())
            .await
            .unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmRepositoryProvider::new(db)
    }

    async fn book(repos: &SeaOrmRepositoryProvider, room: i64, a: &str, b: &str) -> DomainResult<Reservation> {
        let now = Utc::now();
        repos
            .reservations()
            .insert_booked(sample_draft(room, a, b), now, now)
            .await
            .map(|(r, _)| r)
    }

    #[tokio::test]
    async fn insert_writes_reservation_and_outbox_row() {
        let repos = provider().await;
        let now = Utc::now();
        let (r, msg) = repos
            .reservations()
            .insert_booked(sample_draft(3, "2024-07-01", "2024-07-03"), now, now)
            .await
            .unwrap();

        assert!(r.id > 0);
        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.total_price.to_string(), "250.00");
        assert_eq!(msg.aggregate_id, r.id);

        let stored = repos.outbox().find_by_id(msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Pending);
        assert_eq!(stored.payload["reservation_id"], r.id);
    }

    #[tokio::test]
    async fn trigger_rejects_overlap_and_writes_nothing() {
        let repos = provider().await;
        book(&repos, 3, "2024-06-01", "2024-06-05").await.unwrap();

        let err = book(&repos, 3, "2024-06-04", "2024-06-06").await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { room_id: 3, .. }));

        // Back-to-back and other rooms are fine
        book(&repos, 3, "2024-06-05", "2024-06-08").await.unwrap();
        book(&repos, 4, "2024-06-04", "2024-06-06").await.unwrap();

        let stats = repos.outbox().stats().await.unwrap();
        assert_eq!(stats.pending, 3);
    }

    #[tokio::test]
    async fn cancelled_and_deleted_rows_free_the_room() {
        let repos = provider().await;
        let mut first = book(&repos, 5, "2024-06-01", "2024-06-05").await.unwrap();
        first.transition(LifecycleAction::Cancel, Utc::now()).unwrap();
        let version = first.version;
        repos.reservations().update_versioned(first, version).await.unwrap();

        let second = book(&repos, 5, "2024-06-02", "2024-06-04").await.unwrap();
        assert!(repos.reservations().soft_delete(second.id, Utc::now()).await.unwrap());
        assert!(!repos.reservations().soft_delete(second.id, Utc::now()).await.unwrap());
        assert!(repos.reservations().find_by_id(second.id).await.unwrap().is_none());

        book(&repos, 5, "2024-06-01", "2024-06-05").await.unwrap();
    }

    #[tokio::test]
    async fn update_into_occupied_interval_is_a_conflict() {
        let repos = provider().await;
        book(&repos, 6, "2024-06-01", "2024-06-05").await.unwrap();
        let mut other = book(&repos, 6, "2024-06-10", "2024-06-12").await.unwrap();

        other.check_in = date("2024-06-03");
        let version = other.version;
        let err = repos.reservations().update_versioned(other, version).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let repos = provider().await;
        let r = book(&repos, 7, "2024-06-01", "2024-06-05").await.unwrap();

        let mut confirmed = r.clone();
        confirmed.transition(LifecycleAction::Confirm, Utc::now()).unwrap();
        let updated = repos.reservations().update_versioned(confirmed, 0).await.unwrap();
        assert_eq!(updated.version, 1);

        let mut cancelled = r.clone();
        cancelled.transition(LifecycleAction::Cancel, Utc::now()).unwrap();
        let err = repos.reservations().update_versioned(cancelled, 0).await.unwrap_err();
        assert!(matches!(err, DomainError::StaleWrite { expected_version: 0, .. }));

        let mut missing = r;
        missing.id = 9999;
        let err = repos.reservations().update_versioned(missing, 0).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn overlapping_query_and_hotel_windows() {
        let repos = provider().await;
        let a = book(&repos, 8, "2024-06-01", "2024-06-05").await.unwrap();
        book(&repos, 8, "2024-06-05", "2024-06-07").await.unwrap();

        let wanted = StayInterval::new(date("2024-06-04"), date("2024-06-06")).unwrap();
        let hits = repos.reservations().find_overlapping(8, wanted, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        let hits = repos.reservations().find_overlapping(8, wanted, Some(a.id)).await.unwrap();
        assert_eq!(hits.len(), 1);

        let check_ins = repos
            .reservations()
            .find_by_hotel(1, Some(HotelWindow::CheckInsOn(date("2024-06-05"))))
            .await
            .unwrap();
        assert_eq!(check_ins.len(), 1);

        let page = repos
            .reservations()
            .find_page(
                ReservationFilter {
                    room_id: Some(8),
                    ..Default::default()
                },
                PaginationParams::new(1, 1),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 2);
    }

    async fn book_as(
        repos: &SeaOrmRepositoryProvider,
        room: i64,
        check_in: &str,
        guest: &str,
        price: &str,
    ) -> Reservation {
        let check_out = (date(check_in) + chrono::Duration::days(2)).to_string();
        let mut draft = sample_draft(room, check_in, &check_out);
        draft.guest_name = guest.to_string();
        draft.total_price = price.parse().unwrap();
        let now = Utc::now();
        repos.reservations().insert_booked(draft, now, now).await.unwrap().0
    }

    async fn matching(repos: &SeaOrmRepositoryProvider, filter: ReservationFilter) -> Vec<i64> {
        let mut ids: Vec<i64> = repos
            .reservations()
            .find_page(filter, PaginationParams::new(1, 50))
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn page_filters_by_name_check_in_and_price() {
        let repos = provider().await;
        let ada = book_as(&repos, 11, "2024-06-01", "Ada Lovelace", "99.50").await;
        let grace = book_as(&repos, 12, "2024-06-10", "Grace Hopper", "250.00").await;
        let alan = book_as(&repos, 13, "2024-06-20", "Alan Turing", "1200.00").await;

        let by_name = ReservationFilter {
            guest_name: Some("  LOVE ".into()),
            ..Default::default()
        };
        assert_eq!(matching(&repos, by_name).await, vec![ada.id]);

        let by_check_in = ReservationFilter {
            check_in_from: Some(date("2024-06-10")),
            check_in_to: Some(date("2024-06-20")),
            ..Default::default()
        };
        assert_eq!(matching(&repos, by_check_in).await, vec![grace.id, alan.id]);

        // Numeric, not lexical: "1200.00" < "250.00" as text
        let by_price = ReservationFilter {
            min_price: Some("250".parse().unwrap()),
            max_price: Some("1200.00".parse().unwrap()),
            ..Default::default()
        };
        assert_eq!(matching(&repos, by_price).await, vec![grace.id, alan.id]);

        let cheap = ReservationFilter {
            max_price: Some("100".parse().unwrap()),
            ..Default::default()
        };
        assert_eq!(matching(&repos, cheap).await, vec![ada.id]);

        let combined = ReservationFilter {
            guest_name: Some("a".into()),
            check_in_to: Some(date("2024-06-10")),
            min_price: Some("100".parse().unwrap()),
            ..Default::default()
        };
        assert_eq!(matching(&repos, combined).await, vec![grace.id]);

        let blank_name = ReservationFilter {
            guest_name: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(matching(&repos, blank_name).await.len(), 3);
    }

    #[tokio::test]
    async fn outbox_failures_reschedule_then_dead_letter() {
        let repos = provider().await;
        let now = Utc::now();
        let (_, msg) = repos
            .reservations()
            .insert_booked(sample_draft(9, "2024-07-01", "2024-07-03"), now, now)
            .await
            .unwrap();

        let later = now + chrono::Duration::seconds(60);
        repos.outbox().record_failure(msg.id, "bus down", later, false).await.unwrap();
        assert!(repos.outbox().find_due(now, 10).await.unwrap().is_empty());

        let due = repos.outbox().find_due(later, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].attempts, 1);
        assert_eq!(due[0].last_error.as_deref(), Some("bus down"));

        repos.outbox().record_failure(msg.id, "bus down", later, true).await.unwrap();
        let stored = repos.outbox().find_by_id(msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Failed);
        assert_eq!(stored.attempts, 2);

        // Dead letters are not resurrected by a late publish
        repos.outbox().mark_published(msg.id, later).await.unwrap();
        let stats = repos.outbox().stats().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.published, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn file_backed_store_admits_one_of_many_concurrent_bookings() {
        use crate::application::{
            create_event_bus, create_publisher, BookingCoordinator, EventEmitter, PublisherKind,
        };
        use crate::shared::retry::RetryConfig;
        use std::sync::Arc;

        let path = std::env::temp_dir().join(format!("reservations-{}.db", uuid::Uuid::new_v4()));
        let mut config = DatabaseConfig::sqlite(&path.to_string_lossy());
        config.max_connections = 8;
        let db = init_database(&config).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let publisher = create_publisher(PublisherKind::Log, "reservation-events", create_event_bus(4));
        let coordinator = Arc::new(BookingCoordinator::new(
            repos.clone(),
            EventEmitter::new(repos.clone(), publisher, RetryConfig::default()),
            chrono::Duration::seconds(30),
        ));

        let attempts = 16;
        let tasks: Vec<_> = (0..attempts)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .create_reservation(sample_draft(11, "2024-07-01", "2024-07-03"))
                        .await
                })
            })
            .collect();

        let (mut ok, mut conflicts) = (0, 0);
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DomainError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, attempts - 1);

        // Two stays moved into the same free slot at once: one wins
        let a = coordinator
            .create_reservation(sample_draft(12, "2024-07-01", "2024-07-03"))
            .await
            .unwrap();
        let b = coordinator
            .create_reservation(sample_draft(12, "2024-07-10", "2024-07-12"))
            .await
            .unwrap();
        let moves: Vec<_> = [a.id, b.id]
            .into_iter()
            .map(|id| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .update_reservation(id, sample_draft(12, "2024-07-20", "2024-07-22"), None)
                        .await
                })
            })
            .collect();
        let mut outcomes = Vec::new();
        for task in moves {
            outcomes.push(task.await.unwrap());
        }
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(DomainError::Conflict { .. }))));

        let slot = StayInterval::new(date("2024-07-20"), date("2024-07-22")).unwrap();
        assert_eq!(repos.reservations().find_overlapping(12, slot, None).await.unwrap().len(), 1);

        db.close().await.unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
