//! In-memory storage implementation
//!
//! Used by tests and by `database.url = "memory://"`. Room exclusivity is
//! enforced under a per-room lock: the overlap scan and the write happen
//! while the lock is held, so concurrent bookings of one room serialize.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::outbox::{OutboxMessage, OutboxRepository, OutboxStats, OutboxStatus};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::{
    HotelWindow, Reservation, ReservationDraft, ReservationFilter, ReservationRepository,
    StayInterval,
};
use crate::domain::{DomainError, DomainResult};
use crate::shared::types::{PaginatedResult, PaginationParams};

type OutboxTable = Arc<DashMap<Uuid, OutboxMessage>>;

// ── Reservations ────────────────────────────────────────────────

pub struct InMemoryReservationRepository {
    reservations: DashMap<i64, Reservation>,
    room_locks: DashMap<i64, Arc<Mutex<()>>>,
    next_id: AtomicI64,
    outbox: OutboxTable,
}

impl InMemoryReservationRepository {
    fn new(outbox: OutboxTable) -> Self {
        Self {
            reservations: DashMap::new(),
            room_locks: DashMap::new(),
            next_id: AtomicI64::new(1),
            outbox,
        }
    }

    fn room_lock(&self, room_id: i64) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn overlapping(
        &self,
        room_id: i64,
        interval: &StayInterval,
        exclude_id: Option<i64>,
    ) -> Vec<Reservation> {
        let mut hits: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| Some(r.id) != exclude_id && r.occupies(room_id, interval))
            .map(|r| r.value().clone())
            .collect();
        hits.sort_by_key(|r| (r.check_in, r.id));
        hits
    }

    fn insert_locked(
        &self,
        draft: ReservationDraft,
        now: DateTime<Utc>,
        dispatch_after: DateTime<Utc>,
    ) -> DomainResult<(Reservation, OutboxMessage)> {
        let interval = StayInterval::new(draft.check_in, draft.check_out)?;
        let lock = self.room_lock(draft.room_id);
        let _guard = lock_room(&lock)?;

        let conflicts = self.overlapping(draft.room_id, &interval, None);
        if !conflicts.is_empty() {
            return Err(DomainError::Conflict {
                room_id: draft.room_id,
                check_in: draft.check_in,
                check_out: draft.check_out,
                conflicting_ids: conflicts.iter().map(|r| r.id).collect(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let reservation = Reservation::from_draft(id, draft, now);
        let message = OutboxMessage::reservation_booked(&reservation, now, dispatch_after)?;

        self.reservations.insert(id, reservation.clone());
        self.outbox.insert(message.id, message.clone());
        Ok((reservation, message))
    }

    fn update_locked(&self, mut r: Reservation, expected_version: i64) -> DomainResult<Reservation> {
        let current_room = self
            .reservations
            .get(&r.id)
            .filter(|stored| stored.active)
            .map(|stored| stored.room_id)
            .ok_or_else(|| DomainError::reservation_not_found(r.id))?;

        // Lock both rooms when moving, always in ascending order.
        let mut rooms = vec![current_room, r.room_id];
        rooms.sort_unstable();
        rooms.dedup();
        let locks: Vec<Arc<Mutex<()>>> = rooms.iter().map(|room| self.room_lock(*room)).collect();
        let _guards = locks
            .iter()
            .map(lock_room)
            .collect::<DomainResult<Vec<_>>>()?;

        if r.holds_room() {
            let interval = r.interval()?;
            let conflicts = self.overlapping(r.room_id, &interval, Some(r.id));
            if !conflicts.is_empty() {
                return Err(DomainError::Conflict {
                    room_id: r.room_id,
                    check_in: r.check_in,
                    check_out: r.check_out,
                    conflicting_ids: conflicts.iter().map(|c| c.id).collect(),
                });
            }
        }

        let mut stored = self
            .reservations
            .get_mut(&r.id)
            .filter(|stored| stored.active)
            .ok_or_else(|| DomainError::reservation_not_found(r.id))?;

        if stored.version != expected_version {
            return Err(DomainError::StaleWrite {
                id: r.id,
                expected_version,
            });
        }

        r.version = expected_version + 1;
        r.active = true;
        r.created_at = stored.created_at;
        *stored = r.clone();
        Ok(r)
    }
}

fn lock_room(lock: &Arc<Mutex<()>>) -> DomainResult<MutexGuard<'_, ()>> {
    lock.lock()
        .map_err(|_| DomainError::Storage("room lock poisoned".to_string()))
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn insert_booked(
        &self,
        draft: ReservationDraft,
        now: DateTime<Utc>,
        dispatch_after: DateTime<Utc>,
    ) -> DomainResult<(Reservation, OutboxMessage)> {
        self.insert_locked(draft, now, dispatch_after)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>> {
        Ok(self
            .reservations
            .get(&id)
            .filter(|r| r.active)
            .map(|r| r.value().clone()))
    }

    async fn find_overlapping(
        &self,
        room_id: i64,
        interval: StayInterval,
        exclude_id: Option<i64>,
    ) -> DomainResult<Vec<Reservation>> {
        Ok(self.overlapping(room_id, &interval, exclude_id))
    }

    async fn update_versioned(
        &self,
        reservation: Reservation,
        expected_version: i64,
    ) -> DomainResult<Reservation> {
        self.update_locked(reservation, expected_version)
    }

    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> DomainResult<bool> {
        match self.reservations.get_mut(&id) {
            Some(mut r) if r.active => {
                r.active = false;
                r.version += 1;
                r.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_page(
        &self,
        filter: ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let mut matching: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.value().clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn find_by_hotel(
        &self,
        hotel_id: i64,
        window: Option<HotelWindow>,
    ) -> DomainResult<Vec<Reservation>> {
        let mut matching: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.active && r.hotel_id == hotel_id)
            .filter(|r| window.map_or(true, |w| w.matches(r)))
            .map(|r| r.value().clone())
            .collect();
        matching.sort_by_key(|r| (r.check_in, r.id));
        Ok(matching)
    }
}

// ── Outbox ──────────────────────────────────────────────────────

pub struct InMemoryOutboxRepository {
    messages: OutboxTable,
}

#[async_trait]
impl OutboxRepository for InMemoryOutboxRepository {
    async fn find_due(&self, now: DateTime<Utc>, limit: u64) -> DomainResult<Vec<OutboxMessage>> {
        let mut due: Vec<OutboxMessage> = self
            .messages
            .iter()
            .filter(|m| m.is_due(now))
            .map(|m| m.value().clone())
            .collect();
        due.sort_by_key(|m| m.created_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<OutboxMessage>> {
        Ok(self.messages.get(&id).map(|m| m.value().clone()))
    }

    async fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(mut m) = self.messages.get_mut(&id) {
            if m.status == OutboxStatus::Pending {
                m.status = OutboxStatus::Published;
                m.published_at = Some(at);
            }
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
        give_up: bool,
    ) -> DomainResult<()> {
        if let Some(mut m) = self.messages.get_mut(&id) {
            if m.status == OutboxStatus::Pending {
                m.attempts += 1;
                m.last_error = Some(error.to_string());
                m.next_attempt_at = next_attempt_at;
                if give_up {
                    m.status = OutboxStatus::Failed;
                }
            }
        }
        Ok(())
    }

    async fn stats(&self) -> DomainResult<OutboxStats> {
        let mut stats = OutboxStats::default();
        for m in self.messages.iter() {
            match m.status {
                OutboxStatus::Pending => stats.pending += 1,
                OutboxStatus::Published => stats.published += 1,
                OutboxStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}

// ── Provider ────────────────────────────────────────────────────

/// In-memory repository provider for development and testing
pub struct InMemoryRepositoryProvider {
    reservations: InMemoryReservationRepository,
    outbox: InMemoryOutboxRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        let messages: OutboxTable = Arc::new(DashMap::new());
        Self {
            reservations: InMemoryReservationRepository::new(messages.clone()),
            outbox: InMemoryOutboxRepository { messages },
        }
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn outbox(&self) -> &dyn OutboxRepository {
        &self.outbox
    }
}
