//! Read-side queries: listings, hotel windows and statistics

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{
    DomainResult, HotelWindow, RepositoryProvider, Reservation, ReservationFilter,
    ReservationStatus,
};
use crate::shared::types::{PaginatedResult, PaginationParams};

/// Aggregates over a hotel's active reservations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelStatistics {
    pub hotel_id: i64,
    pub total_reservations: u64,
    /// Keyed by status name; every status is present
    pub by_status: BTreeMap<&'static str, u64>,
    /// `None` when the hotel has no reservations
    pub average_price: Option<Decimal>,
    pub total_revenue: Decimal,
}

#[derive(Clone)]
pub struct ReservationQueries {
    repos: Arc<dyn RepositoryProvider>,
}

impl ReservationQueries {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn list(
        &self,
        filter: ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        filter.validate()?;
        self.repos.reservations().find_page(filter, page).await
    }

    pub async fn upcoming(&self, hotel_id: i64, today: NaiveDate) -> DomainResult<Vec<Reservation>> {
        self.window(hotel_id, HotelWindow::Upcoming(today)).await
    }

    pub async fn check_ins_on(&self, hotel_id: i64, day: NaiveDate) -> DomainResult<Vec<Reservation>> {
        self.window(hotel_id, HotelWindow::CheckInsOn(day)).await
    }

    pub async fn check_outs_on(&self, hotel_id: i64, day: NaiveDate) -> DomainResult<Vec<Reservation>> {
        self.window(hotel_id, HotelWindow::CheckOutsOn(day)).await
    }

    pub async fn overdue(&self, hotel_id: i64, today: NaiveDate) -> DomainResult<Vec<Reservation>> {
        self.window(hotel_id, HotelWindow::Overdue(today)).await
    }

    async fn window(&self, hotel_id: i64, window: HotelWindow) -> DomainResult<Vec<Reservation>> {
        self.repos
            .reservations()
            .find_by_hotel(hotel_id, Some(window))
            .await
    }

    pub async fn statistics(&self, hotel_id: i64) -> DomainResult<HotelStatistics> {
        let reservations = self.repos.reservations().find_by_hotel(hotel_id, None).await?;
        Ok(summarize(hotel_id, &reservations))
    }
}

fn summarize(hotel_id: i64, reservations: &[Reservation]) -> HotelStatistics {
    let mut by_status: BTreeMap<&'static str, u64> = ReservationStatus::ALL
        .into_iter()
        .map(|s| (s.as_str(), 0))
        .collect();
    let mut total_revenue = Decimal::ZERO;

    for r in reservations {
        *by_status.entry(r.status.as_str()).or_default() += 1;
        total_revenue += r.total_price;
    }

    let total = reservations.len() as u64;
    let average_price = (total > 0).then(|| (total_revenue / Decimal::from(total)).round_dp(2));

    HotelStatistics {
        hotel_id,
        total_reservations: total,
        by_status,
        average_price,
        total_revenue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::coordinator::tests::coordinator;
    use crate::application::booking::LifecycleService;
    use crate::domain::reservation::model::tests::{date, sample_draft};

    #[tokio::test]
    async fn hotel_windows() {
        let (coordinator, repos) = coordinator();
        let queries = ReservationQueries::new(repos.clone());
        let lifecycle = LifecycleService::new(repos);

        let past = coordinator
            .create_reservation(sample_draft(1, "2024-05-01", "2024-05-03"))
            .await
            .unwrap();
        let arriving = coordinator
            .create_reservation(sample_draft(2, "2024-06-10", "2024-06-12"))
            .await
            .unwrap();
        let leaving = coordinator
            .create_reservation(sample_draft(3, "2024-06-08", "2024-06-10"))
            .await
            .unwrap();
        let later = coordinator
            .create_reservation(sample_draft(4, "2024-07-01", "2024-07-03"))
            .await
            .unwrap();
        let cancelled = coordinator
            .create_reservation(sample_draft(5, "2024-06-10", "2024-06-11"))
            .await
            .unwrap();
        lifecycle.cancel(cancelled.id).await.unwrap();

        let today = date("2024-06-10");
        let ids = |rs: Vec<Reservation>| rs.into_iter().map(|r| r.id).collect::<Vec<_>>();

        assert_eq!(ids(queries.upcoming(1, today).await.unwrap()), vec![arriving.id, later.id]);
        assert_eq!(ids(queries.check_ins_on(1, today).await.unwrap()), vec![arriving.id]);
        assert_eq!(ids(queries.check_outs_on(1, today).await.unwrap()), vec![leaving.id]);
        assert_eq!(ids(queries.overdue(1, today).await.unwrap()), vec![past.id]);
        assert!(queries.upcoming(2, today).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn statistics_cover_every_active_reservation() {
        let (coordinator, repos) = coordinator();
        let queries = ReservationQueries::new(repos.clone());
        let lifecycle = LifecycleService::new(repos);

        let mut cheap = sample_draft(1, "2024-06-01", "2024-06-02");
        cheap.total_price = Decimal::new(10000, 2);
        let a = coordinator.create_reservation(cheap).await.unwrap();
        let b = coordinator
            .create_reservation(sample_draft(2, "2024-06-01", "2024-06-02"))
            .await
            .unwrap();
        let deleted = coordinator
            .create_reservation(sample_draft(3, "2024-06-01", "2024-06-02"))
            .await
            .unwrap();
        lifecycle.confirm(a.id).await.unwrap();
        lifecycle.cancel(b.id).await.unwrap();
        coordinator.delete_reservation(deleted.id).await.unwrap();

        let stats = queries.statistics(1).await.unwrap();
        assert_eq!(stats.total_reservations, 2);
        assert_eq!(stats.by_status["Confirmed"], 1);
        assert_eq!(stats.by_status["Cancelled"], 1);
        assert_eq!(stats.by_status["Pending"], 0);
        assert_eq!(stats.total_revenue, Decimal::new(35000, 2));
        assert_eq!(stats.average_price, Some(Decimal::new(17500, 2)));

        let empty = queries.statistics(42).await.unwrap();
        assert_eq!(empty.total_reservations, 0);
        assert_eq!(empty.average_price, None);
    }

    #[tokio::test]
    async fn listing_is_paginated_newest_first() {
        let (coordinator, repos) = coordinator();
        let queries = ReservationQueries::new(repos);
        let mut created = Vec::new();
        for room in 1..=5 {
            created.push(
                coordinator
                    .create_reservation(sample_draft(room, "2024-06-01", "2024-06-02"))
                    .await
                    .unwrap()
                    .id,
            );
        }

        let page = queries
            .list(ReservationFilter::default(), PaginationParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, created[4]);

        let by_room = queries
            .list(
                ReservationFilter {
                    room_id: Some(3),
                    ..Default::default()
                },
                PaginationParams::new(1, 10),
            )
            .await
            .unwrap();
        assert_eq!(by_room.items.len(), 1);
        assert_eq!(by_room.items[0].id, created[2]);
    }

    #[tokio::test]
    async fn listing_filters_by_name_check_in_and_price() {
        let (coordinator, repos) = coordinator();
        let queries = ReservationQueries::new(repos);

        let mut grace = sample_draft(1, "2024-06-01", "2024-06-03");
        grace.guest_name = "Grace Hopper".into();
        grace.total_price = Decimal::new(12000, 2);
        let grace = coordinator.create_reservation(grace).await.unwrap();
        let ada = coordinator
            .create_reservation(sample_draft(2, "2024-06-15", "2024-06-17"))
            .await
            .unwrap();
        let mut late = sample_draft(3, "2024-08-01", "2024-08-03");
        late.total_price = Decimal::new(90000, 2);
        let late = coordinator.create_reservation(late).await.unwrap();

        let list = |filter: ReservationFilter| {
            let queries = queries.clone();
            async move {
                queries
                    .list(filter, PaginationParams::new(1, 10))
                    .await
                    .unwrap()
                    .items
                    .into_iter()
                    .map(|r| r.id)
                    .collect::<Vec<_>>()
            }
        };

        let by_name = list(ReservationFilter {
            guest_name: Some("hopper".into()),
            ..Default::default()
        })
        .await;
        assert_eq!(by_name, vec![grace.id]);

        let june = list(ReservationFilter {
            check_in_from: Some(date("2024-06-01")),
            check_in_to: Some(date("2024-06-15")),
            ..Default::default()
        })
        .await;
        assert_eq!(june, vec![ada.id, grace.id]);

        let mid_priced = list(ReservationFilter {
            min_price: Some(Decimal::new(200, 0)),
            max_price: Some(Decimal::new(900, 0)),
            ..Default::default()
        })
        .await;
        assert_eq!(mid_priced, vec![late.id, ada.id]);

        let inverted = queries
            .list(
                ReservationFilter {
                    min_price: Some(Decimal::new(900, 0)),
                    max_price: Some(Decimal::new(200, 0)),
                    ..Default::default()
                },
                PaginationParams::new(1, 10),
            )
            .await
            .unwrap_err();
        assert!(matches!(inverted, crate::domain::DomainError::Validation { field: "maxPrice", .. }));
    }
}
