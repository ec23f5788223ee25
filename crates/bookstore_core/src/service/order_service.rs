//! Order placement, lifecycle and sales reporting use cases.
//!
//! # Invariants
//! - Each requested book id becomes one line with quantity 1 at the book's
//!   current price.
//! - Only `PENDING` orders accept item changes.
//! - `DELIVERED` and `CANCELLED` are final states.

use crate::clock::Clock;
use crate::event::{DomainEvent, EventBus};
use crate::model::book::{Book, BookId};
use crate::model::order::{
    order_total, DailyOrderStatistics, NewOrderItem, Order, OrderId, OrderStatistics, OrderStatus,
    TopSellingBook,
};
use crate::model::page::{Page, PageRequest, PAGE_SIZE_MAX};
use crate::model::validation::ValidationError;
use crate::repo::book_repo::BookRepository;
use crate::repo::order_repo::{OrderPeriod, OrderQuery, OrderRepository, OrderSort};
use crate::repo::SortDirection;
use crate::service::error::{ServiceError, ServiceResult, INVALID_ORDER_STATE};
use log::info;
use std::sync::Arc;

pub const DEFAULT_TOP_BOOKS: u32 = 10;

/// Sort options shared by the paged order lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderSorting {
    pub sort: OrderSort,
    pub direction: SortDirection,
}

pub struct OrderService<O: OrderRepository, B: BookRepository> {
    orders: O,
    books: B,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl<O: OrderRepository, B: BookRepository> OrderService<O, B> {
    pub fn new(orders: O, books: B, events: Arc<EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            orders,
            books,
            events,
            clock,
        }
    }

    /// Places a `PENDING` order for the given books.
    pub fn create_order(&self, book_ids: &[BookId]) -> ServiceResult<Order> {
        let books = self.resolve_books(book_ids)?;
        let items = order_lines(&books);
        let total = checked_total(&items)?;

        let order =
            self.orders
                .create_order(total, self.clock.now_ms(), OrderStatus::Pending, &items)?;
        info!(
            "event=order_create module=service status=ok order_id={} items={} total={}",
            order.id,
            order.items.len(),
            order.total_amount
        );

        self.events.publish(&DomainEvent::OrderPlaced {
            order_id: order.id,
            total_amount: order.total_amount,
            book_titles: books.into_iter().map(|book| book.title).collect(),
        });
        Ok(order)
    }

    pub fn get_order(&self, id: OrderId) -> ServiceResult<Order> {
        self.orders
            .get_order(id)?
            .ok_or_else(|| ServiceError::not_found("Order", id))
    }

    pub fn list_orders(
        &self,
        request: PageRequest,
        sorting: OrderSorting,
    ) -> ServiceResult<Page<Order>> {
        self.page(OrderQuery::default(), request, sorting)
    }

    /// Replaces the lines of a pending order and recomputes its total.
    pub fn update_items(&self, id: OrderId, book_ids: &[BookId]) -> ServiceResult<Order> {
        let order = self.get_order(id)?;
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::invalid_state(
                INVALID_ORDER_STATE,
                format!("only PENDING orders can be modified; order {id} is {}", order.status),
            ));
        }

        let books = self.resolve_books(book_ids)?;
        let items = order_lines(&books);
        self.orders.replace_items(id, checked_total(&items)?, &items)?;
        info!(
            "event=order_update module=service status=ok order_id={id} items={}",
            items.len()
        );
        self.get_order(id)
    }

    /// Moves an order to `status`. Entering `SHIPPED` publishes `OrderShipped`.
    ///
    /// Any move between non-final states is allowed, backwards included.
    /// `DELIVERED` and `CANCELLED` orders refuse every change except a repeat
    /// of their current status, which returns the order unchanged; other
    /// targets fail with `INVALID_ORDER_STATE`.
    pub fn update_status(&self, id: OrderId, status: OrderStatus) -> ServiceResult<Order> {
        let mut order = self.get_order(id)?;
        if order.status == status {
            return Ok(order);
        }
        if matches!(order.status, OrderStatus::Delivered | OrderStatus::Cancelled) {
            return Err(ServiceError::invalid_state(
                INVALID_ORDER_STATE,
                format!("order {id} is {} and can no longer change", order.status),
            ));
        }

        let from = order.status;
        self.orders.update_status(id, status)?;
        order.status = status;
        info!("event=order_status module=service status=ok order_id={id} from={from} to={status}");

        if status == OrderStatus::Shipped {
            self.events
                .publish(&DomainEvent::OrderShipped { order_id: order.id });
        }
        Ok(order)
    }

    pub fn cancel_order(&self, id: OrderId) -> ServiceResult<Order> {
        let mut order = self.get_order(id)?;
        if !order.status.is_cancellable() {
            return Err(ServiceError::invalid_state(
                INVALID_ORDER_STATE,
                format!("order {id} is {} and cannot be cancelled", order.status),
            ));
        }

        self.orders.update_status(id, OrderStatus::Cancelled)?;
        order.status = OrderStatus::Cancelled;
        info!("event=order_cancel module=service status=ok order_id={id}");
        Ok(order)
    }

    pub fn orders_by_status(
        &self,
        status: OrderStatus,
        request: PageRequest,
        sorting: OrderSorting,
    ) -> ServiceResult<Page<Order>> {
        self.page(
            OrderQuery {
                status: Some(status),
                ..OrderQuery::default()
            },
            request,
            sorting,
        )
    }

    /// Orders placed within `[start, end]`, both inclusive.
    pub fn orders_by_period(
        &self,
        start: i64,
        end: i64,
        request: PageRequest,
        sorting: OrderSorting,
    ) -> ServiceResult<Page<Order>> {
        let period = check_period(start, end)?;
        self.page(
            OrderQuery {
                period: Some(period),
                ..OrderQuery::default()
            },
            request,
            sorting,
        )
    }

    pub fn statistics(&self) -> ServiceResult<OrderStatistics> {
        let total_orders = self.orders.count_orders(&OrderQuery::default())?;
        let revenue = self.orders.revenue_summary()?;
        Ok(OrderStatistics {
            total_orders,
            pending_orders: self.orders.count_by_status(OrderStatus::Pending)?,
            confirmed_orders: self.orders.count_by_status(OrderStatus::Confirmed)?,
            shipped_orders: self.orders.count_by_status(OrderStatus::Shipped)?,
            delivered_orders: self.orders.count_by_status(OrderStatus::Delivered)?,
            cancelled_orders: self.orders.count_by_status(OrderStatus::Cancelled)?,
            total_revenue: revenue.total_revenue,
            average_order_amount: revenue.average_order_amount,
        })
    }

    pub fn daily_statistics(&self, start: i64, end: i64) -> ServiceResult<Vec<DailyOrderStatistics>> {
        let period = check_period(start, end)?;
        Ok(self.orders.daily_statistics(period)?)
    }

    /// Best sellers by quantity; `limit` falls back to 10 and is capped at 100.
    pub fn top_selling_books(&self, limit: Option<u32>) -> ServiceResult<Vec<TopSellingBook>> {
        let limit = match limit {
            None | Some(0) => DEFAULT_TOP_BOOKS,
            Some(value) => value.min(PAGE_SIZE_MAX),
        };
        Ok(self.orders.top_selling_books(limit)?)
    }

    fn resolve_books(&self, book_ids: &[BookId]) -> ServiceResult<Vec<Book>> {
        if book_ids.is_empty() {
            return Err(ServiceError::Validation(ValidationError::single(
                "bookIds",
                None,
                "at least one book is required",
            )));
        }

        let mut books = Vec::with_capacity(book_ids.len());
        for &book_id in book_ids {
            let book = self
                .books
                .get_book(book_id, false)?
                .ok_or_else(|| ServiceError::not_found("Book", book_id))?;
            books.push(book);
        }
        Ok(books)
    }

    fn page(
        &self,
        mut query: OrderQuery,
        request: PageRequest,
        sorting: OrderSorting,
    ) -> ServiceResult<Page<Order>> {
        let total = self.orders.count_orders(&query)?;
        query.sort = sorting.sort;
        query.direction = sorting.direction;
        query.limit = Some(request.size);
        query.offset = request.offset();
        Ok(Page::new(self.orders.list_orders(&query)?, request, total))
    }
}

fn order_lines(books: &[Book]) -> Vec<NewOrderItem> {
    books
        .iter()
        .map(|book| NewOrderItem {
            book_id: book.id,
            quantity: 1,
            price: book.price,
        })
        .collect()
}

fn checked_total(items: &[NewOrderItem]) -> ServiceResult<i64> {
    order_total(items).ok_or_else(|| {
        ServiceError::Validation(ValidationError::single(
            "bookIds",
            None,
            "order total exceeds the largest supported amount",
        ))
    })
}

fn check_period(start: i64, end: i64) -> ServiceResult<OrderPeriod> {
    if start > end {
        return Err(ServiceError::Validation(ValidationError::single(
            "startDate",
            Some(&start.to_string()),
            "startDate must not be after endDate",
        )));
    }
    Ok(OrderPeriod { start, end })
}
