//! Order repository contract and SQLite implementation.
//!
//! # Invariants
//! - An order and its items are written together; callers run these calls
//!   inside one transaction.
//! - Revenue aggregates skip `CANCELLED` orders.
//! - Amount aggregates are exact; a sum past `i64::MAX` is
//!   `RepoError::AmountOverflow`, never a wrapped or rounded value.

use crate::model::order::{
    DailyOrderStatistics, NewOrderItem, Order, OrderId, OrderItem, OrderStatus, RevenueSummary,
    TopSellingBook,
};
use crate::repo::{
    count_to_u64, join_split_sum, push_window, split_sum_sql, RepoError, RepoResult,
    SortDirection,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ORDER_SELECT_SQL: &str = "SELECT
    id,
    total_amount,
    order_date,
    status
FROM orders";

const ORDER_ITEMS_SQL: &str = "SELECT
    oi.id,
    oi.book_id,
    b.title AS book_title,
    b.author AS book_author,
    oi.quantity,
    oi.price
FROM order_items oi
JOIN books b ON b.id = oi.book_id
WHERE oi.order_id = ?1
ORDER BY oi.id ASC;";

/// Inclusive `[start, end]` range of order dates in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPeriod {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderSort {
    Id,
    TotalAmount,
    Status,
    #[default]
    OrderDate,
}

impl OrderSort {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "id" => Some(Self::Id),
            "totalAmount" | "total_amount" => Some(Self::TotalAmount),
            "status" => Some(Self::Status),
            "orderDate" | "order_date" => Some(Self::OrderDate),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::TotalAmount => "total_amount",
            Self::Status => "status",
            Self::OrderDate => "order_date",
        }
    }
}

/// Filter, sort and window options for order lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub period: Option<OrderPeriod>,
    pub sort: OrderSort,
    pub direction: SortDirection,
    pub limit: Option<u32>,
    pub offset: u64,
}

/// Repository interface for order persistence and sales aggregates.
pub trait OrderRepository {
    fn create_order(
        &self,
        total_amount: i64,
        order_date: i64,
        status: OrderStatus,
        items: &[NewOrderItem],
    ) -> RepoResult<Order>;
    /// Loads the order with its items joined to their books.
    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>>;
    /// Replaces every line of the order and stores the new total.
    fn replace_items(
        &self,
        id: OrderId,
        total_amount: i64,
        items: &[NewOrderItem],
    ) -> RepoResult<()>;
    fn update_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()>;
    fn list_orders(&self, query: &OrderQuery) -> RepoResult<Vec<Order>>;
    fn count_orders(&self, query: &OrderQuery) -> RepoResult<u64>;
    fn count_by_status(&self, status: OrderStatus) -> RepoResult<u64>;
    fn revenue_summary(&self) -> RepoResult<RevenueSummary>;
    /// Per UTC day aggregates over every order placed in `period`.
    fn daily_statistics(&self, period: OrderPeriod) -> RepoResult<Vec<DailyOrderStatistics>>;
    fn top_selling_books(&self, limit: u32) -> RepoResult<Vec<TopSellingBook>>;
}

/// SQLite-backed order repository.
pub struct SqliteOrderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn insert_items(&self, order_id: OrderId, items: &[NewOrderItem]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO order_items (order_id, book_id, quantity, price)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        for item in items {
            stmt.execute(params![order_id, item.book_id, item.quantity, item.price])?;
        }
        Ok(())
    }

    fn load_items(&self, order_id: OrderId) -> RepoResult<Vec<OrderItem>> {
        let mut stmt = self.conn.prepare(ORDER_ITEMS_SQL)?;
        let mut rows = stmt.query([order_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_order_item_row(row)?);
        }
        Ok(items)
    }
}

impl OrderRepository for SqliteOrderRepository<'_> {
    fn create_order(
        &self,
        total_amount: i64,
        order_date: i64,
        status: OrderStatus,
        items: &[NewOrderItem],
    ) -> RepoResult<Order> {
        self.conn.execute(
            "INSERT INTO orders (total_amount, order_date, status)
             VALUES (?1, ?2, ?3);",
            params![total_amount, order_date, status.as_str()],
        )?;
        let id = self.conn.last_insert_rowid();
        self.insert_items(id, items)?;

        Ok(Order {
            id,
            total_amount,
            order_date,
            status,
            items: self.load_items(id)?,
        })
    }

    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ORDER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut order = parse_order_row(row)?;
        order.items = self.load_items(order.id)?;
        Ok(Some(order))
    }

    fn replace_items(
        &self,
        id: OrderId,
        total_amount: i64,
        items: &[NewOrderItem],
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE orders SET total_amount = ?1 WHERE id = ?2;",
            params![total_amount, id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "Order", id });
        }

        self.conn
            .execute("DELETE FROM order_items WHERE order_id = ?1;", [id])?;
        self.insert_items(id, items)
    }

    fn update_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE orders SET status = ?1 WHERE id = ?2;",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "Order", id });
        }
        Ok(())
    }

    fn list_orders(&self, query: &OrderQuery) -> RepoResult<Vec<Order>> {
        let mut sql = format!("{ORDER_SELECT_SQL} WHERE 1 = 1");
        let mut binds = Vec::new();
        push_order_filters(query, &mut sql, &mut binds);
        sql.push_str(&format!(
            " ORDER BY {} {}, id {}",
            query.sort.column(),
            query.direction.as_sql(),
            query.direction.as_sql()
        ));
        push_window(&mut sql, &mut binds, query.limit, query.offset);

        let mut orders = {
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(binds))?;
            let mut orders = Vec::new();
            while let Some(row) = rows.next()? {
                orders.push(parse_order_row(row)?);
            }
            orders
        };
        for order in &mut orders {
            order.items = self.load_items(order.id)?;
        }
        Ok(orders)
    }

    fn count_orders(&self, query: &OrderQuery) -> RepoResult<u64> {
        let mut sql = "SELECT COUNT(*) FROM orders WHERE 1 = 1".to_string();
        let mut binds = Vec::new();
        push_order_filters(query, &mut sql, &mut binds);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(count_to_u64(count))
    }

    fn count_by_status(&self, status: OrderStatus) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE status = ?1;",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count_to_u64(count))
    }

    fn revenue_summary(&self) -> RepoResult<RevenueSummary> {
        let (count, high, low) = self.conn.query_row(
            &format!(
                "SELECT COUNT(*), {}
                 FROM orders
                 WHERE status != 'CANCELLED';",
                split_sum_sql("total_amount")
            ),
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;
        let total_revenue = join_split_sum(high, low, "total revenue")?;
        Ok(RevenueSummary {
            total_revenue,
            average_order_amount: rounded_mean(total_revenue, count),
        })
    }

    fn daily_statistics(&self, period: OrderPeriod) -> RepoResult<Vec<DailyOrderStatistics>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                date(order_date / 1000, 'unixepoch') AS day,
                COUNT(*) AS order_count,
                {}
             FROM orders
             WHERE order_date BETWEEN ?1 AND ?2
             GROUP BY day
             ORDER BY day ASC;",
            split_sum_sql("total_amount")
        ))?;
        let rows = stmt
            .query_map(params![period.start, period.end], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(date, order_count, high, low)| {
                Ok(DailyOrderStatistics {
                    date,
                    order_count: count_to_u64(order_count),
                    total_amount: join_split_sum(high, low, "daily order total")?,
                })
            })
            .collect()
    }

    fn top_selling_books(&self, limit: u32) -> RepoResult<Vec<TopSellingBook>> {
        // Non-negative amounts order the same as their (high, low) halves.
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                b.id AS book_id,
                b.title AS book_title,
                b.author AS book_author,
                SUM(oi.quantity) AS total_quantity,
                {}
             FROM order_items oi
             JOIN books b ON b.id = oi.book_id
             JOIN orders o ON o.id = oi.order_id
             WHERE o.status != 'CANCELLED'
             GROUP BY b.id, b.title, b.author
             ORDER BY total_quantity DESC, 5 DESC, 6 DESC, b.id ASC
             LIMIT ?1;",
            split_sum_sql("oi.price * oi.quantity")
        ))?;
        let rows = stmt
            .query_map([i64::from(limit)], |row| {
                Ok((
                    TopSellingBook {
                        book_id: row.get("book_id")?,
                        book_title: row.get("book_title")?,
                        book_author: row.get("book_author")?,
                        total_quantity: count_to_u64(row.get("total_quantity")?),
                        total_revenue: 0,
                    },
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut book, high, low)| {
                book.total_revenue = join_split_sum(high, low, "book revenue")?;
                Ok(book)
            })
            .collect()
    }
}

/// Mean of `count` amounts summing to `total`, rounded half away from zero.
fn rounded_mean(total: i64, count: i64) -> i64 {
    if count <= 0 {
        return 0;
    }
    let (total, count) = (i128::from(total), i128::from(count));
    let mean = (2 * total.abs() + count) / (2 * count);
    // |mean| <= |total|, so it fits back in an i64.
    i64::try_from(if total < 0 { -mean } else { mean }).unwrap_or(i64::MAX)
}

fn push_order_filters(query: &OrderQuery, sql: &mut String, binds: &mut Vec<Value>) {
    if let Some(status) = query.status {
        sql.push_str(" AND status = ?");
        binds.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(period) = query.period {
        sql.push_str(" AND order_date BETWEEN ? AND ?");
        binds.push(Value::Integer(period.start));
        binds.push(Value::Integer(period.end));
    }
}

fn parse_order_row(row: &Row<'_>) -> RepoResult<Order> {
    let status_text: String = row.get("status")?;
    let status = status_text
        .parse::<OrderStatus>()
        .map_err(|err| RepoError::InvalidData(format!("{err} in orders.status")))?;

    Ok(Order {
        id: row.get("id")?,
        total_amount: row.get("total_amount")?,
        order_date: row.get("order_date")?,
        status,
        items: Vec::new(),
    })
}

fn parse_order_item_row(row: &Row<'_>) -> RepoResult<OrderItem> {
    let quantity: i64 = row.get("quantity")?;
    let quantity = u32::try_from(quantity).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid quantity `{quantity}` in order_items.quantity"
        ))
    })?;

    Ok(OrderItem {
        id: row.get("id")?,
        book_id: row.get("book_id")?,
        book_title: row.get("book_title")?,
        book_author: row.get("book_author")?,
        quantity,
        price: row.get("price")?,
    })
}

#[cfg(test)]
mod tests {
    use super::rounded_mean;

    #[test]
    fn mean_rounds_half_away_from_zero() {
        assert_eq!(rounded_mean(0, 0), 0);
        assert_eq!(rounded_mean(5, 2), 3);
        assert_eq!(rounded_mean(4, 3), 1);
        assert_eq!(rounded_mean(i64::MAX, 1), i64::MAX);
    }
}
