//! Back-office reports.
//!
//! Pure functions over loaded documents. Cancelled orders never count
//! towards revenue or units sold.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use shopdesk_core::{CustomerId, Document, DomainError, DomainResult, OrderId, ProductId};
use shopdesk_products::{Product, ProductStatus};
use shopdesk_sales::{Order, OrderStatus, PaymentStatus};
use shopdesk_settings::StoreSettings;

/// Longest range `sales_by_day` will expand.
pub const MAX_REPORT_DAYS: i64 = 366;

const RECENT_ORDERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentOrder {
    pub id: OrderId,
    pub number: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub total: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub currency: String,
    pub total_revenue: u64,
    pub paid_revenue: u64,
    pub revenue_last_30_days: u64,
    pub order_count: usize,
    pub orders_by_status: BTreeMap<OrderStatus, usize>,
    pub customer_count: usize,
    pub product_count: usize,
    pub average_order_value: u64,
    pub low_stock: Vec<LowStockProduct>,
    pub recent_orders: Vec<RecentOrder>,
}

fn counts(order: &Order) -> bool {
    order.status() != OrderStatus::Cancelled
}

pub fn dashboard_summary(
    orders: &[Order],
    products: &[Product],
    customer_count: usize,
    settings: &StoreSettings,
    now: DateTime<Utc>,
) -> DashboardSummary {
    let window_start = now - Duration::days(30);

    let mut orders_by_status: BTreeMap<OrderStatus, usize> =
        OrderStatus::ALL.iter().map(|s| (*s, 0)).collect();
    let mut total_revenue = 0u64;
    let mut paid_revenue = 0u64;
    let mut revenue_last_30_days = 0u64;
    let mut counted = 0u64;

    for order in orders {
        *orders_by_status.entry(order.status()).or_default() += 1;
        if !counts(order) {
            continue;
        }
        let total = order.totals().total;
        counted += 1;
        total_revenue = total_revenue.saturating_add(total);
        if order.payment_status() == PaymentStatus::Paid {
            paid_revenue = paid_revenue.saturating_add(total);
        }
        if order.created_at() >= window_start {
            revenue_last_30_days = revenue_last_30_days.saturating_add(total);
        }
    }

    let mut low_stock: Vec<LowStockProduct> = products
        .iter()
        .filter(|p| p.status() == ProductStatus::Active && p.is_low_stock(settings.low_stock_threshold))
        .map(|p| LowStockProduct {
            id: p.id(),
            sku: p.sku().to_string(),
            name: p.name().to_string(),
            stock: p.stock(),
        })
        .collect();
    low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.sku.cmp(&b.sku)));

    let mut recent: Vec<&Order> = orders.iter().collect();
    recent.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    let recent_orders = recent
        .into_iter()
        .take(RECENT_ORDERS)
        .map(|o| RecentOrder {
            id: o.id(),
            number: o.number().to_string(),
            customer_id: o.customer_id(),
            status: o.status(),
            total: o.totals().total,
            created_at: o.created_at(),
        })
        .collect();

    DashboardSummary {
        currency: settings.currency.clone(),
        total_revenue,
        paid_revenue,
        revenue_last_30_days,
        order_count: orders.len(),
        orders_by_status,
        customer_count,
        product_count: products.len(),
        average_order_value: total_revenue.checked_div(counted).unwrap_or(0),
        low_stock,
        recent_orders,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: usize,
    pub revenue: u64,
}

/// Revenue per calendar day (UTC) for `from..=to`. Days without orders are
/// reported as zero.
pub fn sales_by_day(orders: &[Order], from: NaiveDate, to: NaiveDate) -> DomainResult<Vec<DailySales>> {
    if from > to {
        return Err(DomainError::validation("'from' must not be after 'to'"));
    }
    if (to - from).num_days() >= MAX_REPORT_DAYS {
        return Err(DomainError::validation(format!(
            "date range is limited to {MAX_REPORT_DAYS} days"
        )));
    }

    let mut days: BTreeMap<NaiveDate, DailySales> = from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|date| {
            (
                date,
                DailySales {
                    date,
                    orders: 0,
                    revenue: 0,
                },
            )
        })
        .collect();

    for order in orders.iter().filter(|o| counts(o)) {
        if let Some(day) = days.get_mut(&order.created_at().date_naive()) {
            day.orders += 1;
            day.revenue = day.revenue.saturating_add(order.totals().total);
        }
    }

    Ok(days.into_values().collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: u64,
    pub revenue: u64,
}

/// Best sellers by units sold, then revenue.
pub fn top_products(orders: &[Order], limit: usize) -> Vec<ProductSales> {
    let mut by_product: HashMap<ProductId, ProductSales> = HashMap::new();

    for line in orders.iter().filter(|o| counts(o)).flat_map(|o| o.lines()) {
        let entry = by_product.entry(line.product_id).or_insert_with(|| ProductSales {
            product_id: line.product_id,
            sku: line.sku.clone(),
            name: line.name.clone(),
            quantity: 0,
            revenue: 0,
        });
        entry.quantity += u64::from(line.quantity);
        entry.revenue = entry
            .revenue
            .saturating_add(u64::from(line.quantity).saturating_mul(line.unit_price));
    }

    let mut ranked: Vec<ProductSales> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.sku.cmp(&b.sku))
    });
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerStats {
    pub order_count: usize,
    pub lifetime_spend: u64,
    pub last_order_at: Option<DateTime<Utc>>,
}

pub fn customer_stats(orders: &[Order], customer_id: CustomerId) -> CustomerStats {
    let own: Vec<&Order> = orders.iter().filter(|o| o.customer_id() == customer_id).collect();
    CustomerStats {
        order_count: own.len(),
        lifetime_spend: own
            .iter()
            .filter(|o| counts(o))
            .fold(0u64, |acc, o| acc.saturating_add(o.totals().total)),
        last_order_at: own.iter().map(|o| o.created_at()).max(),
    }
}
