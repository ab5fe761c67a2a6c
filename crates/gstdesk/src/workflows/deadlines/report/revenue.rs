use std::collections::BTreeMap;

use chrono::Datelike;

use super::super::domain::{ClientId, Invoice, InvoiceStatus, Money};
use super::trend::month_label;
use super::views::{RevenueData, RevenueTrend, TopClient};

const TOP_CLIENT_LIMIT: usize = 5;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    count: u32,
    total: Money,
    paid: Money,
}

impl Tally {
    fn add(&mut self, invoice: &Invoice) {
        self.count += 1;
        self.total = self.total.saturating_add(invoice.amount);
        if invoice.status == InvoiceStatus::Paid {
            self.paid = self.paid.saturating_add(invoice.amount);
        }
    }

    fn pending(&self) -> Money {
        Money(self.total.0.saturating_sub(self.paid.0))
    }
}

/// Group invoices issued in `year` by issue month.
///
/// `client_names` resolves display names for the top-client table; ids without
/// a name fall back to the id itself.
pub(crate) fn build_revenue_trend(
    year: i32,
    invoices: &[Invoice],
    client_names: &BTreeMap<ClientId, String>,
) -> RevenueTrend {
    let mut by_month = [Tally::default(); 12];
    let mut by_client: BTreeMap<&ClientId, Tally> = BTreeMap::new();

    for invoice in invoices.iter().filter(|invoice| invoice.issued_on.year() == year) {
        by_month[invoice.issued_on.month0() as usize].add(invoice);
        by_client.entry(&invoice.client_id).or_default().add(invoice);
    }

    let months: Vec<RevenueData> = by_month
        .iter()
        .enumerate()
        .map(|(index, tally)| {
            let month = index as u32 + 1;
            RevenueData {
                month,
                label: month_label(year, month),
                invoice_count: tally.count,
                total: tally.total,
                paid: tally.paid,
                pending: tally.pending(),
            }
        })
        .collect();

    let yearly = by_month.iter().fold(Tally::default(), |mut acc, tally| {
        acc.count += tally.count;
        acc.total = acc.total.saturating_add(tally.total);
        acc.paid = acc.paid.saturating_add(tally.paid);
        acc
    });

    let mut top_clients: Vec<TopClient> = by_client
        .into_iter()
        .map(|(client_id, tally)| TopClient {
            client_id: client_id.clone(),
            client_name: client_names
                .get(client_id)
                .cloned()
                .unwrap_or_else(|| client_id.0.clone()),
            invoice_count: tally.count,
            total_billed: tally.total,
        })
        .collect();
    top_clients.sort_by(|a, b| {
        b.total_billed
            .cmp(&a.total_billed)
            .then_with(|| a.client_name.cmp(&b.client_name))
            .then_with(|| a.client_id.cmp(&b.client_id))
    });
    top_clients.truncate(TOP_CLIENT_LIMIT);

    RevenueTrend {
        year,
        months,
        yearly_total: yearly.total,
        yearly_paid: yearly.paid,
        yearly_pending: yearly.pending(),
        top_clients,
    }
}
