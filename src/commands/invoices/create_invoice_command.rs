use super::{CreateInvoiceRequest, InvoiceView};
use crate::{
    commands::{begin, finish, snapshot_gap_events, today, track_failure, Command},
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{
        delivery_note_entity, dnp_product_entity,
        invoice_entity::{self, InvoiceStatus},
        invoice_line_entity, quote_entity, quote_product_entity, DocumentKind,
    },
    services::{
        calculator::{calculate_totals, LineAmount},
        numbering::{current_year, map_insert_error, next_number, with_number_retry},
        snapshot::{self, SnapshotOutcome},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::Invoice;

/// Bills either a whole quote or what one delivery note shipped. VAT always
/// comes from the quote's stored rate.
#[derive(Debug, Clone)]
pub struct CreateInvoiceCommand {
    pub request: CreateInvoiceRequest,
    pub settings: DocumentSettings,
}

enum InvoiceSource {
    Quote(quote_entity::Model),
    DeliveryNote(quote_entity::Model, delivery_note_entity::Model),
}

impl InvoiceSource {
    fn quote(&self) -> &quote_entity::Model {
        match self {
            Self::Quote(quote) | Self::DeliveryNote(quote, _) => quote,
        }
    }

    fn delivery_note_id(&self) -> Option<Uuid> {
        match self {
            Self::Quote(_) => None,
            Self::DeliveryNote(_, note) => Some(note.id),
        }
    }

    /// Delivery notes bill at list value; the quote's reduction applies only
    /// when the quote itself is invoiced.
    fn reduction(&self) -> Decimal {
        match self {
            Self::Quote(quote) => quote.reduction,
            Self::DeliveryNote(..) => Decimal::ZERO,
        }
    }
}

#[async_trait]
impl Command for CreateInvoiceCommand {
    type Result = InvoiceView;

    #[instrument(skip(self, db_pool, event_sender), fields(quote_id = ?self.request.quote_id, delivery_note_id = ?self.request.delivery_note_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.request
            .validate()
            .map_err(|e| track_failure(KIND, e.into()))?;
        let (issue_date, due_date) = self.dates().map_err(|e| track_failure(KIND, e))?;

        let db = db_pool.as_ref();
        let view = with_number_retry(KIND, self.settings.number_retry_limit, |attempt| {
            debug!(attempt, "Creating invoice");
            self.create_invoice(db, issue_date, due_date)
        })
        .await
        .map_err(|e| track_failure(KIND, e))?;

        metrics::record_document_created(KIND);
        info!(
            invoice_id = %view.invoice.id,
            invoice_number = %view.invoice.invoice_number,
            lines = view.lines.len(),
            grand_total = %view.invoice.grand_total,
            "Invoice created"
        );

        let mut events = vec![Event::DocumentCreated {
            kind: KIND,
            id: view.invoice.id,
            number: view.invoice.invoice_number.clone(),
        }];
        events.extend(snapshot_gap_events(KIND, view.invoice.id, &view.warnings));
        event_sender.publish_all(events).await;

        Ok(view)
    }
}

impl CreateInvoiceCommand {
    fn dates(&self) -> Result<(NaiveDate, NaiveDate), ServiceError> {
        let issue_date = self.request.issue_date.unwrap_or_else(today);
        let due_date = match self.request.due_date {
            Some(date) => date,
            None => issue_date
                .checked_add_days(Days::new(u64::from(self.settings.invoice_due_days)))
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "issue_date {} is out of range",
                        issue_date
                    ))
                })?,
        };
        if due_date < issue_date {
            return Err(ServiceError::ValidationError(format!(
                "due_date {} is before issue_date {}",
                due_date, issue_date
            )));
        }
        Ok((issue_date, due_date))
    }

    async fn create_invoice(
        &self,
        db: &DbPool,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<InvoiceView, ServiceError> {
        let txn = begin(db).await?;
        let outcome = self.write(&txn, issue_date, due_date).await;
        finish(txn, outcome).await
    }

    async fn load_source(&self, txn: &DatabaseTransaction) -> Result<InvoiceSource, ServiceError> {
        match (self.request.quote_id, self.request.delivery_note_id) {
            (Some(quote_id), None) => Ok(InvoiceSource::Quote(load_quote(txn, quote_id).await?)),
            (None, Some(delivery_note_id)) => {
                let note = delivery_note_entity::Entity::find_by_id(delivery_note_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::ReferentialIntegrity(format!(
                            "delivery note {} does not exist",
                            delivery_note_id
                        ))
                    })?;
                if note.status.is_terminal() {
                    return Err(ServiceError::StateConflict(format!(
                        "delivery note {} is {}",
                        note.dnp_number, note.status
                    )));
                }

                let already_billed = invoice_entity::Entity::find()
                    .filter(invoice_entity::Column::DeliveryNoteId.eq(note.id))
                    .filter(invoice_entity::Column::Status.ne(InvoiceStatus::Cancelled))
                    .count(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if already_billed > 0 {
                    return Err(ServiceError::StateConflict(format!(
                        "delivery note {} is already invoiced",
                        note.dnp_number
                    )));
                }

                let quote_id = note.quote_id.ok_or_else(|| {
                    ServiceError::ReferentialIntegrity(format!(
                        "delivery note {} has no quote to bill against",
                        note.dnp_number
                    ))
                })?;
                let quote = load_quote(txn, quote_id).await?;
                Ok(InvoiceSource::DeliveryNote(quote, note))
            }
            _ => Err(ServiceError::ValidationError(
                "exactly one of quote_id and delivery_note_id is required".into(),
            )),
        }
    }

    async fn lines_for(
        &self,
        txn: &DatabaseTransaction,
        source: &InvoiceSource,
        invoice_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SnapshotOutcome<invoice_line_entity::ActiveModel>, ServiceError> {
        let vat_rate = source.quote().vat_rate;
        let outcome = match source {
            InvoiceSource::Quote(quote) => {
                let quote_lines = quote_product_entity::Entity::find()
                    .filter(quote_product_entity::Column::QuoteId.eq(quote.id))
                    .all(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                snapshot::invoice_lines_from_quote(invoice_id, &quote_lines, vat_rate, now)
            }
            InvoiceSource::DeliveryNote(_, note) => {
                let shipped = dnp_product_entity::Entity::find()
                    .filter(dnp_product_entity::Column::DeliveryNoteId.eq(note.id))
                    .all(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                snapshot::invoice_lines_from_delivery_note(invoice_id, &shipped, vat_rate, now)
            }
        };

        if outcome.records.is_empty() {
            return Err(ServiceError::StateConflict(
                "nothing to invoice: the source has no billable lines".into(),
            ));
        }
        Ok(outcome)
    }

    async fn write(
        &self,
        txn: &DatabaseTransaction,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<InvoiceView, ServiceError> {
        let source = self.load_source(txn).await?;
        let quote = source.quote();
        let (customer, customer_warning) = snapshot::ensure_quote_customer(txn, quote).await?;

        let invoice_number = next_number(txn, &self.settings.prefix, KIND, current_year()).await?;
        let now = Utc::now();
        let request = &self.request;

        // Totals are filled in once the lines exist
        let invoice = invoice_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_number: Set(invoice_number),
            quote_id: Set(quote.id),
            delivery_note_id: Set(source.delivery_note_id()),
            status: Set(InvoiceStatus::Draft),
            issue_date: Set(issue_date),
            due_date: Set(due_date),
            currency: Set(quote.currency),
            payment_terms: Set(request
                .payment_terms
                .clone()
                .or_else(|| quote.payment_terms.clone())),
            customer_name: Set(customer.company_name.clone()),
            customer_contact_person: Set(request
                .customer_contact_person
                .clone()
                .or_else(|| customer.contact_name.clone())),
            customer_email: Set(request.customer_email.clone().or_else(|| customer.email.clone())),
            customer_phone: Set(request.customer_phone.clone().or_else(|| customer.phone.clone())),
            customer_address: Set(customer.address.clone()),
            customer_vat: Set(request
                .customer_vat
                .clone()
                .or_else(|| customer.vat_number.clone())),
            supplier_vat_number: Set(request.supplier_vat_number.clone()),
            supplier_iso_certification: Set(request.supplier_iso_certification.clone()),
            vat_rate: Set(quote.vat_rate),
            sub_total: Set(Decimal::ZERO),
            discount_total: Set(Decimal::ZERO),
            tax_total: Set(Decimal::ZERO),
            grand_total: Set(Decimal::ZERO),
            notes: Set(request.notes.clone()),
            remarks: Set(request.remarks.clone()),
            created_by: Set(request.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| map_insert_error(KIND, e))?;

        let outcome = self.lines_for(txn, &source, invoice.id, now).await?;
        let mut lines = Vec::with_capacity(outcome.records.len());
        for record in outcome.records {
            lines.push(record.insert(txn).await.map_err(ServiceError::db_error)?);
        }

        let amounts: Vec<LineAmount> = lines
            .iter()
            .map(|line| LineAmount::new(line.quantity_invoiced, line.unit_price))
            .collect();
        let totals = calculate_totals(&amounts, source.reduction(), quote.vat_rate)?;

        let mut active: invoice_entity::ActiveModel = invoice.into();
        active.sub_total = Set(totals.subtotal);
        active.discount_total = Set(source.reduction());
        active.tax_total = Set(totals.vat_amount);
        active.grand_total = Set(totals.grand_total);
        let invoice = active.update(txn).await.map_err(ServiceError::db_error)?;

        let mut warnings: Vec<_> = customer_warning.into_iter().collect();
        warnings.extend(outcome.warnings);

        Ok(InvoiceView::new(invoice, lines, warnings, today()))
    }
}

async fn load_quote(
    txn: &DatabaseTransaction,
    quote_id: Uuid,
) -> Result<quote_entity::Model, ServiceError> {
    quote_entity::Entity::find_by_id(quote_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::ReferentialIntegrity(format!("quote {} does not exist", quote_id)))
}
