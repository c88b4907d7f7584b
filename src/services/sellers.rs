use crate::{
    entities::{
        seller, seller_request, user, BusinessType, RequestStatus, Role, Seller, SellerModel,
        SellerRequest, SellerRequestModel, SellerStatus, User, UserModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{templates, Mailer},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const DEFAULT_COMMISSION_RATE: u32 = 10;

/// Seller onboarding workflow and profile management.
///
/// Requests live in their own table and are retained as an audit record
/// after review. Approval creates the seller profile (or re-activates a
/// previously suspended one) and promotes the owning user to the seller
/// role.
#[derive(Clone)]
pub struct SellerService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    mailer: Arc<dyn Mailer>,
    client_url: String,
    admin_email: Option<String>,
}

impl SellerService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
        client_url: String,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            db,
            event_sender,
            mailer,
            client_url,
            admin_email,
        }
    }

    /// Submit an application to become a seller. Fails with conflict while an
    /// earlier request is still open.
    #[instrument(skip(self, input))]
    pub async fn submit_request(
        &self,
        user_id: Uuid,
        input: SubmitRequestInput,
    ) -> Result<SellerRequestModel, ServiceError> {
        input.validate()?;

        let open = SellerRequest::find()
            .filter(seller_request::Column::UserId.eq(user_id))
            .filter(
                seller_request::Column::Status
                    .is_in([RequestStatus::Pending, RequestStatus::UnderReview]),
            )
            .one(&*self.db)
            .await?;
        if open.is_some() {
            return Err(ServiceError::Conflict(
                "You already have a pending request".to_string(),
            ));
        }

        let request = seller_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            business_name: Set(input.business_name.clone()),
            business_type: Set(input.business_type),
            description: Set(input.description),
            business_address: Set(input.business_address),
            contact_info: Set(input.contact_info),
            documents: Set(input.documents),
            status: Set(RequestStatus::Pending),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            review_notes: Set(None),
            rejection_reason: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let request = request.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::SellerRequestSubmitted(request.id))
            .await;

        // Best-effort notices to the requester and the admin inbox.
        if let Ok(requester) = self.load_user(user_id).await {
            self.send_or_warn(
                &requester.email,
                "Seller Request Received",
                &templates::seller_request_received(&requester.name),
            )
            .await;

            if let Some(admin_email) = self.admin_email.clone() {
                self.send_or_warn(
                    &admin_email,
                    "New Seller Request Submitted",
                    &templates::seller_request_admin_alert(
                        &requester.name,
                        &requester.email,
                        &input.business_name,
                    ),
                )
                .await;
            }
        }

        info!(request_id = %request.id, %user_id, "seller request submitted");
        Ok(request)
    }

    /// Open (pending or under-review) requests, newest first, with requester
    /// identity for the admin review queue.
    pub async fn open_requests(&self) -> Result<Vec<RequestWithUser>, ServiceError> {
        let requests = SellerRequest::find()
            .filter(
                seller_request::Column::Status
                    .is_in([RequestStatus::Pending, RequestStatus::UnderReview]),
            )
            .order_by_desc(seller_request::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            let user = User::find_by_id(request.user_id).one(&*self.db).await?;
            out.push(RequestWithUser {
                request,
                user: user.map(|u| UserSummary {
                    id: u.id,
                    name: u.name,
                    email: u.email,
                }),
            });
        }
        Ok(out)
    }

    /// Approve a request: stamp the review, create or re-activate the seller
    /// profile carrying over the business profile, and promote the user.
    #[instrument(skip(self))]
    pub async fn approve_request(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
    ) -> Result<SellerRequestModel, ServiceError> {
        let request = self.load_open_request(request_id).await?;
        let requester = self.load_user(request.user_id).await?;

        let txn = self.db.begin().await?;

        let mut active: seller_request::ActiveModel = request.clone().into();
        active.status = Set(RequestStatus::Approved);
        active.reviewed_by = Set(Some(admin_id));
        active.reviewed_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        let request = active.update(&txn).await?;

        Self::upsert_profile(&txn, &request).await?;

        let mut user_active: user::ActiveModel = requester.clone().into();
        user_active.role = Set(Role::Seller);
        user_active.updated_at = Set(Utc::now());
        user_active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::SellerRequestApproved(request.id))
            .await;

        let dashboard_url = format!("{}/seller-dashboard.html", self.client_url);
        self.send_or_warn(
            &requester.email,
            "Seller Request Approved",
            &templates::seller_request_approved(&requester.name, &dashboard_url),
        )
        .await;

        info!(request_id = %request.id, "seller request approved");
        Ok(request)
    }

    /// Reject a request with a reason; the requester is notified.
    #[instrument(skip(self))]
    pub async fn reject_request(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        reason: Option<String>,
    ) -> Result<SellerRequestModel, ServiceError> {
        let request = self.load_open_request(request_id).await?;
        let requester = self.load_user(request.user_id).await?;

        let reason_text = reason.unwrap_or_else(|| "Rejected by admin".to_string());

        let mut active: seller_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Rejected);
        active.reviewed_by = Set(Some(admin_id));
        active.reviewed_at = Set(Some(Utc::now()));
        active.rejection_reason = Set(Some(reason_text.clone()));
        active.updated_at = Set(Utc::now());
        let request = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::SellerRequestRejected(request.id))
            .await;

        self.send_or_warn(
            &requester.email,
            "Seller Request Rejected",
            &templates::seller_request_rejected(&requester.name, &reason_text),
        )
        .await;

        Ok(request)
    }

    /// The caller's own seller profile.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<SellerModel, ServiceError> {
        Seller::find()
            .filter(seller::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Seller profile not found".to_string()))
    }

    /// Aggregate stats for the seller dashboard.
    pub async fn dashboard(&self, user_id: Uuid) -> Result<SellerDashboard, ServiceError> {
        let profile = self.get_profile(user_id).await?;
        Ok(SellerDashboard {
            business_name: profile.business_name,
            total_products: profile.total_products,
            total_sales: profile.total_sales,
            total_revenue: profile.total_revenue,
            average_rating: profile.average_rating,
        })
    }

    /// Bump the product counter when a seller lists a new title.
    pub async fn record_product_added(&self, seller_id: Uuid) -> Result<(), ServiceError> {
        let profile = Seller::find_by_id(seller_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Seller profile not found".to_string()))?;

        let count = profile.total_products + 1;
        let mut active: seller::ActiveModel = profile.into();
        active.total_products = Set(count);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        Ok(())
    }

    // Admin surface

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<SellerModel>, u64), ServiceError> {
        let paginator = Seller::find()
            .order_by_desc(seller::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let sellers = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((sellers, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<SellerModel, ServiceError> {
        Seller::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Seller not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: SellerStatus,
    ) -> Result<SellerModel, ServiceError> {
        let profile = self.get(id).await?;
        let mut active: seller::ActiveModel = profile.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Commission is a percentage and stays within [0, 50].
    #[instrument(skip(self))]
    pub async fn update_commission(
        &self,
        id: Uuid,
        commission_rate: Decimal,
    ) -> Result<SellerModel, ServiceError> {
        if commission_rate < Decimal::ZERO || commission_rate > Decimal::from(50) {
            return Err(ServiceError::ValidationError(
                "Commission rate must be between 0 and 50".to_string(),
            ));
        }

        let profile = self.get(id).await?;
        let mut active: seller::ActiveModel = profile.into();
        active.commission_rate = Set(commission_rate);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn toggle_active(&self, id: Uuid) -> Result<SellerModel, ServiceError> {
        let profile = self.get(id).await?;
        let was_active = profile.is_active;
        let mut active: seller::ActiveModel = profile.into();
        active.is_active = Set(!was_active);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(Seller::find().count(&*self.db).await?)
    }

    pub async fn pending_request_count(&self) -> Result<u64, ServiceError> {
        Ok(SellerRequest::find()
            .filter(seller_request::Column::Status.eq(RequestStatus::Pending))
            .count(&*self.db)
            .await?)
    }

    async fn load_open_request(
        &self,
        request_id: Uuid,
    ) -> Result<SellerRequestModel, ServiceError> {
        let request = SellerRequest::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Seller request not found".to_string()))?;

        if !request.status.is_open() {
            return Err(ServiceError::InvalidOperation(
                "Seller request has already been reviewed".to_string(),
            ));
        }

        Ok(request)
    }

    async fn load_user(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// Create the profile from the approved request, or promote an existing
    /// row back to approved, carrying the business profile over.
    async fn upsert_profile(
        conn: &impl ConnectionTrait,
        request: &SellerRequestModel,
    ) -> Result<(), ServiceError> {
        let existing = Seller::find()
            .filter(seller::Column::UserId.eq(request.user_id))
            .one(conn)
            .await?;

        match existing {
            Some(profile) => {
                let mut active: seller::ActiveModel = profile.into();
                active.business_name = Set(request.business_name.clone());
                active.business_type = Set(request.business_type);
                active.description = Set(Some(request.description.clone()));
                active.business_address = Set(request.business_address.clone());
                active.contact_info = Set(request.contact_info.clone());
                active.documents = Set(request.documents.clone());
                active.status = Set(SellerStatus::Approved);
                active.is_active = Set(true);
                active.updated_at = Set(Utc::now());
                active.update(conn).await?;
            }
            None => {
                seller::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(request.user_id),
                    business_name: Set(request.business_name.clone()),
                    business_type: Set(request.business_type),
                    description: Set(Some(request.description.clone())),
                    business_address: Set(request.business_address.clone()),
                    contact_info: Set(request.contact_info.clone()),
                    documents: Set(request.documents.clone()),
                    status: Set(SellerStatus::Approved),
                    commission_rate: Set(Decimal::from(DEFAULT_COMMISSION_RATE)),
                    total_products: Set(0),
                    total_sales: Set(0),
                    total_revenue: Set(Decimal::ZERO),
                    average_rating: Set(0.0),
                    is_active: Set(true),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                }
                .insert(conn)
                .await?;
            }
        }

        Ok(())
    }

    async fn send_or_warn(&self, to: &str, subject: &str, html: &str) {
        if let Err(e) = self.mailer.send(to, subject, html).await {
            warn!(%to, %subject, error = %e, "notification email not sent");
        }
    }
}

/// Seller application input
#[derive(Debug, Deserialize)]
pub struct SubmitRequestInput {
    pub business_name: String,
    pub business_type: BusinessType,
    pub description: String,
    pub business_address: Option<serde_json::Value>,
    pub contact_info: Option<serde_json::Value>,
    pub documents: Option<serde_json::Value>,
}

impl SubmitRequestInput {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.business_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Business name is required".to_string(),
            ));
        }
        if self.business_name.len() > 100 {
            return Err(ServiceError::ValidationError(
                "Business name cannot be more than 100 characters".to_string(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Business description is required".to_string(),
            ));
        }
        if self.description.len() > 1000 {
            return Err(ServiceError::ValidationError(
                "Description cannot be more than 1000 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Request joined with its requester, for the admin review queue.
#[derive(Debug, Serialize)]
pub struct RequestWithUser {
    #[serde(flatten)]
    pub request: SellerRequestModel,
    pub user: Option<UserSummary>,
}

/// Seller dashboard stats
#[derive(Debug, Serialize)]
pub struct SellerDashboard {
    pub business_name: String,
    pub total_products: i32,
    pub total_sales: i32,
    pub total_revenue: Decimal,
    pub average_rating: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_input_validation() {
        let mut input = SubmitRequestInput {
            business_name: "Paper Trails".to_string(),
            business_type: BusinessType::Bookstore,
            description: "Independent bookstore".to_string(),
            business_address: None,
            contact_info: None,
            documents: None,
        };
        assert!(input.validate().is_ok());

        input.business_name = "".to_string();
        assert!(input.validate().is_err());

        input.business_name = "x".repeat(101);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_open_statuses_block_resubmission() {
        assert!(RequestStatus::Pending.is_open());
        assert!(RequestStatus::UnderReview.is_open());
        assert!(!RequestStatus::Approved.is_open());
        assert!(!RequestStatus::Rejected.is_open());
    }
}
