use async_graphql::{Context, Enum, ID, InputObject, Object, SimpleObject};
use chrono::{DateTime, Utc};
use entity::{Deal, DealStatus, Document, Message, Notification, NotificationKind, User, UserRole};
use products_deals::{AnalyticsSummary, DealRoom, PriceChange, PriceDirection, format_amount};

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum DealStatusValue {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl From<DealStatus> for DealStatusValue {
    fn from(value: DealStatus) -> Self {
        match value {
            DealStatus::Pending => Self::Pending,
            DealStatus::InProgress => Self::InProgress,
            DealStatus::Completed => Self::Completed,
            DealStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<DealStatusValue> for DealStatus {
    fn from(value: DealStatusValue) -> Self {
        match value {
            DealStatusValue::Pending => Self::Pending,
            DealStatusValue::InProgress => Self::InProgress,
            DealStatusValue::Completed => Self::Completed,
            DealStatusValue::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum UserRoleValue {
    Buyer,
    Seller,
}

impl From<UserRole> for UserRoleValue {
    fn from(value: UserRole) -> Self {
        match value {
            UserRole::Buyer => Self::Buyer,
            UserRole::Seller => Self::Seller,
        }
    }
}

impl From<UserRoleValue> for UserRole {
    fn from(value: UserRoleValue) -> Self {
        match value {
            UserRoleValue::Buyer => Self::Buyer,
            UserRoleValue::Seller => Self::Seller,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum NotificationKindValue {
    NewDeal,
    NewMessage,
    DealUpdate,
    DocumentUpload,
}

impl From<NotificationKind> for NotificationKindValue {
    fn from(value: NotificationKind) -> Self {
        match value {
            NotificationKind::NewDeal => Self::NewDeal,
            NotificationKind::NewMessage => Self::NewMessage,
            NotificationKind::DealUpdate => Self::DealUpdate,
            NotificationKind::DocumentUpload => Self::DocumentUpload,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum PriceDirectionValue {
    Decrease,
    Increase,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct UserNode {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub role: UserRoleValue,
    pub avatar: Option<String>,
}

impl From<User> for UserNode {
    fn from(user: User) -> Self {
        Self {
            id: ID(user.id.to_string()),
            name: user.name,
            email: user.email,
            role: user.role.into(),
            avatar: user.avatar,
        }
    }
}

pub struct DealNode(pub Deal);

impl From<Deal> for DealNode {
    fn from(deal: Deal) -> Self {
        Self(deal)
    }
}

/// Prices are exposed as decimal strings to avoid float rounding on the wire.
#[Object(name = "Deal")]
impl DealNode {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn description(&self) -> &str {
        &self.0.description
    }

    async fn status(&self) -> DealStatusValue {
        self.0.status.into()
    }

    async fn initial_price(&self) -> String {
        self.0.initial_price.to_string()
    }

    async fn current_price(&self) -> String {
        self.0.current_price.to_string()
    }

    /// Current price formatted for display, e.g. `$47,500`.
    async fn formatted_price(&self) -> String {
        format_amount(self.0.current_price)
    }

    async fn buyer_id(&self) -> ID {
        ID(self.0.buyer_id.to_string())
    }

    async fn seller_id(&self) -> Option<ID> {
        self.0.seller_id.map(|id| ID(id.to_string()))
    }

    async fn buyer(&self, ctx: &Context<'_>) -> Option<UserNode> {
        let room = ctx.data_opt::<DealRoom>()?;
        room.user(self.0.buyer_id).map(UserNode::from)
    }

    async fn seller(&self, ctx: &Context<'_>) -> Option<UserNode> {
        let room = ctx.data_opt::<DealRoom>()?;
        room.user(self.0.seller_id?).map(UserNode::from)
    }

    async fn is_terminal(&self) -> bool {
        self.0.is_terminal()
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MessageNode {
    pub id: ID,
    pub deal_id: ID,
    pub sender_id: ID,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl From<Message> for MessageNode {
    fn from(message: Message) -> Self {
        Self {
            id: ID(message.id.to_string()),
            deal_id: ID(message.deal_id.to_string()),
            sender_id: ID(message.sender_id.to_string()),
            content: message.content,
            timestamp: message.timestamp,
            read: message.read,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DocumentNode {
    pub id: ID,
    pub deal_id: ID,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_by: ID,
    pub created_at: DateTime<Utc>,
    pub access_control: Vec<ID>,
}

impl From<Document> for DocumentNode {
    fn from(doc: Document) -> Self {
        Self {
            id: ID(doc.id.to_string()),
            deal_id: ID(doc.deal_id.to_string()),
            name: doc.name,
            content_type: doc.content_type,
            size: doc.size,
            uploaded_by: ID(doc.uploaded_by.to_string()),
            created_at: doc.created_at,
            access_control: doc
                .access_control
                .into_iter()
                .map(|id| ID(id.to_string()))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct NotificationNode {
    pub id: ID,
    pub kind: NotificationKindValue,
    pub content: String,
    pub deal_id: Option<ID>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationNode {
    fn from(n: Notification) -> Self {
        Self {
            id: ID(n.id.to_string()),
            kind: n.kind.into(),
            content: n.content,
            deal_id: n.deal_id.map(|id| ID(id.to_string())),
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MonthlyCountNode {
    pub month: String,
    pub count: usize,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AnalyticsNode {
    pub total_deals: usize,
    pub pending_deals: usize,
    pub in_progress_deals: usize,
    pub completed_deals: usize,
    pub cancelled_deals: usize,
    pub total_users: usize,
    pub buyers_count: usize,
    pub sellers_count: usize,
    pub messages_sent: usize,
    pub documents_uploaded: usize,
    pub monthly_deals: Vec<MonthlyCountNode>,
}

impl From<AnalyticsSummary> for AnalyticsNode {
    fn from(s: AnalyticsSummary) -> Self {
        Self {
            total_deals: s.total_deals,
            pending_deals: s.pending_deals,
            in_progress_deals: s.in_progress_deals,
            completed_deals: s.completed_deals,
            cancelled_deals: s.cancelled_deals,
            total_users: s.total_users,
            buyers_count: s.buyers_count,
            sellers_count: s.sellers_count,
            messages_sent: s.messages_sent,
            documents_uploaded: s.documents_uploaded,
            monthly_deals: s
                .monthly_deals
                .into_iter()
                .map(|m| MonthlyCountNode {
                    month: m.month.to_string(),
                    count: m.count,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PricePreviewNode {
    pub direction: PriceDirectionValue,
    /// Percentage rounded to two decimals, e.g. `5.26`.
    pub percent: String,
    /// Human summary, e.g. `Decrease by 5.26%`.
    pub summary: String,
}

impl From<PriceChange> for PricePreviewNode {
    fn from(change: PriceChange) -> Self {
        Self {
            direction: match change.direction {
                PriceDirection::Decrease => PriceDirectionValue::Decrease,
                PriceDirection::Increase => PriceDirectionValue::Increase,
            },
            percent: format!("{:.2}", change.percent.round_dp(2)),
            summary: change.to_string(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct HealthPayload {
    pub ok: bool,
}

#[derive(InputObject, Debug)]
pub struct CreateDealInput {
    pub title: String,
    pub description: String,
    /// Decimal string; `$` and thousands separators are accepted.
    pub initial_price: String,
    pub seller_id: Option<ID>,
}

#[derive(InputObject, Debug)]
pub struct UploadDocumentInput {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    #[graphql(default)]
    pub share_with_counterparty: bool,
}
